mod category_repository;
mod category_service;
pub mod hierarchy_resolver;
mod sequencing_service;

pub use category_repository::CategoryRepository;
pub use category_service::CategoryService;
pub use hierarchy_resolver::{CategoryNode, FlatNode};
pub use sequencing_service::{DropTarget, SequencingService};
