mod category;

pub use category::{unique_ids, Catalog, Category, CategoryPatch, NewCategory};
