//! Category rules: cross-display and parent-child groupings of store
//! categories that exist independently of the `childCategories` tree.
//!
//! Rules whose category sets intersect describe the same grouping. The
//! inline path used from category edits therefore merges into an
//! overlapping rule instead of creating a second one.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::RuleEngine;
