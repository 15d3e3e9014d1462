//! Store and product category catalogs.
//!
//! Both catalogs share one record shape; store categories additionally carry
//! courier compatibility and product-category references. The hierarchy is
//! derived from `childCategories` alone.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/categories` | Active store categories (flat or `?tree=true`) |
//! | GET | `/api/admin/catalogs/{catalog}/categories` | Flat, tree or table listing |
//! | POST | `/api/admin/catalogs/{catalog}/categories` | Create |
//! | PATCH | `/api/admin/catalogs/{catalog}/categories/{id}` | Update, optionally linking a rule |
//! | POST | `/api/admin/catalogs/{catalog}/categories/{id}/toggle-active` | Flip `isActive` |
//! | POST | `/api/admin/catalogs/{catalog}/categories/{id}/toggle-courier` | Flip `courierCompatible` |
//! | POST | `/api/admin/catalogs/{catalog}/categories/reorder` | Drag-and-drop reorder |
//!
//! Deletion is only possible through a verified Superpass.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{CategoryRepository, CategoryService, SequencingService};
