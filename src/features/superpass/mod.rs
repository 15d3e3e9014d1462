//! Superpass: deferred authorization for category deletes.
//!
//! A delete intent issues a short-lived one-time code that is delivered out
//! of band. The delete only runs when the code comes back before the window
//! closes, and a code authorizes exactly one run.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/admin/superpass` | Issue a token for a single or bulk delete |
//! | POST | `/api/admin/superpass/verify` | Verify a code and run the delete |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod workers;

pub use services::SuperpassService;
pub use workers::ExpirySweeper;
