//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the document store backends and the out-of-band delivery channels.

pub mod document_store;
pub mod mailer;
