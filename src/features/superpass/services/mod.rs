mod superpass_service;

pub use superpass_service::{SuperpassService, VerifiedAction};
