mod superpass_handler;

pub use superpass_handler::*;
