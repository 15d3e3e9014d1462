mod rule_handler;

pub use rule_handler::*;
