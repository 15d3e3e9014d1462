pub mod auth;
pub mod categories;
pub mod category_rules;
pub mod superpass;
