mod token;

pub use token::{
    generate_code, AuthorizationToken, SuperpassAction, TokenRejection, TokenStatus,
};
