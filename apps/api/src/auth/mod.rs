pub mod extractor;
pub mod handlers;
pub mod users;
pub mod verifier;
