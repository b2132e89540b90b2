pub mod admin;
pub mod auth;
pub mod common;
pub mod sessions;

pub use auth::*;
pub use sessions::*;
