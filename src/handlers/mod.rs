pub mod auth;
pub mod notification;

pub use auth::*;
