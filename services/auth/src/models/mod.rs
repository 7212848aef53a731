//! Authentication service models

pub mod user;

pub use user::{NewUser, RegisterRequest, User, UserResponse};
