//! Repositories for database access

pub mod user;

pub use user::{UserRepository, UserRepositoryError};
