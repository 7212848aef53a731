//! Repositories for database operations

pub mod fairs;
pub mod stands;

pub use fairs::FairRepository;
pub use stands::StandRepository;
