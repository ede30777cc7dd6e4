pub mod acquire;
pub mod candidates;
pub mod config;
pub mod error;
pub mod fetch;
pub mod records;
pub mod search;
pub mod ui;

pub use error::{AppError, LookupError, Result};
