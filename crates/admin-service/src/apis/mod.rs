//! Request handling for the admin endpoint.

pub mod error;
pub mod health;
pub mod update_status;

pub use error::ApiError;
