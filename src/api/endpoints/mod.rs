//! API endpoint handlers.

pub mod health;
pub mod report;
pub mod upload;
