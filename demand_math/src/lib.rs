//! # Demand Math
//!
//! Calendar and trailing-window calculations used to derive demand
//! forecasting features. Everything here is pure: no I/O, no shared state.

use thiserror::Error;

pub mod calendar;
pub mod windows;

pub use calendar::CalendarFeatures;
pub use windows::TrailingWindow;

/// Errors that can occur in feature calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calendar error: {0}")]
    CalendarError(String),
}

/// Result type for feature math operations
pub type Result<T> = std::result::Result<T, MathError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
