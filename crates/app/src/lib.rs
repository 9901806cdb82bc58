//! Operator-side reply assistance: live suggestion feeds folded into a ghost-text input.

pub mod commands;
pub mod demo;
pub mod error;
pub mod ghost;
pub mod settings;
pub mod suggestion;

pub use error::{AppError, AppResult};
