//! Configuration, errors, logging and shared primitives.

pub mod config;
pub mod error;
pub mod geo;
pub mod instance;
pub mod logging;
pub mod status;

pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use status::Status;
