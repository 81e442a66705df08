//! Application-wide error types.
//!
//! Each layer owns a narrow error enum (`LabelsError`, `EngineError`,
//! `ServiceError`); `AppError` is what startup and `main` deal in.

use thiserror::Error;

use crate::engine::EngineError;
use crate::labels::LabelsError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("labels error: {0}")]
    Labels(#[from] LabelsError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("startup error: {0}")]
    Startup(String),

    #[error("http error: {0}")]
    Http(String),
}
