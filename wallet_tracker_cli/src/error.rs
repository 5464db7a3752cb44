use thiserror::Error;
use wallet_tracker_core::CoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown command: {0} (type `help`)")]
    UnknownCommand(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}
