// In crates/backtester/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient data: {found} bars supplied, at least {required} required")]
    InsufficientData { found: usize, required: usize },

    #[error("Strategy error: {0}")]
    Strategy(#[from] strategies::Error),

    #[error("Invalid parameter grid: {0}")]
    InvalidGrid(String),

    #[error("Walk-forward analysis failed: {0}")]
    WalkForward(String),
}

pub type Result<T> = std::result::Result<T, Error>;
