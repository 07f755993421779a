// In crates/options/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("No volatility in [{low}, {high}] reproduces the option price {price}")]
    NoSolution { price: f64, low: f64, high: f64 },

    #[error("Invalid pricing input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
