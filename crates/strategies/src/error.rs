// In crates/strategies/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid parameters for strategy '{strategy}': {source}")]
    InvalidParameters {
        strategy: &'static str,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
