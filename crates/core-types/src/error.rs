// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Strategy parameters must be a table, got `{0}`")]
    ParamsNotATable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
