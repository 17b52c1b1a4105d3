//! FILENAME: src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("unknown field: {0}")]
    InvalidField(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
}
