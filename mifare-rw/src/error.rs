//! High-level error types
//!
//! These errors never leave the public read/write/status entry points; they
//! are logged there and replaced with the documented fallback values. Only
//! [`Error::CodecFormat`] reaches callers, from the format-by-name helpers.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),
    
    #[error("Failed to read block {block}: {source}")]
    ReadFailure {
        block: u8,
        #[source]
        source: mifare_reader::Error,
    },
    
    #[error("Failed to write block {block}: {source}")]
    WriteFailure {
        block: u8,
        #[source]
        source: mifare_reader::Error,
    },
    
    #[error("Codec error: {0}")]
    CodecFormat(#[from] mifare_core::Error),
    
    #[error("Reader error: {0}")]
    Collaborator(#[from] mifare_reader::Error),
}
