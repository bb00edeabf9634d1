//! Error types for mifare-core

/// Result type alias for mifare-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Text format name or code not recognized
    #[error("Invalid text format: {0}")]
    InvalidFormat(String),
    
    /// Reader response is too short to carry a status word
    #[error("Response too short: expected at least 2 bytes, got {actual} bytes")]
    ResponseTooShort {
        actual: usize,
    },
    
    /// Reader answered with a non-success status word
    #[error("Command failed with status word {sw1:02X} {sw2:02X}")]
    StatusWord {
        sw1: u8,
        sw2: u8,
    },
    
    /// Command data does not fit the short APDU length byte
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
}

impl Error {
    /// Check if the error is an authentication rejection (SW 63 00)
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::StatusWord { sw1: 0x63, sw2: 0x00 })
    }
}
