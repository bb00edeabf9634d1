//! Protocol constants

/// MIFARE authentication key selector
///
/// `key_type` is the MIFARE authenticate command (0x60 = key A,
/// 0x61 = key B); `key_index` is the reader's volatile key slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthKey {
    pub key_type: u8,
    pub key_index: u8,
}

impl AuthKey {
    pub const fn new(key_type: u8, key_index: u8) -> Self {
        Self { key_type, key_index }
    }
}

impl Default for AuthKey {
    fn default() -> Self {
        DEFAULT_AUTH_KEY
    }
}

/// Key A
pub const KEY_TYPE_A: u8 = 0x60;

/// Key B
pub const KEY_TYPE_B: u8 = 0x61;

/// Key slot used for every block access
pub const DEFAULT_KEY_INDEX: u8 = 0x00;

/// Authentication key used for every block access
pub const DEFAULT_AUTH_KEY: AuthKey = AuthKey::new(KEY_TYPE_A, DEFAULT_KEY_INDEX);

/// Factory transport key loaded into the reader key slot
pub const FACTORY_KEY: [u8; 6] = [0xFF; 6];

/// Status field placeholder when no card is connected
pub const NOT_CONNECTED_TEXT: &str = "Not connected.";

/// UID placeholder when the UID could not be read
pub const UID_ERROR_TEXT: &str = "Error";

/// Status words
pub mod sw {
    /// Success
    pub const OK: (u8, u8) = (0x90, 0x00);
    
    /// Operation failed (authentication, read or write rejected)
    pub const FAILED: (u8, u8) = (0x63, 0x00);
    
    /// Function not supported
    pub const NOT_SUPPORTED: (u8, u8) = (0x6A, 0x81);
}
