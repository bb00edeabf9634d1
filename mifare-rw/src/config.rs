//! Console configuration

use mifare_core::constants::{DEFAULT_AUTH_KEY, NOT_CONNECTED_TEXT, UID_ERROR_TEXT};
use mifare_core::{AuthKey, BLOCK_SIZE};
use tracing::Span;

/// Settings shared by the session, block I/O and tracker
///
/// Components log under [`Config::span`] instead of a process-wide logger;
/// give each console its own span to tell them apart.
///
/// # Examples
///
/// ```
/// use mifare_rw::Config;
///
/// let config = Config::default()
///     .with_not_connected_text("No card")
///     .with_span(tracing::info_span!("desk", reader = "ACR122U"));
/// assert_eq!(config.block_len, 16);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Key selector used for every block access
    pub auth_key: AuthKey,
    
    /// Bytes written per block
    pub block_len: usize,
    
    /// Placeholder for UID/status/sub-status when no card is connected
    pub not_connected_text: String,
    
    /// UID placeholder when the UID cannot be read
    pub uid_error_text: String,
    
    /// Parent span for every event emitted by the console
    pub span: Span,
}

impl Config {
    pub fn with_auth_key(mut self, auth_key: AuthKey) -> Self {
        self.auth_key = auth_key;
        self
    }
    
    pub fn with_block_len(mut self, block_len: usize) -> Self {
        self.block_len = block_len;
        self
    }
    
    pub fn with_not_connected_text(mut self, text: impl Into<String>) -> Self {
        self.not_connected_text = text.into();
        self
    }
    
    pub fn with_uid_error_text(mut self, text: impl Into<String>) -> Self {
        self.uid_error_text = text.into();
        self
    }
    
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_key: DEFAULT_AUTH_KEY,
            block_len: BLOCK_SIZE,
            not_connected_text: NOT_CONNECTED_TEXT.to_string(),
            uid_error_text: UID_ERROR_TEXT.to_string(),
            span: tracing::info_span!("mifare"),
        }
    }
}
