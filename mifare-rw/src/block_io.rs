//! Authenticated block read/write
//!
//! Every entry point re-runs the connect attempt first and returns its
//! fallback (`""` or `false`) without touching the card if that fails.
//!
//! Reading and writing are intentionally not inverse operations. A write
//! packs the raw text into the block (NUL padded), while a read renders the
//! block in [`TextFormat::Stretched`] form and then strips whitespace:
//! spaces inside the written text are lost, and the NUL padding comes back
//! as `'\0'` characters.

use std::sync::Arc;

use bytes::Bytes;
use mifare_core::codec::{self, TextFormat};
use mifare_core::AuthKey;
use tracing::{debug, error, info, warn, Span};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::CardSession;

/// Block I/O orchestrator
pub struct BlockIo {
    session: Arc<CardSession>,
    key: AuthKey,
    span: Span,
}

impl BlockIo {
    pub fn new(session: Arc<CardSession>, config: &Config) -> Self {
        Self {
            session,
            key: config.auth_key,
            span: config.span.clone(),
        }
    }
    
    /// Read a block as dense text
    ///
    /// Never fails; returns an empty string if there is no card or the read
    /// is rejected.
    pub fn read_block_as_text(&self, block: u8) -> String {
        let bytes = self.read_or_empty(block);
        codec::compact(&codec::encode(&bytes, TextFormat::Stretched))
    }
    
    /// Read a block and render it without post-processing
    ///
    /// Same fallbacks as [`read_block_as_text`](Self::read_block_as_text).
    pub fn read_block(&self, block: u8, format: TextFormat) -> String {
        codec::encode(&self.read_or_empty(block), format)
    }
    
    /// Read a block rendered in a format given by name
    ///
    /// # Errors
    ///
    /// Returns [`Error::CodecFormat`] for an unknown format name; the card is
    /// not touched in that case.
    pub fn read_block_named(&self, block: u8, format: &str) -> Result<String> {
        let format = format.parse::<TextFormat>()?;
        Ok(self.read_block(block, format))
    }
    
    /// Pack `text` into `length` bytes and write it to a block
    ///
    /// The text is written as given; callers trim it. Returns `false` if
    /// there is no card or the write is rejected.
    pub fn write_block_from_text(&self, text: &str, block: u8, length: usize) -> bool {
        info!(
            parent: &self.span,
            "Writing to block {}: '{}' (length: {})",
            block,
            text,
            text.chars().count()
        );
        
        let result = self
            .session
            .try_connect()
            .and_then(|()| self.write(&codec::decode_fixed(text, length), block));
        
        match result {
            Ok(written) => {
                info!(parent: &self.span, "Successfully wrote {} bytes to block {}", written, block);
                true
            }
            Err(e @ Error::ConnectionFailure(_)) => {
                warn!(parent: &self.span, "Write attempted but no card connected: {}", e);
                false
            }
            Err(e) => {
                error!(parent: &self.span, error = %e, "Error writing to block {}", block);
                false
            }
        }
    }
    
    // Helper methods
    
    fn read_or_empty(&self, block: u8) -> Bytes {
        let result = self.session.try_connect().and_then(|()| self.read(block));
        
        match result {
            Ok(bytes) => bytes,
            Err(e @ Error::ConnectionFailure(_)) => {
                warn!(parent: &self.span, "Read attempted but no card connected: {}", e);
                Bytes::new()
            }
            Err(e) => {
                error!(parent: &self.span, error = %e, "Error reading block {}", block);
                Bytes::new()
            }
        }
    }
    
    fn read(&self, block: u8) -> Result<Bytes> {
        debug!(
            parent: &self.span,
            "Reading block {} with authentication key 0x{:02X}:0x{:X}",
            block,
            self.key.key_type,
            self.key.key_index
        );
        
        let bytes = self
            .session
            .io()
            .read_card_block(block, self.key.key_type, self.key.key_index)
            .map_err(|source| Error::ReadFailure { block, source })?;
        
        debug!(parent: &self.span, "Successfully read {} bytes from block {}", bytes.len(), block);
        
        Ok(bytes)
    }
    
    fn write(&self, bytes: &[u8], block: u8) -> Result<usize> {
        self.session
            .io()
            .write_card_block(bytes, block, self.key.key_type, self.key.key_index)
            .map_err(|source| Error::WriteFailure { block, source })?;
        
        Ok(bytes.len())
    }
}
