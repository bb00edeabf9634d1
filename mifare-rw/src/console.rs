//! High-level console interface

use std::sync::Arc;

use mifare_core::TextFormat;
use mifare_reader::CardIo;
use mifare_types::SessionStatus;

use crate::block_io::BlockIo;
use crate::config::Config;
use crate::error::Result;
use crate::presentation::{Marshal, PresentationSink};
use crate::session::CardSession;
use crate::tracker::ReaderStateTracker;

/// MIFARE block console
///
/// Ties the card session, block I/O and presence tracking to one driver and
/// one display.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use mifare_rw::presentation::{channel, DisplayState, Field};
/// use mifare_rw::{Config, Console, MemoryCardIo};
///
/// let io = Arc::new(MemoryCardIo::new().with_card(&[0x04, 0xA2, 0x3B, 0x91]));
/// let (marshal, presenter) = channel(DisplayState::new());
///
/// let console = Console::new(io, marshal, Config::default());
/// console.initialize();
///
/// assert!(console.write_block_from_text("HELLO", 4));
/// assert!(console.read_block_as_text(4).starts_with("HELLO"));
/// assert_eq!(presenter.with_sink(|s| s.text(Field::Uid).map(String::from)), Some("04A23B91".into()));
/// ```
pub struct Console<S> {
    session: Arc<CardSession>,
    block_io: BlockIo,
    tracker: Arc<ReaderStateTracker<S>>,
    block_len: usize,
}

impl<S: PresentationSink + Send + 'static> Console<S> {
    pub fn new(io: Arc<dyn CardIo>, marshal: Marshal<S>, config: Config) -> Self {
        let session = Arc::new(CardSession::new(io, &config));
        let block_io = BlockIo::new(session.clone(), &config);
        let tracker = ReaderStateTracker::new(session.clone(), marshal, &config);
        
        Self {
            session,
            block_io,
            tracker,
            block_len: config.block_len,
        }
    }
    
    /// Start presence tracking and show the current card, if any
    pub fn initialize(&self) {
        self.tracker.initialize();
    }
    
    /// Reconnect and redraw the status panel
    pub fn refresh_status(&self) -> SessionStatus {
        self.tracker.refresh_status()
    }
    
    /// Read a block as dense text (`""` on any failure)
    pub fn read_block_as_text(&self, block: u8) -> String {
        self.block_io.read_block_as_text(block)
    }
    
    /// Read a block in the given format (`""` on any failure)
    pub fn read_block(&self, block: u8, format: TextFormat) -> String {
        self.block_io.read_block(block, format)
    }
    
    /// Read a block in a format given by name
    pub fn read_block_named(&self, block: u8, format: &str) -> Result<String> {
        self.block_io.read_block_named(block, format)
    }
    
    /// Write text to a block, padded or truncated to the configured block length
    pub fn write_block_from_text(&self, text: &str, block: u8) -> bool {
        self.block_io.write_block_from_text(text, block, self.block_len)
    }
    
    /// Write text to a block, padded or truncated to `length` bytes
    pub fn write_block_from_text_with_len(&self, text: &str, block: u8, length: usize) -> bool {
        self.block_io.write_block_from_text(text, block, length)
    }
    
    pub fn session(&self) -> &CardSession {
        &self.session
    }
    
    pub fn tracker(&self) -> &ReaderStateTracker<S> {
        &self.tracker
    }
}

impl<S> Drop for Console<S> {
    fn drop(&mut self) {
        // the driver's handler only holds a weak reference; end delivery now
        self.tracker.release_subscription();
    }
}
