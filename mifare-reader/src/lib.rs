//! Reader driver layer for MIFARE Classic block access
//!
//! Defines the [`CardIo`] contract the orchestration layer talks to and
//! provides a PC/SC implementation plus an in-memory card.

pub mod error;
pub mod memory;
pub mod pcsc_io;

pub use error::{Error, Result};
pub use memory::MemoryCardIo;
pub use pcsc_io::PcscCardIo;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::Bytes;
use mifare_types::ReaderState;
use tracing::warn;

/// Callback invoked on every presence change
///
/// May be called from a driver-owned worker thread.
pub type StateHandler = Box<dyn Fn(ReaderState) + Send + Sync + 'static>;

/// Card driver contract
///
/// All calls are blocking. Implementations serialize access to the
/// physical reader themselves.
pub trait CardIo: Send + Sync {
    /// Connect to the card currently on the reader
    fn connect_card(&self) -> Result<bool>;
    
    /// UID of the connected card
    fn card_uid(&self) -> Result<String>;
    
    /// Authenticate and read one block
    fn read_card_block(&self, block: u8, key_type: u8, key_index: u8) -> Result<Bytes>;
    
    /// Authenticate and write one block
    fn write_card_block(&self, data: &[u8], block: u8, key_type: u8, key_index: u8) -> Result<()>;
    
    /// Last known status line
    fn status_text(&self) -> String;
    
    /// Last known sub-status line
    fn sub_status_text(&self) -> String;
    
    /// Register for presence notifications
    fn subscribe(&self, handler: StateHandler) -> Result<SubscriptionHandle>;
}

/// Keeps a presence subscription alive
///
/// Dropping the handle (or calling [`cancel`](Self::cancel)) stops delivery
/// and joins the worker thread, if any.
#[derive(Debug)]
pub struct SubscriptionHandle {
    active: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Subscription without a dedicated thread
    pub fn new(active: Arc<AtomicBool>) -> Self {
        Self {
            active,
            worker: None,
        }
    }
    
    /// Subscription backed by a worker thread
    pub fn with_worker(active: Arc<AtomicBool>, worker: JoinHandle<()>) -> Self {
        Self {
            active,
            worker: Some(worker),
        }
    }
    
    /// Handle that is not attached to anything
    pub fn detached() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }
    
    /// Check if notifications are still delivered
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
    
    /// Stop delivery
    pub fn cancel(&mut self) {
        self.active.store(false, Ordering::Release);
        
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() == std::thread::current().id() {
                // cancelled from inside the handler; the loop exits on its own
                return;
            }
            if worker.join().is_err() {
                warn!("Presence monitor thread panicked");
            }
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
