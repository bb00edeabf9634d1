//! In-memory MIFARE Classic 1K card
//!
//! Behaves like a reader with a card that can be attached, detached,
//! presented and removed programmatically. Presence changes are delivered
//! synchronously on the thread that caused them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use mifare_core::constants::{KEY_TYPE_A, KEY_TYPE_B};
use mifare_core::BLOCK_SIZE;
use mifare_types::ReaderState;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{error::*, CardIo, StateHandler, SubscriptionHandle};

/// Number of blocks on a 1K card
pub const BLOCK_COUNT: usize = 64;

/// Number of reader key slots
pub const KEY_SLOTS: u8 = 2;

const SUB_STATUS: &str = "MIFARE Classic 1K (emulated)";

/// Sector trailer with transport keys and default access bits
const SECTOR_TRAILER: [u8; BLOCK_SIZE] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x80, 0x69, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// In-memory card driver
pub struct MemoryCardIo {
    state: Mutex<MemoryReader>,
    subscribers: Mutex<Vec<Subscriber>>,
}

struct Subscriber {
    active: Arc<AtomicBool>,
    handler: Arc<StateHandler>,
}

struct MemoryReader {
    reader_present: bool,
    card: Option<MemoryCard>,
    connected: bool,
    status: String,
    sub_status: String,
}

struct MemoryCard {
    uid: Vec<u8>,
    blocks: Vec<[u8; BLOCK_SIZE]>,
}

impl MemoryCard {
    fn new(uid: &[u8]) -> Self {
        let mut blocks = vec![[0u8; BLOCK_SIZE]; BLOCK_COUNT];
        
        // Manufacturer block: UID, BCC, then fixed manufacturer data
        let manufacturer = &mut blocks[0];
        let uid_len = uid.len().min(BLOCK_SIZE - 1);
        manufacturer[..uid_len].copy_from_slice(&uid[..uid_len]);
        manufacturer[uid_len] = uid.iter().fold(0, |bcc, b| bcc ^ b);
        
        for trailer in blocks.iter_mut().skip(3).step_by(4) {
            *trailer = SECTOR_TRAILER;
        }
        
        Self {
            uid: uid.to_vec(),
            blocks,
        }
    }
}

impl MemoryCardIo {
    /// Reader attached, no card
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryReader {
                reader_present: true,
                card: None,
                connected: false,
                status: "Reader ready".to_string(),
                sub_status: String::new(),
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }
    
    /// Start with a card already on the reader
    pub fn with_card(self, uid: &[u8]) -> Self {
        self.state.lock().card = Some(MemoryCard::new(uid));
        self
    }
    
    /// Current presence state
    pub fn reader_state(&self) -> ReaderState {
        let state = self.state.lock();
        
        match (state.reader_present, state.card.is_some()) {
            (false, _) => ReaderState::NoReader,
            (true, false) => ReaderState::ReaderPresentNoCard,
            (true, true) => ReaderState::CardPresent,
        }
    }
    
    /// Plug the reader in
    pub fn attach_reader(&self) {
        {
            let mut state = self.state.lock();
            state.reader_present = true;
            state.status = "Reader ready".to_string();
        }
        self.notify();
    }
    
    /// Unplug the reader (the card goes with it)
    pub fn detach_reader(&self) {
        {
            let mut state = self.state.lock();
            state.reader_present = false;
            state.card = None;
            state.connected = false;
            state.status = "No reader".to_string();
            state.sub_status.clear();
        }
        self.notify();
    }
    
    /// Present a card with the given UID
    pub fn insert_card(&self, uid: &[u8]) {
        {
            let mut state = self.state.lock();
            state.card = Some(MemoryCard::new(uid));
            state.connected = false;
        }
        self.notify();
    }
    
    /// Take the card away
    pub fn remove_card(&self) {
        {
            let mut state = self.state.lock();
            state.card = None;
            state.connected = false;
            state.status = "No card present".to_string();
            state.sub_status.clear();
        }
        self.notify();
    }
    
    /// Raw block contents, bypassing authentication
    pub fn block(&self, block: u8) -> Option<[u8; BLOCK_SIZE]> {
        let state = self.state.lock();
        state
            .card
            .as_ref()
            .and_then(|card| card.blocks.get(usize::from(block)).copied())
    }
    
    // Helper methods
    
    fn notify(&self) {
        let state = self.reader_state();
        
        // Handlers may call back into the driver, so no lock is held while they run
        let handlers: Vec<Arc<StateHandler>> = {
            let mut subscribers = self.subscribers.lock();
            subscribers.retain(|s| s.active.load(Ordering::Acquire));
            subscribers.iter().map(|s| s.handler.clone()).collect()
        };
        
        debug!(%state, subscribers = handlers.len(), "Presence changed");
        
        for handler in handlers {
            handler(state);
        }
    }
    
    fn check_access(state: &MemoryReader, block: u8, key_type: u8, key_index: u8) -> Result<()> {
        if !state.connected {
            return Err(Error::NotConnected);
        }
        
        if usize::from(block) >= BLOCK_COUNT {
            return Err(Error::BlockOutOfRange {
                block,
                blocks: BLOCK_COUNT,
            });
        }
        
        if !matches!(key_type, KEY_TYPE_A | KEY_TYPE_B) || key_index >= KEY_SLOTS {
            return Err(Error::AuthenticationFailed { block });
        }
        
        Ok(())
    }
}

impl Default for MemoryCardIo {
    fn default() -> Self {
        Self::new()
    }
}

impl CardIo for MemoryCardIo {
    fn connect_card(&self) -> Result<bool> {
        let mut state = self.state.lock();
        
        if !state.reader_present {
            state.connected = false;
            return Err(Error::NoReadersAvailable);
        }
        
        if state.card.is_none() {
            state.connected = false;
            state.status = "No card present".to_string();
            state.sub_status.clear();
            return Ok(false);
        }
        
        state.connected = true;
        state.status = "Card connected".to_string();
        state.sub_status = SUB_STATUS.to_string();
        
        Ok(true)
    }
    
    fn card_uid(&self) -> Result<String> {
        let state = self.state.lock();
        
        if !state.connected {
            return Err(Error::NotConnected);
        }
        
        let card = state.card.as_ref().ok_or(Error::NoCard)?;
        Ok(hex::encode_upper(&card.uid))
    }
    
    fn read_card_block(&self, block: u8, key_type: u8, key_index: u8) -> Result<Bytes> {
        let state = self.state.lock();
        Self::check_access(&state, block, key_type, key_index)?;
        
        let card = state.card.as_ref().ok_or(Error::NoCard)?;
        let data = card.blocks[usize::from(block)];
        
        trace!(block, "Read block {:02X?}", data);
        
        Ok(Bytes::copy_from_slice(&data))
    }
    
    fn write_card_block(&self, data: &[u8], block: u8, key_type: u8, key_index: u8) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_access(&state, block, key_type, key_index)?;
        
        if block == 0 {
            return Err(Error::ReadOnlyBlock(block));
        }
        
        if data.len() != BLOCK_SIZE {
            return Err(Error::InvalidBlockData { len: data.len() });
        }
        
        let card = state.card.as_mut().ok_or(Error::NoCard)?;
        card.blocks[usize::from(block)].copy_from_slice(data);
        
        trace!(block, "Wrote block {:02X?}", data);
        
        Ok(())
    }
    
    fn status_text(&self) -> String {
        self.state.lock().status.clone()
    }
    
    fn sub_status_text(&self) -> String {
        self.state.lock().sub_status.clone()
    }
    
    fn subscribe(&self, handler: StateHandler) -> Result<SubscriptionHandle> {
        let active = Arc::new(AtomicBool::new(true));
        
        self.subscribers.lock().push(Subscriber {
            active: active.clone(),
            handler: Arc::new(handler),
        });
        
        Ok(SubscriptionHandle::new(active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mifare_core::constants::DEFAULT_AUTH_KEY;
    use pretty_assertions::assert_eq;
    
    const UID: [u8; 4] = [0x04, 0xA2, 0x3B, 0x91];
    
    fn connected_card() -> MemoryCardIo {
        let io = MemoryCardIo::new().with_card(&UID);
        assert!(io.connect_card().unwrap());
        io
    }
    
    #[test]
    fn test_connect_without_card() {
        let io = MemoryCardIo::new();
        
        assert!(!io.connect_card().unwrap());
        assert_eq!(io.status_text(), "No card present");
        assert!(matches!(io.card_uid(), Err(Error::NotConnected)));
    }
    
    #[test]
    fn test_connect_without_reader() {
        let io = MemoryCardIo::new();
        io.detach_reader();
        
        assert!(matches!(io.connect_card(), Err(Error::NoReadersAvailable)));
    }
    
    #[test]
    fn test_uid() {
        let io = connected_card();
        
        assert_eq!(io.card_uid().unwrap(), "04A23B91");
        assert_eq!(io.sub_status_text(), SUB_STATUS);
    }
    
    #[test]
    fn test_manufacturer_block() {
        let io = connected_card();
        let block0 = io.read_card_block(0, 0x60, 0).unwrap();
        
        assert_eq!(&block0[..4], &UID);
        assert_eq!(block0[4], 0x04 ^ 0xA2 ^ 0x3B ^ 0x91);
    }
    
    #[test]
    fn test_write_then_read() {
        let io = connected_card();
        let data = [0x42u8; BLOCK_SIZE];
        
        io.write_card_block(&data, 4, DEFAULT_AUTH_KEY.key_type, DEFAULT_AUTH_KEY.key_index)
            .unwrap();
        
        assert_eq!(io.read_card_block(4, 0x60, 0).unwrap().as_ref(), &data);
        assert_eq!(io.block(4), Some(data));
    }
    
    #[test]
    fn test_sector_trailers() {
        let io = connected_card();
        assert_eq!(io.block(3), Some(SECTOR_TRAILER));
        assert_eq!(io.block(63), Some(SECTOR_TRAILER));
        assert_eq!(io.block(4), Some([0; BLOCK_SIZE]));
    }
    
    #[test]
    fn test_access_errors() {
        let io = connected_card();
        
        assert!(matches!(io.write_card_block(&[0; 16], 0, 0x60, 0), Err(Error::ReadOnlyBlock(0))));
        assert!(matches!(io.read_card_block(64, 0x60, 0), Err(Error::BlockOutOfRange { block: 64, .. })));
        assert!(matches!(io.read_card_block(4, 0x10, 0), Err(Error::AuthenticationFailed { block: 4 })));
        assert!(matches!(io.write_card_block(&[0; 4], 4, 0x60, 0), Err(Error::InvalidBlockData { len: 4 })));
    }
    
    #[test]
    fn test_removal_drops_connection() {
        let io = connected_card();
        io.remove_card();
        
        assert!(matches!(io.read_card_block(4, 0x60, 0), Err(Error::NotConnected)));
        assert!(!io.connect_card().unwrap());
    }
    
    #[test]
    fn test_presence_notifications() {
        let io = MemoryCardIo::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        
        let sink = seen.clone();
        let mut handle = io
            .subscribe(Box::new(move |state| sink.lock().push(state)))
            .unwrap();
        
        io.insert_card(&UID);
        io.remove_card();
        io.detach_reader();
        
        handle.cancel();
        io.attach_reader();
        
        assert_eq!(
            *seen.lock(),
            vec![
                ReaderState::CardPresent,
                ReaderState::ReaderPresentNoCard,
                ReaderState::NoReader,
            ]
        );
    }
    
    #[test]
    fn test_handler_can_reenter_driver() {
        let io = Arc::new(MemoryCardIo::new());
        let connected = Arc::new(AtomicBool::new(false));
        
        let driver = io.clone();
        let flag = connected.clone();
        let _handle = io
            .subscribe(Box::new(move |_| {
                flag.store(driver.connect_card().unwrap_or(false), Ordering::Release);
            }))
            .unwrap();
        
        io.insert_card(&UID);
        assert!(connected.load(Ordering::Acquire));
    }
}
