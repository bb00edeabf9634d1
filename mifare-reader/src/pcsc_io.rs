//! PC/SC driver for ACR122U-class readers
//!
//! Talks to the card through the reader's pseudo-APDUs (see
//! [`mifare_core::apdu`]). On every connect the factory transport key is
//! loaded into the reader's volatile key slot, and every block access is
//! preceded by a GENERAL AUTHENTICATE for that block.

use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use mifare_core::constants::{DEFAULT_KEY_INDEX, FACTORY_KEY};
use mifare_core::{Apdu, AuthKey, Response, BLOCK_SIZE};
use mifare_types::ReaderState;
use parking_lot::Mutex;
use pcsc::{Card, Context, Protocols, Scope, ShareMode, State};
use tracing::{debug, info, trace, warn};

use crate::{error::*, CardIo, StateHandler, SubscriptionHandle};

/// PC/SC card driver
///
/// # Examples
///
/// ```no_run
/// use mifare_reader::{CardIo, PcscCardIo};
///
/// let io = PcscCardIo::new()?.with_reader_filter("ACR122");
/// if io.connect_card()? {
///     println!("UID: {}", io.card_uid()?);
/// }
/// # Ok::<(), mifare_reader::Error>(())
/// ```
pub struct PcscCardIo {
    context: Context,
    reader_filter: Option<String>,
    key: [u8; 6],
    key_slot: u8,
    poll_interval: Duration,
    state: Mutex<PcscState>,
}

struct PcscState {
    card: Option<Card>,
    reader: Option<String>,
    status: String,
    sub_status: String,
}

impl PcscState {
    /// Forget the card and describe why
    fn disconnect(&mut self, reader: Option<String>, status: impl Into<String>) {
        self.card = None;
        self.reader = reader;
        self.status = status.into();
        self.sub_status.clear();
    }
    
    /// Record the outcome of an operation on the connected card
    ///
    /// `Ok((value, None))` leaves the sub-status line untouched.
    fn settle<T>(&mut self, outcome: Result<(T, Option<String>)>) -> Result<T> {
        match outcome {
            Ok((value, sub_status)) => {
                if let Some(sub_status) = sub_status {
                    self.sub_status = sub_status;
                }
                Ok(value)
            }
            Err(e) => {
                if e.is_card_gone() {
                    self.card = None;
                    self.status = "No card present".to_string();
                }
                self.sub_status = e.to_string();
                Err(e)
            }
        }
    }
}

impl PcscCardIo {
    /// Establish a user-scope PC/SC context
    pub fn new() -> Result<Self> {
        let context = Context::establish(Scope::User)?;
        
        Ok(Self {
            context,
            reader_filter: None,
            key: FACTORY_KEY,
            key_slot: DEFAULT_KEY_INDEX,
            poll_interval: Duration::from_millis(500),
            state: Mutex::new(PcscState {
                card: None,
                reader: None,
                status: "Not connected".to_string(),
                sub_status: String::new(),
            }),
        })
    }
    
    /// Only use readers whose name contains `filter`
    pub fn with_reader_filter(mut self, filter: impl Into<String>) -> Self {
        self.reader_filter = Some(filter.into());
        self
    }
    
    /// Key loaded into the reader on connect (default: factory key)
    pub fn with_key(mut self, key: [u8; 6], slot: u8) -> Self {
        self.key = key;
        self.key_slot = slot;
        self
    }
    
    /// How often the presence monitor wakes up to check for cancellation
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
    
    /// Name of the reader used by the last successful connect
    pub fn reader_name(&self) -> Option<String> {
        self.state.lock().reader.clone()
    }
    
    // Helper methods
    
    fn select_reader(&self) -> Result<CString> {
        let readers = match self.context.list_readers_owned() {
            Ok(readers) => readers,
            Err(pcsc::Error::NoReadersAvailable) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        
        readers
            .into_iter()
            .find(|name| matches_filter(name, self.reader_filter.as_deref()))
            .ok_or(Error::NoReadersAvailable)
    }
    
    fn authenticate(card: &Card, block: u8, key: AuthKey) -> Result<()> {
        let response = transmit(card, &Apdu::authenticate(block, key))?;
        
        if response.is_success() {
            Ok(())
        } else {
            debug!(block, %response, "Authentication rejected");
            Err(Error::AuthenticationFailed { block })
        }
    }
    
    /// Run `op` against the connected card, forgetting the card if it left
    fn with_card<T>(
        &self,
        op: impl FnOnce(&Card) -> Result<(T, Option<String>)>,
    ) -> Result<T> {
        let mut state = self.state.lock();
        let card = state.card.as_ref().ok_or(Error::NotConnected)?;
        let outcome = op(card);
        state.settle(outcome)
    }
}

impl CardIo for PcscCardIo {
    fn connect_card(&self) -> Result<bool> {
        let mut state = self.state.lock();
        
        // Never trust a previous connection; the card may have been swapped
        state.card = None;
        
        let reader = match self.select_reader() {
            Ok(reader) => reader,
            Err(e) => {
                state.disconnect(None, e.to_string());
                return Err(e);
            }
        };
        let reader_name = reader.to_string_lossy().into_owned();
        
        debug!(reader = %reader_name, "Connecting to card...");
        
        let card = match self.context.connect(&reader, ShareMode::Shared, Protocols::ANY) {
            Ok(card) => card,
            Err(pcsc::Error::NoSmartcard) | Err(pcsc::Error::RemovedCard) => {
                state.disconnect(Some(reader_name), "No card present");
                return Ok(false);
            }
            Err(e) => {
                state.disconnect(Some(reader_name), format!("Connect failed: {e}"));
                return Err(e.into());
            }
        };
        
        let loaded = transmit(&card, &Apdu::load_key(self.key_slot, self.key))
            .and_then(|response| Ok(response.into_result()?));
        if let Err(e) = loaded {
            state.disconnect(Some(reader_name), format!("Loading key failed: {e}"));
            return Err(e);
        }
        
        let atr = card
            .status2_owned()
            .map(|status| hex::encode_upper(status.atr()))
            .unwrap_or_default();
        
        info!(reader = %reader_name, atr = %atr, "Card connected");
        
        state.status = format!("Connected to {reader_name}");
        state.sub_status = format!("ATR {atr}");
        state.reader = Some(reader_name);
        state.card = Some(card);
        
        Ok(true)
    }
    
    fn card_uid(&self) -> Result<String> {
        self.with_card(|card| {
            let response = transmit(card, &Apdu::get_uid())?;
            trace!(%response, "UID read");
            let uid = response.into_result()?;
            // The sub-status keeps the ATR line from connect
            Ok((hex::encode_upper(&uid), None))
        })
    }
    
    fn read_card_block(&self, block: u8, key_type: u8, key_index: u8) -> Result<Bytes> {
        self.with_card(|card| {
            Self::authenticate(card, block, AuthKey::new(key_type, key_index))?;
            
            let response = transmit(card, &Apdu::read_binary(block, BLOCK_SIZE as u8))?;
            let summary = format!("Read block {block}: {response}");
            Ok((response.into_result()?, Some(summary)))
        })
    }
    
    fn write_card_block(&self, data: &[u8], block: u8, key_type: u8, key_index: u8) -> Result<()> {
        if data.len() != BLOCK_SIZE {
            return Err(Error::InvalidBlockData { len: data.len() });
        }
        
        self.with_card(|card| {
            Self::authenticate(card, block, AuthKey::new(key_type, key_index))?;
            
            let response = transmit(card, &Apdu::update_binary(block, data)?)?;
            let summary = format!("Wrote block {block}: {response}");
            response.into_result()?;
            Ok(((), Some(summary)))
        })
    }
    
    fn status_text(&self) -> String {
        self.state.lock().status.clone()
    }
    
    fn sub_status_text(&self) -> String {
        self.state.lock().sub_status.clone()
    }
    
    fn subscribe(&self, handler: StateHandler) -> Result<SubscriptionHandle> {
        let active = Arc::new(AtomicBool::new(true));
        
        let monitor = PresenceMonitor {
            context: self.context.clone(),
            reader_filter: self.reader_filter.clone(),
            interval: self.poll_interval,
            active: active.clone(),
        };
        
        let worker = thread::Builder::new()
            .name("mifare-presence".to_string())
            .spawn(move || monitor.run(handler))
            .map_err(|e| Error::Monitor(e.to_string()))?;
        
        Ok(SubscriptionHandle::with_worker(active, worker))
    }
}

/// Background loop turning PC/SC status changes into [`ReaderState`]s
struct PresenceMonitor {
    context: Context,
    reader_filter: Option<String>,
    interval: Duration,
    active: Arc<AtomicBool>,
}

impl PresenceMonitor {
    fn run(self, handler: StateHandler) {
        debug!("Presence monitor started");
        
        let mut readers = vec![pcsc::ReaderState::new(pcsc::PNP_NOTIFICATION(), State::UNAWARE)];
        let mut last: Option<ReaderState> = None;
        
        while self.active.load(Ordering::Acquire) {
            let state = match self.poll(&mut readers) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Presence poll failed: {}", e);
                    ReaderState::Error
                }
            };
            
            if last != Some(state) {
                debug!(%state, "Reader state changed");
                last = Some(state);
                handler(state);
            }
            
            if state == ReaderState::Error {
                thread::sleep(self.interval);
            }
        }
        
        debug!("Presence monitor stopped");
    }
    
    fn poll(&self, readers: &mut Vec<pcsc::ReaderState>) -> Result<ReaderState> {
        readers.retain(|rs| is_pnp(rs.name()) || !is_dead(rs));
        
        let names = match self.context.list_readers_owned() {
            Ok(names) => names,
            Err(pcsc::Error::NoReadersAvailable) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        
        for name in names {
            if !matches_filter(&name, self.reader_filter.as_deref()) {
                continue;
            }
            if !readers.iter().any(|rs| rs.name() == name.as_c_str()) {
                trace!(reader = ?name, "Watching reader");
                readers.push(pcsc::ReaderState::new(name, State::UNAWARE));
            }
        }
        
        match self.context.get_status_change(self.interval, readers) {
            Ok(()) | Err(pcsc::Error::Timeout) => {}
            Err(e) => return Err(e.into()),
        }
        
        for rs in readers.iter_mut() {
            rs.sync_current_state();
        }
        
        Ok(summarize(
            readers
                .iter()
                .filter(|rs| !is_pnp(rs.name()) && !is_dead(rs))
                .map(|rs| rs.event_state()),
        ))
    }
}

/// Collapse per-reader states into one presence value
fn summarize(states: impl Iterator<Item = State>) -> ReaderState {
    let mut any_reader = false;
    
    for state in states {
        any_reader = true;
        if state.contains(State::PRESENT) && !state.contains(State::MUTE) {
            return ReaderState::CardPresent;
        }
    }
    
    if any_reader {
        ReaderState::ReaderPresentNoCard
    } else {
        ReaderState::NoReader
    }
}

fn transmit(card: &Card, apdu: &Apdu) -> Result<Response> {
    trace!("Sending: {:?}", apdu);
    
    let mut buf = [0u8; pcsc::MAX_BUFFER_SIZE];
    let raw = card.transmit(&apdu.encode(), &mut buf)?;
    
    Ok(Response::decode(raw)?)
}

fn matches_filter(name: &CStr, filter: Option<&str>) -> bool {
    match filter {
        Some(filter) => name.to_string_lossy().contains(filter),
        None => true,
    }
}

fn is_pnp(name: &CStr) -> bool {
    name == pcsc::PNP_NOTIFICATION()
}

fn is_dead(rs: &pcsc::ReaderState) -> bool {
    rs.event_state().intersects(State::UNKNOWN | State::IGNORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_summarize_no_readers() {
        assert_eq!(summarize(std::iter::empty()), ReaderState::NoReader);
    }
    
    #[test]
    fn test_summarize_empty_reader() {
        assert_eq!(
            summarize([State::EMPTY].into_iter()),
            ReaderState::ReaderPresentNoCard
        );
    }
    
    #[test]
    fn test_summarize_card_on_any_reader() {
        assert_eq!(
            summarize([State::EMPTY, State::PRESENT | State::INUSE].into_iter()),
            ReaderState::CardPresent
        );
    }
    
    #[test]
    fn test_summarize_mute_card() {
        assert_eq!(
            summarize([State::PRESENT | State::MUTE].into_iter()),
            ReaderState::ReaderPresentNoCard
        );
    }
    
    fn connected_state() -> PcscState {
        PcscState {
            card: None,
            reader: Some("ACS ACR122U".to_string()),
            status: "Connected to ACS ACR122U".to_string(),
            sub_status: "ATR 3B8F8001".to_string(),
        }
    }
    
    #[test]
    fn test_settle_without_sub_status_keeps_atr() {
        let mut state = connected_state();
        
        let uid = state.settle(Ok(("04A23B91".to_string(), None))).unwrap();
        
        assert_eq!(uid, "04A23B91");
        assert_eq!(state.sub_status, "ATR 3B8F8001");
    }
    
    #[test]
    fn test_settle_records_summary_and_errors() {
        let mut state = connected_state();
        
        state.settle(Ok(((), Some("Read block 4: SW 90 00".to_string())))).unwrap();
        assert_eq!(state.sub_status, "Read block 4: SW 90 00");
        
        let err = state.settle::<()>(Err(Error::AuthenticationFailed { block: 4 })).unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed { block: 4 }));
        assert_eq!(state.sub_status, err.to_string());
        assert_eq!(state.status, "Connected to ACS ACR122U");
    }
    
    #[test]
    fn test_settle_card_gone_resets_status() {
        let mut state = connected_state();
        
        assert!(state.settle::<()>(Err(Error::NoCard)).is_err());
        
        assert!(state.card.is_none());
        assert_eq!(state.status, "No card present");
    }
    
    #[test]
    fn test_disconnect_clears_stale_lines() {
        let mut state = connected_state();
        
        state.disconnect(Some("Other Reader".to_string()), "Loading key failed: boom");
        
        assert!(state.card.is_none());
        assert_eq!(state.reader.as_deref(), Some("Other Reader"));
        assert_eq!(state.status, "Loading key failed: boom");
        assert_eq!(state.sub_status, "");
        
        state.disconnect(None, "No readers available");
        assert_eq!(state.reader, None);
    }
    
    #[test]
    fn test_reader_filter() {
        let name = CString::new("ACS ACR122U PICC Interface 00 00").unwrap();
        
        assert!(matches_filter(&name, None));
        assert!(matches_filter(&name, Some("ACR122")));
        assert!(!matches_filter(&name, Some("Yubikey")));
    }
}
