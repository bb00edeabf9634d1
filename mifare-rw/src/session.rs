//! Card session
//!
//! A session is the single logical engagement with whatever card is on the
//! reader. It tracks:
//! - whether the last connect attempt succeeded
//! - the UID read while connected
//!
//! Neither is trusted for later calls: every operation starts from a fresh
//! connect attempt, since the card may have been swapped in between.

use std::sync::Arc;

use mifare_reader::CardIo;
use mifare_types::SessionStatus;
use parking_lot::RwLock;
use tracing::{debug, error, Span};

use crate::config::Config;
use crate::error::{Error, Result};

/// Session manager
///
/// Thread-safe; share it with `Arc`.
pub struct CardSession {
    io: Arc<dyn CardIo>,
    
    /// Last observed connection state
    state: RwLock<SessionState>,
    
    not_connected_text: String,
    uid_error_text: String,
    span: Span,
}

#[derive(Debug, Default)]
struct SessionState {
    connected: bool,
    
    /// Only set while connected
    uid: Option<String>,
}

impl CardSession {
    pub fn new(io: Arc<dyn CardIo>, config: &Config) -> Self {
        Self {
            io,
            state: RwLock::new(SessionState::default()),
            not_connected_text: config.not_connected_text.clone(),
            uid_error_text: config.uid_error_text.clone(),
            span: config.span.clone(),
        }
    }
    
    /// Connect to the card on the reader
    ///
    /// Always calls the driver, whatever the previous outcome was. Driver
    /// errors are logged and reported as `false`.
    pub fn connect(&self) -> bool {
        match self.try_connect() {
            Ok(()) => true,
            Err(Error::Collaborator(e)) => {
                error!(parent: &self.span, error = %e, "Error connecting to card");
                false
            }
            Err(e) => {
                debug!(parent: &self.span, "Connect card attempt: Failed ({})", e);
                false
            }
        }
    }
    
    /// UID of the card
    ///
    /// The driver is asked even when the last connect failed; any driver
    /// error yields the UID placeholder (`"Error"`).
    pub fn uid(&self) -> String {
        match self.io.card_uid() {
            Ok(uid) => {
                debug!(parent: &self.span, uid = %uid, "Retrieved card UID");
                
                let mut state = self.state.write();
                if state.connected {
                    state.uid = Some(uid.clone());
                }
                uid
            }
            Err(e) => {
                error!(parent: &self.span, error = %e, "Error getting card UID");
                self.uid_error_text.clone()
            }
        }
    }
    
    /// Driver status line
    pub fn status_text(&self) -> String {
        self.io.status_text()
    }
    
    /// Driver sub-status line
    pub fn sub_status_text(&self) -> String {
        self.io.sub_status_text()
    }
    
    /// Reconnect and collect everything shown in the status panel
    pub fn refresh(&self) -> SessionStatus {
        if self.connect() {
            SessionStatus::connected(self.uid(), self.status_text(), self.sub_status_text())
        } else {
            SessionStatus::not_connected(&self.not_connected_text)
        }
    }
    
    /// Outcome of the last connect attempt
    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }
    
    /// UID read during the current connection, if any
    pub fn cached_uid(&self) -> Option<String> {
        self.state.read().uid.clone()
    }
    
    pub(crate) fn io(&self) -> &dyn CardIo {
        self.io.as_ref()
    }
    
    /// Connect, keeping the failure reason
    pub(crate) fn try_connect(&self) -> Result<()> {
        let result = match self.io.connect_card() {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::ConnectionFailure("no card on the reader".into())),
            Err(e) => Err(Error::Collaborator(e)),
        };
        
        let mut state = self.state.write();
        state.connected = result.is_ok();
        if !state.connected {
            state.uid = None;
        }
        
        if result.is_ok() {
            debug!(parent: &self.span, "Connect card attempt: Success");
        }
        
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use pretty_assertions::assert_eq;
    
    fn session(driver: MockDriver) -> CardSession {
        CardSession::new(Arc::new(driver), &Config::default())
    }
    
    #[test]
    fn test_session_new() {
        let session = session(MockDriver::new());
        
        assert!(!session.is_connected());
        assert_eq!(session.cached_uid(), None);
    }
    
    #[test]
    fn test_connect_always_calls_driver() {
        let mut driver = MockDriver::new();
        driver.expect_connect_card().times(3).returning(|| Ok(true));
        
        let session = session(driver);
        
        assert!(session.connect());
        assert!(session.connect());
        assert!(session.connect());
        assert!(session.is_connected());
    }
    
    #[test]
    fn test_connect_error_is_swallowed() {
        let mut driver = MockDriver::new();
        driver
            .expect_connect_card()
            .returning(|| Err(mifare_reader::Error::NoReadersAvailable));
        
        let session = session(driver);
        
        assert!(!session.connect());
        assert!(!session.is_connected());
    }
    
    #[test]
    fn test_connect_failure_reason() {
        let mut driver = MockDriver::new();
        driver.expect_connect_card().returning(|| Ok(false));
        
        let session = session(driver);
        
        assert!(matches!(session.try_connect(), Err(Error::ConnectionFailure(_))));
    }
    
    #[test]
    fn test_uid_error_maps_to_placeholder() {
        let mut driver = MockDriver::new();
        driver
            .expect_card_uid()
            .times(1)
            .returning(|| Err(mifare_reader::Error::NotConnected));
        
        let session = session(driver);
        
        assert_eq!(session.uid(), "Error");
    }
    
    #[test]
    fn test_uid_cached_only_while_connected() {
        let mut driver = MockDriver::new();
        let mut outcomes = vec![Ok(false), Ok(true)];
        driver
            .expect_connect_card()
            .times(2)
            .returning(move || outcomes.pop().unwrap_or(Ok(false)));
        driver.expect_card_uid().returning(|| Ok("04A23B91".to_string()));
        
        let session = session(driver);
        
        assert!(session.connect());
        assert_eq!(session.uid(), "04A23B91");
        assert_eq!(session.cached_uid().as_deref(), Some("04A23B91"));
        
        assert!(!session.connect());
        assert_eq!(session.cached_uid(), None);
    }
    
    #[test]
    fn test_refresh_connected() {
        let mut driver = MockDriver::new();
        driver.expect_connect_card().returning(|| Ok(true));
        driver.expect_card_uid().returning(|| Ok("04A23B91".to_string()));
        driver.expect_status_text().returning(|| "Connected to ACR122U".to_string());
        driver.expect_sub_status_text().returning(|| "ATR 3B8F80".to_string());
        
        let status = session(driver).refresh();
        
        assert_eq!(
            status,
            SessionStatus::connected(
                "04A23B91".to_string(),
                "Connected to ACR122U".to_string(),
                "ATR 3B8F80".to_string(),
            )
        );
    }
    
    #[test]
    fn test_refresh_not_connected() {
        let mut driver = MockDriver::new();
        driver.expect_connect_card().returning(|| Ok(false));
        driver.expect_card_uid().never();
        driver.expect_status_text().never();
        
        let status = session(driver).refresh();
        
        assert_eq!(status, SessionStatus::not_connected("Not connected."));
    }
}
