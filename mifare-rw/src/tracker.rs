//! Reader-state tracker
//!
//! Bridges driver presence notifications to the display: every notification
//! reconnects, redraws the status panel and shows the new reader state.
//! Notifications may arrive on any thread; all display writes go through
//! [`Marshal`].

use std::sync::{Arc, Weak};

use mifare_reader::SubscriptionHandle;
use mifare_types::{ReaderState, SessionStatus};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn, Span};

use crate::config::Config;
use crate::presentation::{Field, Marshal, PresentationSink};
use crate::session::CardSession;

/// Presence tracker
///
/// Holds nothing but the subscription; repeated identical notifications
/// just redraw the same values.
pub struct ReaderStateTracker<S> {
    session: Arc<CardSession>,
    marshal: Marshal<S>,
    subscription: Mutex<Option<SubscriptionHandle>>,
    span: Span,
}

impl<S> ReaderStateTracker<S> {
    /// Stop receiving presence notifications
    pub fn release_subscription(&self) {
        // take first: dropping the handle may wait for the driver thread
        let handle = self.subscription.lock().take();
        drop(handle);
    }
}

impl<S: PresentationSink + Send + 'static> ReaderStateTracker<S> {
    pub fn new(session: Arc<CardSession>, marshal: Marshal<S>, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            session,
            marshal,
            subscription: Mutex::new(None),
            span: config.span.clone(),
        })
    }
    
    /// Subscribe to presence notifications and show the initial card status
    ///
    /// Subscribes only once; later calls just repeat the initial probe. If
    /// no card is found the display is left as it is.
    pub fn initialize(self: &Arc<Self>) {
        debug!(parent: &self.span, "Initializing card reader");
        
        self.subscribe();
        
        if self.session.connect() {
            let uid = self.session.uid();
            self.show_fields(&SessionStatus::connected(
                uid.clone(),
                self.session.status_text(),
                self.session.sub_status_text(),
            ));
            info!(parent: &self.span, uid = %uid, "Card connected successfully");
        } else {
            warn!(parent: &self.span, "No card detected during initialization");
        }
    }
    
    /// Check if presence notifications are being received
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .is_some_and(SubscriptionHandle::is_active)
    }
    
    /// Reconnect and redraw UID, status, sub-status and the indicator color
    pub fn refresh_status(&self) -> SessionStatus {
        let status = self.session.refresh();
        
        self.show_fields(&status);
        self.marshal.set_color(status.color());
        
        if status.connected {
            info!(parent: &self.span, uid = %status.uid, "Card status updated");
        } else {
            debug!(parent: &self.span, "Card disconnected");
        }
        
        status
    }
    
    /// Handle one presence notification
    pub fn on_reader_state_changed(&self, state: ReaderState) {
        debug!(parent: &self.span, %state, "Reader state changed");
        
        self.refresh_status();
        self.marshal.set_text(Field::ReaderState, state.to_string());
    }
    
    // Helper methods
    
    fn subscribe(self: &Arc<Self>) {
        let mut subscription = self.subscription.lock();
        
        if subscription.is_some() {
            debug!(parent: &self.span, "Already subscribed to presence notifications");
            return;
        }
        
        // Weak: the driver keeps the handler alive, the tracker owns the driver
        let tracker: Weak<Self> = Arc::downgrade(self);
        let handler = Box::new(move |state: ReaderState| {
            if let Some(tracker) = tracker.upgrade() {
                tracker.on_reader_state_changed(state);
            }
        });
        
        match self.session.io().subscribe(handler) {
            Ok(handle) => *subscription = Some(handle),
            Err(e) => {
                error!(parent: &self.span, error = %e, "Failed to subscribe to reader state changes");
            }
        }
    }
    
    fn show_fields(&self, status: &SessionStatus) {
        self.marshal.set_text(Field::Uid, status.uid.clone());
        self.marshal.set_text(Field::Status, status.status.clone());
        self.marshal.set_text(Field::SubStatus, status.sub_status.clone());
    }
}
