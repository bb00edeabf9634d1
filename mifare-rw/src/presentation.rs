//! Thread-safe updates of the presentation sink
//!
//! The sink (a window, a terminal panel) belongs to one thread. Presence
//! notifications arrive on driver threads, so every update goes through
//! [`Marshal::push_to_owner`]: on the owning thread the update runs at once,
//! anywhere else it is queued and applied by the [`Presenter`] when the
//! owner pumps or runs it.
//!
//! ```text
//!  driver thread                      owning thread
//!  ─────────────                      ─────────────
//!  Marshal::push_to_owner ──queue──▶  Presenter::pump / run
//!                                          │
//!  Marshal::push_to_owner (owner) ────────▶ sink
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use mifare_types::StatusColor;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{trace, warn};

/// Named display fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Uid,
    Status,
    SubStatus,
    ReaderState,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uid => "UID",
            Self::Status => "Status",
            Self::SubStatus => "Sub-status",
            Self::ReaderState => "Reader",
        };
        f.write_str(name)
    }
}

/// Display surface receiving status updates
pub trait PresentationSink {
    fn set_text(&mut self, field: Field, text: &str);
    
    fn set_color(&mut self, color: StatusColor);
}

/// Deferred sink update
pub type Action<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Create the update channel for `sink`
///
/// The calling thread becomes the owning thread.
pub fn channel<S>(sink: S) -> (Marshal<S>, Presenter<S>) {
    let owner = thread::current().id();
    let sink = Arc::new(Mutex::new(sink));
    let (tx, rx) = mpsc::unbounded_channel();
    
    let marshal = Marshal {
        owner,
        sink: sink.clone(),
        tx,
    };
    let presenter = Presenter {
        sink,
        rx,
        _owner_only: PhantomData,
    };
    
    (marshal, presenter)
}

/// Sender side: cheap to clone, usable from any thread
pub struct Marshal<S> {
    owner: ThreadId,
    sink: Arc<Mutex<S>>,
    tx: UnboundedSender<Action<S>>,
}

impl<S> Clone for Marshal<S> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner,
            sink: self.sink.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<S> Marshal<S> {
    /// Check if the caller is on the owning thread
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
    
    /// Run `action` against the sink on the owning thread
    ///
    /// Executes immediately when called from the owning thread, otherwise
    /// queues it. Actions from one thread are applied in the order pushed.
    ///
    /// An immediate action does not wait for queued ones, so an older queued
    /// update can overwrite it on the next pump. Pump the [`Presenter`]
    /// before refreshing from the owning thread.
    pub fn push_to_owner(&self, action: impl FnOnce(&mut S) + Send + 'static) {
        if self.is_owner_thread() {
            action(&mut self.sink.lock());
            return;
        }
        
        if self.tx.send(Box::new(action)).is_err() {
            warn!("Presenter dropped, discarding display update");
        }
    }
}

impl<S: PresentationSink> Marshal<S> {
    pub fn set_text(&self, field: Field, text: impl Into<String>) {
        let text = text.into();
        self.push_to_owner(move |sink| sink.set_text(field, &text));
    }
    
    pub fn set_color(&self, color: StatusColor) {
        self.push_to_owner(move |sink| sink.set_color(color));
    }
}

/// Receiver side, pinned to the owning thread
pub struct Presenter<S> {
    sink: Arc<Mutex<S>>,
    rx: UnboundedReceiver<Action<S>>,
    
    /// Keeps the presenter on the thread that created it
    _owner_only: PhantomData<*const ()>,
}

impl<S> Presenter<S> {
    /// Apply every queued update without waiting
    ///
    /// Returns the number of updates applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        
        while let Ok(action) = self.rx.try_recv() {
            self.apply(action);
            applied += 1;
        }
        
        if applied > 0 {
            trace!(applied, "Applied queued display updates");
        }
        applied
    }
    
    /// Apply updates until every [`Marshal`] is dropped
    pub async fn run(&mut self) {
        while let Some(action) = self.rx.recv().await {
            self.apply(action);
        }
    }
    
    /// Apply updates until `shutdown` completes or every [`Marshal`] is dropped
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);
        
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                action = self.rx.recv() => match action {
                    Some(action) => self.apply(action),
                    None => break,
                },
            }
        }
    }
    
    /// Inspect the sink
    pub fn with_sink<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.sink.lock())
    }
    
    fn apply(&self, action: Action<S>) {
        action(&mut self.sink.lock());
    }
}

/// Sink that keeps the latest value of every field
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisplayState {
    fields: HashMap<Field, String>,
    color: Option<StatusColor>,
    updates: usize,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn text(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }
    
    pub fn color(&self) -> Option<StatusColor> {
        self.color
    }
    
    /// Number of updates received so far
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl PresentationSink for DisplayState {
    fn set_text(&mut self, field: Field, text: &str) {
        self.fields.insert(field, text.to_string());
        self.updates += 1;
    }
    
    fn set_color(&mut self, color: StatusColor) {
        self.color = Some(color);
        self.updates += 1;
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in [Field::Uid, Field::Status, Field::SubStatus, Field::ReaderState] {
            writeln!(f, "{:>10}: {}", field, self.text(field).unwrap_or(""))?;
        }
        match self.color {
            Some(color) => write!(f, "{:>10}: {}", "Indicator", color),
            None => write!(f, "{:>10}: -", "Indicator"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use pretty_assertions::assert_eq;
    
    #[test]
    fn test_owner_thread_applies_immediately() {
        let (marshal, presenter) = channel(DisplayState::new());
        
        marshal.set_text(Field::Uid, "04A23B91");
        
        assert_eq!(presenter.with_sink(|s| s.text(Field::Uid).map(str::to_string)), Some("04A23B91".to_string()));
    }
    
    #[test]
    fn test_other_thread_is_queued() {
        let (marshal, mut presenter) = channel(RecordingSink::default());
        let owner = thread::current().id();
        
        let remote = marshal.clone();
        thread::spawn(move || {
            assert!(!remote.is_owner_thread());
            remote.set_text(Field::Status, "first");
            remote.set_text(Field::Status, "second");
            remote.set_color(StatusColor::Connected);
        })
        .join()
        .unwrap();
        
        assert_eq!(presenter.with_sink(|s| s.state.updates()), 0);
        assert_eq!(presenter.pump(), 3);
        
        presenter.with_sink(|s| {
            assert_eq!(s.state.text(Field::Status), Some("second"));
            assert_eq!(s.state.color(), Some(StatusColor::Connected));
            assert!(s.threads.iter().all(|id| *id == owner));
        });
    }
    
    #[test]
    fn test_pump_before_owner_refresh_keeps_newest() {
        let (marshal, mut presenter) = channel(DisplayState::new());
    
        let remote = marshal.clone();
        thread::spawn(move || remote.set_text(Field::Status, "queued"))
            .join()
            .unwrap();
    
        // Owner-side update without pumping is overwritten later
        marshal.set_text(Field::Status, "owner");
        assert_eq!(presenter.pump(), 1);
        assert_eq!(presenter.with_sink(|s| s.text(Field::Status).map(str::to_string)), Some("queued".to_string()));
    
        let remote = marshal.clone();
        thread::spawn(move || remote.set_text(Field::Status, "queued"))
            .join()
            .unwrap();
    
        presenter.pump();
        marshal.set_text(Field::Status, "owner");
        assert_eq!(presenter.with_sink(|s| s.text(Field::Status).map(str::to_string)), Some("owner".to_string()));
    }
    
    #[test]
    fn test_pump_empty_queue() {
        let (_marshal, mut presenter) = channel(DisplayState::new());
        assert_eq!(presenter.pump(), 0);
    }
    
    #[test]
    fn test_push_after_presenter_dropped() {
        let (marshal, presenter) = channel(DisplayState::new());
        drop(presenter);
        
        thread::spawn(move || marshal.set_text(Field::Uid, "lost"))
            .join()
            .unwrap();
    }
    
    #[tokio::test]
    async fn test_run_drains_until_senders_dropped() {
        let (marshal, mut presenter) = channel(DisplayState::new());
        
        thread::spawn(move || {
            marshal.set_text(Field::ReaderState, "CardPresent");
        })
        .join()
        .unwrap();
        
        presenter.run().await;
        
        assert_eq!(
            presenter.with_sink(|s| s.text(Field::ReaderState).map(str::to_string)),
            Some("CardPresent".to_string())
        );
    }
    
    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (_marshal, mut presenter) = channel(DisplayState::new());
        
        presenter.run_until(async {}).await;
        assert_eq!(presenter.pump(), 0);
    }
    
    #[test]
    fn test_display_state_render() {
        let mut state = DisplayState::new();
        state.set_text(Field::Uid, "04A23B91");
        state.set_color(StatusColor::Disconnected);
        
        let rendered = state.to_string();
        assert!(rendered.contains("UID: 04A23B91"));
        assert!(rendered.contains("Indicator: Red"));
    }
}
