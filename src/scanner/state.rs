//! Scan state broadcasting
//!
//! Presentation layers subscribe to [`StateBroadcaster`] to follow the scanner.
//! A new subscriber first receives the current state, then every state
//! published after it subscribed, in order. Unlike a `tokio::sync::watch`
//! channel, intermediate states are never coalesced away, so a subscriber
//! sees one `Running` per visited item.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::ports::CatalogItem;

/// What the scanner is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    /// No item is being processed.
    #[default]
    Idle,
    /// The given item is being processed.
    Running(CatalogItem),
}

impl ScanState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    pub fn item(&self) -> Option<&CatalogItem> {
        match self {
            Self::Running(item) => Some(item),
            Self::Idle => None,
        }
    }
}

struct Inner {
    current: ScanState,
    subscribers: Vec<mpsc::UnboundedSender<ScanState>>,
}

/// Multicast holder of the latest [`ScanState`].
///
/// Cloning shares the same slot and subscriber list.
#[derive(Clone)]
pub struct StateBroadcaster {
    inner: Arc<Mutex<Inner>>,
}

impl StateBroadcaster {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                current: ScanState::Idle,
                subscribers: Vec::new(),
            })),
        }
    }

    /// The state most recently published.
    pub fn current(&self) -> ScanState {
        self.inner.lock().current.clone()
    }

    /// Replace the current state and deliver it to every live subscriber
    /// before returning. Subscribers whose stream was dropped are pruned.
    pub fn publish(&self, state: ScanState) {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|tx| tx.send(state.clone()).is_ok());
        inner.current = state;
    }

    /// Subscribe to state changes, starting with the current state.
    pub fn subscribe(&self) -> StateStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        // Registered under the same lock as publish, so no state slips between
        // the replayed value and the first live one.
        if tx.send(inner.current.clone()).is_ok() {
            inner.subscribers.push(tx);
        }
        StateStream { rx }
    }
}

impl Default for StateBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StateBroadcaster")
            .field("current", &inner.current)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Stream of [`ScanState`] values handed out by [`StateBroadcaster::subscribe`].
///
/// Never ends while the broadcaster is alive.
#[derive(Debug)]
pub struct StateStream {
    rx: mpsc::UnboundedReceiver<ScanState>,
}

impl StateStream {
    /// Wait for the next state.
    pub async fn next_state(&mut self) -> Option<ScanState> {
        self.rx.recv().await
    }

    /// Take every state already delivered without waiting.
    pub fn drain(&mut self) -> Vec<ScanState> {
        let mut states = Vec::new();
        while let Ok(state) = self.rx.try_recv() {
            states.push(state);
        }
        states
    }
}

impl Stream for StateStream {
    type Item = ScanState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
