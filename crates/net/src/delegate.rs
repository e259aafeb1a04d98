// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Host delegate interface.
//!
//! The event-loop owns every socket, every [`crate::connection`] and every
//! [`crate::dc`], but it never talks to the platform directly — results and
//! state transitions are surfaced to the embedding application through a
//! `Delegate`, the same split TDLib draws between `ConnectionsManager` and
//! its `Delegate` (`td/tgnet/ConnectionsManager.h`). The delegate runs on the
//! event-loop thread; the host is responsible for hopping back to its own
//! thread if it needs to.

use std::sync::Arc;

use rustgram_connectionstate::{ClosureCallback, ConnectionState, ConnectionStateManager};
use serde::{Deserialize, Serialize};

use crate::dc::DcId;

/// Which auth-key kind a completed handshake produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandshakeKind {
    /// The permanent, user-bound key.
    Permanent,
    /// The PFS temporary key used for generic traffic.
    TempGeneric,
    /// The PFS temporary key used for media traffic.
    TempMedia,
}

/// Results and events the core surfaces to the host application.
///
/// Every method has a default no-op body so a host that only cares about a
/// handful of events doesn't have to implement the whole interface.
pub trait Delegate: Send + Sync {
    /// A fresh serialized `config` TL object was received from a DC.
    fn on_update_config(&self, _serialized_tl_config: &[u8]) {}

    /// The aggregate connection state changed. Mirrors TDLib's
    /// `on_connection_state_changed`; see [`ConnectionState`] for the exact
    /// progression (`Empty`/`WaitingForNetwork` collapse to a `Waiting`
    /// state, `ConnectingToProxy`/`Connecting` to `Connecting`).
    fn on_connection_state_changed(&self, _state: ConnectionState) {}

    /// The server confirmed a new session (`new_session_created`).
    fn on_session_created(&self) {}

    /// The server invalidated our authorization (`-404`-class auth failure).
    fn on_logout(&self) {}

    /// A TL constructor inside a container wasn't recognized. Forwarded
    /// rather than treated as a protocol error, for forward compatibility
    /// with schema additions the core doesn't know about yet.
    fn on_unparsed_update(&self, _body: &[u8]) {}

    /// An internal push notification arrived on the push connection.
    fn on_internal_push_received(&self) {}

    /// A [`crate::handshake`] finished and installed a key into the DC.
    fn on_handshake_complete(&self, _dc_id: DcId, _kind: HandshakeKind, _time_difference: i32) {}
}

/// A `Delegate` that does nothing; useful as a placeholder before the host
/// wires up a real one, and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDelegate;

impl Delegate for NullDelegate {}

/// Tracks the session-wide [`ConnectionState`] and forwards every change to
/// a `Delegate`.
///
/// One instance lives on the event-loop thread and is fed by the pieces that
/// observe raw socket/handshake events (`Connection`, `Datacenter`); it
/// never talks to a socket itself.
pub struct DelegateBridge {
    states: ConnectionStateManager,
    delegate: Arc<dyn Delegate>,
}

impl DelegateBridge {
    /// Creates a bridge that forwards state changes to `delegate`.
    pub fn new(delegate: Arc<dyn Delegate>) -> Self {
        let mut states = ConnectionStateManager::new();
        let forward = delegate.clone();
        states.register_callback(Box::new(ClosureCallback::new(move |state| {
            forward.on_connection_state_changed(state);
            true
        })));
        Self { states, delegate }
    }

    /// Returns the current aggregate connection state.
    pub fn current_state(&self) -> ConnectionState {
        self.states.current_state()
    }

    /// Moves to `state`, notifying the delegate if it actually changed.
    pub fn set_state(&mut self, state: ConnectionState) {
        // The manager only rejects a transition on callback failure, which
        // can't happen here: the sole callback never returns an error.
        let _ = self.states.set_state(state);
    }

    /// The delegate this bridge forwards to, for events outside the
    /// connection-state stream (`on_session_created`, `on_logout`, ...).
    pub fn delegate(&self) -> &Arc<dyn Delegate> {
        &self.delegate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDelegate {
        states: Mutex<Vec<ConnectionState>>,
        sessions_created: AtomicUsize,
        logouts: AtomicUsize,
    }

    impl Delegate for RecordingDelegate {
        fn on_connection_state_changed(&self, state: ConnectionState) {
            self.states.lock().push(state);
        }

        fn on_session_created(&self) {
            self.sessions_created.fetch_add(1, Ordering::SeqCst);
        }

        fn on_logout(&self) {
            self.logouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn state_changes_forward_to_delegate() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut bridge = DelegateBridge::new(delegate.clone());

        bridge.set_state(ConnectionState::Connecting);
        bridge.set_state(ConnectionState::Connecting); // no-op, same state
        bridge.set_state(ConnectionState::Ready);

        assert_eq!(bridge.current_state(), ConnectionState::Ready);
        assert_eq!(
            *delegate.states.lock(),
            vec![ConnectionState::Connecting, ConnectionState::Ready]
        );
    }

    #[test]
    fn other_events_reach_the_delegate_directly() {
        let delegate = Arc::new(RecordingDelegate::default());
        let bridge = DelegateBridge::new(delegate.clone());

        bridge.delegate().on_session_created();
        bridge.delegate().on_logout();

        assert_eq!(delegate.sessions_created.load(Ordering::SeqCst), 1);
        assert_eq!(delegate.logouts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn null_delegate_is_a_harmless_default() {
        let delegate: Arc<dyn Delegate> = Arc::new(NullDelegate);
        delegate.on_update_config(&[]);
        delegate.on_session_created();
        delegate.on_connection_state_changed(ConnectionState::Ready);
    }
}
