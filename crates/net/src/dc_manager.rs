// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Top-level per-DC orchestrator.
//!
//! [`crate::datacenter::Datacenter`] owns the address-cursor and salt-list
//! algorithms, [`crate::handshake_driver::establish_auth_key`] owns driving
//! one handshake to completion over a real socket, and
//! [`crate::dc_auth::DcAuthKeyStorage`] owns persisting the resulting key.
//! `DcManager` ties the three together: deciding *which* handshake(s) a DC
//! needs right now, refusing to start a second one of the same kind while
//! one is in flight, and feeding `bad_server_salt`/connection-failure events
//! back into the owned [`crate::datacenter::Datacenter`].

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::auth::AuthKey;
use crate::dc::{DcId, DcOption};
use crate::dc_auth::{DcAuthError, DcAuthKeyStorage};
use crate::datacenter::{AddressListKind, Datacenter, DcSalt, RotatingAddress};
use crate::delegate::{Delegate, DelegateBridge, HandshakeKind};
use crate::handshake::HandshakeMode;
use crate::handshake_driver::{handshake_mode_for_kind, run_handshake, HandshakeDriverError, HandshakeOutcome};
use crate::rsa_key_shared::RsaKey;
use rustgram_connectionstate::ConnectionState;
use std::net::SocketAddr;

/// A `bad_server_salt` response carries only the raw salt, no validity
/// window (unlike a `future_salts` response). The source adopts it
/// immediately and relies on a later `future_salts` round-trip to learn the
/// real window; until then, this crate gives it a generous placeholder
/// lifetime so [`crate::datacenter::SaltList::select`] can still apply its
/// usual "longest remaining window wins" rule without special-casing an
/// unbounded entry.
const BAD_SALT_ASSUMED_LIFETIME_SECS: i32 = 30 * 60;

/// Errors raised while orchestrating a DC's handshakes.
#[derive(Debug, Error)]
pub enum DcManagerError {
    /// A handshake of this kind is already running for this DC; two
    /// handshakes of the same kind may never run concurrently on the same
    /// DC.
    #[error("a {kind:?} handshake is already in flight for dc {dc_id:?}")]
    AlreadyInFlight {
        /// The DC this was attempted against.
        dc_id: DcId,
        /// The kind already running.
        kind: HandshakeKind,
    },

    /// Driving the handshake itself failed.
    #[error(transparent)]
    Handshake(#[from] HandshakeDriverError),

    /// Persisting the resulting key failed.
    #[error(transparent)]
    Storage(#[from] DcAuthError),
}

/// Per-DC bookkeeping the manager needs beyond what [`Datacenter`] tracks:
/// whether this DC serves media/CDN traffic and whether PFS temp keys are
/// wanted at all (both inputs to the handshake-orchestration decision).
#[derive(Debug, Clone, Copy)]
pub struct DcProfile {
    /// `true` if this DC has a usable media/download address, gating
    /// whether a `TempMedia` handshake is ever worth starting.
    pub has_media_address: bool,
    /// `true` if this DC is CDN-only (no user-bound permanent key, ever).
    pub is_cdn: bool,
    /// `true` if Perfect Forward Secrecy (temp keys) is enabled for this
    /// session. When `false`, only the permanent key is ever requested.
    pub pfs_enabled: bool,
}

impl Default for DcProfile {
    fn default() -> Self {
        Self {
            has_media_address: false,
            is_cdn: false,
            pfs_enabled: true,
        }
    }
}

/// A guard marking `(dc_id, kind)` as "handshake in flight"; clears the
/// marker on drop regardless of how the handshake finished, mirroring
/// [`crate::dc_auth::RegisteredAuthKey`]'s RAII-unregister pattern.
struct InFlightGuard<'a> {
    manager: &'a DcManager,
    dc_id: DcId,
    kind: HandshakeKind,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.manager
            .in_flight
            .lock()
            .remove(&(self.dc_id.get_raw_id(), self.kind));
    }
}

/// Owns every [`Datacenter`] (address rotation + salts), the installed auth
/// keys, and the session-wide connection-state bridge, and decides which
/// handshake(s) to run.
pub struct DcManager {
    datacenters: Mutex<HashMap<i32, Datacenter>>,
    profiles: Mutex<HashMap<i32, DcProfile>>,
    in_flight: Mutex<HashSet<(i32, HandshakeKind)>>,
    storage: Mutex<DcAuthKeyStorage>,
    bridge: Mutex<DelegateBridge>,
}

impl DcManager {
    /// Creates a manager that forwards connection-state and handshake
    /// events to `delegate`.
    pub fn new(delegate: Arc<dyn Delegate>) -> Self {
        Self {
            datacenters: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            storage: Mutex::new(DcAuthKeyStorage::new()),
            bridge: Mutex::new(DelegateBridge::new(delegate)),
        }
    }

    /// Registers (or replaces) `dc_id`'s profile.
    pub fn set_profile(&self, dc_id: DcId, profile: DcProfile) {
        self.profiles.lock().insert(dc_id.get_raw_id(), profile);
    }

    fn profile(&self, dc_id: DcId) -> DcProfile {
        self.profiles
            .lock()
            .get(&dc_id.get_raw_id())
            .copied()
            .unwrap_or_default()
    }

    /// Loads a fresh address list for `dc_id`/`kind`, resetting its
    /// rotation cursor. Called whenever a `help.getConfig` response brings
    /// new `DcOption`s.
    pub fn set_addresses(&self, dc_id: DcId, kind: AddressListKind, addresses: Vec<RotatingAddress>) {
        self.datacenters
            .lock()
            .entry(dc_id.get_raw_id())
            .or_default()
            .set_addresses(kind, addresses);
    }

    /// The `(address, port)` to dial right now for `dc_id`/`kind`.
    pub fn current_target(&self, dc_id: DcId, kind: AddressListKind) -> Option<(RotatingAddress, u16)> {
        let datacenters = self.datacenters.lock();
        let dc = datacenters.get(&dc_id.get_raw_id())?;
        let (addr, port) = dc.current_target(kind)?;
        Some((addr.clone(), port))
    }

    /// Advances `dc_id`/`kind`'s rotation cursor after a failed connection
    /// attempt, per the reconnect-with-backoff / rotate-address policy.
    pub fn on_connection_failure(&self, dc_id: DcId, kind: AddressListKind) {
        self.datacenters
            .lock()
            .entry(dc_id.get_raw_id())
            .or_default()
            .advance(kind);
    }

    /// Absorbs a `bad_server_salt` notification: absorb the new salt so the
    /// caller can retransmit the offending message with the same msg_id
    /// (the retransmit itself is the caller's job; this just updates the
    /// salt it will retransmit with).
    pub fn on_bad_server_salt(&self, dc_id: DcId, new_salt: i64, now: i32) {
        let entry = DcSalt {
            valid_since: now,
            valid_until: now + BAD_SALT_ASSUMED_LIFETIME_SECS,
            salt: new_salt,
        };
        self.datacenters
            .lock()
            .entry(dc_id.get_raw_id())
            .or_default()
            .merge_salts(std::slice::from_ref(&entry), now);
    }

    /// Merges a `future_salts` response's entries into `dc_id`'s salt list.
    pub fn on_future_salts(&self, dc_id: DcId, salts: &[DcSalt], now: i32) {
        self.datacenters
            .lock()
            .entry(dc_id.get_raw_id())
            .or_default()
            .merge_salts(salts, now);
    }

    /// The salt to stamp on the next outgoing message to `dc_id`, if any.
    pub fn current_salt(&self, dc_id: DcId, now: i32) -> Option<i64> {
        self.datacenters
            .lock()
            .entry(dc_id.get_raw_id())
            .or_default()
            .current_salt(now)
    }

    /// Returns `true` if `dc_id` already has an installed, non-pending key
    /// of `kind`.
    pub fn has_key(&self, dc_id: DcId, kind: HandshakeKind) -> bool {
        self.storage.lock().has_key(dc_id, kind)
    }

    /// Implements the handshake-orchestration decision: which kinds
    /// `dc_id` should start a handshake for right now, given its current
    /// installed keys and profile. Kinds already in flight are omitted —
    /// "two handshakes of the same kind may never run concurrently on the
    /// same DC."
    pub fn required_handshakes(&self, dc_id: DcId) -> Vec<HandshakeKind> {
        let profile = self.profile(dc_id);
        let in_flight = self.in_flight.lock();
        let not_in_flight =
            |kind: HandshakeKind| !in_flight.contains(&(dc_id.get_raw_id(), kind));

        if !self.has_key(dc_id, HandshakeKind::Permanent) {
            return if not_in_flight(HandshakeKind::Permanent) {
                vec![HandshakeKind::Permanent]
            } else {
                vec![]
            };
        }

        if profile.is_cdn || !profile.pfs_enabled {
            // CDN DCs have no PFS temp keys; a session with PFS disabled
            // only ever uses the permanent key.
            return vec![];
        }

        let mut kinds = Vec::new();
        if !self.has_key(dc_id, HandshakeKind::TempGeneric) && not_in_flight(HandshakeKind::TempGeneric) {
            kinds.push(HandshakeKind::TempGeneric);
        }
        if profile.has_media_address
            && !self.has_key(dc_id, HandshakeKind::TempMedia)
            && not_in_flight(HandshakeKind::TempMedia)
        {
            kinds.push(HandshakeKind::TempMedia);
        }
        kinds
    }

    /// Runs a single handshake of `kind` against `option` and installs the
    /// resulting key, updating the session connection state around it
    /// (`Connecting` while the handshake runs, `Ready` once installed) and
    /// the DC's initial salt on success.
    ///
    /// Returns [`DcManagerError::AlreadyInFlight`] without touching the
    /// network if a handshake of this kind is already running for this DC.
    ///
    /// Deliberately does not hold `storage`'s or `bridge`'s lock across the
    /// `.await` that drives the handshake over the socket: both are plain
    /// `parking_lot::Mutex`es, and a guard held across an `.await` would
    /// block every other caller needing that lock for the whole handshake
    /// round-trip instead of just the brief read-modify-write around it.
    pub async fn establish(
        &self,
        dc_id: DcId,
        option: &DcOption,
        kind: HandshakeKind,
        rsa_keys: Vec<RsaKey>,
    ) -> Result<HandshakeOutcome, DcManagerError> {
        {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert((dc_id.get_raw_id(), kind)) {
                return Err(DcManagerError::AlreadyInFlight { dc_id, kind });
            }
        }
        let _guard = InFlightGuard {
            manager: self,
            dc_id,
            kind,
        };

        self.bridge.lock().set_state(ConnectionState::Connecting);

        let delegate = self.bridge.lock().delegate().clone();
        let mode = handshake_mode_for_kind(kind);
        let addr = SocketAddr::new(option.ip_address, option.port);

        // Temp keys bind to the already-established permanent key (step 5);
        // load it before driving the DH exchange so a missing perm key fails
        // fast instead of after a wasted round trip.
        let perm_auth_key = if matches!(mode, HandshakeMode::Temp) {
            let perm = self
                .storage
                .lock()
                .load_key(dc_id, HandshakeKind::Permanent)
                .map_err(|_| DcManagerError::Handshake(HandshakeDriverError::MissingPermanentAuthKey))?;
            Some((perm.id, perm.key))
        } else {
            None
        };

        let outcome = run_handshake(
            addr,
            dc_id,
            mode,
            kind,
            rsa_keys,
            option.secret.clone(),
            perm_auth_key,
            delegate.as_ref(),
        )
        .await?;

        let key = match mode {
            HandshakeMode::Main => AuthKey::new(outcome.auth_key_id, outcome.auth_key.clone()),
            HandshakeMode::Temp => AuthKey::temporary(
                outcome.auth_key_id,
                outcome.auth_key.clone(),
                std::time::Instant::now() + std::time::Duration::from_secs(86_400),
            ),
        };
        self.storage.lock().store_key(dc_id, kind, &key)?;

        let now = outcome.time_difference
            + std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i32)
                .unwrap_or(0);
        self.on_future_salts(
            dc_id,
            &[DcSalt {
                valid_since: now,
                valid_until: now + BAD_SALT_ASSUMED_LIFETIME_SECS,
                salt: outcome.server_salt as i64,
            }],
            now,
        );

        self.bridge.lock().set_state(ConnectionState::Ready);

        Ok(outcome)
    }

    /// The current aggregate connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.bridge.lock().current_state()
    }

    /// Runs [`Self::establish`], retrying transport-class failures
    /// (connection refused, unreachable, a dropped/garbled stream mid
    /// handshake) with the reconnect backoff from SPEC_FULL.md §4.3:
    /// starting at 50 ms, doubling on each failure, capped at 400 ms.
    ///
    /// Each retry starts a fresh handshake rather than retransmitting the
    /// exact in-flight request the design notes describe (§9, "Handshake
    /// retry across reconnect") — `MtprotoHandshake` does not expose a way
    /// to resume mid-flight from outside its own state machine, so the
    /// cheaper, still-correct behavior is a clean restart each attempt
    /// rather than threading that state through this orchestrator.
    /// [`DcManagerError::AlreadyInFlight`] and handshake-protocol errors
    /// (bad nonce, bad DH params, ...) are not retried here: the former
    /// means another caller already owns this attempt, and the latter is a
    /// validation failure a reconnect can't fix.
    pub async fn establish_with_retry(
        &self,
        dc_id: DcId,
        option: &DcOption,
        kind: HandshakeKind,
        rsa_keys: Vec<RsaKey>,
        max_attempts: u32,
    ) -> Result<HandshakeOutcome, DcManagerError> {
        let mut delay = std::time::Duration::from_millis(50);
        let max_delay = std::time::Duration::from_millis(400);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.establish(dc_id, option, kind, rsa_keys.clone()).await {
                Ok(outcome) => return Ok(outcome),
                Err(err @ DcManagerError::AlreadyInFlight { .. }) => return Err(err),
                Err(DcManagerError::Handshake(HandshakeDriverError::Transport(msg)))
                    if attempt < max_attempts =>
                {
                    tracing::warn!(
                        "handshake transport error on dc {:?} (attempt {}/{}): {}",
                        dc_id,
                        attempt,
                        max_attempts,
                        msg
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, max_delay);
                }
                Err(
                    err @ DcManagerError::Handshake(HandshakeDriverError::UnexpectedReadResult),
                ) if attempt < max_attempts => {
                    tracing::warn!(
                        "handshake stream dropped on dc {:?} (attempt {}/{}): {}",
                        dc_id,
                        attempt,
                        max_attempts,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, max_delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
