// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Per-DC address rotation and server-salt bookkeeping.
//!
//! Ports TDLib's `tgnet::Datacenter::nextAddressOrPort`/`getCurrentPort`
//! address-cursor algorithm and its server-salt merge/selection logic
//! (`Datacenter.cpp`'s `mergeServerSalts`/`getCurrentSalt` equivalents) from
//! `examples/original_source/TMessagesProj/jni/tgnet/Datacenter.cpp`. Neither
//! piece previously had a home in this crate: [`crate::dc`] only models the
//! address *table* (`DcOption`/`DcOptions`), and [`crate::auth::ServerSalt`]
//! only models a single salt's own validity window, not the list-level
//! merge/prune/select behavior a per-DC owner needs.

use std::cmp::Ordering;

/// The four default ports tried in rotation; `-1` means "use the address's
/// own port field" rather than a literal port number.
pub const DEFAULT_PORTS: [i32; 4] = [443, 80, 5222, -1];

/// Which per-DC address list a rotation cursor tracks: `ipv4`, `ipv6`,
/// `ipv4_download`, `ipv6_download`; the source's fifth, bootstrap-only
/// `addressesIpv4Temp` list is handled the same way rather than getting a
/// fifth variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressListKind {
    /// Plain IPv4 addresses.
    Ipv4,
    /// Plain IPv6 addresses.
    Ipv6,
    /// IPv4 addresses reserved for media/download traffic.
    Ipv4Download,
    /// IPv6 addresses reserved for media/download traffic.
    Ipv6Download,
}

/// One entry in a per-DC address list: enough of `TcpAddress` for rotation
/// and port-selection purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatingAddress {
    /// Host or literal IP.
    pub address: String,
    /// The address's own port, used when the rotating port slot is `-1` or
    /// the address carries a secret.
    pub port: u16,
    /// `true` if this address must never have its port rotated (a pinned,
    /// known-good endpoint).
    pub is_static: bool,
    /// Obfuscation secret, if this address requires one. A non-empty
    /// secret forces the address's own port regardless of rotation state,
    /// mirroring `getCurrentPort`'s `!address->secret.empty()` check.
    pub secret: Option<Vec<u8>>,
}

impl RotatingAddress {
    /// Creates a plain address with no secret.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            is_static: false,
            secret: None,
        }
    }

    /// Marks the address as static (port never rotates).
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Attaches an obfuscation secret.
    pub fn with_secret(mut self, secret: Vec<u8>) -> Self {
        self.secret = Some(secret);
        self
    }
}

/// The rotating `(addr_idx, port_idx)` cursor for one address list.
///
/// `next()` advances port-first, address-second, exactly as
/// `Datacenter::nextAddressOrPort` does: a static current address skips
/// port rotation entirely and always advances the address index instead;
/// otherwise the port index increments and only wraps (resetting to 0 and
/// advancing the address index) once it reaches [`DEFAULT_PORTS`]'s length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressCursor {
    /// Index into the address list.
    pub addr_idx: usize,
    /// Index into [`DEFAULT_PORTS`].
    pub port_idx: usize,
}

impl AddressCursor {
    /// A fresh cursor at `(0, 0)`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the port to use right now for `addresses[self.addr_idx]`.
    ///
    /// An out-of-range `addr_idx` (an empty list, or a cursor left stale
    /// after the list shrank) returns `None` rather than panicking.
    pub fn current_port(&self, addresses: &[RotatingAddress]) -> Option<u16> {
        let address = addresses.get(self.addr_idx)?;
        if address.secret.is_some() {
            return Some(address.port);
        }
        match DEFAULT_PORTS[self.port_idx] {
            -1 => Some(address.port),
            p => Some(p as u16),
        }
    }

    /// Returns the current address, or `None` if the cursor is stale.
    pub fn current_address<'a>(
        &self,
        addresses: &'a [RotatingAddress],
    ) -> Option<&'a RotatingAddress> {
        addresses.get(self.addr_idx)
    }

    /// Advances the cursor to the next `(addr_idx, port_idx)` pair.
    ///
    /// A cursor pointing past the end of `addresses` (empty list) simply
    /// resets to `(0, 0)`.
    pub fn advance(&mut self, addresses: &[RotatingAddress]) {
        if addresses.is_empty() {
            *self = Self::default();
            return;
        }

        let current_is_static = addresses
            .get(self.addr_idx)
            .map(|a| a.is_static)
            .unwrap_or(false);

        if !current_is_static && self.port_idx + 1 < DEFAULT_PORTS.len() {
            self.port_idx += 1;
            return;
        }

        self.port_idx = 0;
        if self.addr_idx + 1 < addresses.len() {
            self.addr_idx += 1;
        } else {
            self.addr_idx = 0;
        }
    }
}

/// A `{ valid_since, valid_until, salt }` entry — distinct from
/// [`crate::auth::ServerSalt`], which only tracks a single salt's own
/// validity and has no `valid_until` or list-level merge/prune semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcSalt {
    /// Start of the validity window, inclusive (server UNIX seconds).
    pub valid_since: i32,
    /// End of the validity window, exclusive.
    pub valid_until: i32,
    /// The salt value itself.
    pub salt: i64,
}

/// An ordered, deduplicated collection of [`DcSalt`]s for one DC.
///
/// Grounded on `Datacenter.cpp`'s salt handling inside
/// `processServerConfig`/`updateServerSalt`: new salts merge by value,
/// expired entries are dropped, and the active salt is whichever
/// candidate's window contains "now" and has the longest remaining
/// lifetime.
#[derive(Debug, Clone, Default)]
pub struct SaltList {
    salts: Vec<DcSalt>,
}

impl SaltList {
    /// An empty salt list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the salts currently held, ordered by `valid_since`.
    pub fn salts(&self) -> &[DcSalt] {
        &self.salts
    }

    /// Merges `incoming` salts into the list.
    ///
    /// Dedups by `salt` value (an incoming entry with a salt already
    /// present is ignored rather than overwriting it; `future_salts`
    /// responses are themselves already internally deduplicated by the
    /// server), drops anything already expired against `now`, and keeps
    /// the result ordered by `valid_since`.
    pub fn merge(&mut self, incoming: &[DcSalt], now: i32) {
        for candidate in incoming {
            if candidate.valid_until < now {
                continue;
            }
            if self.salts.iter().any(|s| s.salt == candidate.salt) {
                continue;
            }
            self.salts.push(*candidate);
        }
        self.salts.sort_by_key(|s| s.valid_since);
    }

    /// Removes every salt whose window has already ended as of `now`.
    pub fn prune_expired(&mut self, now: i32) {
        self.salts.retain(|s| s.valid_until >= now);
    }

    /// Selects the active salt for `now`: among candidates whose
    /// `[valid_since, valid_until)` contains `now`, the one with the
    /// greatest `valid_until - now` (longest remaining lifetime wins;
    /// ties keep the earlier-inserted — i.e. earlier `valid_since` —
    /// candidate, since `merge` keeps the list sorted by `valid_since`
    /// and this is a stable `max_by_key` scan).
    ///
    /// Expired entries are pruned as a side effect of selection.
    pub fn select(&mut self, now: i32) -> Option<i64> {
        self.prune_expired(now);

        self.salts
            .iter()
            .filter(|s| s.valid_since <= now && now < s.valid_until)
            .max_by(|a, b| {
                let remaining_a = a.valid_until - now;
                let remaining_b = b.valid_until - now;
                remaining_a.cmp(&remaining_b).then(Ordering::Greater)
            })
            .map(|s| s.salt)
    }
}

/// Which of a DC's key slots [`select_auth_key`] resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKeySlot {
    /// The permanent, user-bound key.
    Permanent,
    /// The active PFS temp key used for generic traffic.
    TempGeneric,
    /// The active PFS temp key used for media traffic.
    TempMedia,
    /// A pending (not-yet-bound) temp key, generic or media depending on
    /// `is_media`.
    TempPending,
}

/// Implements the auth-key-slot "Key lookup" algorithm:
///
/// 1. If CDN or `want_perm`: the permanent key.
/// 2. Else if this is a media connection and the DC has a media address:
///    the media temp key.
/// 3. Else: the generic temp key.
/// 4. If `allow_pending` is set and a pending temp key of the selected
///    kind exists, prefer it over the active one.
///
/// Returns `None` only when the selected slot's key is genuinely absent
/// (caller must then start a [`crate::handshake`] of the corresponding
/// kind before sending anything on this connection).
#[allow(clippy::too_many_arguments)]
pub fn select_auth_key(
    is_cdn: bool,
    want_perm: bool,
    is_media_connection: bool,
    has_media_address: bool,
    allow_pending: bool,
    has_perm: bool,
    has_temp_generic: bool,
    has_temp_media: bool,
    has_pending: bool,
) -> Option<AuthKeySlot> {
    if is_cdn || want_perm {
        return has_perm.then_some(AuthKeySlot::Permanent);
    }

    let media = is_media_connection && has_media_address;

    if allow_pending && has_pending {
        return Some(AuthKeySlot::TempPending);
    }

    if media {
        has_temp_media.then_some(AuthKeySlot::TempMedia)
    } else {
        has_temp_generic.then_some(AuthKeySlot::TempGeneric)
    }
}

/// Owning aggregate for one DC's rotating addresses and server salts.
///
/// This is the piece that was still missing after the cursor/salt
/// algorithms above were written: something that actually holds a
/// `Vec<RotatingAddress>` per [`AddressListKind`] together with its own
/// [`AddressCursor`], plus the DC's [`SaltList`], the way
/// `Datacenter.cpp`'s `Datacenter` class holds `addressesIpv4`/
/// `addressesIpv6`/`addressesIpv4Download`/`addressesIpv6Download` and
/// their matching `currentAddressNumIpv4`/... cursors side by side with
/// `serverSalts`.
#[derive(Debug, Clone, Default)]
pub struct Datacenter {
    lists: std::collections::HashMap<AddressListKind, (Vec<RotatingAddress>, AddressCursor)>,
    salts: SaltList,
}

impl Datacenter {
    /// An empty datacenter with no addresses or salts yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the address list for `kind`, resetting its cursor to the
    /// origin. Called whenever fresh `DcOption`s arrive from config.
    pub fn set_addresses(&mut self, kind: AddressListKind, addresses: Vec<RotatingAddress>) {
        self.lists.insert(kind, (addresses, AddressCursor::new()));
    }

    /// The `(address, port)` to dial right now for `kind`, or `None` if no
    /// addresses are known for that list.
    pub fn current_target(&self, kind: AddressListKind) -> Option<(&RotatingAddress, u16)> {
        let (addresses, cursor) = self.lists.get(&kind)?;
        let address = cursor.current_address(addresses)?;
        let port = cursor.current_port(addresses)?;
        Some((address, port))
    }

    /// Advances past a failed connection attempt on `kind`'s current
    /// target: on connection failure, advance the cursor and retry.
    pub fn advance(&mut self, kind: AddressListKind) {
        if let Some((addresses, cursor)) = self.lists.get_mut(&kind) {
            cursor.advance(addresses);
        }
    }

    /// Merges freshly received salts (e.g. from a `future_salts` response
    /// or a `bad_server_salt` notification) into this DC's salt list.
    pub fn merge_salts(&mut self, incoming: &[DcSalt], now: i32) {
        self.salts.merge(incoming, now);
    }

    /// The active salt to stamp on the next outgoing message, if any.
    pub fn current_salt(&mut self, now: i32) -> Option<i64> {
        self.salts.select(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(is_static: bool) -> RotatingAddress {
        let a = RotatingAddress::new("1.2.3.4", 443);
        if is_static {
            a.with_static()
        } else {
            a
        }
    }

    #[test]
    fn rotation_cycles_port_then_address_then_wraps() {
        // 2 addresses, 4 default ports, starting at (0,0): (0,1),(0,2),
        // (0,3),(1,0),(1,1),...,(1,3),(0,0).
        let addresses = vec![addr(false), addr(false)];
        let mut cursor = AddressCursor::new();

        let mut seen = Vec::new();
        for _ in 0..8 {
            cursor.advance(&addresses);
            seen.push((cursor.addr_idx, cursor.port_idx));
        }

        assert_eq!(
            seen,
            vec![
                (0, 1),
                (0, 2),
                (0, 3),
                (1, 0),
                (1, 1),
                (1, 2),
                (1, 3),
                (0, 0),
            ]
        );
    }

    #[test]
    fn static_address_never_rotates_port() {
        let addresses = vec![addr(true), addr(false)];
        let mut cursor = AddressCursor::new();

        cursor.advance(&addresses);
        // Current address (idx 0) is static: port never advances, only
        // the address index does.
        assert_eq!(cursor, AddressCursor { addr_idx: 1, port_idx: 0 });
    }

    #[test]
    fn current_port_uses_address_port_for_minus_one_slot() {
        let addresses = vec![RotatingAddress::new("1.2.3.4", 8443)];
        let cursor = AddressCursor {
            addr_idx: 0,
            port_idx: 3, // DEFAULT_PORTS[3] == -1
        };
        assert_eq!(cursor.current_port(&addresses), Some(8443));
    }

    #[test]
    fn current_port_uses_default_port_otherwise() {
        let addresses = vec![RotatingAddress::new("1.2.3.4", 8443)];
        let cursor = AddressCursor {
            addr_idx: 0,
            port_idx: 0,
        };
        assert_eq!(cursor.current_port(&addresses), Some(443));
    }

    #[test]
    fn address_with_secret_forces_its_own_port() {
        let addresses = vec![RotatingAddress::new("1.2.3.4", 9999).with_secret(vec![1, 2, 3])];
        let cursor = AddressCursor {
            addr_idx: 0,
            port_idx: 0,
        };
        assert_eq!(cursor.current_port(&addresses), Some(9999));
    }

    #[test]
    fn empty_list_advance_resets_to_origin() {
        let mut cursor = AddressCursor {
            addr_idx: 3,
            port_idx: 2,
        };
        cursor.advance(&[]);
        assert_eq!(cursor, AddressCursor::new());
    }

    #[test]
    fn salt_selection_picks_longest_remaining_window() {
        let mut salts = SaltList::new();
        salts.merge(
            &[
                DcSalt { valid_since: 0, valid_until: 100, salt: 1 },
                DcSalt { valid_since: 0, valid_until: 500, salt: 2 },
                DcSalt { valid_since: 0, valid_until: 300, salt: 3 },
            ],
            0,
        );

        assert_eq!(salts.select(50), Some(2));
    }

    #[test]
    fn salt_selection_never_returns_expired_entry() {
        let mut salts = SaltList::new();
        salts.merge(&[DcSalt { valid_since: 0, valid_until: 100, salt: 1 }], 0);

        assert_eq!(salts.select(200), None);
    }

    #[test]
    fn salt_selection_prunes_expired_entries_as_a_side_effect() {
        let mut salts = SaltList::new();
        salts.merge(
            &[
                DcSalt { valid_since: 0, valid_until: 100, salt: 1 },
                DcSalt { valid_since: 0, valid_until: 500, salt: 2 },
            ],
            0,
        );

        assert_eq!(salts.salts().len(), 2);
        salts.select(200);
        // Salt 1 expired at 100 < 200 and must be pruned even though
        // salt 2 was the one returned.
        assert_eq!(salts.salts().len(), 1);
        assert_eq!(salts.salts()[0].salt, 2);
    }

    #[test]
    fn merge_dedups_by_salt_value() {
        let mut salts = SaltList::new();
        salts.merge(&[DcSalt { valid_since: 0, valid_until: 100, salt: 1 }], 0);
        salts.merge(
            &[
                DcSalt { valid_since: 0, valid_until: 999, salt: 1 },
                DcSalt { valid_since: 0, valid_until: 200, salt: 4 },
            ],
            0,
        );

        assert_eq!(salts.salts().len(), 2);
        let first = salts.salts().iter().find(|s| s.salt == 1).unwrap();
        // The original entry's window wins; the duplicate incoming one
        // was ignored rather than overwriting it.
        assert_eq!(first.valid_until, 100);
    }

    #[test]
    fn merge_drops_already_expired_incoming_salts() {
        let mut salts = SaltList::new();
        salts.merge(
            &[DcSalt { valid_since: 0, valid_until: 50, salt: 1 }],
            100,
        );
        assert!(salts.salts().is_empty());
    }

    #[test]
    fn key_lookup_prefers_perm_for_cdn_regardless_of_other_slots() {
        let slot = select_auth_key(true, false, false, false, false, true, true, true, true);
        assert_eq!(slot, Some(AuthKeySlot::Permanent));
    }

    #[test]
    fn key_lookup_prefers_perm_when_want_perm_set() {
        let slot = select_auth_key(false, true, false, false, false, true, true, true, false);
        assert_eq!(slot, Some(AuthKeySlot::Permanent));
    }

    #[test]
    fn key_lookup_falls_back_to_generic_temp() {
        let slot = select_auth_key(false, false, false, false, false, true, true, true, false);
        assert_eq!(slot, Some(AuthKeySlot::TempGeneric));
    }

    #[test]
    fn key_lookup_prefers_media_temp_for_media_connection_with_media_address() {
        let slot = select_auth_key(false, false, true, true, false, true, true, true, false);
        assert_eq!(slot, Some(AuthKeySlot::TempMedia));
    }

    #[test]
    fn key_lookup_media_connection_without_media_address_uses_generic() {
        let slot = select_auth_key(false, false, true, false, false, true, true, true, false);
        assert_eq!(slot, Some(AuthKeySlot::TempGeneric));
    }

    #[test]
    fn key_lookup_prefers_pending_when_allowed_and_present() {
        let slot = select_auth_key(false, false, false, false, true, true, true, true, true);
        assert_eq!(slot, Some(AuthKeySlot::TempPending));
    }

    #[test]
    fn key_lookup_ignores_pending_when_not_allowed() {
        let slot = select_auth_key(false, false, false, false, false, true, true, true, true);
        assert_eq!(slot, Some(AuthKeySlot::TempGeneric));
    }

    #[test]
    fn key_lookup_returns_none_when_selected_slot_is_empty() {
        let slot = select_auth_key(false, false, false, false, false, true, false, false, false);
        assert_eq!(slot, None);
    }

    #[test]
    fn datacenter_tracks_independent_cursors_per_list_kind() {
        let mut dc = Datacenter::new();
        dc.set_addresses(
            AddressListKind::Ipv4,
            vec![RotatingAddress::new("1.1.1.1", 443), RotatingAddress::new("2.2.2.2", 443)],
        );
        dc.set_addresses(
            AddressListKind::Ipv4Download,
            vec![RotatingAddress::new("3.3.3.3", 443)],
        );

        let (addr, port) = dc.current_target(AddressListKind::Ipv4).unwrap();
        assert_eq!(addr.address, "1.1.1.1");
        assert_eq!(port, 443);

        dc.advance(AddressListKind::Ipv4);
        let (addr, port) = dc.current_target(AddressListKind::Ipv4).unwrap();
        assert_eq!(addr.address, "1.1.1.1");
        assert_eq!(port, 80);

        // The download list's cursor is untouched by advancing Ipv4.
        let (addr, port) = dc.current_target(AddressListKind::Ipv4Download).unwrap();
        assert_eq!(addr.address, "3.3.3.3");
        assert_eq!(port, 443);
    }

    #[test]
    fn datacenter_with_no_addresses_returns_none() {
        let dc = Datacenter::new();
        assert_eq!(dc.current_target(AddressListKind::Ipv6), None);
    }

    #[test]
    fn datacenter_merges_and_selects_salts() {
        let mut dc = Datacenter::new();
        dc.merge_salts(
            &[DcSalt { valid_since: 0, valid_until: 100, salt: 7 }],
            0,
        );
        assert_eq!(dc.current_salt(50), Some(7));
        assert_eq!(dc.current_salt(200), None);
    }
}
