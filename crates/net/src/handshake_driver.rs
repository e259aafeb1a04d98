// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Drives a [`crate::handshake::MtprotoHandshake`] to completion over a real
//! [`crate::transport::TcpTransport`], then installs the resulting key.
//!
//! This is the glue for the key-setup data flow: a Datacenter detects a
//! missing/expired auth key, starts a Handshake over the same Connection
//! used for generic traffic (but with `auth_key_id == 0` sentinel), and on
//! success installs the key into the Datacenter.
//! [`crate::handshake::MtprotoHandshake`] only knows how to
//! react to bytes handed to it; something has to own the socket, push
//! `Send(bytes)` onto the wire, and feed the next response back in. That is
//! all this module does — no handshake math lives here, only the
//! read/write/on_message loop.

use std::net::SocketAddr;

use rand::Rng;
use thiserror::Error;

use crate::auth::AuthKey;
use crate::crypto::compute_auth_key_id;
use crate::dc::{DcId, DcOption};
use crate::dc_auth::{DcAuthError, DcAuthKeyStorage};
use crate::delegate::{Delegate, HandshakeKind};
use crate::handshake::{HandshakeAction, HandshakeError, HandshakeMode, MtprotoHandshake};
use crate::packet::{MessageIdGenerator, PacketInfo};
use crate::rsa_key_shared::RsaKey;
use crate::transport::{DefaultTransportWriter, ReadResult, TcpTransport, TransportWrite};
use rustgram_types::{AuthBindTempAuthKey, TlSerialize};

/// `bool_true#997275b5 = Bool;`
const BOOL_TRUE_CONSTRUCTOR: u32 = 0x997275b5;
/// `bool_false#bc799737 = Bool;`
const BOOL_FALSE_CONSTRUCTOR: u32 = 0xbc799737;
/// `rpc_result#f35c6d01 req_msg_id:long result:Object = RpcResult;`
const RPC_RESULT_CONSTRUCTOR: u32 = 0xf35c6d01;

/// How much earlier than the server-communicated expiry a temp key is
/// considered unusable, to absorb clock skew and in-flight latency before
/// the server itself rejects it.
const TEMP_KEY_EXPIRE_LEEWAY_SECS: i32 = 15;

/// Outcome of a completed handshake: the raw key material, its derived id,
/// the negotiated server salt, and the client/server clock offset.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    /// 256-byte shared secret.
    pub auth_key: Vec<u8>,
    /// Low 64 bits of `SHA1(auth_key)[12..20]`.
    pub auth_key_id: u64,
    /// Initial server salt derived from the nonces.
    pub server_salt: u64,
    /// `server_time - wall_clock_time`, seconds.
    pub time_difference: i32,
}

/// Errors raised while driving a handshake end to end.
#[derive(Debug, Error)]
pub enum HandshakeDriverError {
    /// The handshake state machine rejected a step.
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// The transport failed to connect, read, or write.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server closed the stream or sent a non-packet reply
    /// (`Nop`/`Error`/`QuickAck`) where a handshake response was expected.
    #[error("unexpected transport read result while handshaking")]
    UnexpectedReadResult,

    /// The auth key produced was not exactly 256 bytes.
    #[error("auth key has unexpected length {0} (expected 256)")]
    BadKeyLength(usize),

    /// The completed key could not be installed into storage.
    #[error("failed to store handshake result: {0}")]
    Storage(#[from] DcAuthError),

    /// A temp handshake reached `PendingBind` but no permanent key was
    /// supplied to bind against.
    #[error("temp handshake produced a pending key but no permanent auth key was provided to bind it to")]
    MissingPermanentAuthKey,

    /// The `auth.bindTempAuthKey` response could not be decoded as
    /// `bool_true`/`bool_false`, optionally wrapped in `rpc_result`.
    #[error("malformed auth.bindTempAuthKey response: {0}")]
    BindResponse(String),
}

/// Maps the kind of key a handshake is producing onto the handshake state
/// machine's notion of mode: only the permanent key uses the non-expiring
/// `Main` mode, both PFS-rotated temp keys use `Temp`.
pub fn handshake_mode_for_kind(kind: HandshakeKind) -> HandshakeMode {
    match kind {
        HandshakeKind::Permanent => HandshakeMode::Main,
        HandshakeKind::TempGeneric | HandshakeKind::TempMedia => HandshakeMode::Temp,
    }
}

/// Runs a handshake against `option` and installs the resulting key into
/// `storage`, keyed by `option.dc_id`.
///
/// A `Datacenter` that notices it has no key for a given `kind` calls this
/// instead of driving [`run_handshake`] and the storage write separately.
/// `storage` is left untouched on any failure — the caller decides
/// whether/how to retry.
pub async fn establish_auth_key(
    option: &DcOption,
    kind: HandshakeKind,
    rsa_keys: Vec<RsaKey>,
    delegate: &dyn Delegate,
    storage: &mut DcAuthKeyStorage,
) -> Result<HandshakeOutcome, HandshakeDriverError> {
    let addr = SocketAddr::new(option.ip_address, option.port);
    let mode = handshake_mode_for_kind(kind);

    // Temp keys must bind to the already-established permanent key
    // (§4.5 step 5); load it from storage before driving the DH exchange so
    // a missing perm key fails fast instead of after a wasted round trip.
    let perm_auth_key = if matches!(mode, HandshakeMode::Temp) {
        let perm = storage
            .load_key(option.dc_id, HandshakeKind::Permanent)
            .map_err(|_| HandshakeDriverError::MissingPermanentAuthKey)?;
        Some((perm.id, perm.key))
    } else {
        None
    };

    let outcome = run_handshake(
        addr,
        option.dc_id,
        mode,
        kind,
        rsa_keys,
        option.secret.clone(),
        perm_auth_key,
        delegate,
    )
    .await?;

    // Mirrors `MtprotoHandshake::new`'s own default: temp keys live 24h.
    let key = match mode {
        HandshakeMode::Main => AuthKey::new(outcome.auth_key_id, outcome.auth_key.clone()),
        HandshakeMode::Temp => AuthKey::temporary(
            outcome.auth_key_id,
            outcome.auth_key.clone(),
            std::time::Instant::now() + std::time::Duration::from_secs(86_400),
        ),
    };
    storage.store_key(option.dc_id, kind, &key)?;

    Ok(outcome)
}

/// Runs the full `req_pq_multi → req_DH_params → set_client_DH_params`
/// exchange against `addr`, returning the installed key material.
///
/// `obfuscation_secret`, if present, is passed to
/// [`TcpTransport::with_obfuscation`] before connecting, so the very first
/// bytes on the wire are the obfuscated-transport header rather than the
/// plain handshake request — mirroring how a real DC connection negotiates
/// transport obfuscation before any MTProto traffic (including the
/// handshake itself) is exchanged. On success, `delegate.on_handshake_complete`
/// is invoked before returning.
pub async fn run_handshake(
    addr: SocketAddr,
    dc_id: DcId,
    mode: HandshakeMode,
    kind: HandshakeKind,
    rsa_keys: Vec<RsaKey>,
    obfuscation_secret: Option<Vec<u8>>,
    perm_auth_key: Option<(u64, Vec<u8>)>,
    delegate: &dyn Delegate,
) -> Result<HandshakeOutcome, HandshakeDriverError> {
    let mut transport = TcpTransport::new(addr);
    if let Some(secret) = obfuscation_secret {
        transport = transport.with_obfuscation(secret, dc_id.get_raw_id());
    }
    transport
        .connect()
        .await
        .map_err(|e| HandshakeDriverError::Transport(e.to_string()))?;

    let mut handshake = MtprotoHandshake::new(dc_id, mode, rsa_keys);

    // The handshake runs over the plaintext (auth_key_id == 0) framing: pass
    // `None` for `auth_key` on every read/write so the transport writes a
    // `NoCryptoHeader` rather than an encrypted envelope.
    let mut action = handshake.start()?;
    loop {
        match action {
            HandshakeAction::Send(bytes) => {
                transport
                    .write(&bytes, None)
                    .await
                    .map_err(|e| HandshakeDriverError::Transport(e.to_string()))?;

                let response = transport
                    .read(None)
                    .await
                    .map_err(|e| HandshakeDriverError::Transport(e.to_string()))?;

                let body = match response {
                    ReadResult::Packet(bytes) => bytes,
                    _ => return Err(HandshakeDriverError::UnexpectedReadResult),
                };

                action = handshake.on_message(&body)?;
            }
            HandshakeAction::Wait => {
                let response = transport
                    .read(None)
                    .await
                    .map_err(|e| HandshakeDriverError::Transport(e.to_string()))?;

                let body = match response {
                    ReadResult::Packet(bytes) => bytes,
                    _ => return Err(HandshakeDriverError::UnexpectedReadResult),
                };

                action = handshake.on_message(&body)?;
            }
            HandshakeAction::PendingBind(temp_auth_key, _server_salt) => {
                let (perm_key_id, perm_key) = perm_auth_key
                    .clone()
                    .ok_or(HandshakeDriverError::MissingPermanentAuthKey)?;

                let success =
                    bind_temp_auth_key(&mut transport, &handshake, &temp_auth_key, perm_key_id, &perm_key)
                        .await?;

                action = handshake.on_bind_result(success)?;
            }
            HandshakeAction::Complete(auth_key, server_salt) => {
                let _ = transport.close().await;

                let key_array: [u8; 256] = auth_key
                    .clone()
                    .try_into()
                    .map_err(|v: Vec<u8>| HandshakeDriverError::BadKeyLength(v.len()))?;
                let auth_key_id = compute_auth_key_id(&key_array);
                let time_difference = handshake.time_difference();

                delegate.on_handshake_complete(dc_id, kind, time_difference);

                return Ok(HandshakeOutcome {
                    auth_key,
                    auth_key_id,
                    server_salt,
                    time_difference,
                });
            }
        }
    }
}

/// Drives a single `auth.bindTempAuthKey` round trip over `transport`,
/// which must already be connected and past the DH exchange for
/// `handshake` (state [`crate::handshake::HandshakeState::Bind`]).
///
/// Builds `bind_auth_key_inner` and encrypts it with the permanent key as a
/// message in a nested session (`temp_session_id`), embeds it as
/// `auth.bindTempAuthKey`'s `encrypted_message`, and sends the RPC itself
/// encrypted with the pending temp key. Returns whether the server answered
/// `bool_true`.
async fn bind_temp_auth_key(
    transport: &mut TcpTransport,
    handshake: &MtprotoHandshake,
    temp_auth_key: &[u8],
    perm_auth_key_id: u64,
    perm_auth_key: &[u8],
) -> Result<bool, HandshakeDriverError> {
    let temp_key_array: [u8; 256] = temp_auth_key
        .to_vec()
        .try_into()
        .map_err(|v: Vec<u8>| HandshakeDriverError::BadKeyLength(v.len()))?;
    let perm_key_array: [u8; 256] = perm_auth_key
        .to_vec()
        .try_into()
        .map_err(|v: Vec<u8>| HandshakeDriverError::BadKeyLength(v.len()))?;

    let temp_auth_key_id = compute_auth_key_id(&temp_key_array);
    let temp_session_id: i64 = rand::thread_rng().gen();

    let wall_time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let server_time = wall_time + handshake.time_difference() as f64;
    let expires_at = wall_time as i32 + handshake.time_difference() + 86_400 - TEMP_KEY_EXPIRE_LEEWAY_SECS;

    let (nonce, inner_bytes) = handshake.build_bind_inner(
        temp_auth_key_id as i64,
        perm_auth_key_id as i64,
        temp_session_id,
        expires_at,
    )?;

    // Inner payload: encrypted with the permanent key, as if it were a
    // message sent over a fresh, nested session.
    let msg_id_gen = MessageIdGenerator::new();
    let writer = DefaultTransportWriter::new();
    let mut inner_packet_info = PacketInfo::new()
        .with_session_id(temp_session_id as u64)
        .with_message_id(msg_id_gen.next(server_time))
        .with_seq_no(0);
    let encrypted_message = writer
        .write(&inner_bytes, Some(&perm_key_array), &mut inner_packet_info)
        .map_err(|e| HandshakeDriverError::Transport(e.to_string()))?;

    let request = AuthBindTempAuthKey::new(
        perm_auth_key_id as i64,
        nonce,
        expires_at,
        encrypted_message,
    );
    let mut outer_body = bytes::BytesMut::new();
    request
        .serialize_tl(&mut outer_body)
        .map_err(|e| HandshakeDriverError::Transport(format!("serialization failed: {}", e)))?;

    // Outer envelope: encrypted with the pending temp key, over the real
    // connection (`transport` already owns the socket from the DH exchange).
    transport
        .write(&outer_body, Some(&temp_key_array))
        .await
        .map_err(|e| HandshakeDriverError::Transport(e.to_string()))?;

    let response = transport
        .read(Some(&temp_key_array))
        .await
        .map_err(|e| HandshakeDriverError::Transport(e.to_string()))?;

    let body = match response {
        ReadResult::Packet(bytes) => bytes,
        _ => return Err(HandshakeDriverError::UnexpectedReadResult),
    };

    parse_bind_bool_result(&body)
}

/// Decodes an `auth.bindTempAuthKey` response body as `Bool`, unwrapping a
/// surrounding `rpc_result` if present.
fn parse_bind_bool_result(body: &[u8]) -> Result<bool, HandshakeDriverError> {
    if body.len() < 4 {
        return Err(HandshakeDriverError::BindResponse(
            "response shorter than a constructor id".into(),
        ));
    }

    let constructor = u32::from_le_bytes(body[0..4].try_into().expect("checked length"));
    let bool_body = if constructor == RPC_RESULT_CONSTRUCTOR {
        // rpc_result#f35c6d01 req_msg_id:long result:Object
        body.get(12..)
            .ok_or_else(|| HandshakeDriverError::BindResponse("rpc_result truncated".into()))?
    } else {
        body
    };

    if bool_body.len() < 4 {
        return Err(HandshakeDriverError::BindResponse(
            "Bool payload shorter than a constructor id".into(),
        ));
    }
    let bool_constructor = u32::from_le_bytes(bool_body[0..4].try_into().expect("checked length"));
    match bool_constructor {
        BOOL_TRUE_CONSTRUCTOR => Ok(true),
        BOOL_FALSE_CONSTRUCTOR => Ok(false),
        other => Err(HandshakeDriverError::BindResponse(format!(
            "unexpected constructor 0x{:08x}",
            other
        ))),
    }
}
