// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! MTProto session connection.
//!
//! This module implements TDLib's SessionConnection from `td/telegram/net/Session.h`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::auth::{AuthDataShared, AuthKeyState};
use crate::connection::ConnectionError;
use crate::dc::DcId;
use crate::dc_manager::DcManager;
use crate::mtproto_header::MtprotoHeaderOptions;
use crate::packet::{MessageIdGenerator, PacketInfo};
use crate::query::NetQuery;
use crate::query_wrappers::{self, DEFAULT_LAYER};
use crate::transport::{DefaultTransportWriter, TransportWrite, WriteOptions};

use super::packets::ServicePacket;
use super::ping::{PingConfig, PingManager};
use super::query::QueryLifecycle;
use super::{SessionState, SessionStatistics};

/// Default MTProto timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Session connection configuration.
#[derive(Debug, Clone)]
pub struct SessionConnectionConfig {
    /// DC ID
    pub dc_id: DcId,

    /// Whether to use PFS (Perfect Forward Secrecy)
    pub use_pfs: bool,

    /// Whether this is a main session
    pub is_main: bool,

    /// Whether this is a CDN session
    pub is_cdn: bool,

    /// Transport write options
    pub write_options: WriteOptions,

    /// Ping configuration
    pub ping_config: PingConfig,

    /// Query timeout
    pub query_timeout: Duration,
}

impl Default for SessionConnectionConfig {
    fn default() -> Self {
        Self {
            dc_id: DcId::internal(2),
            use_pfs: true,
            is_main: false,
            is_cdn: false,
            write_options: WriteOptions::default(),
            ping_config: PingConfig::default(),
            query_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SessionConnectionConfig {
    /// Creates a new configuration.
    pub fn new(dc_id: DcId) -> Self {
        Self {
            dc_id,
            ..Default::default()
        }
    }
}

/// Session connection events.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Connection state changed
    StateChanged(SessionState),

    /// Auth key state changed
    AuthKeyChanged(AuthKeyState),

    /// Query completed
    QueryCompleted(u64), // Query ID

    /// Error occurred
    Error(String),
}

/// A fully encrypted, wire-ready packet along with the message id it was
/// allocated under, so the caller can register it for response matching.
struct OutgoingPacket {
    bytes: Bytes,
    message_id: u64,
}

/// MTProto session connection.
///
/// Manages a single MTProto session with a Telegram DC.
pub struct SessionConnection {
    /// Configuration
    config: SessionConnectionConfig,

    /// Auth data
    auth_data: Arc<AuthDataShared>,

    /// Connection state
    state: Arc<AtomicU8>,

    /// Network generation (incremented on reconnect)
    network_generation: Arc<AtomicU32>,

    /// Session ID
    session_id: Arc<AtomicU64>,

    /// Event sender
    event_sender: mpsc::UnboundedSender<SessionEvent>,

    /// Query sender
    query_sender: mpsc::UnboundedSender<NetQuery>,

    /// Active queries (message_id -> query)
    active_queries: Arc<Mutex<HashMap<u64, NetQuery>>>,

    /// Query lifecycle manager
    query_lifecycle: Arc<QueryLifecycle>,

    /// Ping manager
    ping_manager: Arc<Mutex<PingManager>>,

    /// Statistics
    statistics: Arc<Mutex<SessionStatistics>>,

    /// Stop flag
    stop_flag: Arc<AtomicBool>,

    /// `DcManager` that owns this session's DC address/salt state, if one
    /// has been attached. `bad_server_salt` notifications are forwarded to
    /// it so the next outgoing packet on this DC picks up the new salt.
    dc_manager: Option<Arc<DcManager>>,

    /// Allocates strictly increasing, session-unique outgoing message ids
    /// (§3's `MessageId` invariant).
    message_id_generator: Arc<MessageIdGenerator>,

    /// Device/API metadata carried by the session's first outgoing query
    /// (wrapped in `initConnection`, see `query_wrappers::first_query`).
    header_options: MtprotoHeaderOptions,

    /// Set once the session has wrapped and sent its first query; every
    /// later query goes out bare (no `invokeWithLayer`/`initConnection`
    /// wrapper).
    first_query_sent: Arc<AtomicBool>,

    /// Wire-ready (`auth_key_id | msg_key | ciphertext`) bytes produced by
    /// `send_query`, consumed by whatever owns the live `TcpTransport` for
    /// this DC.
    outgoing_sender: mpsc::UnboundedSender<Bytes>,
}

impl SessionConnection {
    /// Creates a new session connection.
    pub fn new(config: SessionConnectionConfig, auth_data: Arc<AuthDataShared>) -> Self {
        let session_id = Self::generate_session_id();
        let ping_config = config.ping_config;

        let (event_sender, _) = mpsc::unbounded_channel();
        let (query_sender, _) = mpsc::unbounded_channel();
        let (outgoing_sender, outgoing_receiver) = mpsc::unbounded_channel();
        // Dropping the receiver here is deliberate for hosts that never call
        // `take_outgoing_receiver`: `send_query` must still work (wire bytes
        // are produced and immediately discarded) rather than fail, the same
        // way `event_sender`/`query_sender` above tolerate no subscriber.
        drop(outgoing_receiver);

        Self {
            config,
            auth_data,
            state: Arc::new(AtomicU8::new(SessionState::Empty as u8)),
            network_generation: Arc::new(AtomicU32::new(0)),
            session_id: Arc::new(AtomicU64::new(session_id)),
            event_sender,
            query_sender,
            active_queries: Arc::new(Mutex::new(HashMap::new())),
            query_lifecycle: Arc::new(QueryLifecycle::new()),
            ping_manager: Arc::new(Mutex::new(PingManager::new(ping_config))),
            statistics: Arc::new(Mutex::new(SessionStatistics::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            dc_manager: None,
            message_id_generator: Arc::new(MessageIdGenerator::new()),
            header_options: MtprotoHeaderOptions::default(),
            first_query_sent: Arc::new(AtomicBool::new(false)),
            outgoing_sender,
        }
    }

    /// Attaches the `DcManager` that owns this session's DC state so
    /// service-packet handling (currently `bad_server_salt`) can update it.
    pub fn with_dc_manager(mut self, dc_manager: Arc<DcManager>) -> Self {
        self.dc_manager = Some(dc_manager);
        self
    }

    /// Overrides the device/API metadata sent via `initConnection` on this
    /// session's first query.
    pub fn with_header_options(mut self, options: MtprotoHeaderOptions) -> Self {
        self.header_options = options;
        self
    }

    /// Replaces the outgoing-packet channel, returning the new receiver.
    ///
    /// Whoever owns the live `TcpTransport` for this session's DC should
    /// call this once and drain the returned receiver, writing each frame
    /// to the socket in order (§5's "bytes are sent in `sendData` call
    /// order" invariant).
    pub fn take_outgoing_receiver(&mut self) -> mpsc::UnboundedReceiver<Bytes> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.outgoing_sender = sender;
        receiver
    }

    /// Generates a random session ID.
    fn generate_session_id() -> u64 {
        use rand::Rng;
        rand::thread_rng().gen()
    }

    /// Returns the session ID.
    pub fn session_id(&self) -> u64 {
        self.session_id.load(Ordering::Relaxed)
    }

    /// Returns the DC ID.
    pub fn dc_id(&self) -> DcId {
        self.config.dc_id
    }

    /// Returns the connection state.
    pub fn state(&self) -> SessionState {
        match self.state.load(Ordering::Relaxed) {
            0 => SessionState::Empty,
            1 => SessionState::Connecting,
            2 => SessionState::Ready,
            3 => SessionState::Closing,
            4 => SessionState::Closed,
            _ => SessionState::Empty,
        }
    }

    /// Sets the connection state.
    pub fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);

        let _ = self.event_sender.send(SessionEvent::StateChanged(state));
    }

    /// Returns the auth data.
    pub fn auth_data(&self) -> &Arc<AuthDataShared> {
        &self.auth_data
    }

    /// Returns the network generation.
    pub fn network_generation(&self) -> u32 {
        self.network_generation.load(Ordering::Relaxed)
    }

    /// Increments the network generation.
    pub fn increment_network_generation(&self) {
        self.network_generation.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the event sender for subscribing to events.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.event_sender.clone()
    }

    /// Returns the query sender.
    pub fn query_sender(&self) -> mpsc::UnboundedSender<NetQuery> {
        self.query_sender.clone()
    }

    /// Returns the statistics.
    pub fn statistics(&self) -> SessionStatistics {
        self.statistics.lock().clone()
    }

    /// Returns `true` if the connection is ready.
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
            && self.auth_data.auth_key_state() == AuthKeyState::Ready
    }

    /// Sends a query through this session.
    ///
    /// Builds the wire-ready encrypted packet (wrapping the query in
    /// `query_wrappers::first_query` if this is the session's first one,
    /// per §2's "data flow on a request": caller → envelope codec →
    /// obfuscated framing → socket), registers it for response matching,
    /// and hands the resulting bytes to whoever is draining
    /// `take_outgoing_receiver`.
    pub fn send_query(&self, query: NetQuery) -> Result<(), ConnectionError> {
        if !self.is_ready() {
            return Err(ConnectionError::Failed("Session not ready".into()));
        }

        let packet = self.build_outgoing_packet(&query)?;

        self.register_query(packet.message_id, query.clone());

        let _ = self.outgoing_sender.send(packet.bytes);

        self.query_sender
            .send(query)
            .map_err(|_| ConnectionError::Failed("Failed to send query".into()))?;

        Ok(())
    }

    /// Wraps, allocates a message id/seqno for, and encrypts a query's body
    /// per §4.6 "Encrypt (client → server)".
    fn build_outgoing_packet(&self, query: &NetQuery) -> Result<OutgoingPacket, ConnectionError> {
        let auth_key = self
            .auth_data
            .get_auth_key()
            .ok_or_else(|| ConnectionError::Failed("No auth key for DC".into()))?;
        let key_bytes: [u8; 256] = auth_key
            .as_bytes()
            .try_into()
            .map_err(|_| ConnectionError::Failed("Auth key is not 256 bytes".into()))?;

        let is_first = !self.first_query_sent.swap(true, Ordering::SeqCst);
        let body: Bytes = if is_first {
            query_wrappers::first_query(DEFAULT_LAYER, &self.header_options, None, query.query())
        } else {
            query.query().clone()
        };

        let server_time = self.auth_data.server_time_difference()
            + std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
        let message_id = self.message_id_generator.next(server_time);
        let seq_no = self.auth_data.next_seq_no(true);

        let mut packet_info = PacketInfo::common()
            .with_salt(self.auth_data.server_salt())
            .with_session_id(self.session_id())
            .with_message_id(message_id)
            .with_seq_no(seq_no)
            .with_version(2)
            .with_random_padding(true);

        let writer = DefaultTransportWriter::new();
        let bytes = writer
            .write(&body, Some(&key_bytes), &mut packet_info)
            .map_err(|e| ConnectionError::Failed(format!("Envelope encrypt failed: {e}")))?;

        Ok(OutgoingPacket {
            bytes: Bytes::from(bytes),
            message_id: message_id.as_u64(),
        })
    }

    /// Processes an incoming packet.
    pub fn process_packet(&self, data: &[u8]) -> Result<(), ConnectionError> {
        // Try to decode as service packet first
        if let Ok(service_packet) = ServicePacket::decode(data) {
            return self.handle_service_packet(service_packet);
        }

        // Try to match to active query
        // For now, just acknowledge
        tracing::debug!("Received {} bytes packet", data.len());

        Ok(())
    }

    /// Handles a service packet.
    fn handle_service_packet(&self, packet: ServicePacket) -> Result<(), ConnectionError> {
        match packet {
            ServicePacket::Pong { ping_id, .. } => {
                self.ping_manager.lock().on_pong(ping_id);
            }
            ServicePacket::NewSessionCreated { .. } => {
                tracing::debug!("New session created");
            }
            ServicePacket::Ack { msg_ids } => {
                tracing::debug!("Received ack for {} messages", msg_ids.len());
                // Acknowledge received messages
            }
            ServicePacket::BadServerSalt {
                bad_msg_id,
                new_server_salt,
                ..
            } => {
                tracing::warn!(
                    "Bad server salt on DC {}: msg_id={}, new_salt={}",
                    self.config.dc_id,
                    bad_msg_id,
                    new_server_salt
                );
                if let Some(dc_manager) = &self.dc_manager {
                    let now = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_secs() as i32)
                        .unwrap_or(0);
                    dc_manager.on_bad_server_salt(
                        self.config.dc_id,
                        new_server_salt as i64,
                        now,
                    );
                }
            }
            ServicePacket::GzipPacked { packed_data } => {
                match super::packets::GzipPacked::inflate(&packed_data) {
                    Ok(inner) => {
                        if let Ok(inner_packet) = ServicePacket::decode(&inner) {
                            return self.handle_service_packet(inner_packet);
                        }
                        tracing::debug!(
                            "decompressed gzip_packed body ({} bytes) is not a service packet",
                            inner.len()
                        );
                    }
                    Err(e) => tracing::warn!("failed to inflate gzip_packed: {}", e),
                }
            }
            _ => {
                tracing::debug!("Unhandled service packet: {:?}", packet);
            }
        }

        Ok(())
    }

    /// Starts the session connection.
    pub async fn start(&self) -> Result<(), ConnectionError> {
        self.set_state(SessionState::Connecting);

        // Check auth key
        if self.auth_data.auth_key_state() != AuthKeyState::Ready {
            // Need to create auth key - this should be done externally
            tracing::warn!("Auth key not ready for DC {}", self.config.dc_id);
        }

        self.set_state(SessionState::Ready);

        // Start ping manager
        self.start_ping_loop().await;

        Ok(())
    }

    /// Stops the session connection.
    pub async fn stop(&self) -> Result<(), ConnectionError> {
        self.set_state(SessionState::Closing);
        self.stop_flag.store(true, Ordering::Relaxed);
        self.set_state(SessionState::Closed);

        Ok(())
    }

    /// Starts the ping loop.
    async fn start_ping_loop(&self) {
        let ping_manager = self.ping_manager.clone();
        let query_sender = self.query_sender.clone();
        let stop_flag = self.stop_flag.clone();

        tokio::spawn(async move {
            while !stop_flag.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_secs(10)).await;

                if let Some(ping) = ping_manager.lock().create_ping() {
                    // Send ping query
                    tracing::trace!("Sending ping: {}", ping.ping_id);
                }
            }
        });
    }

    /// Registers a query.
    pub fn register_query(&self, message_id: u64, query: NetQuery) {
        self.active_queries.lock().insert(message_id, query);
    }

    /// Completes a query.
    pub fn complete_query(&self, message_id: u64, result: Result<Bytes, String>) {
        if let Some(query) = self.active_queries.lock().remove(&message_id) {
            match result {
                Ok(data) => {
                    query.set_ok(data);
                    let _ = self
                        .event_sender
                        .send(SessionEvent::QueryCompleted(query.id()));
                }
                Err(error) => {
                    use crate::query::QueryError;
                    query.set_error(QueryError::Generic(error));
                }
            }
        }
    }

    /// Processes a timeout for a query.
    pub fn on_query_timeout(&self, query: NetQuery) {
        use crate::query::QueryError;

        query.set_error(QueryError::Generic("Query timeout".into()));

        self.statistics.lock().failed_queries += 1;
    }
}
