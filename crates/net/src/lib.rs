// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Rust implementation of Telegram's network layer based on TDLib.
//!
//! This module provides the core networking infrastructure for Telegram client,
//! including connection management, query dispatching, and DC (Data Center) management.
//!
//! ## Modules
//!
//! - [`crypto`] - Cryptography primitives (AES-IGE, KDF, SHA1/SHA256)
//! - [`packet`] - MTProto packet types (MessageId, PacketInfo, MtprotoQuery)
//! - [`auth`] - Authentication data handling
//! - [`connection`] - Connection management
//! - [`dc`] - Data Center types and options
//! - [`datacenter`] - Per-DC address rotation and server-salt selection
//! - [`dc_manager`] - Ties `datacenter`, `dc_auth`, and `handshake_driver`
//!   into the per-DC handshake-orchestration decision
//! - [`handshake`] - MTProto DH key-exchange state machine
//! - [`pool`] - Per-DC connection pooling
//! - [`circuit_breaker`] - Per-DC failure circuit breaker
//! - [`health_check`] - Pooled-connection health probing
//! - [`proxy`] - Proxy types (SOCKS5, HTTP, MTProto)
//! - [`query`] - Query dispatching and lifecycle
//! - [`query_creator`] - Query construction and statistics
//! - [`query_wrappers`] - `invokeWithLayer`/`invokeAfterMsg`/`initConnection`
//!   wrapper constructors for a session's first query
//! - [`query_verifier`] - Human/recaptcha query verification
//! - [`stats`] - Network statistics management

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(dead_code)]
#![deny(clippy::unwrap_used)]

pub mod auth;
pub mod circuit_breaker;
pub mod connection;
pub mod crypto;
pub mod datacenter;
pub mod dc;
pub mod dc_auth;
pub mod dc_manager;
pub mod delegate;
pub mod dispatch;
pub mod handshake;
pub mod handshake_driver;
pub mod health_check;
pub mod mtproto_header;
pub mod packet;
pub mod pool;
pub mod proxy;
pub mod query;
pub mod query_creator;
pub mod query_verifier;
pub mod query_wrappers;
pub mod rsa_key_shared;
pub mod session;
pub mod session_multi_proxy;
pub mod stats;
pub mod test_config;
pub mod transport;

// Re-export existing types
pub use auth::{AuthDataShared, AuthKeyState};
pub use connection::{ConnectionMode, ConnectionState};
pub use datacenter::{
    select_auth_key, AddressCursor, AddressListKind, AuthKeySlot, Datacenter, DcSalt,
    RotatingAddress, SaltList, DEFAULT_PORTS,
};
pub use dc::{DcId, DcOption, DcOptions, DcOptionsSet};
pub use dc_manager::{DcManager, DcManagerError, DcProfile};
pub use delegate::{Delegate, DelegateBridge, HandshakeKind, NullDelegate};
pub use proxy::{Proxy, ProxyType};
pub use query::{
    AuthFlag, GzipFlag, NetQuery, NetQueryCallback, NetQueryDispatcher, NetQueryId, NetQueryState,
    NetQueryType, QueryError,
};
pub use stats::{NetStatsManager, NetType, NetworkStats, NetworkStatsEntry};

// Re-export crypto types
pub use crypto::compute_auth_key_id;
pub use crypto::{aes_ige_decrypt, aes_ige_encrypt, AesIge};
pub use crypto::{kdf, kdf2, sha1, sha256, tmp_kdf, KdfOutput};
pub use crypto::{AuthKeyError, AuthKeyHelper, CryptoAuthKey, DefaultAuthKeyHelper};

// Re-export packet types
pub use packet::{MessageId, MessageIdGenerator, MtprotoQuery, PacketInfo, PacketType};

// Re-export transport types
pub use transport::{
    HttpProxyTransport, HttpProxyTransportFactory, HttpTransport, HttpTransportFactory,
};
pub use transport::{MtprotoProxyTransport, MtprotoProxyTransportFactory};
pub use transport::{
    ObfuscatedDecodeHalf, ObfuscatedEncodeHalf, ObfuscatedFrame, ObfuscatedSession,
    ObfuscationError, ObfuscationMode, MAX_FRAME_LEN,
};
pub use transport::{
    ReadResult, Transport, TransportMode, TransportRead, TransportWrite, WriteOptions,
};
pub use transport::{Socks5Transport, Socks5TransportFactory};
pub use transport::{
    TcpReadHalf, TcpTransport, TcpTransportFactory, TcpWriteHalf, MAX_PACKET_SIZE,
};

// Re-export session types
pub use session::{ContainerDecoder, GzipPacked, MessageContainer, ServicePacket};
pub use session::{PacketHandler, PacketHandlerResult, ServicePacketHandler};
pub use session::{PingConfig, PingManager};
pub use session::{QueryLifecycle, QueryState};
pub use session::{
    SessionConnection, SessionConnectionConfig, SessionEvent, SessionState, SessionStatistics,
};

// Re-export dispatch types
pub use dispatch::{DelayConfig, NetQueryDelayer};
pub use dispatch::{DispatchConfig, EnhancedDispatcher};
pub use dispatch::{FloodControl, FloodControlConfig, FloodControlResult};
pub use dispatch::{SequenceConfig, SequenceDispatcher};

// Re-export query wrapper constructors (invokeWithLayer / invokeAfterMsg /
// initConnection / invokeWithoutUpdates)
pub use query_wrappers::{
    first_query, init_connection, invoke_after_msg, invoke_with_layer, invoke_without_updates,
    InputClientProxy, DEFAULT_LAYER,
};

// Re-export RSA key types
pub use rsa_key_shared::{PublicRsaKeyInterface, PublicRsaKeySharedCdn, PublicRsaKeySharedMain, RsaKey, RsaKeyError, RsaKeyManager, RsaKeyListener, PublicRsaKeyWatchdog};

// Re-export DC auth types
pub use dc_auth::{DcAuthError, DcAuthInfo, DcAuthManager, DcAuthKeyStorage, DcState, RegisteredAuthKey, StoredAuthKey, TempAuthKeyWatchdog};

// Re-export session multiproxy types
pub use session_multi_proxy::{SessionMultiProxy, SessionMultiProxyConfig, SessionMultiProxyFactory, SessionInfo, SessionProxyError, SessionStats, SessionType};
pub use session_multi_proxy::{SessionProxy as SessionProxyTrait};

// Re-export MTProto header types
pub use mtproto_header::{MtprotoHeader, MtprotoHeaderError, MtprotoHeaderFactory, MtprotoHeaderOptions, Platform};

// Re-export handshake types
pub use handshake::{
    HandshakeAction, HandshakeError, HandshakeMode, HandshakeState, MtprotoHandshake,
};

// Re-export the handshake driver (socket + state-machine glue)
pub use handshake_driver::{run_handshake, HandshakeDriverError, HandshakeOutcome};

// Re-export test/production DC switching
pub use test_config::{get_dc_options, get_rsa_keys, is_test_dc, set_test_mode};

// Re-export connection pooling types
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use health_check::{HealthCheckConfig, HealthChecker, HealthStatus};
pub use pool::{ConnectionPool, ConnectionPurpose, PoolConfig, PoolError, PooledConnection};
pub use query_creator::{NetQueryCreator, NetQueryStats};
pub use query_verifier::{
    NetQueryVerifier, VerificationCallback, VerificationError, VerificationQuery,
    VerificationResult, VerificationType,
};

// Re-export query retry/timeout helpers
pub use query::retry::{RetryError, RetryManager, RetryPolicy, RetryResult};
pub use query::timeout::{QueryTimeoutManager, TimeoutConfig, TimeoutError, TimeoutResult};

/// Network module error types
pub mod error {
    pub use super::connection::ConnectionError;
    pub use super::crypto::CryptoError;
    pub use super::dc::DcError;
    pub use super::dc_auth::DcAuthError;
    pub use super::mtproto_header::MtprotoHeaderError;
    pub use super::proxy::ProxyError;
    pub use super::rsa_key_shared::RsaKeyError;
    pub use super::session_multi_proxy::SessionProxyError;
}

/// Prelude for common imports
pub mod prelude {
    pub use super::auth::*;
    pub use super::connection::*;
    pub use super::crypto::prelude::*;
    pub use super::dc::*;
    pub use super::packet::prelude::*;
    pub use super::proxy::*;
    pub use super::query::*;
    pub use super::stats::*;
    pub use super::transport::*;
}
