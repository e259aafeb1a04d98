// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! TCP transport for MTProto.
//!
//! This module implements TCP-based transport for Telegram MTProto.

use std::net::SocketAddr;
use std::time::Duration;

use rustgram_buffer::BufferPool;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::connection::{ConnectionError, ConnectionState};
use crate::packet::PacketInfo;
use crate::transport::{
    ObfuscatedDecodeHalf, ObfuscatedEncodeHalf, ObfuscatedFrame, ObfuscatedSession, ReadResult,
    TransportRead, TransportWrite, WriteOptions,
};

/// Maximum packet size for TCP transport.
pub const MAX_PACKET_SIZE: usize = 16 * 1024 * 1024; // 16 MB

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read timeout.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

use std::sync::Arc;

/// MTProto TCP transport.
///
/// Handles TCP connections with MTProto packet framing.
pub struct TcpTransport {
    /// TCP stream
    pub stream: Option<TcpStream>,

    /// Remote address
    pub addr: SocketAddr,

    /// Connection state
    pub state: ConnectionState,

    /// Transport reader
    pub reader: Arc<dyn TransportRead>,

    /// Transport writer
    pub writer: Arc<dyn TransportWrite>,

    /// Write options
    pub write_options: WriteOptions,

    /// Transport mode for packet framing
    pub transport_mode: crate::transport::TransportMode,

    /// Obfuscation secret to negotiate at connect time, if any.
    ///
    /// When set, `connect()` sends the random first-packet header instead of
    /// the plain transport magic, and `read`/`write` route through the
    /// resulting [`ObfuscatedSession`] instead of the plain length-prefixed
    /// framing selected by `transport_mode`.
    pub obfuscation_secret: Option<Vec<u8>>,

    /// Datacenter id passed to [`ObfuscatedSession::generate`] when
    /// obfuscation is enabled (encoded into the obfuscated header's
    /// embedded-dc-id field).
    pub obfuscation_dc_id: i32,

    /// Established obfuscation session, set once `connect()` completes.
    obfuscation: Option<ObfuscatedSession>,
}

impl TcpTransport {
    /// Creates a new TCP transport (not connected).
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            stream: None,
            addr,
            state: ConnectionState::Empty,
            reader: Arc::new(crate::transport::read::DefaultTransportReader::new()),
            writer: Arc::new(crate::transport::write::DefaultTransportWriter::new()),
            write_options: WriteOptions::default(),
            transport_mode: crate::transport::TransportMode::default(),
            obfuscation_secret: None,
            obfuscation_dc_id: 0,
            obfuscation: None,
        }
    }

    /// Creates a new TCP transport with custom transport implementations.
    pub fn with_transport(
        addr: SocketAddr,
        reader: Arc<dyn TransportRead>,
        writer: Arc<dyn TransportWrite>,
    ) -> Self {
        Self {
            stream: None,
            addr,
            state: ConnectionState::Empty,
            reader,
            writer,
            write_options: WriteOptions::default(),
            transport_mode: crate::transport::TransportMode::default(),
            obfuscation_secret: None,
            obfuscation_dc_id: 0,
            obfuscation: None,
        }
    }

    /// Enables obfuscated-transport framing for the next `connect()` call.
    ///
    /// `secret` selects the mode per [`ObfuscationMode::from_secret`] (empty
    /// for EF, leading `0xDD`/`0xEE` for DD/TLS); `dc_id` is embedded in the
    /// first-packet header when `secret` is non-empty.
    pub fn with_obfuscation(mut self, secret: Vec<u8>, dc_id: i32) -> Self {
        self.obfuscation_secret = Some(secret);
        self.obfuscation_dc_id = dc_id;
        self
    }

    /// Returns `true` if this connection negotiated obfuscated framing.
    pub fn is_obfuscated(&self) -> bool {
        self.obfuscation.is_some()
    }

    /// Returns the remote address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` if connected.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some() && self.state == ConnectionState::Ready
    }

    /// Sets the write options.
    pub fn set_write_options(&mut self, options: WriteOptions) {
        self.write_options = options;
    }

    /// Connects to the remote address.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        self.state = ConnectionState::Connecting;

        let mut stream = timeout(DEFAULT_CONNECT_TIMEOUT, TcpStream::connect(self.addr))
            .await
            .map_err(|_| ConnectionError::Timeout(DEFAULT_CONNECT_TIMEOUT))?
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;

        // Set TCP options
        stream
            .set_nodelay(true)
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;

        if let Some(secret) = self.obfuscation_secret.clone() {
            let mut rng = rand::rngs::OsRng;
            let (header, session) =
                ObfuscatedSession::generate(&mut rng, &secret, self.obfuscation_dc_id);

            stream
                .write_all(&header)
                .await
                .map_err(|e| ConnectionError::Socket(e.to_string()))?;
            stream
                .flush()
                .await
                .map_err(|e| ConnectionError::Socket(e.to_string()))?;

            tracing::info!(
                "Sent obfuscated first packet (mode: {:?})",
                session.mode()
            );

            self.obfuscation = Some(session);
        } else {
            // Send transport magic number if needed (for Intermediate mode)
            let magic = crate::transport::get_transport_magic(self.transport_mode);
            if !magic.is_empty() {
                stream
                    .write_all(&magic)
                    .await
                    .map_err(|e| ConnectionError::Socket(e.to_string()))?;
                stream
                    .flush()
                    .await
                    .map_err(|e| ConnectionError::Socket(e.to_string()))?;
                tracing::info!(
                    "Sent transport magic: {:02x?} (mode: {:?})",
                    magic,
                    self.transport_mode
                );
            }
        }

        self.stream = Some(stream);
        self.state = ConnectionState::Ready;

        tracing::debug!("TCP transport connected to {}", self.addr);

        Ok(())
    }

    /// Writes data to the TCP stream.
    pub async fn write(
        &mut self,
        data: &[u8],
        auth_key: Option<&[u8; 256]>,
    ) -> Result<(), ConnectionError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ConnectionError::Failed("Not connected".into()))?;

        // 1. Encode packet using transport (adds NoCryptoHeader, CryptoHeader, etc.)
        let mut packet_info = PacketInfo::new()
            .with_no_crypto(auth_key.is_none())
            .with_packet_type(self.write_options.packet_type);

        let mtp_packet = self
            .writer
            .write(data, auth_key, &mut packet_info)
            .map_err(|e| ConnectionError::Ssl(e.to_string()))?;

        // 2. Add transport-level framing (length prefix), obfuscated if negotiated
        let framed = if let Some(obf) = self.obfuscation.as_mut() {
            obf.encode_frame(&mtp_packet, &[])
                .map_err(|e| ConnectionError::Failed(e.to_string()))?
        } else {
            crate::transport::frame_packet(self.transport_mode, &mtp_packet)
        };

        // 3. Write to stream
        stream
            .write_all(&framed)
            .await
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;

        stream
            .flush()
            .await
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;

        tracing::info!(
            "TCP transport wrote {} bytes (framed from {} bytes MTProto packet)\nSent data (hex): {:02x?}",
            framed.len(),
            mtp_packet.len(),
            framed
        );

        Ok(())
    }

    /// Reads data from the TCP stream.
    pub async fn read(
        &mut self,
        auth_key: Option<&[u8; 256]>,
    ) -> Result<ReadResult, ConnectionError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ConnectionError::Failed("Not connected".into()))?;

        tracing::info!("TCP transport starting to read packet (mode: {:?})", self.transport_mode);

        if self.obfuscation.is_some() {
            return Self::read_obfuscated(
                stream,
                self.obfuscation.as_mut().expect("checked above"),
                &self.reader,
                auth_key,
                self.write_options.packet_type,
            )
            .await;
        }

        // Read packet length based on transport mode
        let length = match self.transport_mode {
            crate::transport::TransportMode::Abridged => {
                // Abridged mode: 1-byte length (encoded with << 1, need to >> 1 to decode)
                let mut len_byte = [0u8; 1];
                timeout(DEFAULT_READ_TIMEOUT, stream.read_exact(&mut len_byte))
                    .await
                    .map_err(|_| ConnectionError::Timeout(DEFAULT_READ_TIMEOUT))?
                    .map_err(|e| ConnectionError::Socket(e.to_string()))?;

                if len_byte[0] >= 0xFE {
                    return Err(ConnectionError::Failed(format!(
                        "Invalid abridged length byte: {} (must be < 0xFE)",
                        len_byte[0]
                    )));
                }
                // Decode: length = len_byte >> 1
                let len = (len_byte[0] >> 1) as usize;
                tracing::info!("TCP transport read abridged length byte: {}, decoded length: {}", len_byte[0], len);
                len
            }
            crate::transport::TransportMode::Intermediate => {
                // Intermediate mode: 4-byte little-endian length
                let mut len_bytes = [0u8; 4];
                timeout(DEFAULT_READ_TIMEOUT, stream.read_exact(&mut len_bytes))
                    .await
                    .map_err(|_| ConnectionError::Timeout(DEFAULT_READ_TIMEOUT))?
                    .map_err(|e| ConnectionError::Socket(e.to_string()))?;

                let len = u32::from_le_bytes(len_bytes) as usize;
                tracing::info!("TCP transport read intermediate length: {} ({:02x?}", len, len_bytes);
                len
            }
            crate::transport::TransportMode::NoCrypto | crate::transport::TransportMode::Full => {
                // These modes don't use transport framing - read as is
                // For now, return error as this shouldn't happen during handshake
                return Err(ConnectionError::Failed(
                    "NoCrypto/Full modes not supported for TCP transport".into()
                ));
            }
        };

        if length > MAX_PACKET_SIZE {
            return Err(ConnectionError::Failed(format!(
                "Packet too large: {} bytes",
                length
            )));
        }

        // Read packet body
        let mut buffer = BufferPool::global().get_free_buffer(length);
        timeout(DEFAULT_READ_TIMEOUT, stream.read_exact(&mut buffer))
            .await
            .map_err(|_| ConnectionError::Timeout(DEFAULT_READ_TIMEOUT))?
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;

        tracing::info!(
            "TCP transport read {} bytes from server (mode: {:?})",
            buffer.len(),
            self.transport_mode
        );

        // Decode packet using transport
        let mut packet_info = PacketInfo::new()
            .with_no_crypto(auth_key.is_none())
            .with_packet_type(self.write_options.packet_type);

        let result = self
            .reader
            .read(&buffer, auth_key, &mut packet_info)
            .map_err(|e| ConnectionError::Failed(e.to_string()))?;

        BufferPool::global().reuse(buffer);

        tracing::info!("TCP transport read packet result: {:?}", result);

        Ok(result)
    }

    /// Reads one obfuscated-transport frame, feeding raw socket reads into
    /// `session` until it yields a complete packet or quick-ack.
    async fn read_obfuscated(
        stream: &mut TcpStream,
        session: &mut ObfuscatedSession,
        reader: &Arc<dyn TransportRead>,
        auth_key: Option<&[u8; 256]>,
        packet_type: crate::packet::PacketType,
    ) -> Result<ReadResult, ConnectionError> {
        let mut chunk = [0u8; 4096];
        loop {
            let n = timeout(DEFAULT_READ_TIMEOUT, stream.read(&mut chunk))
                .await
                .map_err(|_| ConnectionError::Timeout(DEFAULT_READ_TIMEOUT))?
                .map_err(|e| ConnectionError::Socket(e.to_string()))?;

            if n == 0 {
                return Err(ConnectionError::Socket(
                    "connection closed by peer".into(),
                ));
            }

            let frames = session
                .feed(&chunk[..n])
                .map_err(|e| ConnectionError::Failed(e.to_string()))?;

            for frame in frames {
                match frame {
                    ObfuscatedFrame::QuickAck(id) => return Ok(ReadResult::quick_ack(id)),
                    ObfuscatedFrame::Packet(body) => {
                        let mut packet_info =
                            PacketInfo::new().with_packet_type(packet_type);
                        let result = reader
                            .read(&body, auth_key, &mut packet_info)
                            .map_err(|e| ConnectionError::Failed(e.to_string()))?;
                        return Ok(result);
                    }
                }
            }
        }
    }

    /// Closes the TCP connection.
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .shutdown()
                .await
                .map_err(|e| ConnectionError::Socket(e.to_string()))?;
        }

        self.state = ConnectionState::Closed;

        tracing::debug!("TCP transport closed connection to {}", self.addr);

        Ok(())
    }

    /// Splits the transport into read and write halves.
    ///
    /// When obfuscated framing was negotiated, the session's encrypt/decrypt
    /// CTR contexts are split the same way via [`ObfuscatedSession::split`]
    /// so each half keeps driving its own direction independently.
    pub fn split(&mut self) -> Option<(TcpReadHalf, TcpWriteHalf)> {
        let stream = self.stream.take()?;

        let (read, write) = tokio::io::split(stream);
        let (obf_enc, obf_dec) = match self.obfuscation.take() {
            Some(session) => {
                let (enc, dec) = session.split();
                (Some(enc), Some(dec))
            }
            None => (None, None),
        };

        Some((
            TcpReadHalf {
                reader: self.reader.clone_box(),
                stream: read,
                addr: self.addr,
                transport_mode: self.transport_mode,
                obfuscation: obf_dec,
            },
            TcpWriteHalf {
                writer: self.writer.clone_box(),
                stream: write,
                addr: self.addr,
                write_options: self.write_options,
                transport_mode: self.transport_mode,
                obfuscation: obf_enc,
            },
        ))
    }
}

/// Clone helper for TransportRead trait.
trait TransportReadClone: Send + Sync {
    fn clone_box(&self) -> Arc<dyn TransportRead>;
}

impl<T: TransportRead + Clone + 'static> TransportReadClone for T {
    fn clone_box(&self) -> Arc<dyn TransportRead> {
        Arc::new(self.clone())
    }
}

impl TransportReadClone for Arc<dyn TransportRead> {
    fn clone_box(&self) -> Arc<dyn TransportRead> {
        Arc::clone(self)
    }
}

/// Clone helper for TransportWrite trait.
trait TransportWriteClone: Send + Sync {
    fn clone_box(&self) -> Arc<dyn TransportWrite>;
}

impl<T: TransportWrite + Clone + 'static> TransportWriteClone for T {
    fn clone_box(&self) -> Arc<dyn TransportWrite> {
        Arc::new(self.clone())
    }
}

impl TransportWriteClone for Arc<dyn TransportWrite> {
    fn clone_box(&self) -> Arc<dyn TransportWrite> {
        Arc::clone(self)
    }
}

/// Read half of TCP transport.
pub struct TcpReadHalf {
    /// Transport reader
    pub reader: Arc<dyn TransportRead>,
    /// TCP stream read half
    pub stream: ReadHalf<TcpStream>,
    /// Remote address
    pub addr: SocketAddr,
    /// Transport mode for packet framing
    pub transport_mode: crate::transport::TransportMode,
    /// Decrypt-direction obfuscation state, set if the parent `TcpTransport`
    /// negotiated obfuscated framing before `split()`.
    obfuscation: Option<ObfuscatedDecodeHalf>,
}

impl TcpReadHalf {
    /// Returns the remote address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns `true` if this half is reading obfuscated framing.
    pub fn is_obfuscated(&self) -> bool {
        self.obfuscation.is_some()
    }

    /// Reads a packet from the stream.
    pub async fn read_packet(
        &mut self,
        auth_key: Option<&[u8; 256]>,
        packet_type: crate::packet::PacketType,
    ) -> Result<ReadResult, ConnectionError> {
        if self.obfuscation.is_some() {
            return self.read_obfuscated_packet(auth_key, packet_type).await;
        }

        // Read packet length based on transport mode
        let length = match self.transport_mode {
            crate::transport::TransportMode::Abridged => {
                // Abridged mode: 1-byte length (encoded with << 1, need to >> 1 to decode)
                let mut len_byte = [0u8; 1];
                timeout(
                    DEFAULT_READ_TIMEOUT,
                    self.stream.read_exact(&mut len_byte),
                )
                .await
                .map_err(|_| ConnectionError::Timeout(DEFAULT_READ_TIMEOUT))?
                .map_err(|e| ConnectionError::Socket(e.to_string()))?;

                if len_byte[0] >= 0xFE {
                    return Err(ConnectionError::Failed(format!(
                        "Invalid abridged length byte: {} (must be < 0xFE)",
                        len_byte[0]
                    )));
                }
                // Decode: length = len_byte >> 1
                (len_byte[0] >> 1) as usize
            }
            crate::transport::TransportMode::Intermediate => {
                // Intermediate mode: 4-byte little-endian length
                let mut len_bytes = [0u8; 4];
                timeout(
                    DEFAULT_READ_TIMEOUT,
                    self.stream.read_exact(&mut len_bytes),
                )
                .await
                .map_err(|_| ConnectionError::Timeout(DEFAULT_READ_TIMEOUT))?
                .map_err(|e| ConnectionError::Socket(e.to_string()))?;

                u32::from_le_bytes(len_bytes) as usize
            }
            crate::transport::TransportMode::NoCrypto | crate::transport::TransportMode::Full => {
                return Err(ConnectionError::Failed(
                    "NoCrypto/Full modes not supported".into()
                ));
            }
        };

        if length > MAX_PACKET_SIZE {
            return Err(ConnectionError::Failed(format!(
                "Packet too large: {} bytes",
                length
            )));
        }

        // Read packet data
        let mut buffer = BufferPool::global().get_free_buffer(length);
        timeout(DEFAULT_READ_TIMEOUT, self.stream.read_exact(&mut buffer))
            .await
            .map_err(|_| ConnectionError::Timeout(DEFAULT_READ_TIMEOUT))?
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;

        // Decode
        let mut packet_info = PacketInfo::new().with_packet_type(packet_type);
        let result = self
            .reader
            .read(&buffer, auth_key, &mut packet_info)
            .map_err(|e| ConnectionError::Failed(e.to_string()));

        BufferPool::global().reuse(buffer);

        result
    }

    /// Reads one obfuscated-transport frame on a split read half, mirroring
    /// `TcpTransport::read_obfuscated` but driven by this half's own
    /// `ObfuscatedDecodeHalf` instead of a shared `ObfuscatedSession`.
    async fn read_obfuscated_packet(
        &mut self,
        auth_key: Option<&[u8; 256]>,
        packet_type: crate::packet::PacketType,
    ) -> Result<ReadResult, ConnectionError> {
        let obfuscation = self
            .obfuscation
            .as_mut()
            .expect("checked by caller: is_obfuscated");

        let mut chunk = [0u8; 4096];
        loop {
            let n = timeout(DEFAULT_READ_TIMEOUT, self.stream.read(&mut chunk))
                .await
                .map_err(|_| ConnectionError::Timeout(DEFAULT_READ_TIMEOUT))?
                .map_err(|e| ConnectionError::Socket(e.to_string()))?;

            if n == 0 {
                return Err(ConnectionError::Socket(
                    "connection closed by peer".into(),
                ));
            }

            let frames = obfuscation
                .feed(&chunk[..n])
                .map_err(|e| ConnectionError::Failed(e.to_string()))?;

            for frame in frames {
                match frame {
                    ObfuscatedFrame::QuickAck(id) => return Ok(ReadResult::quick_ack(id)),
                    ObfuscatedFrame::Packet(body) => {
                        let mut packet_info = PacketInfo::new().with_packet_type(packet_type);
                        return self
                            .reader
                            .read(&body, auth_key, &mut packet_info)
                            .map_err(|e| ConnectionError::Failed(e.to_string()));
                    }
                }
            }
        }
    }
}

/// Write half of TCP transport.
pub struct TcpWriteHalf {
    /// Transport writer
    pub writer: Arc<dyn TransportWrite>,
    /// TCP stream write half
    pub stream: WriteHalf<TcpStream>,
    /// Remote address
    pub addr: SocketAddr,
    /// Write options
    pub write_options: WriteOptions,
    /// Transport mode for packet framing
    pub transport_mode: crate::transport::TransportMode,
    /// Encrypt-direction obfuscation state, set if the parent `TcpTransport`
    /// negotiated obfuscated framing before `split()`.
    obfuscation: Option<ObfuscatedEncodeHalf>,
}

impl TcpWriteHalf {
    /// Returns the remote address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns `true` if this half is writing obfuscated framing.
    pub fn is_obfuscated(&self) -> bool {
        self.obfuscation.is_some()
    }

    /// Sets the write options.
    pub fn set_write_options(&mut self, options: WriteOptions) {
        self.write_options = options;
    }

    /// Writes a packet to the stream.
    pub async fn write_packet(
        &mut self,
        data: &[u8],
        auth_key: Option<&[u8; 256]>,
    ) -> Result<(), ConnectionError> {
        // 1. Encode packet using transport (adds NoCryptoHeader, CryptoHeader, etc.)
        let mut packet_info = PacketInfo::new()
            .with_no_crypto(auth_key.is_none())
            .with_packet_type(self.write_options.packet_type);

        let mtp_packet = self
            .writer
            .write(data, auth_key, &mut packet_info)
            .map_err(|e| ConnectionError::Ssl(e.to_string()))?;

        // 2. Add transport-level framing (length prefix), obfuscated if negotiated
        let framed = if let Some(obf) = self.obfuscation.as_mut() {
            obf.encode_frame(&mtp_packet, &[])
                .map_err(|e| ConnectionError::Failed(e.to_string()))?
        } else {
            crate::transport::frame_packet(self.transport_mode, &mtp_packet)
        };

        // 3. Write to stream
        self.stream
            .write_all(&framed)
            .await
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;

        self.stream
            .flush()
            .await
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;

        tracing::trace!(
            "TcpWriteHalf wrote {} bytes (framed from {} bytes MTProto packet)",
            framed.len(),
            mtp_packet.len()
        );

        Ok(())
    }
}

/// TCP transport factory.
pub struct TcpTransportFactory;

impl TcpTransportFactory {
    /// Creates a new TCP transport and connects it.
    pub async fn connect(addr: SocketAddr) -> Result<TcpTransport, ConnectionError> {
        let mut transport = TcpTransport::new(addr);
        transport.connect().await?;
        Ok(transport)
    }
}
