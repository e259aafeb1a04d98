// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Service packet types for MTProto.
//!
//! This module implements service packets like ping/pong, ack, etc.

use std::fmt;

use bytes::{Buf, Bytes};

/// MTProto service packet.
#[derive(Debug, Clone)]
pub enum ServicePacket {
    /// Require reconnection
    BadMsgNotification {
        bad_msg_id: u64,
        bad_msg_seqno: i32,
        error_code: i32,
        new_server_salt: Option<u64>,
    },

    /// Bad server salt
    BadServerSalt {
        bad_msg_id: u64,
        bad_msg_seqno: i32,
        error_code: i32,
        new_server_salt: u64,
    },

    /// Message acknowledgment
    Ack { msg_ids: Vec<u64> },

    /// Received messages, we should ack them
    MsgsAck { msg_ids: Vec<u64> },

    /// Request for resending messages
    MsgResendReq { msg_ids: Vec<u64> },

    /// Ping response
    Pong { msg_id: u64, ping_id: u64 },

    /// New session created
    NewSessionCreated {
        first_msg_id: u64,
        server_salt: u64,
        session_id: u64,
    },

    /// Container with messages
    MessageContainer { messages: Vec<ContainerMessage> },

    /// RPC call result, still wrapped around the inner response bytes.
    RpcResult { req_msg_id: u64, body: Bytes },

    /// Server is about to drop the connection unless pinged again within
    /// `disconnect_delay` seconds.
    PingDelayDisconnect {
        ping_id: u64,
        disconnect_delay: i32,
    },

    /// Server's reply to `msgs_state_req` / heavy-message follow-up.
    MsgDetailedInfo {
        msg_id: u64,
        answer_msg_id: u64,
        bytes: i32,
        status: i32,
    },

    /// Same as `MsgDetailedInfo` but for a message the client never sent a
    /// query for (e.g. a detail notice about a message inside a container).
    MsgNewDetailedInfo {
        answer_msg_id: u64,
        bytes: i32,
        status: i32,
    },

    /// A single alternate server salt with its validity window.
    FutureSalt {
        valid_since: i32,
        valid_until: i32,
        salt: u64,
    },

    /// Response to `get_future_salts`.
    FutureSalts {
        req_msg_id: u64,
        now: i32,
        salts: Vec<(i32, i32, u64)>,
    },

    /// `destroy_session` acknowledged; session history discarded.
    DestroySessionOk { session_id: u64 },

    /// `destroy_session` acknowledged; the session id was unknown.
    DestroySessionNone { session_id: u64 },

    /// `gzip_packed#3072cfa1 { packed_data: bytes }` — the deflate-compressed
    /// TL encoding of some other message. `packed_data` is still compressed;
    /// callers that need the inner message call [`GzipPacked::inflate`].
    GzipPacked { packed_data: Bytes },

    /// Unknown packet
    Unknown(u32),
}

/// Message in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMessage {
    /// Message ID
    pub msg_id: u64,

    /// Sequence number
    pub seqno: i32,

    /// Message bytes
    pub bytes: u32,

    /// Message data
    pub body: Bytes,
}

/// Service packet decoding error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketDecodeError {
    /// Buffer too small
    BufferTooSmall,

    /// Unknown constructor
    UnknownConstructor(u32),

    /// Invalid format
    InvalidFormat,
}

impl fmt::Display for PacketDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "Buffer too small"),
            Self::UnknownConstructor(c) => write!(f, "Unknown constructor: 0x{:08x}", c),
            Self::InvalidFormat => write!(f, "Invalid packet format"),
        }
    }
}

impl std::error::Error for PacketDecodeError {}

// TL constructors
const RPC_ERROR_CONSTRUCTOR: u32 = 0x2144ca19;
const BAD_MSG_NOTIFICATION_CONSTRUCTOR: u32 = 0xa7eff811;
const BAD_SERVER_SALT_CONSTRUCTOR: u32 = 0xedab447b;
const MSGS_ACK_CONSTRUCTOR: u32 = 0x62d6b459;
const MSG_RESEND_REQ_CONSTRUCTOR: u32 = 0x7d861a08;
const PING_CONSTRUCTOR: u32 = 0x7abe77ec;
const PONG_CONSTRUCTOR: u32 = 0x347773c5;
const PING_DELAY_DISCONNECT_CONSTRUCTOR: u32 = 0xf3427b8c;
const NEW_SESSION_CREATED_CONSTRUCTOR: u32 = 0x9ec20908;
const MSG_CONTAINER_CONSTRUCTOR: u32 = 0x73f1f8dc;
const RPC_RESULT_CONSTRUCTOR: u32 = 0xf35c6d01;
const MSG_DETAILED_INFO_CONSTRUCTOR: u32 = 0x276d3ec6;
const MSG_NEW_DETAILED_INFO_CONSTRUCTOR: u32 = 0x809db6df;
const FUTURE_SALT_CONSTRUCTOR: u32 = 0x0949d9dc;
const FUTURE_SALTS_CONSTRUCTOR: u32 = 0xae500895;
const DESTROY_SESSION_OK_CONSTRUCTOR: u32 = 0xe22045fc;
const DESTROY_SESSION_NONE_CONSTRUCTOR: u32 = 0x62d350c9;
const GZIP_PACKED_CONSTRUCTOR: u32 = 0x3072cfa1;

impl ServicePacket {
    /// Decodes a service packet from bytes.
    pub fn decode(data: &[u8]) -> Result<Self, PacketDecodeError> {
        if data.len() < 4 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let mut cursor = Bytes::copy_from_slice(data);

        let constructor = cursor.get_u32_le();

        match constructor {
            BAD_MSG_NOTIFICATION_CONSTRUCTOR => Self::decode_bad_msg_notification(&mut cursor),
            BAD_SERVER_SALT_CONSTRUCTOR => Self::decode_bad_server_salt(&mut cursor),
            MSGS_ACK_CONSTRUCTOR => Self::decode_msgs_ack(&mut cursor),
            MSG_RESEND_REQ_CONSTRUCTOR => Self::decode_msg_resend_req(&mut cursor),
            PONG_CONSTRUCTOR => Self::decode_pong(&mut cursor),
            NEW_SESSION_CREATED_CONSTRUCTOR => Self::decode_new_session_created(&mut cursor),
            MSG_CONTAINER_CONSTRUCTOR => Self::decode_msg_container(&mut cursor),
            RPC_RESULT_CONSTRUCTOR => Self::decode_rpc_result(&mut cursor),
            PING_DELAY_DISCONNECT_CONSTRUCTOR => Self::decode_ping_delay_disconnect(&mut cursor),
            MSG_DETAILED_INFO_CONSTRUCTOR => Self::decode_msg_detailed_info(&mut cursor),
            MSG_NEW_DETAILED_INFO_CONSTRUCTOR => Self::decode_msg_new_detailed_info(&mut cursor),
            FUTURE_SALT_CONSTRUCTOR => Self::decode_future_salt(&mut cursor),
            FUTURE_SALTS_CONSTRUCTOR => Self::decode_future_salts(&mut cursor),
            DESTROY_SESSION_OK_CONSTRUCTOR => Self::decode_destroy_session_ok(&mut cursor),
            DESTROY_SESSION_NONE_CONSTRUCTOR => Self::decode_destroy_session_none(&mut cursor),
            GZIP_PACKED_CONSTRUCTOR => Self::decode_gzip_packed(&mut cursor),
            _ => Ok(ServicePacket::Unknown(constructor)),
        }
    }

    fn decode_bad_msg_notification(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 20 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let bad_msg_id = cursor.get_u64_le();
        let bad_msg_seqno = cursor.get_i32_le();
        let error_code = cursor.get_i32_le();

        // new_server_salt is optional
        let new_server_salt = if cursor.remaining() >= 8 {
            Some(cursor.get_u64_le())
        } else {
            None
        };

        Ok(ServicePacket::BadMsgNotification {
            bad_msg_id,
            bad_msg_seqno,
            error_code,
            new_server_salt,
        })
    }

    fn decode_bad_server_salt(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 28 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let bad_msg_id = cursor.get_u64_le();
        let bad_msg_seqno = cursor.get_i32_le();
        let error_code = cursor.get_i32_le();
        let new_server_salt = cursor.get_u64_le();

        Ok(ServicePacket::BadServerSalt {
            bad_msg_id,
            bad_msg_seqno,
            error_code,
            new_server_salt,
        })
    }

    fn decode_msgs_ack(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 4 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let count = cursor.get_u32_le() as usize;
        let mut msg_ids = Vec::with_capacity(count);

        for _ in 0..count {
            if cursor.remaining() < 8 {
                return Err(PacketDecodeError::BufferTooSmall);
            }
            msg_ids.push(cursor.get_u64_le());
        }

        Ok(ServicePacket::Ack { msg_ids })
    }

    fn decode_msg_resend_req(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 4 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let count = cursor.get_u32_le() as usize;
        let mut msg_ids = Vec::with_capacity(count);

        for _ in 0..count {
            if cursor.remaining() < 8 {
                return Err(PacketDecodeError::BufferTooSmall);
            }
            msg_ids.push(cursor.get_u64_le());
        }

        Ok(ServicePacket::MsgResendReq { msg_ids })
    }

    fn decode_pong(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 16 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let msg_id = cursor.get_u64_le();
        let ping_id = cursor.get_u64_le();
        Ok(ServicePacket::Pong { msg_id, ping_id })
    }

    fn decode_rpc_result(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 8 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let req_msg_id = cursor.get_u64_le();
        let body = cursor.copy_to_bytes(cursor.remaining());
        Ok(ServicePacket::RpcResult { req_msg_id, body })
    }

    fn decode_ping_delay_disconnect(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 12 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let ping_id = cursor.get_u64_le();
        let disconnect_delay = cursor.get_i32_le();
        Ok(ServicePacket::PingDelayDisconnect {
            ping_id,
            disconnect_delay,
        })
    }

    fn decode_msg_detailed_info(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 24 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let msg_id = cursor.get_u64_le();
        let answer_msg_id = cursor.get_u64_le();
        let bytes = cursor.get_i32_le();
        let status = cursor.get_i32_le();
        Ok(ServicePacket::MsgDetailedInfo {
            msg_id,
            answer_msg_id,
            bytes,
            status,
        })
    }

    fn decode_msg_new_detailed_info(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 16 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let answer_msg_id = cursor.get_u64_le();
        let bytes = cursor.get_i32_le();
        let status = cursor.get_i32_le();
        Ok(ServicePacket::MsgNewDetailedInfo {
            answer_msg_id,
            bytes,
            status,
        })
    }

    fn decode_future_salt(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 16 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let valid_since = cursor.get_i32_le();
        let valid_until = cursor.get_i32_le();
        let salt = cursor.get_u64_le();
        Ok(ServicePacket::FutureSalt {
            valid_since,
            valid_until,
            salt,
        })
    }

    fn decode_future_salts(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 16 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let req_msg_id = cursor.get_u64_le();
        let now = cursor.get_i32_le();
        let count = cursor.get_i32_le();

        if count < 0 {
            return Err(PacketDecodeError::InvalidFormat);
        }

        let mut salts = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if cursor.remaining() < 4 {
                return Err(PacketDecodeError::BufferTooSmall);
            }
            let item_constructor = cursor.get_u32_le();
            if item_constructor != FUTURE_SALT_CONSTRUCTOR {
                return Err(PacketDecodeError::UnknownConstructor(item_constructor));
            }
            match Self::decode_future_salt(cursor)? {
                ServicePacket::FutureSalt {
                    valid_since,
                    valid_until,
                    salt,
                } => salts.push((valid_since, valid_until, salt)),
                _ => unreachable!(),
            }
        }

        Ok(ServicePacket::FutureSalts {
            req_msg_id,
            now,
            salts,
        })
    }

    fn decode_destroy_session_ok(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 8 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let session_id = cursor.get_u64_le();
        Ok(ServicePacket::DestroySessionOk { session_id })
    }

    fn decode_destroy_session_none(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 8 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let session_id = cursor.get_u64_le();
        Ok(ServicePacket::DestroySessionNone { session_id })
    }

    fn decode_new_session_created(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 24 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let first_msg_id = cursor.get_u64_le();
        let server_salt = cursor.get_u64_le();
        let session_id = cursor.get_u64_le();

        Ok(ServicePacket::NewSessionCreated {
            first_msg_id,
            server_salt,
            session_id,
        })
    }

    fn decode_msg_container(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        if cursor.remaining() < 4 {
            return Err(PacketDecodeError::BufferTooSmall);
        }

        let count = cursor.get_u32_le() as usize;
        let mut messages = Vec::with_capacity(count);

        for _ in 0..count {
            if cursor.remaining() < 20 {
                return Err(PacketDecodeError::BufferTooSmall);
            }

            let msg_id = cursor.get_u64_le();
            let seqno = cursor.get_i32_le();
            let bytes = cursor.get_u32_le();

            if cursor.remaining() < bytes as usize {
                return Err(PacketDecodeError::BufferTooSmall);
            }

            let body = cursor.copy_to_bytes(bytes as usize);

            messages.push(ContainerMessage {
                msg_id,
                seqno,
                bytes,
                body,
            });
        }

        Ok(ServicePacket::MessageContainer { messages })
    }

    fn decode_gzip_packed(cursor: &mut Bytes) -> Result<Self, PacketDecodeError> {
        let mut buf = rustgram_types::tl::Bytes::new(cursor.copy_to_bytes(cursor.remaining()));
        let packed_data = rustgram_types::tl::TlHelper::read_bytes(&mut buf)
            .map_err(|_| PacketDecodeError::InvalidFormat)?;
        Ok(ServicePacket::GzipPacked {
            packed_data: Bytes::from(packed_data),
        })
    }
}

/// `gzip_packed#3072cfa1`'s payload: a deflate-compressed TL message,
/// wrapping whatever constructor actually came back (§4.2's "`gzip_packed`
/// — inner TL after inflate"). Decompression is bounded since a malicious or
/// corrupt stream could otherwise zip-bomb the caller.
pub struct GzipPacked;

impl GzipPacked {
    /// Caps decompressed output at 64 MiB — comfortably above any real
    /// MTProto response, well short of a zip-bomb's amplification.
    const MAX_INFLATED_LEN: u64 = 64 * 1024 * 1024;

    /// Inflates `packed_data` (the raw deflate stream from a decoded
    /// [`ServicePacket::GzipPacked`]) back into the TL bytes it wraps.
    pub fn inflate(packed_data: &[u8]) -> Result<Vec<u8>, PacketDecodeError> {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let mut decoder = GzDecoder::new(packed_data).take(Self::MAX_INFLATED_LEN);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|_| PacketDecodeError::InvalidFormat)?;
        Ok(out)
    }

    /// Deflates `data` into a gzip stream and wraps it as a bare
    /// `gzip_packed#3072cfa1 { packed_data: bytes }` TL value, symmetric
    /// with [`Self::inflate`]. Used when sending a request whose serialized
    /// body is large enough that compression is worthwhile.
    pub fn pack(data: &[u8]) -> Vec<u8> {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        // Writing to an in-memory Vec never fails.
        let _ = encoder.write_all(data);
        let compressed = encoder.finish().unwrap_or_default();

        let mut buf = bytes::BytesMut::with_capacity(8 + compressed.len());
        buf.extend_from_slice(&GZIP_PACKED_CONSTRUCTOR.to_le_bytes());
        rustgram_types::tl::TlHelper::write_bytes(&mut buf, &compressed);
        buf.to_vec()
    }
}

/// Message container decoder.
///
/// Decodes msg_container TL type.
pub struct ContainerDecoder;

impl ContainerDecoder {
    /// Decodes a message container.
    pub fn decode(data: &[u8]) -> Result<Vec<ContainerMessage>, PacketDecodeError> {
        match ServicePacket::decode(data)? {
            ServicePacket::MessageContainer { messages } => Ok(messages),
            _ => Err(PacketDecodeError::InvalidFormat),
        }
    }

    /// Encodes `messages` as a bare `msg_container#73f1f8dc` TL value: the
    /// constructor, an `i32` count, then each message as
    /// `{ msg_id: i64, seqno: i32, bytes: i32, body }` — the wire shape a
    /// multi-message envelope is wrapped in before encryption. The caller
    /// is responsible for assigning the container's
    /// own outer `msg_id`/`seqno` (this only builds the bare inner value);
    /// symmetric with [`ContainerDecoder::decode`].
    pub fn encode(messages: &[ContainerMessage]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + messages.iter().map(|m| 20 + m.body.len()).sum::<usize>());
        out.extend_from_slice(&MSG_CONTAINER_CONSTRUCTOR.to_le_bytes());
        out.extend_from_slice(&(messages.len() as u32).to_le_bytes());
        for message in messages {
            out.extend_from_slice(&message.msg_id.to_le_bytes());
            out.extend_from_slice(&message.seqno.to_le_bytes());
            out.extend_from_slice(&message.bytes.to_le_bytes());
            out.extend_from_slice(&message.body);
        }
        out
    }
}

/// Message container type alias.
pub type MessageContainer = Vec<ContainerMessage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pong() {
        let msg_id: u64 = 0xFEDCBA9876543210;
        let ping_id: u64 = 0x123456789ABCDEF0;

        let mut data = Vec::new();
        data.extend_from_slice(&PONG_CONSTRUCTOR.to_le_bytes());
        data.extend_from_slice(&msg_id.to_le_bytes());
        data.extend_from_slice(&ping_id.to_le_bytes());

        let packet = ServicePacket::decode(&data).unwrap();
        assert!(matches!(
            packet,
            ServicePacket::Pong { msg_id: m, ping_id: p } if m == msg_id && p == ping_id
        ));
    }

    #[test]
    fn test_decode_future_salts() {
        let mut data = Vec::new();
        data.extend_from_slice(&FUTURE_SALTS_CONSTRUCTOR.to_le_bytes());
        data.extend_from_slice(&7u64.to_le_bytes()); // req_msg_id
        data.extend_from_slice(&1000i32.to_le_bytes()); // now
        data.extend_from_slice(&2i32.to_le_bytes()); // count
        for i in 0..2u64 {
            data.extend_from_slice(&FUTURE_SALT_CONSTRUCTOR.to_le_bytes());
            data.extend_from_slice(&1000i32.to_le_bytes());
            data.extend_from_slice(&2000i32.to_le_bytes());
            data.extend_from_slice(&(42 + i).to_le_bytes());
        }

        let packet = ServicePacket::decode(&data).unwrap();
        match packet {
            ServicePacket::FutureSalts {
                req_msg_id,
                now,
                salts,
            } => {
                assert_eq!(req_msg_id, 7);
                assert_eq!(now, 1000);
                assert_eq!(salts.len(), 2);
                assert_eq!(salts[0], (1000, 2000, 42));
                assert_eq!(salts[1], (1000, 2000, 43));
            }
            _ => panic!("Unexpected packet type"),
        }
    }

    #[test]
    fn test_decode_rpc_result() {
        let mut data = Vec::new();
        data.extend_from_slice(&RPC_RESULT_CONSTRUCTOR.to_le_bytes());
        data.extend_from_slice(&99u64.to_le_bytes());
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let packet = ServicePacket::decode(&data).unwrap();
        match packet {
            ServicePacket::RpcResult { req_msg_id, body } => {
                assert_eq!(req_msg_id, 99);
                assert_eq!(&body[..], &[0xAA, 0xBB, 0xCC]);
            }
            _ => panic!("Unexpected packet type"),
        }
    }

    #[test]
    fn test_decode_ack() {
        let msg_ids: Vec<u64> = vec![1, 2, 3];

        let mut data = Vec::new();
        data.extend_from_slice(&MSGS_ACK_CONSTRUCTOR.to_le_bytes());
        data.extend_from_slice(&(msg_ids.len() as u32).to_le_bytes());
        for msg_id in msg_ids.iter() {
            data.extend_from_slice(&(*msg_id).to_le_bytes());
        }

        let packet = ServicePacket::decode(&data).unwrap();
        assert!(matches!(packet, ServicePacket::Ack { msg_ids: ids } if ids == msg_ids));
    }

    #[test]
    fn test_decode_unknown() {
        let data = vec![0xFF, 0xFF, 0xFF, 0xFF]; // Unknown constructor

        let packet = ServicePacket::decode(&data).unwrap();
        assert!(matches!(packet, ServicePacket::Unknown(0xFFFFFFFF)));
    }

    #[test]
    fn test_decode_buffer_too_small() {
        let data = vec![0x01]; // Too small

        let result = ServicePacket::decode(&data);
        assert!(matches!(result, Err(PacketDecodeError::BufferTooSmall)));
    }

    #[test]
    fn test_decode_bad_msg_notification() {
        let mut data = Vec::new();
        data.extend_from_slice(&BAD_MSG_NOTIFICATION_CONSTRUCTOR.to_le_bytes());
        data.extend_from_slice(&0x123456789ABCDEF0u64.to_le_bytes()); // bad_msg_id
        data.extend_from_slice(&1i32.to_le_bytes()); // bad_msg_seqno
        data.extend_from_slice(&2i32.to_le_bytes()); // error_code

        let packet = ServicePacket::decode(&data).unwrap();

        match packet {
            ServicePacket::BadMsgNotification {
                bad_msg_id,
                bad_msg_seqno,
                error_code,
                ..
            } => {
                assert_eq!(bad_msg_id, 0x123456789ABCDEF0);
                assert_eq!(bad_msg_seqno, 1);
                assert_eq!(error_code, 2);
            }
            _ => panic!("Unexpected packet type"),
        }
    }

    #[test]
    fn test_decode_new_session_created() {
        let mut data = Vec::new();
        data.extend_from_slice(&NEW_SESSION_CREATED_CONSTRUCTOR.to_le_bytes());
        data.extend_from_slice(&1u64.to_le_bytes()); // first_msg_id
        data.extend_from_slice(&2u64.to_le_bytes()); // server_salt
        data.extend_from_slice(&3u64.to_le_bytes()); // session_id

        let packet = ServicePacket::decode(&data).unwrap();

        match packet {
            ServicePacket::NewSessionCreated {
                first_msg_id,
                server_salt,
                session_id,
            } => {
                assert_eq!(first_msg_id, 1);
                assert_eq!(server_salt, 2);
                assert_eq!(session_id, 3);
            }
            _ => panic!("Unexpected packet type"),
        }
    }

    #[test]
    fn test_decode_msg_container() {
        let mut inner_msg = Vec::new();
        inner_msg.extend_from_slice(&0x12345678u32.to_le_bytes()); // Some constructor

        let mut data = Vec::new();
        data.extend_from_slice(&MSG_CONTAINER_CONSTRUCTOR.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes()); // count
        data.extend_from_slice(&1u64.to_le_bytes()); // msg_id
        data.extend_from_slice(&1i32.to_le_bytes()); // seqno
        data.extend_from_slice(&(inner_msg.len() as u32).to_le_bytes()); // bytes
        data.extend_from_slice(&inner_msg);

        let packet = ServicePacket::decode(&data).unwrap();

        match packet {
            ServicePacket::MessageContainer { messages } => {
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].msg_id, 1);
                assert_eq!(messages[0].seqno, 1);
            }
            _ => panic!("Unexpected packet type"),
        }
    }

    #[test]
    fn gzip_packed_round_trips_through_pack_and_inflate() {
        let inner_tl = {
            let mut data = Vec::new();
            data.extend_from_slice(&PONG_CONSTRUCTOR.to_le_bytes());
            data.extend_from_slice(&7u64.to_le_bytes());
            data.extend_from_slice(&9u64.to_le_bytes());
            data
        };

        let wire = GzipPacked::pack(&inner_tl);
        let packet = ServicePacket::decode(&wire).unwrap();

        let packed_data = match packet {
            ServicePacket::GzipPacked { packed_data } => packed_data,
            other => panic!("expected GzipPacked, got {:?}", other),
        };

        let inflated = GzipPacked::inflate(&packed_data).unwrap();
        assert_eq!(inflated, inner_tl);
    }

    #[test]
    fn container_encode_decode_round_trips_three_messages() {
        // A msg_container with 3 inner messages decodes back to 3
        // messages with correct msg_ids and seqnos.
        let messages = vec![
            ContainerMessage {
                msg_id: 0x6200000000000001,
                seqno: 1,
                bytes: 4,
                body: Bytes::from_static(&[0xAA, 0xBB, 0xCC, 0xDD]),
            },
            ContainerMessage {
                msg_id: 0x6200000000000002,
                seqno: 3,
                bytes: 8,
                body: Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8]),
            },
            ContainerMessage {
                msg_id: 0x6200000000000003,
                seqno: 5,
                bytes: 0,
                body: Bytes::new(),
            },
        ];

        let encoded = ContainerDecoder::encode(&messages);
        let decoded = ContainerDecoder::decode(&encoded).unwrap();

        assert_eq!(decoded, messages);
    }
}
