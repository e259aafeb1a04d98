// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Packet handlers for MTProto sessions.
//!
//! This module implements handlers for processing different packet types.

use crate::packet::PacketInfo;

use super::packets::{PacketDecodeError, ServicePacket};

/// Result of packet handling.
#[derive(Debug, Clone)]
pub enum PacketHandlerResult {
    /// Packet was handled successfully
    Handled,

    /// Packet should be passed to next handler
    Pass,

    /// Packet was handled and a response should be sent
    Respond(Vec<u8>),

    /// Packet handling failed
    Error(String),
}

/// Packet handler trait.
pub trait PacketHandler: Send + Sync {
    /// Handles a packet.
    ///
    /// Returns a PacketHandlerResult indicating what to do next.
    fn handle(&self, packet: &[u8], packet_info: &PacketInfo) -> PacketHandlerResult;

    /// Returns the priority of this handler (lower = earlier).
    fn priority(&self) -> i32 {
        0
    }
}

/// Service packet handler.
///
/// Handles MTProto service packets like ping/pong, ack, etc.
pub struct ServicePacketHandler {
    /// Callback for pong packets
    pong_callback: parking_lot::Mutex<Box<dyn Fn(u64) + Send>>,

    /// Callback for `bad_server_salt` notifications: `(bad_msg_id,
    /// new_server_salt)`. The next outgoing packet after this fires must
    /// use `new_server_salt`.
    bad_salt_callback: parking_lot::Mutex<Box<dyn Fn(u64, u64) + Send>>,
}

impl ServicePacketHandler {
    /// Creates a new service packet handler.
    pub fn new() -> Self {
        Self {
            pong_callback: parking_lot::Mutex::new(Box::new(|_| {})),
            bad_salt_callback: parking_lot::Mutex::new(Box::new(|_, _| {})),
        }
    }

    /// Sets the pong callback.
    pub fn set_pong_callback<F>(&self, callback: F)
    where
        F: Fn(u64) + Send + 'static,
    {
        *self.pong_callback.lock() = Box::new(callback);
    }

    /// Sets the `bad_server_salt` callback, invoked with `(bad_msg_id,
    /// new_server_salt)` whenever the server rejects a message over a
    /// stale salt.
    pub fn set_bad_salt_callback<F>(&self, callback: F)
    where
        F: Fn(u64, u64) + Send + 'static,
    {
        *self.bad_salt_callback.lock() = Box::new(callback);
    }
}

impl Default for ServicePacketHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketHandler for ServicePacketHandler {
    fn handle(&self, packet: &[u8], _packet_info: &PacketInfo) -> PacketHandlerResult {
        match ServicePacket::decode(packet) {
            Ok(service_packet) => self.handle_service_packet(service_packet),
            Err(PacketDecodeError::UnknownConstructor(_)) => {
                // Not a service packet, pass to next handler
                PacketHandlerResult::Pass
            }
            Err(e) => PacketHandlerResult::Error(format!("Failed to decode packet: {}", e)),
        }
    }

    fn priority(&self) -> i32 {
        -100 // High priority for service packets
    }
}

impl ServicePacketHandler {
    fn handle_service_packet(&self, packet: ServicePacket) -> PacketHandlerResult {
        match packet {
            ServicePacket::Pong { msg_id, ping_id } => {
                (self.pong_callback.lock())(ping_id);
                tracing::trace!("Received pong: msg_id={}, ping_id={}", msg_id, ping_id);
                PacketHandlerResult::Handled
            }
            ServicePacket::Ack { msg_ids } => {
                tracing::trace!("Received ack for {} messages", msg_ids.len());
                PacketHandlerResult::Handled
            }
            ServicePacket::NewSessionCreated {
                first_msg_id,
                server_salt,
                session_id,
            } => {
                tracing::debug!(
                    "New session created: first_msg_id={}, server_salt={}, session_id={}",
                    first_msg_id,
                    server_salt,
                    session_id
                );
                PacketHandlerResult::Handled
            }
            ServicePacket::BadMsgNotification {
                bad_msg_id,
                error_code,
                ..
            } => {
                tracing::warn!(
                    "Bad message notification: msg_id={}, error_code={}",
                    bad_msg_id,
                    error_code
                );
                PacketHandlerResult::Handled
            }
            ServicePacket::BadServerSalt {
                bad_msg_id,
                new_server_salt,
                ..
            } => {
                tracing::warn!(
                    "Bad server salt: msg_id={}, new_salt={}",
                    bad_msg_id,
                    new_server_salt
                );
                (self.bad_salt_callback.lock())(bad_msg_id, new_server_salt);
                PacketHandlerResult::Handled
            }
            ServicePacket::MsgResendReq { msg_ids } => {
                tracing::debug!("Message resend request: {:?} messages", msg_ids.len());
                PacketHandlerResult::Handled
            }
            ServicePacket::MsgsAck { .. } => {
                // We should process these
                PacketHandlerResult::Handled
            }
            ServicePacket::MessageContainer { messages } => {
                tracing::trace!(
                    "Received message container with {} messages",
                    messages.len()
                );
                // Container should be unpacked and each message processed separately
                PacketHandlerResult::Handled
            }
            ServicePacket::GzipPacked { packed_data } => {
                match super::packets::GzipPacked::inflate(&packed_data) {
                    Ok(inner) => match ServicePacket::decode(&inner) {
                        // A service packet underneath the gzip wrapper
                        // (bad_server_salt, future_salts, ... are all
                        // observed compressed in practice): unwrap and
                        // handle it exactly as if it had arrived bare.
                        Ok(inner_packet) => self.handle_service_packet(inner_packet),
                        // Not a service packet once inflated — an
                        // application-layer `rpc_result` body, most likely.
                        // The outer dispatcher (outside this handler chain)
                        // is the one that matches requests to responses; it
                        // sees the original compressed bytes and re-inflates
                        // them itself via `GzipPacked::inflate`.
                        Err(PacketDecodeError::UnknownConstructor(_)) => {
                            PacketHandlerResult::Pass
                        }
                        Err(e) => {
                            PacketHandlerResult::Error(format!("bad gzip_packed payload: {}", e))
                        }
                    },
                    Err(e) => {
                        PacketHandlerResult::Error(format!("failed to inflate gzip_packed: {}", e))
                    }
                }
            }
            ServicePacket::Unknown(constructor) => {
                tracing::warn!("Unknown service packet constructor: 0x{:08x}", constructor);
                PacketHandlerResult::Handled
            }
        }
    }
}

/// Chain of packet handlers.
///
/// Processes packets through multiple handlers in priority order.
pub struct PacketHandlerChain {
    /// Handlers in priority order
    handlers: parking_lot::Mutex<Vec<Box<dyn PacketHandler>>>,

    /// Whether to stop after first handled
    stop_on_handled: bool,
}

impl PacketHandlerChain {
    /// Creates a new packet handler chain.
    pub fn new() -> Self {
        Self {
            handlers: parking_lot::Mutex::new(Vec::new()),
            stop_on_handled: true,
        }
    }

    /// Adds a handler to the chain.
    pub fn add_handler(&self, handler: Box<dyn PacketHandler>) {
        let mut handlers = self.handlers.lock();
        handlers.push(handler);
        handlers.sort_by_key(|h| h.priority());
    }

    /// Processes a packet through all handlers.
    pub fn process(&self, packet: &[u8], packet_info: &PacketInfo) -> PacketHandlerResult {
        let handlers = self.handlers.lock();

        for handler in handlers.iter() {
            let result = handler.handle(packet, packet_info);

            match result {
                PacketHandlerResult::Handled => {
                    if self.stop_on_handled {
                        return PacketHandlerResult::Handled;
                    }
                }
                PacketHandlerResult::Pass => continue,
                PacketHandlerResult::Respond(_) | PacketHandlerResult::Error(_) => return result,
            }
        }

        PacketHandlerResult::Handled
    }

    /// Sets whether to stop after first handled.
    pub fn set_stop_on_handled(&mut self, value: bool) {
        self.stop_on_handled = value;
    }
}

impl Default for PacketHandlerChain {
    fn default() -> Self {
        Self::new()
    }
}
