// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! TL wrapper constructors for the first query(ies) sent on a session.
//!
//! MTProto never sends an RPC query bare on a freshly bound session: the
//! very first query is wrapped in `invokeWithLayer`, which is itself
//! wrapped around `initConnection` so the server learns the client's API
//! layer and device info before it sees anything else. A query that must
//! be executed only after another one completes (rarely needed once a
//! session is established, but unavoidable right after a handshake when
//! two queries race for the same session) is wrapped in `invokeAfterMsg`
//! instead. All three wrappers are transparent: they carry exactly the
//! bytes of the inner, already-encoded query and decode to whatever the
//! inner query decodes to.

use bytes::{Bytes, BytesMut};
use rustgram_types::tl::TlHelper;

use crate::mtproto_header::MtprotoHeaderOptions;

/// Default MTProto API layer to negotiate via `invokeWithLayer`.
///
/// The spec leaves this unpinned ("design value at time of reference:
/// 121+"); callers that need a specific layer should pass it explicitly
/// to [`invoke_with_layer`] rather than relying on this constant.
pub const DEFAULT_LAYER: i32 = 181;

const INVOKE_WITH_LAYER_CONSTRUCTOR: u32 = 0xda9b0d0d;
const INVOKE_AFTER_MSG_CONSTRUCTOR: u32 = 0xcb9f372d;
const INIT_CONNECTION_CONSTRUCTOR: u32 = 0xc1cd5ea9;
const INVOKE_WITHOUT_UPDATES_CONSTRUCTOR: u32 = 0xbf9459b7;
const INPUT_CLIENT_PROXY_CONSTRUCTOR: u32 = 0x75a66cb5;

/// `inputClientProxy#75a66cb5 { address: string, port: int }`.
///
/// Carried by `initConnection` (flag bit 1, per the spec) when the
/// connection to the DC goes through an MTProto proxy, so the server can
/// account traffic to the proxy's advertised address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputClientProxy {
    /// Proxy address as seen by the client (not the DC's address).
    pub address: String,
    /// Proxy port.
    pub port: i32,
}

impl InputClientProxy {
    fn write(&self, buf: &mut BytesMut) {
        TlHelper::write_constructor_id(buf, INPUT_CLIENT_PROXY_CONSTRUCTOR);
        TlHelper::write_string(buf, &self.address);
        TlHelper::write_i32(buf, self.port);
    }
}

/// Wraps `query` in `invokeWithLayer#da9b0d0d { layer: int, query: !X } = X`.
///
/// `query` must already be a complete, constructor-prefixed TL value.
pub fn invoke_with_layer(layer: i32, query: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(8 + query.len());
    TlHelper::write_constructor_id(&mut buf, INVOKE_WITH_LAYER_CONSTRUCTOR);
    TlHelper::write_i32(&mut buf, layer);
    buf.extend_from_slice(query);
    buf.freeze()
}

/// Wraps `query` in `invokeAfterMsg#cb9f372d { msg_id: long, query: !X } = X`.
///
/// `msg_id` is the MTProto message id of the query this one must not be
/// processed ahead of.
pub fn invoke_after_msg(msg_id: i64, query: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(12 + query.len());
    TlHelper::write_constructor_id(&mut buf, INVOKE_AFTER_MSG_CONSTRUCTOR);
    TlHelper::write_i64(&mut buf, msg_id);
    buf.extend_from_slice(query);
    buf.freeze()
}

/// Wraps `query` in `invokeWithoutUpdates#bf9459b7 { query: !X } = X`.
///
/// Used so the handshake's own bootstrap traffic (`help.getConfig` and
/// friends) is never mistaken by the server for a source of updates, per
/// §4.2.1.
pub fn invoke_without_updates(query: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + query.len());
    TlHelper::write_constructor_id(&mut buf, INVOKE_WITHOUT_UPDATES_CONSTRUCTOR);
    buf.extend_from_slice(query);
    buf.freeze()
}

/// Wraps `query` in
/// `initConnection#c1cd5ea9 { flags, api_id, device_model, system_version,
/// app_version, system_lang_code, lang_pack, lang_code, proxy?, query: !X } = X`.
///
/// `proxy` occupies flag bit 1, matching the spec's constructor note; when
/// `None` the bit is cleared and the field is omitted entirely.
pub fn init_connection(
    options: &MtprotoHeaderOptions,
    proxy: Option<&InputClientProxy>,
    query: &[u8],
) -> Bytes {
    let flags: i32 = if proxy.is_some() { 1 << 1 } else { 0 };

    let mut buf = BytesMut::with_capacity(64 + query.len());
    TlHelper::write_constructor_id(&mut buf, INIT_CONNECTION_CONSTRUCTOR);
    TlHelper::write_i32(&mut buf, flags);
    TlHelper::write_i32(&mut buf, options.api_id());
    TlHelper::write_string(&mut buf, options.device_model());
    TlHelper::write_string(&mut buf, options.system_version());
    TlHelper::write_string(&mut buf, options.application_version());
    TlHelper::write_string(&mut buf, options.system_language_code());
    TlHelper::write_string(&mut buf, options.language_pack());
    TlHelper::write_string(&mut buf, options.language_code());
    if let Some(proxy) = proxy {
        proxy.write(&mut buf);
    }
    buf.extend_from_slice(query);
    buf.freeze()
}

/// Builds the wrapper chain a freshly bound session sends its first query
/// through: `invokeWithLayer(layer, initConnection(options, proxy, invokeWithoutUpdates(query)))`.
///
/// This is the shape every MTProto client uses to open a session: the
/// innermost `invokeWithoutUpdates` keeps the handshake/bootstrap query
/// from being treated as an update source, `initConnection` attaches
/// device/API metadata once per connection, and `invokeWithLayer` pins
/// the schema layer the server should use to interpret everything above.
pub fn first_query(
    layer: i32,
    options: &MtprotoHeaderOptions,
    proxy: Option<&InputClientProxy>,
    query: &[u8],
) -> Bytes {
    let without_updates = invoke_without_updates(query);
    let connection = init_connection(options, proxy, &without_updates);
    invoke_with_layer(layer, &connection)
}
