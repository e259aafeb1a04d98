// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Obfuscated transport framing (EF / DD / TLS modes).
//!
//! This module implements the randomly-keyed AES-256-CTR obfuscation layer
//! that wraps a raw TCP byte stream before any MTProto framing is applied.
//! It is a distinct concern from [`crate::transport::header`] (the
//! `auth_key_id | msg_key | ciphertext` envelope) and from the plain
//! length-prefixed Abridged/Intermediate framing in the parent module: this
//! layer exists purely to make the wire stream look like unstructured noise
//! to a passive observer, independent of whether the MTProto payload itself
//! is already AES-IGE encrypted.
//!
//! Three framing modes share the same CTR keystream derivation and differ
//! only in how a frame's length is encoded on the wire:
//!
//! - **EF**: classic Abridged-style length, stored as `payload_len / 4`,
//!   one byte if `< 0x7f` else a `0x7f` marker followed by a 24-bit length.
//! - **DD**: a plain 4-byte little-endian payload length, no scaling.
//! - **TLS**: identical framing to DD; the TLS-ClientHello-shaped prelude
//!   that disguises the obfuscation handshake as a TLS connection is a
//!   masquerade concern layered in front of this module and out of scope
//!   here.
//!
//! # References
//!
//! - MTProto transport obfuscation:
//!   <https://core.telegram.org/mtproto/mtproto-transports#transport-obfuscation>
//! - Sibling module: `crate::transport::header` (the envelope header this
//!   layer's frames eventually carry as payload).

use aes::Aes256;
use bytes::{Buf, BytesMut};
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use thiserror::Error;

use crate::crypto::sha256;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Maximum accepted frame payload length.
pub const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// Byte patterns the random first-packet header must never start with.
///
/// Compared against the first four bytes of the header interpreted as a
/// little-endian `u32`; these are the ASCII prefixes of common plaintext
/// protocols (`HEAD`, `POST`, `GET `, `OPTI`) plus the two legacy
/// intermediate-transport magics and the leading bytes of a TLS handshake
/// record, all of which a passive firewall might otherwise fingerprint.
const FORBIDDEN_PREFIXES: [u32; 7] = [
    0x44414548, // "HEAD"
    0x54534f50, // "POST"
    0x20544547, // "GET "
    0x4954504f, // "OPTI"
    0xeeee_eeee,
    0xdddd_dddd,
    0x0201_0316,
];

/// Obfuscated framing mode, selected by the first byte of the server secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObfuscationMode {
    /// No/legacy secret: Abridged-style `payload_len / 4` framing.
    Ef,
    /// Secret starts with `0xDD`: 4-byte little-endian payload length.
    Dd,
    /// Secret starts with `0xEE`: same length encoding as DD, behind a
    /// TLS-ClientHello-shaped masquerade prelude (not built here).
    Tls,
}

impl ObfuscationMode {
    /// Selects the mode implied by a (possibly absent) server secret.
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        match secret.first() {
            Some(0xdd) => Self::Dd,
            Some(0xee) => Self::Tls,
            _ => Self::Ef,
        }
    }

    /// The 4-byte tag written at `header[56..60]`.
    const fn tag(self) -> [u8; 4] {
        match self {
            Self::Ef => [0xef, 0xef, 0xef, 0xef],
            Self::Dd => [0xdd, 0xdd, 0xdd, 0xdd],
            Self::Tls => [0xee, 0xee, 0xee, 0xee],
        }
    }

    /// Whether this mode requires `payload_len` to be a multiple of 4.
    const fn requires_alignment(self) -> bool {
        matches!(self, Self::Ef)
    }
}

/// Errors raised while building or parsing obfuscated frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObfuscationError {
    /// A declared frame length exceeded [`MAX_FRAME_LEN`].
    #[error("obfuscated frame length {0} exceeds maximum {MAX_FRAME_LEN}")]
    LengthTooLarge(usize),

    /// EF mode requires 4-byte-aligned lengths.
    #[error("EF-mode frame length {0} is not a multiple of 4")]
    Misaligned(usize),
}

/// One decoded unit from the obfuscated read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObfuscatedFrame {
    /// A complete frame payload (post length-prefix, pre envelope-codec).
    Packet(Vec<u8>),
    /// A quick-ack: the low 31 bits of the first length word.
    QuickAck(u32),
}

/// The running AES-256-CTR state for one direction of an obfuscated stream.
struct DirectionalCipher {
    cipher: Aes256Ctr,
}

impl DirectionalCipher {
    fn new(key: &[u8; 32], iv: &[u8; 16]) -> Self {
        Self {
            cipher: Aes256Ctr::new(key.into(), iv.into()),
        }
    }

    fn apply(&mut self, data: &mut [u8]) {
        self.cipher.apply_keystream(data);
    }
}

/// Derives the per-direction 32-byte key and 16-byte IV from a 48-byte
/// window of the first-packet header plus the (already secret-adjusted)
/// secret suffix.
///
/// `window` is `header[8..56]` for the encrypt direction, or that same
/// slice byte-reversed for the decrypt direction. The first
/// 32 bytes of the window are hashed together with the secret to produce
/// the key; the final 16 bytes of the window are used directly as the IV.
fn derive_key_iv(window: &[u8; 48], secret_suffix: &[u8]) -> ([u8; 32], [u8; 16]) {
    let mut hash_input = Vec::with_capacity(32 + secret_suffix.len());
    hash_input.extend_from_slice(&window[0..32]);
    hash_input.extend_from_slice(secret_suffix);
    let key = sha256(&hash_input);

    let mut iv = [0u8; 16];
    iv.copy_from_slice(&window[32..48]);
    (key, iv)
}

/// Returns the secret bytes actually mixed into the key derivation: up to
/// 16 bytes, skipping a leading `0xDD`/`0xEE` tag byte when present (that
/// byte only selects [`ObfuscationMode`], it carries no keying material).
fn secret_suffix(secret: &[u8]) -> &[u8] {
    let skip = match secret.first() {
        Some(0xdd) | Some(0xee) => 1,
        _ => 0,
    };
    let rest = &secret[skip.min(secret.len())..];
    &rest[..rest.len().min(16)]
}

fn reversed(window: &[u8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    for (i, b) in window.iter().rev().enumerate() {
        out[i] = *b;
    }
    out
}

/// Builds the unencrypted length-prefixed frame body for `mode`, appending
/// `padding` to `payload` and (EF only) zero-padding to a 4-byte boundary.
/// Shared by [`ObfuscatedSession::encode_frame`] and
/// [`ObfuscatedEncodeHalf::encode_frame`] so the two never drift apart.
fn build_frame(
    mode: ObfuscationMode,
    payload: &[u8],
    padding: &[u8],
) -> Result<Vec<u8>, ObfuscationError> {
    let mut body = Vec::with_capacity(payload.len() + padding.len() + 4);
    body.extend_from_slice(payload);
    body.extend_from_slice(padding);

    if mode.requires_alignment() {
        while body.len() % 4 != 0 {
            body.push(0);
        }
    }

    let mut framed = match mode {
        ObfuscationMode::Ef => {
            let words = body.len() / 4;
            if words < 0x7f {
                vec![words as u8]
            } else {
                let mut h = vec![0x7f_u8];
                h.extend_from_slice(&(words as u32).to_le_bytes()[0..3]);
                h
            }
        }
        ObfuscationMode::Dd | ObfuscationMode::Tls => (body.len() as u32).to_le_bytes().to_vec(),
    };
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Pulls one complete frame out of `staging` for `mode`, if present. Shared
/// by [`ObfuscatedSession::try_extract`] and
/// [`ObfuscatedDecodeHalf::try_extract`].
fn extract_frame(
    mode: ObfuscationMode,
    staging: &mut BytesMut,
) -> Result<Option<ObfuscatedFrame>, ObfuscationError> {
    if staging.is_empty() {
        return Ok(None);
    }

    let first = staging[0];
    if first & 0x80 != 0 {
        if staging.len() < 4 {
            return Ok(None);
        }
        let word = u32::from_le_bytes(staging[0..4].try_into().expect("4 bytes"));
        staging.advance(4);
        return Ok(Some(ObfuscatedFrame::QuickAck(word & 0x7fff_ffff)));
    }

    let (header_len, payload_len) = match mode {
        ObfuscationMode::Ef => {
            if first == 0x7f {
                if staging.len() < 4 {
                    return Ok(None);
                }
                let words = u32::from_le_bytes([staging[1], staging[2], staging[3], 0]);
                (4, words as usize * 4)
            } else {
                (1, first as usize * 4)
            }
        }
        ObfuscationMode::Dd | ObfuscationMode::Tls => {
            if staging.len() < 4 {
                return Ok(None);
            }
            let len = u32::from_le_bytes(staging[0..4].try_into().expect("4 bytes"));
            (4, len as usize)
        }
    };

    if payload_len > MAX_FRAME_LEN {
        return Err(ObfuscationError::LengthTooLarge(payload_len));
    }
    if mode.requires_alignment() && payload_len % 4 != 0 {
        return Err(ObfuscationError::Misaligned(payload_len));
    }

    if staging.len() < header_len + payload_len {
        return Ok(None);
    }

    staging.advance(header_len);
    let body = staging.split_to(payload_len).to_vec();
    Ok(Some(ObfuscatedFrame::Packet(body)))
}

/// The send-only half of a split [`ObfuscatedSession`] (see
/// [`ObfuscatedSession::split`]): owns the encrypt CTR context only.
pub struct ObfuscatedEncodeHalf {
    mode: ObfuscationMode,
    enc: DirectionalCipher,
}

impl ObfuscatedEncodeHalf {
    /// Frames, length-prefixes, and CTR-encrypts one outgoing payload.
    /// Identical semantics to [`ObfuscatedSession::encode_frame`].
    pub fn encode_frame(
        &mut self,
        payload: &[u8],
        padding: &[u8],
    ) -> Result<Vec<u8>, ObfuscationError> {
        let mut framed = build_frame(self.mode, payload, padding)?;
        self.enc.apply(&mut framed);
        Ok(framed)
    }
}

/// The receive-only half of a split [`ObfuscatedSession`] (see
/// [`ObfuscatedSession::split`]): owns the decrypt CTR context and the
/// read-side staging buffer.
pub struct ObfuscatedDecodeHalf {
    mode: ObfuscationMode,
    dec: DirectionalCipher,
    staging: BytesMut,
}

impl ObfuscatedDecodeHalf {
    /// Feeds newly-received (still-obfuscated) bytes into the session.
    /// Identical semantics to [`ObfuscatedSession::feed`].
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<ObfuscatedFrame>, ObfuscationError> {
        let mut decrypted = data.to_vec();
        self.dec.apply(&mut decrypted);
        self.staging.extend_from_slice(&decrypted);

        let mut out = Vec::new();
        while let Some(frame) = extract_frame(self.mode, &mut self.staging)? {
            out.push(frame);
        }
        Ok(out)
    }
}

/// An established obfuscated-transport session: one encrypt and one
/// decrypt CTR context, plus the read-side staging buffer for partial
/// frames across socket reads.
pub struct ObfuscatedSession {
    mode: ObfuscationMode,
    enc: DirectionalCipher,
    dec: DirectionalCipher,
    staging: BytesMut,
}

impl ObfuscatedSession {
    /// Builds a new session: generates the random 64-byte first packet,
    /// derives both CTR contexts, and returns `(header_to_send, session)`.
    ///
    /// `dc_id` is the target datacenter id (positive; the caller adds
    /// 10000 for the test backend, matching the production convention for
    /// distinguishing test DCs at this layer).
    /// `secret` may be empty (EF mode, no embedded dc id).
    pub fn generate<R: RngCore>(rng: &mut R, secret: &[u8], dc_id: i32) -> (Vec<u8>, Self) {
        let mode = ObfuscationMode::from_secret(secret);

        let mut header = [0u8; 64];
        loop {
            rng.fill_bytes(&mut header);
            let prefix = u32::from_le_bytes(header[0..4].try_into().expect("4 bytes"));
            if FORBIDDEN_PREFIXES.contains(&prefix) {
                continue;
            }
            if header[4..8] == [0, 0, 0, 0] {
                continue;
            }
            break;
        }

        header[56..60].copy_from_slice(&mode.tag());
        if !secret.is_empty() {
            let dc = i16::try_from(dc_id).unwrap_or(i16::MAX);
            header[60..62].copy_from_slice(&dc.to_le_bytes());
        }

        let suffix = secret_suffix(secret);
        let window: [u8; 48] = header[8..56].try_into().expect("48 bytes");
        let (enc_key, enc_iv) = derive_key_iv(&window, suffix);
        let (dec_key, dec_iv) = derive_key_iv(&reversed(&window), suffix);

        let mut enc = DirectionalCipher::new(&enc_key, &enc_iv);
        let dec = DirectionalCipher::new(&dec_key, &dec_iv);

        let mut wire_header = header;
        enc.apply(&mut wire_header);
        // The identifier bytes sent on the wire are the ciphertext of
        // header[56..64]; everything before that stays in the clear so the
        // peer can replay the same derivation from what it just received.
        header[56..64].copy_from_slice(&wire_header[56..64]);

        (
            header.to_vec(),
            Self {
                mode,
                enc,
                dec,
                staging: BytesMut::new(),
            },
        )
    }

    /// The framing mode this session negotiated.
    #[must_use]
    pub const fn mode(&self) -> ObfuscationMode {
        self.mode
    }

    /// Frames, length-prefixes, and CTR-encrypts one outgoing payload.
    ///
    /// `padding` extra bytes (already generated by the caller) are appended
    /// after `payload` before the length is computed and are encrypted as
    /// part of the frame; EF mode additionally zero-pads to a 4-byte
    /// boundary if `payload.len() + padding.len()` is not already aligned.
    pub fn encode_frame(
        &mut self,
        payload: &[u8],
        padding: &[u8],
    ) -> Result<Vec<u8>, ObfuscationError> {
        let mut framed = build_frame(self.mode, payload, padding)?;
        self.enc.apply(&mut framed);
        Ok(framed)
    }

    /// Splits the session into independent send/receive halves so each can
    /// be owned by a different half of a split TCP stream (see
    /// `TcpTransport::split`). The encrypt and decrypt CTR contexts are
    /// already independent (derived from opposite-direction windows), so
    /// this is a plain field move, not a new derivation.
    #[must_use]
    pub fn split(self) -> (ObfuscatedEncodeHalf, ObfuscatedDecodeHalf) {
        (
            ObfuscatedEncodeHalf {
                mode: self.mode,
                enc: self.enc,
            },
            ObfuscatedDecodeHalf {
                mode: self.mode,
                dec: self.dec,
                staging: self.staging,
            },
        )
    }

    /// Feeds newly-received (still-obfuscated) bytes into the session,
    /// decrypting them and returning every complete frame the staging
    /// buffer now contains.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<ObfuscatedFrame>, ObfuscationError> {
        let mut decrypted = data.to_vec();
        self.dec.apply(&mut decrypted);
        self.staging.extend_from_slice(&decrypted);

        let mut out = Vec::new();
        loop {
            match self.try_extract()? {
                Some(frame) => out.push(frame),
                None => break,
            }
        }
        Ok(out)
    }

    fn try_extract(&mut self) -> Result<Option<ObfuscatedFrame>, ObfuscationError> {
        extract_frame(self.mode, &mut self.staging)
    }

    /// Test-only: decrypts with this session's own `enc` context instead of
    /// `dec`. Production peers are different endpoints whose `enc`/`dec`
    /// contexts are each other's mirror image (derived from the same
    /// 48-byte window, one reversed); reusing one session's `enc` context
    /// as its own "peer" lets a unit test round-trip `encode_frame`/`feed`
    /// without standing up a second, independent session.
    #[cfg(test)]
    fn feed_as_peer(&mut self, data: &[u8]) -> Result<Vec<ObfuscatedFrame>, ObfuscationError> {
        let mut decrypted = data.to_vec();
        self.enc.apply(&mut decrypted);
        self.staging.extend_from_slice(&decrypted);

        let mut out = Vec::new();
        while let Some(frame) = self.try_extract()? {
            out.push(frame);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn header_is_64_bytes_and_avoids_forbidden_prefixes() {
        let mut rng = StdRng::seed_from_u64(7);
        let (header, _session) = ObfuscatedSession::generate(&mut rng, &[], 2);
        assert_eq!(header.len(), 64);
        let prefix = u32::from_le_bytes(header[0..4].try_into().unwrap());
        assert!(!FORBIDDEN_PREFIXES.contains(&prefix));
        assert_ne!(&header[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn header_tag_matches_mode() {
        let mut rng = StdRng::seed_from_u64(1);
        let (header, session) = ObfuscatedSession::generate(&mut rng, &[], 2);
        assert_eq!(session.mode(), ObfuscationMode::Ef);
        assert_eq!(&header[56..60], &[0xef, 0xef, 0xef, 0xef]);

        let secret_dd = vec![0xdd; 17];
        let mut rng = StdRng::seed_from_u64(1);
        let (header, session) = ObfuscatedSession::generate(&mut rng, &secret_dd, 2);
        assert_eq!(session.mode(), ObfuscationMode::Dd);
        assert_eq!(&header[56..60], &[0xdd, 0xdd, 0xdd, 0xdd]);

        let secret_ee = vec![0xee; 17];
        let mut rng = StdRng::seed_from_u64(1);
        let (header, session) = ObfuscatedSession::generate(&mut rng, &secret_ee, 2);
        assert_eq!(session.mode(), ObfuscationMode::Tls);
        assert_eq!(&header[56..60], &[0xee, 0xee, 0xee, 0xee]);
    }

    #[test]
    fn dc_id_embedded_when_secret_present() {
        let secret = vec![0xdd; 17];
        let mut rng = StdRng::seed_from_u64(3);
        let (header, _session) = ObfuscatedSession::generate(&mut rng, &secret, 2 + 10000);
        let dc = i16::from_le_bytes(header[60..62].try_into().unwrap());
        assert_eq!(dc, 10002);
    }

    #[test]
    fn dc_id_not_written_without_secret() {
        // header[60..62] is left as random padding when there's no secret
        // (EF mode over a plain TCP port, no per-proxy DC tagging needed).
        let mut rng = StdRng::seed_from_u64(3);
        let (header, _session) = ObfuscatedSession::generate(&mut rng, &[], 5);
        assert_eq!(header.len(), 64);
    }

    fn framing_round_trip(mode_secret: &[u8], body_len: usize) {
        let mut rng = StdRng::seed_from_u64(99);
        let (_header, mut session) = ObfuscatedSession::generate(&mut rng, mode_secret, 2);

        let body: Vec<u8> = (0..body_len).map(|i| (i % 251) as u8).collect();
        let framed = session.encode_frame(&body, &[]).unwrap();

        let mut rng = StdRng::seed_from_u64(99);
        let (_h, mut peer) = ObfuscatedSession::generate(&mut rng, mode_secret, 2);
        let frames = peer.feed_as_peer(&framed).unwrap();

        assert_eq!(frames.len(), 1);
        match &frames[0] {
            ObfuscatedFrame::Packet(p) => assert_eq!(p.as_slice(), body.as_slice()),
            ObfuscatedFrame::QuickAck(_) => panic!("expected packet, got quick-ack"),
        }
        assert!(peer.staging.is_empty());
    }

    #[test]
    fn ef_framing_round_trips_various_sizes() {
        for len in [0, 1, 2, 127, 128, 2044, 16384] {
            framing_round_trip(&[], len);
        }
    }

    #[test]
    fn dd_framing_round_trips_various_sizes() {
        let secret = vec![0xdd; 17];
        for len in [0, 1, 2, 127, 128, 2044, 16384] {
            framing_round_trip(&secret, len);
        }
    }

    #[test]
    fn tls_framing_round_trips_various_sizes() {
        let secret = vec![0xee; 17];
        for len in [0, 1, 2, 127, 128, 2044, 16384] {
            framing_round_trip(&secret, len);
        }
    }

    #[test]
    fn quick_ack_delivers_low_31_bits_and_advances_exactly_4_bytes() {
        let mut rng = StdRng::seed_from_u64(5);
        let (_h, mut peer) = ObfuscatedSession::generate(&mut rng, &[], 2);

        let ack_id: u32 = 0x1234_5678 & 0x7fff_ffff;
        let word = ack_id | 0x8000_0000;
        let mut plaintext = word.to_le_bytes().to_vec();
        plaintext.extend_from_slice(b"trailing-bytes-for-next-frame");

        let mut encrypted = plaintext.clone();
        peer.enc.apply(&mut encrypted);

        let frames = peer.feed_as_peer(&encrypted).unwrap();
        assert_eq!(frames[0], ObfuscatedFrame::QuickAck(ack_id));
        // Exactly 4 bytes were consumed for the ack; the rest stays staged
        // (no valid length follows it in this synthetic test, so it waits).
        assert_eq!(peer.staging.len(), plaintext.len() - 4);
    }

    #[test]
    fn oversized_length_is_a_protocol_error() {
        let mut rng = StdRng::seed_from_u64(11);
        let (_h, mut peer) = ObfuscatedSession::generate(&mut rng, &[], 2);

        let bogus_len: u32 = (MAX_FRAME_LEN as u32) + 4;
        let mut plaintext = bogus_len.to_le_bytes().to_vec();
        plaintext.extend_from_slice(&[0u8; 16]);

        let mut encrypted = plaintext;
        peer.enc.apply(&mut encrypted);

        let err = peer.feed_as_peer(&encrypted).unwrap_err();
        assert_eq!(err, ObfuscationError::LengthTooLarge(bogus_len as usize));
    }

    #[test]
    fn split_reads_reassemble_into_one_frame() {
        // Mirrors scenario S3: a packet whose bytes arrive across three
        // separate feed() calls must still decode as exactly one frame.
        let mut rng = StdRng::seed_from_u64(21);
        let (_h, mut encoder) = ObfuscatedSession::generate(&mut rng, &[], 2);
        let body = vec![0xAB_u8; 40];
        let framed = encoder.encode_frame(&body, &[]).unwrap();

        let mut rng = StdRng::seed_from_u64(21);
        let (_h2, mut peer) = ObfuscatedSession::generate(&mut rng, &[], 2);

        assert!(framed.len() > 24);
        let (a, rest) = framed.split_at(8);
        let (b, c) = rest.split_at(16);

        assert!(peer.feed_as_peer(a).unwrap().is_empty());
        assert!(peer.feed_as_peer(b).unwrap().is_empty());
        let frames = peer.feed_as_peer(c).unwrap();
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            ObfuscatedFrame::Packet(p) => assert_eq!(p.as_slice(), body.as_slice()),
            ObfuscatedFrame::QuickAck(_) => panic!("expected packet"),
        }
        assert!(peer.staging.is_empty());
    }

    #[test]
    fn secret_suffix_skips_mode_tag_byte() {
        let secret = vec![0xdd, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        let suffix = secret_suffix(&secret);
        assert_eq!(suffix, &secret[1..17]);

        let secret = vec![0x01, 2, 3, 4];
        let suffix = secret_suffix(&secret);
        assert_eq!(suffix, &secret[..]);
    }

    #[test]
    fn enc_and_dec_derivation_differ() {
        // The encrypt direction hashes header[8..56]; the decrypt direction
        // hashes the same window byte-reversed. A regression that derives
        // both directions from the same (unreversed) window would make a
        // connection's outgoing and incoming streams share a keystream,
        // silently breaking confidentiality in one direction.
        let mut window = [0u8; 48];
        for (i, b) in window.iter_mut().enumerate() {
            *b = i as u8;
        }
        let (enc_key, enc_iv) = derive_key_iv(&window, &[]);
        let (dec_key, dec_iv) = derive_key_iv(&reversed(&window), &[]);
        assert_ne!(enc_key, dec_key);
        assert_ne!(enc_iv, dec_iv);
    }

    #[test]
    fn misaligned_error_message() {
        let err = ObfuscationError::Misaligned(5);
        assert_eq!(
            format!("{err}"),
            "EF-mode frame length 5 is not a multiple of 4"
        );
    }
}

