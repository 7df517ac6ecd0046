//! Signed, expiring session tokens.
//!
//! [`TokenCodec`] mints opaque session tokens and seals them into a
//! tamper-evident wire string with an embedded timestamp:
//!
//! ```text
//! base64url( "<unix seconds>.<token>.<mac hex>" )
//! ```
//!
//! The MAC is an HMAC-SHA256 over `"<unix seconds>.<token>"`, so the
//! timestamp cannot be rewound or extended without invalidating the
//! signature. Verification happens entirely from the wire string, with no
//! server-side token table and no revocation list.
//!
//! ```rust
//! use std::time::Duration;
//! use plinth::TokenCodec;
//!
//! let codec = TokenCodec::new("not so secret key", Duration::from_secs(60));
//! let token = codec.generate();
//! let wire = codec.encode(&token);
//! assert_eq!(codec.decode(&wire).unwrap(), token);
//! ```

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Length of a raw session token: a hex-encoded SHA-256 digest.
pub const TOKEN_LEN: usize = 64;

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Time source for [`TokenCodec`] expiry checks.
///
/// The codec reads the clock through this trait so tests can substitute a
/// fixed or shifted time source and exercise expiry without sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Current time as unix seconds.
    fn now_unix(&self) -> i64;
}

/// The system wall clock, used by codecs built with [`TokenCodec::new`].
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is set before the unix epoch")
            .as_secs() as i64
    }
}

// ── DecodeError ───────────────────────────────────────────────────────────────

/// Error returned by [`TokenCodec::decode`].
///
/// Deliberately opaque: malformed, tampered and expired inputs all surface
/// as the same error, so a caller (or an attacker reading responses) cannot
/// tell them apart. The underlying cause is carried for server-side logging
/// via `Debug` only.
#[derive(Error)]
#[error("invalid or expired token")]
pub struct DecodeError {
    kind: DecodeErrorKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecodeErrorKind {
    /// Not base64url, or the payload is not UTF-8.
    Encoding,
    /// Payload did not split into timestamp, token and MAC.
    Parts,
    /// MAC mismatch.
    Mac,
    /// Timestamp segment is not an integer.
    Timestamp,
    /// Timestamp is older than the codec TTL allows.
    Expired,
    /// Inner token is not [`TOKEN_LEN`] characters.
    TokenLength,
    /// The request carried no token at all.
    Missing,
}

impl DecodeError {
    pub(crate) fn missing() -> Self {
        DecodeErrorKind::Missing.into()
    }
}

impl From<DecodeErrorKind> for DecodeError {
    fn from(kind: DecodeErrorKind) -> Self {
        Self { kind }
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecodeError({:?})", self.kind)
    }
}

// ── TokenCodec ────────────────────────────────────────────────────────────────

/// Stateless codec that mints and verifies signed session tokens.
///
/// Holds the process-wide signing key and the token lifetime. Nothing
/// mutates after construction, so a single codec can serve concurrent
/// [`generate`](Self::generate)/[`encode`](Self::encode)/
/// [`decode`](Self::decode) calls without locking.
///
/// The signing key is a shared secret; it is never logged and never leaves
/// the codec.
pub struct TokenCodec {
    signing_key: Vec<u8>,
    ttl: Duration,
    clock: Box<dyn Clock>,
}

impl TokenCodec {
    /// Builds a codec over `signing_key`, with encoded tokens valid for
    /// `ttl` from the moment they are encoded. Uses the system clock.
    ///
    /// Use a long random signing key; 32 bytes or more. An empty key is
    /// accepted but makes the MAC worthless.
    pub fn new(signing_key: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self::with_clock(signing_key, ttl, SystemClock)
    }

    /// Builds a codec with a custom time source.
    pub fn with_clock(signing_key: impl Into<Vec<u8>>, ttl: Duration, clock: impl Clock) -> Self {
        Self {
            signing_key: signing_key.into(),
            ttl,
            clock: Box::new(clock),
        }
    }

    /// Lifetime of encoded tokens, as handed to the constructor.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mints a fresh opaque session token: 64 bytes from the OS random
    /// source, digested with SHA-256 and hex encoded into [`TOKEN_LEN`]
    /// characters.
    ///
    /// # Panics
    ///
    /// Panics if the OS random source fails. A host without working
    /// randomness cannot uphold any of the token guarantees, so this is an
    /// unrecoverable environment failure rather than an error to handle.
    pub fn generate(&self) -> String {
        let mut entropy = [0u8; 64];
        OsRng
            .try_fill_bytes(&mut entropy)
            .expect("system failure for the OS random source");
        hex::encode(Sha256::digest(entropy))
    }

    /// Seals `token` into the transportable wire form, stamped with the
    /// current time.
    ///
    /// # Panics
    ///
    /// Panics if `token` is not exactly [`TOKEN_LEN`] characters. Only
    /// tokens from [`generate`](Self::generate) should ever reach this;
    /// anything longer would also risk blowing the 4096-byte cookie limit
    /// once encoded.
    pub fn encode(&self, token: &str) -> String {
        assert_eq!(token.len(), TOKEN_LEN, "token must be {TOKEN_LEN} characters");

        let payload = format!("{}.{}", self.clock.now_unix(), token);
        let mac = self.mac(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(format!("{}.{}", payload, hex::encode(mac)))
    }

    /// Verifies a wire-form token and returns the inner session token.
    ///
    /// Checks, in order: base64url and UTF-8 decoding, the 3-part payload
    /// shape, the MAC (compared in constant time), the timestamp format,
    /// expiry against the codec TTL, and the inner token length. Every
    /// failure collapses into the same opaque [`DecodeError`].
    pub fn decode(&self, encoded: &str) -> Result<String, DecodeError> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| DecodeErrorKind::Encoding)?;
        let payload = String::from_utf8(raw).map_err(|_| DecodeErrorKind::Encoding)?;

        let mut parts = payload.splitn(3, '.');
        let (Some(timestamp), Some(token), Some(mac)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DecodeErrorKind::Parts.into());
        };

        let signed = &payload[..payload.len() - mac.len() - 1];
        let expected = self.mac(signed.as_bytes());
        let supplied = hex::decode(mac).map_err(|_| DecodeErrorKind::Mac)?;
        if !bool::from(expected.ct_eq(&supplied)) {
            return Err(DecodeErrorKind::Mac.into());
        }

        let timestamp: i64 = timestamp.parse().map_err(|_| DecodeErrorKind::Timestamp)?;
        if timestamp < self.clock.now_unix() - self.ttl.as_secs() as i64 {
            return Err(DecodeErrorKind::Expired.into());
        }

        if token.len() != TOKEN_LEN {
            // Unreachable once the MAC has checked out.
            return Err(DecodeErrorKind::TokenLength.into());
        }
        Ok(token.to_owned())
    }

    fn mac(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("hmac accepts keys of any length");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    /// Clock whose reading tests can move at will.
    #[derive(Clone)]
    struct TestClock(Arc<AtomicI64>);

    impl TestClock {
        fn at(unix: i64) -> Self {
            Self(Arc::new(AtomicI64::new(unix)))
        }

        fn advance(&self, secs: i64) {
            self.0.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for TestClock {
        fn now_unix(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new("super secret key", Duration::from_secs(5))
    }

    #[test]
    fn generate_is_64_hex_chars() {
        let token = codec().generate();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_does_not_repeat() {
        let codec = codec();
        assert_ne!(codec.generate(), codec.generate());
    }

    #[test]
    fn encode_decode_round_trip() {
        let codec = codec();
        let token = codec.generate();
        let wire = codec.encode(&token);
        assert_ne!(wire, token);
        assert_eq!(codec.decode(&wire).unwrap(), token);
    }

    #[test]
    #[should_panic(expected = "64 characters")]
    fn encode_rejects_foreign_tokens() {
        codec().encode("way too short");
    }

    #[test]
    fn decode_honors_ttl() {
        let clock = TestClock::at(1_700_000_000);
        let codec =
            TokenCodec::with_clock("super secret key", Duration::from_secs(5), clock.clone());
        let wire = codec.encode(&codec.generate());

        clock.advance(4);
        assert!(codec.decode(&wire).is_ok());

        clock.advance(2);
        assert!(codec.decode(&wire).is_err());
    }

    #[test]
    fn decode_rejects_any_flipped_payload_byte() {
        let codec = codec();
        let wire = codec.encode(&codec.generate());
        let payload = URL_SAFE_NO_PAD.decode(&wire).unwrap();

        // Everything before the final MAC segment is signed; flipping one
        // bit anywhere in it must fail the decode.
        let mac_len = payload.len() - payload.iter().rposition(|&b| b == b'.').unwrap() - 1;
        for i in 0..payload.len() - mac_len {
            let mut tampered = payload.clone();
            tampered[i] ^= 0x01;
            let encoded = URL_SAFE_NO_PAD.encode(&tampered);
            assert!(codec.decode(&encoded).is_err(), "byte {i} slipped through");
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        let codec = codec();
        assert!(codec.decode("").is_err());
        assert!(codec.decode("not base64url!!").is_err());
        // Valid base64, wrong shape.
        assert!(codec.decode(&URL_SAFE_NO_PAD.encode("no dots here")).is_err());
        assert!(codec.decode(&URL_SAFE_NO_PAD.encode("one.dot")).is_err());
    }

    #[test]
    fn decode_rejects_other_keys() {
        let ours = codec();
        let theirs = TokenCodec::new("different key", Duration::from_secs(5));
        let wire = theirs.encode(&theirs.generate());
        assert!(ours.decode(&wire).is_err());
    }
}
