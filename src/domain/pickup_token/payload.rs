//! Pickup token payload codec
//!
//! Wire format: `EVR1.<body>.<tag>` where `body` is base64url (no padding)
//! of `<rental_id>:<nonce hex>` and `tag` is the first 8 bytes, hex encoded,
//! of `sha256(secret "." body)`. The tag lets malformed or hand-edited
//! payloads be rejected before any storage lookup; the lookup itself is by
//! exact payload match.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::support::errors::DomainError;

const PREFIX: &str = "EVR1";
const NONCE_BYTES: usize = 16;
const TAG_BYTES: usize = 8;

/// Fields recovered from a well-formed payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPayload {
    pub rental_id: i32,
    pub nonce: String,
}

#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
}

impl TokenCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Fresh payload for `rental_id` with a random nonce
    pub fn issue(&self, rental_id: i32) -> String {
        let nonce = hex::encode(rand::random::<[u8; NONCE_BYTES]>());
        let body = URL_SAFE_NO_PAD.encode(format!("{}:{}", rental_id, nonce));
        let tag = self.tag(&body);
        format!("{}.{}.{}", PREFIX, body, tag)
    }

    pub fn parse(&self, payload: &str) -> Result<ParsedPayload, DomainError> {
        let malformed = || DomainError::Validation("Malformed pickup token".to_string());

        let mut parts = payload.trim().split('.');
        let (Some(prefix), Some(body), Some(tag), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if prefix != PREFIX || tag.len() != TAG_BYTES * 2 {
            return Err(malformed());
        }
        if self.tag(body) != tag {
            return Err(malformed());
        }

        let decoded = URL_SAFE_NO_PAD.decode(body).map_err(|_| malformed())?;
        let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
        let (rental_id, nonce) = decoded.split_once(':').ok_or_else(malformed)?;
        let rental_id: i32 = rental_id.parse().map_err(|_| malformed())?;
        if nonce.len() != NONCE_BYTES * 2 || hex::decode(nonce).is_err() {
            return Err(malformed());
        }

        Ok(ParsedPayload {
            rental_id,
            nonce: nonce.to_string(),
        })
    }

    fn tag(&self, body: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b".");
        hasher.update(body.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..TAG_BYTES])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_payload_parses_back() {
        let codec = TokenCodec::new("s3cret");
        let payload = codec.issue(77);
        assert!(payload.starts_with("EVR1."));
        let parsed = codec.parse(&payload).unwrap();
        assert_eq!(parsed.rental_id, 77);
        assert_eq!(parsed.nonce.len(), 32);
    }

    #[test]
    fn two_issues_differ() {
        let codec = TokenCodec::new("s3cret");
        assert_ne!(codec.issue(1), codec.issue(1));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = TokenCodec::new("s3cret");
        for bad in ["", "hello", "EVR1..", "EVR1.a.b.c", "EVR2.abc.0011223344556677"] {
            assert!(
                matches!(codec.parse(bad), Err(DomainError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn tampered_body_is_rejected() {
        let codec = TokenCodec::new("s3cret");
        let payload = codec.issue(5);
        let mut parts: Vec<&str> = payload.split('.').collect();
        let forged_body = URL_SAFE_NO_PAD.encode(format!("6:{}", "ab".repeat(16)));
        parts[1] = &forged_body;
        assert!(codec.parse(&parts.join(".")).is_err());
    }

    #[test]
    fn other_secret_is_rejected() {
        let payload = TokenCodec::new("a").issue(5);
        assert!(TokenCodec::new("b").parse(&payload).is_err());
    }
}
