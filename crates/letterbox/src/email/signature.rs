//! Webhook signature verification.
//!
//! The relay signs each delivery with `HMAC-SHA256(key, timestamp + token)`
//! and sends the hex digest in the `signature` field. Verification is
//! constant-time via the `Mac` comparison; a bad or undecodable signature
//! is a classified outcome, never a panic.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Signature verification failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature parameters")]
    MissingParams,

    #[error("invalid signature")]
    Invalid,
}

/// The signature triplet extracted from the webhook payload.
#[derive(Debug, Clone, Copy)]
pub struct SignatureParams<'a> {
    pub token: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

/// Verifies the triplet against the shared signing key.
pub fn verify(params: SignatureParams<'_>, signing_key: &str) -> Result<(), SignatureError> {
    let (token, timestamp, signature) = match (params.token, params.timestamp, params.signature) {
        (Some(t), Some(ts), Some(s)) => (t, ts, s),
        _ => return Err(SignatureError::MissingParams),
    };

    let expected = hex::decode(signature).map_err(|_| SignatureError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
        .map_err(|_| SignatureError::Invalid)?;
    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());

    mac.verify_slice(&expected).map_err(|_| SignatureError::Invalid)
}
