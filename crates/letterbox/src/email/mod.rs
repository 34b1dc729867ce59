//! Inbound email handling: payload normalization across wire encodings,
//! the canonical message type, and webhook signature verification.

pub mod message;
pub mod normalizer;
pub mod signature;

pub use message::EmailMessage;
pub use normalizer::{normalize, InboundPayload, ParseError};
pub use signature::{verify, SignatureError, SignatureParams};
