//! Bootstrap envelope protocol.
//!
//! The server's first message on a fresh connection is an [`Envelope`]: a
//! 2-byte little-endian version followed by a version-specific payload. The
//! payload codec for each version is looked up in a [`VersionRegistry`]
//! shared by both sides.
//!
//! ```text
//! +-----------+--------------------------------------+
//! | u16 LE    | payload (codec for that version)     |
//! | version   | v1: u32 LE length + postcard bytes   |
//! +-----------+--------------------------------------+
//! ```

pub mod envelope;
pub mod registry;
pub mod v1;
pub mod wire;

pub use envelope::{Envelope, Payload};
pub use registry::{PayloadCodec, RegistryBuilder, VersionRegistry};
pub use v1::{PayloadV1, V1Codec};

use std::io;
use thiserror::Error;

/// Errors produced while framing or parsing bootstrap messages.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("stream ended before {expected} bytes were read")]
    Truncated { expected: usize },

    #[error("expected {expected} got {written} bytes")]
    ShortWrite { expected: usize, written: usize },

    #[error("unknown version {0}")]
    UnknownVersion(u16),

    #[error("version {0} already registered")]
    DuplicateVersion(u16),

    #[error("codec for version {codec} produced a version {payload} payload")]
    PayloadMismatch { codec: u16, payload: u16 },

    #[error("payload encode failed: {0}")]
    Encode(String),

    #[error("payload decode failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
