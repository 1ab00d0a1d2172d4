//! Pre-shared bootstrap secret.
//!
//! A [`Secret`] is supplied out of band to both parties and is only ever used
//! as password material for sealing the ephemeral private key. It is never
//! written to the wire.
//!
//! ```
//! use ephtls_crypto::Secret;
//!
//! let secret = Secret::from("Hello World");
//! assert_eq!(secret.as_bytes(), b"Hello World");
//! assert_eq!(format!("{:?}", secret), "Secret[REDACTED]");
//! ```

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Variable-length secret bytes, zeroized on drop.
#[derive(Clone)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret[REDACTED]")
    }
}

// Length is not hidden, only the content comparison is constant-time.
impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && bool::from(self.0.as_slice().ct_eq(other.0.as_slice()))
    }
}

impl Eq for Secret {}

impl AsRef<[u8]> for Secret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<Vec<u8>> for Secret {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Secret {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}
