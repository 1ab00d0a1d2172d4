//! Error types for cryptographic operations.
//!
//! All crypto operations return [`Result<T>`] which wraps [`CryptoError`].

use thiserror::Error;

/// Error type for all cryptographic operations.
///
/// Use pattern matching to tell a wrong secret apart from a malformed key block:
///
/// ```no_run
/// use ephtls_crypto::{keyseal, CryptoError, Secret};
///
/// # let pem = b"";
/// match keyseal::open_private_key(pem, Some(&Secret::from("hunter2"))) {
///     Ok(_der) => println!("key ready"),
///     Err(CryptoError::Decrypt(cause)) => println!("wrong secret: {cause}"),
///     Err(CryptoError::Pem(msg)) => println!("bad key block: {msg}"),
///     Err(e) => println!("other error: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key generation failed (e.g., insufficient entropy)
    #[error("key generation failed: {0}")]
    KeyGen(String),

    /// Invalid key material (bad encoding, key does not match certificate)
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Certificate generation or signing failed
    #[error("PKI error: {0}")]
    Pki(String),

    /// X.509 certificate could not be parsed or inspected
    #[error("certificate error: {0}")]
    Certificate(String),

    /// PEM framing error (missing block, wrong label, bad boundary)
    #[error("malformed PEM: {0}")]
    Pem(String),

    /// Something other than whitespace follows the single expected PEM block
    #[error("malformed PEM: extra data included {0}")]
    TrailingData(&'static str),

    /// Encryption of a key block failed
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Decryption of a key block failed (wrong secret, corrupted data)
    #[error("decrypt failed: {0}")]
    Decrypt(String),
}

/// Result type alias for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

impl From<rcgen::Error> for CryptoError {
    fn from(e: rcgen::Error) -> Self {
        CryptoError::Pki(e.to_string())
    }
}

impl From<pem_rfc7468::Error> for CryptoError {
    fn from(e: pem_rfc7468::Error) -> Self {
        CryptoError::Pem(e.to_string())
    }
}
