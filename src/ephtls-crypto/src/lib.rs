//! # ephtls-crypto
//!
//! Key material for the ephemeral TLS bootstrap:
//!
//! - [`pki`]: self-signed P-384 certificates minted per connection
//! - [`keyseal`]: PKCS#8 private keys sealed under a pre-shared [`Secret`]
//! - [`pem`]: strict single-block PEM framing
//!
//! Nothing in this crate touches the disk; all key material lives in memory
//! and is zeroized on drop where it is secret.

pub mod error;
pub mod keyseal;
pub mod pem;
pub mod pki;
pub mod rng;
pub mod secret;

pub use error::{CryptoError, Result};
pub use keyseal::KeyCipher;
pub use pki::{make_certificate, EphemeralCertificate};
pub use secret::Secret;
