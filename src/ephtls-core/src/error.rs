//! Error taxonomy for the bootstrap handshake.

use crate::proto::ProtoError;
use ephtls_crypto::CryptoError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong between accepting/dialing a connection and
/// holding an authenticated TLS stream.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Transport failure: connect, read, write, or the peer hanging up.
    #[error(transparent)]
    Io(io::Error),

    /// Envelope framing or version negotiation failed.
    #[error("invalid protocol: {0}")]
    Protocol(ProtoError),

    /// Certificate or key generation, encoding, or decryption failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The server-side TLS upgrade exceeded its deadline.
    #[error("timeout hit after {0:?}")]
    Timeout(Duration),

    /// The TLS handshake itself failed: a certificate was rejected by either
    /// side or the peer sent a fatal alert.
    #[error("tls handshake failed: {0}")]
    Handshake(rustls::Error),

    /// Local TLS configuration could not be assembled.
    #[error("tls configuration: {0}")]
    Config(#[from] rustls::Error),

    /// Key encryption callback refused to provide a secret.
    #[error("key encryptor: {0}")]
    KeyEncryptor(String),
}

impl BootstrapError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BootstrapError::Timeout(_))
    }

    /// The received key could not be decrypted with the configured secret.
    pub fn is_decrypt_failure(&self) -> bool {
        matches!(self, BootstrapError::Crypto(CryptoError::Decrypt(_)))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, BootstrapError::Protocol(_))
    }

    pub fn is_handshake(&self) -> bool {
        matches!(self, BootstrapError::Handshake(_))
    }

    /// Split an I/O error out of tokio-rustls into a handshake failure when
    /// it wraps a rustls error, plain transport failure otherwise.
    pub(crate) fn from_handshake(err: io::Error) -> Self {
        match err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        {
            Some(tls) => BootstrapError::Handshake(tls.clone()),
            None => BootstrapError::Io(err),
        }
    }
}

impl From<io::Error> for BootstrapError {
    fn from(err: io::Error) -> Self {
        BootstrapError::Io(err)
    }
}

impl From<ProtoError> for BootstrapError {
    fn from(err: ProtoError) -> Self {
        match err {
            ProtoError::Io(io) => BootstrapError::Io(io),
            other => BootstrapError::Protocol(other),
        }
    }
}
