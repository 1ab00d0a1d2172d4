//! Server bootstrap settings.

use crate::identity::Identity;
use crate::proto::VersionRegistry;
use crate::BootstrapError;
use async_trait::async_trait;
use ephtls_crypto::{KeyCipher, Secret};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Upgrade deadline when none is configured. Also the ephemeral certificate lifetime.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifetime of the lazily generated server identity.
pub const DEFAULT_IDENTITY_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// Raw bootstrap connection as seen by a [`KeyEncryptor`].
pub trait RawStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> RawStream for T {}

/// Chooses how the ephemeral private key is sealed for one connection.
#[async_trait]
pub trait KeyEncryptor: fmt::Debug + Send + Sync {
    /// Runs on the raw connection before the envelope is written, so it may
    /// read a client hint (a user id, say) to pick a per-client secret.
    /// `peer` is the remote address when the transport has one.
    async fn key_secret(
        &self,
        conn: &mut dyn RawStream,
        peer: Option<SocketAddr>,
    ) -> Result<(Secret, KeyCipher), BootstrapError>;
}

/// Same secret and cipher for every connection.
#[derive(Debug, Clone)]
pub struct Password {
    secret: Secret,
    cipher: KeyCipher,
}

impl Password {
    pub fn new(secret: impl Into<Secret>) -> Self {
        Self {
            secret: secret.into(),
            cipher: KeyCipher::default(),
        }
    }

    pub fn with_cipher(mut self, cipher: KeyCipher) -> Self {
        self.cipher = cipher;
        self
    }
}

#[async_trait]
impl KeyEncryptor for Password {
    async fn key_secret(
        &self,
        _conn: &mut dyn RawStream,
        _peer: Option<SocketAddr>,
    ) -> Result<(Secret, KeyCipher), BootstrapError> {
        Ok((self.secret.clone(), self.cipher))
    }
}

/// Builder-style configuration for [`BootstrapAcceptor`](super::BootstrapAcceptor).
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    timeout: Option<Duration>,
    identity: Option<Identity>,
    key_encryptor: Option<Arc<dyn KeyEncryptor>>,
    registry: VersionRegistry,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upgrade deadline. Zero means [`DEFAULT_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Long-lived certificate the server presents in the TLS handshake.
    /// Generated on first accept when unset.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Seal each ephemeral key with a secret chosen per connection.
    pub fn with_key_encryptor(mut self, encryptor: impl KeyEncryptor + 'static) -> Self {
        self.key_encryptor = Some(Arc::new(encryptor));
        self
    }

    /// Seal every ephemeral key with `secret`.
    pub fn with_password(self, secret: impl Into<Secret>, cipher: KeyCipher) -> Self {
        self.with_key_encryptor(Password::new(secret).with_cipher(cipher))
    }

    pub fn with_registry(mut self, registry: VersionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn timeout(&self) -> Duration {
        match self.timeout {
            Some(timeout) if !timeout.is_zero() => timeout,
            _ => DEFAULT_TIMEOUT,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn key_encryptor(&self) -> Option<&dyn KeyEncryptor> {
        self.key_encryptor.as_deref()
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }
}
