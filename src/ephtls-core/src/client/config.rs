//! Client bootstrap settings.

use crate::proto::VersionRegistry;
use crate::tls::{AcceptAny, PeerVerifier};
use ephtls_crypto::Secret;
use std::sync::Arc;

/// Builder-style configuration for [`Client`](super::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    secret: Option<Secret>,
    verifier: Arc<dyn PeerVerifier>,
    registry: VersionRegistry,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            secret: None,
            verifier: Arc::new(AcceptAny),
            registry: VersionRegistry::standard(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Secret for opening a sealed ephemeral key.
    pub fn with_secret(mut self, secret: impl Into<Secret>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Judge of the server's certificate chain. Defaults to [`AcceptAny`].
    pub fn with_verifier(mut self, verifier: impl PeerVerifier + 'static) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    pub fn with_registry(mut self, registry: VersionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn secret(&self) -> Option<&Secret> {
        self.secret.as_ref()
    }

    pub fn verifier(&self) -> Arc<dyn PeerVerifier> {
        self.verifier.clone()
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }
}
