//! Server half of the bootstrap: mint, send, upgrade.

use super::config::{ServerConfig, DEFAULT_IDENTITY_VALIDITY};
use crate::identity::Identity;
use crate::proto::{Envelope, PayloadV1};
use crate::{guard, tls, BootstrapError};
use ephtls_crypto::{keyseal, pki};
use rustls::crypto::CryptoProvider;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::OnceCell;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

/// Progress of one server-side bootstrap, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    Accepted,
    CertGenerated,
    KeyPrepared,
    EnvelopeSent,
    Upgrading,
    Established,
    TimedOut,
    Failed,
}

impl fmt::Display for ServerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerPhase::Accepted => "accepted",
            ServerPhase::CertGenerated => "cert-generated",
            ServerPhase::KeyPrepared => "key-prepared",
            ServerPhase::EnvelopeSent => "envelope-sent",
            ServerPhase::Upgrading => "upgrading",
            ServerPhase::Established => "established",
            ServerPhase::TimedOut => "timed-out",
            ServerPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs the server bootstrap on already-accepted connections. Cheap to clone;
/// clones share the server identity.
#[derive(Clone)]
pub struct BootstrapAcceptor {
    inner: Arc<Inner>,
}

struct Inner {
    config: ServerConfig,
    identity: OnceCell<Identity>,
    provider: Arc<CryptoProvider>,
}

impl BootstrapAcceptor {
    pub fn new(config: ServerConfig) -> Self {
        let identity = match config.identity() {
            Some(identity) => OnceCell::new_with(Some(identity.clone())),
            None => OnceCell::new(),
        };
        Self {
            inner: Arc::new(Inner {
                config,
                identity,
                provider: tls::crypto_provider(),
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Certificate the server presents in every TLS handshake.
    pub async fn identity(&self) -> Result<&Identity, BootstrapError> {
        self.inner
            .identity
            .get_or_try_init(|| async {
                let identity = Identity::generate(DEFAULT_IDENTITY_VALIDITY)?;
                info!(fingerprint = %identity.fingerprint(), "generated server identity");
                Ok::<_, BootstrapError>(identity)
            })
            .await
    }

    /// Bootstrap one connection.
    ///
    /// Sends the ephemeral credentials in the clear, then upgrades to TLS
    /// requiring the client to present exactly those credentials. Only the
    /// upgrade is bounded by the configured timeout; on expiry the stream is
    /// dropped and [`BootstrapError::Timeout`] is returned.
    pub async fn accept<S>(
        &self,
        stream: S,
        peer: Option<SocketAddr>,
    ) -> Result<TlsStream<S>, BootstrapError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        debug!(?peer, phase = %ServerPhase::Accepted, "bootstrap started");
        let result = self.bootstrap(stream, peer).await;
        match &result {
            Ok(_) => info!(?peer, phase = %ServerPhase::Established, "bootstrap complete"),
            Err(err) if err.is_timeout() => {
                warn!(?peer, phase = %ServerPhase::TimedOut, %err, "bootstrap timed out")
            }
            Err(err) => warn!(?peer, phase = %ServerPhase::Failed, %err, "bootstrap failed"),
        }
        result
    }

    async fn bootstrap<S>(
        &self,
        mut stream: S,
        peer: Option<SocketAddr>,
    ) -> Result<TlsStream<S>, BootstrapError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let config = &self.inner.config;
        let timeout = config.timeout();
        let identity = self.identity().await?;

        let ephemeral = pki::make_certificate(timeout)?;
        debug!(
            ?peer,
            phase = %ServerPhase::CertGenerated,
            fingerprint = %ephemeral.fingerprint(),
            "minted ephemeral certificate"
        );

        let key_pem = match config.key_encryptor() {
            Some(encryptor) => {
                let (secret, cipher) = encryptor.key_secret(&mut stream, peer).await?;
                keyseal::seal_private_key(ephemeral.key_der(), &secret, cipher)?.into_bytes()
            }
            None => keyseal::encode_private_key(ephemeral.key_der())?
                .as_bytes()
                .to_vec(),
        };
        debug!(
            ?peer,
            phase = %ServerPhase::KeyPrepared,
            sealed = config.key_encryptor().is_some(),
            "ephemeral key prepared"
        );

        let tls_config =
            tls::server_config(self.inner.provider.clone(), identity, ephemeral.cert_der())?;
        let envelope = Envelope::v1(PayloadV1 {
            certificate: ephemeral.cert_pem()?.into_bytes(),
            encrypted_key: key_pem,
        });
        drop(ephemeral);

        envelope.write(config.registry(), &mut stream).await?;
        debug!(?peer, phase = %ServerPhase::EnvelopeSent, "envelope sent");

        let acceptor = TlsAcceptor::from(Arc::new(tls_config));
        debug!(
            ?peer,
            phase = %ServerPhase::Upgrading,
            timeout_ms = timeout.as_millis() as u64,
            "upgrading to TLS"
        );
        guard::with_deadline(timeout, async move {
            acceptor
                .accept(stream)
                .await
                .map_err(BootstrapError::from_handshake)
        })
        .await
    }
}

impl fmt::Debug for BootstrapAcceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAcceptor")
            .field("config", &self.inner.config)
            .field("identity", &self.inner.identity.get())
            .finish()
    }
}
