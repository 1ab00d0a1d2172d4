//! Client half of the bootstrap: dial, receive, upgrade.

use super::config::ClientConfig;
use super::dialer::{Dialer, TcpDialer};
use crate::identity::Identity;
use crate::proto::{Envelope, Payload};
use crate::{tls, BootstrapError};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::ServerName;
use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

/// Progress of one client-side bootstrap, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    Dialing,
    EnvelopeReceived,
    KeyDecrypted,
    Upgrading,
    Established,
    Failed,
}

impl fmt::Display for ClientPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientPhase::Dialing => "dialing",
            ClientPhase::EnvelopeReceived => "envelope-received",
            ClientPhase::KeyDecrypted => "key-decrypted",
            ClientPhase::Upgrading => "upgrading",
            ClientPhase::Established => "established",
            ClientPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Dials a bootstrap server and upgrades to mutual TLS with the credentials
/// it hands out.
#[derive(Debug, Clone)]
pub struct Client<D = TcpDialer> {
    config: ClientConfig,
    dialer: D,
    provider: Arc<CryptoProvider>,
}

impl Client<TcpDialer> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_dialer(config, TcpDialer)
    }
}

impl<D: Dialer> Client<D> {
    pub fn with_dialer(config: ClientConfig, dialer: D) -> Self {
        Self {
            config,
            dialer,
            provider: tls::crypto_provider(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Dial `addr` (`host:port`), receive the ephemeral credentials and
    /// complete the TLS handshake.
    pub async fn connect(&self, addr: &str) -> Result<TlsStream<D::Stream>, BootstrapError> {
        debug!(%addr, phase = %ClientPhase::Dialing, "connecting");
        let result = self.bootstrap(addr).await;
        match &result {
            Ok(_) => info!(%addr, phase = %ClientPhase::Established, "bootstrap complete"),
            Err(err) => warn!(%addr, phase = %ClientPhase::Failed, %err, "bootstrap failed"),
        }
        result
    }

    async fn bootstrap(&self, addr: &str) -> Result<TlsStream<D::Stream>, BootstrapError> {
        let server_name = server_name_for(addr)?;
        let mut stream = self.dialer.dial(addr).await?;
        let identity = self.receive_identity(&mut stream).await?;
        self.upgrade(stream, server_name, &identity).await
    }

    /// Read the server's envelope and turn it into the identity to present.
    pub async fn receive_identity<S>(&self, stream: &mut S) -> Result<Identity, BootstrapError>
    where
        S: AsyncRead + Unpin + Send,
    {
        let envelope = Envelope::read(self.config.registry(), stream).await?;
        debug!(
            version = envelope.version,
            phase = %ClientPhase::EnvelopeReceived,
            "envelope received"
        );

        let identity = match envelope.payload {
            Payload::V1(payload) => Identity::from_pem(
                &payload.certificate,
                &payload.encrypted_key,
                self.config.secret(),
            )?,
        };
        debug!(
            fingerprint = %identity.fingerprint(),
            phase = %ClientPhase::KeyDecrypted,
            "ephemeral identity ready"
        );
        Ok(identity)
    }

    /// Run the TLS client handshake over `stream`, presenting `identity`.
    pub async fn upgrade<S>(
        &self,
        stream: S,
        server_name: ServerName<'static>,
        identity: &Identity,
    ) -> Result<TlsStream<S>, BootstrapError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let config = tls::client_config(self.provider.clone(), identity, self.config.verifier())?;
        debug!(phase = %ClientPhase::Upgrading, ?server_name, "upgrading to TLS");
        TlsConnector::from(Arc::new(config))
            .connect(server_name, stream)
            .await
            .map_err(BootstrapError::from_handshake)
    }
}

/// TLS server name for a dial address: `host:port`, `[v6]:port`, or a bare
/// host or IPv6 literal.
pub fn server_name_for(addr: &str) -> Result<ServerName<'static>, BootstrapError> {
    let host = match addr.strip_prefix('[') {
        Some(bracketed) => bracketed
            .split_once(']')
            .map_or(bracketed, |(host, _port)| host),
        None => match addr.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => host,
            _ => addr,
        },
    };
    ServerName::try_from(host.to_string())
        .map_err(|e| BootstrapError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))
}
