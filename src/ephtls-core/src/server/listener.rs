//! TCP front end for [`BootstrapAcceptor`].

use super::{BootstrapAcceptor, ServerConfig};
use crate::BootstrapError;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_rustls::server::TlsStream;
use tracing::{debug, info, warn};

/// Listens on TCP and bootstraps every accepted connection.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    acceptor: BootstrapAcceptor,
}

impl Server {
    pub async fn bind(addr: impl ToSocketAddrs, config: ServerConfig) -> Result<Self, BootstrapError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, config))
    }

    pub fn from_listener(listener: TcpListener, config: ServerConfig) -> Self {
        Self {
            listener,
            acceptor: BootstrapAcceptor::new(config),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BootstrapError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn acceptor(&self) -> &BootstrapAcceptor {
        &self.acceptor
    }

    /// Accept one connection and bootstrap it on the current task.
    pub async fn accept(&self) -> Result<(TlsStream<TcpStream>, SocketAddr), BootstrapError> {
        let (stream, peer) = self.listener.accept().await?;
        let tls = self.acceptor.accept(stream, Some(peer)).await?;
        Ok((tls, peer))
    }

    /// Accept connections forever, bootstrapping each on its own task and
    /// handing established streams to `handler`. Failed bootstraps are logged
    /// and dropped; only listener errors end the loop.
    pub async fn serve<F, Fut>(self, handler: F) -> Result<(), BootstrapError>
    where
        F: Fn(TlsStream<TcpStream>, SocketAddr) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        info!(addr = ?self.listener.local_addr().ok(), "bootstrap server listening");

        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(%peer, "accepted TCP connection");

            let acceptor = self.acceptor.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                match acceptor.accept(stream, Some(peer)).await {
                    Ok(tls) => handler(tls, peer).await,
                    Err(err) if err.is_timeout() => {
                        warn!(%peer, "client did not finish the TLS upgrade in time")
                    }
                    Err(err) => debug!(%peer, %err, "dropping connection"),
                }
            });
        }
    }
}
