//! # ephtls
//!
//! Mutually authenticated TLS over TCP without a pre-provisioned PKI.
//!
//! ## Flow
//!
//! ```text
//!  client                                 server
//!    | ---------------- TCP connect ----------> |
//!    |                                          | mint self-signed cert (validity = timeout)
//!    |                                          | seal its key with the shared secret
//!    | <------ envelope { cert, sealed key } -- |
//!    | open key with the shared secret          |
//!    | ======== TLS, client presents cert ====> | accept only that cert (bounded by timeout)
//!    | <=========== application data =========> |
//! ```
//!
//! Knowing the shared secret is what lets a client present the certificate
//! the server just minted, so the TLS layer ends up authenticating the
//! secret. The server presents its own long-lived identity; the client
//! decides whether to trust it through a [`PeerVerifier`](tls::PeerVerifier).
//!
//! ## Example
//!
//! ```no_run
//! use ephtls_core::client::{Client, ClientConfig};
//! use ephtls_core::server::{Server, ServerConfig};
//! use ephtls_crypto::KeyCipher;
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! # async fn run() -> Result<(), ephtls_core::BootstrapError> {
//! let server = Server::bind(
//!     "127.0.0.1:0",
//!     ServerConfig::new().with_password("Hello World", KeyCipher::Aes256Cbc),
//! )
//! .await?;
//! let addr = server.local_addr()?.to_string();
//!
//! tokio::spawn(async move {
//!     if let Ok((mut tls, _peer)) = server.accept().await {
//!         let mut buf = Vec::new();
//!         let _ = tls.read_to_end(&mut buf).await;
//!     }
//! });
//!
//! let client = Client::new(ClientConfig::new().with_secret("Hello World"));
//! let mut tls = client.connect(&addr).await?;
//! tls.write_all(b"Hello World").await?;
//! tls.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod guard;
pub mod identity;
pub mod proto;
pub mod server;
pub mod settings;
pub mod tls;

pub use client::{Client, ClientConfig};
pub use error::BootstrapError;
pub use identity::Identity;
pub use server::{BootstrapAcceptor, Server, ServerConfig};
pub use tls::{AcceptAny, PeerVerifier, PinnedFingerprint};
