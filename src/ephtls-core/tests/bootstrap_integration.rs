//! End-to-end bootstrap over real TCP and in-memory pipes.
//!
//! Covers the full cycle: dial → envelope → key opened with the shared
//! secret → mutual TLS → application data, plus the ways it can fail.

use anyhow::Result;
use async_trait::async_trait;
use ephtls_core::client::{server_name_for, Client, ClientConfig, Dialer};
use ephtls_core::proto::ProtoError;
use ephtls_core::server::{BootstrapAcceptor, Server, ServerConfig};
use ephtls_core::{BootstrapError, Identity, PinnedFingerprint};
use ephtls_crypto::KeyCipher;
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::{TcpListener, TcpStream};

const SECRET: &str = "Hello World";

async fn server_with(config: ServerConfig) -> Result<(Server, String)> {
    let server = Server::bind("127.0.0.1:0", config).await?;
    let addr = server.local_addr()?.to_string();
    Ok((server, addr))
}

#[tokio::test]
async fn test_data_flows_after_bootstrap() -> Result<()> {
    let (server, addr) =
        server_with(ServerConfig::new().with_password(SECRET, KeyCipher::Aes256Cbc)).await?;

    let server_task = tokio::spawn(async move {
        let (mut tls, _peer) = server.accept().await?;
        let mut received = Vec::new();
        tls.read_to_end(&mut received).await?;
        Ok::<_, BootstrapError>(received)
    });

    let client = Client::new(ClientConfig::new().with_secret(SECRET));
    let mut tls = client.connect(&addr).await?;
    tls.write_all(b"Hello World").await?;
    tls.shutdown().await?;

    let received = server_task.await??;
    assert_eq!(received, b"Hello World");
    Ok(())
}

#[tokio::test]
async fn test_unsealed_key_bootstrap() -> Result<()> {
    let (server, addr) = server_with(ServerConfig::new()).await?;

    let server_task = tokio::spawn(async move {
        let (mut tls, _peer) = server.accept().await?;
        tls.write_all(b"pong").await?;
        tls.shutdown().await?;
        Ok::<_, BootstrapError>(())
    });

    let mut tls = Client::new(ClientConfig::new()).connect(&addr).await?;
    let mut reply = Vec::new();
    tls.read_to_end(&mut reply).await?;
    assert_eq!(reply, b"pong");

    server_task.await??;
    Ok(())
}

#[tokio::test]
async fn test_aes128_sealed_key() -> Result<()> {
    let (server, addr) =
        server_with(ServerConfig::new().with_password(SECRET, KeyCipher::Aes128Cbc)).await?;
    let server_task = tokio::spawn(async move { server.accept().await.map(|_| ()) });

    let client = Client::new(ClientConfig::new().with_secret(SECRET));
    let tls = client.connect(&addr).await?;
    server_task.await??;
    drop(tls);
    Ok(())
}

#[tokio::test]
async fn test_wrong_secret_fails_to_decrypt() -> Result<()> {
    let (server, addr) =
        server_with(ServerConfig::new().with_password(SECRET, KeyCipher::Aes256Cbc)).await?;
    let server_task = tokio::spawn(async move { server.accept().await.map(|_| ()) });

    let client = Client::new(ClientConfig::new().with_secret("123"));
    let err = client.connect(&addr).await.unwrap_err();
    assert!(err.is_decrypt_failure(), "got {err:?}");
    assert_eq!(err.to_string(), "decrypt failed: incorrect password");

    // The client hung up before TLS, so the server never gets a session.
    assert!(server_task.await?.is_err());
    Ok(())
}

#[tokio::test]
async fn test_stalled_client_hits_server_timeout() -> Result<()> {
    let (server, addr) = server_with(
        ServerConfig::new()
            .with_password(SECRET, KeyCipher::Aes256Cbc)
            .with_timeout(Duration::from_secs(1)),
    )
    .await?;
    let server_task = tokio::spawn(async move { server.accept().await.map(|_| ()) });

    let client = Client::new(ClientConfig::new().with_secret(SECRET));
    let mut stream = TcpStream::connect(&addr).await?;
    let identity = client.receive_identity(&mut stream).await?;

    // Stall past the deadline before starting TLS.
    tokio::time::sleep(Duration::from_secs(3)).await;

    let server_err = server_task.await?.unwrap_err();
    assert!(server_err.is_timeout(), "got {server_err:?}");
    assert_eq!(server_err.to_string(), "timeout hit after 1s");

    let mut buf = [0u8; 1];
    let read = stream.read(&mut buf).await;
    assert!(matches!(read, Ok(0) | Err(_)), "connection should be closed");

    let upgraded = client
        .upgrade(stream, server_name_for(&addr)?, &identity)
        .await;
    assert!(upgraded.is_err());
    Ok(())
}

#[tokio::test]
async fn test_substituted_client_certificate_is_rejected() -> Result<()> {
    let (server, addr) =
        server_with(ServerConfig::new().with_password(SECRET, KeyCipher::Aes256Cbc)).await?;
    let server_task = tokio::spawn(async move { server.accept().await.map(|_| ()) });

    let client = Client::new(ClientConfig::new().with_secret(SECRET));
    let mut stream = TcpStream::connect(&addr).await?;
    let _received = client.receive_identity(&mut stream).await?;
    let impostor = Identity::generate(Duration::from_secs(60))?;

    match client
        .upgrade(stream, server_name_for(&addr)?, &impostor)
        .await
    {
        Err(_) => {}
        // TLS 1.3 clients finish before the server has judged their
        // certificate; the rejection shows up on the first read.
        Ok(mut tls) => {
            let mut buf = [0u8; 16];
            let read = tls.read(&mut buf).await;
            assert!(matches!(read, Ok(0) | Err(_)));
        }
    }

    let server_err = server_task.await?.unwrap_err();
    assert!(server_err.is_handshake(), "got {server_err:?}");
    Ok(())
}

#[tokio::test]
async fn test_unknown_version_from_server() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let _ = stream.write_all(&[2, 0, 0, 0, 0, 0]).await;
        }
    });

    let err = Client::new(ClientConfig::new())
        .connect(&addr)
        .await
        .unwrap_err();
    assert!(
        matches!(err, BootstrapError::Protocol(ProtoError::UnknownVersion(2))),
        "got {err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn test_server_fingerprint_pinning() -> Result<()> {
    let identity = Identity::generate(Duration::from_secs(3600))?;
    let fingerprint = identity.fingerprint();
    let (server, addr) = server_with(ServerConfig::new().with_identity(identity)).await?;
    let server_task = tokio::spawn(async move {
        let first = server.accept().await.map(|_| ());
        let second = server.accept().await.map(|_| ());
        (first, second)
    });

    let trusting =
        Client::new(ClientConfig::new().with_verifier(PinnedFingerprint::new(&fingerprint)));
    let tls = trusting.connect(&addr).await?;
    drop(tls);

    let suspicious = Client::new(ClientConfig::new().with_verifier(PinnedFingerprint::new("00")));
    let err = suspicious.connect(&addr).await.unwrap_err();
    assert!(err.is_handshake(), "got {err:?}");

    let (first, second) = server_task.await?;
    assert!(first.is_ok());
    assert!(second.is_err());
    Ok(())
}

#[tokio::test]
async fn test_serve_handles_concurrent_clients() -> Result<()> {
    let (server, addr) =
        server_with(ServerConfig::new().with_password(SECRET, KeyCipher::Aes256Cbc)).await?;
    tokio::spawn(server.serve(|mut tls, _peer| async move {
        let mut buf = [0u8; 64];
        while let Ok(n) = tls.read(&mut buf).await {
            if n == 0 || tls.write_all(&buf[..n]).await.is_err() {
                break;
            }
        }
        let _ = tls.shutdown().await;
    }));

    let mut tasks = Vec::new();
    for i in 0..4u8 {
        let addr = addr.clone();
        tasks.push(tokio::spawn(async move {
            let client = Client::new(ClientConfig::new().with_secret(SECRET));
            let mut tls = client.connect(&addr).await?;
            tls.write_all(&[i; 8]).await?;
            let mut echoed = [0u8; 8];
            tls.read_exact(&mut echoed).await?;
            Ok::<_, BootstrapError>(echoed)
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await??, [i as u8; 8]);
    }
    Ok(())
}

/// Hands out one end of an in-memory pipe instead of dialing.
struct PipeDialer(Mutex<Option<DuplexStream>>);

#[async_trait]
impl Dialer for PipeDialer {
    type Stream = DuplexStream;

    async fn dial(&self, _addr: &str) -> io::Result<DuplexStream> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("dialer poisoned"))?
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "already dialed"))
    }
}

#[tokio::test]
async fn test_bootstrap_over_in_memory_pipe() -> Result<()> {
    let (client_io, server_io) = duplex(64 * 1024);
    let acceptor = BootstrapAcceptor::new(
        ServerConfig::new().with_password(SECRET, KeyCipher::Aes256Cbc),
    );

    let server_task = tokio::spawn(async move {
        let mut tls = acceptor.accept(server_io, None).await?;
        let mut buf = [0u8; 5];
        tls.read_exact(&mut buf).await?;
        tls.write_all(&buf).await?;
        tls.flush().await?;
        Ok::<_, BootstrapError>(())
    });

    let client = Client::with_dialer(
        ClientConfig::new().with_secret(SECRET),
        PipeDialer(Mutex::new(Some(client_io))),
    );
    let mut tls = client.connect("127.0.0.1:1").await?;
    tls.write_all(b"hello").await?;
    let mut echoed = [0u8; 5];
    tls.read_exact(&mut echoed).await?;
    assert_eq!(&echoed, b"hello");

    server_task.await??;

    let err = client.connect("127.0.0.1:1").await.unwrap_err();
    assert!(matches!(err, BootstrapError::Io(_)));
    Ok(())
}
