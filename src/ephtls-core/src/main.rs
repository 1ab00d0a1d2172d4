//! `ephtls`: echo server and client over the ephemeral TLS bootstrap.
//!
//! ```text
//! EPHTLS_SECRET="Hello World" ephtls server --bind 127.0.0.1:4430
//! EPHTLS_SECRET="Hello World" ephtls client --connect 127.0.0.1:4430
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ephtls_core::client::{Client, ClientArgs};
use ephtls_core::server::{Server, ServerArgs};
use ephtls_core::settings::{load_config, ClientSettings, FileConfig, ServerSettings};

#[derive(Parser, Debug)]
#[command(
    name = "ephtls",
    version,
    about = "Mutual TLS bootstrapped from per-connection ephemeral certificates"
)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Echo every line a client sends
    Server(ServerArgs),
    /// Send stdin lines to a server and print the replies
    Client(ClientArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let file_cfg = cli
        .config
        .as_deref()
        .map(load_config)
        .transpose()?
        .unwrap_or_default();

    match cli.command {
        Command::Server(args) => run_server(args, file_cfg).await,
        Command::Client(args) => run_client(args, file_cfg).await,
    }
}

async fn run_server(args: ServerArgs, file_cfg: FileConfig) -> Result<()> {
    let settings = ServerSettings::resolve(args, file_cfg.server)?;
    if settings.config.key_encryptor().is_none() {
        warn!("no secret configured, ephemeral keys are sent unencrypted");
    }

    let server = Server::bind(settings.bind, settings.config)
        .await
        .with_context(|| format!("binding {}", settings.bind))?;
    let identity = server.acceptor().identity().await?;
    info!(
        addr = %server.local_addr()?,
        fingerprint = %identity.fingerprint(),
        "echo server ready"
    );

    server.serve(echo).await?;
    Ok(())
}

async fn echo(stream: TlsStream<TcpStream>, peer: SocketAddr) {
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(%peer, %line, "echo");
                let reply = format!("Echo: {line}\n");
                if let Err(err) = writer.write_all(reply.as_bytes()).await {
                    warn!(%peer, %err, "write failed");
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(%peer, %err, "read failed");
                break;
            }
        }
    }
    let _ = writer.shutdown().await;
    info!(%peer, "client disconnected");
}

async fn run_client(args: ClientArgs, file_cfg: FileConfig) -> Result<()> {
    let settings = ClientSettings::resolve(args, file_cfg.client)?;
    let client = Client::new(settings.config);
    let stream = client
        .connect(&settings.connect)
        .await
        .with_context(|| format!("connecting to {}", settings.connect))?;
    info!(addr = %settings.connect, "connected");

    let (reader, mut writer) = tokio::io::split(stream);
    let mut replies = BufReader::new(reader).lines();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = input.next_line().await? {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        match replies.next_line().await? {
            Some(reply) => {
                stdout.write_all(reply.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            None => {
                warn!("server closed the connection");
                return Ok(());
            }
        }
    }

    writer.shutdown().await?;
    Ok(())
}
