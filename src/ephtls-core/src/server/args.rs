//! CLI arguments for `ephtls server`.

use clap::Args;
use ephtls_crypto::KeyCipher;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Run an echo server behind the bootstrap.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// TCP bind address [default: 127.0.0.1:4430]
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Secret used to seal the ephemeral private key
    #[arg(long, env = "EPHTLS_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Cipher for the sealed key: aes-128-cbc|aes-256-cbc
    #[arg(long)]
    pub cipher: Option<KeyCipher>,

    /// Seconds the client has to complete the TLS upgrade
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// PEM certificate the server presents (generated when omitted)
    #[arg(long, requires = "key")]
    pub cert: Option<PathBuf>,

    /// PEM private key for --cert
    #[arg(long, requires = "cert")]
    pub key: Option<PathBuf>,
}
