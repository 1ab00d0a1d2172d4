//! Settings for the `ephtls` binary: TOML file plus CLI overrides.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:4430"
//! secret = "Hello World"
//! cipher = "aes-256-cbc"
//! timeout_secs = 30
//!
//! [client]
//! connect = "127.0.0.1:4430"
//! secret = "Hello World"
//! ```
//!
//! Command-line values win over file values.

use crate::client::{ClientArgs, ClientConfig};
use crate::identity::Identity;
use crate::server::{ServerArgs, ServerConfig, DEFAULT_TIMEOUT};
use crate::tls::PinnedFingerprint;
use anyhow::{Context, Result};
use ephtls_crypto::KeyCipher;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:4430";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub client: ClientSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: Option<SocketAddr>,
    pub secret: Option<String>,
    pub cipher: Option<KeyCipher>,
    pub timeout_secs: Option<u64>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    pub connect: Option<String>,
    pub secret: Option<String>,
    pub server_fingerprint: Option<String>,
}

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&data)
}

pub fn parse_config(data: &str) -> Result<FileConfig> {
    toml::from_str(data).context("parsing config")
}

/// Resolved server settings.
#[derive(Debug)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    pub config: ServerConfig,
}

impl ServerSettings {
    pub fn resolve(args: ServerArgs, file: ServerSection) -> Result<Self> {
        let bind = match args.bind.or(file.bind) {
            Some(bind) => bind,
            None => DEFAULT_BIND.parse().context("default bind address")?,
        };
        let timeout = args
            .timeout_secs
            .or(file.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let mut config = ServerConfig::new().with_timeout(timeout);
        if let Some(secret) = args.secret.or(file.secret) {
            let cipher = args.cipher.or(file.cipher).unwrap_or_default();
            config = config.with_password(secret, cipher);
        }
        match (args.cert.or(file.cert), args.key.or(file.key)) {
            (Some(cert), Some(key)) => {
                let identity = Identity::load(&cert, &key)
                    .with_context(|| format!("loading identity {}", cert.display()))?;
                config = config.with_identity(identity);
            }
            (None, None) => {}
            _ => anyhow::bail!("cert and key must be given together"),
        }

        Ok(Self { bind, config })
    }
}

/// Resolved client settings.
#[derive(Debug)]
pub struct ClientSettings {
    pub connect: String,
    pub config: ClientConfig,
}

impl ClientSettings {
    pub fn resolve(args: ClientArgs, file: ClientSection) -> Result<Self> {
        let connect = args
            .connect
            .or(file.connect)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let mut config = ClientConfig::new();
        if let Some(secret) = args.secret.or(file.secret) {
            config = config.with_secret(secret);
        }
        if let Some(fingerprint) = args.server_fingerprint.or(file.server_fingerprint) {
            config = config.with_verifier(PinnedFingerprint::new(fingerprint));
        }

        Ok(Self { connect, config })
    }
}
