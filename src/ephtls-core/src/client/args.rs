//! CLI arguments for `ephtls client`.

use clap::Args;

/// Connect to an echo server and relay stdin lines through it.
#[derive(Args, Debug, Clone, Default)]
pub struct ClientArgs {
    /// Server address (host:port) [default: 127.0.0.1:4430]
    #[arg(long)]
    pub connect: Option<String>,

    /// Secret used to open the sealed ephemeral key
    #[arg(long, env = "EPHTLS_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Only trust a server certificate with this SHA-256 fingerprint (hex)
    #[arg(long)]
    pub server_fingerprint: Option<String>,
}
