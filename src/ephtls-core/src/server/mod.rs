//! Server side of the bootstrap.
//!
//! - [`BootstrapAcceptor`]: bootstrap an accepted stream of any transport
//! - [`Server`]: TCP listener driving an acceptor
//! - [`ServerConfig`]: timeout, identity, key sealing, registry
//! - [`ServerArgs`]: CLI arguments for the demo binary

pub mod args;
pub mod config;
pub mod handshake;
pub mod listener;

pub use args::ServerArgs;
pub use config::{
    KeyEncryptor, Password, RawStream, ServerConfig, DEFAULT_IDENTITY_VALIDITY, DEFAULT_TIMEOUT,
};
pub use handshake::{BootstrapAcceptor, ServerPhase};
pub use listener::Server;
