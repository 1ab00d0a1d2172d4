//! Client side of the bootstrap.

pub mod args;
pub mod config;
pub mod dialer;
pub mod handshake;

pub use args::ClientArgs;
pub use config::ClientConfig;
pub use dialer::{Dialer, TcpDialer};
pub use handshake::{server_name_for, Client, ClientPhase};
