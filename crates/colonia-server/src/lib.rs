//! Colonia game server
//!
//! Authoritative command handling over a Renet transport.

pub mod channels;
pub mod command;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod server;
pub mod transport;

pub use channels::*;
pub use command::{Caller, ServerCommand};
pub use config::{ConfigError, ServerConfig};
pub use connection::{ConnectionManager, LoginError};
pub use dispatcher::{DispatchError, Dispatcher};
pub use server::GameServer;
pub use transport::{ServerRunner, TransportConfig, TransportError, PROTOCOL_ID};
