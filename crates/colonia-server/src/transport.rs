//! UDP transport over renet_netcode.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use renet::RenetServer;
use renet_netcode::{NetcodeServerTransport, ServerAuthentication, ServerConfig};
use tracing::{error, info};

/// Netcode protocol id shared with clients.
pub const PROTOCOL_ID: u64 = 0xC010_41A0_0001;

pub struct TransportConfig {
    pub public_address: SocketAddr,
    pub max_clients: usize,
    /// 32-byte key for secure connect tokens; unsecure when absent
    pub private_key: Option<[u8; 32]>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind socket to {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("failed to determine bound address for {0}: {1}")]
    LocalAddrFailed(SocketAddr, std::io::Error),

    #[error("failed to configure socket: {0}")]
    SocketConfig(std::io::Error),

    #[error("failed to create transport: {0}")]
    TransportCreation(String),
}

pub fn create_server_transport(
    config: &TransportConfig,
) -> Result<NetcodeServerTransport, TransportError> {
    let socket = UdpSocket::bind(config.public_address)
        .map_err(|e| TransportError::BindFailed(config.public_address, e))?;
    let bound_addr = socket
        .local_addr()
        .map_err(|e| TransportError::LocalAddrFailed(config.public_address, e))?;
    socket
        .set_nonblocking(true)
        .map_err(TransportError::SocketConfig)?;

    let authentication = match config.private_key {
        Some(key) => ServerAuthentication::Secure { private_key: key },
        None => ServerAuthentication::Unsecure,
    };

    let server_config = ServerConfig {
        current_time: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default(),
        max_clients: config.max_clients,
        protocol_id: PROTOCOL_ID,
        public_addresses: vec![bound_addr],
        authentication,
    };

    let transport = NetcodeServerTransport::new(server_config, socket)
        .map_err(|e| TransportError::TransportCreation(e.to_string()))?;

    info!(
        "transport bound to {} (max {} clients, protocol {:016x})",
        bound_addr, config.max_clients, PROTOCOL_ID
    );
    Ok(transport)
}

/// Pumps packets between the socket and the renet server each tick.
pub struct ServerRunner {
    transport: NetcodeServerTransport,
}

impl ServerRunner {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        Ok(Self {
            transport: create_server_transport(config)?,
        })
    }

    /// Advance the netcode clock by `delta` and feed received packets to renet.
    pub fn receive(&mut self, renet_server: &mut RenetServer, delta: Duration) {
        if let Err(e) = self.transport.update(delta, renet_server) {
            error!("transport update error: {}", e);
        }
    }

    pub fn send(&mut self, renet_server: &mut RenetServer) {
        self.transport.send_packets(renet_server);
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.addresses().first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_ephemeral_port() {
        let config = TransportConfig {
            public_address: "127.0.0.1:0".parse().unwrap(),
            max_clients: 4,
            private_key: None,
        };
        match ServerRunner::new(&config) {
            Ok(runner) => assert!(runner.local_addr().is_some()),
            // Sandboxes may refuse socket binds.
            Err(TransportError::BindFailed(_, err))
                if err.kind() == std::io::ErrorKind::PermissionDenied => {}
            Err(err) => panic!("transport error: {err:?}"),
        }
    }
}
