//! Colonia server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use renet::{ConnectionConfig, RenetServer, ServerEvent};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use colonia_core::{load_scenario, ScenarioSource};
use colonia_protocol::wire::serialize_element;
use colonia_server::{
    channel_id, create_channel_configs, GameServer, ServerConfig, ServerRunner, TransportConfig,
    PROTOCOL_ID,
};

#[derive(Parser, Debug)]
#[command(name = "colonia-server", version, about = "Colonia authoritative game server")]
struct Cli {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Override the scenario file
    #[arg(long)]
    scenario: Option<PathBuf>,
}

struct Server {
    renet: RenetServer,
    state: GameServer,
}

impl Server {
    fn new(state: GameServer) -> Self {
        let connection_config = ConnectionConfig {
            available_bytes_per_tick: 60_000,
            server_channels_config: create_channel_configs(),
            client_channels_config: create_channel_configs(),
        };
        Self {
            renet: RenetServer::new(connection_config),
            state,
        }
    }

    fn update(&mut self, delta: Duration) {
        self.renet.update(delta);

        while let Some(event) = self.renet.get_event() {
            match event {
                ServerEvent::ClientConnected { client_id } => {
                    info!("client {} connected", client_id);
                }
                ServerEvent::ClientDisconnected { client_id, reason } => {
                    info!("client {} dropped: {}", client_id, reason);
                    self.state.client_disconnected(client_id);
                }
            }
        }

        for client_id in self.renet.clients_id() {
            while let Some(message) = self.renet.receive_message(client_id, channel_id::COMMANDS) {
                let Some(reply) = self.state.handle_bytes(client_id, &message) else {
                    continue;
                };
                match serialize_element(&reply) {
                    Ok(bytes) => self
                        .renet
                        .send_message(client_id, channel_id::COMMANDS, bytes),
                    Err(e) => error!("failed to encode <{}> reply: {}", reply.tag, e),
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(scenario) = cli.scenario {
        config.scenario = Some(scenario);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let source = match &config.scenario {
        Some(path) => ScenarioSource::Path(path.display().to_string()),
        None => ScenarioSource::Embedded,
    };
    let game = load_scenario(source)
        .and_then(|scenario| scenario.build(config.trade.clone()))
        .context("failed to load scenario")?;

    let mut server = Server::new(GameServer::new(game, &config));
    let mut transport = ServerRunner::new(&TransportConfig {
        public_address: config.bind_address,
        max_clients: config.max_clients,
        private_key: None,
    })?;

    info!("Colonia server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "listening on {} (protocol {:016x})",
        transport.local_addr().unwrap_or(config.bind_address),
        PROTOCOL_ID
    );

    let tick = Duration::from_millis(16);
    let mut last_tick = Instant::now();
    loop {
        let start = Instant::now();
        // Real time since the previous tick, including any overrun.
        let delta = start.duration_since(last_tick);
        last_tick = start;

        transport.receive(&mut server.renet, delta);
        server.update(delta);
        transport.send(&mut server.renet);

        if let Some(sleep) = tick.checked_sub(start.elapsed()) {
            std::thread::sleep(sleep);
        }
    }
}
