//! Client connections and the player slots they hold.
//!
//! A client claims a non-native player by name and receives a reconnect
//! token. After a drop the slot stays reserved and only the token reclaims it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use colonia_protocol::PlayerId;
use rand::Rng;

#[derive(Clone, Debug)]
pub enum ConnectionState {
    Connected {
        client_id: u64,
        connected_at: Instant,
    },
    Disconnected {
        disconnected_at: Instant,
    },
}

/// A claimed player slot.
#[derive(Clone, Debug)]
pub struct PlayerSession {
    pub player_id: PlayerId,
    pub user_name: String,
    pub reconnect_token: String,
    pub state: ConnectionState,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("client already logged in")]
    ClientAlreadyLoggedIn,
    #[error("{0} is already claimed")]
    PlayerTaken(PlayerId),
    #[error("invalid reconnect token")]
    InvalidToken,
    #[error("player already connected")]
    AlreadyConnected,
}

#[derive(Clone, Copy, Debug)]
struct RateWindow {
    count: u32,
    started: Instant,
}

pub struct ConnectionManager {
    sessions: HashMap<PlayerId, PlayerSession>,
    client_to_player: HashMap<u64, PlayerId>,
    tokens: HashMap<String, PlayerId>,
    /// Keyed by client so unauthenticated clients are limited too
    rates: HashMap<u64, RateWindow>,
    rate_limit_messages: u32,
    rate_limit_window: Duration,
}

impl ConnectionManager {
    pub fn new(rate_limit_messages: u32, rate_limit_window: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            client_to_player: HashMap::new(),
            tokens: HashMap::new(),
            rates: HashMap::new(),
            rate_limit_messages,
            rate_limit_window,
        }
    }

    /// Claim `player_id` for `client_id`. Returns the reconnect token.
    pub fn login(
        &mut self,
        client_id: u64,
        player_id: PlayerId,
        user_name: impl Into<String>,
    ) -> Result<String, LoginError> {
        if self.client_to_player.contains_key(&client_id) {
            return Err(LoginError::ClientAlreadyLoggedIn);
        }
        if self.sessions.contains_key(&player_id) {
            return Err(LoginError::PlayerTaken(player_id));
        }

        let token = generate_token();
        self.sessions.insert(
            player_id,
            PlayerSession {
                player_id,
                user_name: user_name.into(),
                reconnect_token: token.clone(),
                state: ConnectionState::Connected {
                    client_id,
                    connected_at: Instant::now(),
                },
            },
        );
        self.client_to_player.insert(client_id, player_id);
        self.tokens.insert(token.clone(), player_id);
        Ok(token)
    }

    /// Reclaim a dropped slot with its token.
    pub fn reconnect(&mut self, client_id: u64, token: &str) -> Result<PlayerId, LoginError> {
        if self.client_to_player.contains_key(&client_id) {
            return Err(LoginError::ClientAlreadyLoggedIn);
        }
        let player_id = self
            .tokens
            .get(token)
            .copied()
            .ok_or(LoginError::InvalidToken)?;
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(LoginError::InvalidToken)?;
        if matches!(session.state, ConnectionState::Connected { .. }) {
            return Err(LoginError::AlreadyConnected);
        }

        session.state = ConnectionState::Connected {
            client_id,
            connected_at: Instant::now(),
        };
        self.client_to_player.insert(client_id, player_id);
        Ok(player_id)
    }

    pub fn disconnect(&mut self, client_id: u64) -> Option<PlayerId> {
        self.rates.remove(&client_id);
        let player_id = self.client_to_player.remove(&client_id)?;
        if let Some(session) = self.sessions.get_mut(&player_id) {
            session.state = ConnectionState::Disconnected {
                disconnected_at: Instant::now(),
            };
        }
        Some(player_id)
    }

    pub fn player_for(&self, client_id: u64) -> Option<PlayerId> {
        self.client_to_player.get(&client_id).copied()
    }

    pub fn session(&self, player_id: PlayerId) -> Option<&PlayerSession> {
        self.sessions.get(&player_id)
    }

    pub fn is_connected(&self, player_id: PlayerId) -> bool {
        self.sessions
            .get(&player_id)
            .is_some_and(|s| matches!(s.state, ConnectionState::Connected { .. }))
    }

    pub fn connected_count(&self) -> usize {
        self.client_to_player.len()
    }

    /// Count one message against the client's window. Returns false once
    /// the window's allowance is spent.
    pub fn check_rate_limit(&mut self, client_id: u64) -> bool {
        let now = Instant::now();
        let window = self.rates.entry(client_id).or_insert(RateWindow {
            count: 0,
            started: now,
        });
        if now.duration_since(window.started) >= self.rate_limit_window {
            window.started = now;
            window.count = 0;
        }
        window.count += 1;
        window.count <= self.rate_limit_messages
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| {
            let idx = rng.gen_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}
