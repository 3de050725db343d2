//! Authoritative server state, independent of the transport.
//!
//! Each incoming element is handled to completion before the next one, and
//! produces at most one reply for the sender.

use colonia_core::Game;
use colonia_protocol::wire::deserialize_element;
use colonia_protocol::{
    Element, ErrorKind, ErrorMessage, LoginAcceptedMessage, LoginMessage, PlayerId, WireMessage,
};
use tracing::{debug, info, warn};

use crate::command::Caller;
use crate::config::ServerConfig;
use crate::connection::ConnectionManager;
use crate::dispatcher::{DispatchError, Dispatcher};

pub struct GameServer {
    game: Game,
    connections: ConnectionManager,
    dispatcher: Dispatcher,
}

fn error_reply(kind: ErrorKind, message: impl Into<String>) -> Option<Element> {
    Some(ErrorMessage::new(kind, message).to_element())
}

impl GameServer {
    pub fn new(game: Game, config: &ServerConfig) -> Self {
        Self {
            game,
            connections: ConnectionManager::new(
                config.rate_limit_messages,
                config.rate_limit_window(),
            ),
            dispatcher: Dispatcher::default(),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Decode and handle raw bytes from a client.
    pub fn handle_bytes(&mut self, client_id: u64, data: &[u8]) -> Option<Element> {
        if !self.connections.check_rate_limit(client_id) {
            warn!("client {} rate limited, dropping message", client_id);
            return None;
        }
        match deserialize_element(data) {
            Ok(element) => self.handle_element(client_id, &element),
            Err(e) => {
                warn!("client {} sent undecodable message: {}", client_id, e);
                error_reply(ErrorKind::Malformed, e.to_string())
            }
        }
    }

    /// Handle one decoded element. Rate limiting is the caller's concern.
    pub fn handle_element(&mut self, client_id: u64, element: &Element) -> Option<Element> {
        if element.tag == LoginMessage::TAG {
            return Some(self.handle_login(client_id, element));
        }

        let Some(player) = self.connections.player_for(client_id) else {
            warn!("client {} sent <{}> before login", client_id, element.tag);
            return error_reply(ErrorKind::NotLoggedIn, "login required");
        };

        let caller = Caller { client_id, player };
        match self.dispatcher.dispatch(element, &mut self.game, caller) {
            Ok(reply) => {
                debug!("{} handled <{}>", player, element.tag);
                reply
            }
            Err(e) => {
                warn!("{} <{}> failed: {}", player, element.tag, e);
                Some(e.to_message().to_element())
            }
        }
    }

    fn handle_login(&mut self, client_id: u64, element: &Element) -> Element {
        let login = match LoginMessage::from_element(element) {
            Ok(login) => login,
            Err(e) => return DispatchError::from(e).to_message().to_element(),
        };

        let accepted = match &login.token {
            Some(token) => self.reconnect(client_id, &login, token),
            None => self.claim(client_id, &login),
        };

        match accepted {
            Ok(reply) => {
                info!(
                    "client {} logged in as {} ({})",
                    client_id, reply.player, reply.user_name
                );
                reply.to_element()
            }
            Err(reply) => {
                warn!(
                    "client {} login as {} refused: {}",
                    client_id, login.user_name, reply.message
                );
                reply.to_element()
            }
        }
    }

    fn claim(
        &mut self,
        client_id: u64,
        login: &LoginMessage,
    ) -> Result<LoginAcceptedMessage, ErrorMessage> {
        let player = self
            .game
            .player_by_name(&login.user_name)
            .filter(|p| !p.is_native)
            .ok_or_else(|| {
                ErrorMessage::new(
                    ErrorKind::Lookup,
                    format!("no playable player named {}", login.user_name),
                )
            })?;
        let (player_id, user_name) = (player.id, player.name.clone());
        let token = self
            .connections
            .login(client_id, player_id, user_name.clone())
            .map_err(|e| ErrorMessage::new(ErrorKind::Rejected, e.to_string()))?;
        Ok(LoginAcceptedMessage {
            player: player_id,
            user_name,
            token,
        })
    }

    fn reconnect(
        &mut self,
        client_id: u64,
        login: &LoginMessage,
        token: &str,
    ) -> Result<LoginAcceptedMessage, ErrorMessage> {
        let player_id: PlayerId = self
            .connections
            .reconnect(client_id, token)
            .map_err(|e| ErrorMessage::new(ErrorKind::Authorization, e.to_string()))?;
        let user_name = self
            .connections
            .session(player_id)
            .map_or_else(|| login.user_name.clone(), |s| s.user_name.clone());
        Ok(LoginAcceptedMessage {
            player: player_id,
            user_name,
            token: token.to_owned(),
        })
    }

    pub fn client_disconnected(&mut self, client_id: u64) {
        match self.connections.disconnect(client_id) {
            Some(player) => info!("{} disconnected (client {})", player, client_id),
            None => debug!("client {} disconnected before login", client_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colonia_core::{load_scenario, ScenarioSource, TradeRules};
    use colonia_protocol::wire::serialize_element;

    fn server() -> GameServer {
        let game = load_scenario(ScenarioSource::Embedded)
            .unwrap()
            .build(TradeRules::default())
            .unwrap();
        GameServer::new(game, &ServerConfig::default())
    }

    fn login(name: &str) -> Element {
        LoginMessage {
            user_name: name.into(),
            token: None,
        }
        .to_element()
    }

    fn error_kind(reply: Option<Element>) -> ErrorKind {
        ErrorMessage::from_element(&reply.unwrap()).unwrap().kind
    }

    #[test]
    fn commands_require_login() {
        let mut server = server();
        let el = Element::new("updateCurrentStop").with("unit", "unit:2");
        assert_eq!(error_kind(server.handle_element(1, &el)), ErrorKind::NotLoggedIn);
    }

    #[test]
    fn native_players_are_not_playable() {
        let mut server = server();
        assert_eq!(error_kind(server.handle_element(1, &login("Arawak"))), ErrorKind::Lookup);
    }

    #[test]
    fn login_then_command() {
        let mut server = server();
        let reply = server.handle_element(1, &login("Dutch")).unwrap();
        let accepted = LoginAcceptedMessage::from_element(&reply).unwrap();
        assert_eq!(accepted.player, PlayerId(0));

        let el = Element::new("updateCurrentStop").with("unit", "unit:2");
        assert_eq!(server.handle_element(1, &el), None);
        assert_eq!(server.game().unit("unit:2").unwrap().current_stop, Some(0));
    }

    #[test]
    fn token_reclaims_dropped_slot() {
        let mut server = server();
        let reply = server.handle_element(1, &login("Dutch")).unwrap();
        let token = LoginAcceptedMessage::from_element(&reply).unwrap().token;
        server.client_disconnected(1);

        assert_eq!(error_kind(server.handle_element(2, &login("Dutch"))), ErrorKind::Rejected);
        let relogin = LoginMessage {
            user_name: "Dutch".into(),
            token: Some(token),
        };
        let reply = server.handle_element(2, &relogin.to_element()).unwrap();
        assert_eq!(reply.tag, LoginAcceptedMessage::TAG);
        assert_eq!(server.connections().player_for(2), Some(PlayerId(0)));
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let mut server = server();
        assert_eq!(error_kind(server.handle_bytes(1, &[0xc1, 0x00])), ErrorKind::Malformed);
    }

    #[test]
    fn rate_limited_messages_are_dropped() {
        let game = Game::new(TradeRules::default());
        let config = ServerConfig {
            rate_limit_messages: 1,
            ..ServerConfig::default()
        };
        let mut server = GameServer::new(game, &config);
        let bytes = serialize_element(&login("Nobody")).unwrap();
        assert!(server.handle_bytes(1, &bytes).is_some());
        assert!(server.handle_bytes(1, &bytes).is_none());
    }
}
