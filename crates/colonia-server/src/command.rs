//! Server-side handling of decoded commands.
//!
//! Every command resolves its identifiers against the authoritative game,
//! scoped to the calling player, before any mutation. A failed resolution
//! ends the request with nothing changed.

use colonia_core::{Game, GameError, NativeTrade};
use colonia_protocol::{
    Element, NativeTradeAction, NativeTradeMessage, PlayerId, UpdateCurrentStopMessage,
    WireMessage,
};
use tracing::{debug, info};

/// The party a command runs on behalf of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    pub client_id: u64,
    pub player: PlayerId,
}

pub trait ServerCommand: WireMessage {
    /// Apply the command. `Ok(None)` means the command has no reply.
    fn handle(self, game: &mut Game, caller: Caller) -> Result<Option<Element>, GameError>;
}

impl ServerCommand for UpdateCurrentStopMessage {
    fn handle(self, game: &mut Game, caller: Caller) -> Result<Option<Element>, GameError> {
        let stop = game.update_current_stop(self.unit().as_str(), caller.player)?;
        match stop {
            Some(index) => debug!("{} advanced to stop {}", self.unit(), index),
            None => info!("{} has no valid stop left", self.unit()),
        }
        Ok(None)
    }
}

impl ServerCommand for NativeTradeMessage {
    fn handle(self, game: &mut Game, caller: Caller) -> Result<Option<Element>, GameError> {
        let unit = self.unit.as_str();
        let settlement = self.settlement.as_str();

        let (session, result) = match self.action {
            NativeTradeAction::Open => (game.open_trade(caller.player, unit, settlement)?, None),
            NativeTradeAction::Close => (game.close_trade(caller.player, unit, settlement)?, None),
            action if action.is_negotiation() => {
                let price = self
                    .price
                    .map(|p| u32::try_from(p).map_err(|_| GameError::InvalidPrice(p)))
                    .transpose()?;
                let round =
                    game.negotiate(caller.player, unit, settlement, action, self.goods, price)?;
                (round.session, round.result)
            }
            // Updates only flow server to client.
            action => {
                return Err(GameError::ActionNotAllowed {
                    key: NativeTrade::key_for(&self.unit, &self.settlement),
                    action,
                });
            }
        };

        for key in game.prune_finished_trades() {
            debug!("pruned trade session {}", key);
        }

        let reply = NativeTradeMessage::update(session, self.unit, self.settlement, result);
        Ok(Some(reply.to_element()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colonia_core::{load_scenario, ScenarioSource, TradeRules};
    use colonia_protocol::{Goods, GoodsType, ObjectId, TradeResult};

    const DUTCH: Caller = Caller {
        client_id: 1,
        player: PlayerId(0),
    };

    fn game() -> Game {
        load_scenario(ScenarioSource::Embedded)
            .unwrap()
            .build(TradeRules::default())
            .unwrap()
    }

    fn trade(action: NativeTradeAction) -> NativeTradeMessage {
        NativeTradeMessage::request(
            action,
            &ObjectId::new("unit:2"),
            &ObjectId::new("settlement:1"),
        )
    }

    fn reply_of(element: Element) -> NativeTradeMessage {
        NativeTradeMessage::from_element(&element).unwrap()
    }

    #[test]
    fn update_stop_has_no_reply_and_advances() {
        let mut game = game();
        let msg = UpdateCurrentStopMessage::new(&ObjectId::new("unit:2"));
        assert_eq!(msg.handle(&mut game, DUTCH), Ok(None));
        assert_eq!(game.unit("unit:2").unwrap().current_stop, Some(0));
    }

    #[test]
    fn update_stop_for_foreign_unit_is_refused() {
        let mut game = game();
        let before = game.unit("unit:3").unwrap().current_stop;
        let err = UpdateCurrentStopMessage::new(&ObjectId::new("unit:3"))
            .handle(&mut game, DUTCH)
            .unwrap_err();
        assert!(err.is_authorization_failure());
        assert_eq!(game.unit("unit:3").unwrap().current_stop, before);
    }

    #[test]
    fn open_replies_with_session_update() {
        let mut game = game();
        let reply = reply_of(trade(NativeTradeAction::Open).handle(&mut game, DUTCH).unwrap().unwrap());
        assert_eq!(reply.action, NativeTradeAction::Update);
        assert_eq!(reply.result(), None);
        let session = reply.session.unwrap();
        assert_eq!(session.count, 0);
        assert!(session.buy && session.sell && session.gift);
    }

    #[test]
    fn close_prunes_the_session() {
        let mut game = game();
        trade(NativeTradeAction::Open).handle(&mut game, DUTCH).unwrap();
        let reply = reply_of(trade(NativeTradeAction::Close).handle(&mut game, DUTCH).unwrap().unwrap());
        assert!(reply.session.unwrap().is_done());
        assert_eq!(game.trades().count(), 0);
    }

    #[test]
    fn sell_reports_price_code() {
        let mut game = game();
        trade(NativeTradeAction::Open).handle(&mut game, DUTCH).unwrap();
        let reply = reply_of(
            trade(NativeTradeAction::Sell)
                .with_goods(Goods::new(GoodsType::Cloth, 100))
                .handle(&mut game, DUTCH)
                .unwrap()
                .unwrap(),
        );
        assert!(matches!(reply.result(), Some(TradeResult::Price(p)) if p > 0));
        assert!(!reply.session.unwrap().sell);
    }

    #[test]
    fn client_update_is_rejected() {
        let mut game = game();
        let err = trade(NativeTradeAction::Update).handle(&mut game, DUTCH).unwrap_err();
        assert!(matches!(err, GameError::ActionNotAllowed { .. }));
    }

    #[test]
    fn negative_offer_is_rejected_without_counting() {
        let mut game = game();
        trade(NativeTradeAction::Open).handle(&mut game, DUTCH).unwrap();
        let err = trade(NativeTradeAction::Buy)
            .with_goods(Goods::new(GoodsType::Furs, 100))
            .with_price(-5)
            .handle(&mut game, DUTCH)
            .unwrap_err();
        assert_eq!(err, GameError::InvalidPrice(-5));
        assert_eq!(game.trade("unit:2-settlement:1").unwrap().count(), 0);
    }
}
