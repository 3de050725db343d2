//! The authoritative game container.
//!
//! Every request is resolved and authorized against the registries here,
//! then checked in full before anything is mutated: a refused request leaves
//! the game exactly as it was.

use std::collections::BTreeMap;

use tracing::debug;

use colonia_protocol::{
    Goods, NativeTradeAction, NativeTradeSnapshot, ObjectId, PlayerId, TradeResult,
};

use crate::{
    Colony, GameError, NativeSettlement, NativeTrade, Player, Registry, Stances, TradeRules, Unit,
};

/// Outcome of a trade round: the session as it now stands, plus the round's
/// result code when the round produced one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeRound {
    pub session: NativeTradeSnapshot,
    pub result: Option<TradeResult>,
}

/// What a checked round will do once mutation starts.
enum Plan {
    Quote(TradeResult),
    Haggle,
    Buy { goods: Goods, price: u32 },
    Sell { goods: Goods, price: u32 },
    Gift { goods: Goods },
}

#[derive(Clone, Debug, Default)]
pub struct Game {
    players: BTreeMap<PlayerId, Player>,
    stances: Stances,
    colonies: Registry<Colony>,
    settlements: Registry<NativeSettlement>,
    units: Registry<Unit>,
    trades: BTreeMap<String, NativeTrade>,
    rules: TradeRules,
}

impl Game {
    pub fn new(rules: TradeRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    pub fn add_player(&mut self, player: Player) -> Result<(), GameError> {
        if self.players.contains_key(&player.id) {
            return Err(GameError::DuplicateId(ObjectId::new(player.id.to_string())));
        }
        self.players.insert(player.id, player);
        Ok(())
    }

    pub fn add_colony(&mut self, colony: Colony) -> Result<(), GameError> {
        self.colonies.insert(colony.id.clone(), colony)?;
        Ok(())
    }

    pub fn add_settlement(&mut self, settlement: NativeSettlement) -> Result<(), GameError> {
        self.settlements.insert(settlement.id.clone(), settlement)?;
        Ok(())
    }

    pub fn add_unit(&mut self, unit: Unit) -> Result<(), GameError> {
        self.units.insert(unit.id.clone(), unit)?;
        Ok(())
    }

    pub fn remove_colony(&mut self, id: &str) -> Option<Colony> {
        self.colonies.remove(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.players.get(&id).ok_or(GameError::UnknownPlayer(id))
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.values().find(|p| p.name == name)
    }

    pub fn stances_mut(&mut self) -> &mut Stances {
        &mut self.stances
    }

    pub fn colony(&self, id: &str) -> Result<&Colony, GameError> {
        self.colonies
            .get(id)
            .ok_or_else(|| GameError::UnknownObject(ObjectId::new(id)))
    }

    pub fn colony_mut(&mut self, id: &str) -> Result<&mut Colony, GameError> {
        self.colonies
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownObject(ObjectId::new(id)))
    }

    pub fn settlement(&self, id: &str) -> Result<&NativeSettlement, GameError> {
        self.settlements
            .get(id)
            .ok_or_else(|| GameError::UnknownObject(ObjectId::new(id)))
    }

    pub fn settlement_mut(&mut self, id: &str) -> Result<&mut NativeSettlement, GameError> {
        self.settlements
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownObject(ObjectId::new(id)))
    }

    pub fn unit(&self, id: &str) -> Result<&Unit, GameError> {
        self.units
            .get(id)
            .ok_or_else(|| GameError::UnknownObject(ObjectId::new(id)))
    }

    /// Resolve a unit on behalf of `player`. Unknown ids and units owned by
    /// someone else fail differently.
    pub fn get_unit_safely(&self, id: &str, player: PlayerId) -> Result<&Unit, GameError> {
        let unit = self.unit(id)?;
        if unit.owner != player {
            return Err(GameError::NotOwner {
                id: unit.id.clone(),
                player,
            });
        }
        Ok(unit)
    }

    fn owned_unit_mut<'a>(
        units: &'a mut Registry<Unit>,
        id: &str,
        player: PlayerId,
    ) -> Result<&'a mut Unit, GameError> {
        let unit = units
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownObject(ObjectId::new(id)))?;
        if unit.owner != player {
            return Err(GameError::NotOwner {
                id: unit.id.clone(),
                player,
            });
        }
        Ok(unit)
    }

    /// Advance a unit to its next valid trade-route stop. A stop is valid
    /// while its colony exists and belongs to the unit's owner.
    pub fn update_current_stop(
        &mut self,
        unit_id: &str,
        player: PlayerId,
    ) -> Result<Option<usize>, GameError> {
        let colonies = &self.colonies;
        let unit = Self::owned_unit_mut(&mut self.units, unit_id, player)?;
        let owner = unit.owner;
        Ok(unit.next_stop(|stop| {
            colonies
                .get(stop.location.as_str())
                .is_some_and(|colony| colony.owner == owner)
        }))
    }

    pub fn trade(&self, key: &str) -> Option<&NativeTrade> {
        self.trades.get(key)
    }

    pub fn trades(&self) -> impl Iterator<Item = (&String, &NativeTrade)> {
        self.trades.iter()
    }

    /// Open (or rejoin) the session between a unit and a settlement. An
    /// active session for the same pair is returned unchanged.
    pub fn open_trade(
        &mut self,
        player: PlayerId,
        unit_id: &str,
        settlement_id: &str,
    ) -> Result<NativeTradeSnapshot, GameError> {
        let unit = self.get_unit_safely(unit_id, player)?;
        let settlement = self.settlement(settlement_id)?;
        let key = NativeTrade::key_for(&unit.id, &settlement.id);

        if let Some(existing) = self.trades.get(&key).filter(|t| !t.is_done()) {
            return Ok(existing.snapshot());
        }

        let at_war = self.stances.at_war(settlement.owner, unit.owner);
        let trade = NativeTrade::open(
            unit.id.clone(),
            settlement.id.clone(),
            at_war,
            unit.has_goods_cargo(),
        );
        debug!("opened trade {}", trade);
        let snapshot = trade.snapshot();
        self.trades.insert(key, trade);
        Ok(snapshot)
    }

    /// Close the session. Closing a session that is already gone still
    /// reports a closed session.
    pub fn close_trade(
        &mut self,
        player: PlayerId,
        unit_id: &str,
        settlement_id: &str,
    ) -> Result<NativeTradeSnapshot, GameError> {
        let unit = self.get_unit_safely(unit_id, player)?.id.clone();
        let settlement = self.settlement(settlement_id)?.id.clone();
        let key = NativeTrade::key_for(&unit, &settlement);

        match self.trades.get_mut(&key) {
            Some(trade) => {
                trade.close();
                Ok(trade.snapshot())
            }
            None => {
                let mut closed = NativeTrade::open(unit, settlement, false, false);
                closed.close();
                Ok(closed.snapshot())
            }
        }
    }

    /// Drop finished sessions. Returns the keys removed.
    pub fn prune_finished_trades(&mut self) -> Vec<String> {
        let done: Vec<String> = self
            .trades
            .iter()
            .filter(|(_, t)| t.is_done())
            .map(|(k, _)| k.clone())
            .collect();
        for key in &done {
            self.trades.remove(key);
        }
        done
    }

    /// Play one negotiation round (`Buy`, `Sell`, `Gift`, `PriceBuy` or
    /// `PriceSell`).
    ///
    /// `price` is the caller's offer for `Buy`/`Sell`; without one the
    /// settlement's own price is taken.
    pub fn negotiate(
        &mut self,
        player: PlayerId,
        unit_id: &str,
        settlement_id: &str,
        action: NativeTradeAction,
        goods: Option<Goods>,
        price: Option<u32>,
    ) -> Result<TradeRound, GameError> {
        let unit = self.get_unit_safely(unit_id, player)?;
        let settlement = self.settlement(settlement_id)?;
        let key = NativeTrade::key_for(&unit.id, &settlement.id);
        let session = self
            .trades
            .get(&key)
            .ok_or_else(|| GameError::NoSession(key.clone()))?;

        if session.is_done() {
            return Err(GameError::SessionFinished(key));
        }
        let allowed = match action {
            NativeTradeAction::Buy | NativeTradeAction::PriceBuy => session.buy,
            NativeTradeAction::Sell | NativeTradeAction::PriceSell => session.sell,
            NativeTradeAction::Gift => session.gift,
            NativeTradeAction::Open | NativeTradeAction::Close | NativeTradeAction::Update => false,
        };
        if !allowed {
            return Err(GameError::ActionNotAllowed { key, action });
        }

        if settlement.is_hostile_to(player, &self.rules) {
            let trade = self
                .trades
                .get_mut(&key)
                .ok_or_else(|| GameError::NoSession(key.clone()))?;
            trade.close();
            debug!("trade {} refused: hostile", key);
            return Ok(TradeRound {
                session: trade.snapshot(),
                result: Some(TradeResult::Hostile),
            });
        }

        let goods = goods
            .filter(|g| g.amount > 0)
            .ok_or(GameError::GoodsRequired { action })?;
        let plan = self.plan_round(player, unit, settlement, action, goods, price)?;

        // Checks are done; from here on nothing fails.
        let unit_key = unit.id.clone();
        let settlement_key = settlement.id.clone();
        let native_owner = settlement.owner;
        let rules = self.rules.clone();

        let result = match plan {
            Plan::Quote(result) => result,
            Plan::Haggle => TradeResult::Haggle,
            Plan::Buy { goods, price } => {
                self.transfer_gold(player, native_owner, price);
                if let Some(s) = self.settlements.get_mut(settlement_key.as_str()) {
                    s.take_stock(goods);
                }
                if let Some(u) = self.units.get_mut(unit_key.as_str()) {
                    u.add_goods(goods);
                }
                TradeResult::Price(price)
            }
            Plan::Sell { goods, price } => {
                self.transfer_gold(native_owner, player, price);
                if let Some(u) = self.units.get_mut(unit_key.as_str()) {
                    u.remove_goods(goods);
                }
                if let Some(s) = self.settlements.get_mut(settlement_key.as_str()) {
                    s.add_stock(goods);
                }
                TradeResult::Price(price)
            }
            Plan::Gift { goods } => {
                if let Some(u) = self.units.get_mut(unit_key.as_str()) {
                    u.remove_goods(goods);
                }
                if let Some(s) = self.settlements.get_mut(settlement_key.as_str()) {
                    s.add_stock(goods);
                    s.soothe(player, goods.base_value() / rules.gift_alarm_divisor.max(1));
                }
                TradeResult::Price(goods.base_value().max(1))
            }
        };

        let has_cargo = self
            .units
            .get(unit_key.as_str())
            .is_some_and(Unit::has_goods_cargo);
        let trade = self
            .trades
            .get_mut(&key)
            .ok_or_else(|| GameError::NoSession(key.clone()))?;
        trade.record_attempt();

        match (action, result) {
            (NativeTradeAction::Buy, TradeResult::Price(_)) => trade.buy = false,
            (NativeTradeAction::Sell, TradeResult::Price(_)) => trade.sell = false,
            (NativeTradeAction::Gift, _) => trade.gift = false,
            (NativeTradeAction::Buy | NativeTradeAction::PriceBuy, TradeResult::Haggle)
                if trade.attempts() > rules.max_haggles =>
            {
                trade.buy = false
            }
            (NativeTradeAction::Sell | NativeTradeAction::PriceSell, TradeResult::Haggle)
                if trade.attempts() > rules.max_haggles =>
            {
                trade.sell = false
            }
            _ => {}
        }
        if !has_cargo {
            trade.sell = false;
            trade.gift = false;
        }

        debug!("trade {} {} {:?}: {}", key, action, result, trade);
        Ok(TradeRound {
            session: trade.snapshot(),
            result: Some(result),
        })
    }

    fn plan_round(
        &self,
        player: PlayerId,
        unit: &Unit,
        settlement: &NativeSettlement,
        action: NativeTradeAction,
        goods: Goods,
        price: Option<u32>,
    ) -> Result<Plan, GameError> {
        let rules = &self.rules;
        let plan = match action {
            NativeTradeAction::PriceBuy | NativeTradeAction::Buy => {
                if !settlement.has_stock(goods) {
                    return Err(GameError::NoSuchGoods {
                        settlement: settlement.id.clone(),
                        goods,
                    });
                }
                let ask = settlement.ask_price(goods, rules);
                if action == NativeTradeAction::PriceBuy {
                    return Ok(Plan::Quote(TradeResult::Price(ask)));
                }
                if !unit.has_room_for(goods) {
                    return Err(GameError::NoCargoSpace {
                        unit: unit.id.clone(),
                    });
                }
                let offer = price.unwrap_or(ask);
                if offer < ask {
                    Plan::Haggle
                } else if self.player(player)?.gold < offer {
                    return Err(GameError::InsufficientGold {
                        player,
                        price: offer,
                    });
                } else {
                    Plan::Buy {
                        goods,
                        price: offer,
                    }
                }
            }
            NativeTradeAction::PriceSell | NativeTradeAction::Sell | NativeTradeAction::Gift => {
                if !unit.carries(goods) {
                    return Err(GameError::MissingGoods {
                        unit: unit.id.clone(),
                        goods,
                    });
                }
                if action == NativeTradeAction::Gift {
                    return Ok(Plan::Gift { goods });
                }
                let Some(bid) = settlement.bid_price(goods, rules) else {
                    return Ok(Plan::Quote(TradeResult::NoTradeGoods));
                };
                if action == NativeTradeAction::PriceSell {
                    return Ok(Plan::Quote(TradeResult::Price(bid)));
                }
                // Selling for nothing is not a sale.
                let asked = price.unwrap_or(bid).max(1);
                if asked > bid {
                    Plan::Haggle
                } else if self.player(settlement.owner)?.gold < asked {
                    // The settlement cannot pay, and gold is never minted.
                    Plan::Quote(TradeResult::NoTrade)
                } else {
                    Plan::Sell {
                        goods,
                        price: asked,
                    }
                }
            }
            NativeTradeAction::Open | NativeTradeAction::Close | NativeTradeAction::Update => {
                return Err(GameError::ActionNotAllowed {
                    key: NativeTrade::key_for(&unit.id, &settlement.id),
                    action,
                });
            }
        };
        Ok(plan)
    }

    fn transfer_gold(&mut self, from: PlayerId, to: PlayerId, amount: u32) {
        if let Some(payer) = self.players.get_mut(&from) {
            payer.gold = payer.gold.saturating_sub(amount);
        }
        if let Some(payee) = self.players.get_mut(&to) {
            payee.gold = payee.gold.saturating_add(amount);
        }
    }
}
