//! Scenario loading.
//!
//! A scenario seeds the authoritative game: players, wars, colonies, native
//! settlements and units. The default scenario is embedded in the binary.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use thiserror::Error;

use colonia_protocol::{Goods, GoodsType, ObjectId, PlayerId};

use crate::{Colony, Game, GameError, NativeSettlement, Player, TradeRoute, TradeRules, Unit};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing referenced id: {0}")]
    MissingId(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scenario: {0}")]
    Game(#[from] GameError),
}

pub enum ScenarioSource<'a> {
    Embedded,
    Path(String),
    Bytes(&'a [u8]),
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: PlayerId,
    name: String,
    #[serde(default)]
    gold: u32,
    #[serde(default)]
    native: bool,
}

#[derive(Debug, Deserialize)]
struct RawColony {
    id: ObjectId,
    owner: PlayerId,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawSettlement {
    id: ObjectId,
    owner: PlayerId,
    name: String,
    #[serde(default)]
    stock: BTreeMap<GoodsType, u32>,
    #[serde(default)]
    wanted: Vec<GoodsType>,
    #[serde(default)]
    refuses: Vec<GoodsType>,
    #[serde(default)]
    alarm: BTreeMap<PlayerId, u32>,
}

fn default_capacity() -> u8 {
    2
}

#[derive(Debug, Deserialize)]
struct RawUnit {
    id: ObjectId,
    owner: PlayerId,
    #[serde(default = "default_capacity")]
    capacity: u8,
    #[serde(default)]
    cargo: BTreeMap<GoodsType, u32>,
    #[serde(default)]
    route: Option<TradeRoute>,
}

/// Parsed scenario, not yet checked for dangling references.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    players: Vec<RawPlayer>,
    #[serde(default)]
    wars: Vec<(PlayerId, PlayerId)>,
    #[serde(default)]
    colonies: Vec<RawColony>,
    #[serde(default)]
    settlements: Vec<RawSettlement>,
    #[serde(default)]
    units: Vec<RawUnit>,
}

pub fn load_scenario(source: ScenarioSource<'_>) -> Result<Scenario, ScenarioError> {
    let scenario = match source {
        ScenarioSource::Embedded => {
            serde_yaml::from_str(include_str!("../data/scenario.yaml"))?
        }
        ScenarioSource::Path(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&text)?
        }
        ScenarioSource::Bytes(bytes) => serde_yaml::from_slice(bytes)?,
    };
    Ok(scenario)
}

impl Scenario {
    /// Build the authoritative game, rejecting references to unknown
    /// players or colonies.
    pub fn build(self, rules: TradeRules) -> Result<Game, ScenarioError> {
        let mut game = Game::new(rules);

        let known: BTreeSet<PlayerId> = self.players.iter().map(|p| p.id).collect();
        let check_player = |id: PlayerId, what: &ObjectId| {
            if known.contains(&id) {
                Ok(())
            } else {
                Err(ScenarioError::MissingId(format!("{id} (owner of {what})")))
            }
        };

        for raw in self.players {
            let player = if raw.native {
                Player {
                    gold: raw.gold,
                    ..Player::native(raw.id, raw.name)
                }
            } else {
                Player::new(raw.id, raw.name, raw.gold)
            };
            game.add_player(player)?;
        }

        for (a, b) in self.wars {
            for id in [a, b] {
                if !known.contains(&id) {
                    return Err(ScenarioError::MissingId(id.to_string()));
                }
            }
            game.stances_mut().declare_war(a, b);
        }

        for raw in self.colonies {
            check_player(raw.owner, &raw.id)?;
            game.add_colony(Colony {
                id: raw.id,
                owner: raw.owner,
                name: raw.name,
            })?;
        }

        for raw in self.settlements {
            check_player(raw.owner, &raw.id)?;
            let mut settlement = NativeSettlement::new(raw.id, raw.owner, raw.name)
                .with_wanted(raw.wanted);
            settlement.refuses = raw.refuses;
            for (goods_type, amount) in raw.stock {
                settlement.add_stock(Goods::new(goods_type, amount));
            }
            for (player, alarm) in raw.alarm {
                settlement.set_alarm(player, alarm);
            }
            game.add_settlement(settlement)?;
        }

        for raw in self.units {
            check_player(raw.owner, &raw.id)?;
            if let Some(route) = &raw.route {
                for stop in &route.stops {
                    game.colony(stop.location.as_str()).map_err(|_| {
                        ScenarioError::MissingId(format!("{} (stop of {})", stop.location, raw.id))
                    })?;
                }
            }
            let mut unit = Unit::new(raw.id, raw.owner, raw.capacity);
            for (goods_type, amount) in raw.cargo {
                unit.add_goods(Goods::new(goods_type, amount));
            }
            if let Some(route) = raw.route {
                unit = unit.with_route(route);
            }
            game.add_unit(unit)?;
        }

        Ok(game)
    }
}
