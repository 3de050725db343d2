mod entities;
mod error;
mod game;
mod player;
pub mod scenario;
mod settlement;
mod trade;
mod unit;

pub use crate::entities::*;
pub use crate::error::*;
pub use crate::game::*;
pub use crate::player::*;
pub use crate::scenario::{load_scenario, Scenario, ScenarioError, ScenarioSource};
pub use crate::settlement::*;
pub use crate::trade::*;
pub use crate::unit::*;
