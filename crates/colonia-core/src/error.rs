use colonia_protocol::{Goods, NativeTradeAction, ObjectId, PlayerId};
use thiserror::Error;

/// Reasons the authoritative game refuses a request.
///
/// Every variant is raised before any mutation, so a refused request leaves
/// the game untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("no such object: {0}")]
    UnknownObject(ObjectId),
    #[error("{id} is not owned by {player}")]
    NotOwner { id: ObjectId, player: PlayerId },
    #[error("duplicate object id: {0}")]
    DuplicateId(ObjectId),
    #[error("no trade session {0}")]
    NoSession(String),
    #[error("trade session {0} is finished")]
    SessionFinished(String),
    #[error("{action} is not allowed in trade session {key}")]
    ActionNotAllowed {
        key: String,
        action: NativeTradeAction,
    },
    #[error("{settlement} has no {goods} to sell")]
    NoSuchGoods { settlement: ObjectId, goods: Goods },
    #[error("{unit} does not carry {goods}")]
    MissingGoods { unit: ObjectId, goods: Goods },
    #[error("{unit} has no free cargo slot")]
    NoCargoSpace { unit: ObjectId },
    #[error("{player} cannot afford {price} gold")]
    InsufficientGold { player: PlayerId, price: u32 },
    #[error("{action} needs goods")]
    GoodsRequired { action: NativeTradeAction },
    #[error("offered price {0} is negative")]
    InvalidPrice(i32),
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
}

impl GameError {
    /// Identifier did not resolve.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            GameError::UnknownObject(_) | GameError::NoSession(_) | GameError::UnknownPlayer(_)
        )
    }

    /// Identifier resolved, but not for this caller.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, GameError::NotOwner { .. })
    }
}
