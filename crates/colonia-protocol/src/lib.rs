//! Colonia wire protocol.
//!
//! Identifiers, attribute-bag elements, codecs and the command message family
//! shared by client and server.

mod element;
mod goods;
mod ids;
mod message;
mod trade;
pub mod wire;

pub use crate::element::*;
pub use crate::goods::*;
pub use crate::ids::*;
pub use crate::message::*;
pub use crate::trade::*;
pub use crate::wire::WireError;
