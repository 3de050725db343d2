use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Public object identifiers are strings (stable across the client/server split).
///
/// Only identifiers cross the wire; both sides resolve them against their own
/// registries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for ObjectId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Anything that can be named by an `ObjectId`.
///
/// Client-side command constructors take `&impl Identified` so that only the
/// identifier of a live object is captured.
pub trait Identified {
    fn object_id(&self) -> &ObjectId;
}

impl Identified for ObjectId {
    fn object_id(&self) -> &ObjectId {
        self
    }
}

/// Player ID is a simple index (max 16 players)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player:{}", self.0)
    }
}
