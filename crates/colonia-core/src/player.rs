//! Players and the war/peace stance between them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use colonia_protocol::PlayerId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub gold: u32,
    /// Native players own settlements and never log in.
    #[serde(default)]
    pub is_native: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, gold: u32) -> Self {
        Self {
            id,
            name: name.into(),
            gold,
            is_native: false,
        }
    }

    pub fn native(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            is_native: true,
            ..Self::new(id, name, 0)
        }
    }
}

/// Tracks which player pairs are at war. Unordered: war is symmetric.
#[derive(Clone, Debug, Default)]
pub struct Stances {
    wars: HashSet<(PlayerId, PlayerId)>,
}

impl Stances {
    pub fn new() -> Self {
        Self::default()
    }

    fn pair(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn at_war(&self, a: PlayerId, b: PlayerId) -> bool {
        self.wars.contains(&Self::pair(a, b))
    }

    /// Returns true if this starts a new war.
    pub fn declare_war(&mut self, a: PlayerId, b: PlayerId) -> bool {
        if a == b {
            return false;
        }
        self.wars.insert(Self::pair(a, b))
    }

    /// Returns true if a war existed.
    pub fn make_peace(&mut self, a: PlayerId, b: PlayerId) -> bool {
        self.wars.remove(&Self::pair(a, b))
    }

    pub fn enemies_of(&self, player: PlayerId) -> Vec<PlayerId> {
        let mut enemies: Vec<PlayerId> = self
            .wars
            .iter()
            .filter_map(|&(a, b)| {
                if a == player {
                    Some(b)
                } else if b == player {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        enemies.sort();
        enemies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn war_is_symmetric_and_ends_with_peace() {
        let mut stances = Stances::new();
        let dutch = PlayerId(0);
        let arawak = PlayerId(4);

        assert!(!stances.at_war(dutch, arawak));
        assert!(stances.declare_war(arawak, dutch));
        assert!(stances.at_war(dutch, arawak));
        assert!(!stances.declare_war(dutch, arawak));
        assert_eq!(stances.enemies_of(dutch), vec![arawak]);

        assert!(stances.make_peace(dutch, arawak));
        assert!(!stances.at_war(arawak, dutch));
        assert!(!stances.make_peace(dutch, arawak));
    }

    #[test]
    fn nobody_fights_themselves() {
        let mut stances = Stances::new();
        assert!(!stances.declare_war(PlayerId(1), PlayerId(1)));
        assert!(!stances.at_war(PlayerId(1), PlayerId(1)));
    }
}
