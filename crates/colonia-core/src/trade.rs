//! Native trade sessions.
//!
//! A session holds what persists between rounds of a unit trading with a
//! native settlement: who is trading, how many rounds have been tried, and
//! which of buy/sell/gift are still possible. The economic rules that drive
//! rounds live on [`Game`](crate::Game); the session itself performs no I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

use colonia_protocol::{NativeTradeSnapshot, ObjectId};

/// Tunable trade economics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeRules {
    /// Rounds after which a refused offer closes that kind of trade.
    pub max_haggles: u32,
    /// Settlement asking price as a percentage of base value.
    pub buy_markup_percent: u32,
    /// Bid bonus for the settlement's wanted goods, by rank.
    pub want_bonus_percent: Vec<u32>,
    /// Goods value needed to lower alarm by one point.
    pub gift_alarm_divisor: u32,
    /// Alarm at which a settlement refuses to trade.
    pub hostile_alarm: u32,
}

impl Default for TradeRules {
    fn default() -> Self {
        Self {
            max_haggles: 3,
            buy_markup_percent: 150,
            want_bonus_percent: vec![300, 200, 150],
            gift_alarm_divisor: 10,
            hostile_alarm: 1000,
        }
    }
}

/// Session progress. Closed sessions encode as `count = -1` on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeProgress {
    Active { attempts: u32 },
    Closed,
}

impl TradeProgress {
    pub fn to_count(self) -> i32 {
        match self {
            TradeProgress::Active { attempts } => i32::try_from(attempts).unwrap_or(i32::MAX),
            TradeProgress::Closed => -1,
        }
    }

    /// Any negative count reads as closed.
    pub fn from_count(count: i32) -> Self {
        match u32::try_from(count) {
            Ok(attempts) => TradeProgress::Active { attempts },
            Err(_) => TradeProgress::Closed,
        }
    }
}

/// An in-progress trade between a unit and a native settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeTrade {
    unit: Option<ObjectId>,
    settlement: Option<ObjectId>,
    progress: TradeProgress,
    pub buy: bool,
    pub sell: bool,
    pub gift: bool,
}

impl NativeTrade {
    /// Start a session. No buying or selling with an enemy; nothing to sell
    /// or give without goods aboard.
    pub fn open(unit: ObjectId, settlement: ObjectId, at_war: bool, has_cargo: bool) -> Self {
        Self {
            unit: Some(unit),
            settlement: Some(settlement),
            progress: TradeProgress::Active { attempts: 0 },
            buy: !at_war,
            sell: !at_war && has_cargo,
            gift: has_cargo,
        }
    }

    /// Session key: one active session per (unit, settlement).
    pub fn key_for(unit: &ObjectId, settlement: &ObjectId) -> String {
        format!("{unit}-{settlement}")
    }

    /// `None` only for sessions decoded without both references.
    pub fn key(&self) -> Option<String> {
        Some(Self::key_for(self.unit.as_ref()?, self.settlement.as_ref()?))
    }

    pub fn unit(&self) -> Option<&ObjectId> {
        self.unit.as_ref()
    }

    pub fn settlement(&self) -> Option<&ObjectId> {
        self.settlement.as_ref()
    }

    pub fn count(&self) -> i32 {
        self.progress.to_count()
    }

    pub fn is_done(&self) -> bool {
        self.progress == TradeProgress::Closed || (!self.buy && !self.sell && !self.gift)
    }

    /// Count one negotiation round. No effect once closed.
    pub fn record_attempt(&mut self) {
        if let TradeProgress::Active { attempts } = &mut self.progress {
            *attempts = attempts.saturating_add(1);
        }
    }

    pub fn attempts(&self) -> u32 {
        match self.progress {
            TradeProgress::Active { attempts } => attempts,
            TradeProgress::Closed => 0,
        }
    }

    pub fn close(&mut self) {
        self.progress = TradeProgress::Closed;
    }

    pub fn snapshot(&self) -> NativeTradeSnapshot {
        NativeTradeSnapshot {
            unit: self.unit.clone(),
            settlement: self.settlement.clone(),
            count: self.count(),
            buy: self.buy,
            sell: self.sell,
            gift: self.gift,
        }
    }

    pub fn from_snapshot(snapshot: &NativeTradeSnapshot) -> Self {
        Self {
            unit: snapshot.unit.clone(),
            settlement: snapshot.settlement.clone(),
            progress: TradeProgress::from_count(snapshot.count),
            buy: snapshot.buy,
            sell: snapshot.sell,
            gift: snapshot.gift,
        }
    }
}

impl fmt::Display for NativeTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.unit.as_ref().map_or("-", ObjectId::as_str);
        let settlement = self.settlement.as_ref().map_or("-", ObjectId::as_str);
        write!(
            f,
            "[{unit} {settlement} buy={} sell={} gift={} count={}]",
            self.buy,
            self.sell,
            self.gift,
            self.count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids() -> (ObjectId, ObjectId) {
        (ObjectId::new("U123"), ObjectId::new("S55"))
    }

    #[test]
    fn open_without_cargo_at_peace() {
        let (u, s) = ids();
        let trade = NativeTrade::open(u, s, false, false);
        assert!(trade.buy);
        assert!(!trade.sell);
        assert!(!trade.gift);
        assert_eq!(trade.count(), 0);
        assert!(!trade.is_done());
        assert_eq!(trade.key().as_deref(), Some("U123-S55"));
    }

    #[test]
    fn open_at_war_allows_only_gifts() {
        let (u, s) = ids();
        let laden = NativeTrade::open(u.clone(), s.clone(), true, true);
        assert!(!laden.buy && !laden.sell && laden.gift);
        assert!(!laden.is_done());

        let empty = NativeTrade::open(u, s, true, false);
        assert!(!empty.buy && !empty.sell && !empty.gift);
        assert!(empty.is_done());
    }

    #[test]
    fn key_is_order_dependent() {
        let (u, s) = ids();
        assert_ne!(NativeTrade::key_for(&u, &s), NativeTrade::key_for(&s, &u));
    }

    #[test]
    fn close_is_idempotent() {
        let (u, s) = ids();
        let mut trade = NativeTrade::open(u, s, false, true);
        trade.record_attempt();
        trade.close();
        trade.close();
        assert_eq!(trade.count(), -1);
        assert!(trade.is_done());

        trade.record_attempt();
        assert_eq!(trade.count(), -1);
    }

    #[test]
    fn snapshot_round_trip_keeps_flags_and_count() {
        let (u, s) = ids();
        let mut trade = NativeTrade::open(u, s, false, true);
        trade.record_attempt();
        trade.record_attempt();
        trade.sell = false;

        let el = trade.snapshot().to_element();
        let back =
            NativeTrade::from_snapshot(&NativeTradeSnapshot::from_element(&el).unwrap());
        assert_eq!(back, trade);
        assert_eq!(back.count(), 2);
    }

    #[test]
    fn snapshot_without_references_decodes() {
        let snap = NativeTradeSnapshot {
            unit: None,
            settlement: None,
            count: 1,
            buy: true,
            sell: false,
            gift: false,
        };
        let trade = NativeTrade::from_snapshot(&snap);
        assert_eq!(trade.unit(), None);
        assert_eq!(trade.key(), None);
        assert_eq!(trade.to_string(), "[- - buy=true sell=false gift=false count=1]");
    }

    proptest! {
        #[test]
        fn done_iff_closed_or_no_capability(
            count in -1i32..50,
            buy: bool,
            sell: bool,
            gift: bool,
        ) {
            let trade = NativeTrade::from_snapshot(&NativeTradeSnapshot {
                unit: Some(ObjectId::new("U1")),
                settlement: Some(ObjectId::new("S1")),
                count,
                buy,
                sell,
                gift,
            });
            prop_assert_eq!(trade.is_done(), count == -1 || (!buy && !sell && !gift));
            prop_assert_eq!(trade.count(), count);
        }
    }
}
