use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use colonia_protocol::{Goods, GoodsType, Identified, ObjectId, PlayerId};

use crate::TradeRules;

/// A European colony. Only ownership matters here: trade-route stops are
/// valid while their colony is still held by the unit's owner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Colony {
    pub id: ObjectId,
    pub owner: PlayerId,
    pub name: String,
}

impl Identified for Colony {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NativeSettlement {
    pub id: ObjectId,
    pub owner: PlayerId,
    pub name: String,
    stock: BTreeMap<GoodsType, u32>,
    /// Most wanted first.
    pub wanted: Vec<GoodsType>,
    /// Goods the settlement will not buy at any price.
    pub refuses: Vec<GoodsType>,
    alarm: BTreeMap<PlayerId, u32>,
}

impl Identified for NativeSettlement {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }
}

impl NativeSettlement {
    pub fn new(id: ObjectId, owner: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            owner,
            name: name.into(),
            stock: BTreeMap::new(),
            wanted: Vec::new(),
            refuses: Vec::new(),
            alarm: BTreeMap::new(),
        }
    }

    pub fn with_stock(mut self, goods: Goods) -> Self {
        self.add_stock(goods);
        self
    }

    pub fn with_wanted(mut self, wanted: Vec<GoodsType>) -> Self {
        self.wanted = wanted;
        self
    }

    pub fn stock_of(&self, goods_type: GoodsType) -> u32 {
        self.stock.get(&goods_type).copied().unwrap_or(0)
    }

    pub fn has_stock(&self, goods: Goods) -> bool {
        goods.amount > 0 && self.stock_of(goods.goods_type) >= goods.amount
    }

    pub fn add_stock(&mut self, goods: Goods) {
        if goods.amount > 0 {
            let held = self.stock.entry(goods.goods_type).or_insert(0);
            *held = held.saturating_add(goods.amount);
        }
    }

    pub fn take_stock(&mut self, goods: Goods) -> bool {
        if !self.has_stock(goods) {
            return false;
        }
        let left = self.stock_of(goods.goods_type) - goods.amount;
        if left == 0 {
            self.stock.remove(&goods.goods_type);
        } else {
            self.stock.insert(goods.goods_type, left);
        }
        true
    }

    pub fn alarm(&self, player: PlayerId) -> u32 {
        self.alarm.get(&player).copied().unwrap_or(0)
    }

    pub fn set_alarm(&mut self, player: PlayerId, alarm: u32) {
        self.alarm.insert(player, alarm);
    }

    pub fn soothe(&mut self, player: PlayerId, amount: u32) {
        let alarm = self.alarm(player).saturating_sub(amount);
        self.alarm.insert(player, alarm);
    }

    pub fn is_hostile_to(&self, player: PlayerId, rules: &TradeRules) -> bool {
        self.alarm(player) >= rules.hostile_alarm
    }

    /// What the settlement asks for goods it sells.
    pub fn ask_price(&self, goods: Goods, rules: &TradeRules) -> u32 {
        scale(goods.base_value(), rules.buy_markup_percent)
    }

    /// What the settlement offers for goods it buys, or `None` if it will
    /// not take them at all.
    pub fn bid_price(&self, goods: Goods, rules: &TradeRules) -> Option<u32> {
        if self.refuses.contains(&goods.goods_type) {
            return None;
        }
        let bonus = self
            .wanted
            .iter()
            .position(|&w| w == goods.goods_type)
            .and_then(|rank| rules.want_bonus_percent.get(rank).copied())
            .unwrap_or(100);
        Some(scale(goods.base_value(), bonus))
    }
}

/// `value * percent / 100`, saturating at `u32::MAX` and never below 1.
fn scale(value: u32, percent: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(percent) / 100;
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn village() -> NativeSettlement {
        let mut s = NativeSettlement::new(ObjectId::new("S55"), PlayerId(5), "Taino")
            .with_stock(Goods::new(GoodsType::Furs, 120))
            .with_wanted(vec![GoodsType::Cloth, GoodsType::Rum, GoodsType::Tools]);
        s.refuses.push(GoodsType::Lumber);
        s
    }

    #[test]
    fn bids_follow_wanted_rank() {
        let rules = TradeRules::default();
        let s = village();
        assert_eq!(s.bid_price(Goods::new(GoodsType::Cloth, 100), &rules), Some(3000));
        assert_eq!(s.bid_price(Goods::new(GoodsType::Rum, 100), &rules), Some(2000));
        assert_eq!(s.bid_price(Goods::new(GoodsType::Tools, 100), &rules), Some(300));
        assert_eq!(s.bid_price(Goods::new(GoodsType::Ore, 100), &rules), Some(300));
        assert_eq!(s.bid_price(Goods::new(GoodsType::Lumber, 100), &rules), None);
    }

    #[test]
    fn ask_includes_markup() {
        let rules = TradeRules::default();
        assert_eq!(village().ask_price(Goods::new(GoodsType::Furs, 100), &rules), 600);
        assert_eq!(village().ask_price(Goods::new(GoodsType::Food, 0), &rules), 1);
    }

    #[test]
    fn huge_lots_and_tunables_saturate() {
        let rules = TradeRules {
            buy_markup_percent: u32::MAX,
            want_bonus_percent: vec![u32::MAX],
            ..TradeRules::default()
        };
        let lot = Goods::new(GoodsType::Cloth, u32::MAX);
        assert_eq!(lot.base_value(), u32::MAX);
        assert_eq!(village().ask_price(lot, &rules), u32::MAX);
        assert_eq!(village().bid_price(lot, &rules), Some(u32::MAX));

        let mut s = village();
        s.add_stock(Goods::new(GoodsType::Furs, u32::MAX));
        assert_eq!(s.stock_of(GoodsType::Furs), u32::MAX);
    }

    #[test]
    fn stock_and_alarm_bookkeeping() {
        let mut s = village();
        assert!(s.take_stock(Goods::new(GoodsType::Furs, 100)));
        assert!(!s.take_stock(Goods::new(GoodsType::Furs, 100)));
        assert_eq!(s.stock_of(GoodsType::Furs), 20);

        s.set_alarm(PlayerId(0), 50);
        s.soothe(PlayerId(0), 80);
        assert_eq!(s.alarm(PlayerId(0)), 0);
    }
}
