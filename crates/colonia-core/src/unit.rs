use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use colonia_protocol::{Goods, GoodsType, Identified, ObjectId, PlayerId};

/// One stop on a trade route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    /// Colony the unit should visit.
    pub location: ObjectId,
    /// Goods to load there.
    #[serde(default)]
    pub cargo: Vec<GoodsType>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRoute {
    pub name: String,
    pub stops: Vec<Stop>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub id: ObjectId,
    pub owner: PlayerId,
    /// Cargo slots; each slot holds up to `Goods::SLOT_SIZE` of one type.
    pub capacity: u8,
    cargo: BTreeMap<GoodsType, u32>,
    pub route: Option<TradeRoute>,
    pub current_stop: Option<usize>,
}

impl Identified for Unit {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }
}

impl Unit {
    pub fn new(id: ObjectId, owner: PlayerId, capacity: u8) -> Self {
        Self {
            id,
            owner,
            capacity,
            cargo: BTreeMap::new(),
            route: None,
            current_stop: None,
        }
    }

    pub fn with_route(mut self, route: TradeRoute) -> Self {
        self.route = Some(route);
        self.current_stop = None;
        self
    }

    pub fn has_goods_cargo(&self) -> bool {
        self.cargo.values().any(|&amount| amount > 0)
    }

    pub fn goods_count(&self, goods_type: GoodsType) -> u32 {
        self.cargo.get(&goods_type).copied().unwrap_or(0)
    }

    pub fn carries(&self, goods: Goods) -> bool {
        goods.amount > 0 && self.goods_count(goods.goods_type) >= goods.amount
    }

    fn slots_for(amount: u32) -> u32 {
        amount.div_ceil(Goods::SLOT_SIZE)
    }

    pub fn slots_used(&self) -> u32 {
        self.cargo.values().map(|&a| Self::slots_for(a)).sum()
    }

    /// Whether `goods` fits without exceeding capacity.
    pub fn has_room_for(&self, goods: Goods) -> bool {
        let current = self.goods_count(goods.goods_type);
        let extra =
            Self::slots_for(current.saturating_add(goods.amount)) - Self::slots_for(current);
        self.slots_used() + extra <= u32::from(self.capacity)
    }

    /// Callers check `has_room_for` first; this never refuses.
    pub fn add_goods(&mut self, goods: Goods) {
        if goods.amount == 0 {
            return;
        }
        let held = self.cargo.entry(goods.goods_type).or_insert(0);
        *held = held.saturating_add(goods.amount);
    }

    /// Returns false (and changes nothing) if the unit carries too little.
    pub fn remove_goods(&mut self, goods: Goods) -> bool {
        if !self.carries(goods) {
            return false;
        }
        let left = self.goods_count(goods.goods_type) - goods.amount;
        if left == 0 {
            self.cargo.remove(&goods.goods_type);
        } else {
            self.cargo.insert(goods.goods_type, left);
        }
        true
    }

    pub fn stop(&self) -> Option<&Stop> {
        let route = self.route.as_ref()?;
        route.stops.get(self.current_stop?)
    }

    /// Advance to the next stop that passes `is_valid`, wrapping around the
    /// route. Clears the current stop when no stop is valid.
    pub fn next_stop(&mut self, is_valid: impl Fn(&Stop) -> bool) -> Option<usize> {
        let Some(route) = &self.route else {
            self.current_stop = None;
            return None;
        };
        let n = route.stops.len();
        let start = self.current_stop.map_or(0, |c| c + 1);
        let next = (0..n)
            .map(|i| (start + i) % n)
            .find(|&idx| is_valid(&route.stops[idx]));
        self.current_stop = next;
        next
    }
}
