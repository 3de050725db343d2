use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tradeable goods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoodsType {
    Food,
    Sugar,
    Tobacco,
    Cotton,
    Furs,
    Lumber,
    Ore,
    Silver,
    Horses,
    Rum,
    Cigars,
    Cloth,
    Coats,
    TradeGoods,
    Tools,
    Muskets,
}

impl GoodsType {
    pub const ALL: [GoodsType; 16] = [
        GoodsType::Food,
        GoodsType::Sugar,
        GoodsType::Tobacco,
        GoodsType::Cotton,
        GoodsType::Furs,
        GoodsType::Lumber,
        GoodsType::Ore,
        GoodsType::Silver,
        GoodsType::Horses,
        GoodsType::Rum,
        GoodsType::Cigars,
        GoodsType::Cloth,
        GoodsType::Coats,
        GoodsType::TradeGoods,
        GoodsType::Tools,
        GoodsType::Muskets,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            GoodsType::Food => "food",
            GoodsType::Sugar => "sugar",
            GoodsType::Tobacco => "tobacco",
            GoodsType::Cotton => "cotton",
            GoodsType::Furs => "furs",
            GoodsType::Lumber => "lumber",
            GoodsType::Ore => "ore",
            GoodsType::Silver => "silver",
            GoodsType::Horses => "horses",
            GoodsType::Rum => "rum",
            GoodsType::Cigars => "cigars",
            GoodsType::Cloth => "cloth",
            GoodsType::Coats => "coats",
            GoodsType::TradeGoods => "tradeGoods",
            GoodsType::Tools => "tools",
            GoodsType::Muskets => "muskets",
        }
    }

    /// Gold per unit before any settlement preference is applied.
    pub const fn base_price(self) -> u32 {
        match self {
            GoodsType::Food | GoodsType::Lumber => 1,
            GoodsType::Sugar | GoodsType::Tobacco | GoodsType::Cotton | GoodsType::Ore => 3,
            GoodsType::Furs | GoodsType::Horses => 4,
            GoodsType::Rum | GoodsType::Cigars | GoodsType::Cloth | GoodsType::Coats => 10,
            GoodsType::TradeGoods => 2,
            GoodsType::Tools => 2,
            GoodsType::Muskets => 3,
            GoodsType::Silver => 19,
        }
    }
}

impl fmt::Display for GoodsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownGoodsType(pub String);

impl fmt::Display for UnknownGoodsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown goods type {:?}", self.0)
    }
}

impl std::error::Error for UnknownGoodsType {}

impl FromStr for GoodsType {
    type Err = UnknownGoodsType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoodsType::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGoodsType(s.to_owned()))
    }
}

/// A quantity of one goods type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Goods {
    pub goods_type: GoodsType,
    pub amount: u32,
}

impl Goods {
    /// The most a single cargo slot can hold.
    pub const SLOT_SIZE: u32 = 100;

    pub const fn new(goods_type: GoodsType, amount: u32) -> Self {
        Self { goods_type, amount }
    }

    /// Value at base price, saturating at `u32::MAX`.
    pub const fn base_value(&self) -> u32 {
        self.goods_type.base_price().saturating_mul(self.amount)
    }
}

impl fmt::Display for Goods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.goods_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for goods in GoodsType::ALL {
            assert_eq!(goods.as_str().parse::<GoodsType>().unwrap(), goods);
        }
        assert!("spice".parse::<GoodsType>().is_err());
    }
}
