//! Native trade wire types.
//!
//! The authoritative session lives in `colonia-core`; clients only ever see
//! the [`NativeTradeSnapshot`] read copy carried inside
//! [`NativeTradeMessage`] replies.

use std::fmt;
use std::str::FromStr;

use crate::{Element, Goods, GoodsType, Identified, ObjectId, WireError, WireMessage};

/// The kind of native trade request. `Update` is server-sent, the rest are
/// client-sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeTradeAction {
    Update,
    Open,
    Close,
    Buy,
    Sell,
    Gift,
    PriceBuy,
    PriceSell,
}

impl NativeTradeAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            NativeTradeAction::Update => "update",
            NativeTradeAction::Open => "open",
            NativeTradeAction::Close => "close",
            NativeTradeAction::Buy => "buy",
            NativeTradeAction::Sell => "sell",
            NativeTradeAction::Gift => "gift",
            NativeTradeAction::PriceBuy => "priceBuy",
            NativeTradeAction::PriceSell => "priceSell",
        }
    }

    /// True for the rounds that count as a negotiation attempt.
    pub const fn is_negotiation(self) -> bool {
        matches!(
            self,
            NativeTradeAction::Buy
                | NativeTradeAction::Sell
                | NativeTradeAction::Gift
                | NativeTradeAction::PriceBuy
                | NativeTradeAction::PriceSell
        )
    }
}

impl fmt::Display for NativeTradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NativeTradeAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update" => Ok(NativeTradeAction::Update),
            "open" => Ok(NativeTradeAction::Open),
            "close" => Ok(NativeTradeAction::Close),
            "buy" => Ok(NativeTradeAction::Buy),
            "sell" => Ok(NativeTradeAction::Sell),
            "gift" => Ok(NativeTradeAction::Gift),
            "priceBuy" => Ok(NativeTradeAction::PriceBuy),
            "priceSell" => Ok(NativeTradeAction::PriceSell),
            _ => Err(()),
        }
    }
}

/// Outcome of one negotiation round.
///
/// On the wire this is a single integer: non-negative values at or above one
/// are prices, the rest are the fixed refusal codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeResult {
    /// Agreed (or quoted) price in gold. Gifts report the value given.
    Price(u32),
    /// The settlement has no use for these goods.
    NoTradeGoods,
    /// Trade refused outright.
    NoTrade,
    /// The offer was not good enough.
    Haggle,
    /// The settlement is too hostile to trade.
    Hostile,
}

impl TradeResult {
    pub const NO_TRADE_GOODS: i32 = 0;
    pub const NO_TRADE: i32 = -1;
    pub const NO_TRADE_HAGGLE: i32 = -2;
    pub const NO_TRADE_HOSTILE: i32 = -3;

    pub fn to_code(self) -> i32 {
        match self {
            TradeResult::Price(price) => i32::try_from(price).unwrap_or(i32::MAX),
            TradeResult::NoTradeGoods => Self::NO_TRADE_GOODS,
            TradeResult::NoTrade => Self::NO_TRADE,
            TradeResult::Haggle => Self::NO_TRADE_HAGGLE,
            TradeResult::Hostile => Self::NO_TRADE_HOSTILE,
        }
    }

    /// Inverse of [`to_code`](Self::to_code). Zero is always
    /// `NoTradeGoods`, so a zero-gold result is not representable.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            Self::NO_TRADE_GOODS => Some(TradeResult::NoTradeGoods),
            Self::NO_TRADE => Some(TradeResult::NoTrade),
            Self::NO_TRADE_HAGGLE => Some(TradeResult::Haggle),
            Self::NO_TRADE_HOSTILE => Some(TradeResult::Hostile),
            n if n > 0 => Some(TradeResult::Price(n as u32)),
            _ => None,
        }
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, TradeResult::Price(_))
    }
}

/// Read copy of a trade session as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeTradeSnapshot {
    pub unit: Option<ObjectId>,
    pub settlement: Option<ObjectId>,
    /// Attempt counter; `-1` means the session has been closed.
    pub count: i32,
    pub buy: bool,
    pub sell: bool,
    pub gift: bool,
}

impl NativeTradeSnapshot {
    pub const TAG: &'static str = "nativeTrade";

    const BUY_TAG: &'static str = "buy";
    const COUNT_TAG: &'static str = "count";
    const GIFT_TAG: &'static str = "gift";
    const SELL_TAG: &'static str = "sell";
    const SETTLEMENT_TAG: &'static str = "settlement";
    const UNIT_TAG: &'static str = "unit";

    pub fn is_done(&self) -> bool {
        self.count < 0 || (!self.buy && !self.sell && !self.gift)
    }

    pub fn to_element(&self) -> Element {
        Element::new(Self::TAG)
            .with(Self::BUY_TAG, self.buy)
            .with(Self::COUNT_TAG, self.count)
            .with(Self::GIFT_TAG, self.gift)
            .with(Self::SELL_TAG, self.sell)
            .with_opt(Self::SETTLEMENT_TAG, self.settlement.as_ref())
            .with_opt(Self::UNIT_TAG, self.unit.as_ref())
    }

    /// Absent flags read as `false`, an absent count as `-1` and absent
    /// references as `None`.
    pub fn from_element(element: &Element) -> Result<Self, WireError> {
        element.expect_tag(Self::TAG)?;
        Ok(Self {
            buy: element.bool_or(Self::BUY_TAG, false)?,
            count: element.int_or(Self::COUNT_TAG, -1)?,
            gift: element.bool_or(Self::GIFT_TAG, false)?,
            sell: element.bool_or(Self::SELL_TAG, false)?,
            settlement: element.optional_id(Self::SETTLEMENT_TAG),
            unit: element.optional_id(Self::UNIT_TAG),
        })
    }
}

/// A native trade request, or the server's update reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeTradeMessage {
    pub action: NativeTradeAction,
    pub unit: ObjectId,
    pub settlement: ObjectId,
    pub goods: Option<Goods>,
    /// Offered price on requests; result code on updates.
    pub price: Option<i32>,
    /// Session state, present on `Update` replies.
    pub session: Option<NativeTradeSnapshot>,
}

impl NativeTradeMessage {
    /// Client-side constructor for a request about a live unit and settlement.
    pub fn request(
        action: NativeTradeAction,
        unit: &impl Identified,
        settlement: &impl Identified,
    ) -> Self {
        Self {
            action,
            unit: unit.object_id().clone(),
            settlement: settlement.object_id().clone(),
            goods: None,
            price: None,
            session: None,
        }
    }

    pub fn with_goods(mut self, goods: Goods) -> Self {
        self.goods = Some(goods);
        self
    }

    pub fn with_price(mut self, price: i32) -> Self {
        self.price = Some(price);
        self
    }

    /// Server-side update reply.
    pub fn update(
        session: NativeTradeSnapshot,
        unit: ObjectId,
        settlement: ObjectId,
        result: Option<TradeResult>,
    ) -> Self {
        Self {
            action: NativeTradeAction::Update,
            unit,
            settlement,
            goods: None,
            price: result.map(TradeResult::to_code),
            session: Some(session),
        }
    }

    pub fn result(&self) -> Option<TradeResult> {
        self.price.and_then(TradeResult::from_code)
    }
}

impl WireMessage for NativeTradeMessage {
    const TAG: &'static str = "nativeTradeMessage";

    fn to_element(&self) -> Element {
        let mut el = Element::new(Self::TAG)
            .with("action", self.action)
            .with("unit", &self.unit)
            .with("settlement", &self.settlement)
            .with_opt("price", self.price);
        if let Some(goods) = self.goods {
            el = el.with("goods", goods.goods_type).with("amount", goods.amount);
        }
        if let Some(session) = &self.session {
            el = el.with_child(session.to_element());
        }
        el
    }

    fn from_element(element: &Element) -> Result<Self, WireError> {
        element.expect_tag(Self::TAG)?;
        let goods = match element.optional_parsed::<GoodsType>("goods")? {
            Some(goods_type) => Some(Goods::new(
                goods_type,
                element.parsed_or("amount", Goods::SLOT_SIZE)?,
            )),
            None => None,
        };
        let session = element
            .child(NativeTradeSnapshot::TAG)
            .map(NativeTradeSnapshot::from_element)
            .transpose()?;
        Ok(Self {
            action: element.required_parsed("action")?,
            unit: element.required_id("unit")?,
            settlement: element.required_id("settlement")?,
            goods,
            price: element.optional_parsed("price")?,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> NativeTradeSnapshot {
        NativeTradeSnapshot {
            unit: Some(ObjectId::new("U123")),
            settlement: Some(ObjectId::new("S55")),
            count: 2,
            buy: true,
            sell: false,
            gift: true,
        }
    }

    #[test]
    fn snapshot_attributes_use_fixed_names() {
        let el = snapshot().to_element();
        assert_eq!(el.tag, "nativeTrade");
        assert_eq!(el.get("buy"), Some("true"));
        assert_eq!(el.get("count"), Some("2"));
        assert_eq!(el.get("gift"), Some("true"));
        assert_eq!(el.get("sell"), Some("false"));
        assert_eq!(el.get("settlement"), Some("S55"));
        assert_eq!(el.get("unit"), Some("U123"));
        assert_eq!(NativeTradeSnapshot::from_element(&el).unwrap(), snapshot());
    }

    #[test]
    fn bare_snapshot_reads_defaults() {
        let decoded = NativeTradeSnapshot::from_element(&Element::new("nativeTrade")).unwrap();
        assert_eq!(decoded.count, -1);
        assert!(!decoded.buy && !decoded.sell && !decoded.gift);
        assert_eq!(decoded.unit, None);
        assert_eq!(decoded.settlement, None);
        assert!(decoded.is_done());
    }

    #[test]
    fn result_codes_match_fixed_values() {
        assert_eq!(TradeResult::NoTradeGoods.to_code(), 0);
        assert_eq!(TradeResult::NoTrade.to_code(), -1);
        assert_eq!(TradeResult::Haggle.to_code(), -2);
        assert_eq!(TradeResult::Hostile.to_code(), -3);
        assert_eq!(TradeResult::from_code(125), Some(TradeResult::Price(125)));
        assert_eq!(TradeResult::from_code(-9), None);
    }

    #[test]
    fn request_requires_action_and_parties() {
        let el = Element::new(NativeTradeMessage::TAG)
            .with("unit", "U1")
            .with("settlement", "S1");
        assert!(matches!(
            NativeTradeMessage::from_element(&el),
            Err(WireError::MissingAttribute { .. })
        ));

        let el = el.with("action", "haggle");
        assert!(matches!(
            NativeTradeMessage::from_element(&el),
            Err(WireError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn update_reply_carries_session_child() {
        let msg = NativeTradeMessage::update(
            snapshot(),
            ObjectId::new("U123"),
            ObjectId::new("S55"),
            Some(TradeResult::Haggle),
        );
        let decoded = NativeTradeMessage::from_element(&msg.to_element()).unwrap();
        assert_eq!(decoded.action, NativeTradeAction::Update);
        assert_eq!(decoded.result(), Some(TradeResult::Haggle));
        assert_eq!(decoded.session, Some(snapshot()));
    }

    #[test]
    fn goods_amount_defaults_to_a_full_slot() {
        let unit = ObjectId::new("U1");
        let settlement = ObjectId::new("S1");
        let mut el = NativeTradeMessage::request(NativeTradeAction::PriceSell, &unit, &settlement)
            .to_element();
        el.set("goods", "furs");
        let decoded = NativeTradeMessage::from_element(&el).unwrap();
        assert_eq!(decoded.goods, Some(Goods::new(GoodsType::Furs, 100)));
    }
}
