use serde::{Deserialize, Serialize};

use crate::market::{PriceEffect, StockSnapshot};
use crate::news::News;

#[derive(Clone, Debug)]
pub enum MarketEvent {
    StockAdded(StockSnapshot),
    StockProcessed(StockSnapshot),
    ActiveStockProcessed(StockSnapshot),
    ActiveStockCleared,
    DayStarted,
    DayEnded,
    Closed,
    PriceEffectApplied(PriceEffect),
    PriceEffectCleared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
    Short,
    Cover,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: i64,
    pub price: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

#[derive(Clone, Debug)]
pub enum AccountEvent {
    Changed { balance: f64 },
    StockBought(Fill),
    StockSold(Fill),
    StockShorted(Fill),
    AllPositionsClosed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelReached {
    pub level: usize,
    pub next_balance_target: Option<f64>,
}

/// Everything published on the [`EventBus`](crate::bus::EventBus)
#[derive(Clone, Debug)]
pub enum Event {
    Market(MarketEvent),
    Account(AccountEvent),
    News(News),
    Progression(LevelReached),
}
