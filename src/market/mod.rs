pub mod clock;
pub mod company;
pub mod effect;
pub mod engine;
pub mod stock;

pub use clock::TimeTracker;
pub use company::{Company, Industry};
pub use effect::{EffectDirection, EffectStrength, PriceEffect};
pub use engine::{MarketEngine, MarketState};
pub use stock::{PriceQuote, SharedStock, Stock, StockQuote, StockSnapshot};

#[cfg(test)]
mod engine_tests;
#[cfg(test)]
mod stock_tests;
