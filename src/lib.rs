//! Day Trader - stock market day-trading simulation
//!
//! This library provides the market engine, the player's portfolio, the
//! progression ladder and the news desk, plus a session that ties a trading
//! day together and an HTTP surface over the command set.

pub mod api;
pub mod bus;
pub mod config;
pub mod constants;
pub mod data;
pub mod desk;
pub mod error;
pub mod events;
pub mod journal;
pub mod market;
pub mod news;
pub mod notifier;
pub mod player;
pub mod progression;
pub mod random;
pub mod session;

// Re-export commonly used types
pub use bus::EventBus;
pub use config::AppConfig;
pub use desk::TradingDesk;
pub use events::{AccountEvent, Event, Fill, MarketEvent, TradeSide};
pub use market::{MarketEngine, MarketState, Stock};
pub use player::Portfolio;
pub use session::Session;
