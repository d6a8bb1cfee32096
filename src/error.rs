//! Custom error types for the market simulation
//!
//! Every condition here is local and recoverable; nothing is meant to bring
//! the session down.

use thiserror::Error;

use crate::market::MarketState;
use crate::progression::Mechanic;

/// Errors surfaced by the trading command layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradingError {
    #[error("Invalid quantity {qty} for {symbol}")]
    InvalidQuantity { symbol: String, qty: i64 },

    #[error("Unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("Insufficient funds for {symbol}: requested {requested:.2}, available {available:.2}")]
    InsufficientFunds {
        symbol: String,
        requested: f64,
        available: f64,
    },

    #[error("No open position for {symbol}")]
    NoPosition { symbol: String },

    #[error("Position already open for {symbol}")]
    PositionOpen { symbol: String },

    #[error("Mechanic {mechanic:?} is locked")]
    MechanicLocked { mechanic: Mechanic },

    #[error("Market is not open (state: {state:?})")]
    MarketClosed { state: MarketState },
}

/// Market lifecycle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("Invalid market transition: {from:?} -> {to:?}")]
    InvalidTransition { from: MarketState, to: MarketState },

    #[error("Market already initialized")]
    AlreadyInitialized,

    #[error("Symbol already listed: {symbol}")]
    DuplicateSymbol { symbol: String },

    #[error("Not enough companies: requested {requested}, available {available}")]
    NotEnoughCompanies { requested: usize, available: usize },
}

/// Key-value persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid time '{value}' (expected HH:MM)")]
    InvalidTime { value: String },
}

/// Session bootstrap errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
