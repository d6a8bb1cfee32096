//! Trading command layer.
//!
//! Validates a command against the market state, the registry, the player's
//! funds and positions and the progression ladder, then hands it to the
//! [`Portfolio`]. The portfolio itself never re-checks anything.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{MarketError, TradingError};
use crate::events::{Fill, TradeSide};
use crate::market::{MarketEngine, MarketState, PriceQuote, StockQuote};
use crate::player::Portfolio;
use crate::progression::{Mechanic, ProgressionGate};

#[derive(Clone)]
pub struct TradingDesk {
    market: Arc<MarketEngine>,
    portfolio: Arc<Portfolio>,
    gate: Arc<ProgressionGate>,
}

impl TradingDesk {
    pub fn new(market: Arc<MarketEngine>, portfolio: Arc<Portfolio>, gate: Arc<ProgressionGate>) -> Self {
        Self {
            market,
            portfolio,
            gate,
        }
    }

    pub fn begin_day(&self) -> Result<(), MarketError> {
        self.market.begin_day()
    }

    pub fn set_active(&self, symbol: &str) -> Result<(), TradingError> {
        if self.market.set_active_symbol(symbol) {
            Ok(())
        } else {
            Err(TradingError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
        }
    }

    pub fn clear_active(&self) {
        self.market.clear_active_symbol();
    }

    pub fn affords(&self, symbol: &str, quantity: i64) -> Result<bool, TradingError> {
        check_quantity(symbol, quantity)?;
        let quote = self.lookup(symbol)?;
        Ok(self.portfolio.affords(&quote, quantity))
    }

    /// Opens or adds to a long position. Rejected while the symbol is shorted.
    pub fn buy(&self, symbol: &str, quantity: i64) -> Result<Fill, TradingError> {
        check_quantity(symbol, quantity)?;
        let quote = self.open_quote(symbol)?;

        if self.portfolio.shorted(symbol) {
            return Err(self.reject(TradingError::PositionOpen {
                symbol: symbol.to_string(),
            }));
        }
        if !self.portfolio.affords(&quote, quantity) {
            return Err(self.reject(TradingError::InsufficientFunds {
                symbol: symbol.to_string(),
                requested: quote.current_price() * quantity as f64,
                available: self.portfolio.balance(),
            }));
        }

        self.portfolio.buy(&quote, quantity);
        Ok(fill(&quote, TradeSide::Buy, quantity))
    }

    pub fn sell(&self, symbol: &str, quantity: i64) -> Result<Fill, TradingError> {
        check_quantity(symbol, quantity)?;
        let quote = self.open_quote(symbol)?;
        let held = self.long_position(symbol)?;

        if quantity > held {
            return Err(self.reject(TradingError::InvalidQuantity {
                symbol: symbol.to_string(),
                qty: quantity,
            }));
        }

        self.portfolio.sell(&quote, quantity);
        Ok(fill(&quote, TradeSide::Sell, quantity))
    }

    pub fn sell_all(&self, symbol: &str) -> Result<Fill, TradingError> {
        let quote = self.open_quote(symbol)?;
        let held = self.long_position(symbol)?;

        self.portfolio.sell_all(&quote);
        Ok(fill(&quote, TradeSide::Sell, held))
    }

    /// Shorting needs the Short mechanic and no open position on the symbol.
    pub fn short(&self, symbol: &str, quantity: i64) -> Result<Fill, TradingError> {
        if !self.gate.is_mechanic_unlocked(Mechanic::Short) {
            return Err(self.reject(TradingError::MechanicLocked {
                mechanic: Mechanic::Short,
            }));
        }
        check_quantity(symbol, quantity)?;
        let quote = self.open_quote(symbol)?;

        if self.portfolio.owns(symbol) {
            return Err(self.reject(TradingError::PositionOpen {
                symbol: symbol.to_string(),
            }));
        }

        self.portfolio.short(&quote, quantity);
        Ok(fill(&quote, TradeSide::Short, quantity))
    }

    /// Buys back the whole short position.
    pub fn cover(&self, symbol: &str) -> Result<Fill, TradingError> {
        let quote = self.open_quote(symbol)?;
        let borrowed = match self.portfolio.position(symbol) {
            Some(quantity) if quantity < 0 => -quantity,
            _ => {
                return Err(self.reject(TradingError::NoPosition {
                    symbol: symbol.to_string(),
                }))
            }
        };

        self.portfolio.buy_all_shorted(&quote);
        Ok(fill(&quote, TradeSide::Cover, borrowed))
    }

    pub fn market(&self) -> &Arc<MarketEngine> {
        &self.market
    }

    pub fn portfolio(&self) -> &Arc<Portfolio> {
        &self.portfolio
    }

    pub fn gate(&self) -> &Arc<ProgressionGate> {
        &self.gate
    }

    fn lookup(&self, symbol: &str) -> Result<StockQuote, TradingError> {
        let stock = self.market.get_stock(symbol).ok_or_else(|| TradingError::UnknownSymbol {
            symbol: symbol.to_string(),
        })?;
        let quote = stock.lock().unwrap().quote();
        Ok(quote)
    }

    /// Quote for a trade, only while the day is running
    fn open_quote(&self, symbol: &str) -> Result<StockQuote, TradingError> {
        let state = self.market.state();
        if state != MarketState::DayStarted {
            return Err(self.reject(TradingError::MarketClosed { state }));
        }
        self.lookup(symbol).map_err(|e| self.reject(e))
    }

    fn long_position(&self, symbol: &str) -> Result<i64, TradingError> {
        match self.portfolio.position(symbol) {
            Some(quantity) if quantity > 0 => Ok(quantity),
            _ => Err(self.reject(TradingError::NoPosition {
                symbol: symbol.to_string(),
            })),
        }
    }

    fn reject(&self, error: TradingError) -> TradingError {
        debug!("[DESK] Rejected: {}", error);
        error
    }
}

fn check_quantity(symbol: &str, quantity: i64) -> Result<(), TradingError> {
    if quantity <= 0 {
        return Err(TradingError::InvalidQuantity {
            symbol: symbol.to_string(),
            qty: quantity,
        });
    }
    Ok(())
}

fn fill(quote: &StockQuote, side: TradeSide, quantity: i64) -> Fill {
    let fill = Fill {
        symbol: quote.symbol.clone(),
        side,
        quantity,
        price: quote.price,
    };
    info!(
        "🧾 [DESK] {:?} {} {} @ ${:.2}",
        fill.side, fill.quantity, fill.symbol, fill.price
    );
    fill
}
