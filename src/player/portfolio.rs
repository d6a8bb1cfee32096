//! Player cash and positions.
//!
//! Positions are signed share counts keyed by symbol: positive is long,
//! negative is short. A zero count is never kept. Funds are not re-checked
//! here; callers run `affords` first and own that decision.

use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::account::Account;
use crate::bus::EventBus;
use crate::events::{AccountEvent, Event, Fill, MarketEvent, TradeSide};
use crate::market::{MarketEngine, PriceQuote, StockSnapshot};
use crate::notifier::{Channel, Notifier};

pub struct Portfolio {
    market: Arc<MarketEngine>,
    bus: EventBus,
    notifier: Arc<dyn Notifier>,
    account: Mutex<Account>,
    positions: DashMap<String, i64>,
    settle_delay: Duration,
}

impl Portfolio {
    pub fn new(
        market: Arc<MarketEngine>,
        notifier: Arc<dyn Notifier>,
        initial_balance: f64,
        settle_delay: Duration,
    ) -> Arc<Self> {
        let bus = market.bus().clone();
        let portfolio = Arc::new(Self {
            market,
            bus: bus.clone(),
            notifier,
            account: Mutex::new(Account::new(initial_balance)),
            positions: DashMap::new(),
            settle_delay,
        });

        let weak = Arc::downgrade(&portfolio);
        bus.on(move |event| {
            if let Event::Market(MarketEvent::StockProcessed(snapshot)) = event {
                if let Some(portfolio) = weak.upgrade() {
                    portfolio.handle_stock_processed(snapshot);
                }
            }
        });

        portfolio
    }

    pub fn balance(&self) -> f64 {
        self.account.lock().unwrap().balance()
    }

    pub fn account(&self) -> Account {
        self.account.lock().unwrap().clone()
    }

    pub fn position(&self, symbol: &str) -> Option<i64> {
        self.positions.get(symbol).map(|entry| *entry.value())
    }

    /// Open positions sorted by symbol
    pub fn positions(&self) -> Vec<(String, i64)> {
        let mut positions: Vec<(String, i64)> = self
            .positions
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        positions.sort_by(|a, b| a.0.cmp(&b.0));
        positions
    }

    pub fn owns(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn shorted(&self, symbol: &str) -> bool {
        self.position(symbol).is_some_and(|quantity| quantity < 0)
    }

    pub fn affords<Q: PriceQuote + ?Sized>(&self, stock: &Q, quantity: i64) -> bool {
        stock.current_price() * quantity as f64 <= self.balance()
    }

    pub fn buy<Q: PriceQuote + ?Sized>(&self, stock: &Q, quantity: i64) {
        let fill = Fill {
            symbol: stock.symbol().to_string(),
            side: TradeSide::Buy,
            quantity,
            price: stock.current_price(),
        };

        let held = self.adjust_position(&fill.symbol, quantity);
        self.account.lock().unwrap().subtract(fill.notional());
        info!(
            "📊 [PLAYER] Bought {} {} @ ${:.2} (now {})",
            quantity, fill.symbol, fill.price, held
        );

        self.publish(AccountEvent::StockBought(fill));
        self.publish_account_changed();
    }

    /// No-op without an open position.
    pub fn sell<Q: PriceQuote + ?Sized>(&self, stock: &Q, quantity: i64) -> bool {
        if !self.owns(stock.symbol()) {
            return false;
        }

        let fill = self.sell_position(stock, quantity, TradeSide::Sell);
        self.publish(AccountEvent::StockSold(fill));
        self.publish_account_changed();
        true
    }

    /// Sells the whole long position.
    pub fn sell_all<Q: PriceQuote + ?Sized>(&self, stock: &Q) -> bool {
        match self.position(stock.symbol()) {
            Some(quantity) if quantity > 0 => self.sell(stock, quantity),
            _ => false,
        }
    }

    /// Opens a short: a zero placeholder position sold below zero.
    pub fn short<Q: PriceQuote + ?Sized>(&self, stock: &Q, quantity: i64) {
        self.positions.entry(stock.symbol().to_string()).or_insert(0);

        let fill = self.sell_position(stock, quantity, TradeSide::Short);
        self.publish(AccountEvent::StockShorted(fill));
        self.publish_account_changed();
    }

    /// Covers a short in full. Skips the funds check: a short must always be coverable.
    pub fn buy_all_shorted<Q: PriceQuote + ?Sized>(&self, stock: &Q) -> bool {
        let symbol = stock.symbol();
        let Some(position) = self.position(symbol).filter(|quantity| *quantity < 0) else {
            return false;
        };

        let fill = Fill {
            symbol: symbol.to_string(),
            side: TradeSide::Cover,
            quantity: -position,
            price: stock.current_price(),
        };

        self.positions.remove(symbol);
        self.account.lock().unwrap().subtract(fill.notional());
        info!(
            "📊 [PLAYER] Covered {} {} @ ${:.2}",
            fill.quantity, fill.symbol, fill.price
        );

        self.publish(AccountEvent::StockBought(fill));
        self.publish_account_changed();
        true
    }

    /// Settles every open position one by one, pausing between each, then
    /// fires `AllPositionsClosed`.
    pub fn close_all_positions(self: &Arc<Self>) -> JoinHandle<()> {
        let portfolio = self.clone();
        tokio::spawn(async move {
            portfolio.settle_all().await;
        })
    }

    async fn settle_all(&self) {
        let symbols: Vec<String> = self
            .positions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        info!("📊 [PLAYER] Closing {} open positions", symbols.len());

        for symbol in symbols {
            tokio::time::sleep(self.settle_delay).await;

            let Some(quantity) = self.position(&symbol) else {
                continue;
            };
            let Some(stock) = self.market.get_stock(&symbol) else {
                warn!("⚠️ [PLAYER] {} is not listed, dropping position of {}", symbol, quantity);
                self.positions.remove(&symbol);
                continue;
            };
            let quote = stock.lock().unwrap().quote();

            if quantity > 0 {
                self.notifier
                    .display_one(Channel::Message, &format!("Selling remaining {}", symbol));
                self.sell_all(&quote);
            } else {
                self.notifier.display_one(
                    Channel::Message,
                    &format!("Buying remaining shorted {}", symbol),
                );
                self.buy_all_shorted(&quote);
            }
        }

        tokio::time::sleep(self.settle_delay).await;
        info!("📊 [PLAYER] All positions closed, balance ${:.2}", self.balance());
        self.publish(AccountEvent::AllPositionsClosed);
    }

    /// Market value of all positions; shorts count against it.
    pub fn positions_value(&self) -> f64 {
        self.positions()
            .into_iter()
            .filter_map(|(symbol, quantity)| {
                let stock = self.market.get_stock(&symbol)?;
                let price = stock.lock().unwrap().current_price();
                Some(price * quantity as f64)
            })
            .sum()
    }

    pub fn net_worth(&self) -> f64 {
        self.balance() + self.positions_value()
    }

    fn sell_position<Q: PriceQuote + ?Sized>(&self, stock: &Q, quantity: i64, side: TradeSide) -> Fill {
        let fill = Fill {
            symbol: stock.symbol().to_string(),
            side,
            quantity,
            price: stock.current_price(),
        };

        let held = self.adjust_position(&fill.symbol, -quantity);
        self.account.lock().unwrap().add(fill.notional());
        info!(
            "📊 [PLAYER] {:?} {} {} @ ${:.2} (now {})",
            side, quantity, fill.symbol, fill.price, held
        );
        fill
    }

    /// Applies a signed delta and drops the position if it lands on zero.
    fn adjust_position(&self, symbol: &str, delta: i64) -> i64 {
        let remaining = {
            let mut entry = self.positions.entry(symbol.to_string()).or_insert(0);
            *entry += delta;
            *entry
        };
        if remaining == 0 {
            self.positions.remove(symbol);
        }
        remaining
    }

    fn handle_stock_processed(&self, snapshot: &StockSnapshot) {
        if self.owns(&snapshot.symbol) {
            self.publish_account_changed();
        }
    }

    fn publish_account_changed(&self) {
        let balance = self.balance();
        self.publish(AccountEvent::Changed { balance });
    }

    fn publish(&self, event: AccountEvent) {
        self.bus.publish(Event::Account(event));
    }
}
