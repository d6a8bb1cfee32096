//! Market engine: owns the listed stocks, the trading-day state machine and
//! the per-stock tick tasks.
//!
//! Lifecycle: `Idle -> DayStarted -> DayEnded -> Closed`, with `next_day`
//! taking a closed market back to `Idle`. Each listed stock gets its own task
//! while the day runs; the task sleeps a random interval, ticks its stock and
//! repeats. Ending the day flips a gate under a write lock, so once
//! `end_day` returns no further tick can happen.

use chrono::NaiveTime;
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::TimeTracker;
use super::company::{self, Industry};
use super::effect::PriceEffect;
use super::stock::{SharedStock, Stock, StockSnapshot};
use crate::bus::EventBus;
use crate::config::{ClockConfig, MarketConfig};
use crate::error::MarketError;
use crate::events::{AccountEvent, Event, MarketEvent};
use crate::notifier::{Channel, Notifier};
use crate::random::RandomSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MarketState {
    Idle,
    DayStarted,
    DayEnded,
    Closed,
}

struct ListedStock {
    symbol: String,
    industry: Industry,
    stock: SharedStock,
}

/// Pending effect expiry. The generation guards against a timer that fired
/// just as it was being replaced.
#[derive(Default)]
struct EffectExpiry {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

pub struct MarketEngine {
    config: MarketConfig,
    rng: Arc<dyn RandomSource>,
    bus: EventBus,
    notifier: Arc<dyn Notifier>,
    clock: TimeTracker,

    stocks: RwLock<Vec<ListedStock>>,
    state: Mutex<MarketState>,
    active_symbol: Mutex<Option<String>>,

    /// Read-held by every tick, flipped off under the write lock at day end
    ticking: RwLock<bool>,
    tick_tasks: Mutex<Vec<JoinHandle<()>>>,
    effect_expiry: Mutex<EffectExpiry>,
}

impl MarketEngine {
    pub fn new(
        config: MarketConfig,
        clock: &ClockConfig,
        rng: Arc<dyn RandomSource>,
        bus: EventBus,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let engine = Arc::new(Self {
            config,
            rng,
            bus,
            notifier,
            clock: TimeTracker::new(clock),
            stocks: RwLock::new(Vec::new()),
            state: Mutex::new(MarketState::Idle),
            active_symbol: Mutex::new(None),
            ticking: RwLock::new(false),
            tick_tasks: Mutex::new(Vec::new()),
            effect_expiry: Mutex::new(EffectExpiry::default()),
        });

        let weak = Arc::downgrade(&engine);
        engine.bus.on(move |event| {
            if let Event::Account(AccountEvent::AllPositionsClosed) = event {
                if let Some(market) = weak.upgrade() {
                    market.handle_all_positions_closed();
                }
            }
        });

        engine
    }

    /// Lists `stock_count` companies from a shuffled roster.
    pub fn initialize(&self, stock_count: usize, activate_first: bool) -> Result<(), MarketError> {
        if !self.stocks.read().unwrap().is_empty() {
            return Err(MarketError::AlreadyInitialized);
        }

        let roster = company::shuffled_roster(&*self.rng);
        if stock_count > roster.len() {
            return Err(MarketError::NotEnoughCompanies {
                requested: stock_count,
                available: roster.len(),
            });
        }

        *self.state.lock().unwrap() = MarketState::Idle;
        for company in roster.into_iter().take(stock_count) {
            self.add_stock(company.symbol, company.name, company.industry)?;
        }

        info!("📈 [MARKET] Initialized with {} stocks", stock_count);

        if activate_first {
            if let Some(symbol) = self.symbols().into_iter().next() {
                self.set_active_symbol(&symbol);
            }
        }
        Ok(())
    }

    /// Lists a single company. Stocks added mid-day start ticking on the next day.
    pub fn add_stock(
        &self,
        symbol: &str,
        company_name: &str,
        industry: Industry,
    ) -> Result<SharedStock, MarketError> {
        let mut stocks = self.stocks.write().unwrap();
        if stocks.iter().any(|listed| listed.symbol == symbol) {
            return Err(MarketError::DuplicateSymbol {
                symbol: symbol.to_string(),
            });
        }

        let stock = Stock::new(symbol, company_name, industry, self.rng.clone());
        let snapshot = stock.snapshot();
        let shared = stock.shared();
        stocks.push(ListedStock {
            symbol: symbol.to_string(),
            industry,
            stock: shared.clone(),
        });
        drop(stocks);

        debug!(
            "[MARKET] Listed {} ({}) at ${:.2}, ceiling ${:.2}",
            snapshot.symbol, snapshot.industry, snapshot.price, snapshot.ceiling
        );
        self.bus.publish(Event::Market(MarketEvent::StockAdded(snapshot)));
        Ok(shared)
    }

    /// Opens the market. `DayStarted` goes out before the clock starts, so
    /// even a zero-length day reports its start before its end.
    pub fn begin_day(self: &Arc<Self>) -> Result<(), MarketError> {
        self.transition(MarketState::Idle, MarketState::DayStarted)?;
        *self.ticking.write().unwrap() = true;

        let stocks = self.stocks();
        let mut tasks = self.tick_tasks.lock().unwrap();
        for stock in stocks {
            tasks.push(self.spawn_stock_processing(stock));
        }
        let task_count = tasks.len();
        drop(tasks);

        info!("🔔 [MARKET] Day started ({} tick tasks)", task_count);
        self.notifier.display(
            Channel::Message,
            &[
                "The market is open".to_string(),
                format!("It closes at {}", self.clock.close_time().format("%I:%M%p")),
            ],
        );
        self.bus.publish(Event::Market(MarketEvent::DayStarted));

        // an observer may already have ended the day
        if self.state() != MarketState::DayStarted {
            return Ok(());
        }
        let weak = Arc::downgrade(self);
        self.clock.start_tracking(move || {
            if let Some(market) = weak.upgrade() {
                if let Err(e) = market.end_day() {
                    debug!("[MARKET] Closing bell ignored: {}", e);
                }
            }
        });
        Ok(())
    }

    /// Stops every tick task and the clock. Called by the closing bell, or
    /// directly to end the day early.
    pub fn end_day(&self) -> Result<(), MarketError> {
        self.transition(MarketState::DayStarted, MarketState::DayEnded)?;

        // waits for any in-flight tick to finish
        *self.ticking.write().unwrap() = false;
        for task in self.tick_tasks.lock().unwrap().drain(..) {
            task.abort();
        }

        {
            let mut expiry = self.effect_expiry.lock().unwrap();
            expiry.generation += 1;
            if let Some(task) = expiry.task.take() {
                task.abort();
            }
            self.clear_effects();
        }

        self.clock.stop();

        info!("🔕 [MARKET] Day ended");
        self.notifier
            .display_one(Channel::Message, "The market is now closed");
        self.bus.publish(Event::Market(MarketEvent::DayEnded));
        Ok(())
    }

    /// Reopens a closed market for another day with the same stocks.
    pub fn next_day(&self) -> Result<(), MarketError> {
        self.transition(MarketState::Closed, MarketState::Idle)
    }

    fn handle_all_positions_closed(&self) {
        match self.transition(MarketState::DayEnded, MarketState::Closed) {
            Ok(()) => {
                info!("🏁 [MARKET] All positions settled, market closed");
                self.bus.publish(Event::Market(MarketEvent::Closed));
            }
            Err(e) => warn!("⚠️ [MARKET] Ignoring settlement: {}", e),
        }
    }

    fn transition(&self, from: MarketState, to: MarketState) -> Result<(), MarketError> {
        let mut state = self.state.lock().unwrap();
        if *state != from {
            return Err(MarketError::InvalidTransition { from: *state, to });
        }
        *state = to;
        debug!("[MARKET] {:?} -> {:?}", from, to);
        Ok(())
    }

    fn spawn_stock_processing(self: &Arc<Self>, stock: SharedStock) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let rng = self.rng.clone();
        let min = self.config.min_processing_secs.max(0.0);
        let max = self.config.max_processing_secs.max(min);

        tokio::spawn(async move {
            loop {
                let wait = rng.next_float(min, max);
                tokio::time::sleep(Duration::from_secs_f64(wait)).await;

                let Some(market) = weak.upgrade() else {
                    break;
                };
                if !market.process_stock(&stock) {
                    break;
                }
            }
        })
    }

    /// Ticks one stock unless the day has ended. Returns whether it ticked.
    fn process_stock(&self, stock: &SharedStock) -> bool {
        let ticking = self.ticking.read().unwrap();
        if !*ticking {
            return false;
        }
        let snapshot = stock.lock().unwrap().process();
        self.handle_stock_processed(snapshot);
        drop(ticking);
        true
    }

    fn handle_stock_processed(&self, snapshot: StockSnapshot) {
        self.bus
            .publish(Event::Market(MarketEvent::StockProcessed(snapshot.clone())));

        let is_active = self.active_symbol.lock().unwrap().as_deref() == Some(snapshot.symbol.as_str());
        if is_active {
            self.bus
                .publish(Event::Market(MarketEvent::ActiveStockProcessed(snapshot)));
        }
    }

    /// Marks the stock the consumer is looking at and re-fires its latest values.
    pub fn set_active_symbol(&self, symbol: &str) -> bool {
        let stock = self.get_stock(symbol);
        *self.active_symbol.lock().unwrap() = stock.as_ref().map(|_| symbol.to_string());

        match stock {
            Some(stock) => {
                let snapshot = stock.lock().unwrap().snapshot();
                self.bus
                    .publish(Event::Market(MarketEvent::ActiveStockProcessed(snapshot)));
                true
            }
            None => false,
        }
    }

    pub fn clear_active_symbol(&self) {
        *self.active_symbol.lock().unwrap() = None;
        self.bus.publish(Event::Market(MarketEvent::ActiveStockCleared));
    }

    /// Applies the effect to every stock of its industry and (re)arms the
    /// expiry timer. Returns the number of stocks affected, or None when the
    /// day is not running.
    pub fn set_price_effect(self: &Arc<Self>, effect: PriceEffect) -> Option<usize> {
        let mut expiry = self.effect_expiry.lock().unwrap();
        // checked under the expiry lock so end_day cannot clear in between
        if self.state() != MarketState::DayStarted {
            debug!("[MARKET] Ignoring {:?} effect, market is not open", effect.industry);
            return None;
        }
        if let Some(task) = expiry.task.take() {
            task.abort();
        }
        expiry.generation += 1;
        let generation = expiry.generation;

        let affected: Vec<SharedStock> = self
            .stocks
            .read()
            .unwrap()
            .iter()
            .filter(|listed| listed.industry == effect.industry)
            .map(|listed| listed.stock.clone())
            .collect();
        for stock in &affected {
            stock.lock().unwrap().set_external_effect(effect);
        }

        let weak = Arc::downgrade(self);
        let duration = self.config.price_effect_duration();
        expiry.task = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(market) = weak.upgrade() {
                market.expire_price_effect(generation);
            }
        }));
        drop(expiry);

        info!(
            "📰 [MARKET] {:?} {:?} effect on {} ({} stocks, {:.1}s)",
            effect.strength,
            effect.direction,
            effect.industry,
            affected.len(),
            duration.as_secs_f64()
        );
        self.bus
            .publish(Event::Market(MarketEvent::PriceEffectApplied(effect)));
        Some(affected.len())
    }

    fn expire_price_effect(&self, generation: u64) {
        let mut expiry = self.effect_expiry.lock().unwrap();
        if expiry.generation != generation {
            return;
        }
        expiry.task = None;
        let cleared = self.clear_effects();
        drop(expiry);

        info!("📰 [MARKET] Price effect expired ({} stocks retargeted)", cleared);
        self.bus.publish(Event::Market(MarketEvent::PriceEffectCleared));
    }

    /// Clears every stock, affected or not, so the whole market retargets.
    fn clear_effects(&self) -> usize {
        let stocks = self.stocks();
        for stock in &stocks {
            stock.lock().unwrap().clear_external_effect();
        }
        stocks.len()
    }

    pub fn get_stock(&self, symbol: &str) -> Option<SharedStock> {
        self.stocks
            .read()
            .unwrap()
            .iter()
            .find(|listed| listed.symbol == symbol)
            .map(|listed| listed.stock.clone())
    }

    pub fn stocks(&self) -> Vec<SharedStock> {
        self.stocks
            .read()
            .unwrap()
            .iter()
            .map(|listed| listed.stock.clone())
            .collect()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.stocks
            .read()
            .unwrap()
            .iter()
            .map(|listed| listed.symbol.clone())
            .collect()
    }

    pub fn snapshots(&self) -> Vec<StockSnapshot> {
        self.stocks()
            .iter()
            .map(|stock| stock.lock().unwrap().snapshot())
            .collect()
    }

    pub fn stock_count(&self) -> usize {
        self.stocks.read().unwrap().len()
    }

    pub fn active_symbol(&self) -> Option<String> {
        self.active_symbol.lock().unwrap().clone()
    }

    pub fn active_stock(&self) -> Option<SharedStock> {
        self.active_symbol()
            .and_then(|symbol| self.get_stock(&symbol))
    }

    pub fn state(&self) -> MarketState {
        *self.state.lock().unwrap()
    }

    pub fn current_time(&self) -> NaiveTime {
        self.clock.current_time()
    }

    pub fn clock(&self) -> &TimeTracker {
        &self.clock
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn random(&self) -> Arc<dyn RandomSource> {
        self.rng.clone()
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }
}

impl Drop for MarketEngine {
    fn drop(&mut self) {
        if let Ok(mut tasks) = self.tick_tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
        if let Ok(mut expiry) = self.effect_expiry.lock() {
            if let Some(task) = expiry.task.take() {
                task.abort();
            }
        }
    }
}
