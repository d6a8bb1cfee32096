//! Target-seeking price process for a single listed company.
//!
//! Each tick moves the price a fraction of the way from where the current
//! movement began towards a price target. Once the price arrives (or the
//! approach starts drifting away) a fresh volume/trend pair is drawn and a new
//! target computed from it.

use serde::Serialize;
use std::sync::{Arc, Mutex};

use super::company::Industry;
use super::effect::PriceEffect;
use crate::constants::stock::*;
use crate::random::RandomSource;

pub type SharedStock = Arc<Mutex<Stock>>;

/// Anything with a tradable price. Trading goes through this seam so a
/// frozen quote can stand in for a live stock.
pub trait PriceQuote {
    fn symbol(&self) -> &str;
    fn current_price(&self) -> f64;
}

/// Point-in-time view of a stock, published on every tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StockSnapshot {
    pub symbol: String,
    pub company_name: String,
    pub industry: Industry,
    pub price: f64,
    pub price_change: f64,
    pub volume: f64,
    pub trend: f64,
    pub ceiling: f64,
}

/// Symbol and price, detached from the stock lock.
#[derive(Clone, Debug, PartialEq)]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
}

impl StockQuote {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

impl PriceQuote for StockQuote {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn current_price(&self) -> f64 {
        self.price
    }
}

impl PriceQuote for StockSnapshot {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn current_price(&self) -> f64 {
        self.price
    }
}

pub struct Stock {
    symbol: String,
    company_name: String,
    industry: Industry,
    ceiling: f64,

    price_history: Vec<f64>,
    volume_history: Vec<f64>,
    trend_history: Vec<f64>,

    price_target: f64,
    pre_movement_price: f64,
    target_approach_delay: u32,

    /// |price - target| seen on the previous tick; None right after a retarget
    last_target_distance: Option<f64>,

    external_effect: Option<PriceEffect>,

    rng: Arc<dyn RandomSource>,
}

impl Stock {
    pub fn new(
        symbol: impl Into<String>,
        company_name: impl Into<String>,
        industry: Industry,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        let ceiling = rng.next_float(CEILING_MAX_VALUE / 2.0, CEILING_MAX_VALUE);
        let initial_price = (ceiling - rng.next_float(0.0, ceiling)).max(MINIMUM_PRICE);

        let mut stock = Self {
            symbol: symbol.into(),
            company_name: company_name.into(),
            industry,
            ceiling,
            price_history: vec![initial_price],
            volume_history: Vec::new(),
            trend_history: Vec::new(),
            price_target: initial_price,
            pre_movement_price: initial_price,
            target_approach_delay: TARGET_APPROACH_DELAY_MIN,
            last_target_distance: None,
            external_effect: None,
            rng,
        };
        stock.retarget();
        stock
    }

    pub fn shared(self) -> SharedStock {
        Arc::new(Mutex::new(self))
    }

    /// Advances the price by one tick and returns the resulting snapshot.
    pub fn process(&mut self) -> StockSnapshot {
        let approach = self.price_target_approach();
        let new_price = (self.current_price() + approach).clamp(MINIMUM_PRICE, self.maximum_price());
        self.price_history.push(new_price);

        let distance = self.price_to_target_distance();
        let arrived = distance <= TARGET_APPROACH_MARGIN;
        // a growing distance means the approach overshot
        let drifting = self.last_target_distance.is_some_and(|last| distance > last);

        if arrived || drifting {
            self.retarget();
        } else {
            self.last_target_distance = Some(distance);
        }

        self.snapshot()
    }

    pub fn set_external_effect(&mut self, effect: PriceEffect) {
        self.external_effect = Some(effect);
        self.retarget();
    }

    pub fn clear_external_effect(&mut self) {
        self.external_effect = None;
        self.retarget();
    }

    pub fn external_effect(&self) -> Option<PriceEffect> {
        self.external_effect
    }

    fn retarget(&mut self) {
        self.pre_movement_price = self.current_price();
        self.target_approach_delay = self.draw_approach_delay();

        let volume = match self.external_effect {
            Some(effect) => self.draw_volume_with_effect(&effect),
            None => self.rng.next_float(0.0, VOLUME_MAX_VALUE),
        };
        self.volume_history.push(volume);

        let trend = match self.external_effect {
            Some(effect) => self.draw_trend_with_effect(&effect),
            None => self.draw_trend(),
        };
        self.trend_history.push(trend);

        self.set_price_target();
    }

    fn set_price_target(&mut self) {
        let target = self.current_price() + self.current_volume() * self.current_trend();
        self.price_target = target.clamp(MINIMUM_PRICE, self.maximum_price());
        self.last_target_distance = None;
    }

    fn draw_approach_delay(&self) -> u32 {
        self.rng
            .next_float(TARGET_APPROACH_DELAY_MIN as f64, TARGET_APPROACH_DELAY_MAX as f64)
            .floor() as u32
    }

    fn draw_trend(&mut self) -> f64 {
        if self.trend_history.is_empty() {
            return self.rng.next_float(-1.0, 1.0);
        }

        if self.is_price_too_close_to_ceiling() {
            // pull back slowly
            self.target_approach_delay = TARGET_APPROACH_DELAY_MAX;
            return self.rng.next_float(-1.0, -TREND_STRONG);
        }

        let current = self.current_trend();
        let strength = current.abs();
        if strength >= TREND_STRONG || strength <= TREND_WEAK {
            self.rng.next_float(-1.0, 1.0)
        } else {
            (current + self.rng.next_float(0.0, TREND_MOMENTUM_MAX)).clamp(-1.0, 1.0)
        }
    }

    fn draw_volume_with_effect(&self, effect: &PriceEffect) -> f64 {
        let (min, max) = effect.volume_band();
        self.rng.next_float(min, max)
    }

    fn draw_trend_with_effect(&self, effect: &PriceEffect) -> f64 {
        let (min, max) = effect.trend_band();
        effect.direction.sign() * self.rng.next_float(min, max)
    }

    fn price_target_approach(&self) -> f64 {
        let step = (self.price_target - self.pre_movement_price) / self.target_approach_delay as f64;
        step + self.rng.next_float(0.0, TARGET_APPROACH_FLUCTUATION)
    }

    fn is_price_too_close_to_ceiling(&self) -> bool {
        self.ceiling - self.current_price() <= CEILING_PROXIMITY_THRESHOLD
    }

    fn price_to_target_distance(&self) -> f64 {
        (self.current_price() - self.price_target).abs()
    }

    pub fn maximum_price(&self) -> f64 {
        self.ceiling + ABOVE_CEILING_MARGIN
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn industry(&self) -> Industry {
        self.industry
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn price_target(&self) -> f64 {
        self.price_target
    }

    pub fn target_approach_delay(&self) -> u32 {
        self.target_approach_delay
    }

    pub fn price_history(&self) -> &[f64] {
        &self.price_history
    }

    pub fn volume_history(&self) -> &[f64] {
        &self.volume_history
    }

    pub fn trend_history(&self) -> &[f64] {
        &self.trend_history
    }

    pub fn current_price(&self) -> f64 {
        self.price_history.last().copied().unwrap_or(MINIMUM_PRICE)
    }

    pub fn current_price_change(&self) -> f64 {
        match self.price_history.len() {
            0 | 1 => 0.0,
            n => self.price_history[n - 1] - self.price_history[n - 2],
        }
    }

    pub fn current_volume(&self) -> f64 {
        self.volume_history.last().copied().unwrap_or_default()
    }

    pub fn current_trend(&self) -> f64 {
        self.trend_history.last().copied().unwrap_or_default()
    }

    pub fn quote(&self) -> StockQuote {
        StockQuote::new(self.symbol.clone(), self.current_price())
    }

    pub fn snapshot(&self) -> StockSnapshot {
        StockSnapshot {
            symbol: self.symbol.clone(),
            company_name: self.company_name.clone(),
            industry: self.industry,
            price: self.current_price(),
            price_change: self.current_price_change(),
            volume: self.current_volume(),
            trend: self.current_trend(),
            ceiling: self.ceiling,
        }
    }
}

impl PriceQuote for Stock {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn current_price(&self) -> f64 {
        Stock::current_price(self)
    }
}
