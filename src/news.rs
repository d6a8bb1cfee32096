//! Scripted news stories that shock one industry at a time.
//!
//! While running, the generator waits a fixed first gap, then publishes a
//! story every `gap_min..gap_max` seconds. Each story applies a price effect
//! to every listed stock of the chosen industry.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::bus::SubscriptionId;
use crate::config::NewsConfig;
use crate::events::{Event, MarketEvent};
use crate::market::{EffectDirection, EffectStrength, Industry, MarketEngine, MarketState, PriceEffect};
use crate::notifier::{Channel, Notifier};
use crate::progression::{Mechanic, ProgressionGate};
use crate::random::RandomSource;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct News {
    pub industry: Industry,
    pub headline: String,
    pub direction: EffectDirection,
    pub strength: EffectStrength,
}

impl News {
    pub fn price_effect(&self) -> PriceEffect {
        PriceEffect::new(self.industry, self.direction, self.strength)
    }
}

const INDUSTRY_PLACEHOLDER: &str = "{industry}";

/// Headline templates for a direction/strength pair
pub fn headlines(direction: EffectDirection, strength: EffectStrength) -> &'static [&'static str] {
    match (direction, strength) {
        (EffectDirection::Positive, EffectStrength::Strong) => &[
            "Some really good news for {industry}",
            "{industry} stocks soar on record earnings",
            "Government hands {industry} a massive contract",
        ],
        (EffectDirection::Positive, EffectStrength::Weak) => &[
            "Some good news for {industry}",
            "Analysts upgrade their {industry} outlook",
            "{industry} sees steady demand this quarter",
        ],
        (EffectDirection::Negative, EffectStrength::Strong) => &[
            "Some really bad news for {industry}",
            "{industry} rocked by accounting scandal",
            "Investors flee {industry} after crash warning",
        ],
        (EffectDirection::Negative, EffectStrength::Weak) => &[
            "Some bad news for {industry}",
            "Analysts trim {industry} forecasts",
            "{industry} braces for a softer quarter",
        ],
    }
}

pub struct NewsGenerator {
    market: Arc<MarketEngine>,
    gate: Arc<ProgressionGate>,
    notifier: Arc<dyn Notifier>,
    rng: Arc<dyn RandomSource>,
    config: NewsConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NewsGenerator {
    pub fn new(
        market: Arc<MarketEngine>,
        gate: Arc<ProgressionGate>,
        notifier: Arc<dyn Notifier>,
        config: NewsConfig,
    ) -> Arc<Self> {
        let rng = market.random();
        Arc::new(Self {
            market,
            gate,
            notifier,
            rng,
            config,
            task: Mutex::new(None),
        })
    }

    /// Starts the generator with each trading day and stops it at day end.
    pub fn attach(self: &Arc<Self>) -> SubscriptionId {
        let weak = Arc::downgrade(self);
        self.market.bus().on(move |event| {
            let Some(generator) = weak.upgrade() else {
                return;
            };
            match event {
                Event::Market(MarketEvent::DayStarted) => {
                    generator.start();
                }
                Event::Market(MarketEvent::DayEnded) => generator.stop(),
                _ => {}
            }
        })
    }

    /// Returns false when the news mechanic is locked or already running.
    pub fn start(self: &Arc<Self>) -> bool {
        if !self.gate.is_mechanic_unlocked(Mechanic::News) {
            debug!("[NEWS] News mechanic locked, generator not started");
            return false;
        }

        let mut task = self.task.lock().unwrap();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let weak = Arc::downgrade(self);
        let first_gap = Duration::from_secs_f64(self.config.first_gap_secs.max(0.0));
        let gap_min = self.config.gap_min_secs.max(0.0);
        let gap_max = self.config.gap_max_secs.max(gap_min);

        *task = Some(tokio::spawn(async move {
            tokio::time::sleep(first_gap).await;
            loop {
                let Some(generator) = weak.upgrade() else {
                    break;
                };
                generator.create_story();
                let gap = generator.rng.next_float(gap_min, gap_max);
                drop(generator);

                tokio::time::sleep(Duration::from_secs_f64(gap)).await;
            }
        }));

        info!("📰 [NEWS] Generator started (first story in {:.0}s)", first_gap.as_secs_f64());
        true
    }

    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
            info!("📰 [NEWS] Generator stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Picks a story, applies its effect and announces it.
    /// None when the market is not open or nothing is listed.
    pub fn create_story(&self) -> Option<News> {
        if self.market.state() != MarketState::DayStarted {
            debug!("[NEWS] Market not open, story dropped");
            return None;
        }
        let snapshots = self.market.snapshots();
        if snapshots.is_empty() {
            return None;
        }

        let industry = snapshots[self.pick_index(snapshots.len())].industry;
        let direction = if self.rng.next_unit() < 0.5 {
            EffectDirection::Positive
        } else {
            EffectDirection::Negative
        };
        let strength = if self.rng.next_unit() < 0.5 {
            EffectStrength::Strong
        } else {
            EffectStrength::Weak
        };

        let templates = headlines(direction, strength);
        let headline = templates[self.pick_index(templates.len())]
            .replace(INDUSTRY_PLACEHOLDER, &industry.to_string());

        let news = News {
            industry,
            headline,
            direction,
            strength,
        };

        let affected = self.market.set_price_effect(news.price_effect())?;
        info!("📰 [NEWS] {} ({} stocks affected)", news.headline, affected);
        self.notifier.display_one(Channel::News, &news.headline);
        self.market.bus().publish(Event::News(news.clone()));
        Some(news)
    }

    fn pick_index(&self, len: usize) -> usize {
        ((self.rng.next_unit() * len as f64).floor() as usize).min(len - 1)
    }
}

impl Drop for NewsGenerator {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}
