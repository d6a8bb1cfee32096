//! One player's run: builds every component from the config and drives the
//! day cycle.
//!
//! Day end closes all positions; once they settle the market closes, the
//! balance is saved, progression is checked, the day counter moves on and
//! the journal summary is written.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::bus::EventBus;
use crate::config::{parse_time, AppConfig};
use crate::constants;
use crate::data::{GameData, KeyValueStore};
use crate::desk::TradingDesk;
use crate::error::{MarketError, SessionError};
use crate::events::{Event, MarketEvent};
use crate::journal::TradeJournal;
use crate::market::{MarketEngine, MarketState};
use crate::news::NewsGenerator;
use crate::notifier::{Channel, Notifier};
use crate::player::Portfolio;
use crate::progression::ProgressionGate;
use crate::random::SeededRandom;

pub struct Session {
    config: AppConfig,
    data: GameData,
    notifier: Arc<dyn Notifier>,
    bus: EventBus,
    market: Arc<MarketEngine>,
    portfolio: Arc<Portfolio>,
    gate: Arc<ProgressionGate>,
    news: Arc<NewsGenerator>,
    journal: Option<TradeJournal>,
    desk: TradingDesk,
}

impl Session {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Arc<Self>, SessionError> {
        parse_time(&config.clock.open_time)?;
        parse_time(&config.clock.close_time)?;

        let bus = EventBus::new(constants::market::EVENT_BUS_CAPACITY);
        let rng = Arc::new(SeededRandom::new(config.market.random_seed));
        let market = MarketEngine::new(
            config.market.clone(),
            &config.clock,
            rng,
            bus.clone(),
            notifier.clone(),
        );

        let data = GameData::new(store);
        let portfolio = Portfolio::new(
            market.clone(),
            notifier.clone(),
            data.account_balance(),
            config.player.settle_delay(),
        );
        let gate = Arc::new(ProgressionGate::new(
            data.clone(),
            notifier.clone(),
            bus.clone(),
            config.player.force_mechanics,
        ));

        let news = NewsGenerator::new(market.clone(), gate.clone(), notifier.clone(), config.news.clone());
        news.attach();

        let journal = (!config.storage.journal_path.is_empty()).then(|| {
            let journal = TradeJournal::new(&config.storage.journal_path);
            journal.attach(&bus);
            journal
        });

        let desk = TradingDesk::new(market.clone(), portfolio.clone(), gate.clone());

        market.initialize(config.market.stock_count, config.market.activate_first_stock)?;

        let session = Arc::new(Self {
            config,
            data,
            notifier,
            bus,
            market,
            portfolio,
            gate,
            news,
            journal,
            desk,
        });

        let weak = Arc::downgrade(&session);
        session.bus.on(move |event| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            match event {
                Event::Market(MarketEvent::DayStarted) => session.handle_day_started(),
                Event::Market(MarketEvent::DayEnded) => session.handle_day_ended(),
                Event::Market(MarketEvent::Closed) => session.handle_closed(),
                _ => {}
            }
        });

        info!(
            "🎮 [SESSION] Ready: {} stocks, balance ${:.2}, day {}, level {}",
            session.market.stock_count(),
            session.portfolio.balance(),
            session.data.day_count(),
            session.gate.current_level()
        );
        Ok(session)
    }

    /// Greets the player and opens the market if configured to.
    pub fn start(&self) -> Result<(), MarketError> {
        self.notifier.display(
            Channel::Message,
            &[
                "Good morning, day traders".to_string(),
                format!("Day {}", self.data.day_count()),
                "The market will soon be open".to_string(),
            ],
        );

        if self.config.market.open_market_on_start {
            self.begin_day()?;
        }
        Ok(())
    }

    pub fn begin_day(&self) -> Result<(), MarketError> {
        self.market.begin_day()
    }

    /// Ends the running day ahead of the closing bell.
    pub fn end_day(&self) -> Result<(), MarketError> {
        self.market.end_day()
    }

    /// Takes a closed market back to idle for the next day.
    pub fn next_day(&self) -> Result<(), MarketError> {
        self.market.next_day()?;
        info!("🎮 [SESSION] Day {} ready", self.data.day_count());
        self.notifier
            .display_one(Channel::Message, &format!("Day {}", self.data.day_count()));
        Ok(())
    }

    /// Resolves once the market reaches `Closed`.
    pub async fn wait_for_close(&self) {
        let mut rx = self.bus.subscribe();
        loop {
            if self.market.state() == MarketState::Closed {
                return;
            }
            match rx.recv().await {
                Ok(Event::Market(MarketEvent::Closed)) => return,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("⚠️ [SESSION] Missed {} events while waiting for close", skipped);
                }
                Err(RecvError::Closed) => return,
            }
        }
    }

    fn handle_day_started(&self) {
        if let Some(journal) = &self.journal {
            journal.begin_day(self.data.day_count());
        }

        if let Some(target) = self.gate.balance_target() {
            self.notifier.display(
                Channel::Message,
                &[
                    "Your current balance target is:".to_string(),
                    format!("${:.2}", target),
                ],
            );
        }
    }

    fn handle_day_ended(&self) {
        info!(
            "🎮 [SESSION] Closing {} positions",
            self.portfolio.positions().len()
        );
        self.portfolio.close_all_positions();
    }

    fn handle_closed(&self) {
        let balance = self.portfolio.balance();
        self.data.set_account_balance(balance);
        self.gate.check(balance);
        let day = self.data.increment_day_count();

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.flush_summary(balance) {
                warn!("⚠️ [SESSION] Failed to write day summary: {}", e);
            }
        }

        info!("🎮 [SESSION] Day settled with ${:.2}, next is day {}", balance, day);
        self.notifier.display(
            Channel::Message,
            &[
                "All positions are settled".to_string(),
                format!("Your balance is ${:.2}", balance),
            ],
        );
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn data(&self) -> &GameData {
        &self.data
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
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

    pub fn news(&self) -> &Arc<NewsGenerator> {
        &self.news
    }

    pub fn journal(&self) -> Option<&TradeJournal> {
        self.journal.as_ref()
    }

    pub fn desk(&self) -> &TradingDesk {
        &self.desk
    }
}
