use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    bus::{EventBus, SubscriptionId},
    error::StoreError,
    events::{AccountEvent, Event, Fill, TradeSide},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub ts: String,
    pub day: i64,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: i64,
    pub price: f64,

    /// quantity * price
    pub notional: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DaySummary {
    pub day: i64,
    pub trades: u64,

    pub buys: u64,
    pub sells: u64,
    pub shorts: u64,
    pub covers: u64,

    /// Credits from sells and shorts
    pub cash_in: f64,

    /// Debits from buys and covers
    pub cash_out: f64,

    /// Per-symbol trade counts
    pub per_symbol: HashMap<String, u64>,

    /// Set when the day is settled
    pub closing_balance: Option<f64>,
}

impl DaySummary {
    pub fn net_cash_flow(&self) -> f64 {
        self.cash_in - self.cash_out
    }
}

/// Appends every fill to a JSONL log and keeps a running summary of the day.
#[derive(Clone)]
pub struct TradeJournal {
    summary: Arc<Mutex<DaySummary>>,
    log_path: PathBuf,
}

impl TradeJournal {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            summary: Arc::new(Mutex::new(DaySummary::default())),
            log_path: log_path.into(),
        }
    }

    pub fn summary(&self) -> DaySummary {
        self.summary.lock().unwrap().clone()
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn summary_path(&self) -> PathBuf {
        self.log_path.with_file_name("day_summary.json")
    }

    /// Records every bought, sold and shorted fill published on the bus.
    pub fn attach(&self, bus: &EventBus) -> SubscriptionId {
        let journal = self.clone();
        info!("📒 [JOURNAL] Recording trades to {}", journal.log_path.display());

        bus.on(move |event| {
            if let Event::Account(
                AccountEvent::StockBought(fill) | AccountEvent::StockSold(fill) | AccountEvent::StockShorted(fill),
            ) = event
            {
                journal.record(fill);
            }
        })
    }

    /// Starts a fresh summary for `day`.
    pub fn begin_day(&self, day: i64) {
        *self.summary.lock().unwrap() = DaySummary {
            day,
            ..DaySummary::default()
        };
    }

    pub fn record(&self, fill: &Fill) {
        let mut s = self.summary.lock().unwrap();
        s.trades += 1;
        match fill.side {
            TradeSide::Buy => {
                s.buys += 1;
                s.cash_out += fill.notional();
            }
            TradeSide::Cover => {
                s.covers += 1;
                s.cash_out += fill.notional();
            }
            TradeSide::Sell => {
                s.sells += 1;
                s.cash_in += fill.notional();
            }
            TradeSide::Short => {
                s.shorts += 1;
                s.cash_in += fill.notional();
            }
        }
        *s.per_symbol.entry(fill.symbol.clone()).or_insert(0) += 1;
        let day = s.day;
        drop(s);

        let entry = TradeLogEntry {
            ts: Utc::now().to_rfc3339(),
            day,
            symbol: fill.symbol.clone(),
            side: fill.side,
            quantity: fill.quantity,
            price: fill.price,
            notional: fill.notional(),
        };

        if let Err(e) = self.append_jsonl(&entry) {
            error!("❌ [JOURNAL] Failed to append trade: {}", e);
        }
    }

    /// Writes the day summary next to the trade log.
    pub fn flush_summary(&self, closing_balance: f64) -> Result<PathBuf, StoreError> {
        let summary_path = self.summary_path();
        if let Some(parent) = summary_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let s = {
            let mut s = self.summary.lock().unwrap();
            s.closing_balance = Some(closing_balance);
            s.clone()
        };
        std::fs::write(&summary_path, serde_json::to_vec_pretty(&s)?)?;

        info!(
            "📒 [JOURNAL] Day {} summary: {} trades, net cash flow ${:.2}",
            s.day,
            s.trades,
            s.net_cash_flow()
        );
        Ok(summary_path)
    }

    fn append_jsonl(&self, entry: &TradeLogEntry) -> Result<(), StoreError> {
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        let line = serde_json::to_string(entry)?;
        writeln!(f, "{}", line)?;
        Ok(())
    }
}
