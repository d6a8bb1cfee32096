//! In-simulation trading clock.
//!
//! Walks the market time from open to close one simulated minute at a time,
//! spreading the whole day over a configured wall-clock duration.

use chrono::NaiveTime;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ClockConfig;

pub struct TimeTracker {
    open_time: NaiveTime,
    close_time: NaiveTime,
    day_duration: Duration,
    infinite_day: bool,
    current_time: Arc<Mutex<NaiveTime>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TimeTracker {
    pub fn new(config: &ClockConfig) -> Self {
        let open_time = config.open();
        Self {
            open_time,
            close_time: config.close(),
            day_duration: Duration::from_secs_f64(config.day_duration_secs.max(0.0)),
            infinite_day: config.infinite_day,
            current_time: Arc::new(Mutex::new(open_time)),
            task: Mutex::new(None),
        }
    }

    /// Resets the clock to the opening bell and starts ticking.
    /// `on_day_ended` runs once when the clock reaches the close.
    pub fn start_tracking<F>(&self, on_day_ended: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.stop();
        *self.current_time.lock().unwrap() = self.open_time;

        let current_time = self.current_time.clone();
        let close_time = self.close_time;
        let infinite_day = self.infinite_day;
        let tick = self.tick_duration();

        info!(
            "🕘 [CLOCK] Market open at {} (one minute every {:.3}s)",
            self.open_time.format("%I:%M %p"),
            tick.as_secs_f64()
        );

        let handle = tokio::spawn(async move {
            loop {
                {
                    let now = *current_time.lock().unwrap();
                    if !infinite_day && now >= close_time {
                        break;
                    }
                }
                tokio::time::sleep(tick).await;
                let mut now = current_time.lock().unwrap();
                *now += chrono::Duration::minutes(1);
                debug!("[CLOCK] {}", now.format("%I:%M %p"));
            }
            info!("🔔 [CLOCK] Closing bell");
            on_day_ended();
        });

        *self.task.lock().unwrap() = Some(handle);
    }

    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
    }

    pub fn current_time(&self) -> NaiveTime {
        *self.current_time.lock().unwrap()
    }

    pub fn open_time(&self) -> NaiveTime {
        self.open_time
    }

    pub fn close_time(&self) -> NaiveTime {
        self.close_time
    }

    /// Wall-clock time per simulated minute
    pub fn tick_duration(&self) -> Duration {
        let total_minutes = (self.close_time - self.open_time).num_minutes().max(1);
        self.day_duration / total_minutes as u32
    }
}

impl Drop for TimeTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
