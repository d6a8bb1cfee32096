//! Simulation constants and tuning values
//!
//! Centralizes the numbers that shape the price model, the trading day and
//! the progression ladder so they can be tuned in one place.

/// Price process constants
pub mod stock {
    /// Ceilings are drawn uniformly from [CEILING_MAX_VALUE / 2, CEILING_MAX_VALUE]
    pub const CEILING_MAX_VALUE: f64 = 150.0;

    /// Upper bound of a volume sample
    pub const VOLUME_MAX_VALUE: f64 = 100.0;

    /// Maximum possible price is always ceiling + this margin
    pub const ABOVE_CEILING_MARGIN: f64 = 10.0;

    /// Below this distance to the ceiling the trend is forced down
    pub const CEILING_PROXIMITY_THRESHOLD: f64 = 5.0;

    pub const MINIMUM_PRICE: f64 = 1.0;

    /// Number of ticks it should take for the price to reach its target
    pub const TARGET_APPROACH_DELAY_MIN: u32 = 8;
    pub const TARGET_APPROACH_DELAY_MAX: u32 = 15;

    /// A price this close to its target counts as arrived
    pub const TARGET_APPROACH_MARGIN: f64 = 1.0;

    /// Upper bound of the random noise added to every approach step
    pub const TARGET_APPROACH_FLUCTUATION: f64 = 0.1;

    /// |trend| at or above this is "too strong" and gets redrawn
    pub const TREND_STRONG: f64 = 0.75;

    /// |trend| at or below this is "too weak" and gets redrawn
    pub const TREND_WEAK: f64 = 0.25;

    /// Upper bound of the momentum nudge applied to mid-range trends
    pub const TREND_MOMENTUM_MAX: f64 = 0.2;
}

/// Market engine defaults
pub mod market {
    pub const DEFAULT_STOCK_COUNT: usize = 3;
    pub const MIN_PROCESSING_SECS: f64 = 1.0;
    pub const MAX_PROCESSING_SECS: f64 = 3.0;
    pub const PRICE_EFFECT_DURATION_SECS: f64 = 15.0;
    pub const EVENT_BUS_CAPACITY: usize = 1024;
}

/// Trading day clock defaults
pub mod clock {
    pub const DAY_DURATION_SECS: f64 = 90.0;
    pub const OPEN_TIME: &str = "09:30";
    pub const CLOSE_TIME: &str = "17:00";
    pub const TIME_FORMAT: &str = "%H:%M";
}

/// News generator defaults
pub mod news {
    pub const FIRST_NEWS_GAP_SECS: f64 = 10.0;
    pub const NEWS_GAP_MIN_SECS: f64 = 20.0;
    pub const NEWS_GAP_MAX_SECS: f64 = 25.0;
}

/// Player account defaults
pub mod player {
    pub const DEFAULT_ACCOUNT_BALANCE: f64 = 50_000.0;

    /// Pause between each forced settlement at day end
    pub const SETTLE_DELAY_SECS: f64 = 1.5;
}

/// Progression balance targets
pub mod progression {
    pub const FIRST_LEVEL_BALANCE_TARGET: f64 = 100_000.0;
    pub const SECOND_LEVEL_BALANCE_TARGET: f64 = 1_000_000.0;
}

/// Persisted key names
pub mod keys {
    pub const ACCOUNT_BALANCE: &str = "PlayerAccountBalance";
    pub const DAY_COUNT: &str = "DayCount";
    pub const ACHIEVEMENT_LEVEL: &str = "AchievementLevel";
}
