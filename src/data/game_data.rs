//! Typed accessors over the persisted save data.
//!
//! Store failures never propagate: reads fall back to defaults and failed
//! writes are logged.

use std::sync::Arc;
use tracing::warn;

use super::store::KeyValueStore;
use crate::constants::{keys, player};

const DAY_COUNT_DEFAULT: i64 = 1;
const ACHIEVEMENT_LEVEL_DEFAULT: i64 = 0;

#[derive(Clone)]
pub struct GameData {
    store: Arc<dyn KeyValueStore>,
}

impl GameData {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn account_balance(&self) -> f64 {
        self.store
            .get_f64_or(keys::ACCOUNT_BALANCE, player::DEFAULT_ACCOUNT_BALANCE)
    }

    pub fn set_account_balance(&self, balance: f64) {
        self.write_f64(keys::ACCOUNT_BALANCE, balance);
    }

    pub fn day_count(&self) -> i64 {
        self.store.get_i64_or(keys::DAY_COUNT, DAY_COUNT_DEFAULT)
    }

    pub fn increment_day_count(&self) -> i64 {
        let next = self.day_count() + 1;
        self.write_i64(keys::DAY_COUNT, next);
        next
    }

    pub fn achievement_level(&self) -> usize {
        self.store
            .get_i64_or(keys::ACHIEVEMENT_LEVEL, ACHIEVEMENT_LEVEL_DEFAULT)
            .max(0) as usize
    }

    pub fn set_achievement_level(&self, level: usize) {
        self.write_i64(keys::ACHIEVEMENT_LEVEL, level as i64);
    }

    pub fn increment_achievement_level(&self) -> usize {
        let next = self.achievement_level() + 1;
        self.set_achievement_level(next);
        next
    }

    pub fn reset(&self) {
        if let Err(e) = self.store.remove_all() {
            warn!("⚠️ [STORE] Failed to reset save data: {}", e);
        }
    }

    fn write_f64(&self, key: &str, value: f64) {
        if let Err(e) = self.store.set_f64(key, value) {
            warn!("⚠️ [STORE] Failed to save {}: {}", key, e);
        }
    }

    fn write_i64(&self, key: &str, value: i64) {
        if let Err(e) = self.store.set_i64(key, value) {
            warn!("⚠️ [STORE] Failed to save {}: {}", key, e);
        }
    }
}
