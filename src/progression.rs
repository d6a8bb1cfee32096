//! Balance-target levels and the trading mechanics they unlock.
//!
//! The current level lives in the save data; everything else is a fixed table.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::bus::EventBus;
use crate::constants::progression::{FIRST_LEVEL_BALANCE_TARGET, SECOND_LEVEL_BALANCE_TARGET};
use crate::data::GameData;
use crate::events::{Event, LevelReached};
use crate::notifier::{Channel, Notifier};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mechanic {
    News,
    Short,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Achievement {
    pub mechanics: &'static [Mechanic],
    /// Meaningless on the final level
    pub balance_target: f64,
}

impl Achievement {
    /// The mechanic this level adds over the previous one
    pub fn unlockable_mechanic(&self) -> Option<Mechanic> {
        self.mechanics.last().copied()
    }
}

pub const LEVELS: [Achievement; 3] = [
    Achievement {
        mechanics: &[],
        balance_target: FIRST_LEVEL_BALANCE_TARGET,
    },
    Achievement {
        mechanics: &[Mechanic::News],
        balance_target: SECOND_LEVEL_BALANCE_TARGET,
    },
    Achievement {
        mechanics: &[Mechanic::News, Mechanic::Short],
        balance_target: 0.0,
    },
];

pub struct ProgressionGate {
    data: GameData,
    notifier: Arc<dyn Notifier>,
    bus: EventBus,
    force_unlock: bool,
}

impl ProgressionGate {
    pub fn new(data: GameData, notifier: Arc<dyn Notifier>, bus: EventBus, force_unlock: bool) -> Self {
        Self {
            data,
            notifier,
            bus,
            force_unlock,
        }
    }

    pub fn current_level(&self) -> usize {
        self.data.achievement_level().min(LEVELS.len() - 1)
    }

    pub fn current(&self) -> Achievement {
        LEVELS[self.current_level()]
    }

    pub fn is_final_level(&self) -> bool {
        self.current_level() == LEVELS.len() - 1
    }

    /// None once there is nothing left to reach
    pub fn balance_target(&self) -> Option<f64> {
        (!self.is_final_level()).then(|| self.current().balance_target)
    }

    /// Advances one level when `balance` meets the current target.
    /// Returns whether a level was reached.
    pub fn check(&self, balance: f64) -> bool {
        let Some(target) = self.balance_target() else {
            return false;
        };
        if balance < target {
            return false;
        }

        let level = self.data.increment_achievement_level().min(LEVELS.len() - 1);
        info!(
            "🏆 [PROGRESSION] Reached level {} with ${:.2} (target ${:.2})",
            level, balance, target
        );
        self.show_messages();
        self.bus.publish(Event::Progression(LevelReached {
            level,
            next_balance_target: self.balance_target(),
        }));
        true
    }

    pub fn is_mechanic_unlocked(&self, mechanic: Mechanic) -> bool {
        self.force_unlock || self.current().mechanics.contains(&mechanic)
    }

    fn show_messages(&self) {
        let mut messages = vec![
            "Congratulations!".to_string(),
            "You reached your balance target".to_string(),
        ];

        let unlocked: &[&str] = match self.current().unlockable_mechanic() {
            Some(Mechanic::News) => &[
                "You have unlocked the news system",
                "News headlines will show up here",
                "They may impact stocks performance",
            ],
            Some(Mechanic::Short) => &[
                "You can now short stocks",
                "When a stock's trend is negative",
                "You can short and then buy it later",
                "Turning a profit in the process",
            ],
            None => &[],
        };
        messages.extend(unlocked.iter().map(|line| line.to_string()));

        self.notifier.display(Channel::Message, &messages);
    }
}
