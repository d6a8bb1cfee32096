//! User-facing text sink.
//!
//! The simulation only hands lines of text to a [`Notifier`]; whatever panel
//! or terminal shows them lives outside this crate.

use std::fmt;
use std::sync::Mutex;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Message,
    News,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Message => f.write_str("Message"),
            Channel::News => f.write_str("News"),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn display(&self, channel: Channel, messages: &[String]);

    fn display_one(&self, channel: Channel, message: &str) {
        self.display(channel, &[message.to_string()]);
    }
}

/// Writes every message to the log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn display(&self, channel: Channel, messages: &[String]) {
        for message in messages {
            info!("💬 [{}] {}", channel, message);
        }
    }
}

/// Keeps every message in memory, oldest first.
#[derive(Default)]
pub struct MessageLog {
    messages: Mutex<Vec<(Channel, String)>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Channel, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

impl Notifier for MessageLog {
    fn display(&self, channel: Channel, messages: &[String]) {
        let mut log = self.messages.lock().unwrap();
        log.extend(messages.iter().map(|m| (channel, m.clone())));
    }
}
