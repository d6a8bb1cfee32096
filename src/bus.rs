//! Domain event bus.
//!
//! Two ways to listen: synchronous observers registered with [`EventBus::on`]
//! run in registration order before `publish` returns, and
//! [`EventBus::subscribe`] hands out a broadcast receiver for async consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::events::Event;

type Observer = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    observers: Arc<Mutex<Vec<(SubscriptionId, Observer)>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            observers: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn on<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().unwrap().push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock().unwrap();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Delivers to every observer, then to channel subscribers.
    /// Returns how many listeners received the event.
    pub fn publish(&self, event: Event) -> usize {
        // Snapshot so observers may publish or (un)subscribe re-entrantly
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        for observer in &observers {
            observer(&event);
        }

        let channel = self.tx.send(event).unwrap_or(0);
        observers.len() + channel
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().unwrap().len()
    }
}
