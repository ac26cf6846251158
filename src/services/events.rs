//! In-process event bus for rename notifications
//!
//! A single-slot pulse: `broadcast` makes the event readable and pushes it
//! to current subscribers, then the slot auto-clears after a short window.
//! There is no queueing and no replay; a subscriber that was not listening
//! at broadcast time never observes the event.

use crate::config::EVENT_PULSE_MS;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Cross-cutting notification emitted after a catalog rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum AppEvent {
    TagRenamed {
        tag_id: String,
        old_name: String,
        new_name: String,
        at: i64,
    },
    CategoryRenamed {
        category_id: String,
        old_name: String,
        new_name: String,
        at: i64,
    },
}

struct Slot {
    current: Option<AppEvent>,
    /// Generation of the event occupying the slot. A clear task only wipes
    /// the slot if its generation still matches, so a raced stale timer
    /// can never erase a fresher pulse.
    generation: u64,
    clear_task: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct EventBus {
    slot: Arc<Mutex<Slot>>,
    tx: broadcast::Sender<AppEvent>,
    pulse: Duration,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_pulse(Duration::from_millis(EVENT_PULSE_MS))
    }

    fn with_pulse(pulse: Duration) -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            slot: Arc::new(Mutex::new(Slot {
                current: None,
                generation: 0,
                clear_task: None,
            })),
            tx,
            pulse,
        }
    }

    /// Publish an event to all current subscribers and hold it in the slot
    /// until the pulse window elapses.
    pub fn broadcast(&self, event: AppEvent) {
        let generation = {
            let mut slot = self.slot.lock().unwrap();
            slot.generation += 1;
            slot.current = Some(event.clone());

            // Supersede any pending clear before scheduling a new one.
            if let Some(task) = slot.clear_task.take() {
                task.abort();
            }
            slot.generation
        };

        // No receivers is fine; the slot still carries the pulse.
        let _ = self.tx.send(event);

        let slot = Arc::clone(&self.slot);
        let pulse = self.pulse;
        let clear_task = tokio::spawn(async move {
            tokio::time::sleep(pulse).await;
            let mut slot = slot.lock().unwrap();
            if slot.generation == generation {
                slot.current = None;
            }
        });

        self.slot.lock().unwrap().clear_task = Some(clear_task);
    }

    /// The event currently occupying the slot, if its window has not
    /// elapsed.
    pub fn current(&self) -> Option<AppEvent> {
        self.slot.lock().unwrap().current.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
