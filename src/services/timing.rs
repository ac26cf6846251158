//! Timer primitives: debounce and cooldown windows
//!
//! Every timer-setting operation supersedes its predecessor, so a stale
//! timer can never fire after a newer one was scheduled.

use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Runs an action after a quiet period; re-scheduling cancels the pending
/// run (last-writer-wins).
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `action` to run after the quiet period, aborting any
    /// previously scheduled action first.
    pub fn schedule<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap();
        if let Some(task) = pending.take() {
            task.abort();
        }

        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
    }

    /// Drop the pending action without running it.
    pub fn cancel(&self) {
        if let Some(task) = self.pending.lock().unwrap().take() {
            task.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A fixed suppression window.
///
/// Hosts trigger the gate when a drag ends; click handlers consult
/// `is_active` and short-circuit inside the window. A genuine click
/// landing inside the window is also swallowed — accepted trade-off.
pub struct CooldownGate {
    window: Duration,
    until: Mutex<Option<Instant>>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: Mutex::new(None),
        }
    }

    /// Gate preconfigured with the drag-click suppression window.
    pub fn drag_click() -> Self {
        Self::new(Duration::from_millis(crate::config::DRAG_CLICK_COOLDOWN_MS))
    }

    /// Open (or re-open) the suppression window starting now.
    pub fn trigger(&self) {
        let mut until = self.until.lock().unwrap();
        *until = Some(Instant::now() + self.window);
    }

    pub fn is_active(&self) -> bool {
        self.until
            .lock()
            .unwrap()
            .map(|until| Instant::now() < until)
            .unwrap_or(false)
    }
}
