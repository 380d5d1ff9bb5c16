use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How often the session ticks recompute timer state.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Wall-clock elapsed-time tracker for the running workout.
///
/// `elapsed` is recomputed from `now - started_at` on every tick while
/// running and frozen once stopped.
#[derive(Debug, Clone)]
pub struct WorkoutTimer {
    pub is_running: bool,
    pub started_at: Option<Instant>,
    pub elapsed: Duration,
}

impl Default for WorkoutTimer {
    fn default() -> Self {
        Self {
            is_running: false,
            started_at: None,
            elapsed: Duration::ZERO,
        }
    }
}

impl WorkoutTimer {
    pub fn start(&mut self, now: Instant) {
        self.is_running = true;
        self.started_at = Some(now);
        self.elapsed = Duration::ZERO;
    }

    /// Recompute elapsed time. No-op when stopped.
    pub fn tick(&mut self, now: Instant) {
        if !self.is_running {
            return;
        }
        if let Some(started) = self.started_at {
            self.elapsed = now.duration_since(started);
        }
    }

    /// Freeze `elapsed` at its final value.
    pub fn stop(&mut self, now: Instant) {
        self.tick(now);
        self.is_running = false;
        self.started_at = None;
    }
}

/// Countdown used between sets, nested inside the active session and
/// independent of the workout timer.
///
/// `remaining` monotonically decreases to zero while running and is never
/// negative; reaching zero stops the timer.
#[derive(Debug, Clone)]
pub struct RestTimer {
    pub is_running: bool,
    pub duration: Duration,
    pub remaining: Duration,
    started_at: Option<Instant>,
}

impl Default for RestTimer {
    fn default() -> Self {
        Self {
            is_running: false,
            duration: Duration::ZERO,
            remaining: Duration::ZERO,
            started_at: None,
        }
    }
}

impl RestTimer {
    pub fn start(&mut self, duration: Duration, now: Instant) {
        self.is_running = true;
        self.duration = duration;
        self.remaining = duration;
        self.started_at = Some(now);
    }

    /// Recompute the remaining time. Returns true when the countdown has
    /// just reached zero and stopped itself.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_running {
            return false;
        }
        let Some(started) = self.started_at else {
            return false;
        };
        self.remaining = self.duration.saturating_sub(now.duration_since(started));
        if self.remaining.is_zero() {
            self.is_running = false;
            self.started_at = None;
            true
        } else {
            false
        }
    }

    /// Stop counting down without resetting `remaining`. The owning engine
    /// must also cancel the tick task.
    pub fn pause(&mut self) {
        self.is_running = false;
    }

    /// Rewind `remaining` to the full duration without touching the running
    /// state. A running countdown restarts from now.
    pub fn reset(&mut self, now: Instant) {
        self.remaining = self.duration;
        if self.is_running {
            self.started_at = Some(now);
        }
    }
}

/// Handle to a spawned repeating tick task. The task is aborted when the
/// handle is dropped, so a replaced handle can never leave a stale tick
/// behind to mutate cleared state.
#[derive(Debug)]
pub struct TickHandle(JoinHandle<()>);

impl TickHandle {
    /// Spawn a task invoking `on_tick` once per `period`. The task ends when
    /// the callback returns false.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // An interval's first tick completes immediately; consume it so
            // the callback only runs on period boundaries.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !on_tick() {
                    break;
                }
            }
        }))
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Holder for at most one live tick task per timer kind. Installing a new
/// handle drops (and therefore aborts) the previous one first.
#[derive(Debug, Default)]
pub struct TickSlot(Mutex<Option<TickHandle>>);

impl TickSlot {
    pub fn replace(&self, handle: TickHandle) {
        *self.0.lock().expect("tick slot lock poisoned") = Some(handle);
    }

    pub fn clear(&self) {
        self.0.lock().expect("tick slot lock poisoned").take();
    }

    /// True while a tick task is installed and still running.
    pub fn is_active(&self) -> bool {
        self.0
            .lock()
            .expect("tick slot lock poisoned")
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
