use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveDate};
use itertools::Itertools;
use tracing::warn;

use crate::models::{ExerciseId, ExerciseRecord, WorkoutId, WorkoutSession};
use crate::storage::KvStore;

/// Storage key the full session collection persists under.
pub const HISTORY_KEY: &str = "workout_history";

/// Windowing rule for the active-streak counter: two sessions belong to the
/// same streak when their calendar dates are at most `max_gap_days` apart.
/// The gap is computed with real date arithmetic, so month and year
/// rollovers behave (a day-of-month subtraction would not).
#[derive(Debug, Clone, Copy)]
pub struct StreakPolicy {
    pub max_gap_days: i64,
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self { max_gap_days: 7 }
    }
}

/// Append-only store of completed workout sessions, persisted as a whole
/// through the key-value storage contract. In-memory state stays
/// authoritative for the running process even when a write fails.
pub struct HistoryStore {
    store: Arc<dyn KvStore>,
    sessions: Mutex<Vec<WorkoutSession>>,
    streak: StreakPolicy,
}

impl HistoryStore {
    /// Load persisted history. Read or parse failures are logged and leave
    /// the store empty rather than failing startup.
    pub fn load(store: Arc<dyn KvStore>, streak: StreakPolicy) -> Self {
        let sessions = match store.get(HISTORY_KEY) {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(sessions) => sessions,
                Err(err) => {
                    warn!(%err, "workout history is unreadable, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(%err, "failed to read workout history, starting empty");
                Vec::new()
            }
        };
        Self {
            store,
            sessions: Mutex::new(sessions),
            streak,
        }
    }

    /// Append a finished session and persist the full collection. A failed
    /// write is logged; the session stays in memory either way.
    pub fn add_workout_session(&self, session: WorkoutSession) {
        let mut sessions = self.lock();
        sessions.push(session);
        match serde_json::to_string(&*sessions) {
            Ok(blob) => {
                if let Err(err) = self.store.set(HISTORY_KEY, &blob) {
                    warn!(%err, "failed to persist workout history");
                }
            }
            Err(err) => warn!(%err, "failed to serialize workout history"),
        }
    }

    /// The most recent record of `exercise_id`, scanning sessions newest
    /// first by date.
    pub fn last_exercise_record(&self, exercise_id: ExerciseId) -> Option<ExerciseRecord> {
        let sessions = self.lock();
        sessions
            .iter()
            .sorted_by(|a, b| b.date.cmp(&a.date))
            .find_map(|session| {
                session
                    .entries
                    .iter()
                    .find(|entry| entry.exercise_id == exercise_id)
                    .cloned()
            })
    }

    /// The most recent session of a given workout.
    pub fn last_workout(&self, workout_id: WorkoutId) -> Option<WorkoutSession> {
        self.lock()
            .iter()
            .filter(|session| session.workout_id == workout_id)
            .max_by_key(|session| session.date)
            .cloned()
    }

    /// The most recent session overall.
    pub fn last_session(&self) -> Option<WorkoutSession> {
        self.lock().iter().max_by_key(|session| session.date).cloned()
    }

    /// Every historical record of an exercise, in storage order.
    pub fn exercise_records(&self, exercise_id: ExerciseId) -> Vec<ExerciseRecord> {
        self.lock()
            .iter()
            .flat_map(|session| session.entries.iter())
            .filter(|entry| entry.exercise_id == exercise_id)
            .cloned()
            .collect()
    }

    pub fn sessions(&self) -> Vec<WorkoutSession> {
        self.lock().clone()
    }

    pub fn total_sessions(&self) -> usize {
        self.lock().len()
    }

    /// Cumulative weight over every set in history, recorded or not.
    pub fn total_weight_lifted(&self) -> f64 {
        self.lock()
            .iter()
            .flat_map(|session| session.entries.iter())
            .flat_map(|entry| entry.sets.iter())
            .map(|set| set.weight.unwrap_or(0.0))
            .sum()
    }

    /// Consecutive-session streak as of today.
    pub fn current_streak(&self) -> u32 {
        self.streak_as_of(Local::now().date_naive())
    }

    /// Consecutive-session streak relative to an explicit reference date.
    /// Multiple sessions on one calendar day count once.
    pub fn streak_as_of(&self, today: NaiveDate) -> u32 {
        let sessions = self.lock();
        let mut days: Vec<NaiveDate> = sessions
            .iter()
            .map(|session| session.date.date_naive())
            .collect();
        drop(sessions);
        days.sort_unstable();
        days.dedup();

        let Some(&latest) = days.last() else {
            return 0;
        };
        if (today - latest).num_days() > self.streak.max_gap_days {
            return 0;
        }

        let mut streak = 1;
        for (later, earlier) in days.iter().rev().tuple_windows() {
            if (*later - *earlier).num_days() <= self.streak.max_gap_days {
                streak += 1;
            } else {
                break;
            }
        }
        streak
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WorkoutSession>> {
        self.sessions.lock().expect("history lock poisoned")
    }
}
