use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::{ExerciseCatalog, RoutineCatalog};
use crate::history::HistoryStore;
use crate::models::{ExerciseId, ExerciseRecord, SetRecord, Workout, WorkoutId, WorkoutSession};
use crate::timer::{RestTimer, TICK_PERIOD, TickHandle, TickSlot, WorkoutTimer};
use crate::utils::format_duration;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Usage error: the operation requires an in-progress session.
    #[error("no active session")]
    NoActiveSession,

    /// The requested workout is not in the routine catalog. Callers treat
    /// this as a logged no-op, not a crash.
    #[error("workout {0} not found in the catalog")]
    WorkoutNotFound(WorkoutId),
}

/// The single in-progress workout. Owned exclusively by the engine; callers
/// only ever see cloned snapshots.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub workout_id: WorkoutId,
    pub workout_name: String,
    /// One record per planned exercise, in plan order, unique by exercise id.
    pub records: Vec<ExerciseRecord>,
    pub workout_timer: WorkoutTimer,
    pub rest_timer: RestTimer,
}

impl ActiveSession {
    fn record_mut(&mut self, exercise_id: ExerciseId) -> Option<&mut ExerciseRecord> {
        self.records
            .iter_mut()
            .find(|record| record.exercise_id == exercise_id)
    }
}

/// The active-workout state machine: `Idle` (no session) or `Active`
/// (workout timer running), with cancel and finish as the only exits.
///
/// All mutations serialize through one mutex; the two periodic ticks
/// (workout elapsed time, rest countdown) are tokio tasks holding exactly
/// one `TickSlot` each, so starting, cancelling, or finishing a session
/// deterministically kills stale ticks.
pub struct SessionEngine {
    routines: Arc<dyn RoutineCatalog>,
    exercises: Arc<dyn ExerciseCatalog>,
    history: Arc<HistoryStore>,
    state: Arc<Mutex<Option<ActiveSession>>>,
    workout_tick: TickSlot,
    rest_tick: TickSlot,
}

impl SessionEngine {
    pub fn new(
        routines: Arc<dyn RoutineCatalog>,
        exercises: Arc<dyn ExerciseCatalog>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            routines,
            exercises,
            history,
            state: Arc::new(Mutex::new(None)),
            workout_tick: TickSlot::default(),
            rest_tick: TickSlot::default(),
        }
    }

    /// Begin a session for a catalog workout. Replaces any previous session
    /// unconditionally; its ticks die with their replaced handles. An
    /// unknown workout id leaves state untouched.
    pub fn start_workout(&self, workout_id: WorkoutId) -> Result<(), SessionError> {
        let Some(workout) = self.routines.workout_by_id(workout_id) else {
            warn!(workout_id, "cannot start workout: not in the catalog");
            return Err(SessionError::WorkoutNotFound(workout_id));
        };

        let records = self.build_records(&workout);
        let mut workout_timer = WorkoutTimer::default();
        workout_timer.start(Instant::now());

        *self.lock() = Some(ActiveSession {
            workout_id,
            workout_name: workout.name,
            records,
            workout_timer,
            rest_timer: RestTimer::default(),
        });
        self.rest_tick.clear();
        self.spawn_workout_tick();

        debug!(workout_id, "workout started");
        Ok(())
    }

    /// Called by the routine catalog's owner after every plan mutation.
    ///
    /// The rebuild is driven strictly by the updated workout's exercise
    /// list: removed exercises drop out, added ones appear fresh, and sets
    /// merge positionally. A set the user already filled in survives as long
    /// as its index still exists; targets always refresh from the plan.
    /// If the active workout was deleted outright, the session is cancelled.
    pub fn on_routine_changed(&self) {
        let mut guard = self.lock();
        let Some(session) = guard.as_mut() else {
            return;
        };

        let Some(updated) = self.routines.workout_by_id(session.workout_id) else {
            debug!(
                workout_id = session.workout_id,
                "active workout removed from catalog, cancelling session"
            );
            drop(guard);
            self.cancel_workout();
            return;
        };

        let records: Vec<ExerciseRecord> = updated
            .exercises
            .iter()
            .map(|planned| {
                let old = session
                    .records
                    .iter()
                    .find(|record| record.exercise_id == planned.exercise_id);
                let sets = (0..planned.sets as usize)
                    .map(|index| match old.and_then(|record| record.sets.get(index)) {
                        Some(kept) => SetRecord {
                            reps: kept.reps,
                            weight: kept.weight,
                            target_reps: planned.reps,
                            target_weight: planned.weight,
                            completed: kept.completed,
                        },
                        None => SetRecord::planned(planned.reps, planned.weight),
                    })
                    .collect();
                ExerciseRecord {
                    exercise_id: planned.exercise_id,
                    exercise_name: old
                        .map(|record| record.exercise_name.clone())
                        .unwrap_or_else(|| self.exercise_name(planned.exercise_id)),
                    sets,
                    is_completed: old.is_some_and(|record| record.is_completed),
                    intensity: old.and_then(|record| record.intensity),
                }
            })
            .collect();

        session.workout_name = updated.name;
        session.records = records;
        debug!(workout_id = session.workout_id, "session reconciled with plan change");
    }

    /// Overwrite the recorded values of one set. Unknown exercise or
    /// out-of-bounds index is a no-op; the completed flag is untouched.
    pub fn update_set_input(
        &self,
        exercise_id: ExerciseId,
        set_index: usize,
        reps: Option<u32>,
        weight: Option<f64>,
    ) {
        let mut guard = self.lock();
        let Some(set) = guard
            .as_mut()
            .and_then(|session| session.record_mut(exercise_id))
            .and_then(|record| record.sets.get_mut(set_index))
        else {
            return;
        };
        set.reps = reps;
        set.weight = weight;
    }

    /// Flip the completed flag of one set, independent of value presence.
    /// Idempotent; out-of-bounds is a no-op.
    pub fn mark_set_completed(&self, exercise_id: ExerciseId, set_index: usize, completed: bool) {
        let mut guard = self.lock();
        let Some(set) = guard
            .as_mut()
            .and_then(|session| session.record_mut(exercise_id))
            .and_then(|record| record.sets.get_mut(set_index))
        else {
            return;
        };
        set.completed = completed;
    }

    /// Remove a set from the in-memory record. The planned sets in the
    /// catalog must be edited separately, or the next reconciliation pass
    /// brings the set back.
    pub fn delete_set(&self, exercise_id: ExerciseId, set_index: usize) {
        let mut guard = self.lock();
        let Some(record) = guard
            .as_mut()
            .and_then(|session| session.record_mut(exercise_id))
        else {
            return;
        };
        if set_index < record.sets.len() {
            record.sets.remove(set_index);
        }
    }

    /// Mark an exercise done with an optional 1-5 intensity rating. Does not
    /// force-complete its sets.
    pub fn complete_exercise(&self, exercise_id: ExerciseId, intensity: Option<u8>) {
        let mut guard = self.lock();
        let Some(record) = guard
            .as_mut()
            .and_then(|session| session.record_mut(exercise_id))
        else {
            return;
        };
        record.is_completed = true;
        record.intensity = intensity.map(|rating| rating.clamp(1, 5));
    }

    /// Discard the session without writing history. Safe to call when idle.
    pub fn cancel_workout(&self) {
        self.workout_tick.clear();
        self.rest_tick.clear();
        if self.lock().take().is_some() {
            debug!("workout cancelled");
        }
    }

    /// Finalize the session into an immutable `WorkoutSession` and return
    /// it; persisting the snapshot is the caller's job. Finishing with no
    /// active session is a usage error.
    pub fn finish_workout(&self) -> Result<WorkoutSession, SessionError> {
        self.workout_tick.clear();
        self.rest_tick.clear();

        let mut session = self.lock().take().ok_or(SessionError::NoActiveSession)?;
        session.workout_timer.stop(Instant::now());

        debug!(workout_id = session.workout_id, "workout finished");
        Ok(WorkoutSession {
            id: Uuid::new_v4().to_string(),
            workout_id: session.workout_id,
            workout_name: session.workout_name,
            date: Local::now(),
            duration: format_duration(session.workout_timer.elapsed),
            entries: session.records,
        })
    }

    /// Start (or restart) the rest countdown. Cancels any countdown already
    /// running. No-op while idle.
    pub fn start_rest_timer(&self, duration: Duration) {
        {
            let mut guard = self.lock();
            let Some(session) = guard.as_mut() else {
                warn!("rest timer ignored: no active session");
                return;
            };
            session.rest_timer.start(duration, Instant::now());
        }
        self.spawn_rest_tick();
    }

    /// Stop the countdown without resetting it. Also cancels the tick task,
    /// so nothing keeps mutating a logically paused timer.
    pub fn pause_rest_timer(&self) {
        self.rest_tick.clear();
        if let Some(session) = self.lock().as_mut() {
            session.rest_timer.pause();
        }
    }

    /// Rewind the countdown to its full duration, leaving the running state
    /// as it is.
    pub fn reset_rest_timer(&self) {
        if let Some(session) = self.lock().as_mut() {
            session.rest_timer.reset(Instant::now());
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Cloned view of the in-progress session, if any.
    pub fn snapshot(&self) -> Option<ActiveSession> {
        self.lock().clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.lock()
            .as_ref()
            .map(|session| session.workout_timer.elapsed)
            .unwrap_or_default()
    }

    pub fn is_resting(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|session| session.rest_timer.is_running)
    }

    pub fn rest_remaining(&self) -> Duration {
        self.lock()
            .as_ref()
            .map(|session| session.rest_timer.remaining)
            .unwrap_or_default()
    }

    /// Sum of recorded weight over sets flagged completed. Reps are on
    /// purpose not part of this aggregate; the post-workout summary computes
    /// weight x reps instead, and the two have always disagreed.
    pub fn total_volume(&self) -> f64 {
        self.fold_sets(0.0, |acc, set| {
            if set.completed {
                acc + set.weight.unwrap_or(0.0)
            } else {
                acc
            }
        })
    }

    pub fn completed_exercises(&self) -> usize {
        self.lock().as_ref().map_or(0, |session| {
            session.records.iter().filter(|r| r.is_completed).count()
        })
    }

    pub fn remaining_exercises(&self) -> usize {
        self.lock().as_ref().map_or(0, |session| {
            session.records.iter().filter(|r| !r.is_completed).count()
        })
    }

    pub fn completed_sets(&self) -> usize {
        self.fold_sets(0, |acc, set| if set.completed { acc + 1 } else { acc })
    }

    pub fn remaining_sets(&self) -> usize {
        self.fold_sets(0, |acc, set| if set.completed { acc } else { acc + 1 })
    }

    fn fold_sets<T, F>(&self, init: T, fold: F) -> T
    where
        F: FnMut(T, &SetRecord) -> T,
    {
        match self.lock().as_ref() {
            Some(session) => session
                .records
                .iter()
                .flat_map(|record| record.sets.iter())
                .fold(init, fold),
            None => init,
        }
    }

    fn build_records(&self, workout: &Workout) -> Vec<ExerciseRecord> {
        workout
            .exercises
            .iter()
            .map(|planned| {
                let last = self.history.last_exercise_record(planned.exercise_id);
                let sets = (0..planned.sets as usize)
                    .map(|index| {
                        // Seed the target weight from what was actually
                        // lifted last time, set for set; fall back to plan.
                        let target_weight = last
                            .as_ref()
                            .and_then(|record| record.sets.get(index))
                            .and_then(|set| set.weight)
                            .unwrap_or(planned.weight);
                        SetRecord::planned(planned.reps, target_weight)
                    })
                    .collect();
                ExerciseRecord {
                    exercise_id: planned.exercise_id,
                    exercise_name: self.exercise_name(planned.exercise_id),
                    sets,
                    is_completed: false,
                    intensity: None,
                }
            })
            .collect()
    }

    fn exercise_name(&self, id: ExerciseId) -> String {
        self.exercises
            .exercise_by_id(id)
            .map(|exercise| exercise.name)
            .unwrap_or_else(|| format!("exercise {id}"))
    }

    fn spawn_workout_tick(&self) {
        let state = Arc::clone(&self.state);
        self.workout_tick.replace(TickHandle::spawn(TICK_PERIOD, move || {
            let mut guard = state.lock().expect("session state lock poisoned");
            match guard.as_mut() {
                Some(session) if session.workout_timer.is_running => {
                    session.workout_timer.tick(Instant::now());
                    true
                }
                // Session gone or stopped underneath us: end the task.
                _ => false,
            }
        }));
    }

    fn spawn_rest_tick(&self) {
        let state = Arc::clone(&self.state);
        self.rest_tick.replace(TickHandle::spawn(TICK_PERIOD, move || {
            let mut guard = state.lock().expect("session state lock poisoned");
            match guard.as_mut() {
                Some(session) if session.rest_timer.is_running => {
                    // tick() reports completion; the countdown stops itself.
                    !session.rest_timer.tick(Instant::now())
                }
                _ => false,
            }
        }));
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.state.lock().expect("session state lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::history::StreakPolicy;
    use crate::storage::MemoryStore;
    use tokio::time::advance;

    const BENCH: ExerciseId = 1;
    const OHP: ExerciseId = 2;
    const ROWS: ExerciseId = 3;
    const PUSH_DAY: WorkoutId = 10;

    const PLAN: &str = r#"
        [[exercise]]
        id = 1
        name = "Bench Press"
        primary_muscle = "chest"

        [[exercise]]
        id = 2
        name = "Overhead Press"
        primary_muscle = "shoulders"

        [[exercise]]
        id = 3
        name = "Barbell Row"
        primary_muscle = "back"

        [[workout]]
        id = 10
        name = "Push Day"

        [[workout.exercises]]
        exercise_id = 1
        sets = 2
        reps = 8
        weight = 60.0
        rest_secs = 90

        [[workout.exercises]]
        exercise_id = 2
        sets = 3
        reps = 10
        weight = 40.0
    "#;

    fn fixture() -> (SessionEngine, Arc<Catalog>, Arc<HistoryStore>) {
        let catalog = Arc::new(Catalog::from_toml(PLAN).unwrap());
        let history = Arc::new(HistoryStore::load(
            Arc::new(MemoryStore::default()),
            StreakPolicy::default(),
        ));
        let engine = SessionEngine::new(catalog.clone(), catalog.clone(), history.clone());
        (engine, catalog, history)
    }

    fn historical(exercise_id: ExerciseId, weights: &[f64]) -> WorkoutSession {
        WorkoutSession {
            id: "prior".to_string(),
            workout_id: PUSH_DAY,
            workout_name: "Push Day".to_string(),
            date: Local::now(),
            duration: "00:30:00".to_string(),
            entries: vec![ExerciseRecord {
                exercise_id,
                exercise_name: String::new(),
                sets: weights
                    .iter()
                    .map(|&weight| SetRecord {
                        reps: Some(8),
                        weight: Some(weight),
                        target_reps: 8,
                        target_weight: weight,
                        completed: true,
                    })
                    .collect(),
                is_completed: true,
                intensity: None,
            }],
        }
    }

    /// Let spawned tick tasks run after the paused clock moved.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_builds_one_record_per_exercise_in_plan_order() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        let session = engine.snapshot().unwrap();
        assert_eq!(session.workout_name, "Push Day");
        let ids: Vec<_> = session.records.iter().map(|r| r.exercise_id).collect();
        assert_eq!(ids, vec![BENCH, OHP]);
        assert_eq!(session.records[0].exercise_name, "Bench Press");
        assert_eq!(session.records[0].sets.len(), 2);
        assert_eq!(session.records[1].sets.len(), 3);

        let first = &session.records[0].sets[0];
        assert_eq!(first.reps, None);
        assert_eq!(first.weight, None);
        assert!(!first.completed);
        assert_eq!(first.target_reps, 8);
        assert_eq!(first.target_weight, 60.0);
        assert_eq!(session.records[1].sets[0].target_weight, 40.0);

        assert!(session.workout_timer.is_running);
        assert!(engine.workout_tick.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn start_with_unknown_workout_leaves_state_unchanged() {
        let (engine, _, _) = fixture();
        assert_eq!(
            engine.start_workout(99),
            Err(SessionError::WorkoutNotFound(99))
        );
        assert!(!engine.is_active());
        assert!(!engine.workout_tick.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn start_seeds_target_weight_from_last_performance() {
        let (engine, _, history) = fixture();
        history.add_workout_session(historical(BENCH, &[100.0]));

        engine.start_workout(PUSH_DAY).unwrap();
        let session = engine.snapshot().unwrap();

        // Set-for-set from history where available, plan weight beyond.
        assert_eq!(session.records[0].sets[0].target_weight, 100.0);
        assert_eq!(session.records[0].sets[1].target_weight, 60.0);
        assert_eq!(session.records[1].sets[0].target_weight, 40.0);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_replaces_the_previous_session() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();
        engine.update_set_input(BENCH, 0, Some(10), Some(50.0));

        engine.start_workout(PUSH_DAY).unwrap();
        let session = engine.snapshot().unwrap();
        assert_eq!(session.records[0].sets[0].reps, None);
        assert!(engine.is_active());
        assert!(engine.workout_tick.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn set_input_then_completion_counts_once_and_is_idempotent() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        engine.update_set_input(BENCH, 0, Some(10), Some(50.0));
        engine.mark_set_completed(BENCH, 0, true);
        assert_eq!(engine.completed_sets(), 1);
        assert_eq!(engine.remaining_sets(), 4);
        assert_eq!(engine.total_volume(), 50.0);

        engine.mark_set_completed(BENCH, 0, true);
        assert_eq!(engine.completed_sets(), 1);

        engine.mark_set_completed(BENCH, 0, false);
        assert_eq!(engine.completed_sets(), 0);
        assert_eq!(engine.total_volume(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn total_volume_ignores_reps_and_uncompleted_sets() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        engine.update_set_input(BENCH, 0, Some(10), Some(50.0));
        engine.mark_set_completed(BENCH, 0, true);
        // Values entered but never confirmed do not count.
        engine.update_set_input(BENCH, 1, Some(8), Some(55.0));
        // Confirmed without a recorded weight contributes nothing.
        engine.mark_set_completed(OHP, 0, true);

        assert_eq!(engine.total_volume(), 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_bounds_and_unknown_targets_are_noops() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();
        let before = engine.snapshot().unwrap().records;

        engine.update_set_input(BENCH, 9, Some(10), Some(50.0));
        engine.update_set_input(ROWS, 0, Some(10), Some(50.0));
        engine.mark_set_completed(BENCH, 9, true);
        engine.delete_set(BENCH, 9);

        assert_eq!(engine.snapshot().unwrap().records, before);
    }

    #[tokio::test(start_paused = true)]
    async fn set_input_does_not_touch_the_completed_flag() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        engine.mark_set_completed(BENCH, 0, true);
        engine.update_set_input(BENCH, 0, Some(12), Some(45.0));

        let session = engine.snapshot().unwrap();
        assert!(session.records[0].sets[0].completed);
        assert_eq!(session.records[0].sets[0].reps, Some(12));
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_set_comes_back_from_an_unedited_plan() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        engine.delete_set(BENCH, 1);
        assert_eq!(engine.snapshot().unwrap().records[0].sets.len(), 1);

        // The catalog still plans two sets, so reconciliation restores one.
        engine.on_routine_changed();
        assert_eq!(engine.snapshot().unwrap().records[0].sets.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn complete_exercise_clamps_intensity_into_range() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        engine.complete_exercise(BENCH, Some(9));
        engine.complete_exercise(OHP, None);

        let session = engine.snapshot().unwrap();
        assert!(session.records[0].is_completed);
        assert_eq!(session.records[0].intensity, Some(5));
        assert!(session.records[1].is_completed);
        assert_eq!(session.records[1].intensity, None);
        assert_eq!(engine.completed_exercises(), 2);
        assert_eq!(engine.remaining_exercises(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_always_returns_to_idle() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();
        engine.start_rest_timer(Duration::from_secs(60));

        engine.cancel_workout();
        assert!(!engine.is_active());
        assert!(engine.snapshot().is_none());
        assert_eq!(engine.elapsed(), Duration::ZERO);
        assert!(!engine.workout_tick.is_active());
        assert!(!engine.rest_tick.is_active());
        assert_eq!(engine.completed_sets(), 0);

        // Cancelling while idle stays idle.
        engine.cancel_workout();
        assert!(!engine.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn finish_snapshots_the_session_and_then_becomes_a_usage_error() {
        let (engine, _, history) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();
        engine.update_set_input(BENCH, 0, Some(8), Some(60.0));
        engine.mark_set_completed(BENCH, 0, true);

        advance(Duration::from_secs(10)).await;
        settle().await;

        let finished = engine.finish_workout().unwrap();
        assert_eq!(finished.workout_id, PUSH_DAY);
        assert_eq!(finished.workout_name, "Push Day");
        assert_eq!(finished.entries.len(), 2);
        assert_eq!(finished.duration, "00:00:10");
        assert!(finished.entries[0].sets[0].completed);

        assert!(!engine.is_active());
        assert!(!engine.workout_tick.is_active());
        assert_eq!(engine.finish_workout(), Err(SessionError::NoActiveSession));

        // Persistence is the caller's job.
        history.add_workout_session(finished);
        assert!(history.last_workout(PUSH_DAY).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn workout_tick_keeps_elapsed_current() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        settle().await;
        advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(engine.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn reconciliation_preserves_entered_sets_when_a_set_is_appended() {
        let (engine, catalog, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();
        engine.update_set_input(BENCH, 0, Some(10), Some(50.0));
        engine.mark_set_completed(BENCH, 0, true);

        let mut workout = catalog.workout_by_id(PUSH_DAY).unwrap();
        workout.exercises[0].sets = 3;
        workout.exercises[0].weight = 65.0;
        catalog.upsert_workout(workout);
        engine.on_routine_changed();

        let bench = engine.snapshot().unwrap().records[0].clone();
        assert_eq!(bench.sets.len(), 3);
        // Entered data survives by index, targets refresh from the plan.
        assert_eq!(bench.sets[0].reps, Some(10));
        assert_eq!(bench.sets[0].weight, Some(50.0));
        assert!(bench.sets[0].completed);
        assert_eq!(bench.sets[0].target_weight, 65.0);
        // The appended set starts empty with the new targets.
        assert_eq!(bench.sets[2].reps, None);
        assert!(!bench.sets[2].completed);
        assert_eq!(bench.sets[2].target_weight, 65.0);
    }

    #[tokio::test(start_paused = true)]
    async fn reconciliation_follows_the_updated_exercise_list() {
        let (engine, catalog, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();
        engine.update_set_input(OHP, 0, Some(10), Some(35.0));

        let mut workout = catalog.workout_by_id(PUSH_DAY).unwrap();
        // Bench is dropped from the plan, rows is added.
        workout.exercises.remove(0);
        workout.exercises.push(crate::models::WorkoutExercise {
            exercise_id: ROWS,
            sets: 4,
            reps: 12,
            weight: 70.0,
            rest_secs: None,
        });
        catalog.upsert_workout(workout);
        engine.on_routine_changed();

        let session = engine.snapshot().unwrap();
        let ids: Vec<_> = session.records.iter().map(|r| r.exercise_id).collect();
        assert_eq!(ids, vec![OHP, ROWS]);
        assert_eq!(session.records[0].sets[0].weight, Some(35.0));
        assert_eq!(session.records[1].exercise_name, "Barbell Row");
        assert_eq!(session.records[1].sets.len(), 4);
        assert_eq!(session.records[1].sets[0].target_weight, 70.0);
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_the_active_workout_cancels_implicitly() {
        let (engine, catalog, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        catalog.remove_workout(PUSH_DAY);
        engine.on_routine_changed();

        assert!(!engine.is_active());
        assert!(!engine.workout_tick.is_active());
        assert!(!engine.rest_tick.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn rest_timer_counts_down_and_stops_itself() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        engine.start_rest_timer(Duration::from_secs(30));
        assert!(engine.is_resting());
        assert!(engine.rest_tick.is_active());

        settle().await;
        advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(engine.rest_remaining(), Duration::from_secs(20));

        advance(Duration::from_secs(25)).await;
        settle().await;
        assert!(!engine.is_resting());
        assert_eq!(engine.rest_remaining(), Duration::ZERO);
        assert!(!engine.rest_tick.is_active());

        // The workout itself never pauses.
        assert!(engine.snapshot().unwrap().workout_timer.is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn pausing_rest_stops_the_tick_and_keeps_remaining() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();
        engine.start_rest_timer(Duration::from_secs(60));

        settle().await;
        advance(Duration::from_secs(10)).await;
        settle().await;
        engine.pause_rest_timer();

        assert!(!engine.is_resting());
        assert!(!engine.rest_tick.is_active());
        assert_eq!(engine.rest_remaining(), Duration::from_secs(50));

        // No dangling timer keeps counting after the pause.
        advance(Duration::from_secs(20)).await;
        settle().await;
        assert_eq!(engine.rest_remaining(), Duration::from_secs(50));
    }

    #[tokio::test(start_paused = true)]
    async fn resetting_rest_rewinds_a_running_countdown() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();
        engine.start_rest_timer(Duration::from_secs(60));

        advance(Duration::from_secs(20)).await;
        settle().await;
        engine.reset_rest_timer();
        assert_eq!(engine.rest_remaining(), Duration::from_secs(60));
        assert!(engine.is_resting());

        advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(engine.rest_remaining(), Duration::from_secs(50));
    }

    #[tokio::test(start_paused = true)]
    async fn starting_a_new_rest_countdown_replaces_the_old_one() {
        let (engine, _, _) = fixture();
        engine.start_workout(PUSH_DAY).unwrap();

        engine.start_rest_timer(Duration::from_secs(30));
        advance(Duration::from_secs(5)).await;
        settle().await;
        engine.start_rest_timer(Duration::from_secs(90));
        assert_eq!(engine.rest_remaining(), Duration::from_secs(90));

        settle().await;
        advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(engine.rest_remaining(), Duration::from_secs(80));
    }

    #[tokio::test(start_paused = true)]
    async fn rest_timer_without_a_session_is_a_noop() {
        let (engine, _, _) = fixture();
        engine.start_rest_timer(Duration::from_secs(30));
        assert!(!engine.is_resting());
        assert!(!engine.rest_tick.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn stats_are_zero_while_idle() {
        let (engine, _, _) = fixture();
        assert_eq!(engine.total_volume(), 0.0);
        assert_eq!(engine.completed_exercises(), 0);
        assert_eq!(engine.remaining_exercises(), 0);
        assert_eq!(engine.completed_sets(), 0);
        assert_eq!(engine.remaining_sets(), 0);
        assert_eq!(engine.elapsed(), Duration::ZERO);
        assert_eq!(engine.rest_remaining(), Duration::ZERO);
    }
}
