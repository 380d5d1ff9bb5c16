use serde::{Deserialize, Serialize};
use chrono::{DateTime, Local};

pub type WorkoutId = i64;
pub type ExerciseId = i64;

/// One planned/performed set within an exercise during a session.
/// `reps`/`weight` stay empty until the user records a value; `completed`
/// is only set through explicit confirmation, never inferred from values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub target_reps: u32,
    pub target_weight: f64,
    pub completed: bool,
}

impl SetRecord {
    /// An untouched set carrying only its plan targets.
    pub fn planned(target_reps: u32, target_weight: f64) -> Self {
        Self {
            reps: None,
            weight: None,
            target_reps,
            target_weight,
            completed: false,
        }
    }
}

/// Live record for one exercise within the active session.
/// Created when a workout starts, mutated by set operations, and either
/// discarded on cancel or snapshotted into a `WorkoutSession` on finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub exercise_id: ExerciseId,
    /// Display name cached from the exercise catalog.
    pub exercise_name: String,
    pub sets: Vec<SetRecord>,
    pub is_completed: bool,
    /// Subjective 1-5 difficulty rating, captured on completion.
    pub intensity: Option<u8>,
}

impl ExerciseRecord {
    /// Recorded volume as weight x reps over this exercise's sets.
    pub fn volume(&self) -> f64 {
        self.sets
            .iter()
            .map(|set| set.weight.unwrap_or(0.0) * f64::from(set.reps.unwrap_or(0)))
            .sum()
    }
}

/// A finished session as appended to history. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: String,
    pub workout_id: WorkoutId,
    pub workout_name: String,
    #[serde(with = "crate::storage::tagged_date")]
    pub date: DateTime<Local>,
    /// Elapsed time at finish, already formatted as HH:MM:SS.
    pub duration: String,
    pub entries: Vec<ExerciseRecord>,
}

impl WorkoutSession {
    /// Total session volume as weight x reps over every set with recorded
    /// values. Distinct from the live-session stat, which sums weight only.
    pub fn volume(&self) -> f64 {
        self.entries.iter().map(ExerciseRecord::volume).sum()
    }
}

/// A catalog-defined movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    pub primary_muscle: String,
    pub description: Option<String>,
}

/// One exercise slot inside a planned workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub exercise_id: ExerciseId,
    pub sets: u32,
    pub reps: u32,
    /// Planned working weight in kg. Zero for bodyweight movements.
    #[serde(default)]
    pub weight: f64,
    /// Suggested rest between sets, in seconds.
    pub rest_secs: Option<u64>,
}

/// A planned training day. The routine catalog is the source of truth for
/// these; an active session only ever holds a derived snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: WorkoutId,
    pub name: String,
    pub exercises: Vec<WorkoutExercise>,
}
