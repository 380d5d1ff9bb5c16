use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::models::{Exercise, ExerciseId, Workout, WorkoutId};

/// Routine-catalog contract consumed by the session engine. The catalog is
/// the source of truth for planned workouts and may change mid-session; the
/// owner reports mutations by calling `SessionEngine::on_routine_changed`.
pub trait RoutineCatalog: Send + Sync {
    fn workout_by_id(&self, id: WorkoutId) -> Option<Workout>;
}

/// Exercise-catalog contract, used to denormalize display names into
/// session records.
pub trait ExerciseCatalog: Send + Sync {
    fn exercise_by_id(&self, id: ExerciseId) -> Option<Exercise>;
}

/// Shape of a TOML plan file: one table array per section.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub exercise: Vec<Exercise>,
    #[serde(default)]
    pub workout: Vec<Workout>,
}

#[derive(Default)]
struct CatalogInner {
    exercises: Vec<Exercise>,
    workouts: Vec<Workout>,
}

/// In-memory catalog of exercises and workouts, loadable from TOML plan
/// files. Implements both catalog contracts.
#[derive(Default)]
pub struct Catalog {
    inner: Mutex<CatalogInner>,
}

impl Catalog {
    pub fn from_toml(content: &str) -> Result<Self> {
        let plan: PlanFile = toml::from_str(content).context("invalid plan file")?;
        let catalog = Self::default();
        catalog.import(plan);
        Ok(catalog)
    }

    /// Load a catalog from a plan file. A missing file yields an empty
    /// catalog so first runs work before anything was imported.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan file: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid plan file: {}", path.display()))
    }

    pub fn save_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let inner = self.lock();
        let plan = PlanFile {
            exercise: inner.exercises.clone(),
            workout: inner.workouts.clone(),
        };
        drop(inner);
        let content = toml::to_string_pretty(&plan).context("failed to serialize plan")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write plan file: {}", path.display()))
    }

    /// Merge a plan file into the catalog, upserting by id.
    pub fn import(&self, plan: PlanFile) {
        let mut inner = self.lock();
        for exercise in plan.exercise {
            match inner.exercises.iter_mut().find(|e| e.id == exercise.id) {
                Some(existing) => *existing = exercise,
                None => inner.exercises.push(exercise),
            }
        }
        for workout in plan.workout {
            match inner.workouts.iter_mut().find(|w| w.id == workout.id) {
                Some(existing) => *existing = workout,
                None => inner.workouts.push(workout),
            }
        }
    }

    pub fn exercises(&self) -> Vec<Exercise> {
        self.lock().exercises.clone()
    }

    pub fn workouts(&self) -> Vec<Workout> {
        self.lock().workouts.clone()
    }

    pub fn workout_by_name(&self, name: &str) -> Option<Workout> {
        let name = name.to_ascii_lowercase();
        self.lock()
            .workouts
            .iter()
            .find(|w| w.name.to_ascii_lowercase() == name)
            .cloned()
    }

    pub fn upsert_workout(&self, workout: Workout) {
        let mut inner = self.lock();
        match inner.workouts.iter_mut().find(|w| w.id == workout.id) {
            Some(existing) => *existing = workout,
            None => inner.workouts.push(workout),
        }
    }

    pub fn remove_workout(&self, id: WorkoutId) -> bool {
        let mut inner = self.lock();
        let before = inner.workouts.len();
        inner.workouts.retain(|w| w.id != id);
        inner.workouts.len() != before
    }

    /// Return the closest workout name for `input` if the match is strong
    /// *and* clearly better than the runner-up. Otherwise `None` (no
    /// suggestion shown).
    pub fn suggest_workout(&self, input: &str) -> Option<String> {
        const MIN_SCORE: f64 = 0.80;
        const GAP: f64 = 0.02;

        let input = input.to_ascii_lowercase();
        let inner = self.lock();

        let mut scores: Vec<(&str, f64)> = inner
            .workouts
            .iter()
            .map(|w| {
                (
                    w.name.as_str(),
                    jaro_winkler(&input, &w.name.to_ascii_lowercase()),
                )
            })
            .collect();

        // Highest score first.
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("scores are finite"));

        let (best, best_score) = *scores.first()?;
        let second_score = scores.get(1).map(|(_, s)| *s).unwrap_or(0.0);

        if best_score >= MIN_SCORE && best_score - second_score >= GAP {
            Some(best.to_string())
        } else {
            None
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogInner> {
        self.inner.lock().expect("catalog lock poisoned")
    }
}

impl RoutineCatalog for Catalog {
    fn workout_by_id(&self, id: WorkoutId) -> Option<Workout> {
        self.lock().workouts.iter().find(|w| w.id == id).cloned()
    }
}

impl ExerciseCatalog for Catalog {
    fn exercise_by_id(&self, id: ExerciseId) -> Option<Exercise> {
        self.lock().exercises.iter().find(|e| e.id == id).cloned()
    }
}
