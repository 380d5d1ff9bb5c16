use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::catalog::{Catalog, ExerciseCatalog, PlanFile};
use crate::cli::WorkoutCmd;

pub fn handle(cmd: WorkoutCmd, catalog: &Catalog, catalog_path: &Path) -> Result<()> {
    match cmd {
        WorkoutCmd::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read plan file: {file}"))?;
            let plan: PlanFile =
                toml::from_str(&content).with_context(|| format!("invalid plan file: {file}"))?;

            let exercises = plan.exercise.len();
            let workouts = plan.workout.len();
            catalog.import(plan);
            catalog.save_file(catalog_path)?;

            println!(
                "{} imported {} exercises and {} workouts",
                "ok:".green().bold(),
                exercises,
                workouts
            );
        }

        WorkoutCmd::List => {
            let workouts = catalog.workouts();
            if workouts.is_empty() {
                println!("no workouts yet, import a plan file first");
                return Ok(());
            }
            for (i, workout) in workouts.iter().enumerate() {
                let idx = format!("{}", i + 1).yellow();
                println!(
                    "{} • {} — {} exercises",
                    idx,
                    workout.name.bold(),
                    workout.exercises.len()
                );
            }
        }

        WorkoutCmd::Show { workout } => {
            let Some(workout) = super::resolve_workout(catalog, &workout) else {
                return Ok(());
            };

            println!("{} {}", "Workout:".cyan().bold(), workout.name.bold());
            for (i, planned) in workout.exercises.iter().enumerate() {
                let idx = format!("{}", i + 1).yellow();
                let name = catalog
                    .exercise_by_id(planned.exercise_id)
                    .map(|e| e.name)
                    .unwrap_or_else(|| format!("exercise {}", planned.exercise_id));
                let mut detail = format!("{} x {}", planned.sets, planned.reps);
                if planned.weight > 0.0 {
                    detail.push_str(&format!(" @ {}kg", planned.weight));
                }
                if let Some(rest) = planned.rest_secs {
                    detail.push_str(&format!(", rest {rest}s"));
                }
                println!("{} • {} — {}", idx, name.bold(), detail);
            }
        }
    }

    Ok(())
}
