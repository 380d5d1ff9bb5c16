pub mod session;
pub mod stats;
pub mod workout;

use colored::Colorize;

use crate::catalog::Catalog;
use crate::models::Workout;

/// Resolve user input to a workout: a 1-based index from `workout list` or
/// an exact name. Prints an error (with a close-name suggestion when one
/// exists) and returns `None` when nothing matches.
pub(crate) fn resolve_workout(catalog: &Catalog, input: &str) -> Option<Workout> {
    if let Ok(index) = input.parse::<usize>() {
        let workouts = catalog.workouts();
        return match index.checked_sub(1).and_then(|i| workouts.get(i)) {
            Some(workout) => Some(workout.clone()),
            None => {
                println!("{} no workout at index {}", "error:".red().bold(), input);
                None
            }
        };
    }

    if let Some(workout) = catalog.workout_by_name(input) {
        return Some(workout);
    }

    match catalog.suggest_workout(input) {
        Some(suggestion) => println!(
            "{} no workout named `{}` (did you mean `{}`?)",
            "error:".red().bold(),
            input,
            suggestion
        ),
        None => println!("{} no workout named `{}`", "error:".red().bold(), input),
    }
    None
}
