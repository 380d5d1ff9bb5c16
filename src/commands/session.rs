use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::catalog::{Catalog, RoutineCatalog};
use crate::cli::SessionCmd;
use crate::history::HistoryStore;
use crate::models::{ExerciseId, WorkoutId};
use crate::session::SessionEngine;
use crate::utils::format_duration;

pub async fn handle(
    cmd: SessionCmd,
    catalog: Arc<Catalog>,
    history: Arc<HistoryStore>,
    catalog_path: &Path,
) -> Result<()> {
    match cmd {
        SessionCmd::Start { workout } => run(&workout, catalog, history, catalog_path).await,
    }
}

/// Drive one live session: the engine ticks in the background while this
/// loop reads commands from stdin until finish or cancel.
async fn run(
    input: &str,
    catalog: Arc<Catalog>,
    history: Arc<HistoryStore>,
    catalog_path: &Path,
) -> Result<()> {
    let Some(workout) = super::resolve_workout(&catalog, input) else {
        return Ok(());
    };

    let engine = SessionEngine::new(catalog.clone(), catalog.clone(), history.clone());
    if let Err(err) = engine.start_workout(workout.id) {
        println!("{} {}", "error:".red().bold(), err);
        return Ok(());
    }

    println!(
        "{} session started — {}",
        "ok:".green().bold(),
        workout.name.bold()
    );
    print_exercises(&engine);
    println!("\ntype `help` for commands\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::Write::flush(&mut std::io::stdout())?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            &[] => {}

            &["set", exercise, set, weight, reps] => {
                let (Some(id), Some(set)) = (exercise_id_at(&engine, exercise), index(set))
                else {
                    continue;
                };
                let (Ok(weight), Ok(reps)) = (weight.parse::<f64>(), reps.parse::<u32>()) else {
                    println!("{} usage: set <exercise> <set> <weight> <reps>", "error:".red().bold());
                    continue;
                };
                engine.update_set_input(id, set - 1, Some(reps), Some(weight));
                println!("{} logged {}kg x {}", "ok:".green().bold(), weight, reps);
            }

            &["done", exercise, set] | &["undone", exercise, set] => {
                let completed = tokens[0] == "done";
                let (Some(id), Some(set)) = (exercise_id_at(&engine, exercise), index(set))
                else {
                    continue;
                };
                engine.mark_set_completed(id, set - 1, completed);
                println!(
                    "{} set {} marked {}",
                    "ok:".green().bold(),
                    set,
                    if completed { "done" } else { "not done" }
                );
            }

            &["delete", exercise, set] => {
                let (Some(id), Some(set)) = (exercise_id_at(&engine, exercise), index(set))
                else {
                    continue;
                };
                engine.delete_set(id, set - 1);
                // The engine only edits its own record; shrink the plan too,
                // or the next reconciliation resurrects the set.
                shrink_plan(&catalog, workout.id, id, catalog_path);
                engine.on_routine_changed();
                println!("{} set {} deleted", "ok:".green().bold(), set);
            }

            &["complete", exercise] | &["complete", exercise, _] => {
                let Some(id) = exercise_id_at(&engine, exercise) else {
                    continue;
                };
                let intensity = tokens.get(2).and_then(|t| t.parse::<u8>().ok());
                engine.complete_exercise(id, intensity);
                println!("{} exercise completed", "ok:".green().bold());
            }

            &["rest", secs] => match secs.parse::<u64>() {
                Ok(secs) => {
                    engine.start_rest_timer(Duration::from_secs(secs));
                    println!("{} resting {}s", "ok:".green().bold(), secs);
                }
                Err(_) => println!("{} usage: rest <seconds>", "error:".red().bold()),
            },

            &["pause"] => {
                engine.pause_rest_timer();
                println!(
                    "{} rest paused at {}s",
                    "ok:".green().bold(),
                    engine.rest_remaining().as_secs()
                );
            }

            &["reset"] => {
                engine.reset_rest_timer();
                println!("{} rest timer reset", "ok:".green().bold());
            }

            &["status"] => print_status(&engine),

            &["finish"] => {
                match engine.finish_workout() {
                    Ok(session) => {
                        println!(
                            "{} finished {} in {} — {:.1}kg total volume",
                            "ok:".green().bold(),
                            session.workout_name.bold(),
                            session.duration,
                            session.volume()
                        );
                        history.add_workout_session(session);
                    }
                    Err(err) => println!("{} {}", "error:".red().bold(), err),
                }
                break;
            }

            &["cancel"] => {
                engine.cancel_workout();
                println!("{} session cancelled, nothing saved", "ok:".green().bold());
                break;
            }

            &["help"] => print_help(),

            _ => println!(
                "{} unknown command, type `help`",
                "error:".red().bold()
            ),
        }
    }

    Ok(())
}

/// Map a 1-based display index onto the current record's exercise id.
fn exercise_id_at(engine: &SessionEngine, token: &str) -> Option<ExerciseId> {
    let position = index(token)?;
    let id = engine
        .snapshot()
        .and_then(|session| session.records.get(position - 1).map(|r| r.exercise_id));
    if id.is_none() {
        println!("{} no exercise at index {}", "error:".red().bold(), position);
    }
    id
}

fn index(token: &str) -> Option<usize> {
    match token.parse::<usize>() {
        Ok(value) if value >= 1 => Some(value),
        _ => {
            println!("{} expected a number >= 1, got `{}`", "error:".red().bold(), token);
            None
        }
    }
}

fn shrink_plan(catalog: &Catalog, workout_id: WorkoutId, exercise_id: ExerciseId, path: &Path) {
    let Some(mut workout) = catalog.workout_by_id(workout_id) else {
        return;
    };
    if let Some(planned) = workout
        .exercises
        .iter_mut()
        .find(|e| e.exercise_id == exercise_id)
    {
        planned.sets = planned.sets.saturating_sub(1);
    }
    catalog.upsert_workout(workout);
    if let Err(err) = catalog.save_file(path) {
        warn!(%err, "failed to persist plan edit");
    }
}

fn print_exercises(engine: &SessionEngine) {
    let Some(session) = engine.snapshot() else {
        return;
    };
    println!("\n{}", "Exercises:".cyan().bold());
    for (i, record) in session.records.iter().enumerate() {
        let idx = format!("{}", i + 1).yellow();
        let targets = record
            .sets
            .first()
            .map(|set| format!("{} x {} @ {}kg", record.sets.len(), set.target_reps, set.target_weight))
            .unwrap_or_else(|| "no sets planned".to_string());
        println!("{} • {} — {}", idx, record.exercise_name.bold(), targets);
    }
}

fn print_status(engine: &SessionEngine) {
    let Some(session) = engine.snapshot() else {
        println!("{} no active session", "error:".red().bold());
        return;
    };

    println!(
        "{} {} — elapsed {}",
        "Session:".cyan().bold(),
        session.workout_name.bold(),
        format_duration(engine.elapsed())
    );
    if engine.is_resting() {
        println!("resting, {}s left", engine.rest_remaining().as_secs());
    }
    println!(
        "sets {}/{} done — exercises {}/{} done — {:.1}kg volume",
        engine.completed_sets(),
        engine.completed_sets() + engine.remaining_sets(),
        engine.completed_exercises(),
        engine.completed_exercises() + engine.remaining_exercises(),
        engine.total_volume()
    );

    for (i, record) in session.records.iter().enumerate() {
        let idx = format!("{}", i + 1).yellow();
        let done = record.sets.iter().filter(|set| set.completed).count();
        let mark = if record.is_completed { " ✓" } else { "" };
        println!(
            "{} • {} [{}/{}]{}",
            idx,
            record.exercise_name.bold(),
            done,
            record.sets.len(),
            mark.green()
        );
    }
}

fn print_help() {
    println!("  set <exercise> <set> <weight> <reps>  log a set");
    println!("  done <exercise> <set>                 mark a set completed");
    println!("  undone <exercise> <set>               unmark a set");
    println!("  delete <exercise> <set>               remove a set (also shrinks the plan)");
    println!("  complete <exercise> [intensity 1-5]   finish an exercise");
    println!("  rest <seconds> | pause | reset        rest timer");
    println!("  status                                show progress");
    println!("  finish | cancel                       end the session");
}
