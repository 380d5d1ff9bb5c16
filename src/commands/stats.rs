use anyhow::Result;
use colored::Colorize;

use crate::history::HistoryStore;

pub fn handle(history: &HistoryStore) -> Result<()> {
    if history.total_sessions() == 0 {
        println!("no finished sessions yet");
        return Ok(());
    }

    println!("{}", "Training stats:".cyan().bold());
    println!("  sessions:     {}", history.total_sessions());
    println!("  total weight: {:.1}kg", history.total_weight_lifted());
    println!("  streak:       {}", history.current_streak());

    if let Some(last) = history.last_session() {
        println!(
            "\n{} {} — {} ({})",
            "Last session:".cyan().bold(),
            last.workout_name.bold(),
            last.date.format("%Y-%m-%d %H:%M"),
            last.duration
        );
        for entry in &last.entries {
            let done = entry.sets.iter().filter(|set| set.completed).count();
            println!(
                "  • {} — {}/{} sets, {:.1}kg volume",
                entry.exercise_name.bold(),
                done,
                entry.sets.len(),
                entry.volume()
            );
        }
        println!("  session volume: {:.1}kg", last.volume());
    }

    Ok(())
}
