use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ironlog", version, about = "CLI workout tracker")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Workout plan management
    #[command(subcommand, visible_alias = "w")]
    Workout(WorkoutCmd),

    /// Run a live training session
    #[command(subcommand, visible_alias = "s")]
    Session(SessionCmd),

    /// Show training history and aggregates
    Stats,
}

#[derive(Subcommand)]
pub enum WorkoutCmd {
    /// Import exercises and workouts from a TOML plan file
    #[command(visible_alias = "i")]
    Import {
        /// Path to the plan file
        file: String,
    },

    /// List workouts in the catalog
    #[command(visible_alias = "l")]
    List,

    /// Show a single workout in detail
    #[command(visible_alias = "s")]
    Show {
        /// Workout index (from `workout list`) or exact name
        workout: String,
    },
}

#[derive(Subcommand)]
pub enum SessionCmd {
    /// Start a session and drive it interactively
    #[command(visible_alias = "s")]
    Start {
        /// Workout index (from `workout list`) or exact name
        workout: String,
    },
}
