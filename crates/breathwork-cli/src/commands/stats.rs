use breathwork_core::{Database, SessionRecorder};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Aggregate totals
    Show,
    /// Recorded sessions, newest first
    Sessions {
        /// Maximum number of sessions to print
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let recorder = SessionRecorder::new(Box::new(Database::open()?));

    match action {
        StatsAction::Show => {
            let stats = recorder.stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Sessions { limit } => {
            let sessions: Vec<_> = recorder.sessions().into_iter().rev().take(limit).collect();
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
