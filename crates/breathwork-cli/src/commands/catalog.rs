use breathwork_core::catalog::{patterns, AMBIENT_SOUNDS};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum PatternsAction {
    /// List built-in patterns
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SoundsAction {
    /// List ambient sounds
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run_patterns(action: PatternsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PatternsAction::List { json } => {
            let patterns = patterns();
            if json {
                println!("{}", serde_json::to_string_pretty(&patterns)?);
                return Ok(());
            }
            for p in &patterns {
                println!(
                    "{:<10} {:<9} {:>3}s  {}",
                    p.id,
                    p.timing_label(),
                    p.cycle_secs(),
                    p.name
                );
                if !p.description.is_empty() {
                    println!("{:<25}{}", "", p.description);
                }
            }
        }
    }
    Ok(())
}

pub fn run_sounds(action: SoundsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SoundsAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&AMBIENT_SOUNDS[..])?);
                return Ok(());
            }
            for sound in &AMBIENT_SOUNDS {
                println!("{} {:<11} {}", sound.emoji, sound.id.as_str(), sound.name);
            }
        }
    }
    Ok(())
}
