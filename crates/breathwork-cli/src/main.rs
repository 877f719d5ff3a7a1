use breathwork_core::Config;
use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "breathwork-cli", version, about = "Breathwork CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Guided breathing sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Built-in breathing patterns
    Patterns {
        #[command(subcommand)]
        action: commands::catalog::PatternsAction,
    },
    /// Ambient soundscapes
    Sounds {
        #[command(subcommand)]
        action: commands::catalog::SoundsAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    logging::init(&config.logging.level);

    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action, &config),
        Commands::Patterns { action } => commands::catalog::run_patterns(action),
        Commands::Sounds { action } => commands::catalog::run_sounds(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
