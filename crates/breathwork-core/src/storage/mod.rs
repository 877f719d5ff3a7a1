mod config;
pub mod database;

pub use config::{AmbientConfig, Config, LoggingConfig, SessionConfig, VoiceConfig};
pub use database::Database;

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `BREATHWORK_HOME` overrides the location outright. Otherwise the directory
/// is `~/.config/breathwork[-dev]/`; set `BREATHWORK_ENV=dev` for the
/// development one.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("BREATHWORK_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("BREATHWORK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("breathwork-dev")
            } else {
                base_dir.join("breathwork")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
