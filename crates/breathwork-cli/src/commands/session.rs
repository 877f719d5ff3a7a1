use breathwork_core::{
    run_session, run_to_completion, AmbientSoundId, AudioDevice, Config, ConsoleSpeech, Database,
    EngineDeps, Event, FileNarrationLibrary, KeyValueStore, MemoryStore, PatternId,
    PresentationFrame, RunOutcome, SessionEngine, SilentSpeech, SpeechSynthesizer, View, VoiceMode,
};
use clap::{Args, Subcommand};
use tokio::sync::watch;
use tracing::warn;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a guided session in the terminal
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Pattern id (box, 4-7-8, coherent, sos)
    #[arg(long)]
    pattern: Option<PatternId>,
    /// Target duration in seconds
    #[arg(long)]
    duration: Option<u64>,
    /// Voice mode (prerecorded, synthesized, off)
    #[arg(long)]
    voice: Option<VoiceMode>,
    /// Ambient sound id
    #[arg(long)]
    ambient: Option<AmbientSoundId>,
    /// Presentation view (compact, immersive)
    #[arg(long)]
    view: Option<View>,
    /// Print one JSON frame per tick and a JSON summary
    #[arg(long)]
    json: bool,
    /// Seed for the ambient textures
    #[arg(long)]
    seed: Option<u64>,
    /// Tick without waiting a second between ticks
    #[arg(long)]
    instant: bool,
}

pub fn run(action: SessionAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run(args) => run_guided(args, config),
    }
}

fn run_guided(args: RunArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let pattern = args.pattern.unwrap_or(config.session.pattern).pattern();
    let duration = args.duration.unwrap_or(config.session.target_duration_secs);
    let view = args.view.unwrap_or(config.session.view);
    let json = args.json;

    // JSON output stays machine-readable: announcements are not printed.
    let speech: Box<dyn SpeechSynthesizer> = if json {
        Box::new(SilentSpeech)
    } else {
        Box::new(ConsoleSpeech::stdout())
    };

    let mut engine = SessionEngine::new(EngineDeps {
        device: AudioDevice::new(config.ambient.sample_rate),
        speech,
        narration: Box::new(FileNarrationLibrary::new(config.narration_dir())),
        store: open_store(),
        ambient_seed: args.seed.or(config.ambient.seed),
        voice_mode: args.voice.unwrap_or(config.voice.mode),
        ambient_sound: args.ambient.unwrap_or(config.ambient.sound),
    });
    engine.start(pattern, duration)?;
    print_frame(&engine.frame(view), json);

    let on_tick = |engine: &SessionEngine, _: &[Event]| print_frame(&engine.frame(view), json);
    let outcome = if args.instant {
        run_to_completion(&mut engine, on_tick)
    } else {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async {
            let (cancel_tx, cancel_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = cancel_tx.send(true);
                }
            });
            run_session(&mut engine, cancel_rx, on_tick).await
        })
    };

    print_summary(&outcome, json)?;
    engine.teardown();
    Ok(())
}

/// The session log, or a throwaway store when the database cannot be opened.
fn open_store() -> Box<dyn KeyValueStore> {
    match Database::open() {
        Ok(db) => Box::new(db),
        Err(err) => {
            warn!(%err, "session will not be saved");
            Box::new(MemoryStore::default())
        }
    }
}

fn print_frame(frame: &PresentationFrame, json: bool) {
    if !json {
        println!("{}", frame.render_line());
        return;
    }
    match serde_json::to_string(frame) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(%err, "failed to encode frame"),
    }
}

fn print_summary(outcome: &RunOutcome, json: bool) -> Result<(), serde_json::Error> {
    let label = match outcome {
        RunOutcome::Completed(_) => "completed",
        RunOutcome::Cancelled(_) => "cancelled",
    };
    if json {
        let summary = serde_json::json!({
            "outcome": label,
            "record": outcome.record(),
        });
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    match outcome.record() {
        Some(record) => println!(
            "Session {label}: {} breaths in {}s ({})",
            record.breaths, record.duration, record.pattern_name
        ),
        None => println!("Session {label}: too short to record"),
    }
    Ok(())
}
