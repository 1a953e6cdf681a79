//! CLI binary for orbit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use orbit::config::LoggingConfig;
use orbit::skills::{AlarmClock, DesktopSkills, FileControl};
use orbit::speech::SilentCapture;
use orbit::{
    Assistant, AssistantEvent, Collaborators, KeywordClassifier, OrbitConfig, SpeechOutput,
    SpeechQueue, SpeechSynth,
};
use orbit_apps::{ApplicationRegistry, DesktopEntryProvider};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Orbit: hands-free desktop assistant core, driven from the terminal.
#[derive(Parser)]
#[command(name = "orbit", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Type commands and hear (read) the replies.
    Chat {
        /// Starting directory for file commands.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List installed applications, or rank them for a query.
    Apps {
        /// Query to resolve, as in "open <query>".
        query: Option<String>,
    },

    /// Print the effective configuration, or write it to the default path.
    Config {
        /// Write to the default config path instead of printing.
        #[arg(long)]
        write: bool,
    },
}

/// Prints sentences instead of synthesizing audio.
struct ConsoleVoice;

impl SpeechSynth for ConsoleVoice {
    fn say(&self, sentence: &str) -> orbit::Result<()> {
        println!("orbit> {sentence}");
        Ok(())
    }
}

fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("orbit={0},orbit_apps={0}", config.level))
    });

    let (file_layer, guard) = if config.file_logging {
        let appender =
            tracing_appender::rolling::daily(OrbitConfig::data_dir().join("logs"), "orbit.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        OrbitConfig::from_file(path)?
    } else {
        let default_path = OrbitConfig::default_config_path();
        if default_path.exists() {
            OrbitConfig::from_file(&default_path)?
        } else {
            OrbitConfig::default()
        }
    };

    let _log_guard = init_logging(&config.logging);

    match cli.command.unwrap_or(Command::Chat { dir: None }) {
        Command::Chat { dir } => run_chat(config, dir).await,
        Command::Apps { query } => list_apps(&config, query.as_deref()),
        Command::Config { write } => show_config(&config, write),
    }
}

fn registry(config: &OrbitConfig) -> anyhow::Result<Arc<ApplicationRegistry>> {
    Ok(Arc::new(ApplicationRegistry::new(
        Arc::new(DesktopEntryProvider::default()),
        config.apps.clone(),
    )?))
}

async fn run_chat(config: OrbitConfig, dir: Option<PathBuf>) -> anyhow::Result<()> {
    println!("Orbit v{}", env!("CARGO_PKG_VERSION"));

    let events = orbit::runtime::event_channel();
    let speech = Arc::new(SpeechQueue::new(Arc::new(ConsoleVoice), Some(events.clone()))?);

    let files = match dir {
        Some(dir) => FileControl::new(dir),
        None => FileControl::from_current_dir()?,
    };
    let ring_voice = Arc::clone(&speech);
    let alarm = AlarmClock::new(Arc::new(move |hour, minute| {
        ring_voice.speak(&format!("Your {hour:02}:{minute:02} alarm is ringing."));
    }));
    let skills = Arc::new(DesktopSkills::new(files, alarm));
    let apps = registry(&config)?;

    let assistant = Assistant::new(
        config,
        Collaborators {
            classifier: Arc::new(KeywordClassifier::default()),
            skills: Arc::clone(&skills) as Arc<dyn orbit::SkillSet>,
            registry: apps,
            capture: Arc::new(SilentCapture),
            speech: Arc::clone(&speech) as Arc<dyn SpeechOutput>,
            events,
        },
        tokio::runtime::Handle::current(),
    )?;

    let mut rx = assistant.subscribe();
    let display_skills = Arc::clone(&skills);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(AssistantEvent::Message { text }) => println!("  - {text}"),
                Ok(AssistantEvent::DirectoryChanged) => println!(
                    "  [{}]",
                    display_skills.files().current_dir().display()
                ),
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "display lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("\nType a command (\"/quit\" to exit, \"/mute\", \"/stop\", \"/replay\").\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down...");
                None
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/stop" => assistant.stop_speaking(),
            "/mute" => {
                let muted = assistant.toggle_mute();
                println!("  [{}]", if muted { "muted" } else { "unmuted" });
            }
            "/replay" => {
                if !speech.replay_last() {
                    println!("  [nothing to replay]");
                }
            }
            text => match assistant.submit_text(text) {
                Some(session) => {
                    session.join().await;
                }
                None => println!("  [busy]"),
            },
        }
        let queue = Arc::clone(&speech);
        tokio::task::spawn_blocking(move || queue.flush(Duration::from_secs(30))).await?;
    }

    assistant.shutdown();
    Ok(())
}

fn list_apps(config: &OrbitConfig, query: Option<&str>) -> anyhow::Result<()> {
    let registry = registry(config)?;
    match query {
        Some(query) => {
            let candidates = registry.find_candidates(query);
            if candidates.is_empty() {
                println!("No applications match \"{query}\".");
            }
            for (i, app) in candidates.iter().enumerate() {
                println!("{:>2}. {} ({}: {})", i + 1, app.name, app.kind, app.launch_command);
            }
        }
        None => {
            let names = registry.list_names();
            println!("{} installed applications:", names.len());
            for name in names {
                println!("  - {name}");
            }
        }
    }
    Ok(())
}

fn show_config(config: &OrbitConfig, write: bool) -> anyhow::Result<()> {
    if write {
        let path = OrbitConfig::default_config_path();
        config.save_to_file(&path)?;
        println!("Wrote {}", path.display());
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}
