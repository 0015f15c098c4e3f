//! Spacey CLI - Command-line interface for the activity runtime
//!
//! Provides subcommands for writing a config, printing the lesson catalog,
//! and running a session from the terminal with simulated speech and camera.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use spacey::runtime::assembly::PartId;
use spacey::runtime::content;
use spacey::runtime::driver::{Inbox, spawn_session};
use spacey::runtime::permission::DenialReason;
use spacey::runtime::reward::Certificate;
use spacey::runtime::simulated::{SimulatedCamera, SimulatedNarrator};
use spacey::runtime::stage::FlowKind;
use spacey::runtime::storage::{self, CONFIG_FILE};
use spacey::runtime::{ActivityConfig, ActivityEvent, ActivityView, Session, Stage};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "spacey")]
#[command(about = "Spacey Satellite Builder lesson runtime", long_about = None)]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Flow to configure
        #[arg(long, default_value = "guided")]
        flow: FlowKind,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print lesson sections, quiz questions, and satellite parts
    Catalog {
        /// Flow to print
        #[arg(long, default_value = "guided")]
        flow: FlowKind,
    },

    /// Run an interactive session on stdin
    Run {
        /// Override the configured flow
        #[arg(long)]
        flow: Option<FlowKind>,

        /// Simulated camera denies access
        #[arg(long)]
        deny_camera: bool,

        /// Simulated speech never reports the end of an utterance
        #[arg(long)]
        drop_speech_end: bool,

        /// Simulated speaking time per character
        #[arg(long, default_value = "20")]
        per_char_ms: u64,

        /// Write the turn transcript here on exit
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { flow, force } => {
            if cli.config.exists() && !force {
                bail!("{:?} already exists (use --force to overwrite)", cli.config);
            }
            let config = ActivityConfig {
                flow,
                ..ActivityConfig::default()
            };
            config.write(&cli.config)?;
            println!("Wrote {} flow config to {:?}", flow, cli.config);
        }

        Commands::Catalog { flow } => print_catalog(flow),

        Commands::Run {
            flow,
            deny_camera,
            drop_speech_end,
            per_char_ms,
            transcript,
        } => {
            let mut config = load_or_default(&cli.config)?;
            if let Some(flow) = flow {
                config.flow = flow;
            }
            run(config, deny_camera, drop_speech_end, per_char_ms, transcript).await?;
        }
    }

    Ok(())
}

fn load_or_default(path: &Path) -> Result<ActivityConfig> {
    if path.exists() {
        ActivityConfig::load(path)
    } else {
        Ok(ActivityConfig::default())
    }
}

fn print_catalog(flow: FlowKind) {
    let content = content::for_flow(flow);
    println!("{} ({} flow)", content.title, flow);
    println!();
    println!("Lesson:");
    for section in content.sections {
        println!("  {}. {}", section.id, section.title);
    }
    println!();
    println!("Quiz:");
    for question in content.questions {
        println!("  Q{}: {}", question.id, question.prompt);
        for option in question.options {
            let mark = if option.id == question.correct { "*" } else { " " };
            println!("     {} {}) {}", mark, option.id, option.text);
        }
    }
    if flow == FlowKind::Builder {
        println!();
        println!("Parts:");
        for part in PartId::CATALOG {
            println!("  {:<8} {}", part.as_str(), part.name());
        }
    }
}

async fn run(
    config: ActivityConfig,
    deny_camera: bool,
    drop_speech_end: bool,
    per_char_ms: u64,
    transcript: Option<PathBuf>,
) -> Result<()> {
    let inbox = Inbox::new();
    let mut narrator = SimulatedNarrator::new(inbox.sender(), Duration::from_millis(per_char_ms));
    if drop_speech_end {
        narrator = narrator.swallowing_end();
    }
    let delay = Duration::from_millis(300);
    let camera = if deny_camera {
        SimulatedCamera::denying(inbox.sender(), delay, DenialReason::NotAllowed)
    } else {
        SimulatedCamera::granting(inbox.sender(), delay)
    };

    let tick = Duration::from_millis(config.tick_ms);
    let session = Session::new(&config, Box::new(narrator), Box::new(camera));
    let handle = spawn_session(session, inbox, tick);

    let mut updates = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut last: Option<(String, String, bool)> = None;
        loop {
            let key = {
                let view = updates.borrow_and_update();
                let key = (
                    view.stage.stage.to_string(),
                    view.stage.narration.clone(),
                    view.quiz.answered,
                );
                if last.as_ref() != Some(&key) {
                    print_view(&view);
                }
                key
            };
            last = Some(key);
            if updates.changed().await.is_err() {
                break;
            }
        }
    });

    println!("Commands: continue, next, prev, select N, submit, question, place PART,");
    println!("          name NAME, launch, retry, restart, replay, camera, show, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Show) => print_view(&handle.view()),
            Ok(Command::Event(event)) => handle.send(event).await?,
            Ok(Command::Nothing) => {}
            Err(msg) => println!("? {}", msg),
        }
    }

    let turns = handle.shutdown().await?;
    printer.abort();
    println!("Session ended after {} turns", turns.len());
    if let Some(path) = transcript {
        storage::write_transcript(&path, &turns)?;
        println!("Transcript written to {:?}", path);
    }
    Ok(())
}

fn print_view(view: &ActivityView) {
    let stage = &view.stage;
    println!();
    println!("[{}] {}", stage.stage, stage.greeting);
    if !stage.narration.is_empty() {
        println!("  \"{}\"", stage.narration);
    }
    if let Some(prompt) = view.quiz.prompt.filter(|_| stage.stage == Stage::Quiz) {
        println!("  Q{}/{}: {}", view.quiz.index + 1, view.quiz.total, prompt);
        for (i, option) in view.quiz.options.iter().enumerate() {
            println!("    {}: {}", i, option.text);
        }
    }
    if let Some(feedback) = &view.quiz.feedback {
        let verdict = if feedback.correct { "Correct!" } else { "Not quite." };
        println!("  {} {}", verdict, feedback.explanation);
    }
    if let Some(message) = view.camera.message {
        println!("  camera: {}", message);
    }
    for badge in &view.badges {
        println!("  badge: {}", badge.name);
    }
    if let Some(cert) = &stage.carryover.certificate {
        println!("  {}", certificate_line(cert));
    }
}

fn certificate_line(cert: &Certificate) -> String {
    format!(
        "{} \"{}\" scored {}/{} on {}",
        cert.title(),
        cert.satellite_name,
        cert.score,
        cert.total,
        cert.formatted_date()
    )
}

enum Command {
    Event(ActivityEvent),
    Show,
    Quit,
    Nothing,
}

fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let event = match word {
        "" => return Ok(Command::Nothing),
        "quit" | "exit" => return Ok(Command::Quit),
        "show" => return Ok(Command::Show),
        "continue" | "c" => ActivityEvent::Continue,
        "next" => ActivityEvent::NextSection,
        "prev" => ActivityEvent::PreviousSection,
        "select" => ActivityEvent::SelectAnswer(
            rest.parse()
                .map_err(|_| format!("select needs an option number, got '{rest}'"))?,
        ),
        "submit" => ActivityEvent::SubmitAnswer,
        "question" | "q" => ActivityEvent::NextQuestion,
        "place" => ActivityEvent::PlacePart(rest.parse().map_err(|e| format!("{e}"))?),
        "name" => ActivityEvent::NameSatellite(rest.to_string()),
        "launch" => ActivityEvent::LaunchSatellite,
        "retry" => ActivityEvent::Retry,
        "restart" => ActivityEvent::StartOver,
        "replay" => ActivityEvent::ReplayNarration,
        "camera" => ActivityEvent::RetryCamera,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Command::Event(event))
}
