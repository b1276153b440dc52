//! tc - task card enrichment
//!
//! CLI entry point: load a task, enrich it, and print the card.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info, warn};

use taskcard::cli::{Cli, Command, generate_after_help, get_log_path};
use taskcard::config::Config;
use taskcard::{
    CardEvent, CardEventBus, CardServices, CardSettings, ChallengeState, ChallengeTimer, ChatRole, CheckIn, DisabledReasoning,
    Emotion, FacetCache, FacetKind, FacetPhase, JsonStore, LlmReasoningClient, PromptLoader, ReasoningClient, Task,
    TaskEnrichmentOrchestrator, TaskStore,
};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help(&taskcard::LlmConfig::default().api_key_env));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "TaskCard loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Show { task, offline } => cmd_show(&config, &task, offline).await,
        Command::Refresh { task, offline } => cmd_refresh(&config, &task, offline).await,
        Command::Checkin { task, emotion } => cmd_checkin(&task, emotion),
        Command::Challenge { seconds } => cmd_challenge(seconds.unwrap_or(config.challenge.total_seconds)).await,
        Command::Chat { task, offline } => cmd_chat(&config, &task, offline).await,
    }
}

/// Read a task description from YAML
fn load_task(path: &Path) -> Result<Task> {
    debug!(?path, "load_task: called");
    let content = fs::read_to_string(path).context(format!("Failed to read task file {}", path.display()))?;
    let task: Task = serde_yaml::from_str(&content).context(format!("Failed to parse task file {}", path.display()))?;
    if task.title.trim().is_empty() {
        eyre::bail!("Task in {} has an empty title", path.display());
    }
    Ok(task)
}

fn build_card(config: &Config, task: Task, offline: bool) -> Result<TaskEnrichmentOrchestrator> {
    debug!(task_id = %task.id, offline, "build_card: called");
    let reasoning: Arc<dyn ReasoningClient> = if offline {
        Arc::new(DisabledReasoning)
    } else {
        let client = LlmReasoningClient::from_config(&config.llm, PromptLoader::from_user_config())
            .with_chat_task(task.clone());
        if !client.is_ready() {
            warn!("Reasoning service not configured, using offline analysis");
        }
        Arc::new(client)
    };

    let cache = match config.cache.ttl() {
        Some(ttl) => FacetCache::with_ttl(ttl),
        None => FacetCache::new(),
    };
    let store: Arc<dyn TaskStore> = Arc::new(
        JsonStore::open(PathBuf::from(&config.storage.store_dir)).context("Failed to open task store")?,
    );

    let services = CardServices {
        cache: Arc::new(cache),
        reasoning,
        store,
        bus: CardEventBus::with_default_capacity(),
    };
    Ok(TaskEnrichmentOrchestrator::new(task, services, CardSettings::from(config)))
}

/// Trust indicator shown next to each facet heading
fn badge(phase: FacetPhase) -> String {
    match phase {
        FacetPhase::Loaded => "[AI]".green().bold().to_string(),
        FacetPhase::Fallback => "[offline]".yellow().to_string(),
        FacetPhase::Loading => "[loading]".dimmed().to_string(),
        FacetPhase::Unloaded => "[-]".dimmed().to_string(),
    }
}

fn print_card(card: &TaskEnrichmentOrchestrator) {
    let task = card.task();
    println!("{}", task.title.bold());
    println!(
        "{}",
        format!("{} | priority {} | {}", task.task_type, task.priority, task.id).dimmed()
    );
    if !task.notes.trim().is_empty() {
        println!("{}", task.notes.trim());
    }

    let strategy = card.strategy();
    println!("\n{} {}", "Strategy".cyan().bold(), badge(strategy.phase()));
    if let Some(strategy) = strategy.value() {
        println!("  {}", strategy.overview);
        for point in &strategy.key_points {
            println!("  * {}", point);
        }
        for (i, step) in strategy.steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
        if let Some(obstacles) = &strategy.obstacles {
            for obstacle in obstacles {
                println!("  ! {}", obstacle.yellow());
            }
        }
    }

    let duration = card.duration();
    println!("\n{} {}", "Duration".cyan().bold(), badge(duration.phase()));
    if let Some(estimate) = duration.value() {
        println!("  ~{} min ({} confidence)", estimate.minutes, estimate.confidence);
        if let Some(reasoning) = &estimate.reasoning {
            println!("  {}", reasoning.dimmed());
        }
    }

    println!("\n{} {}", "Checklist".cyan().bold(), badge(card.phase(FacetKind::SubTasks)));
    for subtask in card.subtasks() {
        let mark = if subtask.is_completed() { "[x]".green() } else { "[ ]".normal() };
        let minutes = subtask
            .estimated_minutes
            .map(|m| format!(" ({} min)", m))
            .unwrap_or_default();
        println!("  {} {}. {}{}", mark, subtask.order_index, subtask.title, minutes.dimmed());
    }

    let resources = card.resources();
    println!("\n{} {}", "Resources".cyan().bold(), badge(resources.phase()));
    if let Some(resources) = resources.value() {
        for resource in resources {
            println!("  - {}  {}", resource.title, format!("\"{}\"", resource.query).dimmed());
        }
    }

    let schedule = card.schedule();
    println!("\n{} {}", "When".cyan().bold(), badge(schedule.phase()));
    if let Some(slots) = schedule.value() {
        for slot in slots {
            let local = slot.at.with_timezone(&chrono::Local);
            println!(
                "  {:<5} {}  {}",
                slot.rank.to_string().bold(),
                local.format("%a %H:%M"),
                slot.reason.dimmed()
            );
        }
    }

    if card.needs_resync() {
        println!("\n{}", "Some checklist changes were not saved; they will sync on the next load".red());
    }
}

async fn cmd_show(config: &Config, path: &Path, offline: bool) -> Result<()> {
    debug!(?path, offline, "cmd_show: called");
    let card = build_card(config, load_task(path)?, offline)?;
    card.load_all().await;
    card.wait_for_sync().await;
    print_card(&card);
    Ok(())
}

async fn cmd_refresh(config: &Config, path: &Path, offline: bool) -> Result<()> {
    debug!(?path, offline, "cmd_refresh: called");
    let card = build_card(config, load_task(path)?, offline)?;
    card.load_all().await;
    card.refresh_strategy().await;
    card.wait_for_sync().await;
    print_card(&card);
    Ok(())
}

/// Check-in is a table lookup, so no card, store or reasoning client is built
fn cmd_checkin(path: &Path, emotion: Emotion) -> Result<()> {
    debug!(?path, %emotion, "cmd_checkin: called");
    let task = load_task(path)?;
    let check_in = CheckIn::from(emotion);
    println!("{} {} about {}", "Feeling".cyan().bold(), emotion, task.title.bold());
    println!("  {}", check_in.response);
    println!("  {} {}", "Try:".bold(), emotion.tiny_action());
    Ok(())
}

async fn cmd_challenge(seconds: u32) -> Result<()> {
    debug!(seconds, "cmd_challenge: called");
    let bus = CardEventBus::with_default_capacity();
    let mut events = bus.subscribe();
    let timer = ChallengeTimer::new(seconds, bus.emitter_for("challenge"));
    timer.start().context("Failed to start challenge")?;

    println!(
        "{} {} seconds. Start the tiny action now; Ctrl-C when you've done it.",
        "Go!".green().bold(),
        seconds
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                if timer.complete() {
                    let remaining = timer.snapshot().remaining_seconds;
                    println!("\n{} with {} seconds to spare", "Done early!".green().bold(), remaining);
                }
                break;
            }
            event = events.recv() => match event {
                Ok(CardEvent::ChallengeTick { remaining, .. }) => println!("  {}...", remaining.to_string().bold()),
                Ok(CardEvent::ChallengeCompleted { early: false, .. }) => {
                    println!("{}", "Time! However far you got counts.".green().bold());
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "cmd_challenge: event stream ended");
                    break;
                }
            }
        }
    }

    if timer.snapshot().state != ChallengeState::Completed {
        timer.cancel();
    }
    Ok(())
}

async fn cmd_chat(config: &Config, path: &Path, offline: bool) -> Result<()> {
    debug!(?path, offline, "cmd_chat: called");
    let card = build_card(config, load_task(path)?, offline)?;
    println!(
        "Chatting about {}. Empty line or Ctrl-D to quit.",
        card.task().title.bold()
    );

    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read input"),
        };
        if line.trim().is_empty() {
            break;
        }
        let _ = editor.add_history_entry(line.as_str());

        match card.send_chat(&line).await {
            Ok(true) => {
                let chat = card.chat();
                if let Some(reply) = chat.messages().last().filter(|m| m.role == ChatRole::Assistant) {
                    println!("{} {}", "tc>".cyan().bold(), reply.content);
                }
            }
            Ok(false) => println!("{}", "No answer right now. Try again in a moment.".yellow()),
            Err(e) => debug!(?e, "cmd_chat: message rejected"),
        }
    }

    card.teardown();
    Ok(())
}
