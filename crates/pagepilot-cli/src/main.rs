//! pagepilot CLI - web page to verified test suite
//!
//! Usage:
//!   pagepilot init                 Write a default .pagepilot/config.toml
//!   pagepilot serve                Run the WebSocket/HTTP server
//!   pagepilot run <url>            Explore, design and generate in one go
//!   pagepilot verify <file.py>     Run a local test file and parse the result
//!   pagepilot report               Print the latest report and recorded token usage

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pagepilot_agent::GeminiClient;
use pagepilot_browser::ChromeLauncher;
use pagepilot_core::config::PilotConfig;
use pagepilot_metrics::{MetricEntry, MetricPhase, MetricsStorage, ReportStore};
use pagepilot_orchestrator::{
    execute_attempt, Collaborators, Command, Orchestrator, ProgressEvent, PytestRunner,
    SessionHandle,
};
use pagepilot_server::AppState;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "pagepilot")]
#[command(author, version, about = "Explore a web page and generate a verified test suite")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root holding .pagepilot/
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Init,

    /// Serve sessions over WebSocket
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Execution attempts per generation
        #[arg(long)]
        max_rounds: Option<usize>,
    },

    /// Explore, design and generate tests for a page
    Run {
        /// Page to test
        url: String,

        /// Execution attempts per generation
        #[arg(long)]
        max_rounds: Option<usize>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Write the final test code here
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run a local pytest file and report the outcome
    Verify {
        /// Test file to run
        file: PathBuf,
    },

    /// Print the latest verification report and recorded token usage
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Init => cmd_init(&cli.root),
        Commands::Serve {
            port,
            headless,
            max_rounds,
        } => {
            let mut config = load_config(&cli.root)?;
            apply_overrides(&mut config, port, headless, max_rounds);
            cmd_serve(config).await
        }
        Commands::Run {
            url,
            max_rounds,
            headless,
            output,
        } => {
            let mut config = load_config(&cli.root)?;
            apply_overrides(&mut config, None, headless, max_rounds);
            cmd_run(config, url, output).await
        }
        Commands::Verify { file } => cmd_verify(load_config(&cli.root)?, file).await,
        Commands::Report => cmd_report(load_config(&cli.root)?).await,
    }
}

/// Load config and anchor a relative data directory at `root`
fn load_config(root: &Path) -> Result<PilotConfig> {
    let mut config = PilotConfig::load_or_default(root).context("Failed to load configuration")?;
    if config.storage.data_dir.is_relative() {
        config.storage.data_dir = root.join(&config.storage.data_dir);
    }
    Ok(config)
}

fn apply_overrides(config: &mut PilotConfig, port: Option<u16>, headless: bool, max_rounds: Option<usize>) {
    if let Some(port) = port {
        config.server.port = port;
    }
    if headless {
        config.browser.headless = true;
    }
    if let Some(max_rounds) = max_rounds {
        let defaults = &mut config.loop_defaults;
        defaults.max_rounds = max_rounds;
        defaults.max_rounds_limit = defaults.max_rounds_limit.max(max_rounds);
    }
}

fn collaborators(config: &PilotConfig) -> Result<Collaborators> {
    let client = GeminiClient::from_config(&config.provider)
        .with_context(|| format!("Set {} to use pagepilot", config.provider.api_key_env))?;

    Ok(Collaborators {
        provider: Arc::new(client),
        launcher: Arc::new(ChromeLauncher),
        runner: Arc::new(PytestRunner::new(&config.runner)),
    })
}

fn cmd_init(root: &Path) -> Result<()> {
    info!("Initializing pagepilot in {:?}", root);
    let path = PilotConfig::write_default(root)?;

    println!("Initialized pagepilot in {:?}", root);
    println!("Created:");
    println!("  {}", path.display());
    Ok(())
}

async fn cmd_serve(config: PilotConfig) -> Result<()> {
    let orchestrator = Orchestrator::new(collaborators(&config)?, &config);
    let (session, worker) = SessionHandle::spawn(orchestrator);
    let state = Arc::new(AppState {
        session,
        report_store: ReportStore::new(config.storage.report_path()),
    });

    println!(
        "pagepilot running at http://{}:{} (WebSocket: /ws)",
        config.server.host, config.server.port
    );
    println!("Press Ctrl+C to stop");

    pagepilot_server::serve(&config.server, state).await?;
    worker.abort();
    Ok(())
}

async fn cmd_run(config: PilotConfig, url: String, output: Option<PathBuf>) -> Result<()> {
    let orchestrator = Orchestrator::new(collaborators(&config)?, &config);
    let (session, worker) = SessionHandle::spawn(orchestrator);

    let commands = [
        Command::Explore { url },
        Command::Design,
        Command::Generate { max_rounds: None },
    ];

    let mut generated = None;
    for command in commands {
        let (tx, mut rx) = mpsc::unbounded_channel();
        session.submit(command, tx).await?;

        while let Some(event) = rx.recv().await {
            print_event(&event);
            match event {
                ProgressEvent::Error { message, .. } => bail!(message),
                ProgressEvent::PhaseComplete { phase, data, .. } if phase == "generation" => {
                    generated = Some(data);
                }
                _ => {}
            }
        }
    }

    // Closes the browser
    drop(session);
    worker.await?;

    let Some(data) = generated else {
        bail!("Generation produced no result");
    };
    let code = data["code"].as_str().unwrap_or_default();
    let success = data["verification"]["success"].as_bool().unwrap_or(false);

    match output {
        Some(path) => {
            tokio::fs::write(&path, code).await?;
            println!("\nTest code written to {}", path.display());
        }
        None => println!("\n{}", code),
    }

    if !success {
        bail!("Generated tests did not pass verification");
    }
    Ok(())
}

async fn cmd_verify(config: PilotConfig, file: PathBuf) -> Result<()> {
    let code = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let runner = PytestRunner::new(&config.runner);
    let report = execute_attempt(&runner, &code).await;

    let store = ReportStore::new(config.storage.report_path());
    store.save(&report).await?;

    println!("{}", report.filtered_log);
    println!("\n{}", report.summary());

    if !report.success {
        bail!("Verification failed");
    }
    Ok(())
}

async fn cmd_report(config: PilotConfig) -> Result<()> {
    let store = ReportStore::new(config.storage.report_path());
    match store.load().await? {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => println!("No verification report found at {}", store.path().display()),
    }

    let history = MetricsStorage::append_file(config.storage.metrics_path())
        .load_all()
        .await?;
    if !history.is_empty() {
        println!("\nRecorded usage ({} calls):", history.len());
        for (phase, (calls, tokens)) in usage_by_phase(&history) {
            println!("  {:<22} {:>4} calls {:>9} tokens", phase.as_str(), calls, tokens);
        }
    }
    Ok(())
}

/// Call count and token total per phase across every persisted entry
fn usage_by_phase(entries: &[MetricEntry]) -> BTreeMap<MetricPhase, (usize, u64)> {
    let mut usage = BTreeMap::new();
    for entry in entries {
        let (calls, tokens) = usage.entry(entry.phase).or_insert((0, 0));
        *calls += 1;
        *tokens += entry.token_count;
    }
    usage
}

fn print_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::PhaseStart { phase, message } => println!("[{}] {}", phase, message),
        ProgressEvent::Progress { message } => println!("  {}", message),
        ProgressEvent::PhaseComplete { phase, metrics, .. } => println!(
            "[{}] complete ({} tokens, {:.2}s)",
            phase, metrics.total_tokens, metrics.total_time
        ),
        ProgressEvent::Error { kind, message, .. } => eprintln!("error ({:?}): {}", kind, message),
        ProgressEvent::Info { message } | ProgressEvent::ChatResponse { message } => {
            println!("{}", message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "pagepilot",
            "run",
            "https://example.com",
            "--max-rounds",
            "3",
            "--headless",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                url,
                max_rounds,
                headless,
                output,
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(max_rounds, Some(3));
                assert!(headless);
                assert!(output.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_usage_by_phase() {
        let mut tracker = pagepilot_metrics::MetricsTracker::new();
        let entries = vec![
            tracker.record(MetricPhase::Generation, 2000, 3.0),
            tracker.record(MetricPhase::VerificationAttempt, 0, 1.0),
            tracker.record(MetricPhase::Generation, 500, 1.0),
        ];

        let usage = usage_by_phase(&entries);

        assert_eq!(usage[&MetricPhase::Generation], (2, 2500));
        assert_eq!(usage[&MetricPhase::VerificationAttempt], (1, 0));
        assert_eq!(usage.len(), 2);
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = PilotConfig::default();
        apply_overrides(&mut config, Some(9000), true, Some(4));

        assert_eq!(config.server.port, 9000);
        assert!(config.browser.headless);
        assert_eq!(config.loop_defaults.max_rounds, 4);

        let mut raised = PilotConfig::default();
        apply_overrides(&mut raised, None, false, Some(25));
        assert_eq!(raised.loop_defaults.max_rounds_limit, 25);

        let mut untouched = PilotConfig::default();
        apply_overrides(&mut untouched, None, false, None);
        assert_eq!(untouched.server.port, 8000);
        assert!(!untouched.browser.headless);
    }

    #[test]
    fn test_load_config_anchors_data_dir() {
        let config = load_config(Path::new("/tmp/pagepilot-project-that-does-not-exist")).unwrap();
        assert_eq!(
            config.storage.report_path(),
            PathBuf::from("/tmp/pagepilot-project-that-does-not-exist/.pagepilot/latest_verification.json")
        );
    }
}
