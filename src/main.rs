use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use testsight::config::{IntelConfig, LoggingConfig};
use testsight::model::{format_duration_ms, SuiteOutcome};
use testsight::storage::{HistoryStore, SqliteHistory};

#[derive(Parser)]
#[command(
    name = "testsight",
    about = "Test-result intelligence: failure grouping, flaky tests and quality trends",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (default: $TESTSIGHT_CONFIG, then ./testsight.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the history database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a suite result file and record it into history
    Analyze {
        /// Suite result as JSON
        #[arg(long)]
        input: PathBuf,

        /// Do not read or write run history
        #[arg(long)]
        no_history: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// List recently recorded runs
    History {
        /// Number of runs to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Delete history older than the given number of days
    Prune {
        #[arg(long)]
        days: u32,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Stderr logger used while the config, and so the real filter, is loading.
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

fn open_history(config: &IntelConfig) -> Result<SqliteHistory> {
    SqliteHistory::open(&config.storage.path)
        .with_context(|| format!("failed to open history at {}", config.storage.path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = tracing::subscriber::with_default(bootstrap_subscriber(), || match &cli.config {
        Some(path) => IntelConfig::load(path),
        None => Ok(IntelConfig::load_or_default()),
    })?;
    if let Some(db) = cli.db {
        config.storage.path = db;
    }
    init_tracing(&config.logging);

    match cli.command {
        Commands::Analyze {
            input,
            no_history,
            json,
        } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read suite file: {}", input.display()))?;
            let mut suite: SuiteOutcome = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse suite file: {}", input.display()))?;
            suite.recount();
            tracing::info!(input = %input.display(), specs = suite.total_specs, "Loaded suite");

            if no_history {
                config.storage.enabled = false;
            }
            let store = testsight::open_store(&config);
            let engine = testsight::IntelligenceEngine::new(config, store);
            engine.process(&mut suite).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&suite)?);
            } else {
                print_report(&suite);
            }
        }
        Commands::History { limit } => {
            let history = open_history(&config)?;
            let runs = history.recent_executions(limit)?;
            if runs.is_empty() {
                println!("No runs recorded.");
                return Ok(());
            }
            println!("{:<25} | {:>8} | {:>6} | {:>10} | Build", "Timestamp", "Success", "Failed", "Duration");
            println!("{:-<25}-|-{:-<8}-|-{:-<6}-|-{:-<10}-|-{:-<12}", "", "", "", "", "");
            for run in runs {
                println!(
                    "{:<25} | {:>7.1}% | {:>6} | {:>10} | {}",
                    run.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    run.success_rate,
                    run.failed_scenarios,
                    format_duration_ms(run.duration_ms),
                    run.metadata.build_number.as_deref().unwrap_or("-"),
                );
            }
        }
        Commands::Prune { days } => {
            let history = open_history(&config)?;
            let removed = history.cleanup(days)?;
            println!("Removed {} row(s) older than {} day(s).", removed, days);
        }
    }

    Ok(())
}

fn print_report(suite: &SuiteOutcome) {
    println!("\n{} -- test intelligence report", suite.project_name);
    println!(
        "Scenarios: {} total, {} passed, {} failed, {} skipped ({:.1}%) in {}",
        suite.total_scenarios,
        suite.passed_scenarios,
        suite.failed_scenarios,
        suite.skipped_scenarios,
        suite.success_rate,
        format_duration_ms(suite.duration_ms),
    );

    if let Some(summary) = &suite.executive_summary {
        println!("Health: {}   Trend: {}", summary.health, summary.trend);
        for insight in &summary.key_insights {
            println!("  * {}", insight);
        }
        if !summary.critical_issues.is_empty() {
            println!("\nCritical issues:");
            for issue in &summary.critical_issues {
                println!("  ! {}", issue);
            }
        }
        println!("\nRecommendation: {}", summary.recommendation);
        if let Some(narrative) = &summary.narrative {
            println!("\n{}", narrative);
        }
    }

    if let Some(groups) = suite.failure_groups.as_ref().filter(|g| !g.is_empty()) {
        println!("\n{:<18} | {:<8} | {:>5} | Root cause", "Kind", "Severity", "Count");
        println!("{:-<18}-|-{:-<8}-|-{:-<5}-|-{:-<40}", "", "", "", "");
        for group in groups {
            println!(
                "{:<18} | {:<8} | {:>5} | {}",
                group.kind.label(),
                group.severity.as_str(),
                group.count,
                group.root_cause
            );
        }
    }

    if let Some(flaky) = suite.flaky_tests.as_ref().filter(|f| !f.is_empty()) {
        println!("\nFlaky scenarios:");
        for test in flaky {
            println!(
                "  {} / {}: score {:.2}, fails {:.0}% of {} run(s)",
                test.spec_name, test.scenario_name, test.flaky_score, test.failure_rate, test.occurrences
            );
        }
    }
}
