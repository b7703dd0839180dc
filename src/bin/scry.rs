//! CLI binary for scry.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scry::cache::{self, CacheManager};
use scry::{Pipeline, RunReport, ScryConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Scry: turn a research topic into a cited Markdown answer.
#[derive(Parser)]
#[command(name = "scry", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Research a topic and write the answer into the cache.
    Research {
        /// Topic to research; multiple words are joined with spaces.
        #[arg(required = true)]
        topic: Vec<String>,
    },

    /// Show cache usage per topic.
    CacheInfo,

    /// Delete cached research data (expired entries unless --all).
    CacheClear {
        /// Remove everything, not only expired entries.
        #[arg(long, conflicts_with = "expired")]
        all: bool,

        /// Remove only entries older than the configured maximum age.
        /// This is the default.
        #[arg(long)]
        expired: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config. Environment always wins, also over an explicit file.
    let config = match cli.config {
        Some(ref path) => {
            let mut config = ScryConfig::from_file(path)?;
            config.apply_env_overrides();
            config
        }
        None => ScryConfig::load()?,
    };

    let _log_guard = init_tracing(&config);

    match cli.command {
        Command::Research { topic } => run_research(config, topic.join(" ")).await,
        Command::CacheInfo => show_cache_info(&config),
        Command::CacheClear { all, expired: _ } => clear_cache(&config, all),
    }
}

/// Initialize tracing: console on stderr plus a daily-rotated file in the
/// log directory. Users can override the filter with RUST_LOG. The
/// returned guard must stay alive until exit so buffered file output is
/// flushed.
fn init_tracing(config: &ScryConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scry=info,scry_search=warn"));

    let log_dir = config
        .log
        .dir
        .clone()
        .unwrap_or_else(scry::scry_dirs::logs_dir);
    let (file_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
                &log_dir,
                "scry.log",
            ));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "warning: cannot create log directory {}: {e}",
                log_dir.display()
            );
            (None, None)
        }
    };

    // Console output goes to stderr so stdout carries only the result
    // summary.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    guard
}

async fn run_research(config: ScryConfig, topic: String) -> anyhow::Result<()> {
    println!("Scry v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = Pipeline::from_config(config)?;

    // Handle Ctrl+C: stop issuing new calls and wrap up with whatever has
    // been gathered.
    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, wrapping up...");
            cancel.cancel();
        }
    });

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("researching: {topic}"));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = pipeline.run(&topic).await;
    spinner.finish_and_clear();

    let report = outcome?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("\nAnswer: {}", report.answer_path.display());
    println!(
        "Sub-queries: {}  Search queries: {}  Results: {} ({} duplicates dropped)",
        report.sub_queries, report.search_queries, report.results_found, report.duplicates_dropped,
    );
    println!(
        "Documents: {}  Summaries: {}  Sources cited: {}",
        report.documents_fetched, report.summaries_written, report.sources_cited,
    );
    if report.cancelled {
        println!("Cancelled: the answer covers what was gathered before the interrupt.");
    }
    if report.fallback_answer {
        println!("Synthesis was unavailable; the answer concatenates the collected summaries.");
    }
    if !report.failures.is_empty() {
        println!(
            "{} degraded item(s); see the log for details.",
            report.failures.len()
        );
    }
}

fn cache_manager(config: &ScryConfig) -> CacheManager {
    let root = config
        .cache
        .root
        .clone()
        .unwrap_or_else(scry::scry_dirs::cache_dir);
    CacheManager::new(root, config.cache.max_age_days)
}

fn show_cache_info(config: &ScryConfig) -> anyhow::Result<()> {
    let info = cache_manager(config).info()?;
    println!("Cache root: {}", info.root.display());
    if info.topics.is_empty() {
        println!("Cache is empty.");
        return Ok(());
    }

    println!(
        "{} topic(s), {} file(s), {}\n",
        info.topics.len(),
        info.total_files,
        cache::human_size(info.total_size_bytes),
    );
    for topic in &info.topics {
        let age = topic
            .last_modified
            .and_then(|modified| modified.elapsed().ok())
            .map_or_else(|| "unknown age".to_owned(), format_age);
        let answer = if topic.has_answer { "answered" } else { "partial" };
        println!(
            "  {}\t{} file(s), {}, {age}, {answer}",
            topic.name,
            topic.files,
            cache::human_size(topic.size_bytes),
        );
    }
    Ok(())
}

fn clear_cache(config: &ScryConfig, all: bool) -> anyhow::Result<()> {
    let removed = cache_manager(config).clear(!all)?;
    let what = if all { "cached" } else { "expired" };
    println!("Removed {removed} {what} file(s).");
    Ok(())
}

/// Render an elapsed duration coarsely, e.g. `3d ago` or `2h ago`.
fn format_age(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 24 * 60 * 60 {
        format!("{}d ago", secs / (24 * 60 * 60))
    } else if secs >= 60 * 60 {
        format!("{}h ago", secs / (60 * 60))
    } else if secs >= 60 {
        format!("{}m ago", secs / 60)
    } else {
        "just now".to_owned()
    }
}
