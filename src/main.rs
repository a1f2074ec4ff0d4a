//! redisdump - Redis keyspace export
//!
//! Writes every key matching a pattern as replayable `redis-cli` commands.
//!
//! # Usage
//!
//! ```bash
//! # Everything, into ./data/dump (<date>).redis
//! redisdump --url redis://localhost:6379
//!
//! # Only user keys, with expiries, into a chosen file
//! redisdump 'user:*' --with-ttl -o users.redis
//!
//! # Replay
//! redis-cli < users.redis
//! ```

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};

use redisdump::cli::CliInterface;
use redisdump::connection::ConnectionManager;
use redisdump::error::Result;
use redisdump::export::{
    Checkpoint, CheckpointFile, ExportCoordinator, ExportResult, FileSink, OutputMode,
    ProgressTracker, open_output, truncate_output,
};

/// Exit code after Ctrl+C, as a shell reports SIGINT
const EXIT_CANCELLED: i32 = 130;

/// Application entry point
#[tokio::main]
async fn main() {
    match run().await {
        Ok(Some(result)) if result.cancelled => std::process::exit(EXIT_CANCELLED),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle early-exit actions
/// 4. Connect and run the export
///
/// # Returns
/// * `Result<Option<ExportResult>>` - Export statistics, `None` when no export ran
async fn run() -> Result<Option<ExportResult>> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_early_exit()? {
        return Ok(None);
    }

    let result = run_export(&cli).await?;
    print_summary(&cli, &result);
    Ok(Some(result))
}

/// Connect, open the output and drive the export to completion or cancellation
async fn run_export(cli: &CliInterface) -> Result<ExportResult> {
    let config = cli.config();
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let default_output = cli.output_path(&today);
    let checkpoint_file = CheckpointFile::in_dir(&cli.checkpoint_dir(&default_output));

    let resume = if cli.args().resume {
        load_checkpoint(&checkpoint_file, &config.export.pattern).await?
    } else {
        None
    };

    if !cli.args().quiet {
        eprintln!("Connecting to: {}", cli.sanitized_url());
    }
    let mut manager = ConnectionManager::new(config.connection.clone(), config.request_timeout());
    let mut store = manager.connect().await?;

    let (output, sink) = open_sink(cli, default_output, resume.as_ref()).await?;
    info!("Writing to {}", output.display());

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    let ctrl_c_handle = tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for Ctrl+C: {}", err);
            return;
        }
        ctrl_c_token.cancel();
        // A second Ctrl+C while the run winds down exits immediately.
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(EXIT_CANCELLED);
        }
    });

    let tracker = ProgressTracker::new(config.export.progress);
    let mut coordinator =
        ExportCoordinator::new(&mut store, config.export_options(), tracker, Box::new(sink))
            .with_cancellation(cancel_token);
    if config.export.checkpoint {
        coordinator = coordinator.with_checkpoint(checkpoint_file, output.clone());
    }
    if let Some(checkpoint) = &resume {
        coordinator = coordinator.resume_from(checkpoint);
    }

    let outcome = coordinator.execute().await;
    ctrl_c_handle.abort();

    let result = outcome?;
    if result.cancelled && !cli.args().quiet {
        eprintln!("Export cancelled; continue with --resume");
    }
    if !cli.args().quiet {
        eprintln!("Output: {}", output.display());
    }
    Ok(result)
}

/// Load and check the checkpoint for `--resume`
async fn load_checkpoint(file: &CheckpointFile, pattern: &str) -> Result<Option<Checkpoint>> {
    match file.load().await? {
        Some(checkpoint) => {
            checkpoint.ensure_matches(pattern)?;
            info!(
                "Resuming at cursor {} after {} keys",
                checkpoint.cursor, checkpoint.keys_visited
            );
            Ok(Some(checkpoint))
        }
        None => {
            warn!(
                "No checkpoint at {}, starting a fresh export",
                file.path().display()
            );
            Ok(None)
        }
    }
}

/// Open the dump file, cutting it back to the checkpoint when resuming
async fn open_sink(
    cli: &CliInterface,
    default_output: PathBuf,
    resume: Option<&Checkpoint>,
) -> Result<(PathBuf, FileSink)> {
    match resume {
        Some(checkpoint) => {
            truncate_output(&checkpoint.output, checkpoint.output_len).await?;
            let sink = open_output(&checkpoint.output, OutputMode::Append).await?;
            Ok((checkpoint.output.clone(), sink))
        }
        None => {
            let sink = open_output(&default_output, cli.config().export.mode).await?;
            Ok((default_output, sink))
        }
    }
}

/// Print the run summary unless quiet
fn print_summary(cli: &CliInterface, result: &ExportResult) {
    if cli.args().quiet {
        return;
    }
    println!(
        "Exported {} keys ({} skipped): {} lines, {} bytes in {} ms",
        result.keys_visited,
        result.keys_skipped,
        result.lines_written,
        result.bytes_written,
        result.elapsed_ms
    );
}

/// Initialize logging system based on verbosity level
///
/// Logs go to stderr so they never mix with anything printed on stdout.
fn initialize_logging(cli: &CliInterface) {
    let level: Level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
