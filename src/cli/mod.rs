//! Command-line interface for redisdump
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Applying argument overrides on top of the configuration
//! - Early-exit actions (`--completions`, `--show-config`)

use std::path::{Path, PathBuf};

use clap::Parser;
use clap_complete::Shell;

use crate::config::{Config, LogLevel};
use crate::connection::sanitize_url;
use crate::error::Result;
use crate::export::OutputMode;

pub mod completion;

/// Dump a Redis keyspace as replayable redis-cli commands
#[derive(Parser, Debug)]
#[command(
    name = "redisdump",
    version,
    about = "Export Redis keys as replayable redis-cli commands",
    long_about = "Walks the keyspace with SCAN and writes every matching key as commands
(SET, RPUSH, SADD, ZADD, HSET, JSON.SET) that redis-cli can feed back to a server."
)]
pub struct CliArgs {
    /// Glob pattern selecting the keys to export
    #[arg(value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Server URL
    ///
    /// Format: redis://[user:password@]host[:port][/db]
    #[arg(long, value_name = "URL", env = "REDIS_URL")]
    pub url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Keys requested per SCAN round-trip (a hint to the server)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,

    /// Output file (default: <data-dir>/dump (<date>).redis)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory receiving dump files; must already exist
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Append to the output file instead of truncating it
    #[arg(long)]
    pub append: bool,

    /// Emit PEXPIRE lines for keys with a time to live
    #[arg(long)]
    pub with_ttl: bool,

    /// Continue an interrupted export from its checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Hide the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Quiet mode (errors only, no summary)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Generate shell completion script and exit
    #[arg(long, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and apply argument overrides
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Validated configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_connection_args(config, args);
        Self::apply_export_args(config, args);
        Self::apply_logging_args(config, args);
    }

    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        if let Some(url) = &args.url {
            config.connection.url = url.clone();
        }
    }

    fn apply_export_args(config: &mut Config, args: &CliArgs) {
        let export = &mut config.export;
        if let Some(pattern) = &args.pattern {
            export.pattern = pattern.clone();
        }
        if let Some(batch_size) = args.batch_size {
            export.batch_size = usize::try_from(batch_size).unwrap_or(usize::MAX);
        }
        if let Some(dir) = &args.data_dir {
            export.data_dir = dir.clone();
        }
        if args.append {
            export.mode = OutputMode::Append;
        }
        if args.with_ttl {
            export.with_ttl = true;
        }
        if args.no_progress || args.quiet {
            export.progress = false;
        }
    }

    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Where the dump goes: `--output`, or the dated file in the data directory
    ///
    /// # Arguments
    /// * `date` - Date for the `{date}` placeholder (`YYYY-MM-DD`)
    pub fn output_path(&self, date: &str) -> PathBuf {
        match &self.args.output {
            Some(path) => path.clone(),
            None => self.config.output_path(date),
        }
    }

    /// Directory holding the checkpoint: the output file's directory
    pub fn checkpoint_dir(&self, output: &Path) -> PathBuf {
        match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Get sanitized connection URL for display (hides credentials)
    pub fn sanitized_url(&self) -> String {
        sanitize_url(&self.config.connection.url)
    }

    /// Handle actions that finish without connecting
    ///
    /// # Returns
    /// * `Result<bool>` - True if an action ran and the process should exit
    pub fn handle_early_exit(&self) -> Result<bool> {
        if let Some(shell) = self.args.completions {
            completion::generate_completion(shell, &mut std::io::stdout())?;
            return Ok(true);
        }

        if self.args.show_config {
            self.show_config()?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("# Configuration file: {}", path.display());
        println!("{}", self.config.to_toml()?);
        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }
}
