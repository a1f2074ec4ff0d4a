//! Shell completion generation for redisdump

use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io::Write;

use crate::cli::CliArgs;
use crate::error::{ConfigError, Result};

/// Binary name completions are registered for
const BIN_NAME: &str = "redisdump";

/// Generate shell completion script
///
/// # Arguments
/// * `shell` - Target shell
/// * `out` - Where the script is written
///
/// # Returns
/// * `Result<()>` - Success or error
pub fn generate_completion(shell: Shell, out: &mut dyn Write) -> Result<()> {
    match shell {
        Shell::Bash | Shell::Zsh | Shell::Fish | Shell::PowerShell | Shell::Elvish => {
            let mut cmd = CliArgs::command();
            generate(shell, &mut cmd, BIN_NAME, out);
            Ok(())
        }
        other => Err(ConfigError::Generic(format!(
            "Unsupported shell: {other}. Supported shells: bash, zsh, fish, powershell, elvish"
        ))
        .into()),
    }
}
