use anyhow::Result;
use clap::Command;
use clap_complete::{generate, Shell};

/// Write a completion script for the requested shell to stdout.
pub fn execute(shell: Shell, cmd: &mut Command) -> Result<()> {
    let bin_name = cmd.get_name().to_string();
    generate(shell, cmd, bin_name, &mut std::io::stdout());
    Ok(())
}
