use anyhow::Result;
use console::style;
use std::path::PathBuf;
use vistoria_core::Scenario;

/// Validate scenario files without launching a browser.
pub fn execute(files: &[PathBuf]) -> Result<()> {
    let mut problems = 0usize;

    for file in files {
        match Scenario::from_file(file) {
            Ok(scenario) => {
                println!(
                    "{} {} ({}, {} step(s))",
                    style("✓").green(),
                    file.display(),
                    scenario.name,
                    scenario.steps.len()
                );
            }
            Err(e) => {
                problems += 1;
                println!("{} {}", style("✗").red(), file.display());
                println!("    {}", style(e).red());
            }
        }
    }

    if problems > 0 {
        anyhow::bail!("{} scenario file(s) failed validation", problems);
    }
    Ok(())
}
