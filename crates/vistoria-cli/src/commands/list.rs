use anyhow::Result;
use console::style;
use std::path::Path;
use vistoria_core::Scenario;

pub fn execute(dir: &Path) -> Result<()> {
    let files = super::scenarios_in_dir(dir)?;
    if files.is_empty() {
        println!("No scenario files found in {}", dir.display());
        return Ok(());
    }

    for file in files {
        match Scenario::from_file(&file) {
            Ok(scenario) => {
                println!(
                    "{}  {} step(s)  {}",
                    style(&scenario.name).bold(),
                    scenario.steps.len(),
                    scenario.description.as_deref().unwrap_or("")
                );
                println!("    {}", style(file.display()).dim());
            }
            Err(e) => {
                println!("{}  {}", style(file.display().to_string()).red(), e);
            }
        }
    }
    Ok(())
}
