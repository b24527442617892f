use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use vistoria_browser::{RunnerConfig, ScenarioRunner};
use vistoria_core::{RunSummary, Scenario, ScenarioReport, StepStatus};

#[allow(clippy::too_many_arguments)]
pub fn execute(
    paths: &[PathBuf],
    artifacts: PathBuf,
    base_url: Option<String>,
    headed: bool,
    chrome_path: Option<PathBuf>,
    profile: Option<String>,
    report_path: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let files = super::discover_scenarios(paths)?;
    if files.is_empty() {
        anyhow::bail!("No scenario files found in the given paths");
    }

    // Parse everything up front so a typo in scenario 7 doesn't burn six
    // browser launches first.
    let mut scenarios = Vec::new();
    for file in &files {
        let scenario = Scenario::from_file(file)
            .with_context(|| format!("Failed to load scenario {}", file.display()))?;
        scenarios.push(scenario);
    }

    let profile_dir = match profile {
        Some(name) => {
            let dir = dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
                .join(".vistoria")
                .join("profiles")
                .join(name);
            println!("📁 Using profile: {}", dir.display());
            Some(dir)
        }
        None => None,
    };

    let config = RunnerConfig {
        artifacts_dir: artifacts,
        chrome_path,
        profile_dir,
        headless: !headed,
        base_url,
        ..RunnerConfig::default()
    };
    let runner = ScenarioRunner::new(config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let progress = if json || scenarios.len() < 2 {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(scenarios.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    };

    let mut summary = RunSummary::new();
    for scenario in &scenarios {
        progress.set_message(scenario.name.clone());
        let report = runtime.block_on(runner.run(scenario));
        if !json {
            progress.suspend(|| print_report(&report));
        }
        summary.push(report);
        progress.inc(1);
    }
    progress.finish_and_clear();

    if let Some(path) = &report_path {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create report file {}", path.display()))?;
        serde_json::to_writer_pretty(file, &summary)?;
        println!("📝 Report written to: {}", path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        if summary.all_passed() {
            println!(
                "{} {} scenario(s) passed",
                style("✅").green(),
                summary.passed()
            );
        } else {
            println!(
                "{} {} of {} scenario(s) failed",
                style("❌").red(),
                summary.failed(),
                summary.total()
            );
        }
    }

    if !summary.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &ScenarioReport) {
    let header = if report.passed() {
        style(format!("✓ {}", report.scenario)).green()
    } else {
        style(format!("✗ {}", report.scenario)).red()
    };
    println!("{} ({} ms)", header, report.duration.as_millis());

    for step in &report.steps {
        match &step.status {
            StepStatus::Passed => {
                println!("    {} {}", style("·").dim(), step.label);
            }
            StepStatus::Failed { error } => {
                println!("    {} {}", style("✗").red(), step.label);
                println!("      {}", style(error).red());
            }
            StepStatus::Skipped => {
                println!("    {} {} (skipped)", style("-").dim(), style(&step.label).dim());
            }
        }
    }

    if let Some(diagnostics) = &report.diagnostics {
        if let Some(path) = &diagnostics.error_screenshot {
            println!("      error screenshot: {}", path.display());
        }
        if let Some(path) = &diagnostics.page_html {
            println!("      page dump: {}", path.display());
        }
        for message in diagnostics.console.iter().filter(|m| m.level == "error") {
            println!("      console: {}", style(&message.text).yellow());
        }
    }
}
