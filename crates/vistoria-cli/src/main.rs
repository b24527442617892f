use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "vistoria")]
#[command(author, version)]
#[command(
    about = "A CLI tool for running browser verification scenarios",
    long_about = "Vistoria drives a Chrome/Chromium browser through declarative UI scenarios \
                  (login, navigation, form fill, assertions, screenshots) against a running \
                  web application, and reports pass/fail with diagnostic artifacts."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenario files (or directories of them) against the application
    Run {
        /// Scenario JSON files or directories to discover them in
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Directory for screenshots and failure diagnostics
        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Override every scenario's base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Run with a visible browser window
        #[arg(long)]
        headed: bool,

        /// Path to the Chrome/Chromium binary
        #[arg(long)]
        chrome_path: Option<PathBuf>,

        /// Use a named persistent profile (kept under ~/.vistoria/profiles/)
        /// instead of a temporary one
        #[arg(long)]
        profile: Option<String>,

        /// Write the JSON run summary to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the run summary as JSON instead of the pretty listing
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate scenario files without running them
    Check {
        /// Scenario JSON files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// List the scenarios found in a directory
    List {
        /// Directory to search for scenario JSON files
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Serve a directory of static files for scenarios to target
    Serve {
        /// Document root
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            paths,
            artifacts,
            base_url,
            headed,
            chrome_path,
            profile,
            report,
            json,
        } => commands::run::execute(
            &paths,
            artifacts,
            base_url,
            headed,
            chrome_path,
            profile,
            report,
            json,
        ),
        Commands::Check { files } => commands::check::execute(&files),
        Commands::List { dir } => commands::list::execute(&dir),
        Commands::Serve { root, port } => commands::serve::execute(root, port),
        Commands::Completion { shell } => {
            commands::completion::execute(shell, &mut Cli::command())
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("vistoria=debug,vistoria_core=debug,vistoria_browser=debug,vistoria_server=debug")
    } else {
        EnvFilter::new("vistoria=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
