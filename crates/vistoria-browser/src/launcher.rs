use crate::{Error, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use vistoria_core::Viewport;

pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;

/// Manages the Chrome process for one scenario run.
pub struct ChromeLauncher {
    chrome_path: PathBuf,
    profile_path: PathBuf,
    headless: bool,
    viewport: Viewport,
    debugging_port: u16,
}

impl ChromeLauncher {
    pub fn new(chrome_path: PathBuf, profile_path: PathBuf) -> Self {
        Self {
            chrome_path,
            profile_path,
            headless: true,
            viewport: Viewport::default(),
            debugging_port: DEFAULT_DEBUGGING_PORT,
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn debugging_port(mut self, port: u16) -> Self {
        self.debugging_port = port;
        self
    }

    pub fn port(&self) -> u16 {
        self.debugging_port
    }

    /// Launch the Chrome process. The caller owns the child and must reap it.
    pub fn launch(&self) -> Result<Child> {
        let args = self.build_args();
        tracing::debug!("Launching {} {}", self.chrome_path.display(), args.join(" "));

        Command::new(&self.chrome_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))
    }

    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.debugging_port),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            format!("--user-data-dir={}", self.profile_path.display()),
            format!("--window-size={},{}", self.viewport.width, self.viewport.height),
        ];

        if self.headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
        }

        args.push("about:blank".to_string());
        args
    }
}
