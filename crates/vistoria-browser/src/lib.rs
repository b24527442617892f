//! Chrome lifecycle management and the CDP driver behind `vistoria run`.

mod chrome_finder;
mod console_capture;
mod driver;
mod error;
pub mod js;
mod launcher;
mod profile;
mod runner;

pub use chrome_finder::{ChromeFinder, CHROME_ENV};
pub use console_capture::ConsoleCapture;
pub use driver::{Driver, WaitCondition};
pub use error::{Error, Result};
pub use launcher::{ChromeLauncher, DEFAULT_DEBUGGING_PORT};
pub use profile::ProfileManager;
pub use runner::{RunnerConfig, ScenarioRunner};
