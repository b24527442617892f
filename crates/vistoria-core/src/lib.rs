pub mod error;
pub mod report;
pub mod scenario;
pub mod selector;
pub mod step;

pub use error::{Error, Result};
pub use report::{ConsoleMessage, Diagnostics, RunSummary, ScenarioReport, StepOutcome, StepStatus};
pub use scenario::{LoginFixture, Scenario, SuccessWait, Viewport};
pub use selector::Selector;
pub use step::{Step, DEFAULT_WAIT_TIMEOUT_MS};
