//! Browser-verification harness for the FitPro trainer/client portal:
//! seed fixtures over the HTTP API, drive a headless Chromium session
//! against the rendered UI, and leave a screenshot behind as evidence.

pub mod cli;
pub mod config;
pub mod evidence;
pub mod logging;
pub mod readiness;
pub mod scenario;
pub mod seeder;
pub mod session;

pub use config::VerifyConfig;
pub use evidence::EvidencePaths;
pub use scenario::{run, Outcome, Scenario, ScenarioError, Step};
pub use seeder::{CreatedEntity, FailurePolicy, SeedStep, Seeder};
pub use session::{BrowserSession, Locator, SessionError};
