use reqwest::Client;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info};

use crate::config::VerifyConfig;
use crate::evidence::{capture, EvidencePaths};
use crate::readiness::{self, ReadinessError};
use crate::seeder::{expand, ExpandError, SeedError, SeedStep, Seeder};
use crate::session::{BrowserSession, Locator, SessionError};

/// A browser-side step. Seeding happens before any of these run.
#[derive(Debug, Clone)]
pub enum Step {
    Navigate { url: String },
    ClickText { text: String, nth: usize },
    AssertVisible { locator: Locator },
}

impl Step {
    /// Navigate to a path (resolved against the base URL) or a full URL.
    /// May reference captured entities, e.g. `/portal/{client.token}`.
    pub fn navigate(url: &str) -> Self {
        Self::Navigate {
            url: url.to_string(),
        }
    }

    pub fn click_text(text: &str) -> Self {
        Self::click_text_nth(text, 0)
    }

    pub fn click_text_nth(text: &str, nth: usize) -> Self {
        Self::ClickText {
            text: text.to_string(),
            nth,
        }
    }

    pub fn assert_text(text: &str) -> Self {
        Self::AssertVisible {
            locator: Locator::text(text),
        }
    }

    pub fn assert_role(role: &str, name: &str) -> Self {
        Self::AssertVisible {
            locator: Locator::role(role, name),
        }
    }
}

/// One complete seed-navigate-interact-assert sequence.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub seed: Vec<SeedStep>,
    pub steps: Vec<Step>,
    pub evidence: EvidencePaths,
}

/// The closed set of ways a scenario run can fail.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("service not ready: {0}")]
    Readiness(#[from] ReadinessError),
    #[error("seeding failed: {0}")]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
}

#[derive(Debug)]
pub enum Outcome {
    Passed {
        artifact: PathBuf,
    },
    Failed {
        error: ScenarioError,
        artifact: Option<PathBuf>,
    },
}

impl Outcome {
    pub fn passed(&self) -> bool {
        matches!(self, Outcome::Passed { .. })
    }

    /// Failures are logged and screenshot-captured, never panicked on, but
    /// they do surface in the process exit status for CI gating.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Outcome::Passed { .. } => ExitCode::SUCCESS,
            Outcome::Failed { .. } => ExitCode::FAILURE,
        }
    }
}

fn resolve_url(base: &str, target: &str) -> String {
    if target.starts_with("http") {
        target.to_string()
    } else {
        format!("{}{}", base.trim_end_matches('/'), target)
    }
}

async fn drive(
    cfg: &VerifyConfig,
    scenario: &Scenario,
    session: &BrowserSession,
) -> Result<(), ScenarioError> {
    let http = Client::new();
    readiness::wait_until_ready(&http, &cfg.base_url, &cfg.readiness).await?;

    let seeder = Seeder::new(http, &cfg.base_url);
    let entities = seeder.apply(&scenario.seed).await?;

    for step in &scenario.steps {
        match step {
            Step::Navigate { url } => {
                let url = resolve_url(&cfg.base_url, &expand(url, &entities)?);
                info!("Navigating to {}", url);
                session.navigate(&url).await?;
            }
            Step::ClickText { text, nth } => {
                session.click_visible_text(text, *nth).await?;
            }
            Step::AssertVisible { locator } => {
                session.assert_visible(locator).await?;
            }
        }
    }
    Ok(())
}

/// Runs one scenario end to end: launch the browser, wait for the service,
/// seed fixtures, walk the steps, then capture evidence for whichever way it
/// ended. The session is closed exactly once on every path.
pub async fn run(cfg: &VerifyConfig, scenario: &Scenario) -> Outcome {
    info!("Running scenario: {}", scenario.name);

    let session = match BrowserSession::launch(&cfg.browser).await {
        Ok(session) => session,
        Err(e) => {
            let error = ScenarioError::Session(e);
            error!("Error: {}", error);
            return Outcome::Failed {
                error,
                artifact: None,
            };
        }
    };

    let result = drive(cfg, scenario, &session).await;

    let outcome = match result {
        Ok(()) => match capture(&session, &scenario.evidence.success).await {
            Ok(()) => {
                info!("Scenario passed: {}", scenario.name);
                Outcome::Passed {
                    artifact: scenario.evidence.success.clone(),
                }
            }
            Err(e) => {
                let error = ScenarioError::Session(e);
                error!("Error: {}", error);
                Outcome::Failed {
                    error,
                    artifact: None,
                }
            }
        },
        Err(error) => {
            error!("Error: {}", error);
            let artifact = match capture(&session, &scenario.evidence.failure).await {
                Ok(()) => Some(scenario.evidence.failure.clone()),
                Err(e) => {
                    error!("failure screenshot could not be written: {}", e);
                    None
                }
            };
            Outcome::Failed { error, artifact }
        }
    };

    session.close().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeder::CreatedEntity;
    use std::collections::HashMap;

    #[test]
    fn relative_urls_resolve_against_the_base() {
        assert_eq!(
            resolve_url("http://127.0.0.1:5173", "/health"),
            "http://127.0.0.1:5173/health"
        );
        assert_eq!(
            resolve_url("http://127.0.0.1:5173/", "/health"),
            "http://127.0.0.1:5173/health"
        );
        assert_eq!(
            resolve_url("http://127.0.0.1:5173", "http://elsewhere/x"),
            "http://elsewhere/x"
        );
    }

    #[test]
    fn portal_url_carries_the_token_unmodified() {
        let mut entities = HashMap::new();
        entities.insert(
            "client".to_string(),
            CreatedEntity {
                id: Some("c1".to_string()),
                token: Some("Zx_9%2F==".to_string()),
            },
        );
        let path = expand("/portal/{client.token}", &entities).unwrap();
        let url = resolve_url("http://127.0.0.1:5173", &path);
        assert_eq!(url, "http://127.0.0.1:5173/portal/Zx_9%2F==");
    }

    #[test]
    fn step_constructors_default_to_first_match() {
        match Step::click_text("Select client...") {
            Step::ClickText { text, nth } => {
                assert_eq!(text, "Select client...");
                assert_eq!(nth, 0);
            }
            _ => panic!("expected ClickText"),
        }
    }
}
