use std::path::{Path, PathBuf};
use tracing::info;

use crate::session::{BrowserSession, SessionError};

/// The two artifact paths a scenario can terminate with. Exactly one of them
/// is written per run.
#[derive(Debug, Clone)]
pub struct EvidencePaths {
    pub success: PathBuf,
    pub failure: PathBuf,
}

impl EvidencePaths {
    pub fn new(dir: &Path, success_name: &str, failure_name: &str) -> Self {
        Self {
            success: dir.join(success_name),
            failure: dir.join(failure_name),
        }
    }
}

/// Serializes the current viewport to `path`, creating parent directories and
/// overwriting any previous artifact at that path.
pub async fn capture(session: &BrowserSession, path: &Path) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    session.screenshot(path).await?;
    info!("Screenshot taken at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_land_under_the_artifact_dir() {
        let paths = EvidencePaths::new(
            Path::new("verification"),
            "portal_resources.png",
            "error.png",
        );
        assert_eq!(paths.success, PathBuf::from("verification/portal_resources.png"));
        assert_eq!(paths.failure, PathBuf::from("verification/error.png"));
    }
}
