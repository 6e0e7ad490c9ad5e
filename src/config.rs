use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct VerifyConfig {
    /// Base address of the portal under test.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Directory screenshots are written under.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    #[serde(default)]
    pub readiness: ReadinessOptions,
    #[serde(default)]
    pub browser: BrowserOptions,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReadinessOptions {
    /// Maximum number of probe requests before giving up.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserOptions {
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Upper bound on how long a click or visibility check polls the page.
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5173".to_string()
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("verification")
}

fn default_attempts() -> u32 {
    30
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    2_000
}

fn default_headless() -> bool {
    true
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            artifact_dir: default_artifact_dir(),
            readiness: ReadinessOptions::default(),
            browser: BrowserOptions::default(),
        }
    }
}

impl Default for ReadinessOptions {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            wait_timeout_ms: default_wait_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl VerifyConfig {
    pub fn load(explicit: Option<&PathBuf>) -> Self {
        let mut paths = Vec::new();
        if let Some(p) = explicit {
            paths.push(p.clone());
        }
        paths.push(PathBuf::from("verify.toml"));
        paths.push(
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fitpro-verify/verify.toml"),
        );

        let mut config = None;
        for path in paths {
            if path.exists() {
                match fs::read_to_string(&path) {
                    Ok(content) => match toml::from_str::<VerifyConfig>(&content) {
                        Ok(parsed) => {
                            tracing::info!("Loaded config from {}", path.display());
                            config = Some(parsed);
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                    }
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            tracing::info!("No config file found, using defaults");
            Self::default()
        });

        if let Ok(base) = std::env::var("FITVERIFY_BASE_URL") {
            config.base_url = base;
        }
        config
    }

    /// Rejects an unusable base address before any scenario work starts.
    pub fn validate(&self) -> Result<(), String> {
        Url::parse(&self.base_url)
            .map(|_| ())
            .map_err(|e| format!("invalid base_url `{}`: {}", self.base_url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_dev_server() {
        let config = VerifyConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:5173");
        assert_eq!(config.artifact_dir, PathBuf::from("verification"));
        assert!(config.browser.headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let config: VerifyConfig = toml::from_str(
            r#"
            base_url = "http://10.0.0.2:8080"

            [browser]
            headless = false
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:8080");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.wait_timeout_ms, 10_000);
        assert_eq!(config.readiness.attempts, 30);
    }

    #[test]
    fn validate_rejects_garbage_base_url() {
        let config = VerifyConfig {
            base_url: "not a url".to_string(),
            ..VerifyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial_test::serial]
    fn env_var_overrides_the_file_config() {
        std::env::set_var("FITVERIFY_BASE_URL", "http://192.168.1.9:9999");
        let config = VerifyConfig::load(None);
        std::env::remove_var("FITVERIFY_BASE_URL");
        assert_eq!(config.base_url, "http://192.168.1.9:9999");
    }

    #[test]
    #[serial_test::serial]
    fn explicit_config_path_is_tried_first() {
        std::env::remove_var("FITVERIFY_BASE_URL");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verify.toml");
        fs::write(&path, "base_url = \"http://127.0.0.1:9000\"\n").unwrap();
        let config = VerifyConfig::load(Some(&path));
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
    }
}
