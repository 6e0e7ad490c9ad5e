use std::path::PathBuf;

use crate::config::VerifyConfig;

/// Flags shared by every verification binary.
#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// Base URL of the portal under test
    #[arg(long)]
    pub base_url: Option<String>,

    /// Run the browser with a visible window instead of headless
    #[arg(long)]
    pub headed: bool,

    /// Directory screenshots are written under
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,

    /// Explicit config file (otherwise verify.toml, then the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl CommonArgs {
    /// Loads the file/env config and layers the command-line overrides on top.
    pub fn into_config(self) -> Result<VerifyConfig, String> {
        let mut cfg = VerifyConfig::load(self.config.as_ref());
        if let Some(base) = self.base_url {
            cfg.base_url = base;
        }
        if let Some(dir) = self.artifact_dir {
            cfg.artifact_dir = dir;
        }
        if self.headed {
            cfg.browser.headless = false;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
