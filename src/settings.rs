//! The wizard's own settings file (`<config dir>/spicetify-wizard/config.toml`).
//!
//! Only holds what the wizard itself needs: the optional GitHub token and the
//! release sources. Everything about the client lives in spicetify's store.

use crate::ui;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardSettings {
    pub github_token: Option<String>,
    pub http_timeout_secs: u64,
    pub api_base: String,
    pub cli_repo: String,
    pub marketplace_repo: String,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            github_token: None,
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_base: "https://api.github.com".into(),
            cli_repo: "spicetify/cli".into(),
            marketplace_repo: "spicetify/marketplace".into(),
        }
    }
}

pub fn settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Could not find config directory")?;
    Ok(config_dir.join("spicetify-wizard/config.toml"))
}

/// Settings for this run and the file to persist them to.
///
/// Never fails. Without a config dir, or with a file that does not parse, the
/// defaults are used and nothing is written back.
pub fn load_or_default(path: Option<PathBuf>) -> (WizardSettings, Option<PathBuf>) {
    let Some(path) = path else {
        ui::warn("No config directory found; settings are kept for this session only.");
        return (WizardSettings::default(), None);
    };
    match WizardSettings::load_from(&path) {
        Ok(settings) => (settings, Some(path)),
        Err(e) => {
            ui::warn(&format!("{:#}", e));
            ui::warn("Using default settings for this session; the file is left untouched.");
            (WizardSettings::default(), None)
        }
    }
}

impl WizardSettings {
    /// A missing file is not an error; first runs start from defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: WizardSettings = toml::from_str(&content)
            .with_context(|| {
                format!("Failed to parse {}. Check for syntax errors.", path.display())
            })?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, content).context("Failed to write settings file")?;

        // The token is a credential
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .context("Failed to restrict settings permissions")?;
        }
        Ok(())
    }

    pub fn token(&self) -> Option<&str> {
        self.github_token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn set_token(&mut self, token: &str) {
        let token = token.trim();
        self.github_token = (!token.is_empty()).then(|| token.to_string());
    }

    pub fn clear_token(&mut self) {
        self.github_token = None;
    }
}

/// `ghp_…abcd` style display for secrets.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
