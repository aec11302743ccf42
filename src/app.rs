//! Operations behind every menu entry and CLI subcommand.
//!
//! Nothing here prompts; the menu and the CLI collect input and call in. Console
//! progress is printed through `ui` the same way for both.

use crate::apply::{self, ApplyOutcome, BackupOutcome};
use crate::client::{self, ClientInstall};
use crate::config_list::{
    self, AddOutcome, COLOR_SCHEME, CURRENT_THEME, CUSTOM_APPS, ConfigStore, EXTENSIONS,
    TOGGLE_KEYS,
};
use crate::invoker::{PROGRAM, ProcessRunner, Spicetify, ToolRunner};
use crate::paths::{self, SpicetifyPaths};
use crate::release::{self, AuthMode, ReleaseClient, TokenCheck};
use crate::session::Session;
use crate::settings::WizardSettings;
use crate::ui;
use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MARKETPLACE: &str = "marketplace";
const MARKETPLACE_ASSET: &str = "marketplace.zip";
/// Settings the Marketplace custom app needs switched on.
const MARKETPLACE_FLAGS: &[&str] = &[
    "inject_css",
    "replace_colors",
    "overwrite_assets",
    "inject_theme_js",
];

/// The two delta-editable list keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Extensions,
    CustomApps,
}

impl ListKind {
    pub fn key(self) -> &'static str {
        match self {
            ListKind::Extensions => EXTENSIONS,
            ListKind::CustomApps => CUSTOM_APPS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ListKind::Extensions => "extension",
            ListKind::CustomApps => "custom app",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub client: ClientInstall,
    pub tool_version: Option<String>,
    pub applied: bool,
    pub extensions: Vec<String>,
    pub custom_apps: Vec<String>,
    pub launch_flags: Vec<String>,
    pub theme: Option<String>,
    pub color_scheme: Option<String>,
}

pub struct App<R: ToolRunner = ProcessRunner> {
    pub tool: Spicetify<R>,
    pub paths: SpicetifyPaths,
    pub session: Session,
    pub settings: WizardSettings,
    /// `None` keeps settings in memory only.
    settings_path: Option<PathBuf>,
}

impl App<ProcessRunner> {
    /// `settings_path` of `None` keeps settings in memory only.
    pub fn new(settings: WizardSettings, settings_path: Option<PathBuf>) -> Self {
        let install_dir = paths::default_install_dir();
        let tool = Spicetify::new(ProcessRunner::new(install_dir.clone()));
        let paths = SpicetifyPaths::discover(&tool, install_dir);
        Self { tool, paths, session: Session::new(), settings, settings_path }
    }
}

impl<R: ToolRunner> App<R> {
    pub fn with_tool(tool: Spicetify<R>, paths: SpicetifyPaths, settings: WizardSettings) -> Self {
        Self { tool, paths, session: Session::new(), settings, settings_path: None }
    }

    /// Precondition for every action that shells out to spicetify.
    pub fn require_tool(&self) -> Result<()> {
        if !self.tool.is_available() {
            bail!("Spicetify is not installed. Install it from the main menu first.");
        }
        Ok(())
    }

    fn http(&self) -> Result<ReleaseClient> {
        ReleaseClient::new(
            &self.settings.api_base,
            self.settings.token().map(str::to_string),
            Duration::from_secs(self.settings.http_timeout_secs),
        )
        .context("Failed to build HTTP client")
    }

    fn save_settings(&self) -> Result<()> {
        match &self.settings_path {
            Some(path) => self.settings.save_to(path),
            None => Ok(()),
        }
    }

    pub fn refresh_paths(&mut self) {
        self.paths = SpicetifyPaths::discover(&self.tool, self.paths.install_dir.clone());
    }

    // --- Installation ---

    /// Returns the detected install; only installs when nothing was found.
    pub fn install_spotify(&self) -> Result<ClientInstall> {
        let existing = client::detect();
        if existing.is_installed() {
            return Ok(existing);
        }
        client::install(&self.http()?)?;
        match client::detect() {
            ClientInstall::Missing => {
                Err(anyhow!("Installer finished but Spotify was not detected"))
            }
            found => Ok(found),
        }
    }

    /// Downloads the latest CLI release into the install dir. Returns the version.
    pub fn install_spicetify(&mut self) -> Result<String> {
        let http = self.http()?;
        let fetch = http
            .latest_release(&self.settings.cli_repo)
            .context("Failed to query the latest Spicetify release")?;
        report_auth(fetch.auth);

        let asset = release::pick_asset(&fetch.release, release::os_tag(), std::env::consts::ARCH)?;
        let staging = tempfile::tempdir().context("Failed to create download directory")?;
        let archive = staging.path().join(&asset.name);

        ui::step(&format!("Downloading {}...", asset.name));
        http.download(&asset.browser_download_url, &archive)?;

        let install_dir = self.paths.install_dir.clone();
        ui::step(&format!("Extracting to {}...", install_dir.display()));
        release::extract_archive(&archive, &install_dir)?;
        make_executable(&install_dir.join(format!("{}{}", PROGRAM, std::env::consts::EXE_SUFFIX)))?;

        // First run writes the default config-xpui.ini
        if let Err(e) = self.tool.invoke_capture(&["config"]) {
            debug!("initial config run failed: {}", e);
        }
        self.refresh_paths();
        Ok(fetch.release.version().to_string())
    }

    /// Installs the Marketplace custom app and enables what it depends on.
    pub fn install_marketplace(&mut self) -> Result<()> {
        self.require_tool()?;
        let http = self.http()?;
        let fetch = http
            .latest_release(&self.settings.marketplace_repo)
            .context("Failed to query the latest Marketplace release")?;
        report_auth(fetch.auth);

        let asset = release::asset_named(&fetch.release, MARKETPLACE_ASSET)
            .ok_or_else(|| {
                anyhow!("Release {} has no {}", fetch.release.tag_name, MARKETPLACE_ASSET)
            })?;
        let download_dir = tempfile::tempdir().context("Failed to create download directory")?;
        let archive = download_dir.path().join(MARKETPLACE_ASSET);
        ui::step(&format!("Downloading Marketplace {}...", fetch.release.tag_name));
        http.download(&asset.browser_download_url, &archive)?;

        let apps_dir = self.paths.user_custom_apps();
        let staging = apps_dir.join(".marketplace-staging");
        let target = apps_dir.join(MARKETPLACE);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        release::extract_archive(&archive, &staging)?;
        let unpacked = single_subdir(&staging).unwrap_or_else(|| staging.clone());
        if target.exists() {
            fs::remove_dir_all(&target).context("Failed to remove previous Marketplace")?;
        }
        fs::rename(&unpacked, &target).context("Failed to move Marketplace into CustomApps")?;
        if staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                debug!("could not remove {}: {}", staging.display(), e);
            }
        }

        let listed = config_list::add_unique(&self.tool, CUSTOM_APPS, MARKETPLACE)?;
        if listed == AddOutcome::AlreadyPresent {
            ui::info("Marketplace already listed in custom_apps.");
        }
        for key in MARKETPLACE_FLAGS {
            config_list::set_flag(&self.tool, key, true)?;
        }
        Ok(())
    }

    // --- Extensions and custom apps ---

    pub fn list(&self, kind: ListKind) -> Vec<String> {
        config_list::get_list(&self.tool, kind.key())
    }

    /// Files present on disk that could be enabled.
    pub fn available(&self, kind: ListKind) -> Vec<String> {
        match kind {
            ListKind::Extensions => self.paths.available_extensions(),
            ListKind::CustomApps => self.paths.available_custom_apps(),
        }
    }

    pub fn add_item(&self, kind: ListKind, input: &str) -> Result<AddOutcome> {
        self.require_tool()?;
        let token = config_list::normalize_token(input)
            .ok_or_else(|| anyhow!("'{}' is not a valid {} name", input.trim(), kind.label()))?;
        config_list::add_unique(&self.tool, kind.key(), &token)
    }

    pub fn remove_item(&self, kind: ListKind, token: &str) -> Result<()> {
        self.require_tool()?;
        config_list::remove_token(&self.tool, kind.key(), token.trim())
    }

    /// `snapshot` is the list as the caller last showed it.
    pub fn clear_items(&self, kind: ListKind, snapshot: &[String]) -> Result<usize> {
        self.require_tool()?;
        config_list::clear_all(&self.tool, kind.key(), snapshot)
    }

    // --- Launch flags ---

    pub fn launch_flags(&self) -> Vec<String> {
        config_list::get_list(&self.tool, config_list::LAUNCH_FLAGS)
    }

    pub fn add_launch_flag(&self, input: &str) -> Result<AddOutcome> {
        self.require_tool()?;
        let flag = config_list::normalize_token(input)
            .ok_or_else(|| anyhow!("'{}' is not a valid flag", input.trim()))?;
        config_list::add_launch_flag(&self.tool, &flag)
    }

    pub fn remove_launch_flag(&self, flag: &str) -> Result<bool> {
        self.require_tool()?;
        config_list::remove_launch_flag(&self.tool, flag.trim())
    }

    pub fn clear_launch_flags(&self) -> Result<()> {
        self.require_tool()?;
        config_list::clear_launch_flags(&self.tool)
    }

    // --- Toggles and themes ---

    pub fn toggles(&self) -> Vec<(&'static str, bool)> {
        let all = self.tool.read_all();
        TOGGLE_KEYS
            .iter()
            .map(|key| (*key, all.get(*key).is_some_and(|v| config_list::is_enabled(v))))
            .collect()
    }

    /// Flips `key` and returns the new state.
    pub fn toggle(&self, key: &str) -> Result<bool> {
        self.require_tool()?;
        if !TOGGLE_KEYS.contains(&key) {
            bail!("'{}' is not a toggleable setting", key);
        }
        let enabled = !config_list::flag_enabled(&self.tool, key);
        config_list::set_flag(&self.tool, key, enabled)?;
        Ok(enabled)
    }

    pub fn themes(&self) -> Vec<String> {
        self.paths.available_themes()
    }

    pub fn color_schemes(&self, theme: &str) -> Vec<String> {
        self.paths.theme_dir(theme).map(|d| paths::color_schemes(&d)).unwrap_or_default()
    }

    pub fn set_theme(&self, theme: &str, scheme: Option<&str>) -> Result<()> {
        self.require_tool()?;
        let theme = theme.trim();
        if theme.is_empty() {
            bail!("Theme name is empty");
        }
        config_list::set_raw(&self.tool, CURRENT_THEME, theme)?;
        match scheme.map(str::trim).filter(|s| !s.is_empty()) {
            Some(scheme) => config_list::set_raw(&self.tool, COLOR_SCHEME, scheme),
            None => Ok(()),
        }
    }

    // --- Backup / apply and friends ---

    pub fn backup_and_apply(&mut self) -> Result<(BackupOutcome, ApplyOutcome)> {
        self.require_tool()?;
        Ok(apply::backup_and_apply(&self.tool, &mut self.session))
    }

    pub fn apply(&mut self) -> Result<ApplyOutcome> {
        self.require_tool()?;
        Ok(apply::apply(&self.tool, &mut self.session))
    }

    pub fn restore(&self) -> Result<()> {
        self.require_tool()?;
        apply::restore(&self.tool)
    }

    pub fn refresh_extensions(&self) -> Result<()> {
        self.require_tool()?;
        apply::refresh_extensions(&self.tool)
    }

    pub fn enable_devtools(&self) -> Result<()> {
        self.require_tool()?;
        apply::enable_devtools(&self.tool)
    }

    pub fn spotify_updates(&self, block: bool) -> Result<()> {
        self.require_tool()?;
        apply::spotify_updates(&self.tool, block)
    }

    // --- GitHub token ---

    /// Validates before saving; an invalid token is not stored.
    pub fn set_token(&mut self, token: &str) -> Result<TokenCheck> {
        let token = token.trim();
        if token.is_empty() {
            bail!("Token is empty");
        }
        let check = self.http()?.validate_token(token).context("Failed to reach GitHub")?;
        if check != TokenCheck::Invalid {
            self.settings.set_token(token);
            self.save_settings()?;
        }
        Ok(check)
    }

    pub fn clear_token(&mut self) -> Result<()> {
        self.settings.clear_token();
        self.save_settings()
    }

    pub fn check_token(&self) -> Result<Option<TokenCheck>> {
        match self.settings.token() {
            Some(token) => Ok(Some(self.http()?.validate_token(token)?)),
            None => Ok(None),
        }
    }

    // --- Status ---

    pub fn status(&mut self) -> StatusReport {
        let applied = self.session.refresh_applied(&self.tool, &self.paths);
        StatusReport {
            client: client::detect(),
            tool_version: self.tool.version(),
            applied,
            extensions: self.list(ListKind::Extensions),
            custom_apps: self.list(ListKind::CustomApps),
            launch_flags: self.launch_flags(),
            theme: config_list::get_value(&self.tool, CURRENT_THEME),
            color_scheme: config_list::get_value(&self.tool, COLOR_SCHEME),
        }
    }
}

fn report_auth(auth: AuthMode) {
    if let AuthMode::FellBack(kind) = auth {
        ui::warn(&format!(
            "Saved GitHub token was refused ({}); used an anonymous request instead.",
            kind
        ));
    }
}

fn single_subdir(dir: &Path) -> Option<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(dir).ok()?.flatten().map(|e| e.path()).collect();
    match entries.as_slice() {
        [only] if only.is_dir() => Some(only.clone()),
        _ => None,
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if path.is_file() {
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to mark {} executable", path.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
