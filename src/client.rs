//! Spotify itself: is it installed, and how to install it unattended.
//!
//! Detection asks the OS (registry, app-package list, flatpak, known folders)
//! rather than keeping a manifest of our own.

use crate::release::ReleaseClient;
use crate::ui;
use anyhow::{Context, Result, bail};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const SPOTIFY_SETUP_URL: &str = "https://download.scdn.co/SpotifySetup.exe";
pub const FLATPAK_ID: &str = "com.spotify.Client";
pub const STORE_PACKAGE: &str = "SpotifyAB.SpotifyMusic";
const UNINSTALL_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Uninstall\Spotify";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInstall {
    Native(PathBuf),
    /// Microsoft Store build; spicetify cannot patch it.
    Store,
    Flatpak,
    Missing,
}

impl ClientInstall {
    pub fn is_installed(&self) -> bool {
        !matches!(self, ClientInstall::Missing)
    }

    pub fn supports_spicetify(&self) -> bool {
        matches!(self, ClientInstall::Native(_) | ClientInstall::Flatpak)
    }

    pub fn describe(&self) -> String {
        match self {
            ClientInstall::Native(path) => format!("installed ({})", path.display()),
            ClientInstall::Store => "Microsoft Store version (not supported by Spicetify)".into(),
            ClientInstall::Flatpak => format!("Flatpak ({})", FLATPAK_ID),
            ClientInstall::Missing => "not installed".into(),
        }
    }
}

fn command_succeeds(cmd: &str, args: &[&str]) -> bool {
    Command::new(cmd)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn command_stdout(cmd: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(cmd).args(args).stderr(Stdio::null()).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Value column of a `reg query ... /v <name>` line: `    name    REG_SZ    data`.
pub fn parse_reg_value(output: &str, name: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut cols = line.split_whitespace();
        if !cols.next()?.eq_ignore_ascii_case(name) {
            return None;
        }
        let kind = cols.next()?;
        if !kind.starts_with("REG_") {
            return None;
        }
        // Data may contain spaces; take everything after the type column
        let start = line.find(kind)? + kind.len();
        let data = line[start..].trim();
        (!data.is_empty()).then(|| data.to_string())
    })
}

pub fn detect() -> ClientInstall {
    let found = if cfg!(windows) {
        detect_windows()
    } else if cfg!(target_os = "macos") {
        detect_macos()
    } else {
        detect_linux()
    };
    debug!("spotify detection: {:?}", found);
    found
}

fn detect_windows() -> ClientInstall {
    if let Some(out) = command_stdout("reg", &["query", UNINSTALL_KEY, "/v", "InstallLocation"]) {
        let location = parse_reg_value(&out, "InstallLocation")
            .map(PathBuf::from)
            .unwrap_or_else(default_windows_dir);
        return ClientInstall::Native(location);
    }

    let query = format!(
        "Get-AppxPackage -Name {} | Select-Object -ExpandProperty Name",
        STORE_PACKAGE
    );
    let store_listed = command_stdout("powershell", &["-NoProfile", "-Command", &query])
        .is_some_and(|out| out.contains(STORE_PACKAGE));
    if store_listed {
        return ClientInstall::Store;
    }

    let exe = default_windows_dir().join("Spotify.exe");
    if exe.is_file() {
        return ClientInstall::Native(default_windows_dir());
    }
    ClientInstall::Missing
}

fn default_windows_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_default().join("Spotify")
}

fn detect_linux() -> ClientInstall {
    if let Ok(path) = which::which("spotify") {
        return ClientInstall::Native(path);
    }
    for dir in ["/opt/spotify", "/usr/share/spotify"] {
        if Path::new(dir).join("spotify").is_file() {
            return ClientInstall::Native(PathBuf::from(dir));
        }
    }
    if command_succeeds("flatpak", &["info", FLATPAK_ID]) {
        return ClientInstall::Flatpak;
    }
    ClientInstall::Missing
}

fn detect_macos() -> ClientInstall {
    let mut candidates = vec![PathBuf::from("/Applications/Spotify.app")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("Applications/Spotify.app"));
    }
    candidates
        .into_iter()
        .find(|p| p.is_dir())
        .map(ClientInstall::Native)
        .unwrap_or(ClientInstall::Missing)
}

/// Installs Spotify without prompts, using whatever the platform offers.
pub fn install(http: &ReleaseClient) -> Result<()> {
    if cfg!(windows) {
        install_windows(http)
    } else if cfg!(target_os = "macos") {
        if which::which("brew").is_err() {
            bail!("Homebrew not found. Install Spotify from https://www.spotify.com/download");
        }
        run_installer("brew", &["install", "--cask", "spotify"])
    } else {
        if which::which("flatpak").is_err() {
            bail!("flatpak not found. Install Spotify with your distribution's package manager.");
        }
        run_installer("flatpak", &["install", "-y", "flathub", FLATPAK_ID])
    }
}

fn install_windows(http: &ReleaseClient) -> Result<()> {
    let staging = tempfile::tempdir().context("Failed to create download directory")?;
    let setup = staging.path().join("SpotifySetup.exe");

    ui::step("Downloading SpotifySetup.exe...");
    http.download(SPOTIFY_SETUP_URL, &setup)
        .context("Failed to download the Spotify installer")?;

    ui::step("Running installer silently...");
    let status = Command::new(&setup)
        .arg("/silent")
        .status()
        .context("Failed to launch the Spotify installer")?;
    if !status.success() {
        bail!("Spotify installer exited with {}", status);
    }
    Ok(())
}

fn run_installer(cmd: &str, args: &[&str]) -> Result<()> {
    ui::step(&format!("Running {} {}...", cmd, args.join(" ")));
    let status = Command::new(cmd)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run {}", cmd))?;
    if !status.success() {
        bail!("{} exited with {}", cmd, status);
    }
    Ok(())
}
