//! Where spicetify keeps its binary and user data.
//!
//! The user-data folder is asked from the tool (`spicetify path userdata`) and only
//! falls back to the platform default when that query fails.

use crate::invoker::{Spicetify, ToolRunner};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SpicetifyPaths {
    pub userdata: PathBuf,
    pub install_dir: PathBuf,
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("could not determine home directory, using the current directory");
        PathBuf::from(".")
    })
}

/// `%LOCALAPPDATA%\spicetify` on Windows, `~/.spicetify` elsewhere.
pub fn default_install_dir() -> PathBuf {
    if cfg!(windows) {
        dirs::data_local_dir().unwrap_or_else(home).join("spicetify")
    } else {
        home().join(".spicetify")
    }
}

/// `%APPDATA%\spicetify` on Windows, `~/.config/spicetify` elsewhere.
pub fn default_userdata() -> PathBuf {
    if cfg!(windows) {
        dirs::config_dir().unwrap_or_else(home).join("spicetify")
    } else {
        home().join(".config/spicetify")
    }
}

/// Asks the tool for its user-data folder. `None` when the tool is missing or answers oddly.
pub fn query_userdata<R: ToolRunner>(tool: &Spicetify<R>) -> Option<PathBuf> {
    let inv = tool.invoke(&["path", "userdata"]).ok()?;
    if !inv.succeeded() {
        return None;
    }
    let line = inv.stdout.lines().map(str::trim).rfind(|l| !l.is_empty())?;
    let path = PathBuf::from(line);
    path.is_absolute().then_some(path)
}

/// True when `spicetify path all` mentions a backup artifact.
pub fn backup_listed<R: ToolRunner>(tool: &Spicetify<R>) -> bool {
    match tool.invoke_capture(&["path", "all"]) {
        Ok(out) => out.to_lowercase().contains("backup"),
        Err(e) => {
            debug!("path all failed: {}", e);
            false
        }
    }
}

impl SpicetifyPaths {
    pub fn new(userdata: PathBuf, install_dir: PathBuf) -> Self {
        Self { userdata, install_dir }
    }

    pub fn discover<R: ToolRunner>(tool: &Spicetify<R>, install_dir: PathBuf) -> Self {
        let userdata = query_userdata(tool).unwrap_or_else(|| {
            debug!("path userdata unavailable, using default");
            default_userdata()
        });
        Self::new(userdata, install_dir)
    }

    /// Present once `spicetify backup` has stored the vanilla client files.
    pub fn backup_marker(&self) -> PathBuf {
        self.userdata.join("Backup").join("xpui.spa")
    }

    pub fn user_extensions(&self) -> PathBuf {
        self.userdata.join("Extensions")
    }

    pub fn user_themes(&self) -> PathBuf {
        self.userdata.join("Themes")
    }

    pub fn user_custom_apps(&self) -> PathBuf {
        self.userdata.join("CustomApps")
    }

    /// Extension files available to enable, from both the user and bundled folders.
    pub fn available_extensions(&self) -> Vec<String> {
        let dirs = [self.user_extensions(), self.install_dir.join("Extensions")];
        let mut names: Vec<String> = dirs
            .iter()
            .flat_map(|d| entries(d))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "js" || e == "mjs"))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn available_custom_apps(&self) -> Vec<String> {
        sorted_dir_names(&[self.user_custom_apps(), self.install_dir.join("CustomApps")])
    }

    pub fn available_themes(&self) -> Vec<String> {
        sorted_dir_names(&[self.user_themes(), self.install_dir.join("Themes")])
    }

    /// First folder holding `theme`, user data winning over the bundled copy.
    pub fn theme_dir(&self, theme: &str) -> Option<PathBuf> {
        [self.user_themes(), self.install_dir.join("Themes")]
            .into_iter()
            .map(|d| d.join(theme))
            .find(|d| d.is_dir())
    }
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(read) => read.flatten().map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

fn sorted_dir_names(dirs: &[PathBuf]) -> Vec<String> {
    let mut names: Vec<String> = dirs
        .iter()
        .flat_map(|d| entries(d))
        .filter(|p| p.is_dir())
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Section names of a theme's `color.ini`.
pub fn color_schemes(theme_dir: &Path) -> Vec<String> {
    let Ok(content) = fs::read_to_string(theme_dir.join("color.ini")) else {
        return Vec::new();
    };
    content
        .lines()
        .map(str::trim)
        .filter_map(|l| l.strip_prefix('[').and_then(|r| r.strip_suffix(']')))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
