//! Access to spicetify's own configuration store.
//!
//! Nothing is cached: every read shells out to `spicetify config <key>` and every
//! write goes straight back through the tool. List-like keys are `|`-joined strings.
//! `extensions` and `custom_apps` take the tool's delta syntax (`value` appends,
//! `value-` removes); `spotify_launch_flags` is a flat string and is always
//! rewritten whole.

use crate::invoker::{Spicetify, ToolRunner};
use anyhow::{Result, bail};
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const EXTENSIONS: &str = "extensions";
pub const CUSTOM_APPS: &str = "custom_apps";
pub const LAUNCH_FLAGS: &str = "spotify_launch_flags";
pub const CURRENT_THEME: &str = "current_theme";
pub const COLOR_SCHEME: &str = "color_scheme";
pub const INJECT_CSS: &str = "inject_css";
pub const REPLACE_COLORS: &str = "replace_colors";

pub const DELIMITER: char = '|';
pub const REMOVAL_SUFFIX: &str = "-";

/// Boolean settings exposed in the toggle menu.
pub const TOGGLE_KEYS: &[&str] = &[
    INJECT_CSS,
    "inject_theme_js",
    REPLACE_COLORS,
    "overwrite_assets",
    "sidebar_config",
    "home_config",
    "experimental_features",
    "always_enable_devtools",
    "check_spicetify_update",
];

/// The external configuration service. The tool's store is the only source of truth.
pub trait ConfigStore {
    /// Current value of `key`, `None` when absent, empty or unreadable.
    fn read(&self, key: &str) -> Option<String>;
    fn read_all(&self) -> BTreeMap<String, String>;
    fn write_add(&self, key: &str, value: &str) -> Result<()>;
    /// `value` is the plain token; the removal marker is added by the store.
    fn write_remove(&self, key: &str, value: &str) -> Result<()>;
    fn write_raw(&self, key: &str, value: &str) -> Result<()>;
}

impl<R: ToolRunner> Spicetify<R> {
    fn write_config(&self, key: &str, value: &str) -> Result<()> {
        let inv = self.invoke(&["config", key, value])?;
        if !inv.succeeded() {
            bail!(
                "spicetify config {} {} failed (exit {}): {}",
                key,
                value,
                inv.code,
                inv.output.trim()
            );
        }
        Ok(())
    }
}

impl<R: ToolRunner> ConfigStore for Spicetify<R> {
    fn read(&self, key: &str) -> Option<String> {
        match self.invoke(&["config", key]) {
            Ok(inv) if inv.succeeded() => parse_config_value(&inv.stdout, key),
            Ok(inv) => {
                debug!("config read {} exited {}", key, inv.code);
                None
            }
            Err(e) => {
                debug!("config read {} failed: {}", key, e);
                None
            }
        }
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        match self.invoke(&["config"]) {
            Ok(inv) if inv.succeeded() => parse_config_dump(&inv.stdout),
            _ => BTreeMap::new(),
        }
    }

    fn write_add(&self, key: &str, value: &str) -> Result<()> {
        self.write_config(key, value)
    }

    fn write_remove(&self, key: &str, value: &str) -> Result<()> {
        self.write_config(key, &removal_value(value))
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.write_config(key, value)
    }
}

pub fn removal_value(token: &str) -> String {
    format!("{}{}", token, REMOVAL_SUFFIX)
}

/// Pulls the value of `key` out of `spicetify config <key>` output.
///
/// Accepts `key value` and `key = value` lines. A lone bare line is taken as the
/// value itself, which is how the tool answers a single-key query. The tool echoes
/// the key name when it has no value; that reads as empty.
pub fn parse_config_value(text: &str, key: &str) -> Option<String> {
    let pattern = Regex::new(&format!(r"^{}(\s+|\s*=\s*)(.*)$", regex::escape(key))).ok()?;

    let matched = text
        .lines()
        .map(str::trim)
        .find_map(|line| pattern.captures(line).map(|caps| caps[2].trim().to_string()));

    let value = match matched {
        Some(v) => v,
        None => {
            let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
            match (lines.next(), lines.next()) {
                (Some(only), None) => only.to_string(),
                _ => return None,
            }
        }
    };

    if value.is_empty() || value == key { None } else { Some(value) }
}

fn dump_line() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| Regex::new(r"^(\w+)(?:\s*=\s*|\s+|$)(.*)$").expect("static regex"))
}

/// Parses `spicetify config` (no key) output into key/value pairs.
pub fn parse_config_dump(text: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(['[', '#', ';']) {
            continue;
        }
        if let Some(caps) = dump_line().captures(line) {
            let key = caps[1].to_string();
            let value = caps[2].trim();
            let value = if value == key { "" } else { value };
            map.insert(key, value.to_string());
        }
    }
    map
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(DELIMITER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_list(tokens: &[String]) -> String {
    tokens.join(&DELIMITER.to_string())
}

/// Fresh read of a list key. Never fails; anything unexpected is an empty list.
pub fn get_list<S: ConfigStore + ?Sized>(store: &S, key: &str) -> Vec<String> {
    match store.read(key) {
        Some(value) if value.trim() != key => split_list(&value),
        _ => Vec::new(),
    }
}

pub fn add_token<S: ConfigStore + ?Sized>(store: &S, key: &str, token: &str) -> Result<()> {
    store.write_add(key, token)
}

/// One write with the removal marker; the current list is not consulted.
pub fn remove_token<S: ConfigStore + ?Sized>(store: &S, key: &str, token: &str) -> Result<()> {
    store.write_remove(key, token)
}

/// Removes every token of `known`, one call each, without re-reading the store.
///
/// `known` is the snapshot the caller displayed. Entries added to the store after
/// the snapshot survive. Never collapsed into a single empty write.
pub fn clear_all<S: ConfigStore + ?Sized>(store: &S, key: &str, known: &[String]) -> Result<usize> {
    for token in known {
        remove_token(store, key, token)?;
    }
    Ok(known.len())
}

pub fn set_raw<S: ConfigStore + ?Sized>(store: &S, key: &str, joined: &str) -> Result<()> {
    store.write_raw(key, joined)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Adds `token` unless the store already lists it; in that case nothing is written.
pub fn add_unique<S: ConfigStore + ?Sized>(
    store: &S,
    key: &str,
    token: &str,
) -> Result<AddOutcome> {
    if get_list(store, key).iter().any(|t| t == token) {
        return Ok(AddOutcome::AlreadyPresent);
    }
    add_token(store, key, token)?;
    Ok(AddOutcome::Added)
}

/// Trims user input into a storable token. Empty input and embedded delimiters are rejected.
pub fn normalize_token(input: &str) -> Option<String> {
    let token = input.trim();
    if token.is_empty() || token.contains(DELIMITER) || token.ends_with(REMOVAL_SUFFIX) {
        return None;
    }
    Some(token.to_string())
}

// --- Launch flags: read, edit in memory, write the whole string once ---

pub fn add_launch_flag<S: ConfigStore + ?Sized>(store: &S, flag: &str) -> Result<AddOutcome> {
    let mut flags = get_list(store, LAUNCH_FLAGS);
    if flags.iter().any(|f| f == flag) {
        return Ok(AddOutcome::AlreadyPresent);
    }
    flags.push(flag.to_string());
    set_raw(store, LAUNCH_FLAGS, &join_list(&flags))?;
    Ok(AddOutcome::Added)
}

/// Returns false (and writes nothing) when the flag was not set.
pub fn remove_launch_flag<S: ConfigStore + ?Sized>(store: &S, flag: &str) -> Result<bool> {
    let mut flags = get_list(store, LAUNCH_FLAGS);
    let before = flags.len();
    flags.retain(|f| f != flag);
    if flags.len() == before {
        return Ok(false);
    }
    set_raw(store, LAUNCH_FLAGS, &join_list(&flags))?;
    Ok(true)
}

pub fn clear_launch_flags<S: ConfigStore + ?Sized>(store: &S) -> Result<()> {
    set_raw(store, LAUNCH_FLAGS, "")
}

// --- Scalar settings ---

pub fn get_value<S: ConfigStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    store.read(key).filter(|v| !v.trim().is_empty() && v.trim() != key)
}

pub fn is_enabled(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

pub fn flag_enabled<S: ConfigStore + ?Sized>(store: &S, key: &str) -> bool {
    get_value(store, key).is_some_and(|v| is_enabled(&v))
}

pub fn set_flag<S: ConfigStore + ?Sized>(store: &S, key: &str, enabled: bool) -> Result<()> {
    set_raw(store, key, if enabled { "1" } else { "0" })
}
