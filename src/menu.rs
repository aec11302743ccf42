//! Interactive numbered menu. Every failure is printed and the loop carries on.

use crate::app::{App, ListKind, StatusReport};
use crate::apply::{ApplyOutcome, BackupOutcome};
use crate::config_list::AddOutcome;
use crate::invoker::ToolRunner;
use crate::release::TokenCheck;
use crate::settings::mask_secret;
use crate::ui;
use anyhow::{Context, Result};
use colored::*;
use inquire::{Confirm, InquireError, Password, PasswordDisplayMode, Select, Text};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainEntry {
    InstallSpotify,
    InstallSpicetify,
    Extensions,
    CustomApps,
    Themes,
    Toggles,
    LaunchFlags,
    BackupApply,
    Restore,
    Devtools,
    Updates,
    Token,
    Status,
    Exit,
}

impl MainEntry {
    pub const ALL: [MainEntry; 14] = [
        MainEntry::InstallSpotify,
        MainEntry::InstallSpicetify,
        MainEntry::Extensions,
        MainEntry::CustomApps,
        MainEntry::Themes,
        MainEntry::Toggles,
        MainEntry::LaunchFlags,
        MainEntry::BackupApply,
        MainEntry::Restore,
        MainEntry::Devtools,
        MainEntry::Updates,
        MainEntry::Token,
        MainEntry::Status,
        MainEntry::Exit,
    ];

    pub fn number(self) -> u8 {
        match self {
            MainEntry::Exit => 0,
            other => MainEntry::ALL.iter().position(|e| *e == other).map_or(0, |i| i as u8 + 1),
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        MainEntry::ALL.into_iter().find(|e| e.number() == n)
    }

    pub fn label(self) -> &'static str {
        match self {
            MainEntry::InstallSpotify => "Install Spotify",
            MainEntry::InstallSpicetify => "Install / update Spicetify",
            MainEntry::Extensions => "Extensions",
            MainEntry::CustomApps => "Custom apps",
            MainEntry::Themes => "Themes",
            MainEntry::Toggles => "Toggle settings",
            MainEntry::LaunchFlags => "Launch flags",
            MainEntry::BackupApply => "Backup & apply",
            MainEntry::Restore => "Restore vanilla Spotify",
            MainEntry::Devtools => "Enable devtools",
            MainEntry::Updates => "Block / unblock Spotify updates",
            MainEntry::Token => "GitHub token",
            MainEntry::Status => "Status",
            MainEntry::Exit => "Exit",
        }
    }
}

impl fmt::Display for MainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>2}. {}", self.number(), self.label())
    }
}

/// Esc / Ctrl-C on a sub-prompt means "back", not an error.
fn ask<T>(result: Result<T, InquireError>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e).context("Prompt failed"),
    }
}

fn confirm(message: &str, default: bool) -> Result<bool> {
    Ok(ask(Confirm::new(message).with_default(default).prompt())?.unwrap_or(false))
}

pub fn run<R: ToolRunner>(app: &mut App<R>) -> Result<()> {
    ui::banner();
    loop {
        let Some(entry) = ask(
            Select::new("Main menu:", MainEntry::ALL.to_vec())
                .with_page_size(MainEntry::ALL.len())
                .prompt(),
        )?
        else {
            break;
        };
        if entry == MainEntry::Exit {
            break;
        }
        if let Err(e) = dispatch(app, entry) {
            ui::error(&format!("{:#}", e));
        }
    }
    println!("{}", "👋 Bye.".dimmed());
    Ok(())
}

fn dispatch<R: ToolRunner>(app: &mut App<R>, entry: MainEntry) -> Result<()> {
    match entry {
        MainEntry::InstallSpotify => {
            ui::header("🎵 Spotify");
            let found = app.install_spotify()?;
            ui::success(&format!("Spotify {}", found.describe()));
            if !found.supports_spicetify() {
                ui::warn("Spicetify cannot patch this build. Install the regular desktop client.");
            }
        }
        MainEntry::InstallSpicetify => {
            ui::header("🌶️  Spicetify");
            let version = app.install_spicetify()?;
            ui::success(&format!(
                "Spicetify {} installed in {}",
                version,
                app.paths.install_dir.display()
            ));
            if confirm("Install the Marketplace as well?", true)? {
                app.install_marketplace()?;
                ui::success("Marketplace installed.");
                offer_apply(app)?;
            }
        }
        MainEntry::Extensions => list_menu(app, ListKind::Extensions)?,
        MainEntry::CustomApps => list_menu(app, ListKind::CustomApps)?,
        MainEntry::Themes => theme_menu(app)?,
        MainEntry::Toggles => toggle_menu(app)?,
        MainEntry::LaunchFlags => flags_menu(app)?,
        MainEntry::BackupApply => {
            ui::header("💾 Backup & apply");
            let (backup, applied) = app.backup_and_apply()?;
            report_backup(backup);
            report_apply(&applied);
        }
        MainEntry::Restore => {
            app.require_tool()?;
            if confirm("Restore Spotify to its vanilla state?", false)? {
                app.restore()?;
                ui::success("Spotify restored.");
            }
        }
        MainEntry::Devtools => {
            app.enable_devtools()?;
            ui::success("Devtools enabled. Restart Spotify to use them.");
        }
        MainEntry::Updates => {
            app.require_tool()?;
            let choice = ask(Select::new("Spotify updates:", vec!["Block", "Unblock"]).prompt())?;
            if let Some(choice) = choice {
                let block = choice == "Block";
                app.spotify_updates(block)?;
                ui::success(if block {
                    "Spotify updates blocked."
                } else {
                    "Spotify updates unblocked."
                });
            }
        }
        MainEntry::Token => token_menu(app)?,
        MainEntry::Status => print_status(&app.status()),
        MainEntry::Exit => {}
    }
    Ok(())
}

/// Applies straight away if the user agrees; the first apply also takes a backup.
fn offer_apply<R: ToolRunner>(app: &mut App<R>) -> Result<()> {
    if !confirm("Apply changes now?", true)? {
        ui::info("Changes are saved. Use \"Backup & apply\" when ready.");
        return Ok(());
    }
    if app.session.changes_applied() {
        report_apply(&app.apply()?);
    } else {
        let (backup, applied) = app.backup_and_apply()?;
        report_backup(backup);
        report_apply(&applied);
    }
    Ok(())
}

const TYPE_IN: &str = "✏️  Type a name...";

fn list_menu<R: ToolRunner>(app: &mut App<R>, kind: ListKind) -> Result<()> {
    app.require_tool()?;
    let mut changed = false;
    loop {
        // Re-read every time; the store is the only copy
        let current = app.list(kind);
        ui::list(&format!("Enabled {}s", kind.label()), &current);

        let actions = vec!["Add", "Remove", "Clear all", "Back"];
        let Some(action) = ask(Select::new("Action:", actions).prompt())? else { break };
        match action {
            "Add" => {
                let mut options: Vec<String> =
                    app.available(kind).into_iter().filter(|n| !current.contains(n)).collect();
                options.push(TYPE_IN.to_string());
                let Some(mut name) = ask(Select::new("Add which?", options).prompt())? else {
                    continue;
                };
                if name == TYPE_IN {
                    let Some(typed) = ask(Text::new("Name:").prompt())? else { continue };
                    name = typed;
                }
                if current.iter().any(|t| t == name.trim()) {
                    ui::warn(&format!("{} is already enabled.", name.trim()));
                    continue;
                }
                match app.add_item(kind, &name)? {
                    AddOutcome::Added => {
                        ui::success(&format!("Added {}.", name.trim()));
                        changed = true;
                    }
                    AddOutcome::AlreadyPresent => {
                        ui::warn(&format!("{} is already enabled.", name.trim()))
                    }
                }
            }
            "Remove" => {
                if current.is_empty() {
                    ui::info("Nothing to remove.");
                    continue;
                }
                let picked = ask(Select::new("Remove which?", current.clone()).prompt())?;
                let Some(token) = picked else { continue };
                app.remove_item(kind, &token)?;
                ui::success(&format!("Removed {}.", token));
                changed = true;
            }
            "Clear all" => {
                if current.is_empty() {
                    ui::info("Nothing to clear.");
                    continue;
                }
                if confirm(&format!("Remove all {} {}s?", current.len(), kind.label()), false)? {
                    let removed = app.clear_items(kind, &current)?;
                    ui::success(&format!("Removed {} entries.", removed));
                    changed = true;
                }
            }
            _ => break,
        }
    }
    if changed {
        offer_apply(app)?;
    }
    Ok(())
}

fn flags_menu<R: ToolRunner>(app: &mut App<R>) -> Result<()> {
    app.require_tool()?;
    let mut changed = false;
    loop {
        let current = app.launch_flags();
        ui::list("Launch flags", &current);

        let actions = vec!["Add", "Remove", "Clear all", "Back"];
        let Some(action) = ask(Select::new("Action:", actions).prompt())? else {
            break;
        };
        match action {
            "Add" => {
                let Some(flag) = ask(Text::new("Flag (e.g. --minimized):").prompt())? else {
                    continue;
                };
                match app.add_launch_flag(&flag)? {
                    AddOutcome::Added => {
                        ui::success(&format!("Added {}.", flag.trim()));
                        changed = true;
                    }
                    AddOutcome::AlreadyPresent => {
                        ui::warn(&format!("{} is already set.", flag.trim()))
                    }
                }
            }
            "Remove" => {
                if current.is_empty() {
                    ui::info("Nothing to remove.");
                    continue;
                }
                let Some(flag) = ask(Select::new("Remove which?", current).prompt())? else {
                    continue;
                };
                if app.remove_launch_flag(&flag)? {
                    ui::success(&format!("Removed {}.", flag));
                    changed = true;
                }
            }
            "Clear all" => {
                if confirm("Clear all launch flags?", false)? {
                    app.clear_launch_flags()?;
                    ui::success("Launch flags cleared.");
                    changed = true;
                }
            }
            _ => break,
        }
    }
    if changed {
        offer_apply(app)?;
    }
    Ok(())
}

fn toggle_menu<R: ToolRunner>(app: &mut App<R>) -> Result<()> {
    app.require_tool()?;
    let mut changed = false;
    loop {
        let mut options: Vec<String> = app
            .toggles()
            .into_iter()
            .map(|(key, on)| format!("{:<26} [{}]", key, if on { "on" } else { "off" }))
            .collect();
        options.push("Back".to_string());

        let prompt = Select::new("Toggle which setting?", options).with_page_size(12);
        let Some(choice) = ask(prompt.prompt())? else {
            break;
        };
        let Some(key) = choice.split_whitespace().next().filter(|k| *k != "Back") else { break };
        let enabled = app.toggle(key)?;
        ui::success(&format!("{} is now {}.", key, if enabled { "on" } else { "off" }));
        changed = true;
    }
    if changed {
        offer_apply(app)?;
    }
    Ok(())
}

fn theme_menu<R: ToolRunner>(app: &mut App<R>) -> Result<()> {
    app.require_tool()?;
    let themes = app.themes();
    let theme = if themes.is_empty() {
        ui::warn(&format!("No themes found in {}.", app.paths.user_themes().display()));
        ask(Text::new("Theme name:").prompt())?
    } else {
        ask(Select::new("Theme:", themes).prompt())?
    };
    let Some(theme) = theme else { return Ok(()) };

    let schemes = app.color_schemes(&theme);
    let scheme = if schemes.is_empty() {
        None
    } else {
        ask(Select::new("Color scheme:", schemes).prompt())?
    };

    app.set_theme(&theme, scheme.as_deref())?;
    match &scheme {
        Some(s) => ui::success(&format!("Theme set to {} ({}).", theme.trim(), s)),
        None => ui::success(&format!("Theme set to {}.", theme.trim())),
    }
    offer_apply(app)
}

fn token_menu<R: ToolRunner>(app: &mut App<R>) -> Result<()> {
    ui::header("🔑 GitHub token");
    match app.settings.token() {
        Some(token) => ui::key_value("Saved token", &mask_secret(token)),
        None => ui::info("No token saved. Release downloads use anonymous requests."),
    }
    let actions = vec!["Set", "Check", "Clear", "Back"];
    let Some(action) = ask(Select::new("Action:", actions).prompt())? else {
        return Ok(());
    };
    match action {
        "Set" => {
            let Some(token) = ask(
                Password::new("Token:")
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .without_confirmation()
                    .prompt(),
            )?
            else {
                return Ok(());
            };
            report_token(app.set_token(&token)?, true);
        }
        "Check" => match app.check_token()? {
            Some(check) => report_token(check, false),
            None => ui::info("No token saved."),
        },
        "Clear" => {
            app.clear_token()?;
            ui::success("Token removed.");
        }
        _ => {}
    }
    Ok(())
}

pub fn report_backup(outcome: BackupOutcome) {
    match outcome {
        BackupOutcome::Created => ui::success("Backup created."),
        BackupOutcome::AlreadyPresent => ui::info("Backup already exists."),
        BackupOutcome::Failed => ui::warn("Backup failed; continuing with apply."),
    }
}

pub fn report_apply(outcome: &ApplyOutcome) {
    match outcome {
        ApplyOutcome::Applied => ui::success("Changes applied. Spotify is restarting."),
        ApplyOutcome::AppliedDespiteError => {
            ui::warn(
                "Spicetify reported an error, but the configuration shows the changes landed.",
            );
            ui::success("Changes applied. Spotify is restarting.");
        }
        ApplyOutcome::Failed(detail) => ui::error(&format!("Apply failed: {}", detail)),
    }
}

pub fn report_token(check: TokenCheck, saving: bool) {
    match check {
        TokenCheck::Valid { remaining } => {
            let quota = remaining
                .map(|r| format!(" ({} requests left this hour)", r))
                .unwrap_or_default();
            ui::success(&format!("Token is valid{}.", quota));
        }
        TokenCheck::RateLimited => {
            ui::warn("GitHub is rate limiting; the token could not be fully checked.")
        }
        TokenCheck::Invalid if saving => ui::error("GitHub rejected the token. It was not saved."),
        TokenCheck::Invalid => {
            ui::error("GitHub rejects the saved token. Set a new one or clear it.")
        }
    }
}

pub fn print_status(report: &StatusReport) {
    ui::header("📋 Status");
    ui::key_value("Spotify", &report.client.describe());
    ui::key_value("Spicetify", report.tool_version.as_deref().unwrap_or("not installed"));
    ui::key_value("Changes applied", if report.applied { "yes" } else { "no" });
    ui::key_value("Theme", report.theme.as_deref().unwrap_or("(default)"));
    if let Some(scheme) = &report.color_scheme {
        ui::key_value("Color scheme", scheme);
    }
    ui::list("Extensions", &report.extensions);
    ui::list("Custom apps", &report.custom_apps);
    ui::list("Launch flags", &report.launch_flags);
}
