//! Non-interactive entry points. Each subcommand maps onto one menu action.

use crate::app::{App, ListKind};
use crate::config_list::AddOutcome;
use crate::invoker::ToolRunner;
use crate::menu;
use crate::ui;
use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Install and configure Spotify with Spicetify",
    long_about = None
)]
pub struct Args {
    /// Runs the interactive menu when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install Spotify, Spicetify or the Marketplace
    Install {
        #[arg(value_enum)]
        target: InstallTarget,
    },
    /// Manage enabled extensions
    Extension {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Manage enabled custom apps
    App {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Manage Spotify launch flags
    Flags {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Flip a boolean setting (e.g. inject_css)
    Toggle { key: String },
    /// Select a theme and optionally its color scheme
    Theme { name: String, scheme: Option<String> },
    /// Back up the vanilla client, then apply
    Backup,
    /// Apply the current configuration
    Apply,
    /// Restore the vanilla client
    Restore,
    /// Reload extensions without a full apply
    Refresh,
    /// Enable Spotify developer tools
    Devtools,
    /// Block or unblock Spotify auto-updates
    Updates {
        #[arg(value_enum)]
        mode: UpdateMode,
    },
    /// Manage the GitHub token used for release downloads
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Show what is installed and configured
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InstallTarget {
    Spotify,
    Spicetify,
    Marketplace,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UpdateMode {
    Block,
    Unblock,
}

#[derive(Debug, Subcommand)]
pub enum ListAction {
    List,
    /// Add an entry; dash-leading values like --minimized are accepted
    Add {
        #[arg(allow_hyphen_values = true)]
        name: String,
    },
    Remove {
        #[arg(allow_hyphen_values = true)]
        name: String,
    },
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum TokenAction {
    Set { token: String },
    Clear,
    Check,
}

pub fn run<R: ToolRunner>(app: &mut App<R>, command: Command) -> Result<()> {
    match command {
        Command::Install { target } => match target {
            InstallTarget::Spotify => {
                let found = app.install_spotify()?;
                ui::success(&format!("Spotify {}", found.describe()));
            }
            InstallTarget::Spicetify => {
                let version = app.install_spicetify()?;
                ui::success(&format!("Spicetify {} installed", version));
            }
            InstallTarget::Marketplace => {
                app.install_marketplace()?;
                ui::success("Marketplace installed. Run `apply` to load it.");
            }
        },
        Command::Extension { action } => list_action(app, ListKind::Extensions, action)?,
        Command::App { action } => list_action(app, ListKind::CustomApps, action)?,
        Command::Flags { action } => flags_action(app, action)?,
        Command::Toggle { key } => {
            let enabled = app.toggle(&key)?;
            ui::success(&format!("{} is now {}.", key, if enabled { "on" } else { "off" }));
        }
        Command::Theme { name, scheme } => {
            app.set_theme(&name, scheme.as_deref())?;
            ui::success(&format!("Theme set to {}.", name.trim()));
        }
        Command::Backup => {
            let (backup, applied) = app.backup_and_apply()?;
            menu::report_backup(backup);
            finish_apply(&applied)?;
        }
        Command::Apply => finish_apply(&app.apply()?)?,
        Command::Restore => {
            app.restore()?;
            ui::success("Spotify restored.");
        }
        Command::Refresh => {
            app.refresh_extensions()?;
            ui::success("Extensions refreshed.");
        }
        Command::Devtools => {
            app.enable_devtools()?;
            ui::success("Devtools enabled.");
        }
        Command::Updates { mode } => {
            let block = matches!(mode, UpdateMode::Block);
            app.spotify_updates(block)?;
            ui::success(if block {
                "Spotify updates blocked."
            } else {
                "Spotify updates unblocked."
            });
        }
        Command::Token { action } => match action {
            TokenAction::Set { token } => menu::report_token(app.set_token(&token)?, true),
            TokenAction::Clear => {
                app.clear_token()?;
                ui::success("Token removed.");
            }
            TokenAction::Check => match app.check_token()? {
                Some(check) => menu::report_token(check, false),
                None => ui::info("No token saved."),
            },
        },
        Command::Status => menu::print_status(&app.status()),
    }
    Ok(())
}

fn finish_apply(outcome: &crate::apply::ApplyOutcome) -> Result<()> {
    menu::report_apply(outcome);
    if !outcome.is_success() {
        bail!("apply did not complete");
    }
    Ok(())
}

fn list_action<R: ToolRunner>(app: &App<R>, kind: ListKind, action: ListAction) -> Result<()> {
    match action {
        ListAction::List => {
            for item in app.list(kind) {
                println!("{}", item);
            }
        }
        ListAction::Add { name } => report_add(app.add_item(kind, &name)?, &name),
        ListAction::Remove { name } => {
            app.remove_item(kind, &name)?;
            ui::success(&format!("Removed {}.", name.trim()));
        }
        ListAction::Clear => {
            let snapshot = app.list(kind);
            let removed = app.clear_items(kind, &snapshot)?;
            ui::success(&format!("Removed {} entries.", removed));
        }
    }
    Ok(())
}

fn flags_action<R: ToolRunner>(app: &App<R>, action: ListAction) -> Result<()> {
    match action {
        ListAction::List => {
            for flag in app.launch_flags() {
                println!("{}", flag);
            }
        }
        ListAction::Add { name } => report_add(app.add_launch_flag(&name)?, &name),
        ListAction::Remove { name } => {
            if app.remove_launch_flag(&name)? {
                ui::success(&format!("Removed {}.", name.trim()));
            } else {
                ui::info(&format!("{} was not set.", name.trim()));
            }
        }
        ListAction::Clear => {
            app.clear_launch_flags()?;
            ui::success("Launch flags cleared.");
        }
    }
    Ok(())
}

fn report_add(outcome: AddOutcome, name: &str) {
    match outcome {
        AddOutcome::Added => ui::success(&format!("Added {}.", name.trim())),
        AddOutcome::AlreadyPresent => ui::warn(&format!("{} is already enabled.", name.trim())),
    }
}
