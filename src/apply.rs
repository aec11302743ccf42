//! Backup/apply sequencing around the spicetify CLI.
//!
//! `apply` fetches theme and extension manifests from GitHub and can exit non-zero
//! on a rate-limit warning after the files were already patched. Exit codes are
//! therefore cross-checked against the resulting configuration before a run is
//! called a failure.

use crate::config_list::{self, INJECT_CSS, REPLACE_COLORS};
use crate::invoker::{Invocation, Spicetify, ToolRunner};
use crate::paths;
use crate::session::Session;
use anyhow::{Result, bail};
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    Created,
    /// The tool refused, but a backup from an earlier run is already there.
    AlreadyPresent,
    /// Logged and ignored; apply still runs.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Non-zero exit, but the config shows the patch landed.
    AppliedDespiteError,
    Failed(String),
}

impl ApplyOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ApplyOutcome::Failed(_))
    }
}

pub fn backup<R: ToolRunner>(tool: &Spicetify<R>) -> BackupOutcome {
    match tool.invoke(&["backup"]) {
        Ok(inv) if inv.succeeded() => {
            info!("backup created");
            return BackupOutcome::Created;
        }
        Ok(inv) => debug!("backup exited {}: {}", inv.code, inv.output.trim()),
        Err(e) => debug!("backup could not run: {}", e),
    }

    if paths::backup_listed(tool) {
        BackupOutcome::AlreadyPresent
    } else {
        warn!("backup failed and no existing backup was found; continuing");
        BackupOutcome::Failed
    }
}

pub fn apply<R: ToolRunner>(tool: &Spicetify<R>, session: &mut Session) -> ApplyOutcome {
    let detail = match tool.invoke(&["apply", "--no-restart"]) {
        Ok(inv) if inv.succeeded() => {
            restart(tool);
            session.mark_applied();
            return ApplyOutcome::Applied;
        }
        Ok(inv) => format!("exit {}: {}", inv.code, inv.output.trim()),
        Err(e) => e.to_string(),
    };

    if config_list::flag_enabled(tool, INJECT_CSS)
        && config_list::flag_enabled(tool, REPLACE_COLORS)
    {
        warn!("apply reported failure ({}) but config shows it applied", detail);
        restart(tool);
        session.mark_applied();
        ApplyOutcome::AppliedDespiteError
    } else {
        ApplyOutcome::Failed(detail)
    }
}

pub fn backup_and_apply<R: ToolRunner>(
    tool: &Spicetify<R>,
    session: &mut Session,
) -> (BackupOutcome, ApplyOutcome) {
    let backup = backup(tool);
    let applied = apply(tool, session);
    (backup, applied)
}

/// Fire-and-forget; a failed restart changes nothing for the caller.
fn restart<R: ToolRunner>(tool: &Spicetify<R>) {
    if let Err(e) = tool.invoke(&["restart"]) {
        debug!("restart failed: {}", e);
    }
}

fn run_checked<R: ToolRunner>(tool: &Spicetify<R>, args: &[&str]) -> Result<Invocation> {
    let inv = tool.invoke(args)?;
    if !inv.succeeded() {
        bail!("spicetify {} failed (exit {}): {}", args.join(" "), inv.code, inv.output.trim());
    }
    Ok(inv)
}

/// Puts the vanilla client files back. The session flag stays as it was.
pub fn restore<R: ToolRunner>(tool: &Spicetify<R>) -> Result<()> {
    run_checked(tool, &["restore"]).map(|_| ())
}

pub fn refresh_extensions<R: ToolRunner>(tool: &Spicetify<R>) -> Result<()> {
    run_checked(tool, &["refresh", "-e"]).map(|_| ())
}

pub fn enable_devtools<R: ToolRunner>(tool: &Spicetify<R>) -> Result<()> {
    run_checked(tool, &["enable-devtools"]).map(|_| ())
}

pub fn spotify_updates<R: ToolRunner>(tool: &Spicetify<R>, block: bool) -> Result<()> {
    let mode = if block { "block" } else { "unblock" };
    run_checked(tool, &["spotify-updates", mode]).map(|_| ())
}
