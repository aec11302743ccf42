//! Per-run state. Lives for one process and is never persisted.

use crate::config_list::{self, ConfigStore, CUSTOM_APPS, EXTENSIONS, INJECT_CSS};
use crate::paths::SpicetifyPaths;
use log::debug;

#[derive(Debug, Default)]
pub struct Session {
    changes_applied: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes_applied(&self) -> bool {
        self.changes_applied
    }

    /// One-way: once applied in this run, always applied.
    pub fn mark_applied(&mut self) {
        self.changes_applied = true;
    }

    /// Best-effort guess for a session that has not applied anything itself.
    ///
    /// Either the backup marker is on disk, or CSS injection is on and at least one
    /// extension or custom app is configured. Neither signal is authoritative.
    pub fn refresh_applied<S: ConfigStore + ?Sized>(
        &mut self,
        store: &S,
        paths: &SpicetifyPaths,
    ) -> bool {
        if self.changes_applied {
            return true;
        }
        if paths.backup_marker().exists() {
            debug!("backup marker present, assuming applied");
            self.mark_applied();
        } else if config_list::flag_enabled(store, INJECT_CSS)
            && (!config_list::get_list(store, EXTENSIONS).is_empty()
                || !config_list::get_list(store, CUSTOM_APPS).is_empty())
        {
            debug!("css injection with configured extensions, assuming applied");
            self.mark_applied();
        }
        self.changes_applied
    }
}
