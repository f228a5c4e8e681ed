use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::timer::TimerDurations;

const ENABLE_LOGS: bool = true;

pub const DEFAULT_REFRESH_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutoRefreshSettings {
    /// Off until the user opts in; an expired session then waits for an
    /// explicit `timer complete`.
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for AutoRefreshSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: DEFAULT_REFRESH_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UserSettings {
    timer: TimerDurations,
    auto_refresh: AutoRefreshSettings,
}

/// Local preferences kept as pretty-printed JSON next to the database.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<UserSettings>(&contents) {
                Ok(settings) if settings.timer.validate().is_ok() => settings,
                Ok(_) | Err(_) => {
                    crate::log_warn!(
                        "Ignoring unreadable settings at {}, using defaults",
                        path.display()
                    );
                    UserSettings::default()
                }
            }
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn timer_durations(&self) -> TimerDurations {
        self.read().timer
    }

    pub fn update_timer_durations(&self, durations: TimerDurations) -> Result<()> {
        durations.validate()?;
        let mut guard = self.write();
        guard.timer = durations;
        self.persist(&guard)
    }

    pub fn auto_refresh(&self) -> AutoRefreshSettings {
        self.read().auto_refresh.clone()
    }

    pub fn update_auto_refresh(&self, settings: AutoRefreshSettings) -> Result<()> {
        if settings.interval_secs == 0 {
            anyhow::bail!("refresh interval must be at least one second");
        }
        let mut guard = self.write();
        guard.auto_refresh = settings;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
