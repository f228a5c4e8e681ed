use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

pub const HOME_ENV: &str = "MONKMODE_HOME";
pub const DB_ENV: &str = "MONKMODE_DB";
pub const DEBUG_ENV: &str = "MONKMODE_DEBUG";

/// Where the app keeps its files, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub settings_path: PathBuf,
    pub debug: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let home = match std::env::var_os(HOME_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = std::env::var("HOME").context("HOME is not set")?;
                PathBuf::from(home).join(".monkmode")
            }
        };
        let db_path = std::env::var_os(DB_ENV).map(PathBuf::from);
        let debug = std::env::var(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self::with_home(home, db_path, debug))
    }

    pub fn with_home(home: PathBuf, db_path: Option<PathBuf>, debug: bool) -> Self {
        Self {
            db_path: db_path.unwrap_or_else(|| home.join("monkmode.sqlite3")),
            settings_path: home.join("settings.json"),
            home,
            debug,
        }
    }

    pub fn ensure_home(&self) -> Result<()> {
        fs::create_dir_all(&self.home).with_context(|| format!("create {}", self.home.display()))
    }
}
