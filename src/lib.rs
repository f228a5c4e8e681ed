pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod session;
pub mod settings;
pub mod shell;
pub mod tasks;
pub mod timer;
pub mod utils;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::Mutex;

use config::AppConfig;
use db::Database;
use session::UserContext;
use settings::SettingsStore;

/// Shared state handed to every command.
pub struct AppState {
    pub(crate) db: Database,
    pub(crate) settings: SettingsStore,
    pub(crate) config: AppConfig,
    pub(crate) session: Mutex<Option<UserContext>>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, settings: SettingsStore) -> Self {
        Self {
            db,
            settings,
            config,
            session: Mutex::new(None),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "monkmode", version, about = "Daily tasks and a Pomodoro timer")]
struct Args {
    /// Data directory (default: $MONKMODE_HOME or ~/.monkmode)
    #[arg(long)]
    home: Option<PathBuf>,

    /// SQLite database file (default: <home>/monkmode.sqlite3)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(home) = args.home {
        config = AppConfig::with_home(home, args.db.clone(), config.debug);
    }
    if let Some(db_path) = args.db {
        config.db_path = db_path;
    }
    config.debug |= args.debug;

    utils::logging::init_logging(config.debug);
    log::info!("monkmode starting up...");

    config.ensure_home()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(async {
        let database = Database::new(config.db_path.clone())?;
        let settings = SettingsStore::new(config.settings_path.clone())?;
        let state = AppState::new(config, database, settings);
        shell::run_shell(&state).await
    })
}
