use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::reconcile::ReconcileService;
use crate::tokens::TokenService;
use usagegraph_db::Db;

/// Everything needed to open the store.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: PathBuf,
}

pub(crate) type SharedConfig = Arc<AppConfig>;

/// Service registry shared by the HTTP surface and the CLI.
#[derive(Clone)]
pub struct AppServices {
    pub reconcile: ReconcileService,
    pub tokens: TokenService,
}

impl AppServices {
    pub fn new(config: &AppConfig) -> Self {
        let shared = Arc::new(config.clone());
        Self {
            reconcile: ReconcileService::new(shared.clone()),
            tokens: TokenService::new(shared),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db_path: PathBuf) -> Self {
        let config = AppConfig { db_path };
        let services = AppServices::new(&config);
        Self { config, services }
    }

    pub fn setup_db(&self) -> Result<()> {
        setup_db(&self.config.db_path)
    }
}

pub fn setup_db(path: &Path) -> Result<()> {
    let mut db = Db::open(path)?;
    db.migrate()?;
    Ok(())
}

pub(crate) fn open_db(config: &SharedConfig) -> Result<Db> {
    Ok(Db::open(&config.db_path)?)
}
