//! Application container

use std::sync::Arc;

use studyai_auth::{HttpTransport, ReqwestTransport, SessionManager, TokenStore};
use studyai_storage::{Database, MemoryStore};

use crate::config::Config;
use crate::Result;

/// Owns the database and the process-wide session manager.
///
/// The ephemeral token region is a fresh `MemoryStore`, so session-only
/// logins end with the process.
pub struct App {
    config: Config,
    db: Database,
    session_manager: SessionManager,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
        Self::with_transport(config, transport)
    }

    /// Build with a caller-supplied transport.
    pub fn with_transport(config: Config, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let api_url = config.api_url()?;
        let db = Database::open(&config.database_path)?;

        let store = TokenStore::new(Arc::new(db.clone()), Arc::new(MemoryStore::new()));
        let session_manager =
            SessionManager::new(api_url, transport, store, config.retry_policy())?;

        tracing::info!(
            db = %config.database_path.display(),
            api = %config.api_base_url,
            "StudyAI initialized"
        );

        Ok(Self {
            config,
            db,
            session_manager,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.session_manager
    }
}
