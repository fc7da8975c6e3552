use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::booth::error::BoothError;
use crate::booth::session::Session;
use crate::booth::traits::{ImageGenerator, ImageUploader};
use crate::themes::ThemeCatalog;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ThemeCatalog>,
    pub generator: Arc<dyn ImageGenerator>,
    pub uploader: Arc<dyn ImageUploader>,
    pub sessions: Arc<Mutex<HashMap<String, Session>>>,
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(
        catalog: ThemeCatalog,
        generator: Arc<dyn ImageGenerator>,
        uploader: Arc<dyn ImageUploader>,
        session_ttl: Duration,
    ) -> Self {
        AppState {
            catalog: Arc::new(catalog),
            generator,
            uploader,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            session_ttl,
        }
    }

    pub fn create_session(&self) -> Session {
        let session = Session::new(Uuid::new_v4().to_string());
        let mut sessions = self.sessions.lock();
        let pruned = prune_idle(&mut sessions, self.session_ttl);
        if pruned > 0 {
            info!("Pruned {} idle booth session(s)", pruned);
        }
        sessions.insert(session.id().to_string(), session.clone());
        session
    }

    /// Runs `f` against the session while holding the store lock. Never
    /// call this across an await point.
    pub fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Session) -> Result<T, BoothError>,
    ) -> Result<T, BoothError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| BoothError::SessionNotFound(id.to_string()))?;
        f(session)
    }

    pub fn prune_expired(&self) -> usize {
        prune_idle(&mut self.sessions.lock(), self.session_ttl)
    }
}

fn prune_idle(sessions: &mut HashMap<String, Session>, ttl: Duration) -> usize {
    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        return 0;
    };
    let cutoff = Utc::now() - ttl;
    let before = sessions.len();
    sessions.retain(|_, session| session.updated_at() >= cutoff);
    before - sessions.len()
}
