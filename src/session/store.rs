//! Session persistence with optimistic versioning.

use crate::session::model::ClassSession;
use crate::RollcallError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Persistence collaborator for class sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a newly scheduled session.
    async fn insert(&self, session: ClassSession) -> Result<ClassSession, RollcallError>;

    /// Fetch a session by id.
    async fn get(&self, id: Uuid) -> Result<Option<ClassSession>, RollcallError>;

    /// Replace a session only if the stored version still equals `expected_version`.
    ///
    /// On success the stored copy carries `expected_version + 1` and is returned.
    /// A version mismatch yields `Conflict`.
    async fn compare_and_swap(
        &self,
        session: ClassSession,
        expected_version: u64,
    ) -> Result<ClassSession, RollcallError>;

    /// Remove a session, returning it if it existed.
    async fn delete(&self, id: Uuid) -> Result<Option<ClassSession>, RollcallError>;

    /// Sessions owned by a teacher, newest start first.
    async fn by_teacher(&self, teacher_id: &str) -> Result<Vec<ClassSession>, RollcallError>;

    /// Sessions for a cohort, newest start first.
    async fn by_batch(&self, batch: &str) -> Result<Vec<ClassSession>, RollcallError>;
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, ClassSession>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn filtered<F>(&self, keep: F) -> Result<Vec<ClassSession>, RollcallError>
    where
        F: Fn(&ClassSession) -> bool,
    {
        let guard = self.sessions.read().map_err(|_| poisoned())?;
        let mut sessions: Vec<ClassSession> = guard.values().filter(|s| keep(s)).cloned().collect();
        sessions.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
        Ok(sessions)
    }
}

fn poisoned() -> RollcallError {
    RollcallError::Internal("session store lock poisoned".to_string())
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, mut session: ClassSession) -> Result<ClassSession, RollcallError> {
        let mut guard = self.sessions.write().map_err(|_| poisoned())?;
        if guard.contains_key(&session.id) {
            return Err(RollcallError::Conflict(format!("session {} already exists", session.id)));
        }
        session.version = 1;
        guard.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ClassSession>, RollcallError> {
        let guard = self.sessions.read().map_err(|_| poisoned())?;
        Ok(guard.get(&id).cloned())
    }

    async fn compare_and_swap(
        &self,
        mut session: ClassSession,
        expected_version: u64,
    ) -> Result<ClassSession, RollcallError> {
        let mut guard = self.sessions.write().map_err(|_| poisoned())?;
        let current = guard
            .get(&session.id)
            .ok_or_else(|| RollcallError::NotFound("Schedule".to_string()))?;
        if current.version != expected_version {
            return Err(RollcallError::Conflict(format!(
                "session {} was modified concurrently (expected v{}, found v{})",
                session.id, expected_version, current.version
            )));
        }
        session.version = expected_version + 1;
        guard.insert(session.id, session.clone());
        Ok(session)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<ClassSession>, RollcallError> {
        let mut guard = self.sessions.write().map_err(|_| poisoned())?;
        Ok(guard.remove(&id))
    }

    async fn by_teacher(&self, teacher_id: &str) -> Result<Vec<ClassSession>, RollcallError> {
        self.filtered(|s| s.teacher_id == teacher_id)
    }

    async fn by_batch(&self, batch: &str) -> Result<Vec<ClassSession>, RollcallError> {
        self.filtered(|s| s.batch == batch)
    }
}
