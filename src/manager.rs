//! Session Manager - the single writer of class session state.
//!
//! Every mutation of one session id runs under that id's async mutex and is
//! persisted with a version check, so a rapid double "start" deterministically
//! sees `InvalidState` on the second call. Announcements are enqueued after the
//! write commits and never affect the caller's result.

use crate::clock::{Clock, SystemClock};
use crate::geo::GeoPoint;
use crate::identity::IdentityDirectory;
use crate::notify::{Announcement, Notifier};
use crate::session::{ClassSession, NewSession, SessionPatch, SessionStore};
use crate::RollcallError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SCHEDULE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Owns the open/closed state machine of every class session.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn IdentityDirectory>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionManager {
    /// Create a manager using the system clock.
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn IdentityDirectory>,
        notifier: Notifier,
    ) -> Self {
        Self::with_clock(store, directory, notifier, Arc::new(SystemClock))
    }

    /// Create a manager with a custom clock.
    pub fn with_clock(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn IdentityDirectory>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Schedule a new, closed session and announce it.
    ///
    /// # Errors
    /// `InvalidRequest` if label or batch is empty or the window is inverted.
    pub async fn create_session(
        &self,
        teacher_id: &str,
        new: NewSession,
    ) -> Result<ClassSession, RollcallError> {
        let session = ClassSession::schedule(teacher_id, new, self.clock.now_utc())?;
        let session = self.store.insert(session).await?;
        tracing::info!(session_id = %session.id, teacher_id, batch = %session.batch, "session scheduled");

        self.announce(
            "Class Schedule",
            format!(
                "Your class \"{}\" is scheduled from {} to {}",
                session.label,
                format_time(session.starts_at),
                format_time(session.ends_at)
            ),
        );
        Ok(session)
    }

    /// Open a session for check-ins, optionally moving it to `location`.
    ///
    /// # Errors
    /// - `NotFound` if the session does not exist or belongs to another teacher
    /// - `InvalidState` if it is already open
    /// - `InvalidRequest` if `location` is malformed
    pub async fn open_session(
        &self,
        teacher_id: &str,
        session_id: Uuid,
        location: Option<GeoPoint>,
    ) -> Result<ClassSession, RollcallError> {
        let session = self
            .mutate(teacher_id, session_id, |session, now| session.open(location, now))
            .await?;
        tracing::info!(%session_id, teacher_id, "class started");

        self.announce(
            "Class started",
            format!("{} is now taking attendance", session.label),
        );
        Ok(session)
    }

    /// Close a session.
    ///
    /// # Errors
    /// `NotFound` as for [`open_session`](Self::open_session); `InvalidState`
    /// if the session is already closed.
    pub async fn close_session(
        &self,
        teacher_id: &str,
        session_id: Uuid,
    ) -> Result<ClassSession, RollcallError> {
        let session = self
            .mutate(teacher_id, session_id, |session, now| session.close(now))
            .await?;
        tracing::info!(%session_id, teacher_id, "class ended");

        self.announce("Class ended", format!("{} has ended", session.label));
        Ok(session)
    }

    /// Merge supplied fields into a session and announce the change.
    pub async fn update_session(
        &self,
        teacher_id: &str,
        session_id: Uuid,
        patch: SessionPatch,
    ) -> Result<ClassSession, RollcallError> {
        let session = self
            .mutate(teacher_id, session_id, |session, now| session.apply(patch, now))
            .await?;
        tracing::info!(%session_id, teacher_id, "session updated");

        self.announce(
            "Class schedule updated !!",
            format!(
                "Your class Schedule for {} from {} to {}",
                session.label,
                format_time(session.starts_at),
                format_time(session.ends_at)
            ),
        );
        Ok(session)
    }

    /// Delete a session owned by `teacher_id`. Its attendance records stay.
    pub async fn delete_session(
        &self,
        teacher_id: &str,
        session_id: Uuid,
    ) -> Result<ClassSession, RollcallError> {
        let lock = self.lock_for(session_id)?;
        let _guard = lock.lock().await;

        self.owned(teacher_id, session_id).await?;
        let deleted = self
            .store
            .delete(session_id)
            .await?
            .ok_or_else(|| RollcallError::NotFound("Schedule".to_string()))?;

        self.locks
            .lock()
            .map_err(|_| poisoned())?
            .remove(&session_id);
        tracing::info!(%session_id, teacher_id, "session deleted");
        Ok(deleted)
    }

    /// Fetch a session owned by `teacher_id`.
    pub async fn get_session(
        &self,
        teacher_id: &str,
        session_id: Uuid,
    ) -> Result<ClassSession, RollcallError> {
        self.owned(teacher_id, session_id).await
    }

    /// Fetch any session by id, regardless of owner.
    pub async fn find(&self, session_id: Uuid) -> Result<ClassSession, RollcallError> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| RollcallError::NotFound("Class".to_string()))
    }

    /// Sessions of a teacher, newest start first.
    pub async fn teacher_sessions(&self, teacher_id: &str) -> Result<Vec<ClassSession>, RollcallError> {
        self.store.by_teacher(teacher_id).await
    }

    /// Sessions of the student's cohort, newest start first.
    pub async fn batch_sessions(&self, student_id: &str) -> Result<Vec<ClassSession>, RollcallError> {
        let student = self
            .directory
            .student(student_id)
            .await?
            .ok_or_else(|| RollcallError::NotFound("Student".to_string()))?;
        self.store.by_batch(&student.batch).await
    }

    async fn owned(&self, teacher_id: &str, session_id: Uuid) -> Result<ClassSession, RollcallError> {
        match self.store.get(session_id).await? {
            Some(session) if session.teacher_id == teacher_id => Ok(session),
            _ => Err(RollcallError::NotFound("Schedule".to_string())),
        }
    }

    async fn mutate<F>(
        &self,
        teacher_id: &str,
        session_id: Uuid,
        change: F,
    ) -> Result<ClassSession, RollcallError>
    where
        F: FnOnce(&mut ClassSession, DateTime<Utc>) -> Result<(), RollcallError>,
    {
        let lock = self.lock_for(session_id)?;
        let _guard = lock.lock().await;

        let mut session = self.owned(teacher_id, session_id).await?;
        let expected = session.version;
        change(&mut session, self.clock.now_utc())?;
        self.store.compare_and_swap(session, expected).await
    }

    fn lock_for(&self, session_id: Uuid) -> Result<Arc<tokio::sync::Mutex<()>>, RollcallError> {
        let mut locks = self.locks.lock().map_err(|_| poisoned())?;
        Ok(Arc::clone(locks.entry(session_id).or_default()))
    }

    fn announce(&self, title: &str, body: String) {
        self.notifier.notify(Announcement::new(title, body));
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format(SCHEDULE_TIME_FORMAT).to_string()
}

fn poisoned() -> RollcallError {
    RollcallError::Internal("session lock table poisoned".to_string())
}
