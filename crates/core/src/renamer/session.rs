//! Short-lived storage for renamed files awaiting download.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

struct RenameSession {
    files: Vec<(String, Vec<u8>)>,
    created_at: Instant,
}

/// Renamed files keyed by session id, expiring after a fixed TTL.
pub struct RenameSessionStore {
    sessions: Mutex<HashMap<String, RenameSession>>,
    ttl: Duration,
}

impl RenameSessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Store renamed files and return a new session id.
    pub fn insert(&self, files: Vec<(String, Vec<u8>)>) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.lock();
        Self::purge_locked(&mut sessions, self.ttl);
        sessions.insert(
            session_id.clone(),
            RenameSession {
                files,
                created_at: Instant::now(),
            },
        );
        session_id
    }

    /// Remove and return a live session's files.
    pub fn take(&self, session_id: &str) -> Option<Vec<(String, Vec<u8>)>> {
        let session = self.lock().remove(session_id)?;
        if session.created_at.elapsed() >= self.ttl {
            debug!(session_id = %session_id, "Rename session expired");
            return None;
        }
        Some(session.files)
    }

    /// Drop expired sessions. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        Self::purge_locked(&mut self.lock(), self.ttl)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_locked(sessions: &mut HashMap<String, RenameSession>, ttl: Duration) -> usize {
        let before = sessions.len();
        sessions.retain(|_, session| session.created_at.elapsed() < ttl);
        before - sessions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, RenameSession>> {
        // A panic while holding this lock cannot leave the map inconsistent.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
