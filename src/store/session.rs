//! Session bookkeeping.
//!
//! One [`Session`] is opened per `execute_read`/`execute_write` call and
//! closes itself on drop, so it is released on every exit path including
//! panics and cancelled futures.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::tx::TxMode;

/// Snapshot of an open session, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: u64,
    pub mode: TxMode,
    pub correlation_id: String,
    #[serde(skip)]
    pub opened_at: Instant,
}

#[derive(Default)]
pub(crate) struct SessionRegistry {
    open: Mutex<HashMap<u64, SessionInfo>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub(crate) fn open(self: &Arc<Self>, mode: TxMode, correlation_id: &str) -> Session {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let info = SessionInfo {
            id,
            mode,
            correlation_id: correlation_id.to_owned(),
            opened_at: Instant::now(),
        };
        self.open.lock().insert(id, info);
        debug!(session = id, %mode, correlation_id, "session opened");
        Session { id, registry: Arc::clone(self) }
    }

    pub(crate) fn snapshot(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self.open.lock().values().cloned().collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }

    /// Sessions opened since the registry was created.
    pub(crate) fn total_opened(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

/// RAII handle for one store session.
pub struct Session {
    id: u64,
    registry: Arc<SessionRegistry>,
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(info) = self.registry.open.lock().remove(&self.id) {
            debug!(
                session = self.id,
                correlation_id = %info.correlation_id,
                elapsed_us = info.opened_at.elapsed().as_micros() as u64,
                "session closed"
            );
        }
    }
}
