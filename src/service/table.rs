use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::SessionError;
use crate::session::{Session, SessionId};

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Default)]
struct Entries {
    sessions: HashMap<SessionId, SharedSession>,
    closed: bool,
}

/// Live sessions keyed by id.
///
/// The map lock is only held to insert, look up or remove an entry. Session operations
/// run under the per-session mutex, so calls on different sessions never contend.
#[derive(Default)]
pub struct SessionTable {
    entries: RwLock<Entries>,
}

impl SessionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an initialized session unless the table already holds `limit` sessions.
    ///
    /// A closed table rejects every insert; the rejected session is dropped, which
    /// releases its program.
    pub fn insert_within_limit(
        &self,
        session: Session,
        limit: Option<usize>,
    ) -> Result<SharedSession, SessionError> {
        let mut entries = self.write();
        if entries.closed {
            return Err(SessionError::ShuttingDown);
        }
        if let Some(limit) = limit {
            if entries.sessions.len() >= limit {
                return Err(SessionError::SessionLimit { limit });
            }
        }

        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        entries.sessions.insert(id, Arc::clone(&shared));
        Ok(shared)
    }

    pub fn get(&self, session_id: SessionId) -> Result<SharedSession, SessionError> {
        self.read()
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(SessionError::UnknownSession { session_id })
    }

    pub fn remove(&self, session_id: SessionId) -> Option<SharedSession> {
        self.write().sessions.remove(&session_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().sessions.is_empty()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    /// Closes the table to inserts and removes every session, in id order.
    pub fn close(&self) -> Vec<SharedSession> {
        let mut entries = self.write();
        entries.closed = true;
        let mut drained: Vec<_> = entries.sessions.drain().collect();
        drop(entries);

        drained.sort_by_key(|(id, _)| *id);
        drained.into_iter().map(|(_, session)| session).collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use compiler_engine_mock::MockEngine;

    use super::*;
    use crate::registry::{BackendKind, RegistryOptions, SpaceRegistry};

    fn session(id: SessionId) -> Session {
        let registry = SpaceRegistry::build(&RegistryOptions::default()).expect("registry");
        Session::new(
            id,
            registry.backend(BackendKind::Example),
            Arc::new(MockEngine::new()),
        )
    }

    #[test]
    fn lookup_of_missing_session_is_unknown() {
        let table = SessionTable::new();
        assert_matches!(
            table.get(9),
            Err(SessionError::UnknownSession { session_id: 9 })
        );
    }

    #[test]
    fn limit_rejects_extra_sessions() {
        let table = SessionTable::new();
        table.insert_within_limit(session(1), Some(1)).expect("first");

        assert_matches!(
            table.insert_within_limit(session(2), Some(1)),
            Err(SessionError::SessionLimit { limit: 1 })
        );
        assert_eq!(table.len(), 1);
        table.insert_within_limit(session(2), None).expect("unbounded");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn close_empties_the_table_in_id_order() {
        let table = SessionTable::new();
        for id in [3, 1, 2] {
            table.insert_within_limit(session(id), None).expect("insert");
        }

        let ids: Vec<_> = table
            .close()
            .iter()
            .map(|session| lock_unpoisoned(session).id())
            .collect();

        assert_eq!(ids, vec![1, 2, 3]);
        assert!(table.is_empty());
        assert!(table.remove(1).is_none());
    }

    #[test]
    fn closed_table_rejects_late_inserts() {
        let table = SessionTable::new();
        assert!(table.close().is_empty());
        assert!(table.is_closed());

        assert_matches!(
            table.insert_within_limit(session(4), None),
            Err(SessionError::ShuttingDown)
        );
        assert!(table.is_empty());
        assert!(table.close().is_empty());
    }
}
