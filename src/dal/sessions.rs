//! Per-session passenger lists. Kept in memory only, gone on restart.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::info;
use uuid::Uuid;

use crate::dal::stops::{StopRegistry, UnknownStop};
use crate::model::passenger::{PassengerForm, PassengerRequest, default_boarding_time, hh_mm};

pub type SessionId = Uuid;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PassengerError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error(transparent)]
    UnknownStop(#[from] UnknownStop),

    #[error("invalid boarding time \"{0}\", expected HH:MM")]
    InvalidTime(String),
}

/// Ordered list of passengers for one session. Append-only until cleared.
#[derive(Debug, Clone, Default)]
pub struct PassengerList {
    passengers: Vec<PassengerRequest>,
}

impl PassengerList {
    /// Validates the form against the registry and appends it.
    ///
    /// Name, origin and destination must be non-empty and the stops must exist.
    /// Duplicates and origin == destination are allowed.
    pub fn push(
        &mut self,
        form: PassengerForm,
        stops: &StopRegistry,
    ) -> Result<&PassengerRequest, PassengerError> {
        let name = form.name.trim();
        let start = form.start.trim();
        let end = form.end.trim();

        if name.is_empty() {
            return Err(PassengerError::MissingField("name"));
        }
        if start.is_empty() {
            return Err(PassengerError::MissingField("start"));
        }
        if end.is_empty() {
            return Err(PassengerError::MissingField("end"));
        }

        stops.get(start)?;
        stops.get(end)?;

        let time = match form.time.as_deref().map(str::trim) {
            None | Some("") => default_boarding_time(),
            Some(t) => hh_mm::parse(t).map_err(|_| PassengerError::InvalidTime(t.to_string()))?,
        };

        self.passengers.push(PassengerRequest {
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            time,
        });

        Ok(&self.passengers[self.passengers.len() - 1])
    }

    pub fn clear(&mut self) {
        self.passengers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passengers.len()
    }

    pub fn as_slice(&self) -> &[PassengerRequest] {
        &self.passengers
    }
}

/// Sessions untouched for this long are dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug)]
struct SessionEntry {
    list: PassengerList,
    last_seen: Instant,
}

/// All live sessions. Each request only touches its own entry.
///
/// Entries are created on the first write and swept once idle for longer than the timeout.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` on the session's list, creating an empty one on first use
    pub fn with_list<T>(&self, id: SessionId, f: impl FnOnce(&mut PassengerList) -> T) -> T {
        let mut sessions = self.lock();
        let now = Instant::now();

        if !sessions.contains_key(&id) {
            let before = sessions.len();
            sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
            if sessions.len() < before {
                info!("expired {} idle sessions", before - sessions.len());
            }
            info!("new session {id}");
        }

        let entry = sessions.entry(id).or_insert_with(|| SessionEntry {
            list: PassengerList::default(),
            last_seen: now,
        });
        entry.last_seen = now;

        f(&mut entry.list)
    }

    /// Copy of the session's passengers, empty for unknown sessions
    pub fn snapshot(&self, id: SessionId) -> Vec<PassengerRequest> {
        let mut sessions = self.lock();

        match sessions.get_mut(&id) {
            Some(entry) => {
                entry.last_seen = Instant::now();
                entry.list.as_slice().to_vec()
            }
            None => Vec::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dal::stops::tests::sample_registry;
    use chrono::NaiveTime;

    fn form(name: &str, start: &str, end: &str, time: Option<&str>) -> PassengerForm {
        PassengerForm {
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            time: time.map(str::to_string),
        }
    }

    #[test]
    fn appends_valid_passengers_in_order() {
        let stops = sample_registry();
        let mut list = PassengerList::default();

        list.push(form("Jihoon", "StopA", "StopB", Some("07:30")), &stops)
            .unwrap();
        list.push(form("Minji", "StopB", "StopB", Some("08:15")), &stops)
            .unwrap();
        list.push(form("Jihoon", "StopA", "StopB", Some("07:30")), &stops)
            .unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list.as_slice()[1].name, "Minji");
        assert_eq!(list.as_slice()[1].start, list.as_slice()[1].end);
        assert_eq!(list.as_slice()[0], list.as_slice()[2]);
    }

    #[test]
    fn refuses_blank_fields() {
        let stops = sample_registry();
        let mut list = PassengerList::default();

        assert_eq!(
            list.push(form("  ", "StopA", "StopB", None), &stops).unwrap_err(),
            PassengerError::MissingField("name")
        );
        assert_eq!(
            list.push(form("Jihoon", "", "StopB", None), &stops).unwrap_err(),
            PassengerError::MissingField("start")
        );
        assert_eq!(
            list.push(form("Jihoon", "StopA", "", None), &stops).unwrap_err(),
            PassengerError::MissingField("end")
        );
        assert!(list.is_empty());
    }

    #[test]
    fn refuses_unknown_stops() {
        let stops = sample_registry();
        let mut list = PassengerList::default();

        let err = list
            .push(form("Jihoon", "StopA", "Nowhere", None), &stops)
            .unwrap_err();
        assert_eq!(err, PassengerError::UnknownStop(UnknownStop("Nowhere".to_string())));
        assert!(list.is_empty());
    }

    #[test]
    fn missing_time_uses_form_default() {
        let stops = sample_registry();
        let mut list = PassengerList::default();

        let p = list.push(form("Jihoon", "StopA", "StopB", Some("")), &stops).unwrap();
        assert_eq!(p.time, NaiveTime::from_hms_opt(7, 30, 0).unwrap());

        let err = list
            .push(form("Jihoon", "StopA", "StopB", Some("25:99")), &stops)
            .unwrap_err();
        assert_eq!(err, PassengerError::InvalidTime("25:99".to_string()));
    }

    #[test]
    fn clear_empties_the_list() {
        let stops = sample_registry();
        let mut list = PassengerList::default();
        list.push(form("Jihoon", "StopA", "StopB", None), &stops).unwrap();

        list.clear();
        assert!(list.is_empty());
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn sessions_are_isolated() {
        let stops = sample_registry();
        let store = SessionStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store
            .with_list(a, |list| list.push(form("Jihoon", "StopA", "StopB", None), &stops).cloned())
            .unwrap();

        assert_eq!(store.snapshot(a).len(), 1);
        assert!(store.snapshot(b).is_empty());
        assert_eq!(store.session_count(), 1);

        store.with_list(a, PassengerList::clear);
        assert!(store.snapshot(a).is_empty());
    }

    #[test]
    fn reads_do_not_create_sessions() {
        let store = SessionStore::new();

        for _ in 0..100 {
            assert!(store.snapshot(Uuid::new_v4()).is_empty());
        }
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn idle_sessions_are_swept_when_a_new_one_starts() {
        let stops = sample_registry();
        let store = SessionStore::with_idle_timeout(Duration::ZERO);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store
            .with_list(a, |list| list.push(form("Jihoon", "StopA", "StopB", None), &stops).cloned())
            .unwrap();
        assert_eq!(store.session_count(), 1);

        store.with_list(b, PassengerList::clear);
        assert_eq!(store.session_count(), 1);
        assert!(store.snapshot(a).is_empty());
    }

    #[test]
    fn active_sessions_survive_the_sweep() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(3600));
        let a = Uuid::new_v4();

        store.with_list(a, PassengerList::clear);
        store.with_list(Uuid::new_v4(), PassengerList::clear);
        assert_eq!(store.session_count(), 2);
    }
}
