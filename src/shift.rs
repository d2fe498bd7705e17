//! Shift ("service") ledger.
//!
//! Tracks who is currently on duty at the dealership and keeps the
//! append-only history of completed shifts. At most one active session may
//! exist per subject at any time; taking a shift while one is active fails
//! with the existing session so the caller can surface when it started.
//!
//! Role assignment/removal is a side effect owned by the command layer (see
//! [`crate::roles`]): a shift is recorded in the ledger even when the role
//! mutation fails, and it is never rolled back because of one.

use crate::storage::Store;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Logical name of the backing document.
pub const SERVICES_DOC: &str = "services";

/// Who closed a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminatedBy {
    /// The subject ended their own shift.
    #[serde(rename = "USER")]
    User,
    /// The compliance sweep force-closed the shift.
    #[serde(rename = "SYSTEM")]
    System,
}

/// An active shift session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSession {
    pub subject_id: String,
    pub subject_name: String,
    /// Free-text post label ("Vendeur", "Mécanicien", ...)
    pub post: String,
    /// Unix milliseconds
    pub start_ms: i64,
    /// Discord role granted at start, if role sync succeeded.
    /// Removal at end-shift targets exactly this role.
    pub assigned_role_id: Option<u64>,
}

/// A completed shift, immutable once appended to the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub subject_id: String,
    pub subject_name: String,
    pub post: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub duration_ms: i64,
    pub terminated_by: TerminatedBy,
    pub reason: Option<String>,
    pub assigned_role_id: Option<u64>,
}

/// Persisted shape of `services.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServicesDocument {
    #[serde(default)]
    pub active: Vec<ShiftSession>,
    #[serde(default)]
    pub history: Vec<ShiftRecord>,
}

/// Domain-rule violations for shift operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftError {
    /// A session already exists for this subject; carries it so the caller
    /// can report when and on which post it started.
    AlreadyActive(ShiftSession),
    /// No active session for this subject.
    NotActive,
}

impl fmt::Display for ShiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive(session) => {
                write!(f, "already in service since {} on post '{}'", session.start_ms, session.post)
            }
            Self::NotActive => write!(f, "no active service"),
        }
    }
}

impl std::error::Error for ShiftError {}

/// Ledger owning the active-session set and the shift history.
pub struct ShiftLedger {
    store: Store,
    doc: Mutex<ServicesDocument>,
}

impl ShiftLedger {
    /// Open the ledger, loading any persisted state.
    pub fn open(store: Store) -> Self {
        let doc = store.load(SERVICES_DOC);
        Self { store, doc: Mutex::new(doc) }
    }

    fn doc(&self) -> MutexGuard<'_, ServicesDocument> {
        // A poisoned lock only means a panic elsewhere; the document itself
        // is still coherent, so recover it.
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, doc: &ServicesDocument) {
        if let Err(e) = self.store.save(SERVICES_DOC, doc) {
            eprintln!("Warning: failed to persist services document: {}", e);
        }
    }

    /// Start a shift for `subject_id`.
    ///
    /// `assigned_role_id` is whatever the role synchronizer actually granted
    /// (possibly nothing); it is recorded as the source of truth for removal
    /// at end-shift time.
    pub fn take_shift(
        &self,
        subject_id: &str,
        subject_name: &str,
        post: &str,
        assigned_role_id: Option<u64>,
        now_ms: i64,
    ) -> Result<ShiftSession, ShiftError> {
        let mut doc = self.doc();

        if let Some(existing) = doc.active.iter().find(|s| s.subject_id == subject_id) {
            return Err(ShiftError::AlreadyActive(existing.clone()));
        }

        let session = ShiftSession {
            subject_id: subject_id.to_string(),
            subject_name: subject_name.to_string(),
            post: post.to_string(),
            start_ms: now_ms,
            assigned_role_id,
        };
        doc.active.push(session.clone());
        self.persist(&doc);

        Ok(session)
    }

    /// End the subject's shift, moving it into the history.
    pub fn end_shift(&self, subject_id: &str, now_ms: i64) -> Result<ShiftRecord, ShiftError> {
        self.close(subject_id, now_ms, TerminatedBy::User, None)
    }

    /// Force-close a shift on behalf of the compliance sweep.
    pub fn force_end_shift(
        &self,
        subject_id: &str,
        reason: &str,
        now_ms: i64,
    ) -> Result<ShiftRecord, ShiftError> {
        self.close(subject_id, now_ms, TerminatedBy::System, Some(reason.to_string()))
    }

    fn close(
        &self,
        subject_id: &str,
        now_ms: i64,
        terminated_by: TerminatedBy,
        reason: Option<String>,
    ) -> Result<ShiftRecord, ShiftError> {
        let mut doc = self.doc();

        let index = doc
            .active
            .iter()
            .position(|s| s.subject_id == subject_id)
            .ok_or(ShiftError::NotActive)?;
        let session = doc.active.remove(index);

        let record = ShiftRecord {
            subject_id: session.subject_id,
            subject_name: session.subject_name,
            post: session.post,
            start_ms: session.start_ms,
            end_ms: now_ms,
            duration_ms: now_ms - session.start_ms,
            terminated_by,
            reason,
            assigned_role_id: session.assigned_role_id,
        };
        doc.history.push(record.clone());
        self.persist(&doc);

        Ok(record)
    }

    /// Active session for a subject, if any.
    pub fn get_active(&self, subject_id: &str) -> Option<ShiftSession> {
        self.doc().active.iter().find(|s| s.subject_id == subject_id).cloned()
    }

    /// All active sessions, in insertion (start-time) order.
    pub fn list_active(&self) -> Vec<ShiftSession> {
        self.doc().active.clone()
    }

    /// Completed shifts for a subject, most recent first.
    pub fn list_history(&self, subject_id: &str, limit: Option<usize>) -> Vec<ShiftRecord> {
        let doc = self.doc();
        let mut records: Vec<ShiftRecord> = doc
            .history
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect();
        records.reverse();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_ledger() -> (TempDir, ShiftLedger) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::new(temp_dir.path()).expect("Failed to create store");
        (temp_dir, ShiftLedger::open(store))
    }

    #[test]
    fn test_take_shift_creates_active_session() {
        let (_temp_dir, ledger) = setup_ledger();

        let session = ledger.take_shift("u1", "Jean", "Vendeur", Some(42), 1_000).unwrap();
        assert_eq!(session.subject_id, "u1");
        assert_eq!(session.post, "Vendeur");
        assert_eq!(session.start_ms, 1_000);
        assert_eq!(session.assigned_role_id, Some(42));

        assert_eq!(ledger.get_active("u1"), Some(session));
    }

    #[test]
    fn test_at_most_one_active_session_per_subject() {
        let (_temp_dir, ledger) = setup_ledger();

        ledger.take_shift("u1", "Jean", "Vendeur", None, 0).unwrap();
        let err = ledger.take_shift("u1", "Jean", "Mécanicien", None, 500).unwrap_err();

        match err {
            ShiftError::AlreadyActive(existing) => {
                // The original session is surfaced, not overwritten
                assert_eq!(existing.start_ms, 0);
                assert_eq!(existing.post, "Vendeur");
            }
            other => panic!("expected AlreadyActive, got {:?}", other),
        }

        let active: Vec<_> = ledger
            .list_active()
            .into_iter()
            .filter(|s| s.subject_id == "u1")
            .collect();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_end_shift_duration_is_exact() {
        let (_temp_dir, ledger) = setup_ledger();

        ledger.take_shift("u1", "Jean", "Vendeur", None, 0).unwrap();
        let record = ledger.end_shift("u1", 3_600_000).unwrap();

        assert_eq!(record.duration_ms, 3_600_000);
        assert_eq!(record.terminated_by, TerminatedBy::User);
        assert_eq!(record.reason, None);
        assert!(ledger.get_active("u1").is_none());
    }

    #[test]
    fn test_end_shift_without_active_session() {
        let (_temp_dir, ledger) = setup_ledger();

        assert_eq!(ledger.end_shift("ghost", 1_000).unwrap_err(), ShiftError::NotActive);
    }

    #[test]
    fn test_force_end_shift_marks_system_termination() {
        let (_temp_dir, ledger) = setup_ledger();

        ledger.take_shift("u1", "Jean", "Vendeur", None, 0).unwrap();
        let record = ledger.force_end_shift("u1", "SERVICE_TOO_LONG", 7_200_000).unwrap();

        assert_eq!(record.terminated_by, TerminatedBy::System);
        assert_eq!(record.reason.as_deref(), Some("SERVICE_TOO_LONG"));
    }

    #[test]
    fn test_record_keeps_role_assigned_at_start() {
        let (_temp_dir, ledger) = setup_ledger();

        // Role recorded at start-shift time is the source of truth for removal,
        // even if the post-to-role rules change before the shift ends.
        ledger.take_shift("u1", "Jean", "Vendeur", Some(111), 0).unwrap();
        let record = ledger.end_shift("u1", 60_000).unwrap();
        assert_eq!(record.assigned_role_id, Some(111));
    }

    #[test]
    fn test_history_most_recent_first_with_limit() {
        let (_temp_dir, ledger) = setup_ledger();

        for i in 0..3 {
            let start = i * 100_000;
            ledger.take_shift("u1", "Jean", "Vendeur", None, start).unwrap();
            ledger.end_shift("u1", start + 50_000).unwrap();
        }

        let history = ledger.list_history("u1", None);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].start_ms, 200_000);
        assert_eq!(history[2].start_ms, 0);

        let limited = ledger.list_history("u1", Some(2));
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].start_ms, 200_000);
    }

    #[test]
    fn test_list_active_keeps_insertion_order() {
        let (_temp_dir, ledger) = setup_ledger();

        ledger.take_shift("u1", "Jean", "Vendeur", None, 100).unwrap();
        ledger.take_shift("u2", "Luc", "Mécanicien", None, 200).unwrap();

        let active = ledger.list_active();
        assert_eq!(active[0].subject_id, "u1");
        assert_eq!(active[1].subject_id, "u2");
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::new(temp_dir.path()).unwrap();

        {
            let ledger = ShiftLedger::open(store.clone());
            ledger.take_shift("u1", "Jean", "Vendeur", None, 0).unwrap();
            ledger.take_shift("u2", "Luc", "Mécanicien", None, 100).unwrap();
            ledger.end_shift("u2", 200).unwrap();
        }

        let reopened = ShiftLedger::open(store);
        assert!(reopened.get_active("u1").is_some());
        assert!(reopened.get_active("u2").is_none());
        assert_eq!(reopened.list_history("u2", None).len(), 1);
    }
}
