//! Absence request ledger.
//!
//! Absence declarations are created pending and decided exactly once:
//! a second decision on the same request fails with `AlreadyDecided` instead
//! of overwriting, which keeps concurrent double-clicks on the approve and
//! reject controls from double-processing.

use crate::storage::Store;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Logical name of the backing document.
pub const ABSENCES_DOC: &str = "absences";

/// Reason for an absence request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, poise::ChoiceParameter)]
pub enum AbsenceReason {
    #[name = "Maladie"]
    #[serde(rename = "maladie")]
    Maladie,
    #[name = "Congés"]
    #[serde(rename = "conges")]
    Conges,
    #[name = "Urgence familiale"]
    #[serde(rename = "urgence_familiale")]
    UrgenceFamiliale,
    #[name = "Formation"]
    #[serde(rename = "formation")]
    Formation,
    #[name = "Rendez-vous médical"]
    #[serde(rename = "rdv_medical")]
    RdvMedical,
    #[name = "Transport"]
    #[serde(rename = "transport")]
    Transport,
    #[name = "Autre"]
    #[serde(rename = "autre")]
    Autre,
}

impl AbsenceReason {
    /// French label used in replies and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Maladie => "Maladie",
            Self::Conges => "Congés",
            Self::UrgenceFamiliale => "Urgence familiale",
            Self::Formation => "Formation",
            Self::RdvMedical => "Rendez-vous médical",
            Self::Transport => "Transport",
            Self::Autre => "Autre",
        }
    }
}

/// Lifecycle status of a request. Transitions only pending → approved or
/// pending → rejected, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, poise::ChoiceParameter)]
pub enum AbsenceStatus {
    #[name = "En attente"]
    #[serde(rename = "pending")]
    Pending,
    #[name = "Approuvée"]
    #[serde(rename = "approved")]
    Approved,
    #[name = "Refusée"]
    #[serde(rename = "rejected")]
    Rejected,
}

impl AbsenceStatus {
    /// French label used in replies and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "en attente",
            Self::Approved => "approuvée",
            Self::Rejected => "refusée",
        }
    }
}

/// Decision applied to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    fn status(self) -> AbsenceStatus {
        match self {
            Self::Approved => AbsenceStatus::Approved,
            Self::Rejected => AbsenceStatus::Rejected,
        }
    }
}

/// One absence request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsenceRequest {
    pub id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub reason: AbsenceReason,
    /// Free-text duration ("2 jours", "une semaine", ...)
    pub duration: String,
    pub details: Option<String>,
    pub submitted_ms: i64,
    pub status: AbsenceStatus,
    pub decided_by: Option<String>,
    pub decided_ms: Option<i64>,
}

/// Persisted shape of `absences.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AbsencesDocument {
    #[serde(default)]
    pub absences: Vec<AbsenceRequest>,
}

/// Domain-rule violations for absence operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AbsenceError {
    /// No request with this id.
    NotFound,
    /// Decisions are write-once; carries the status already in place.
    AlreadyDecided(AbsenceStatus),
}

impl fmt::Display for AbsenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "absence request not found"),
            Self::AlreadyDecided(status) => {
                write!(f, "absence request already decided ({})", status.label())
            }
        }
    }
}

impl std::error::Error for AbsenceError {}

/// Ledger owning the absence requests.
pub struct AbsenceLedger {
    store: Store,
    doc: Mutex<AbsencesDocument>,
}

impl AbsenceLedger {
    /// Open the ledger, loading any persisted state.
    pub fn open(store: Store) -> Self {
        let doc = store.load(ABSENCES_DOC);
        Self { store, doc: Mutex::new(doc) }
    }

    fn doc(&self) -> MutexGuard<'_, AbsencesDocument> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, doc: &AbsencesDocument) {
        if let Err(e) = self.store.save(ABSENCES_DOC, doc) {
            eprintln!("Warning: failed to persist absences document: {}", e);
        }
    }

    /// Declare a new absence request, initially pending.
    ///
    /// Ids are "ABS-<millis>-<suffix>": collision-resistant enough for
    /// human-scale request volume, not cryptographic.
    pub fn declare(
        &self,
        subject_id: &str,
        subject_name: &str,
        reason: AbsenceReason,
        duration: &str,
        details: Option<String>,
        now_ms: i64,
    ) -> AbsenceRequest {
        let suffix: u32 = rand::rng().random_range(0..10_000);
        let request = AbsenceRequest {
            id: format!("ABS-{}-{:04}", now_ms, suffix),
            subject_id: subject_id.to_string(),
            subject_name: subject_name.to_string(),
            reason,
            duration: duration.to_string(),
            details,
            submitted_ms: now_ms,
            status: AbsenceStatus::Pending,
            decided_by: None,
            decided_ms: None,
        };

        let mut doc = self.doc();
        doc.absences.push(request.clone());
        self.persist(&doc);

        request
    }

    /// Decide a pending request. Write-once: re-deciding fails.
    pub fn decide(
        &self,
        absence_id: &str,
        decision: Decision,
        decider_id: &str,
        now_ms: i64,
    ) -> Result<AbsenceRequest, AbsenceError> {
        let mut doc = self.doc();

        let request = doc
            .absences
            .iter_mut()
            .find(|r| r.id == absence_id)
            .ok_or(AbsenceError::NotFound)?;

        if request.status != AbsenceStatus::Pending {
            return Err(AbsenceError::AlreadyDecided(request.status));
        }

        request.status = decision.status();
        request.decided_by = Some(decider_id.to_string());
        request.decided_ms = Some(now_ms);

        let snapshot = request.clone();
        self.persist(&doc);

        Ok(snapshot)
    }

    /// Requests declared by a subject.
    pub fn list_by_subject(&self, subject_id: &str) -> Vec<AbsenceRequest> {
        self.doc()
            .absences
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect()
    }

    /// Requests currently in a given status.
    pub fn list_by_status(&self, status: AbsenceStatus) -> Vec<AbsenceRequest> {
        self.doc()
            .absences
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    /// Requests submitted at or after `since_ms`.
    pub fn list_by_period(&self, since_ms: i64) -> Vec<AbsenceRequest> {
        self.doc()
            .absences
            .iter()
            .filter(|r| r.submitted_ms >= since_ms)
            .cloned()
            .collect()
    }

    /// All requests, oldest first.
    pub fn list_all(&self) -> Vec<AbsenceRequest> {
        self.doc().absences.clone()
    }

    /// Admin-only hard delete.
    pub fn remove(&self, absence_id: &str) -> Result<(), AbsenceError> {
        let mut doc = self.doc();

        let index = doc
            .absences
            .iter()
            .position(|r| r.id == absence_id)
            .ok_or(AbsenceError::NotFound)?;
        doc.absences.remove(index);
        self.persist(&doc);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_ledger() -> (TempDir, AbsenceLedger) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::new(temp_dir.path()).expect("Failed to create store");
        (temp_dir, AbsenceLedger::open(store))
    }

    #[test]
    fn test_declare_creates_pending_request() {
        let (_temp_dir, ledger) = setup_ledger();

        let request = ledger.declare(
            "u2",
            "Marie",
            AbsenceReason::Maladie,
            "2 jours",
            None,
            1_700_000_000_000,
        );

        assert!(request.id.starts_with("ABS-1700000000000-"));
        assert_eq!(request.status, AbsenceStatus::Pending);
        assert_eq!(request.decided_by, None);
        assert_eq!(ledger.list_by_subject("u2").len(), 1);
    }

    #[test]
    fn test_decision_is_write_once() {
        let (_temp_dir, ledger) = setup_ledger();

        let request = ledger.declare("u2", "Marie", AbsenceReason::Conges, "1 semaine", None, 0);

        let approved = ledger.decide(&request.id, Decision::Approved, "admin", 1_000).unwrap();
        assert_eq!(approved.status, AbsenceStatus::Approved);
        assert_eq!(approved.decided_by.as_deref(), Some("admin"));
        assert_eq!(approved.decided_ms, Some(1_000));

        // A conflicting second decision is rejected, not applied
        let err = ledger.decide(&request.id, Decision::Rejected, "other", 2_000).unwrap_err();
        assert_eq!(err, AbsenceError::AlreadyDecided(AbsenceStatus::Approved));

        let kept = &ledger.list_by_subject("u2")[0];
        assert_eq!(kept.status, AbsenceStatus::Approved);
        assert_eq!(kept.decided_by.as_deref(), Some("admin"));
    }

    #[test]
    fn test_decide_unknown_id() {
        let (_temp_dir, ledger) = setup_ledger();

        let err = ledger.decide("ABS-0-0000", Decision::Approved, "admin", 0).unwrap_err();
        assert_eq!(err, AbsenceError::NotFound);
    }

    #[test]
    fn test_list_filters() {
        let (_temp_dir, ledger) = setup_ledger();

        let a = ledger.declare("u1", "Jean", AbsenceReason::Maladie, "1 jour", None, 100);
        let _b = ledger.declare("u2", "Marie", AbsenceReason::Transport, "2 jours", None, 200);
        let c = ledger.declare("u1", "Jean", AbsenceReason::Autre, "3 jours", None, 300);

        ledger.decide(&a.id, Decision::Approved, "admin", 400).unwrap();
        ledger.decide(&c.id, Decision::Rejected, "admin", 500).unwrap();

        assert_eq!(ledger.list_by_subject("u1").len(), 2);
        assert_eq!(ledger.list_by_status(AbsenceStatus::Pending).len(), 1);
        assert_eq!(ledger.list_by_status(AbsenceStatus::Approved).len(), 1);
        assert_eq!(ledger.list_by_period(200).len(), 2);
        assert_eq!(ledger.list_by_period(0).len(), 3);
    }

    #[test]
    fn test_remove_request() {
        let (_temp_dir, ledger) = setup_ledger();

        let request = ledger.declare("u1", "Jean", AbsenceReason::Formation, "1 jour", None, 0);
        ledger.remove(&request.id).unwrap();
        assert!(ledger.list_by_subject("u1").is_empty());

        assert_eq!(ledger.remove(&request.id).unwrap_err(), AbsenceError::NotFound);
    }

    #[test]
    fn test_requests_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::new(temp_dir.path()).unwrap();

        let id = {
            let ledger = AbsenceLedger::open(store.clone());
            ledger
                .declare("u1", "Jean", AbsenceReason::RdvMedical, "1 matinée", None, 0)
                .id
        };

        let reopened = AbsenceLedger::open(store);
        let requests = reopened.list_by_subject("u1");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, id);
    }
}
