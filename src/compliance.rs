//! Compliance sweep and infraction tracking.
//!
//! A periodic sweep force-closes shifts left open longer than
//! [`MAX_SERVICE_DURATION_MS`], records one infraction per closure and
//! recomputes the subject's sanction. Sanctions escalate strictly with the
//! infraction count and never de-escalate; the count never resets.
//!
//! The sweep holds no state of its own: each run re-evaluates the live
//! active-session set, so a crash mid-sweep just leaves the remaining
//! sessions for the next tick.

use crate::shift::{ShiftLedger, ShiftRecord};
use crate::storage::Store;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Logical name of the backing document.
pub const INFRACTIONS_DOC: &str = "infractions";

/// Maximum shift duration before the sweep intervenes (6 hours).
pub const MAX_SERVICE_DURATION_MS: i64 = 6 * 60 * 60 * 1000;
/// Length of a 24h suspension.
pub const SUSPENSION_DURATION_MS: i64 = 24 * 60 * 60 * 1000;
/// Reason recorded on sweep-closed shifts.
pub const SERVICE_TOO_LONG: &str = "SERVICE_TOO_LONG";

/// Sanction applied for a given infraction count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sanction {
    #[serde(rename = "AVERTISSEMENT")]
    Avertissement,
    #[serde(rename = "SUSPENSION_24H")]
    Suspension24h,
    #[serde(rename = "EXCLUSION")]
    Exclusion,
}

impl Sanction {
    /// Escalation law: 1 → warning, 2 → 24h suspension, 3+ → exclusion.
    pub fn for_count(count: u32) -> Self {
        match count {
            0 | 1 => Self::Avertissement,
            2 => Self::Suspension24h,
            _ => Self::Exclusion,
        }
    }

    /// French label used in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Avertissement => "Avertissement",
            Self::Suspension24h => "Suspension 24h",
            Self::Exclusion => "Exclusion",
        }
    }
}

/// One recorded violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfractionEntry {
    pub kind: String,
    pub details: String,
    pub at_ms: i64,
}

/// Per-subject infraction state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfractionRecord {
    pub subject_name: String,
    pub count: u32,
    pub history: Vec<InfractionEntry>,
    pub blocked: bool,
    /// End of a timed block; `None` while blocked means permanent exclusion.
    pub blocked_until: Option<i64>,
    pub sanction: Sanction,
}

/// Persisted shape of `infractions.json`: subject id → record.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InfractionsDocument {
    #[serde(default)]
    pub infractions: HashMap<String, InfractionRecord>,
}

/// Ledger owning the infraction records.
pub struct InfractionLedger {
    store: Store,
    doc: Mutex<InfractionsDocument>,
}

impl InfractionLedger {
    /// Open the ledger, loading any persisted state.
    pub fn open(store: Store) -> Self {
        let doc = store.load(INFRACTIONS_DOC);
        Self { store, doc: Mutex::new(doc) }
    }

    fn doc(&self) -> MutexGuard<'_, InfractionsDocument> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, doc: &InfractionsDocument) {
        if let Err(e) = self.store.save(INFRACTIONS_DOC, doc) {
            eprintln!("Warning: failed to persist infractions document: {}", e);
        }
    }

    /// Record one infraction, escalate the sanction and return the new state.
    pub fn record(
        &self,
        subject_id: &str,
        subject_name: &str,
        kind: &str,
        details: &str,
        now_ms: i64,
    ) -> InfractionRecord {
        let mut doc = self.doc();

        let record = doc
            .infractions
            .entry(subject_id.to_string())
            .or_insert_with(|| InfractionRecord {
                subject_name: subject_name.to_string(),
                count: 0,
                history: Vec::new(),
                blocked: false,
                blocked_until: None,
                sanction: Sanction::Avertissement,
            });

        record.subject_name = subject_name.to_string();
        record.count += 1;
        record.history.push(InfractionEntry {
            kind: kind.to_string(),
            details: details.to_string(),
            at_ms: now_ms,
        });
        record.sanction = Sanction::for_count(record.count);
        match record.sanction {
            Sanction::Avertissement => {
                record.blocked = false;
                record.blocked_until = None;
            }
            Sanction::Suspension24h => {
                record.blocked = true;
                record.blocked_until = Some(now_ms + SUSPENSION_DURATION_MS);
            }
            Sanction::Exclusion => {
                record.blocked = true;
                record.blocked_until = None;
            }
        }

        let snapshot = record.clone();
        self.persist(&doc);
        snapshot
    }

    /// Current record for a subject, if any.
    pub fn get(&self, subject_id: &str) -> Option<InfractionRecord> {
        self.doc().infractions.get(subject_id).cloned()
    }

    /// Sanction currently blocking the subject from taking a shift, if any.
    ///
    /// A lapsed 24h suspension no longer blocks; an exclusion always does.
    pub fn active_block(&self, subject_id: &str, now_ms: i64) -> Option<Sanction> {
        let doc = self.doc();
        let record = doc.infractions.get(subject_id)?;
        if !record.blocked {
            return None;
        }
        match record.blocked_until {
            None => Some(record.sanction),
            Some(until) if until > now_ms => Some(record.sanction),
            Some(_) => None,
        }
    }
}

/// Outcome of one sweep closure, for the notification layer.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub record: ShiftRecord,
    pub count: u32,
    pub sanction: Sanction,
}

/// Force-close every active session older than the maximum duration.
///
/// Idempotent by construction: a closed session is no longer active, so an
/// immediate second sweep finds nothing left to close.
pub fn sweep(
    shifts: &ShiftLedger,
    infractions: &InfractionLedger,
    now_ms: i64,
) -> Vec<SweepOutcome> {
    let mut outcomes = Vec::new();

    for session in shifts.list_active() {
        if now_ms - session.start_ms <= MAX_SERVICE_DURATION_MS {
            continue;
        }

        let record = match shifts.force_end_shift(&session.subject_id, SERVICE_TOO_LONG, now_ms) {
            Ok(record) => record,
            // Raced with the subject ending their own shift; nothing to sanction
            Err(_) => continue,
        };

        let infraction = infractions.record(
            &record.subject_id,
            &record.subject_name,
            SERVICE_TOO_LONG,
            &format!("service de {} ms clôturé automatiquement", record.duration_ms),
            now_ms,
        );

        outcomes.push(SweepOutcome {
            record,
            count: infraction.count,
            sanction: infraction.sanction,
        });
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ShiftLedger, InfractionLedger) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::new(temp_dir.path()).expect("Failed to create store");
        let shifts = ShiftLedger::open(store.clone());
        let infractions = InfractionLedger::open(store);
        (temp_dir, shifts, infractions)
    }

    #[test]
    fn test_sanction_escalation_law() {
        assert_eq!(Sanction::for_count(1), Sanction::Avertissement);
        assert_eq!(Sanction::for_count(2), Sanction::Suspension24h);
        assert_eq!(Sanction::for_count(3), Sanction::Exclusion);
        // Sticky at the top, never de-escalates
        assert_eq!(Sanction::for_count(4), Sanction::Exclusion);
        assert_eq!(Sanction::for_count(10), Sanction::Exclusion);
    }

    #[test]
    fn test_record_escalates_and_blocks() {
        let (_temp_dir, _shifts, infractions) = setup();

        let first = infractions.record("u1", "Jean", SERVICE_TOO_LONG, "test", 0);
        assert_eq!(first.count, 1);
        assert_eq!(first.sanction, Sanction::Avertissement);
        assert!(!first.blocked);

        let second = infractions.record("u1", "Jean", SERVICE_TOO_LONG, "test", 1_000);
        assert_eq!(second.count, 2);
        assert_eq!(second.sanction, Sanction::Suspension24h);
        assert!(second.blocked);
        assert_eq!(second.blocked_until, Some(1_000 + SUSPENSION_DURATION_MS));

        let third = infractions.record("u1", "Jean", SERVICE_TOO_LONG, "test", 2_000);
        assert_eq!(third.sanction, Sanction::Exclusion);
        assert!(third.blocked);
        assert_eq!(third.blocked_until, None);
    }

    #[test]
    fn test_active_block_lapses_for_suspension_only() {
        let (_temp_dir, _shifts, infractions) = setup();

        infractions.record("u1", "Jean", SERVICE_TOO_LONG, "test", 0);
        infractions.record("u1", "Jean", SERVICE_TOO_LONG, "test", 0);
        // Suspended for 24h from t=0
        assert_eq!(infractions.active_block("u1", 1_000), Some(Sanction::Suspension24h));
        assert_eq!(infractions.active_block("u1", SUSPENSION_DURATION_MS + 1), None);

        infractions.record("u1", "Jean", SERVICE_TOO_LONG, "test", 0);
        // Exclusion never lapses
        assert_eq!(
            infractions.active_block("u1", i64::MAX / 2),
            Some(Sanction::Exclusion)
        );
    }

    #[test]
    fn test_sweep_closes_only_over_duration_sessions() {
        let (_temp_dir, shifts, infractions) = setup();

        shifts.take_shift("old", "Jean", "Vendeur", None, 0).unwrap();
        shifts
            .take_shift("recent", "Luc", "Mécanicien", None, MAX_SERVICE_DURATION_MS)
            .unwrap();

        let now = MAX_SERVICE_DURATION_MS + 60_000; // old is 6h01 in, recent 1min
        let outcomes = sweep(&shifts, &infractions, now);

        assert_eq!(outcomes.len(), 1);
        let outcome = &outcomes[0];
        assert_eq!(outcome.record.subject_id, "old");
        assert_eq!(outcome.record.reason.as_deref(), Some(SERVICE_TOO_LONG));
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.sanction, Sanction::Avertissement);

        assert!(shifts.get_active("old").is_none());
        assert!(shifts.get_active("recent").is_some());
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let (_temp_dir, shifts, infractions) = setup();

        shifts.take_shift("u1", "Jean", "Vendeur", None, 0).unwrap();
        let now = MAX_SERVICE_DURATION_MS + 1;

        let first = sweep(&shifts, &infractions, now);
        let second = sweep(&shifts, &infractions, now);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        // Exactly one infraction recorded
        assert_eq!(infractions.get("u1").unwrap().count, 1);
    }

    #[test]
    fn test_session_at_exact_limit_is_not_closed() {
        let (_temp_dir, shifts, infractions) = setup();

        shifts.take_shift("u1", "Jean", "Vendeur", None, 0).unwrap();
        let outcomes = sweep(&shifts, &infractions, MAX_SERVICE_DURATION_MS);
        assert!(outcomes.is_empty());
        assert!(shifts.get_active("u1").is_some());
    }
}
