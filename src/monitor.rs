//! FiveM presence monitor.
//!
//! Periodically polls the game server for online players holding the tracked
//! job ("dealers") and detects transitions by diffing each snapshot against
//! the tracked state: connections, disconnections (with a short-session alert
//! under ten minutes), job promotions and inactivity.
//!
//! The diff is two-pass on purpose. Pass one walks the snapshot and handles
//! arrivals and updates; pass two walks the tracked dealers and handles
//! silent departures. Doing only one of the two misses one direction.
//!
//! A failed fetch abandons the whole tick: no partial diffing against an
//! error, the tracked state stays as it was until the next successful poll.

use crate::events::{DomainEvent, EventSender};
use crate::fivem::{FivemClient, FivemPlayer};
use crate::storage::Store;
use crate::utils::time::now_ms;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Logical name of the backing document.
pub const MONITORING_DOC: &str = "monitoring";

/// Sessions shorter than this raise a short-session alert (10 minutes).
pub const MIN_SHIFT_DURATION_MS: i64 = 10 * 60 * 1000;
/// Dealers idle longer than this raise an inactivity alert (5 minutes).
pub const INACTIVITY_THRESHOLD_MS: i64 = 5 * 60 * 1000;
/// Activity and alert logs are capped at this many entries.
pub const MAX_LOG_ENTRIES: usize = 200;

/// Tracked state of one polled dealer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealerPresence {
    pub subject_id: String,
    pub name: String,
    pub job_label: String,
    pub job_grade: u32,
    /// Start of the current session (reset on reconnect).
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
    /// Derived from membership in the most recent snapshot.
    pub is_active: bool,
    /// Refreshed on connect and on any observed metadata change.
    pub last_activity_ms: i64,
    pub disconnect_ms: Option<i64>,
}

/// One line of the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub at_ms: i64,
    pub subject_id: String,
    pub kind: String,
    pub details: String,
}

/// Severity of an alert entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "error")]
    Error,
}

/// One line of the alert log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEntry {
    pub at_ms: i64,
    pub level: AlertLevel,
    pub message: String,
}

/// Persisted shape of `monitoring.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MonitoringDocument {
    #[serde(default)]
    pub dealers: HashMap<String, DealerPresence>,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
    #[serde(default)]
    pub alerts: Vec<AlertEntry>,
}

impl MonitoringDocument {
    fn log_activity(&mut self, at_ms: i64, subject_id: &str, kind: &str, details: String) {
        self.activity.push(ActivityEntry {
            at_ms,
            subject_id: subject_id.to_string(),
            kind: kind.to_string(),
            details,
        });
        if self.activity.len() > MAX_LOG_ENTRIES {
            let excess = self.activity.len() - MAX_LOG_ENTRIES;
            self.activity.drain(..excess);
        }
    }

    fn log_alert(&mut self, at_ms: i64, level: AlertLevel, message: String) {
        self.alerts.push(AlertEntry { at_ms, level, message });
        if self.alerts.len() > MAX_LOG_ENTRIES {
            let excess = self.alerts.len() - MAX_LOG_ENTRIES;
            self.alerts.drain(..excess);
        }
    }
}

/// Event emitted by one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Connect { subject_id: String, name: String },
    Disconnect { subject_id: String, name: String, session_ms: i64 },
    ShortSession { subject_id: String, name: String, session_ms: i64 },
    JobPromotion {
        subject_id: String,
        name: String,
        job_label: String,
        previous_grade: u32,
        grade: u32,
    },
    Inactivity { subject_id: String, name: String, idle_ms: i64 },
}

impl From<MonitorEvent> for DomainEvent {
    fn from(event: MonitorEvent) -> Self {
        match event {
            MonitorEvent::Connect { subject_id, name } => {
                DomainEvent::DealerConnected { subject_id, name }
            }
            MonitorEvent::Disconnect { subject_id, name, session_ms } => {
                DomainEvent::DealerDisconnected { subject_id, name, session_ms }
            }
            MonitorEvent::ShortSession { subject_id, name, session_ms } => {
                DomainEvent::ShortSession { subject_id, name, session_ms }
            }
            MonitorEvent::JobPromotion { subject_id, name, job_label, previous_grade, grade } => {
                DomainEvent::JobPromotion { subject_id, name, job_label, previous_grade, grade }
            }
            MonitorEvent::Inactivity { subject_id, name, idle_ms } => {
                DomainEvent::InactivityAlert { subject_id, name, idle_ms }
            }
        }
    }
}

/// Run one poll cycle over the tracked state.
///
/// Pure with respect to I/O: takes the already-fetched snapshot, mutates the
/// document and returns the emitted events in order (connections and updates
/// first, then disconnections, then inactivity alerts).
pub fn poll_cycle(
    doc: &mut MonitoringDocument,
    snapshot: &[FivemPlayer],
    tracked_job: &str,
    at_ms: i64,
) -> Vec<MonitorEvent> {
    let mut events = Vec::new();

    // Pass 1: snapshot → known. Arrivals, reconnects and metadata updates.
    let mut present: HashSet<String> = HashSet::new();
    for player in snapshot.iter().filter(|p| p.job.name == tracked_job) {
        present.insert(player.id.clone());

        match doc.dealers.entry(player.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(DealerPresence {
                    subject_id: player.id.clone(),
                    name: player.name.clone(),
                    job_label: player.job.label.clone(),
                    job_grade: player.job.grade,
                    first_seen_ms: at_ms,
                    last_seen_ms: at_ms,
                    is_active: true,
                    last_activity_ms: at_ms,
                    disconnect_ms: None,
                });
                events.push(MonitorEvent::Connect {
                    subject_id: player.id.clone(),
                    name: player.name.clone(),
                });
            }
            Entry::Occupied(mut slot) => {
                let dealer = slot.get_mut();
                if !dealer.is_active {
                    // Back after a disconnect: a fresh session starts here
                    dealer.is_active = true;
                    dealer.first_seen_ms = at_ms;
                    dealer.last_activity_ms = at_ms;
                    dealer.disconnect_ms = None;
                    dealer.name = player.name.clone();
                    dealer.job_label = player.job.label.clone();
                    dealer.job_grade = player.job.grade;
                    events.push(MonitorEvent::Connect {
                        subject_id: player.id.clone(),
                        name: player.name.clone(),
                    });
                } else {
                    if dealer.job_grade != player.job.grade
                        || dealer.job_label != player.job.label
                    {
                        events.push(MonitorEvent::JobPromotion {
                            subject_id: player.id.clone(),
                            name: player.name.clone(),
                            job_label: player.job.label.clone(),
                            previous_grade: dealer.job_grade,
                            grade: player.job.grade,
                        });
                        dealer.job_label = player.job.label.clone();
                        dealer.job_grade = player.job.grade;
                        dealer.last_activity_ms = at_ms;
                    }
                    if dealer.name != player.name {
                        dealer.name = player.name.clone();
                        dealer.last_activity_ms = at_ms;
                    }
                }
                dealer.last_seen_ms = at_ms;
            }
        }
    }

    // Pass 2: known → snapshot. Active dealers missing from this snapshot
    // have silently departed.
    for dealer in doc.dealers.values_mut() {
        if !dealer.is_active || present.contains(&dealer.subject_id) {
            continue;
        }

        dealer.is_active = false;
        dealer.disconnect_ms = Some(at_ms);
        // Session length uses the last sighting, not the tick that noticed
        // the departure
        let session_ms = dealer.last_seen_ms - dealer.first_seen_ms;

        events.push(MonitorEvent::Disconnect {
            subject_id: dealer.subject_id.clone(),
            name: dealer.name.clone(),
            session_ms,
        });
        if session_ms < MIN_SHIFT_DURATION_MS {
            events.push(MonitorEvent::ShortSession {
                subject_id: dealer.subject_id.clone(),
                name: dealer.name.clone(),
                session_ms,
            });
        }
    }

    // Pass 3: inactivity. Re-evaluated every tick, deliberately repeatable;
    // the alert clears itself once activity resumes.
    let stale: Vec<(String, String, i64)> = doc
        .dealers
        .values()
        .filter(|d| d.is_active && at_ms - d.last_activity_ms > INACTIVITY_THRESHOLD_MS)
        .map(|d| (d.subject_id.clone(), d.name.clone(), at_ms - d.last_activity_ms))
        .collect();
    for (subject_id, name, idle_ms) in stale {
        events.push(MonitorEvent::Inactivity { subject_id, name, idle_ms });
    }

    // Activity and alert logs derive from the emitted events
    for event in &events {
        match event {
            MonitorEvent::Connect { subject_id, name } => {
                doc.log_activity(at_ms, subject_id, "connect", name.clone());
            }
            MonitorEvent::Disconnect { subject_id, name, .. } => {
                doc.log_activity(at_ms, subject_id, "disconnect", name.clone());
            }
            MonitorEvent::JobPromotion { subject_id, previous_grade, grade, .. } => {
                doc.log_activity(
                    at_ms,
                    subject_id,
                    "job_promotion",
                    format!("{} → {}", previous_grade, grade),
                );
            }
            MonitorEvent::ShortSession { name, session_ms, .. } => {
                doc.log_alert(
                    at_ms,
                    AlertLevel::Warning,
                    format!("Session courte de {} ({} ms)", name, session_ms),
                );
            }
            MonitorEvent::Inactivity { name, idle_ms, .. } => {
                doc.log_alert(
                    at_ms,
                    AlertLevel::Warning,
                    format!("{} inactif depuis {} ms", name, idle_ms),
                );
            }
        }
    }

    events
}

/// Polling presence monitor over the FiveM server.
pub struct Monitor {
    store: Store,
    doc: Mutex<MonitoringDocument>,
    client: FivemClient,
    tracked_job: String,
    events: EventSender,
}

impl Monitor {
    /// Open the monitor, loading any persisted tracked state.
    pub fn open(store: Store, client: FivemClient, tracked_job: String, events: EventSender) -> Self {
        let doc = store.load(MONITORING_DOC);
        Self { store, doc: Mutex::new(doc), client, tracked_job, events }
    }

    fn doc(&self) -> MutexGuard<'_, MonitoringDocument> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, doc: &MonitoringDocument) {
        if let Err(e) = self.store.save(MONITORING_DOC, doc) {
            eprintln!("Warning: failed to persist monitoring document: {}", e);
        }
    }

    /// Fetch one snapshot and run one poll cycle.
    ///
    /// On fetch failure the cycle is abandoned: an error alert is recorded
    /// and the tracked state is left untouched.
    pub async fn run_tick(&self) {
        let at_ms = now_ms();

        match self.client.fetch_snapshot().await {
            Ok(snapshot) => {
                let emitted = {
                    let mut doc = self.doc();
                    let emitted = poll_cycle(&mut doc, &snapshot, &self.tracked_job, at_ms);
                    self.persist(&doc);
                    emitted
                };
                for event in emitted {
                    let _ = self.events.send(event.into());
                }
            }
            Err(e) => {
                let message = format!("Sondage FiveM en échec: {}", e);
                {
                    let mut doc = self.doc();
                    doc.log_alert(at_ms, AlertLevel::Error, message.clone());
                    self.persist(&doc);
                }
                let _ = self.events.send(DomainEvent::PollFailed { message });
            }
        }
    }

    /// Dealers currently online, most recent connection first.
    pub fn get_online(&self) -> Vec<DealerPresence> {
        let mut online: Vec<DealerPresence> =
            self.doc().dealers.values().filter(|d| d.is_active).cloned().collect();
        online.sort_by_key(|d| std::cmp::Reverse(d.first_seen_ms));
        online
    }

    /// Most recent activity entries, newest first.
    pub fn recent_activity(&self, limit: usize) -> Vec<ActivityEntry> {
        let doc = self.doc();
        doc.activity.iter().rev().take(limit).cloned().collect()
    }

    /// Most recent alerts, newest first.
    pub fn alerts(&self, limit: usize) -> Vec<AlertEntry> {
        let doc = self.doc();
        doc.alerts.iter().rev().take(limit).cloned().collect()
    }
}
