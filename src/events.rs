//! Domain events.
//!
//! The core components emit these on every observable transition; a thin
//! adapter in [`crate::notify`] formats and forwards them to Discord. The
//! core never builds user-facing text itself.

use crate::absence::{AbsenceReason, AbsenceStatus};
use crate::compliance::Sanction;
use tokio::sync::mpsc;

/// An observable state transition somewhere in the core.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    ShiftStarted {
        subject_id: String,
        subject_name: String,
        post: String,
    },
    ShiftEnded {
        subject_id: String,
        subject_name: String,
        post: String,
        duration_ms: i64,
    },
    ShiftForceClosed {
        subject_id: String,
        subject_name: String,
        post: String,
        duration_ms: i64,
        infraction_count: u32,
        sanction: Sanction,
    },
    AbsenceDeclared {
        id: String,
        subject_id: String,
        subject_name: String,
        reason: AbsenceReason,
        duration: String,
    },
    AbsenceDecided {
        id: String,
        subject_id: String,
        status: AbsenceStatus,
        decided_by: String,
    },
    DealerConnected {
        subject_id: String,
        name: String,
    },
    DealerDisconnected {
        subject_id: String,
        name: String,
        session_ms: i64,
    },
    ShortSession {
        subject_id: String,
        name: String,
        session_ms: i64,
    },
    JobPromotion {
        subject_id: String,
        name: String,
        job_label: String,
        previous_grade: u32,
        grade: u32,
    },
    InactivityAlert {
        subject_id: String,
        name: String,
        idle_ms: i64,
    },
    PollFailed {
        message: String,
    },
}

/// Sending half of the event pipeline.
pub type EventSender = mpsc::UnboundedSender<DomainEvent>;
/// Receiving half, consumed by the notification forwarder.
pub type EventReceiver = mpsc::UnboundedReceiver<DomainEvent>;

/// Create the event pipeline.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
