//! Periodic task scheduler.
//!
//! Owns the two background loops (presence poll, compliance sweep) with an
//! explicit lifecycle instead of fire-and-forget timers scattered around the
//! codebase. Each loop body is a single call into a manually-triggerable
//! entry point ([`Monitor::run_tick`], [`crate::compliance::sweep`]), so one
//! tick is directly testable without the scheduler.

use crate::compliance::{self, InfractionLedger};
use crate::events::{DomainEvent, EventSender};
use crate::monitor::Monitor;
use crate::roles;
use crate::shift::ShiftLedger;
use crate::utils::time::now_ms;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Owner of the background task handles.
#[derive(Default)]
pub struct Scheduler {
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the presence-poll loop.
    pub fn spawn_monitor(&mut self, monitor: Arc<Monitor>, period: Duration) {
        self.handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                monitor.run_tick().await;
            }
        }));
    }

    /// Spawn the compliance-sweep loop.
    ///
    /// Role removal for force-closed shifts happens here, after the ledger
    /// mutation, and only when a guild is configured.
    pub fn spawn_sweeper(
        &mut self,
        shifts: Arc<ShiftLedger>,
        infractions: Arc<InfractionLedger>,
        events: EventSender,
        http: Arc<serenity::Http>,
        guild_id: Option<serenity::GuildId>,
        period: Duration,
    ) {
        self.handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;

                let outcomes = compliance::sweep(&shifts, &infractions, now_ms());
                for outcome in outcomes {
                    if let (Some(guild_id), Some(role_id)) =
                        (guild_id, outcome.record.assigned_role_id)
                    {
                        if let Ok(user_id) = outcome.record.subject_id.parse::<u64>() {
                            if let Some(warning) = roles::remove_assigned(
                                &http,
                                guild_id,
                                serenity::UserId::new(user_id),
                                role_id,
                            )
                            .await
                            {
                                eprintln!("Warning: {}", warning);
                            }
                        }
                    }

                    let _ = events.send(DomainEvent::ShiftForceClosed {
                        subject_id: outcome.record.subject_id,
                        subject_name: outcome.record.subject_name,
                        post: outcome.record.post,
                        duration_ms: outcome.record.duration_ms,
                        infraction_count: outcome.count,
                        sanction: outcome.sanction,
                    });
                }
            }
        }));
    }

    /// Stop every background loop.
    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
