//! Notification forwarding.
//!
//! Thin adapter between the core's domain events and Discord: formats each
//! event into a French log line and sends it to the configured channel, or to
//! stderr when no channel is configured. Formatting lives here so the core
//! modules never build user-facing text.

use crate::events::{DomainEvent, EventReceiver};
use crate::utils::time::format_duration_ms;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Render a domain event as a log-channel message.
pub fn render(event: &DomainEvent) -> String {
    match event {
        DomainEvent::ShiftStarted { subject_name, post, .. } => {
            format!("🟢 **{}** a pris son service — poste **{}**", subject_name, post)
        }
        DomainEvent::ShiftEnded { subject_name, post, duration_ms, .. } => {
            format!(
                "🔴 **{}** a terminé son service ({}) — poste **{}**",
                subject_name,
                format_duration_ms(*duration_ms),
                post
            )
        }
        DomainEvent::ShiftForceClosed {
            subject_name,
            duration_ms,
            infraction_count,
            sanction,
            ..
        } => {
            format!(
                "⚠️ Service de **{}** clôturé automatiquement après {} — infraction n°{}, sanction : **{}**",
                subject_name,
                format_duration_ms(*duration_ms),
                infraction_count,
                sanction.label()
            )
        }
        DomainEvent::AbsenceDeclared { id, subject_name, reason, duration, .. } => {
            format!(
                "📋 Absence déclarée par **{}** : {} ({}) — `{}`",
                subject_name,
                reason.label(),
                duration,
                id
            )
        }
        DomainEvent::AbsenceDecided { id, status, decided_by, .. } => {
            format!("📋 Absence `{}` {} par <@{}>", id, status.label(), decided_by)
        }
        DomainEvent::DealerConnected { name, .. } => {
            format!("🎮 **{}** est en ligne sur le serveur", name)
        }
        DomainEvent::DealerDisconnected { name, session_ms, .. } => {
            format!(
                "🎮 **{}** s'est déconnecté (session : {})",
                name,
                format_duration_ms(*session_ms)
            )
        }
        DomainEvent::ShortSession { name, session_ms, .. } => {
            format!(
                "⏱️ Session courte de **{}** : {} seulement",
                name,
                format_duration_ms(*session_ms)
            )
        }
        DomainEvent::JobPromotion { name, job_label, previous_grade, grade, .. } => {
            format!(
                "📈 **{}** a changé de grade : {} → {} ({})",
                name, previous_grade, grade, job_label
            )
        }
        DomainEvent::InactivityAlert { name, idle_ms, .. } => {
            format!("💤 **{}** inactif depuis {}", name, format_duration_ms(*idle_ms))
        }
        DomainEvent::PollFailed { message } => {
            format!("❌ {}", message)
        }
    }
}

/// Consume domain events until the channel closes.
pub async fn forward(
    mut receiver: EventReceiver,
    http: Arc<serenity::Http>,
    log_channel_id: Option<u64>,
) {
    while let Some(event) = receiver.recv().await {
        let text = render(&event);
        match log_channel_id {
            Some(id) => {
                if let Err(e) = serenity::ChannelId::new(id).say(&http, &text).await {
                    eprintln!("Warning: failed to send notification: {} ({})", e, text);
                }
            }
            None => eprintln!("[event] {}", text),
        }
    }
}
