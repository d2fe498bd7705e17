//! Presence-monitor commands.
//!
//! Read-only views over the FiveM presence monitor: who is online with the
//! tracked job, the recent activity log and the alert list.

use crate::monitor::AlertLevel;
use crate::types::{Context, Error};
use crate::utils::time::{format_duration_ms, now_ms};

/// Concessionnaires actuellement en ligne sur le serveur.
#[poise::command(slash_command, rename = "effectif-fivem")]
pub async fn effectif_fivem(context: Context<'_>) -> Result<(), Error> {
    let online = context.data().monitor.get_online();

    if online.is_empty() {
        context.say("Aucun concessionnaire en ligne sur le serveur.").await?;
        return Ok(());
    }

    let now = now_ms();
    let lines: Vec<String> = online
        .iter()
        .map(|d| {
            format!(
                "• **{}** — {} (grade {}) — en ligne depuis {}",
                d.name,
                d.job_label,
                d.job_grade,
                format_duration_ms(now - d.first_seen_ms)
            )
        })
        .collect();
    context
        .say(format!("**En ligne ({})**\n{}", online.len(), lines.join("\n")))
        .await?;

    Ok(())
}

/// Dernières activités détectées par le moniteur.
#[poise::command(slash_command)]
pub async fn activite(context: Context<'_>) -> Result<(), Error> {
    let entries = context.data().monitor.recent_activity(10);

    if entries.is_empty() {
        context.say("Aucune activité enregistrée pour le moment.").await?;
        return Ok(());
    }

    let lines: Vec<String> = entries
        .iter()
        .map(|e| format!("• <t:{}:R> — `{}` : {}", e.at_ms / 1000, e.kind, e.details))
        .collect();
    context.say(format!("**Activité récente**\n{}", lines.join("\n"))).await?;

    Ok(())
}

/// Dernières alertes du moniteur.
#[poise::command(slash_command)]
pub async fn alertes(context: Context<'_>) -> Result<(), Error> {
    let entries = context.data().monitor.alerts(10);

    if entries.is_empty() {
        context.say("Aucune alerte. Tout va bien. ✅").await?;
        return Ok(());
    }

    let lines: Vec<String> = entries
        .iter()
        .map(|e| {
            let icon = match e.level {
                AlertLevel::Warning => "⚠️",
                AlertLevel::Error => "❌",
            };
            format!("{} <t:{}:R> — {}", icon, e.at_ms / 1000, e.message)
        })
        .collect();
    context.say(format!("**Alertes récentes**\n{}", lines.join("\n"))).await?;

    Ok(())
}
