//! Absence commands.

use crate::absence::{AbsenceError, AbsenceStatus, AbsenceReason, Decision};
use crate::events::DomainEvent;
use crate::types::{Context, Error};
use crate::utils::time::now_ms;

/// Gestion des demandes d'absence.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("declarer", "valider", "refuser", "liste", "supprimer")
)]
pub async fn absence(_context: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Déclarer une absence.
#[poise::command(slash_command, guild_only)]
pub async fn declarer(
    context: Context<'_>,
    #[description = "Motif de l'absence"] raison: AbsenceReason,
    #[description = "Durée prévue (ex: 2 jours)"] duree: String,
    #[description = "Précisions éventuelles"] details: Option<String>,
) -> Result<(), Error> {
    let data = context.data();
    let author = context.author();

    let request = data.absences.declare(
        &author.id.to_string(),
        author.display_name(),
        raison,
        &duree,
        details,
        now_ms(),
    );

    let _ = data.events.send(DomainEvent::AbsenceDeclared {
        id: request.id.clone(),
        subject_id: request.subject_id.clone(),
        subject_name: request.subject_name.clone(),
        reason: request.reason,
        duration: request.duration.clone(),
    });

    context
        .say(format!(
            "📋 Absence enregistrée (`{}`) : **{}**, {}. Elle sera examinée par la direction.",
            request.id,
            request.reason.label(),
            request.duration
        ))
        .await?;

    Ok(())
}

async fn decide_and_reply(
    context: Context<'_>,
    absence_id: &str,
    decision: Decision,
) -> Result<(), Error> {
    let data = context.data();
    let decider_id = context.author().id.to_string();

    match data.absences.decide(absence_id, decision, &decider_id, now_ms()) {
        Ok(request) => {
            let _ = data.events.send(DomainEvent::AbsenceDecided {
                id: request.id.clone(),
                subject_id: request.subject_id.clone(),
                status: request.status,
                decided_by: decider_id,
            });
            context
                .say(format!(
                    "✅ Demande `{}` de **{}** {}.",
                    request.id,
                    request.subject_name,
                    request.status.label()
                ))
                .await?;
        }
        Err(AbsenceError::NotFound) => {
            context.say(format!("❌ Demande `{}` introuvable.", absence_id)).await?;
        }
        Err(AbsenceError::AlreadyDecided(status)) => {
            context
                .say(format!(
                    "⚠️ Demande `{}` déjà {} — décision inchangée.",
                    absence_id,
                    status.label()
                ))
                .await?;
        }
    }

    Ok(())
}

/// Approuver une demande d'absence.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn valider(
    context: Context<'_>,
    #[description = "Identifiant de la demande (ABS-...)"] id: String,
) -> Result<(), Error> {
    decide_and_reply(context, &id, Decision::Approved).await
}

/// Refuser une demande d'absence.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn refuser(
    context: Context<'_>,
    #[description = "Identifiant de la demande (ABS-...)"] id: String,
) -> Result<(), Error> {
    decide_and_reply(context, &id, Decision::Rejected).await
}

/// Lister les demandes d'absence.
#[poise::command(slash_command, guild_only)]
pub async fn liste(
    context: Context<'_>,
    #[description = "Filtrer par statut"] statut: Option<AbsenceStatus>,
) -> Result<(), Error> {
    let data = context.data();
    let requests = match statut {
        Some(status) => data.absences.list_by_status(status),
        None => data.absences.list_all(),
    };

    if requests.is_empty() {
        context.say("Aucune demande d'absence.").await?;
        return Ok(());
    }

    let lines: Vec<String> = requests
        .iter()
        .rev()
        .take(15)
        .map(|r| {
            format!(
                "• `{}` — **{}** : {} ({}) — {}",
                r.id,
                r.subject_name,
                r.reason.label(),
                r.duration,
                r.status.label()
            )
        })
        .collect();
    context
        .say(format!("**Demandes d'absence ({})**\n{}", requests.len(), lines.join("\n")))
        .await?;

    Ok(())
}

/// Supprimer définitivement une demande d'absence.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn supprimer(
    context: Context<'_>,
    #[description = "Identifiant de la demande (ABS-...)"] id: String,
) -> Result<(), Error> {
    match context.data().absences.remove(&id) {
        Ok(()) => {
            context.say(format!("🗑️ Demande `{}` supprimée.", id)).await?;
        }
        Err(_) => {
            context.say(format!("❌ Demande `{}` introuvable.", id)).await?;
        }
    }

    Ok(())
}
