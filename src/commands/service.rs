//! Shift (service) commands.
//!
//! Role assignment is a saga around the ledger mutation: best effort, never
//! rolled back. A role failure shows up as a warning in the reply while the
//! shift itself is recorded normally.

use crate::events::DomainEvent;
use crate::roles;
use crate::shift::{ShiftError, TerminatedBy};
use crate::types::{Context, Error};
use crate::utils::time::{format_duration_ms, now_ms};

/// Gestion du service à la concession.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("prendre", "terminer", "effectif", "historique")
)]
pub async fn service(_context: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Prendre son service.
#[poise::command(slash_command, guild_only)]
pub async fn prendre(
    context: Context<'_>,
    #[description = "Poste occupé pendant le service"] poste: Option<String>,
) -> Result<(), Error> {
    let guild_id = match context.guild_id() {
        Some(guild_id) => guild_id,
        None => {
            context.say("❌ Cette commande s'utilise sur le serveur.").await?;
            return Ok(());
        }
    };

    context.defer().await?;

    let data = context.data();
    let author = context.author();
    let subject_id = author.id.to_string();

    if let Some(sanction) = data.infractions.active_block(&subject_id, now_ms()) {
        context
            .say(format!(
                "⛔ Vous ne pouvez pas prendre votre service : sanction en cours (**{}**).",
                sanction.label()
            ))
            .await?;
        return Ok(());
    }

    if let Some(existing) = data.shifts.get_active(&subject_id) {
        context
            .say(format!(
                "❌ Vous êtes déjà en service depuis <t:{}:R> — poste **{}**.",
                existing.start_ms / 1000,
                existing.post
            ))
            .await?;
        return Ok(());
    }

    let http = &context.serenity_context().http;
    let post = match poste {
        Some(post) => post,
        None => roles::default_post_for_member(http, guild_id, author.id).await,
    };

    // Role first, then the ledger: the ledger op itself has no await inside,
    // and the granted role id gets recorded on the session.
    let outcome = roles::assign_for_post(http, guild_id, author.id, &post).await;

    match data.shifts.take_shift(
        &subject_id,
        author.display_name(),
        &post,
        outcome.role_id,
        now_ms(),
    ) {
        Ok(session) => {
            let _ = data.events.send(DomainEvent::ShiftStarted {
                subject_id: session.subject_id.clone(),
                subject_name: session.subject_name.clone(),
                post: session.post.clone(),
            });

            let mut reply = format!("✅ Service pris — poste **{}**. Bon courage !", session.post);
            if let Some(warning) = outcome.warning {
                reply.push_str(&format!("\n⚠️ {}", warning));
            }
            context.say(reply).await?;
        }
        Err(ShiftError::AlreadyActive(existing)) => {
            // Raced with another invocation; drop the role we just granted
            // unless it is the one the active session recorded
            if let Some(role_id) = outcome.role_id {
                if existing.assigned_role_id != Some(role_id) {
                    let _ = roles::remove_assigned(http, guild_id, author.id, role_id).await;
                }
            }
            context
                .say(format!(
                    "❌ Vous êtes déjà en service depuis <t:{}:R> — poste **{}**.",
                    existing.start_ms / 1000,
                    existing.post
                ))
                .await?;
        }
        Err(e) => {
            context.say(format!("❌ {}", e)).await?;
        }
    }

    Ok(())
}

/// Terminer son service.
#[poise::command(slash_command, guild_only)]
pub async fn terminer(context: Context<'_>) -> Result<(), Error> {
    context.defer().await?;

    let data = context.data();
    let author = context.author();
    let subject_id = author.id.to_string();

    let record = match data.shifts.end_shift(&subject_id, now_ms()) {
        Ok(record) => record,
        Err(_) => {
            context.say("❌ Aucun service en cours.").await?;
            return Ok(());
        }
    };

    // Remove exactly the role recorded at start-shift time
    let mut warning = None;
    if let (Some(guild_id), Some(role_id)) = (context.guild_id(), record.assigned_role_id) {
        let http = &context.serenity_context().http;
        warning = roles::remove_assigned(http, guild_id, author.id, role_id).await;
    }

    let _ = data.events.send(DomainEvent::ShiftEnded {
        subject_id: record.subject_id.clone(),
        subject_name: record.subject_name.clone(),
        post: record.post.clone(),
        duration_ms: record.duration_ms,
    });

    let mut reply = format!(
        "✅ Service terminé — durée : **{}** (poste {}).",
        format_duration_ms(record.duration_ms),
        record.post
    );
    if let Some(warning) = warning {
        reply.push_str(&format!("\n⚠️ {}", warning));
    }
    context.say(reply).await?;

    Ok(())
}

/// Voir qui est actuellement en service.
#[poise::command(slash_command, guild_only)]
pub async fn effectif(context: Context<'_>) -> Result<(), Error> {
    let active = context.data().shifts.list_active();

    if active.is_empty() {
        context.say("Personne n'est en service actuellement.").await?;
        return Ok(());
    }

    let lines: Vec<String> = active
        .iter()
        .map(|s| {
            format!(
                "• **{}** — {} (depuis <t:{}:R>)",
                s.subject_name,
                s.post,
                s.start_ms / 1000
            )
        })
        .collect();
    context
        .say(format!("**En service ({})**\n{}", active.len(), lines.join("\n")))
        .await?;

    Ok(())
}

/// Historique des services d'un membre.
#[poise::command(slash_command, guild_only)]
pub async fn historique(
    context: Context<'_>,
    #[description = "Membre concerné (vous par défaut)"] membre: Option<
        poise::serenity_prelude::User,
    >,
) -> Result<(), Error> {
    let target = membre.as_ref().unwrap_or_else(|| context.author());
    let records = context.data().shifts.list_history(&target.id.to_string(), Some(10));

    if records.is_empty() {
        context
            .say(format!("Aucun service enregistré pour **{}**.", target.display_name()))
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = records
        .iter()
        .map(|r| {
            let marker = match r.terminated_by {
                TerminatedBy::User => "",
                TerminatedBy::System => " 🤖",
            };
            format!(
                "• {} — **{}** (terminé <t:{}:R>){}",
                r.post,
                format_duration_ms(r.duration_ms),
                r.end_ms / 1000,
                marker
            )
        })
        .collect();
    context
        .say(format!(
            "**Derniers services de {}**\n{}",
            target.display_name(),
            lines.join("\n")
        ))
        .await?;

    Ok(())
}
