//! Bot wiring and startup.
//!
//! Builds the ledgers, the FiveM monitor and the background scheduler, then
//! hands everything to the poise framework as shared data.

use crate::absence::AbsenceLedger;
use crate::commands::{absence, activite, alertes, effectif_fivem, ping, service};
use crate::compliance::InfractionLedger;
use crate::config::Config;
use crate::events;
use crate::fivem::FivemClient;
use crate::monitor::Monitor;
use crate::notify;
use crate::scheduler::Scheduler;
use crate::shift::ShiftLedger;
use crate::storage::Store;
use crate::types::Data;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;

    let store = Store::new(&config.data_dir)?;
    let shifts = Arc::new(ShiftLedger::open(store.clone()));
    let absences = Arc::new(AbsenceLedger::open(store.clone()));
    let infractions = Arc::new(InfractionLedger::open(store.clone()));

    let (event_sender, event_receiver) = events::channel();
    let fivem = FivemClient::new(&config.fivem_base_url)?;
    let monitor = Arc::new(Monitor::open(
        store,
        fivem,
        config.tracked_job.clone(),
        event_sender.clone(),
    ));

    let token = config.discord_token.clone();
    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), service(), absence(), effectif_fivem(), activite(), alertes()],
            ..Default::default()
        })
        .setup(move |context, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(context, &framework.options().commands).await?;

                tokio::spawn(notify::forward(
                    event_receiver,
                    context.http.clone(),
                    config.log_channel_id,
                ));

                let mut scheduler = Scheduler::new();
                scheduler.spawn_monitor(
                    monitor.clone(),
                    Duration::from_secs(config.poll_interval_secs),
                );
                scheduler.spawn_sweeper(
                    shifts.clone(),
                    infractions.clone(),
                    event_sender.clone(),
                    context.http.clone(),
                    config.guild_id.map(serenity::GuildId::new),
                    Duration::from_secs(config.sweep_interval_secs),
                );

                Ok(Data {
                    shifts,
                    absences,
                    infractions,
                    monitor,
                    events: event_sender,
                    config,
                    scheduler,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents).framework(framework).await?;

    client.start().await?;

    Ok(())
}
