//! Type definitions and aliases for the bot.
//!
//! This module contains shared types used throughout the application.

use crate::absence::AbsenceLedger;
use crate::compliance::InfractionLedger;
use crate::config::Config;
use crate::events::EventSender;
use crate::monitor::Monitor;
use crate::scheduler::Scheduler;
use crate::shift::ShiftLedger;
use std::sync::Arc;

/// Bot application data shared across all commands.
///
/// This data is accessible in all command handlers through the context.
/// Ledgers are passed here explicitly rather than living as globals.
pub struct Data {
    pub shifts: Arc<ShiftLedger>,
    pub absences: Arc<AbsenceLedger>,
    pub infractions: Arc<InfractionLedger>,
    pub monitor: Arc<Monitor>,
    pub events: EventSender,
    pub config: Config,
    /// Keeps the background loops alive for the client's lifetime.
    pub scheduler: Scheduler,
}

/// Error type for bot commands (maintains compatibility with poise).
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Command context type alias for easier usage.
pub type Context<'a> = poise::Context<'a, Data, Error>;
