//! Concess library.
//!
//! This library provides the core functionality for the Concess Discord bot:
//! dealership shift tracking with automatic role synchronization, absence
//! requests, infraction sanctions and FiveM presence monitoring.

pub mod error;
pub mod config;
pub mod storage;
pub mod shift;
pub mod roles;
pub mod compliance;
pub mod absence;
pub mod fivem;
pub mod monitor;
pub mod events;
pub mod notify;
pub mod scheduler;
pub mod types;
pub mod commands;
pub mod bot;
pub mod utils;

pub use error::{ConcessError, Result};
pub use config::Config;
