//! Discord bot commands.
//!
//! This is the thin layer over the ledgers: commands parse the interaction,
//! call one ledger operation, run the role side effects around it and format
//! the reply. No business rules live here.

pub mod absence;
pub mod moniteur;
pub mod ping;
pub mod service;

pub use absence::absence;
pub use moniteur::{activite, alertes, effectif_fivem};
pub use ping::ping;
pub use service::service;
