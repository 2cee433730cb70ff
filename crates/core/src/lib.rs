//! voxrelay-core – Gemeinsame Typen, Ereignisse und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Relay, Aufnahme und Server
//! gemeinsam nutzen: die Fehler-Taxonomie, den Ereignis-Bus fuer
//! Lebenszyklus-Signale und die Ziel-/Datums-Typen der Aufnahmedateien.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{RelayFehler, Result};
pub use event::{BroadcastBus, EreignisBus, RelayEreignis};
pub use types::{AufnahmeZiel, DatumsTag};
