//! voxrelay-voice – Relay-Engine
//!
//! Verteilt eingehende Audio-Datagramme an alle anderen Teilnehmer und speist
//! das Audio in die Aufnahmen ein.
//!
//! ## Module
//! - [`udp`] – UDP-Listener und Send-Queue pro Empfaenger
//! - [`router`] – Relay-Engine (Hot Path pro Datagramm)
//! - [`state`] – Sitzungs-Register mit den Aufnahme-Pipelines
//! - [`statistik`] – Zaehler des Hot Paths

pub mod router;
pub mod state;
pub mod statistik;
pub mod udp;

pub use router::{PaketVersand, RelayEngine, Weiterleitung};
pub use state::{Aufloesung, Sitzung, SitzungsRegister};
pub use statistik::{RelayStatistik, StatistikSchnappschuss};
pub use udp::{RelayServer, RelayServerConfig, UdpVersand};
