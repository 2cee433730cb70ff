//! voxrelay-protocol – Wire-Format der Audio-Datagramme
//!
//! Ein Datagramm traegt genau einen Audio-Frame: Laengenbyte, Benutzername
//! und rohes PCM. Der Server leitet Datagramme unveraendert weiter, dieses
//! Crate wird daher nur zum Lesen von Benutzername und Nutzdaten gebraucht
//! (und von Clients bzw. Tests zum Bauen von Frames).

pub mod frame;

pub use frame::{AudioFrame, MIN_FRAME_LAENGE};
