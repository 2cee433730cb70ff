//! voxrelay-recording – Aufnahme der Audio-Streams
//!
//! Dieses Crate implementiert:
//! - `AufnahmeSenke`/`PipelineFabrik`: die Schnittstelle, ueber die der Relay
//!   Audio in Aufnahmen einspeist
//! - `FfmpegPipeline`/`FfmpegFabrik`: Encoder-Subprozess pro Zieldatei
//! - `SpeicherSenke`/`SpeicherFabrik`: In-Memory-Senken (Tests, Einbettung)
//! - Dateinamen der Ausgabedateien
//! - Aufbewahrung: periodisches Loeschen alter Aufnahmen
//!
//! # Beispiel
//!
//! ```no_run
//! use std::sync::Arc;
//! use voxrelay_core::{AufnahmeZiel, BroadcastBus, DatumsTag};
//! use voxrelay_recording::{AufnahmeSenke, EncoderKonfiguration, FfmpegFabrik, PipelineFabrik};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = Arc::new(BroadcastBus::default());
//!     let fabrik = FfmpegFabrik::neu(
//!         EncoderKonfiguration::default(),
//!         "./recordings",
//!         DatumsTag::heute(),
//!         bus,
//!     );
//!     let kombiniert = fabrik.erstellen(&AufnahmeZiel::Kombiniert).unwrap();
//!     kombiniert.einspeisen(bytes::Bytes::from_static(&[0, 0, 1, 0]));
//!     kombiniert.beenden().await;
//! }
//! ```

pub mod aufbewahrung;
pub mod dateinamen;
pub mod ffmpeg;
pub mod pipeline;
pub mod speicher;

// Bequeme Re-Exporte
pub use aufbewahrung::{alte_dateien_loeschen, AufraeumBericht, Aufbewahrung};
pub use dateinamen::{aufnahme_pfad, dateiname_bereinigen};
pub use ffmpeg::{EncoderKonfiguration, FfmpegFabrik, FfmpegPipeline};
pub use pipeline::{AufnahmeSenke, PipelineFabrik};
pub use speicher::{SpeicherFabrik, SpeicherSenke};
