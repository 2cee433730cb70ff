//! Aufnahme-Schnittstelle
//!
//! Der Relay kennt Encoding-Pipelines nur ueber diese Traits. So kann der Hot
//! Path gegen echte Encoder-Prozesse (`FfmpegFabrik`) oder In-Memory-Senken
//! (`SpeicherFabrik`) laufen.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use voxrelay_core::{AufnahmeZiel, Result};

/// Eine Senke, die rohes PCM in eine Aufnahme schreibt
///
/// `einspeisen` wird im Hot Path aufgerufen und darf niemals blockieren oder
/// panicken. Nach einem Fehler (`ist_aktiv() == false`) wird jedes weitere
/// Einspeisen stillschweigend ignoriert.
#[async_trait]
pub trait AufnahmeSenke: Send + Sync {
    /// Ziel dieser Senke
    fn ziel(&self) -> &AufnahmeZiel;

    /// Pfad der Ausgabedatei
    fn datei(&self) -> &Path;

    /// Speist rohe s16le-Samples ein (nicht-blockierend)
    fn einspeisen(&self, audio: Bytes);

    /// Ist die Senke noch lebendig?
    fn ist_aktiv(&self) -> bool;

    /// Anzahl der wegen voller Queue verworfenen Chunks
    fn verworfene_chunks(&self) -> u64 {
        0
    }

    /// Gibt die Senke frei: Eingabe schliessen, auf Abschluss warten
    ///
    /// Idempotent – mehrfaches Beenden ist harmlos.
    async fn beenden(&self);
}

/// Erstellt Senken fuer Aufnahme-Ziele
pub trait PipelineFabrik: Send + Sync {
    /// Erstellt eine neue Senke fuer `ziel`
    ///
    /// # Fehler
    /// - `PipelineStart` wenn der Encoder nicht gestartet werden konnte
    fn erstellen(&self, ziel: &AufnahmeZiel) -> Result<Arc<dyn AufnahmeSenke>>;
}
