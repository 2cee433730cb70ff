//! In-Memory-Senken
//!
//! Sammeln eingespeistes Audio im Speicher statt es zu encodieren. Werden in
//! Tests des Relays verwendet und eignen sich fuer Einbettungen ohne ffmpeg.

use crate::pipeline::{AufnahmeSenke, PipelineFabrik};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use voxrelay_core::{AufnahmeZiel, RelayFehler, Result};

/// Senke, die alle Chunks in Einspeise-Reihenfolge sammelt
pub struct SpeicherSenke {
    ziel: AufnahmeZiel,
    datei: PathBuf,
    chunks: Mutex<Vec<Bytes>>,
    aktiv: AtomicBool,
    beendet: AtomicUsize,
}

impl SpeicherSenke {
    pub fn neu(ziel: AufnahmeZiel) -> Self {
        let datei = PathBuf::from(format!("speicher://{ziel}"));
        Self {
            ziel,
            datei,
            chunks: Mutex::new(Vec::new()),
            aktiv: AtomicBool::new(true),
            beendet: AtomicUsize::new(0),
        }
    }

    /// Alle bisher eingespeisten Chunks
    pub fn chunks(&self) -> Vec<Bytes> {
        self.chunks.lock().clone()
    }

    /// Alle Chunks aneinandergehaengt
    pub fn inhalt(&self) -> Vec<u8> {
        self.chunks.lock().iter().flat_map(|c| c.iter().copied()).collect()
    }

    /// Simuliert einen Encoder-Ausfall
    pub fn als_tot_markieren(&self) {
        self.aktiv.store(false, Ordering::Release);
    }

    /// Wie oft wurde `beenden()` aufgerufen?
    pub fn beenden_aufrufe(&self) -> usize {
        self.beendet.load(Ordering::Acquire)
    }
}

#[async_trait]
impl AufnahmeSenke for SpeicherSenke {
    fn ziel(&self) -> &AufnahmeZiel {
        &self.ziel
    }

    fn datei(&self) -> &Path {
        &self.datei
    }

    fn einspeisen(&self, audio: Bytes) {
        if audio.is_empty() || !self.aktiv.load(Ordering::Acquire) {
            return;
        }
        self.chunks.lock().push(audio);
    }

    fn ist_aktiv(&self) -> bool {
        self.aktiv.load(Ordering::Acquire)
    }

    async fn beenden(&self) {
        self.aktiv.store(false, Ordering::Release);
        self.beendet.fetch_add(1, Ordering::AcqRel);
    }
}

/// Fabrik fuer `SpeicherSenke`n
///
/// Merkt sich jede erzeugte Senke, damit Tests nachtraeglich pruefen koennen,
/// was eingespeist wurde. Einzelne Ziele koennen als fehlschlagend markiert
/// werden.
#[derive(Default)]
pub struct SpeicherFabrik {
    senken: Mutex<Vec<Arc<SpeicherSenke>>>,
    fehlschlagend: Mutex<HashSet<AufnahmeZiel>>,
}

impl SpeicherFabrik {
    pub fn neu() -> Self {
        Self::default()
    }

    /// `erstellen` fuer dieses Ziel schlaegt ab jetzt fehl
    pub fn fehlschlagen_fuer(&self, ziel: AufnahmeZiel) {
        self.fehlschlagend.lock().insert(ziel);
    }

    /// Alle bisher erzeugten Senken in Erstellungs-Reihenfolge
    pub fn senken(&self) -> Vec<Arc<SpeicherSenke>> {
        self.senken.lock().clone()
    }

    /// Zuletzt erzeugte Senke fuer ein Ziel
    pub fn senke(&self, ziel: &AufnahmeZiel) -> Option<Arc<SpeicherSenke>> {
        self.senken
            .lock()
            .iter()
            .rev()
            .find(|s| s.ziel() == ziel)
            .cloned()
    }

    /// Wie viele Senken wurden fuer ein Ziel erzeugt?
    pub fn erstellt_fuer(&self, ziel: &AufnahmeZiel) -> usize {
        self.senken.lock().iter().filter(|s| s.ziel() == ziel).count()
    }
}

impl PipelineFabrik for SpeicherFabrik {
    fn erstellen(&self, ziel: &AufnahmeZiel) -> Result<Arc<dyn AufnahmeSenke>> {
        if self.fehlschlagend.lock().contains(ziel) {
            return Err(RelayFehler::PipelineStart {
                ziel: ziel.to_string(),
                grund: "simulierter Startfehler".into(),
            });
        }
        let senke = Arc::new(SpeicherSenke::neu(ziel.clone()));
        self.senken.lock().push(Arc::clone(&senke));
        Ok(senke)
    }
}
