//! Ereignis-Bus fuer Lebenszyklus-Signale
//!
//! Sitzungen und Encoding-Pipelines melden ihren Lebenszyklus (erstellt,
//! gestartet, ausgefallen, beendet) ueber diesen Bus. Abonnenten (Metriken,
//! Tests) sehen die Ereignisse, ohne den Hot Path zu blockieren: das Senden ist
//! nicht-blockierend, langsame Abonnenten verlieren im Zweifel alte Ereignisse.

use crate::error::RelayFehler;
use crate::types::AufnahmeZiel;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Alle systemweiten Ereignisse die ueber den Bus fliessen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelayEreignis {
    // --- Sitzungs-Ereignisse ---
    /// Erstes Paket von einer bisher unbekannten Adresse
    SitzungErstellt {
        endpunkt: SocketAddr,
        benutzername: String,
    },
    /// Sitzung wegen Inaktivitaet entfernt
    SitzungEntfernt {
        endpunkt: SocketAddr,
        benutzername: String,
    },

    // --- Pipeline-Ereignisse ---
    /// Encoder-Prozess wurde gestartet
    PipelineGestartet {
        ziel: AufnahmeZiel,
        datei: PathBuf,
    },
    /// Pipeline konnte nicht starten oder ist ausgefallen
    ///
    /// `art` ist `RelayFehler::art()` des ausloesenden Fehlers.
    PipelineFehler {
        ziel: AufnahmeZiel,
        art: String,
        grund: String,
    },
    /// Encoder-Prozess hat sich beendet
    PipelineBeendet {
        ziel: AufnahmeZiel,
        erfolgreich: bool,
    },

    // --- Aufbewahrung ---
    /// Ein Aufraeum-Durchlauf ist abgeschlossen
    AufraeumenAbgeschlossen { geloescht: usize, fehler: usize },
}

impl RelayEreignis {
    /// Pipeline-Fehlerereignis aus einem `RelayFehler`
    pub fn pipeline_fehler(ziel: AufnahmeZiel, fehler: &RelayFehler) -> Self {
        Self::PipelineFehler {
            ziel,
            art: fehler.art().to_string(),
            grund: fehler.to_string(),
        }
    }
}

/// Trait fuer den Ereignis-Bus
///
/// Senden darf niemals blockieren und niemals fehlschlagen: ein Bus ohne
/// Abonnenten verwirft Ereignisse stillschweigend.
pub trait EreignisBus: Send + Sync + 'static {
    /// Sendet ein Ereignis an alle Abonnenten
    fn senden(&self, ereignis: RelayEreignis);
}

/// Standard-Kapazitaet des Broadcast-Puffers
pub const BUS_KAPAZITAET: usize = 256;

/// Ereignis-Bus auf Basis von `tokio::sync::broadcast`
#[derive(Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<RelayEreignis>,
}

impl BroadcastBus {
    /// Erstellt einen neuen Bus mit der angegebenen Puffer-Kapazitaet
    pub fn neu(kapazitaet: usize) -> Self {
        let (tx, _) = broadcast::channel(kapazitaet.max(1));
        Self { tx }
    }

    /// Abonniert alle zukuenftigen Ereignisse
    pub fn abonnieren(&self) -> broadcast::Receiver<RelayEreignis> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::neu(BUS_KAPAZITAET)
    }
}

impl EreignisBus for BroadcastBus {
    fn senden(&self, ereignis: RelayEreignis) {
        // Err bedeutet nur: niemand hoert zu
        if self.tx.send(ereignis).is_err() {
            tracing::trace!("Ereignis ohne Abonnenten verworfen");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn endpunkt() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000)
    }

    #[test]
    fn ereignis_ist_serde_kompatibel() {
        let ereignis = RelayEreignis::SitzungErstellt {
            endpunkt: endpunkt(),
            benutzername: "alice".into(),
        };
        let json = serde_json::to_string(&ereignis).unwrap();
        let zurueck: RelayEreignis = serde_json::from_str(&json).unwrap();
        assert_eq!(ereignis, zurueck);
    }

    #[test]
    fn senden_ohne_abonnenten_ist_kein_fehler() {
        let bus = BroadcastBus::default();
        bus.senden(RelayEreignis::AufraeumenAbgeschlossen {
            geloescht: 0,
            fehler: 0,
        });
    }

    #[tokio::test]
    async fn abonnent_empfaengt_ereignisse_in_reihenfolge() {
        let bus = BroadcastBus::neu(8);
        let mut rx = bus.abonnieren();

        bus.senden(RelayEreignis::PipelineGestartet {
            ziel: AufnahmeZiel::Kombiniert,
            datei: PathBuf::from("combined-01-01-2026.mp3"),
        });
        bus.senden(RelayEreignis::pipeline_fehler(
            AufnahmeZiel::Kombiniert,
            &RelayFehler::PipelineLaufzeit {
                ziel: "combined".into(),
                grund: "exit status 1".into(),
            },
        ));

        assert!(matches!(
            rx.recv().await.unwrap(),
            RelayEreignis::PipelineGestartet { .. }
        ));
        match rx.recv().await.unwrap() {
            RelayEreignis::PipelineFehler { art, grund, .. } => {
                assert_eq!(art, "pipeline_laufzeit");
                assert!(grund.contains("exit status 1"));
            }
            andere => panic!("unerwartetes Ereignis: {andere:?}"),
        }
    }
}
