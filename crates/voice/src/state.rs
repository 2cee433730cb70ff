//! Sitzungs-Register – In-Memory Zustand aller bekannten Teilnehmer
//!
//! Verwaltet:
//! - Adresse -> Sitzung (Benutzername, Zeitpunkt des letzten Pakets)
//! - Benutzername -> Aufnahme-Pipeline
//! - die gemeinsame kombinierte Aufnahme
//!
//! Sitzungen sind nach Transport-Adresse indexiert, Pipelines nach
//! Benutzername. Derselbe Benutzer von einer neuen Adresse (Port-Wechsel,
//! Reconnect nach Eviction) schreibt daher in dieselbe Datei weiter.
//!
//! Thread-safe durch DashMap. Mutationen sind pro Schluessel serialisiert, es
//! entsteht also nie eine doppelte Pipeline fuer denselben Benutzernamen.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use voxrelay_core::{AufnahmeZiel, EreignisBus, RelayEreignis};
use voxrelay_recording::{AufnahmeSenke, PipelineFabrik};

// ---------------------------------------------------------------------------
// Sitzung
// ---------------------------------------------------------------------------

/// Zustand eines einzelnen Teilnehmers
#[derive(Debug, Clone)]
pub struct Sitzung {
    /// Absenderadresse (Schluessel)
    pub endpunkt: SocketAddr,
    /// Erster von dieser Adresse gesehener Benutzername
    pub benutzername: String,
    /// Zeitpunkt des ersten Pakets
    pub erstellt: Instant,
    /// Zeitpunkt des letzten Pakets
    pub letztes_paket: Instant,
    /// Anzahl empfangener Pakete
    pub pakete: u64,
}

impl Sitzung {
    fn neu(endpunkt: SocketAddr, benutzername: String) -> Self {
        let jetzt = Instant::now();
        Self {
            endpunkt,
            benutzername,
            erstellt: jetzt,
            letztes_paket: jetzt,
            pakete: 1,
        }
    }

    /// Prueft ob die Sitzung als inaktiv gilt (kein Paket seit `timeout`)
    pub fn ist_inaktiv(&self, timeout: Duration) -> bool {
        self.letztes_paket.elapsed() > timeout
    }

    fn paket_empfangen(&mut self) {
        self.letztes_paket = Instant::now();
        self.pakete += 1;
    }
}

/// Ergebnis von `SitzungsRegister::aufloesen`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aufloesung {
    /// Massgeblicher Benutzername der Adresse
    pub benutzername: String,
    /// War die Adresse bisher unbekannt?
    pub neu: bool,
}

// ---------------------------------------------------------------------------
// SitzungsRegister
// ---------------------------------------------------------------------------

/// Zentrales Register aller Sitzungen und Aufnahme-Pipelines
///
/// `Clone`-faehig (innerer Arc). Wird von der `RelayEngine` gehalten.
#[derive(Clone)]
pub struct SitzungsRegister {
    inner: Arc<SitzungsRegisterInner>,
}

struct SitzungsRegisterInner {
    /// Sitzungen, indexiert nach Absenderadresse
    sitzungen: DashMap<SocketAddr, Sitzung>,
    /// Pipelines pro Benutzername; `None` = Start fehlgeschlagen, kein neuer Versuch
    pipelines: DashMap<String, Option<Arc<dyn AufnahmeSenke>>>,
    /// Gemeinsame Aufnahme (None wenn der Start fehlgeschlagen ist)
    kombiniert: Option<Arc<dyn AufnahmeSenke>>,
    fabrik: Arc<dyn PipelineFabrik>,
    bus: Arc<dyn EreignisBus>,
}

impl SitzungsRegister {
    /// Erstellt ein leeres Register und startet die kombinierte Aufnahme
    ///
    /// Schlaegt der Start der kombinierten Aufnahme fehl, laeuft der Relay
    /// ohne sie weiter.
    pub fn neu(fabrik: Arc<dyn PipelineFabrik>, bus: Arc<dyn EreignisBus>) -> Self {
        let kombiniert = match fabrik.erstellen(&AufnahmeZiel::Kombiniert) {
            Ok(senke) => Some(senke),
            Err(e) => {
                tracing::error!(fehler = %e, "Kombinierte Aufnahme nicht verfuegbar");
                bus.senden(RelayEreignis::pipeline_fehler(AufnahmeZiel::Kombiniert, &e));
                None
            }
        };

        Self {
            inner: Arc::new(SitzungsRegisterInner {
                sitzungen: DashMap::new(),
                pipelines: DashMap::new(),
                kombiniert,
                fabrik,
                bus,
            }),
        }
    }

    /// Loest eine Absenderadresse zu ihrem Benutzernamen auf
    ///
    /// Unbekannte Adresse: Sitzung anlegen, Pipeline fuer den Benutzernamen
    /// erstellen falls noch keine existiert. Bekannte Adresse: der zuerst
    /// gesehene Name gilt, `benutzername` wird ignoriert.
    pub fn aufloesen(&self, endpunkt: SocketAddr, benutzername: &str) -> Aufloesung {
        match self.inner.sitzungen.entry(endpunkt) {
            Entry::Occupied(mut eintrag) => {
                let sitzung = eintrag.get_mut();
                sitzung.paket_empfangen();
                if sitzung.benutzername != benutzername {
                    tracing::trace!(
                        endpunkt = %endpunkt,
                        benutzer = %sitzung.benutzername,
                        behauptet = %benutzername,
                        "Abweichender Benutzername ignoriert"
                    );
                }
                Aufloesung {
                    benutzername: sitzung.benutzername.clone(),
                    neu: false,
                }
            }
            Entry::Vacant(eintrag) => {
                eintrag.insert(Sitzung::neu(endpunkt, benutzername.to_owned()));
                self.pipeline_sicherstellen(benutzername);

                tracing::info!(
                    endpunkt = %endpunkt,
                    benutzer = %benutzername,
                    "Neue Sitzung"
                );
                self.inner.bus.senden(RelayEreignis::SitzungErstellt {
                    endpunkt,
                    benutzername: benutzername.to_owned(),
                });

                Aufloesung {
                    benutzername: benutzername.to_owned(),
                    neu: true,
                }
            }
        }
    }

    /// Erstellt die Pipeline eines Benutzers, falls noch keine existiert
    fn pipeline_sicherstellen(&self, benutzername: &str) {
        if self.inner.pipelines.contains_key(benutzername) {
            return;
        }
        self.inner
            .pipelines
            .entry(benutzername.to_owned())
            .or_insert_with(|| {
                let ziel = AufnahmeZiel::benutzer(benutzername);
                match self.inner.fabrik.erstellen(&ziel) {
                    Ok(senke) => Some(senke),
                    Err(e) => {
                        tracing::error!(
                            benutzer = %benutzername,
                            fehler = %e,
                            "Benutzer-Aufnahme konnte nicht gestartet werden"
                        );
                        self.inner
                            .bus
                            .senden(RelayEreignis::pipeline_fehler(ziel, &e));
                        None
                    }
                }
            });
    }

    /// Pipeline eines Benutzers (None wenn unbekannt oder Start fehlgeschlagen)
    pub fn pipeline(&self, benutzername: &str) -> Option<Arc<dyn AufnahmeSenke>> {
        self.inner
            .pipelines
            .get(benutzername)
            .and_then(|eintrag| eintrag.value().clone())
    }

    /// Die gemeinsame kombinierte Aufnahme
    pub fn kombiniert(&self) -> Option<&Arc<dyn AufnahmeSenke>> {
        self.inner.kombiniert.as_ref()
    }

    /// Benutzername einer Adresse
    pub fn benutzername(&self, endpunkt: &SocketAddr) -> Option<String> {
        self.inner
            .sitzungen
            .get(endpunkt)
            .map(|s| s.benutzername.clone())
    }

    /// Kopie einer Sitzung
    pub fn sitzung(&self, endpunkt: &SocketAddr) -> Option<Sitzung> {
        self.inner.sitzungen.get(endpunkt).map(|s| s.clone())
    }

    /// Ruft `f` fuer jede bekannte Adresse ausser `absender` auf
    ///
    /// Hot Path: keine Allokation. `f` darf das Register nicht veraendern.
    pub fn fuer_alle_ausser<F>(&self, absender: &SocketAddr, mut f: F)
    where
        F: FnMut(SocketAddr),
    {
        for eintrag in self.inner.sitzungen.iter() {
            if eintrag.key() != absender {
                f(*eintrag.key());
            }
        }
    }

    /// Entfernt Sitzungen ohne Paket seit `timeout`
    ///
    /// Pipelines bleiben erhalten. Gibt die entfernten Sitzungen zurueck.
    pub fn inaktive_bereinigen(&self, timeout: Duration) -> Vec<Sitzung> {
        let inaktive: Vec<SocketAddr> = self
            .inner
            .sitzungen
            .iter()
            .filter(|e| e.ist_inaktiv(timeout))
            .map(|e| *e.key())
            .collect();

        let mut entfernt = Vec::with_capacity(inaktive.len());
        for endpunkt in inaktive {
            // Zwischen Auswahl und Entfernen kann ein Paket eingetroffen sein
            let Some((_, sitzung)) = self
                .inner
                .sitzungen
                .remove_if(&endpunkt, |_, s| s.ist_inaktiv(timeout))
            else {
                continue;
            };

            tracing::info!(
                endpunkt = %endpunkt,
                benutzer = %sitzung.benutzername,
                pakete = sitzung.pakete,
                "Inaktive Sitzung entfernt (Timeout)"
            );
            self.inner.bus.senden(RelayEreignis::SitzungEntfernt {
                endpunkt,
                benutzername: sitzung.benutzername.clone(),
            });
            entfernt.push(sitzung);
        }
        entfernt
    }

    /// Anzahl bekannter Sitzungen
    pub fn sitzungs_anzahl(&self) -> usize {
        self.inner.sitzungen.len()
    }

    /// Anzahl der Benutzer-Pipelines (inkl. fehlgeschlagener)
    pub fn pipeline_anzahl(&self) -> usize {
        self.inner.pipelines.len()
    }

    /// Anzahl lebendiger Pipelines inkl. der kombinierten
    pub fn aktive_pipelines(&self) -> usize {
        let benutzer = self
            .inner
            .pipelines
            .iter()
            .filter(|e| e.value().as_ref().is_some_and(|p| p.ist_aktiv()))
            .count();
        let kombiniert = usize::from(self.kombinierte_aufnahme_aktiv());
        benutzer + kombiniert
    }

    /// Lebt die kombinierte Aufnahme noch?
    pub fn kombinierte_aufnahme_aktiv(&self) -> bool {
        self.inner
            .kombiniert
            .as_ref()
            .is_some_and(|p| p.ist_aktiv())
    }

    /// Summe der verworfenen Audio-Chunks ueber alle Pipelines
    pub fn verworfene_chunks(&self) -> u64 {
        let benutzer: u64 = self
            .inner
            .pipelines
            .iter()
            .filter_map(|e| e.value().as_ref().map(|p| p.verworfene_chunks()))
            .sum();
        benutzer
            + self
                .inner
                .kombiniert
                .as_ref()
                .map_or(0, |p| p.verworfene_chunks())
    }

    /// Gibt alle Pipelines frei (parallel) und wartet auf deren Abschluss
    pub async fn pipelines_beenden(&self) {
        let mut alle: Vec<Arc<dyn AufnahmeSenke>> = self
            .inner
            .pipelines
            .iter()
            .filter_map(|e| e.value().clone())
            .collect();
        alle.extend(self.inner.kombiniert.iter().cloned());

        tracing::info!(anzahl = alle.len(), "Aufnahmen werden beendet");

        let mut tasks = tokio::task::JoinSet::new();
        for pipeline in alle {
            tasks.spawn(async move {
                pipeline.beenden().await;
            });
        }
        while let Some(ergebnis) = tasks.join_next().await {
            if let Err(e) = ergebnis {
                tracing::error!(fehler = %e, "Beenden einer Aufnahme fehlgeschlagen");
            }
        }

        tracing::info!("Alle Aufnahmen beendet");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
