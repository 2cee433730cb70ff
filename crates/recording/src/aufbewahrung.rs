//! Aufbewahrung – periodisches Loeschen alter Aufnahmen
//!
//! Ein Durchlauf prueft alle regulaeren Dateien direkt im Aufnahmeverzeichnis
//! und loescht jene, deren Aenderungszeitpunkt aelter als das Aufbewahrungs-
//! fenster ist. Unterverzeichnisse werden nicht betreten. Fehler bei einer
//! einzelnen Datei brechen den Durchlauf nicht ab.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use voxrelay_core::{EreignisBus, RelayEreignis, RelayFehler, Result};

/// Ergebnis eines Aufraeum-Durchlaufs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AufraeumBericht {
    /// Anzahl gepruefter Dateien
    pub geprueft: usize,
    /// Geloeschte Dateien
    pub geloescht: Vec<PathBuf>,
    /// Dateien, die nicht geprueft oder geloescht werden konnten
    pub fehler: usize,
}

/// Loescht alle Dateien in `verzeichnis`, die aelter als `max_alter` sind
///
/// Das Alter wird relativ zu `jetzt` berechnet. Dateien mit einem
/// Aenderungszeitpunkt in der Zukunft gelten als neu.
///
/// # Fehler
/// - `Dateisystem` wenn das Verzeichnis nicht gelesen werden kann
pub async fn alte_dateien_loeschen(
    verzeichnis: &Path,
    max_alter: Duration,
    jetzt: SystemTime,
) -> Result<AufraeumBericht> {
    let mut eintraege = tokio::fs::read_dir(verzeichnis)
        .await
        .map_err(|e| RelayFehler::dateisystem(verzeichnis, e))?;

    let mut bericht = AufraeumBericht::default();

    loop {
        let eintrag = match eintraege.next_entry().await {
            Ok(Some(eintrag)) => eintrag,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(verzeichnis = %verzeichnis.display(), fehler = %e, "Verzeichniseintrag nicht lesbar");
                bericht.fehler += 1;
                continue;
            }
        };
        let pfad = eintrag.path();

        let metadaten = match eintrag.metadata().await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(datei = %pfad.display(), fehler = %e, "Metadaten nicht lesbar");
                bericht.fehler += 1;
                continue;
            }
        };
        if !metadaten.is_file() {
            continue;
        }
        bericht.geprueft += 1;

        let geaendert = match metadaten.modified() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(datei = %pfad.display(), fehler = %e, "Aenderungszeit nicht verfuegbar");
                bericht.fehler += 1;
                continue;
            }
        };
        let alter = jetzt.duration_since(geaendert).unwrap_or(Duration::ZERO);
        if alter <= max_alter {
            continue;
        }

        match tokio::fs::remove_file(&pfad).await {
            Ok(()) => {
                tracing::info!(
                    datei = %pfad.display(),
                    alter_tage = alter.as_secs() / 86_400,
                    "Alte Aufnahme geloescht"
                );
                bericht.geloescht.push(pfad);
            }
            Err(e) => {
                tracing::warn!(datei = %pfad.display(), fehler = %e, "Loeschen fehlgeschlagen");
                bericht.fehler += 1;
            }
        }
    }

    Ok(bericht)
}

/// Periodischer Aufraeum-Task fuer das Aufnahmeverzeichnis
pub struct Aufbewahrung {
    verzeichnis: PathBuf,
    max_alter: Duration,
    intervall: Duration,
    bus: Arc<dyn EreignisBus>,
}

impl Aufbewahrung {
    /// Erstellt einen Aufraeumer fuer `verzeichnis`
    ///
    /// `max_alter_tage` Tage Aufbewahrung, ein Durchlauf alle `intervall`.
    pub fn neu(
        verzeichnis: impl Into<PathBuf>,
        max_alter_tage: u64,
        intervall: Duration,
        bus: Arc<dyn EreignisBus>,
    ) -> Self {
        Self {
            verzeichnis: verzeichnis.into(),
            max_alter: Duration::from_secs(max_alter_tage.saturating_mul(86_400)),
            intervall,
            bus,
        }
    }

    /// Fuehrt einen einzelnen Durchlauf aus und meldet das Ergebnis auf dem Bus
    pub async fn durchlauf(&self) -> Result<AufraeumBericht> {
        let bericht =
            alte_dateien_loeschen(&self.verzeichnis, self.max_alter, SystemTime::now()).await?;

        tracing::info!(
            verzeichnis = %self.verzeichnis.display(),
            geprueft = bericht.geprueft,
            geloescht = bericht.geloescht.len(),
            fehler = bericht.fehler,
            "Aufraeum-Durchlauf abgeschlossen"
        );
        self.bus.senden(RelayEreignis::AufraeumenAbgeschlossen {
            geloescht: bericht.geloescht.len(),
            fehler: bericht.fehler,
        });
        Ok(bericht)
    }

    /// Startet den Task: ein Durchlauf sofort, danach alle `intervall`
    ///
    /// Laeuft bis `shutdown_rx` auf `true` wechselt oder der Sender gedroppt wird.
    pub fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut takt = tokio::time::interval(self.intervall);
            takt.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tracing::info!(
                verzeichnis = %self.verzeichnis.display(),
                max_alter_tage = self.max_alter.as_secs() / 86_400,
                intervall_s = self.intervall.as_secs(),
                "Aufbewahrung gestartet"
            );

            loop {
                tokio::select! {
                    _ = takt.tick() => {
                        if let Err(e) = self.durchlauf().await {
                            tracing::error!(fehler = %e, "Aufraeum-Durchlauf fehlgeschlagen");
                        }
                    }
                    ergebnis = shutdown_rx.changed() => {
                        if ergebnis.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Aufbewahrung beendet");
        })
    }
}
