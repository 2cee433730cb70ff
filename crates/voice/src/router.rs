//! Relay-Engine – Verarbeitung eines einzelnen Datagramms
//!
//! Die `RelayEngine` orchestriert den Hot Path pro Paket:
//!
//! ```text
//! AudioFrame::decode()            <- ungueltig: verwerfen, sonst nichts
//!     |
//!     v
//! SitzungsRegister::aufloesen()   <- Sitzung/Pipeline bei Erstkontakt
//!     |
//!     +--> kombinierte Aufnahme.einspeisen(audio)
//!     +--> Benutzer-Aufnahme.einspeisen(audio)
//!     |
//!     v
//! PaketVersand::senden()          <- Original-Datagramm an alle anderen
//! ```
//!
//! ## Design-Entscheidungen
//! - Kein direktes UDP-Schreiben in der Engine: der Versand ist ein Trait, die
//!   UDP-Implementierung legt Pakete in Send-Queues pro Empfaenger
//! - Weitergeleitet wird das unveraenderte Datagramm (`Bytes`, ohne Kopie)
//! - Fehler beim Einspeisen oder bei einem Empfaenger brechen den Rest nie ab

use crate::state::SitzungsRegister;
use crate::statistik::RelayStatistik;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use voxrelay_core::Result;
use voxrelay_protocol::AudioFrame;

// ---------------------------------------------------------------------------
// Versand-Schnittstelle
// ---------------------------------------------------------------------------

/// Versendet Datagramme an Teilnehmer
///
/// `senden` darf nicht blockieren: Implementierungen legen das Paket in eine
/// Queue und melden einen Fehler, wenn das nicht moeglich ist.
pub trait PaketVersand: Send + Sync {
    /// Reiht ein Datagramm fuer `ziel` ein
    ///
    /// # Fehler
    /// - `Versand` wenn das Paket nicht eingereiht werden konnte
    fn senden(&self, ziel: SocketAddr, daten: Bytes) -> Result<()>;

    /// Gibt Ressourcen fuer ein entferntes Ziel frei
    fn entfernen(&self, _ziel: &SocketAddr) {}
}

// ---------------------------------------------------------------------------
// Ergebnis
// ---------------------------------------------------------------------------

/// Ergebnis der Verarbeitung eines gueltigen Datagramms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weiterleitung {
    /// Massgeblicher Benutzername des Absenders
    pub benutzername: String,
    /// Erstes Paket dieser Adresse?
    pub neue_sitzung: bool,
    /// Erfolgreich eingereihte Empfaenger
    pub empfaenger: usize,
    /// Empfaenger mit Sendefehler
    pub fehlgeschlagen: usize,
}

// ---------------------------------------------------------------------------
// RelayEngine
// ---------------------------------------------------------------------------

/// Zentrale Relay-Engine
///
/// Thread-safe und `Clone`-faehig.
#[derive(Clone)]
pub struct RelayEngine {
    register: SitzungsRegister,
    versand: Arc<dyn PaketVersand>,
    statistik: Arc<RelayStatistik>,
}

impl RelayEngine {
    pub fn neu(
        register: SitzungsRegister,
        versand: Arc<dyn PaketVersand>,
        statistik: Arc<RelayStatistik>,
    ) -> Self {
        Self {
            register,
            versand,
            statistik,
        }
    }

    /// Verarbeitet ein eingehendes Datagramm
    ///
    /// # Fehler
    /// - `UngueltigerFrame` wenn das Datagramm zu kurz ist; es wurde dann
    ///   nichts veraendert, eingespeist oder gesendet
    pub fn paket_verarbeiten(&self, daten: Bytes, absender: SocketAddr) -> Result<Weiterleitung> {
        self.statistik.paket_empfangen();

        // 1. Dekodieren
        let frame = match AudioFrame::decode(daten) {
            Ok(f) => f,
            Err(e) => {
                self.statistik.paket_ungueltig();
                tracing::debug!(fehler = %e, absender = %absender, "Ungueltiges Datagramm verworfen");
                return Err(e);
            }
        };

        // 2. Sitzung aufloesen
        let aufloesung = self.register.aufloesen(absender, frame.benutzername());
        if aufloesung.neu {
            self.statistik.sitzung_erstellt();
        }

        // 3. + 4. Aufnahmen
        if let Some(kombiniert) = self.register.kombiniert() {
            kombiniert.einspeisen(frame.audio().clone());
        }
        if let Some(pipeline) = self.register.pipeline(&aufloesung.benutzername) {
            if pipeline.ist_aktiv() {
                pipeline.einspeisen(frame.audio().clone());
            }
        }

        // 5. Fan-out des Original-Datagramms
        let mut empfaenger = 0usize;
        let mut fehlgeschlagen = 0usize;
        self.register.fuer_alle_ausser(&absender, |ziel| {
            match self.versand.senden(ziel, frame.roh().clone()) {
                Ok(()) => empfaenger += 1,
                Err(e) => {
                    fehlgeschlagen += 1;
                    self.statistik.sendefehler();
                    tracing::debug!(fehler = %e, "Weiterleitung fehlgeschlagen");
                }
            }
        });
        self.statistik.weitergeleitet(empfaenger as u64);

        tracing::trace!(
            absender = %absender,
            benutzer = %aufloesung.benutzername,
            bytes = frame.groesse(),
            empfaenger,
            fehlgeschlagen,
            "Datagramm weitergeleitet"
        );

        Ok(Weiterleitung {
            benutzername: aufloesung.benutzername,
            neue_sitzung: aufloesung.neu,
            empfaenger,
            fehlgeschlagen,
        })
    }

    /// Entfernt inaktive Sitzungen und deren Send-Queues
    ///
    /// Gibt die Anzahl entfernter Sitzungen zurueck.
    pub fn inaktive_bereinigen(&self, timeout: Duration) -> usize {
        let entfernt = self.register.inaktive_bereinigen(timeout);
        for sitzung in &entfernt {
            self.versand.entfernen(&sitzung.endpunkt);
        }
        entfernt.len()
    }

    pub fn register(&self) -> &SitzungsRegister {
        &self.register
    }

    pub fn statistik(&self) -> &Arc<RelayStatistik> {
        &self.statistik
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
