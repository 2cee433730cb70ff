//! Fehlertypen fuer voxrelay
//!
//! Zentraler Fehler-Enum mit der Fehler-Taxonomie des Relays. Keiner dieser
//! Fehler beendet den laufenden Server: ungueltige Frames werden verworfen,
//! Pipeline-Fehler betreffen nur die jeweilige Aufnahme, Sendefehler nur den
//! jeweiligen Empfaenger und Dateisystemfehler nur die jeweilige Datei.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Globaler Result-Alias fuer voxrelay
pub type Result<T> = std::result::Result<T, RelayFehler>;

/// Alle moeglichen Fehler im voxrelay-System
#[derive(Debug, Error)]
pub enum RelayFehler {
    // --- Protokoll ---
    #[error("Ungueltiger Frame: {laenge} Bytes (Minimum 2)")]
    UngueltigerFrame { laenge: usize },

    // --- Aufnahme ---
    #[error("Encoder fuer '{ziel}' konnte nicht gestartet werden: {grund}")]
    PipelineStart { ziel: String, grund: String },

    #[error("Encoder fuer '{ziel}' ausgefallen: {grund}")]
    PipelineLaufzeit { ziel: String, grund: String },

    // --- Transport ---
    #[error("Senden an {ziel} fehlgeschlagen: {grund}")]
    Versand { ziel: SocketAddr, grund: String },

    // --- Dateisystem ---
    #[error("Dateisystemfehler bei '{}': {quelle}", .pfad.display())]
    Dateisystem {
        pfad: PathBuf,
        #[source]
        quelle: std::io::Error,
    },

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl RelayFehler {
    /// Erstellt einen Dateisystemfehler fuer einen Pfad
    pub fn dateisystem(pfad: impl Into<PathBuf>, quelle: std::io::Error) -> Self {
        Self::Dateisystem {
            pfad: pfad.into(),
            quelle,
        }
    }

    /// Kurzer, stabiler Bezeichner der Fehlerart (z.B. fuer Metrik-Labels)
    pub fn art(&self) -> &'static str {
        match self {
            Self::UngueltigerFrame { .. } => "ungueltiger_frame",
            Self::PipelineStart { .. } => "pipeline_start",
            Self::PipelineLaufzeit { .. } => "pipeline_laufzeit",
            Self::Versand { .. } => "versand",
            Self::Dateisystem { .. } => "dateisystem",
            Self::Konfiguration(_) => "konfiguration",
            Self::Io(_) => "io",
            Self::Anyhow(_) => "intern",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn fehler_anzeige() {
        let e = RelayFehler::UngueltigerFrame { laenge: 1 };
        assert_eq!(e.to_string(), "Ungueltiger Frame: 1 Bytes (Minimum 2)");
    }

    #[test]
    fn versand_fehler_enthaelt_ziel() {
        let ziel = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4000);
        let e = RelayFehler::Versand {
            ziel,
            grund: "Queue voll".into(),
        };
        assert!(e.to_string().contains("127.0.0.1:4000"));
        assert_eq!(e.art(), "versand");
    }

    #[test]
    fn fehlerarten_sind_stabil() {
        let laufzeit = RelayFehler::PipelineLaufzeit {
            ziel: "user:alice".into(),
            grund: "exit status: 1".into(),
        };
        assert_eq!(laufzeit.art(), "pipeline_laufzeit");
        assert_eq!(
            laufzeit.to_string(),
            "Encoder fuer 'user:alice' ausgefallen: exit status: 1"
        );
        assert_eq!(RelayFehler::Konfiguration("port".into()).art(), "konfiguration");
    }

    #[test]
    fn dateisystem_fehler_mit_quelle() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "verboten");
        let e = RelayFehler::dateisystem("/tmp/alt.mp3", io);
        assert!(e.to_string().contains("/tmp/alt.mp3"));
        assert!(std::error::Error::source(&e).is_some());
        assert_eq!(e.art(), "dateisystem");
    }
}
