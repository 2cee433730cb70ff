//! Gemeinsame Typen fuer voxrelay
//!
//! `AufnahmeZiel` benennt, wohin eine Encoding-Pipeline schreibt,
//! `DatumsTag` ist der beim Prozessstart einmalig berechnete Tages-Stempel
//! der Ausgabedateien.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ziel einer Encoding-Pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AufnahmeZiel {
    /// Gemeinsame Aufnahme aller Teilnehmer
    Kombiniert,
    /// Aufnahme eines einzelnen Benutzers (unbereinigter Benutzername)
    Benutzer(String),
}

impl AufnahmeZiel {
    /// Erstellt ein Benutzer-Ziel
    pub fn benutzer(name: impl Into<String>) -> Self {
        Self::Benutzer(name.into())
    }
}

impl std::fmt::Display for AufnahmeZiel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kombiniert => write!(f, "combined"),
            Self::Benutzer(name) => write!(f, "user:{name}"),
        }
    }
}

/// Tages-Stempel im Format `TT-MM-JJJJ`
///
/// Wird einmal beim Start berechnet und rollt um Mitternacht nicht weiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatumsTag(String);

impl DatumsTag {
    /// Tages-Stempel des aktuellen lokalen Datums
    pub fn heute() -> Self {
        Self::aus_datum(chrono::Local::now().date_naive())
    }

    /// Tages-Stempel fuer ein bestimmtes Datum
    pub fn aus_datum(datum: NaiveDate) -> Self {
        Self(datum.format("%d-%m-%Y").to_string())
    }

    /// Gibt den Stempel als String-Slice zurueck
    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatumsTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datums_tag_format() {
        let datum = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(DatumsTag::aus_datum(datum).als_str(), "07-03-2026");
    }

    #[test]
    fn datums_tag_heute_hat_zehn_zeichen() {
        let tag = DatumsTag::heute();
        assert_eq!(tag.als_str().len(), 10);
        assert_eq!(tag.als_str().matches('-').count(), 2);
    }

    #[test]
    fn ziel_anzeige() {
        assert_eq!(AufnahmeZiel::Kombiniert.to_string(), "combined");
        assert_eq!(AufnahmeZiel::benutzer("alice").to_string(), "user:alice");
    }

    #[test]
    fn ziel_ist_serde_kompatibel() {
        let ziel = AufnahmeZiel::benutzer("alice");
        let json = serde_json::to_string(&ziel).unwrap();
        let ziel2: AufnahmeZiel = serde_json::from_str(&json).unwrap();
        assert_eq!(ziel, ziel2);
    }
}
