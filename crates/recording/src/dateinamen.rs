//! Dateinamen der Aufnahmen
//!
//! `combined-<datum>.<endung>` fuer die gemeinsame Aufnahme,
//! `<benutzer>-<datum>.<endung>` pro Teilnehmer. Benutzernamen kommen
//! ungeprueft aus dem Netz und werden vor der Verwendung als Dateiname
//! kodiert. Die Kodierung ist umkehrbar eindeutig: verschiedene Namen
//! ergeben immer verschiedene Dateien.

use std::fmt::Write;
use std::path::{Path, PathBuf};
use voxrelay_core::{AufnahmeZiel, DatumsTag};

/// Dateiname-Praefix der kombinierten Aufnahme
pub const KOMBINIERT_PRAEFIX: &str = "combined";

fn maskieren(ziel: &mut String, c: char) {
    let mut puffer = [0u8; 4];
    for byte in c.encode_utf8(&mut puffer).bytes() {
        // Schreiben in einen String schlaegt nie fehl
        let _ = write!(ziel, "%{byte:02X}");
    }
}

/// Kodiert einen Benutzernamen als Dateinamen-Stamm
///
/// Pfadtrenner, Steuerzeichen, unter Windows reservierte Zeichen und `%`
/// selbst werden als `%XX` (UTF-8-Bytes, hexadezimal) geschrieben, ein
/// fuehrender Punkt ebenfalls (kein `..`, keine versteckten Dateien). Ein
/// leerer Name wird zu `%`, was sonst nie allein vorkommt.
pub fn dateiname_bereinigen(name: &str) -> String {
    if name.is_empty() {
        return "%".into();
    }

    let mut kodiert = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' => maskieren(&mut kodiert, c),
            '.' if i == 0 => maskieren(&mut kodiert, c),
            c if c.is_control() => maskieren(&mut kodiert, c),
            c => kodiert.push(c),
        }
    }
    kodiert
}

/// Dateinamen-Stamm eines Benutzers
///
/// Der Stamm `combined` gehoert der kombinierten Aufnahme; ein Benutzer mit
/// diesem Namen bekommt ein maskiertes erstes Zeichen.
fn benutzer_stamm(name: &str) -> String {
    let kodiert = dateiname_bereinigen(name);
    if kodiert != KOMBINIERT_PRAEFIX {
        return kodiert;
    }
    let mut stamm = String::with_capacity(kodiert.len() + 2);
    let mut zeichen = kodiert.chars();
    if let Some(erstes) = zeichen.next() {
        maskieren(&mut stamm, erstes);
    }
    stamm.push_str(zeichen.as_str());
    stamm
}

/// Vollstaendiger Pfad der Ausgabedatei fuer ein Ziel
pub fn aufnahme_pfad(
    verzeichnis: &Path,
    ziel: &AufnahmeZiel,
    datum: &DatumsTag,
    endung: &str,
) -> PathBuf {
    let stamm = match ziel {
        AufnahmeZiel::Kombiniert => KOMBINIERT_PRAEFIX.to_string(),
        AufnahmeZiel::Benutzer(name) => benutzer_stamm(name),
    };
    verzeichnis.join(format!("{stamm}-{}.{endung}", datum.als_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tag() -> DatumsTag {
        DatumsTag::aus_datum(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    #[test]
    fn kombinierter_pfad() {
        let pfad = aufnahme_pfad(
            Path::new("./recordings"),
            &AufnahmeZiel::Kombiniert,
            &tag(),
            "mp3",
        );
        assert_eq!(pfad, Path::new("./recordings/combined-16-10-2026.mp3"));
    }

    #[test]
    fn benutzer_pfad() {
        let pfad = aufnahme_pfad(
            Path::new("/var/aufnahmen"),
            &AufnahmeZiel::benutzer("alice"),
            &tag(),
            "mp3",
        );
        assert_eq!(pfad, Path::new("/var/aufnahmen/alice-16-10-2026.mp3"));
    }

    #[test]
    fn kodierung_maskiert_pfadtrenner() {
        assert_eq!(dateiname_bereinigen("../../etc/passwd"), "%2E.%2F..%2Fetc%2Fpasswd");
        assert_eq!(dateiname_bereinigen("a\\b:c"), "a%5Cb%3Ac");
        assert_eq!(dateiname_bereinigen("zeile\nneu"), "zeile%0Aneu");
        assert_eq!(dateiname_bereinigen("100%"), "100%25");
    }

    #[test]
    fn kodierung_laesst_normale_namen_unveraendert() {
        assert_eq!(dateiname_bereinigen("Jürgen Müller"), "Jürgen Müller");
        assert_eq!(dateiname_bereinigen("bob_42"), "bob_42");
        assert_eq!(dateiname_bereinigen("v1.2"), "v1.2");
    }

    #[test]
    fn kodierung_leerer_name() {
        assert_eq!(dateiname_bereinigen(""), "%");
    }

    #[test]
    fn verschiedene_namen_ergeben_verschiedene_dateien() {
        let verzeichnis = Path::new("/r");
        let pfad = |name: &str| aufnahme_pfad(verzeichnis, &AufnahmeZiel::benutzer(name), &tag(), "mp3");

        assert_ne!(pfad("a/b"), pfad("a_b"));
        assert_ne!(pfad("a/b"), pfad("a%2Fb"));
        assert_ne!(pfad(""), pfad("_"));
        assert_ne!(pfad(".x"), pfad("%2Ex"));
        assert_eq!(pfad("a_b"), Path::new("/r/a_b-16-10-2026.mp3"));
    }

    #[test]
    fn benutzer_combined_bekommt_eigene_datei() {
        let verzeichnis = Path::new("/r");
        let kombiniert = aufnahme_pfad(verzeichnis, &AufnahmeZiel::Kombiniert, &tag(), "mp3");
        let benutzer = aufnahme_pfad(verzeichnis, &AufnahmeZiel::benutzer("combined"), &tag(), "mp3");
        let maskiert = aufnahme_pfad(verzeichnis, &AufnahmeZiel::benutzer("%63ombined"), &tag(), "mp3");

        assert_eq!(kombiniert, Path::new("/r/combined-16-10-2026.mp3"));
        assert_eq!(benutzer, Path::new("/r/%63ombined-16-10-2026.mp3"));
        assert_ne!(kombiniert, benutzer);
        assert_ne!(benutzer, maskiert);
    }

    #[test]
    fn benutzer_pfad_bleibt_im_verzeichnis() {
        let pfad = aufnahme_pfad(
            Path::new("/var/aufnahmen"),
            &AufnahmeZiel::benutzer("../boese"),
            &tag(),
            "mp3",
        );
        assert_eq!(pfad.parent(), Some(Path::new("/var/aufnahmen")));
    }
}
