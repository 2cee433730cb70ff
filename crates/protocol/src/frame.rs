//! Audio-Frame (UDP)
//!
//! ## Paketformat (kein serde, direkte Byte-Auswertung)
//!
//! ```text
//! Offset      Len       Beschreibung
//! ------      ---       -----------
//!  0          1         nameLen (0-255)
//!  1          nameLen   Benutzername (UTF-8)
//!  1+nameLen  N         Audio: s16le PCM, Sample-Rate/Kanaele vom Server fest
//! ```
//!
//! Es gibt keine Sequenznummer und kein Laengenfeld fuer das Audio: der Rest
//! des Datagramms ist die komplette Nutzlast. Ein `nameLen`, das ueber das
//! Datagramm hinauszeigt, ist kein Fehler: der Name wird aus dem vorhandenen
//! Rest gelesen und das Audio ist leer.

use bytes::{BufMut, Bytes, BytesMut};
use voxrelay_core::{RelayFehler, Result};

/// Minimale Datagramm-Laenge (Laengenbyte + mindestens ein weiteres Byte)
pub const MIN_FRAME_LAENGE: usize = 2;

/// Maximale Laenge des Benutzernamens in Bytes (ein Laengenbyte)
pub const MAX_NAME_LAENGE: usize = u8::MAX as usize;

/// Ein dekodierter Audio-Frame
///
/// `audio` und `roh` teilen sich denselben Puffer (zero-copy via `Bytes`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    roh: Bytes,
    benutzername: String,
    audio: Bytes,
}

impl AudioFrame {
    /// Dekodiert ein Datagramm
    ///
    /// # Fehler
    /// - `UngueltigerFrame` wenn das Datagramm kuerzer als `MIN_FRAME_LAENGE` ist
    pub fn decode(roh: Bytes) -> Result<Self> {
        if roh.len() < MIN_FRAME_LAENGE {
            return Err(RelayFehler::UngueltigerFrame { laenge: roh.len() });
        }

        let name_laenge = roh[0] as usize;
        let name_ende = (1 + name_laenge).min(roh.len());

        let benutzername = String::from_utf8_lossy(&roh[1..name_ende]).into_owned();
        let audio = roh.slice(name_ende..);

        Ok(Self {
            roh,
            benutzername,
            audio,
        })
    }

    /// Baut ein Datagramm aus Benutzername und Audio
    ///
    /// Namen ueber 255 Bytes werden an einer Zeichengrenze gekuerzt.
    pub fn encode(benutzername: &str, audio: &[u8]) -> Bytes {
        let mut ende = benutzername.len().min(MAX_NAME_LAENGE);
        while !benutzername.is_char_boundary(ende) {
            ende -= 1;
        }
        let name = &benutzername.as_bytes()[..ende];

        let mut buf = BytesMut::with_capacity(1 + name.len() + audio.len());
        buf.put_u8(name.len() as u8);
        buf.put_slice(name);
        buf.put_slice(audio);
        buf.freeze()
    }

    /// Vom Client angegebener Benutzername
    pub fn benutzername(&self) -> &str {
        &self.benutzername
    }

    /// Rohe PCM-Nutzdaten (kann leer sein)
    pub fn audio(&self) -> &Bytes {
        &self.audio
    }

    /// Das unveraenderte Original-Datagramm (fuer die Weiterleitung)
    pub fn roh(&self) -> &Bytes {
        &self.roh
    }

    /// Gesamtgroesse des Datagramms in Bytes
    pub fn groesse(&self) -> usize {
        self.roh.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn decode_normaler_frame() {
        let audio = pcm(&[0, 1000, -1000, i16::MAX]);
        let mut daten = vec![5u8];
        daten.extend_from_slice(b"alice");
        daten.extend_from_slice(&audio);

        let frame = AudioFrame::decode(Bytes::from(daten.clone())).unwrap();
        assert_eq!(frame.benutzername(), "alice");
        assert_eq!(frame.audio().as_ref(), audio.as_slice());
        assert_eq!(frame.roh().as_ref(), daten.as_slice());
        assert_eq!(frame.groesse(), 1 + 5 + 8);
    }

    #[test]
    fn decode_zu_kurz() {
        for daten in [vec![], vec![3u8]] {
            let e = AudioFrame::decode(Bytes::from(daten)).unwrap_err();
            assert!(matches!(e, RelayFehler::UngueltigerFrame { .. }));
        }
    }

    #[test]
    fn decode_minimaler_frame_ohne_audio() {
        let frame = AudioFrame::decode(Bytes::from_static(&[1, b'x'])).unwrap();
        assert_eq!(frame.benutzername(), "x");
        assert!(frame.audio().is_empty());
    }

    #[test]
    fn decode_leerer_name() {
        let frame = AudioFrame::decode(Bytes::from_static(&[0, 0x10, 0x20])).unwrap();
        assert_eq!(frame.benutzername(), "");
        assert_eq!(frame.audio().as_ref(), &[0x10, 0x20]);
    }

    #[test]
    fn decode_name_laenge_ueberlaeuft_puffer() {
        // nameLen = 200, aber nur 3 Bytes folgen
        let frame = AudioFrame::decode(Bytes::from_static(&[200, b'b', b'o', b'b'])).unwrap();
        assert_eq!(frame.benutzername(), "bob");
        assert!(frame.audio().is_empty());
    }

    #[test]
    fn decode_ungueltiges_utf8_wird_ersetzt() {
        let frame = AudioFrame::decode(Bytes::from_static(&[2, 0xFF, b'a', 1, 2])).unwrap();
        assert_eq!(frame.benutzername(), "\u{FFFD}a");
        assert_eq!(frame.audio().len(), 2);
    }

    #[test]
    fn encode_erzeugt_wire_format() {
        let daten = AudioFrame::encode("bob", &[9, 8, 7, 6]);
        assert_eq!(daten.as_ref(), &[3, b'b', b'o', b'b', 9, 8, 7, 6]);
    }

    #[test]
    fn encode_kuerzt_lange_namen_an_zeichengrenze() {
        // 128 * 'ä' = 256 Bytes -> auf 254 Bytes (127 Zeichen) gekuerzt
        let name: String = std::iter::repeat('ä').take(128).collect();
        let daten = AudioFrame::encode(&name, &[]);
        assert_eq!(daten[0] as usize, 254);

        let frame = AudioFrame::decode(daten).unwrap();
        assert_eq!(frame.benutzername().chars().count(), 127);
    }
}
