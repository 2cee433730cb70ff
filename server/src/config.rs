//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. Die Werte sind ab dem Start fest.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use voxrelay_core::RelayFehler;
use voxrelay_observability::{log_format_gueltig, log_level_gueltig};
use voxrelay_recording::EncoderKonfiguration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Aufnahme-Einstellungen (Encoder, Ausgabeverzeichnis)
    pub aufnahme: AufnahmeEinstellungen,
    /// Aufbewahrung alter Aufnahmen
    pub aufbewahrung: AufbewahrungsEinstellungen,
    /// Sitzungs-Einstellungen
    pub sitzungen: SitzungsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer UDP und den Observability-Server
    pub bind_adresse: String,
    /// Port fuer UDP (Audio-Datagramme)
    pub udp_port: u16,
    /// Groesse der Send-Queue pro Empfaenger
    pub send_queue_groesse: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            udp_port: 1098,
            send_queue_groesse: 128,
        }
    }
}

/// Aufnahme-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AufnahmeEinstellungen {
    /// Ausgabeverzeichnis (wird beim Start angelegt)
    pub verzeichnis: PathBuf,
    /// Encoder-Programm
    pub encoder: String,
    /// Ziel-Bitrate in kbit/s
    pub bitrate_kbps: u32,
    /// Sample-Rate des eingehenden PCM in Hz
    pub sample_rate: u32,
    /// Kanalanzahl des eingehenden PCM
    pub kanaele: u16,
    /// Dateiendung der Ausgabedateien
    pub dateiendung: String,
    /// Einspeise-Queue pro Pipeline (Chunks)
    pub queue_groesse: usize,
    /// Wartezeit auf den Encoder beim Beenden
    pub beenden_timeout_sekunden: u64,
}

impl Default for AufnahmeEinstellungen {
    fn default() -> Self {
        Self {
            verzeichnis: PathBuf::from("./recordings"),
            encoder: "ffmpeg".into(),
            bitrate_kbps: 64,
            sample_rate: 8000,
            kanaele: 1,
            dateiendung: "mp3".into(),
            queue_groesse: 256,
            beenden_timeout_sekunden: 10,
        }
    }
}

/// Aufbewahrung alter Aufnahmen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AufbewahrungsEinstellungen {
    /// Dateien aelter als diese Anzahl Tage werden geloescht
    pub max_alter_tage: u64,
    /// Abstand zwischen zwei Durchlaeufen in Stunden
    pub intervall_stunden: u64,
}

impl Default for AufbewahrungsEinstellungen {
    fn default() -> Self {
        Self {
            max_alter_tage: 30,
            intervall_stunden: 24,
        }
    }
}

/// Sitzungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungsEinstellungen {
    /// Sitzungen ohne Paket seit so vielen Sekunden entfernen (fehlt = nie)
    pub inaktiv_timeout_sekunden: Option<u64>,
    /// Pruef-Intervall fuer inaktive Sitzungen
    pub pruef_intervall_sekunden: u64,
}

impl Default for SitzungsEinstellungen {
    fn default() -> Self {
        Self {
            inaktiv_timeout_sekunden: None,
            pruef_intervall_sekunden: 30,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
    /// Wie oft die Relay-Zaehler in die Metriken uebernommen werden
    pub statistik_intervall_sekunden: u64,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
            statistik_intervall_sekunden: 5,
        }
    }
}

/// Herkunft einer geladenen Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigQuelle {
    /// Aus der angegebenen Datei gelesen
    Datei,
    /// Datei fehlt, Standardwerte
    Standard,
}

/// Obergrenze fuer `aufbewahrung.max_alter_tage` (100 Jahre)
pub const MAX_ALTER_TAGE_GRENZE: u64 = 36_500;

/// Obergrenze fuer `aufbewahrung.intervall_stunden` (1 Jahr)
pub const INTERVALL_STUNDEN_GRENZE: u64 = 8_760;

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    ///
    /// Loggt nichts: beim Laden ist das Logging noch nicht initialisiert,
    /// die Herkunft wird daher mit zurueckgegeben.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, ConfigQuelle)> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok((config, ConfigQuelle::Datei))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok((Self::default(), ConfigQuelle::Standard))
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft die Werte auf Plausibilitaet
    ///
    /// # Fehler
    /// - `Konfiguration` mit einer Beschreibung des ersten ungueltigen Werts
    pub fn validieren(&self) -> voxrelay_core::Result<()> {
        let fehler = |text: &str| Err(RelayFehler::Konfiguration(text.into()));

        let a = &self.aufnahme;
        if a.encoder.trim().is_empty() {
            return fehler("aufnahme.encoder darf nicht leer sein");
        }
        if a.sample_rate == 0 || a.kanaele == 0 || a.bitrate_kbps == 0 {
            return fehler("aufnahme.sample_rate, kanaele und bitrate_kbps muessen > 0 sein");
        }
        if a.queue_groesse == 0 || self.netzwerk.send_queue_groesse == 0 {
            return fehler("Queue-Groessen muessen > 0 sein");
        }
        if a.dateiendung.is_empty() || a.dateiendung.contains(&['/', '\\', '.'][..]) {
            return fehler("aufnahme.dateiendung ist ungueltig");
        }
        if self.aufbewahrung.max_alter_tage == 0 || self.aufbewahrung.intervall_stunden == 0 {
            return fehler("aufbewahrung.max_alter_tage und intervall_stunden muessen > 0 sein");
        }
        if self.aufbewahrung.max_alter_tage > MAX_ALTER_TAGE_GRENZE
            || self.aufbewahrung.intervall_stunden > INTERVALL_STUNDEN_GRENZE
        {
            return fehler("aufbewahrung.max_alter_tage oder intervall_stunden ist zu gross");
        }
        if self.sitzungen.inaktiv_timeout_sekunden == Some(0)
            || self.sitzungen.pruef_intervall_sekunden == 0
        {
            return fehler("sitzungen: Timeout und Pruef-Intervall muessen > 0 sein");
        }
        if self.observability.statistik_intervall_sekunden == 0 {
            return fehler("observability.statistik_intervall_sekunden muss > 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) || !log_format_gueltig(&self.logging.format) {
            return fehler("logging.level oder logging.format ist ungueltig");
        }
        self.udp_bind_adresse()?;
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer UDP zurueck
    pub fn udp_bind_adresse(&self) -> voxrelay_core::Result<SocketAddr> {
        self.bind_adresse(self.netzwerk.udp_port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> voxrelay_core::Result<SocketAddr> {
        self.bind_adresse(self.observability.port)
    }

    fn bind_adresse(&self, port: u16) -> voxrelay_core::Result<SocketAddr> {
        format!("{}:{}", self.netzwerk.bind_adresse, port)
            .parse()
            .map_err(|e| {
                RelayFehler::Konfiguration(format!(
                    "ungueltige bind_adresse '{}': {e}",
                    self.netzwerk.bind_adresse
                ))
            })
    }

    /// Encoder-Konfiguration fuer die Aufnahme-Pipelines
    pub fn encoder_konfiguration(&self) -> EncoderKonfiguration {
        let a = &self.aufnahme;
        EncoderKonfiguration {
            programm: PathBuf::from(&a.encoder),
            sample_rate: a.sample_rate,
            kanaele: a.kanaele,
            bitrate_kbps: a.bitrate_kbps,
            dateiendung: a.dateiendung.clone(),
            queue_groesse: a.queue_groesse,
            beenden_timeout: Duration::from_secs(a.beenden_timeout_sekunden),
        }
    }

    /// Abstand zwischen zwei Aufraeum-Durchlaeufen
    pub fn aufbewahrung_intervall(&self) -> Duration {
        Duration::from_secs(self.aufbewahrung.intervall_stunden.saturating_mul(3600))
    }

    /// Inaktivitaets-Timeout fuer Sitzungen (None = nie entfernen)
    pub fn inaktiv_timeout(&self) -> Option<Duration> {
        self.sitzungen.inaktiv_timeout_sekunden.map(Duration::from_secs)
    }
}
