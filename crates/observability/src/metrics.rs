//! Prometheus-kompatible Metriken fuer voxrelay
//!
//! Registrierte Metriken:
//! - `voxrelay_sessions` – Gauge: Bekannte Sitzungen
//! - `voxrelay_pipelines_live` – Gauge: Lebendige Aufnahme-Pipelines
//! - `voxrelay_packets_received_total` – Counter: Empfangene Datagramme
//! - `voxrelay_packets_malformed_total` – Counter: Verworfene ungueltige Datagramme
//! - `voxrelay_packets_forwarded_total` – Counter: Weitergeleitete Datagramme
//! - `voxrelay_send_errors_total` – Counter: Sendefehler
//! - `voxrelay_sessions_created_total` – Counter: Neue Sitzungen
//! - `voxrelay_sessions_evicted_total` – Counter: Wegen Inaktivitaet entfernte Sitzungen
//! - `voxrelay_pipeline_errors_total{art}` – Counter: Pipeline-Fehler nach Fehlerart
//! - `voxrelay_audio_chunks_dropped_total` – Counter: Verworfene Audio-Chunks
//! - `voxrelay_files_deleted_total` – Counter: Von der Aufbewahrung geloeschte Dateien
//! - `voxrelay_sweep_errors_total` – Counter: Fehler bei der Aufbewahrung

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use voxrelay_core::RelayEreignis;

/// Zaehlerstaende des Relays zu einem Zeitpunkt (monoton steigend)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayZaehlerstand {
    pub empfangen: u64,
    pub ungueltig: u64,
    pub weitergeleitet: u64,
    pub sendefehler: u64,
    pub neue_sitzungen: u64,
    pub verworfene_chunks: u64,
}

/// Alle voxrelay-Prometheus-Metriken
#[derive(Clone)]
pub struct RelayMetriken {
    pub registry: Arc<Registry>,

    // Zustand
    pub sitzungen: IntGauge,
    pub pipelines_aktiv: IntGauge,

    // Hot Path
    pub pakete_empfangen: IntCounter,
    pub pakete_ungueltig: IntCounter,
    pub pakete_weitergeleitet: IntCounter,
    pub sendefehler: IntCounter,
    pub sitzungen_erstellt: IntCounter,
    pub sitzungen_entfernt: IntCounter,

    // Aufnahme
    /// Label `art`: `RelayFehler::art()` (`pipeline_start`, `pipeline_laufzeit`)
    pub pipeline_fehler: IntCounterVec,
    pub audio_verworfen: IntCounter,

    // Aufbewahrung
    pub dateien_geloescht: IntCounter,
    pub aufraeum_fehler: IntCounter,
}

fn zaehler(registry: &Registry, name: &str, hilfe: &str) -> Result<IntCounter> {
    let zaehler = IntCounter::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(zaehler.clone()))?;
    Ok(zaehler)
}

fn anzeige(registry: &Registry, name: &str, hilfe: &str) -> Result<IntGauge> {
    let anzeige = IntGauge::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(anzeige.clone()))?;
    Ok(anzeige)
}

/// Erhoeht einen Counter auf einen absoluten Stand (nie rueckwaerts)
fn nachziehen(zaehler: &IntCounter, stand: u64) {
    let delta = stand.saturating_sub(zaehler.get());
    if delta > 0 {
        zaehler.inc_by(delta);
    }
}

impl RelayMetriken {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();
        let r = &registry;

        let sitzungen = anzeige(r, "voxrelay_sessions", "Anzahl bekannter Sitzungen")?;
        let pipelines_aktiv = anzeige(
            r,
            "voxrelay_pipelines_live",
            "Anzahl lebendiger Aufnahme-Pipelines",
        )?;

        let pakete_empfangen = zaehler(
            r,
            "voxrelay_packets_received_total",
            "Gesamtanzahl empfangener Datagramme",
        )?;
        let pakete_ungueltig = zaehler(
            r,
            "voxrelay_packets_malformed_total",
            "Verworfene ungueltige Datagramme",
        )?;
        let pakete_weitergeleitet = zaehler(
            r,
            "voxrelay_packets_forwarded_total",
            "An Teilnehmer weitergeleitete Datagramme",
        )?;
        let sendefehler = zaehler(r, "voxrelay_send_errors_total", "Fehlgeschlagene Sendungen")?;
        let sitzungen_erstellt = zaehler(
            r,
            "voxrelay_sessions_created_total",
            "Gesamtanzahl neuer Sitzungen",
        )?;
        let sitzungen_entfernt = zaehler(
            r,
            "voxrelay_sessions_evicted_total",
            "Wegen Inaktivitaet entfernte Sitzungen",
        )?;

        let pipeline_fehler = IntCounterVec::new(
            Opts::new(
                "voxrelay_pipeline_errors_total",
                "Pipeline-Fehler (Startfehler und Ausfaelle) nach Fehlerart",
            ),
            &["art"],
        )?;
        r.register(Box::new(pipeline_fehler.clone()))?;
        let audio_verworfen = zaehler(
            r,
            "voxrelay_audio_chunks_dropped_total",
            "Wegen voller Encoder-Queue verworfene Audio-Chunks",
        )?;

        let dateien_geloescht = zaehler(
            r,
            "voxrelay_files_deleted_total",
            "Von der Aufbewahrung geloeschte Dateien",
        )?;
        let aufraeum_fehler = zaehler(
            r,
            "voxrelay_sweep_errors_total",
            "Dateien, die bei der Aufbewahrung nicht verarbeitet werden konnten",
        )?;

        Ok(Self {
            registry: Arc::new(registry),
            sitzungen,
            pipelines_aktiv,
            pakete_empfangen,
            pakete_ungueltig,
            pakete_weitergeleitet,
            sendefehler,
            sitzungen_erstellt,
            sitzungen_entfernt,
            pipeline_fehler,
            audio_verworfen,
            dateien_geloescht,
            aufraeum_fehler,
        })
    }

    /// Uebernimmt absolute Zaehlerstaende des Relays in die Counter
    pub fn zaehlerstand_uebernehmen(&self, stand: &RelayZaehlerstand) {
        nachziehen(&self.pakete_empfangen, stand.empfangen);
        nachziehen(&self.pakete_ungueltig, stand.ungueltig);
        nachziehen(&self.pakete_weitergeleitet, stand.weitergeleitet);
        nachziehen(&self.sendefehler, stand.sendefehler);
        nachziehen(&self.sitzungen_erstellt, stand.neue_sitzungen);
        nachziehen(&self.audio_verworfen, stand.verworfene_chunks);
    }

    /// Aktualisiert die Metriken anhand eines Lebenszyklus-Ereignisses
    pub fn ereignis_verarbeiten(&self, ereignis: &RelayEreignis) {
        match ereignis {
            RelayEreignis::SitzungEntfernt { .. } => self.sitzungen_entfernt.inc(),
            RelayEreignis::PipelineFehler { art, .. } => {
                self.pipeline_fehler.with_label_values(&[art.as_str()]).inc();
            }
            RelayEreignis::AufraeumenAbgeschlossen { geloescht, fehler } => {
                self.dateien_geloescht.inc_by(*geloescht as u64);
                self.aufraeum_fehler.inc_by(*fehler as u64);
            }
            RelayEreignis::SitzungErstellt { .. }
            | RelayEreignis::PipelineGestartet { .. }
            | RelayEreignis::PipelineBeendet { .. } => {}
        }
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RelayMetriken) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<RelayMetriken>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
