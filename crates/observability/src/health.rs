//! Health-Check-Endpunkt fuer voxrelay
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, Sitzungen und Aufnahme-Status

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub sessions: usize,
    pub recording_alive: bool,
}

/// Geteilter Zustand fuer den Health-Check-Handler
///
/// Wird vom Server periodisch aktualisiert.
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    aufnahme_aktiv: Arc<AtomicBool>,
    sitzungen: Arc<AtomicUsize>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            aufnahme_aktiv: Arc::new(AtomicBool::new(true)),
            sitzungen: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn aufnahme_aktiv(&self) -> bool {
        self.aufnahme_aktiv.load(Ordering::Relaxed)
    }

    /// Setzt den Status der kombinierten Aufnahme
    pub fn aufnahme_status_setzen(&self, aktiv: bool) {
        self.aufnahme_aktiv.store(aktiv, Ordering::Relaxed);
    }

    pub fn sitzungen_setzen(&self, anzahl: usize) {
        self.sitzungen.store(anzahl, Ordering::Relaxed);
    }

    /// Aktueller Gesamtstatus
    pub fn status(&self) -> HealthStatus {
        if self.aufnahme_aktiv() {
            HealthStatus::Healthy
        } else {
            // Relay laeuft weiter, nur die Aufnahme fehlt
            HealthStatus::Degraded
        }
    }

    pub fn antwort(&self) -> HealthResponse {
        HealthResponse {
            status: self.status(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            sessions: self.sitzungen.load(Ordering::Relaxed),
            recording_alive: self.aufnahme_aktiv(),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
///
/// Auch `degraded` antwortet mit 200, damit Probes den Relay nicht neu starten.
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.antwort()))
}
