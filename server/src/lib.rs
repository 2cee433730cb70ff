//! voxrelay-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use voxrelay_core::{BroadcastBus, DatumsTag, RelayEreignis};
use voxrelay_observability::{HealthState, RelayMetriken, RelayZaehlerstand};
use voxrelay_recording::{Aufbewahrung, FfmpegFabrik};
use voxrelay_voice::{RelayServer, RelayServerConfig, SitzungsRegister};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis Ctrl-C / SIGTERM
    pub async fn starten(self) -> Result<()> {
        self.starten_bis(shutdown_signal()).await
    }

    /// Startet alle Server-Subsysteme und laeuft bis `signal` eintritt
    ///
    /// Reihenfolge:
    /// 1. Ausgabeverzeichnis anlegen
    /// 2. Kombinierte Aufnahme starten, Sitzungs-Register erstellen
    /// 3. UDP-Socket binden
    /// 4. Aufbewahrung und Observability starten
    /// 5. Empfangs-Loop bis zum Signal
    /// 6. Alle Aufnahmen beenden
    pub async fn starten_bis(self, signal: impl Future<Output = ()>) -> Result<()> {
        let config = self.config;
        let udp_adresse = config.udp_bind_adresse()?;
        let verzeichnis = config.aufnahme.verzeichnis.clone();

        tracing::info!(
            udp = %udp_adresse,
            verzeichnis = %verzeichnis.display(),
            encoder = %config.aufnahme.encoder,
            sample_rate = config.aufnahme.sample_rate,
            kanaele = config.aufnahme.kanaele,
            bitrate_kbps = config.aufnahme.bitrate_kbps,
            "Server startet"
        );

        tokio::fs::create_dir_all(&verzeichnis)
            .await
            .with_context(|| {
                format!(
                    "Ausgabeverzeichnis '{}' kann nicht angelegt werden",
                    verzeichnis.display()
                )
            })?;

        let bus = Arc::new(BroadcastBus::default());
        let datum = DatumsTag::heute();
        tracing::info!(datum = %datum, "Tages-Stempel der Aufnahmen");

        let fabrik = Arc::new(FfmpegFabrik::neu(
            config.encoder_konfiguration(),
            verzeichnis.clone(),
            datum,
            bus.clone(),
        ));
        let register = SitzungsRegister::neu(fabrik, bus.clone());

        let relay_config = RelayServerConfig {
            bind_addr: udp_adresse,
            send_queue_groesse: config.netzwerk.send_queue_groesse,
            inaktiv_timeout: config.inaktiv_timeout(),
            pruef_intervall: Duration::from_secs(config.sitzungen.pruef_intervall_sekunden),
        };
        let relay = Arc::new(
            RelayServer::binden(relay_config, register.clone())
                .await
                .with_context(|| format!("UDP-Socket {udp_adresse} kann nicht gebunden werden"))?,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        // Aufbewahrung
        tasks.push(
            Aufbewahrung::neu(
                verzeichnis,
                config.aufbewahrung.max_alter_tage,
                config.aufbewahrung_intervall(),
                bus.clone(),
            )
            .starten(shutdown_rx.clone()),
        );

        // Observability
        if config.observability.aktiviert {
            let metriken = RelayMetriken::neu()?;
            let health = HealthState::neu();
            let intervall =
                Duration::from_secs(config.observability.statistik_intervall_sekunden);

            tasks.push(statistik_task_starten(
                Arc::clone(&relay),
                metriken.clone(),
                health.clone(),
                intervall,
                shutdown_rx.clone(),
            ));
            tasks.push(ereignis_task_starten(
                bus.abonnieren(),
                metriken.clone(),
                shutdown_rx.clone(),
            ));

            let http_adresse = config.observability_bind_adresse()?;
            let http_shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = voxrelay_observability::observability_server_starten(
                    http_adresse,
                    metriken,
                    health,
                    http_shutdown,
                )
                .await
                {
                    tracing::error!(fehler = %e, "Observability-Server fehlgeschlagen");
                }
            }));
        }

        // Empfangs-Loop
        let relay_loop = Arc::clone(&relay);
        let loop_shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            relay_loop.empfangs_loop_starten(loop_shutdown).await;
        }));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C / SIGTERM)...");
        signal.await;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = shutdown_tx.send(true);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(fehler = %e, "Hintergrund-Task abgebrochen");
            }
        }

        register.pipelines_beenden().await;

        let stand = relay.statistik().schnappschuss();
        tracing::info!(
            empfangen = stand.empfangen,
            weitergeleitet = stand.weitergeleitet,
            ungueltig = stand.ungueltig,
            sendefehler = stand.sendefehler,
            sitzungen = register.sitzungs_anzahl(),
            "Server beendet"
        );
        Ok(())
    }
}

/// Uebernimmt periodisch die Relay-Zaehler in Metriken und Health-Status
fn statistik_task_starten(
    relay: Arc<RelayServer>,
    metriken: RelayMetriken,
    health: HealthState,
    intervall: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut takt = tokio::time::interval(intervall);
        loop {
            tokio::select! {
                _ = takt.tick() => {
                    let register = relay.engine().register();
                    let stand = relay.statistik().schnappschuss();
                    metriken.zaehlerstand_uebernehmen(&RelayZaehlerstand {
                        empfangen: stand.empfangen,
                        ungueltig: stand.ungueltig,
                        weitergeleitet: stand.weitergeleitet,
                        sendefehler: stand.sendefehler,
                        neue_sitzungen: stand.neue_sitzungen,
                        verworfene_chunks: register.verworfene_chunks(),
                    });
                    metriken.sitzungen.set(register.sitzungs_anzahl() as i64);
                    metriken.pipelines_aktiv.set(register.aktive_pipelines() as i64);

                    health.sitzungen_setzen(register.sitzungs_anzahl());
                    health.aufnahme_status_setzen(register.kombinierte_aufnahme_aktiv());
                }
                ergebnis = shutdown_rx.changed() => {
                    if ergebnis.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

/// Leitet Lebenszyklus-Ereignisse vom Bus in die Metriken
fn ereignis_task_starten(
    mut rx: broadcast::Receiver<RelayEreignis>,
    metriken: RelayMetriken,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                ergebnis = rx.recv() => match ergebnis {
                    Ok(ereignis) => metriken.ereignis_verarbeiten(&ereignis),
                    Err(broadcast::error::RecvError::Lagged(verpasst)) => {
                        tracing::warn!(verpasst, "Ereignis-Bus: Ereignisse verpasst");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                ergebnis = shutdown_rx.changed() => {
                    if ergebnis.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

/// Wartet auf Ctrl-C oder (unter Unix) SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(fehler = %e, "SIGTERM-Handler konnte nicht installiert werden");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl-C empfangen"),
        _ = sigterm => tracing::info!("SIGTERM empfangen"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(verzeichnis: &std::path::Path) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.netzwerk.bind_adresse = "127.0.0.1".into();
        config.netzwerk.udp_port = 0;
        config.aufnahme.verzeichnis = verzeichnis.to_path_buf();
        config.aufnahme.beenden_timeout_sekunden = 2;
        config.observability.aktiviert = false;
        config
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn server_legt_verzeichnis_an_und_beendet_sauber() {
        let dir = tempfile::tempdir().unwrap();
        let ziel = dir.path().join("aufnahmen").join("heute");

        let mut config = test_config(&ziel);
        // `true` ignoriert alle Argumente, es wird nichts encodiert
        config.aufnahme.encoder = "true".into();

        let ergebnis = tokio::time::timeout(
            Duration::from_secs(10),
            Server::neu(config).starten_bis(tokio::time::sleep(Duration::from_millis(100))),
        )
        .await
        .expect("Server muss sich nach dem Signal beenden");

        ergebnis.unwrap();
        assert!(ziel.is_dir());
    }

    #[tokio::test]
    async fn nicht_anlegbares_verzeichnis_ist_startfehler() {
        let dir = tempfile::tempdir().unwrap();
        let datei = dir.path().join("blockiert");
        std::fs::write(&datei, b"x").unwrap();

        // Unterverzeichnis einer regulaeren Datei kann nicht angelegt werden
        let config = test_config(&datei.join("aufnahmen"));
        let ergebnis = Server::neu(config).starten_bis(async {}).await;
        assert!(ergebnis.is_err());
    }
}
