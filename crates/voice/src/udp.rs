//! UDP Relay Server – Listener und Send-Queue pro Empfaenger
//!
//! Bindet einen UDP-Socket, empfaengt Datagramme und reicht sie an die
//! `RelayEngine` weiter.
//!
//! ## Architektur
//!
//! ```text
//! UDP Socket (recv_from)
//!     |
//!     v
//! RelayEngine::paket_verarbeiten()
//!     |
//!     v
//! UdpVersand::senden()
//!     |
//!     +--> Empfaenger-Send-Queue (mpsc) --> UDP send_to Task
//! ```
//!
//! ## Performance
//! - Empfangspuffer wird wiederverwendet, pro Datagramm genau eine Kopie in `Bytes`
//! - Weiterleitung ohne weitere Kopie (`Bytes` ist referenzgezaehlt)
//! - Separater Sende-Task pro Empfaenger (verhindert Head-of-Line-Blocking)

use crate::router::{PaketVersand, RelayEngine};
use crate::state::SitzungsRegister;
use crate::statistik::RelayStatistik;
use bytes::Bytes;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use voxrelay_core::{RelayFehler, Result};

/// Maximale UDP-Datagrammgroesse
const UDP_BUFFER_SIZE: usize = 65_536;

// ---------------------------------------------------------------------------
// RelayServer-Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration fuer den UDP Relay Server
#[derive(Debug, Clone)]
pub struct RelayServerConfig {
    /// Bind-Adresse (z.B. "0.0.0.0:1098")
    pub bind_addr: SocketAddr,
    /// Groesse des Sende-Kanalspuffers pro Empfaenger
    pub send_queue_groesse: usize,
    /// Sitzungen ohne Paket seit dieser Zeit entfernen (None = nie)
    pub inaktiv_timeout: Option<Duration>,
    /// Wie oft auf inaktive Sitzungen geprueft wird
    pub pruef_intervall: Duration,
}

impl RelayServerConfig {
    /// Erstellt eine Konfiguration mit Standard-Werten
    pub fn neu(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            send_queue_groesse: 128,
            inaktiv_timeout: None,
            pruef_intervall: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientSender – Sende-Task pro Empfaenger
// ---------------------------------------------------------------------------

/// Handle fuer den Sende-Task eines Empfaengers
///
/// Wenn dieses Handle gedroppt wird, schliesst sich die Queue und der
/// Sende-Task beendet sich nach dem letzten Paket.
pub struct ClientSenderHandle {
    /// Sende-Queue: Pakete hier einlegen -> werden via UDP versendet
    pub tx: mpsc::Sender<Bytes>,
}

impl ClientSenderHandle {
    /// Startet einen neuen Sende-Task fuer einen Empfaenger
    ///
    /// Liest aus der mpsc-Queue und sendet via UDP an `ziel_addr`.
    pub fn starten(
        socket: Arc<UdpSocket>,
        ziel_addr: SocketAddr,
        queue_groesse: usize,
        statistik: Arc<RelayStatistik>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<Bytes>(queue_groesse.max(1));

        tokio::spawn(async move {
            while let Some(daten) = rx.recv().await {
                match socket.send_to(&daten, ziel_addr).await {
                    Ok(_) => {
                        tracing::trace!(
                            bytes = daten.len(),
                            ziel = %ziel_addr,
                            "UDP-Paket gesendet"
                        );
                    }
                    Err(e) => {
                        statistik.sendefehler();
                        tracing::warn!(
                            fehler = %e,
                            ziel = %ziel_addr,
                            "UDP-Sendefehler"
                        );
                    }
                }
            }
            tracing::debug!(ziel = %ziel_addr, "Sende-Task beendet");
        });

        Self { tx }
    }
}

// ---------------------------------------------------------------------------
// UdpVersand
// ---------------------------------------------------------------------------

/// `PaketVersand` ueber einen gemeinsamen UDP-Socket
///
/// Legt pro Zieladresse beim ersten Paket einen Sende-Task an.
pub struct UdpVersand {
    socket: Arc<UdpSocket>,
    queue_groesse: usize,
    statistik: Arc<RelayStatistik>,
    sender: DashMap<SocketAddr, ClientSenderHandle>,
}

impl UdpVersand {
    pub fn neu(socket: Arc<UdpSocket>, queue_groesse: usize, statistik: Arc<RelayStatistik>) -> Self {
        Self {
            socket,
            queue_groesse,
            statistik,
            sender: DashMap::new(),
        }
    }

    /// Anzahl laufender Sende-Tasks
    pub fn sender_anzahl(&self) -> usize {
        self.sender.len()
    }
}

impl PaketVersand for UdpVersand {
    fn senden(&self, ziel: SocketAddr, daten: Bytes) -> Result<()> {
        let handle = self.sender.entry(ziel).or_insert_with(|| {
            ClientSenderHandle::starten(
                Arc::clone(&self.socket),
                ziel,
                self.queue_groesse,
                Arc::clone(&self.statistik),
            )
        });

        // Nicht-blockierend senden – bei voller Queue verwerfen (UDP-Semantik)
        handle.tx.try_send(daten).map_err(|e| {
            let grund = match e {
                mpsc::error::TrySendError::Full(_) => "Send-Queue voll",
                mpsc::error::TrySendError::Closed(_) => "Send-Queue geschlossen",
            };
            RelayFehler::Versand {
                ziel,
                grund: grund.into(),
            }
        })
    }

    fn entfernen(&self, ziel: &SocketAddr) {
        if self.sender.remove(ziel).is_some() {
            tracing::debug!(ziel = %ziel, "Send-Queue entfernt");
        }
    }
}

// ---------------------------------------------------------------------------
// RelayServer
// ---------------------------------------------------------------------------

/// UDP Relay Server
///
/// Bindet einen UDP-Socket und empfaengt Datagramme in einer Async-Loop.
/// Verarbeitet sie ueber die `RelayEngine`.
pub struct RelayServer {
    config: RelayServerConfig,
    socket: Arc<UdpSocket>,
    engine: RelayEngine,
    versand: Arc<UdpVersand>,
}

impl RelayServer {
    /// Bindet den UDP-Socket und erstellt einen neuen RelayServer
    pub async fn binden(
        config: RelayServerConfig,
        register: SitzungsRegister,
    ) -> std::io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(config.bind_addr).await?);
        tracing::info!(addr = %config.bind_addr, "UDP Relay Server gebunden");

        let statistik = Arc::new(RelayStatistik::neu());
        let versand = Arc::new(UdpVersand::neu(
            Arc::clone(&socket),
            config.send_queue_groesse,
            Arc::clone(&statistik),
        ));
        let engine = RelayEngine::neu(register, versand.clone(), statistik);

        Ok(Self {
            config,
            socket,
            engine,
            versand,
        })
    }

    /// Gibt die lokale Bind-Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn engine(&self) -> &RelayEngine {
        &self.engine
    }

    pub fn statistik(&self) -> &Arc<RelayStatistik> {
        self.engine.statistik()
    }

    /// Anzahl laufender Sende-Tasks
    pub fn sender_anzahl(&self) -> usize {
        self.versand.sender_anzahl()
    }

    /// Startet die Empfangs-Loop (laeuft bis `shutdown_rx` auf `true` wechselt)
    ///
    /// Diese Methode blockiert bis zum Shutdown-Signal.
    pub async fn empfangs_loop_starten(&self, mut shutdown_rx: watch::Receiver<bool>) {
        // Wiederverwendeter Empfangspuffer
        let mut buf = vec![0u8; UDP_BUFFER_SIZE];

        let mut pruef_takt = tokio::time::interval(self.config.pruef_intervall);
        pruef_takt.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let eviction = self.config.inaktiv_timeout;

        tracing::info!(
            inaktiv_timeout_s = eviction.map(|t| t.as_secs()),
            "Relay-Empfangs-Loop gestartet"
        );

        loop {
            tokio::select! {
                // Eingehendes UDP-Paket
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, absender_addr)) => {
                            let daten = Bytes::copy_from_slice(&buf[..len]);
                            // Fehler sind bereits geloggt und betreffen nur dieses Datagramm
                            let _ = self.engine.paket_verarbeiten(daten, absender_addr);
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "UDP-Empfangsfehler");
                            // Kurze Pause um Busy-Loop bei persistentem Fehler zu vermeiden
                            tokio::time::sleep(Duration::from_millis(1)).await;
                        }
                    }
                }

                // Inaktive Sitzungen entfernen
                _ = pruef_takt.tick(), if eviction.is_some() => {
                    if let Some(timeout) = eviction {
                        let entfernt = self.engine.inaktive_bereinigen(timeout);
                        if entfernt > 0 {
                            tracing::debug!(entfernt, "Inaktive Sitzungen bereinigt");
                        }
                    }
                }

                // Shutdown-Signal
                ergebnis = shutdown_rx.changed() => {
                    if ergebnis.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("Relay-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Relay-Empfangs-Loop beendet");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use voxrelay_core::{AufnahmeZiel, BroadcastBus};
    use voxrelay_protocol::AudioFrame;
    use voxrelay_recording::SpeicherFabrik;

    fn localhost(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    fn register(fabrik: Arc<SpeicherFabrik>) -> SitzungsRegister {
        SitzungsRegister::neu(fabrik, Arc::new(BroadcastBus::default()))
    }

    async fn empfangen(sock: &UdpSocket) -> Vec<u8> {
        let mut buf = [0u8; 2048];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), sock.recv_from(&mut buf))
            .await
            .expect("Paket muss ankommen")
            .unwrap();
        buf[..len].to_vec()
    }

    #[tokio::test]
    async fn relay_server_binden() {
        let config = RelayServerConfig::neu(localhost(0)); // Port 0 = OS waehlt
        let server = RelayServer::binden(config, register(Arc::new(SpeicherFabrik::neu())))
            .await
            .expect("Server muss binden koennen");

        let addr = server.lokale_adresse().expect("Adresse muss verfuegbar sein");
        assert_ne!(addr.port(), 0, "OS muss einen Port zuweisen");
    }

    #[tokio::test]
    async fn relay_server_paket_round_trip() {
        let fabrik = Arc::new(SpeicherFabrik::neu());
        let server = RelayServer::binden(RelayServerConfig::neu(localhost(0)), register(fabrik.clone()))
            .await
            .expect("Server muss binden koennen");
        let server_addr = server.lokale_adresse().unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = Arc::new(server);
        let server_clone = Arc::clone(&server);
        let recv_task = tokio::spawn(async move {
            server_clone.empfangs_loop_starten(shutdown_rx).await;
        });

        let alice = UdpSocket::bind(localhost(0)).await.unwrap();
        let bob = UdpSocket::bind(localhost(0)).await.unwrap();

        // Beide melden sich mit einem ersten Paket an
        alice
            .send_to(&AudioFrame::encode("alice", &[0, 0]), server_addr)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        bob.send_to(&AudioFrame::encode("bob", &[0, 0]), server_addr)
            .await
            .unwrap();

        // alice erhaelt bob's erstes Paket unveraendert
        let bei_alice = empfangen(&alice).await;
        assert_eq!(bei_alice, AudioFrame::encode("bob", &[0, 0]).to_vec());

        // alice spricht -> bob erhaelt das Original
        let daten = AudioFrame::encode("alice", &[1, 2, 3, 4]);
        alice.send_to(&daten, server_addr).await.unwrap();
        assert_eq!(empfangen(&bob).await, daten.to_vec());

        // Kein Echo an alice
        let mut buf = [0u8; 64];
        let echo = tokio::time::timeout(Duration::from_millis(100), alice.recv_from(&mut buf)).await;
        assert!(echo.is_err(), "Absender darf kein Echo empfangen");

        assert_eq!(server.engine().register().sitzungs_anzahl(), 2);
        assert_eq!(
            fabrik.senke(&AufnahmeZiel::benutzer("alice")).unwrap().inhalt(),
            vec![0, 0, 1, 2, 3, 4]
        );

        shutdown_tx.send(true).unwrap();
        recv_task.await.unwrap();
    }

    #[tokio::test]
    async fn ungueltiges_datagramm_beendet_loop_nicht() {
        let server = RelayServer::binden(
            RelayServerConfig::neu(localhost(0)),
            register(Arc::new(SpeicherFabrik::neu())),
        )
        .await
        .unwrap();
        let server_addr = server.lokale_adresse().unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = Arc::new(server);
        let server_clone = Arc::clone(&server);
        let recv_task = tokio::spawn(async move {
            server_clone.empfangs_loop_starten(shutdown_rx).await;
        });

        let client = UdpSocket::bind(localhost(0)).await.unwrap();
        client.send_to(&[42], server_addr).await.unwrap();
        client
            .send_to(&AudioFrame::encode("carol", &[1, 1]), server_addr)
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while server.engine().register().sitzungs_anzahl() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("gueltiges Paket muss nach ungueltigem verarbeitet werden");

        let statistik = server.statistik().schnappschuss();
        assert_eq!(statistik.ungueltig, 1);
        assert_eq!(statistik.empfangen, 2);

        shutdown_tx.send(true).unwrap();
        recv_task.await.unwrap();
    }

    #[tokio::test]
    async fn versand_meldet_volle_queue() {
        let socket = Arc::new(UdpSocket::bind(localhost(0)).await.unwrap());
        let versand = UdpVersand::neu(socket, 1, Arc::new(RelayStatistik::neu()));
        let ziel = localhost(9);

        // Ohne await laeuft der Sende-Task nicht: die zweite Einreihung trifft eine volle Queue
        assert!(versand.senden(ziel, Bytes::from_static(&[1, 1])).is_ok());
        let e = versand.senden(ziel, Bytes::from_static(&[2, 2])).unwrap_err();
        assert!(matches!(e, RelayFehler::Versand { .. }));
        assert_eq!(versand.sender_anzahl(), 1);

        versand.entfernen(&ziel);
        assert_eq!(versand.sender_anzahl(), 0);
    }
}
