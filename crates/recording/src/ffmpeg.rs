//! Encoder-Pipeline auf Basis eines ffmpeg-Subprozesses
//!
//! ## Architektur
//!
//! ```text
//! einspeisen(Bytes)                     (Hot Path, nicht-blockierend)
//!     |
//!     v  try_send
//! mpsc-Queue (begrenzt)  --voll-->  Chunk verworfen + gezaehlt
//!     |
//!     v
//! Schreib-Task  --write_all-->  ffmpeg stdin  -->  <ziel>.mp3
//!                                  |
//!                  stderr-Task <---+---> Warte-Task (Exit-Status)
//! ```
//!
//! Ein haengender Encoder fuellt nur seine eigene Queue; der Relay und alle
//! anderen Pipelines laufen unbeeintraechtigt weiter. Beim Beenden wird die
//! Queue geschlossen, der Schreib-Task schliesst stdin und ffmpeg finalisiert
//! die Datei. Reagiert der Prozess nicht innerhalb des Timeouts, wird er
//! abgeschossen.

use crate::dateinamen::aufnahme_pfad;
use crate::pipeline::{AufnahmeSenke, PipelineFabrik};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, watch};
use voxrelay_core::{AufnahmeZiel, DatumsTag, EreignisBus, RelayEreignis, RelayFehler, Result};

/// Wartezeit auf die letzten stderr-Zeilen nach Prozessende
const STDERR_NACHLAUF: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration der Encoder-Prozesse (global, fest ab Start)
#[derive(Debug, Clone)]
pub struct EncoderKonfiguration {
    /// Encoder-Programm (Standard: `ffmpeg` aus dem PATH)
    pub programm: PathBuf,
    /// Sample-Rate des eingehenden PCM in Hz
    pub sample_rate: u32,
    /// Kanalanzahl des eingehenden PCM
    pub kanaele: u16,
    /// Ziel-Bitrate in kbit/s
    pub bitrate_kbps: u32,
    /// Dateiendung der Ausgabedateien (bestimmt das Zielformat)
    pub dateiendung: String,
    /// Groesse der Einspeise-Queue pro Pipeline (Chunks)
    pub queue_groesse: usize,
    /// Maximale Wartezeit auf den Encoder beim Beenden
    pub beenden_timeout: Duration,
}

impl Default for EncoderKonfiguration {
    fn default() -> Self {
        Self {
            programm: PathBuf::from("ffmpeg"),
            sample_rate: 8000,
            kanaele: 1,
            bitrate_kbps: 64,
            dateiendung: "mp3".into(),
            queue_groesse: 256,
            beenden_timeout: Duration::from_secs(10),
        }
    }
}

impl EncoderKonfiguration {
    /// Kommandozeile des Encoders fuer eine Zieldatei
    ///
    /// Liest s16le-PCM von stdin und ueberschreibt eine vorhandene Zieldatei.
    pub fn argumente(&self, datei: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "s16le",
            "-ar",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(self.sample_rate.to_string().into());
        args.push("-ac".into());
        args.push(self.kanaele.to_string().into());
        args.push("-i".into());
        args.push("pipe:0".into());
        args.push("-b:a".into());
        args.push(format!("{}k", self.bitrate_kbps).into());
        args.push(datei.as_os_str().to_owned());
        args
    }
}

// ---------------------------------------------------------------------------
// Geteilter Zustand zwischen Handle und Tasks
// ---------------------------------------------------------------------------

struct PipelineZustand {
    ziel: AufnahmeZiel,
    aktiv: AtomicBool,
    letzte_meldung: Mutex<Option<String>>,
    bus: Arc<dyn EreignisBus>,
}

impl PipelineZustand {
    /// Markiert die Pipeline als tot und meldet den Fehler genau einmal
    fn fehler_melden(&self, grund: String) {
        if self.aktiv.swap(false, Ordering::AcqRel) {
            let fehler = RelayFehler::PipelineLaufzeit {
                ziel: self.ziel.to_string(),
                grund,
            };
            tracing::error!(fehler = %fehler, "Aufnahme gestoppt");
            self.bus
                .senden(RelayEreignis::pipeline_fehler(self.ziel.clone(), &fehler));
        }
    }
}

// ---------------------------------------------------------------------------
// FfmpegPipeline
// ---------------------------------------------------------------------------

/// Handle auf einen laufenden Encoder-Prozess
///
/// Besitzt den Prozess ueber drei Hintergrund-Tasks (Schreiben, stderr,
/// Warten). Wird das Handle ohne `beenden()` gedroppt, schliesst sich die
/// Queue trotzdem und der Encoder finalisiert selbststaendig.
pub struct FfmpegPipeline {
    zustand: Arc<PipelineZustand>,
    datei: PathBuf,
    tx: Mutex<Option<mpsc::Sender<Bytes>>>,
    verworfen: AtomicU64,
    beenden_timeout: Duration,
    abbruch_tx: Mutex<Option<oneshot::Sender<()>>>,
    exit_rx: watch::Receiver<Option<bool>>,
}

impl FfmpegPipeline {
    /// Startet einen Encoder-Prozess fuer `datei`
    ///
    /// Muss innerhalb einer Tokio-Runtime aufgerufen werden.
    ///
    /// # Fehler
    /// - `PipelineStart` wenn der Prozess nicht gestartet werden konnte
    pub fn starten(
        ziel: AufnahmeZiel,
        datei: PathBuf,
        config: &EncoderKonfiguration,
        bus: Arc<dyn EreignisBus>,
    ) -> Result<Self> {
        let start_fehler = |grund: String| RelayFehler::PipelineStart {
            ziel: ziel.to_string(),
            grund,
        };

        let mut child = Command::new(&config.programm)
            .args(config.argumente(&datei))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| start_fehler(format!("{}: {e}", config.programm.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| start_fehler("stdin des Encoders nicht verfuegbar".into()))?;
        let stderr = child.stderr.take();

        tracing::info!(
            ziel = %ziel,
            datei = %datei.display(),
            pid = ?child.id(),
            "Encoder gestartet"
        );
        bus.senden(RelayEreignis::PipelineGestartet {
            ziel: ziel.clone(),
            datei: datei.clone(),
        });

        let zustand = Arc::new(PipelineZustand {
            ziel,
            aktiv: AtomicBool::new(true),
            letzte_meldung: Mutex::new(None),
            bus,
        });

        let (tx, rx) = mpsc::channel::<Bytes>(config.queue_groesse.max(1));
        let (abbruch_tx, abbruch_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        tokio::spawn(schreib_task(rx, stdin, Arc::clone(&zustand)));
        let stderr_task = stderr.map(|s| tokio::spawn(stderr_task(s, Arc::clone(&zustand))));
        tokio::spawn(warte_task(
            child,
            Arc::clone(&zustand),
            stderr_task,
            abbruch_rx,
            exit_tx,
        ));

        Ok(Self {
            zustand,
            datei,
            tx: Mutex::new(Some(tx)),
            verworfen: AtomicU64::new(0),
            beenden_timeout: config.beenden_timeout,
            abbruch_tx: Mutex::new(Some(abbruch_tx)),
            exit_rx,
        })
    }

    /// Hat sich der Encoder-Prozess bereits beendet?
    pub fn ist_beendet(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }
}

#[async_trait]
impl AufnahmeSenke for FfmpegPipeline {
    fn ziel(&self) -> &AufnahmeZiel {
        &self.zustand.ziel
    }

    fn datei(&self) -> &Path {
        &self.datei
    }

    fn einspeisen(&self, audio: Bytes) {
        if audio.is_empty() || !self.zustand.aktiv.load(Ordering::Acquire) {
            return;
        }

        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            return;
        };

        match tx.try_send(audio) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                let anzahl = self.verworfen.fetch_add(1, Ordering::Relaxed) + 1;
                // Nur bei Zweierpotenzen loggen, sonst flutet ein haengender Encoder das Log
                if anzahl.is_power_of_two() {
                    tracing::warn!(
                        ziel = %self.zustand.ziel,
                        verworfen = anzahl,
                        "Encoder-Queue voll – Audio verworfen"
                    );
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.zustand.aktiv.store(false, Ordering::Release);
            }
        }
    }

    fn ist_aktiv(&self) -> bool {
        self.zustand.aktiv.load(Ordering::Acquire)
    }

    fn verworfene_chunks(&self) -> u64 {
        self.verworfen.load(Ordering::Relaxed)
    }

    async fn beenden(&self) {
        // Sender droppen -> Schreib-Task schliesst stdin -> Encoder finalisiert
        drop(self.tx.lock().take());

        let mut exit_rx = self.exit_rx.clone();
        let rechtzeitig = tokio::time::timeout(
            self.beenden_timeout,
            exit_rx.wait_for(|status| status.is_some()),
        )
        .await
        .is_ok();

        if !rechtzeitig {
            tracing::warn!(
                ziel = %self.zustand.ziel,
                timeout_s = self.beenden_timeout.as_secs(),
                "Encoder reagiert nicht, Prozess wird abgebrochen"
            );
            if let Some(abbruch) = self.abbruch_tx.lock().take() {
                let _ = abbruch.send(());
            }
            let _ = exit_rx.wait_for(|status| status.is_some()).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Hintergrund-Tasks
// ---------------------------------------------------------------------------

async fn schreib_task(
    mut rx: mpsc::Receiver<Bytes>,
    mut stdin: ChildStdin,
    zustand: Arc<PipelineZustand>,
) {
    while let Some(chunk) = rx.recv().await {
        if let Err(e) = stdin.write_all(&chunk).await {
            zustand.fehler_melden(format!("Schreiben in Encoder-Eingabe fehlgeschlagen: {e}"));
            return;
        }
    }

    // Queue geschlossen: Eingabe sauber beenden
    if let Err(e) = stdin.shutdown().await {
        tracing::debug!(ziel = %zustand.ziel, fehler = %e, "stdin des Encoders bereits geschlossen");
    }
    tracing::debug!(ziel = %zustand.ziel, "Encoder-Eingabe geschlossen");
}

async fn stderr_task(stderr: ChildStderr, zustand: Arc<PipelineZustand>) {
    let mut zeilen = BufReader::new(stderr).lines();
    while let Ok(Some(zeile)) = zeilen.next_line().await {
        if zeile.trim().is_empty() {
            continue;
        }
        tracing::debug!(ziel = %zustand.ziel, "encoder: {zeile}");
        *zustand.letzte_meldung.lock() = Some(zeile);
    }
}

async fn warte_task(
    mut child: Child,
    zustand: Arc<PipelineZustand>,
    stderr_task: Option<tokio::task::JoinHandle<()>>,
    mut abbruch_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<bool>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut abbruch_rx => {
            if let Err(e) = child.start_kill() {
                tracing::warn!(ziel = %zustand.ziel, fehler = %e, "Encoder konnte nicht abgebrochen werden");
            }
            child.wait().await
        }
    };

    if let Some(task) = stderr_task {
        let _ = tokio::time::timeout(STDERR_NACHLAUF, task).await;
    }

    let erfolgreich = matches!(&status, Ok(s) if s.success());
    if !erfolgreich {
        let status_text = match &status {
            Ok(s) => s.to_string(),
            Err(e) => e.to_string(),
        };
        let grund = match zustand.letzte_meldung.lock().take() {
            Some(meldung) => format!("{status_text}: {meldung}"),
            None => status_text,
        };
        zustand.fehler_melden(grund);
    }
    zustand.aktiv.store(false, Ordering::Release);

    tracing::info!(ziel = %zustand.ziel, erfolgreich, "Encoder beendet");
    zustand.bus.senden(RelayEreignis::PipelineBeendet {
        ziel: zustand.ziel.clone(),
        erfolgreich,
    });
    let _ = exit_tx.send(Some(erfolgreich));
}

// ---------------------------------------------------------------------------
// FfmpegFabrik
// ---------------------------------------------------------------------------

/// Erstellt ffmpeg-Pipelines im Aufnahmeverzeichnis
pub struct FfmpegFabrik {
    config: EncoderKonfiguration,
    verzeichnis: PathBuf,
    datum: DatumsTag,
    bus: Arc<dyn EreignisBus>,
}

impl FfmpegFabrik {
    /// Neue Fabrik fuer ein Aufnahmeverzeichnis und einen Tages-Stempel
    pub fn neu(
        config: EncoderKonfiguration,
        verzeichnis: impl Into<PathBuf>,
        datum: DatumsTag,
        bus: Arc<dyn EreignisBus>,
    ) -> Self {
        Self {
            config,
            verzeichnis: verzeichnis.into(),
            datum,
            bus,
        }
    }

    /// Zielpfad einer Aufnahme
    pub fn pfad_fuer(&self, ziel: &AufnahmeZiel) -> PathBuf {
        aufnahme_pfad(&self.verzeichnis, ziel, &self.datum, &self.config.dateiendung)
    }
}

impl PipelineFabrik for FfmpegFabrik {
    fn erstellen(&self, ziel: &AufnahmeZiel) -> Result<Arc<dyn AufnahmeSenke>> {
        let datei = self.pfad_fuer(ziel);
        let pipeline =
            FfmpegPipeline::starten(ziel.clone(), datei, &self.config, Arc::clone(&self.bus))?;
        Ok(Arc::new(pipeline))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use voxrelay_core::BroadcastBus;

    fn config_mit_programm(programm: &str) -> EncoderKonfiguration {
        EncoderKonfiguration {
            programm: PathBuf::from(programm),
            beenden_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    async fn warte_auf_ende(rx: &mut tokio::sync::broadcast::Receiver<RelayEreignis>) -> Vec<RelayEreignis> {
        let mut ereignisse = Vec::new();
        loop {
            let ereignis = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("Encoder muss sich beenden")
                .expect("Bus darf nicht schliessen");
            let ende = matches!(ereignis, RelayEreignis::PipelineBeendet { .. });
            ereignisse.push(ereignis);
            if ende {
                return ereignisse;
            }
        }
    }

    #[test]
    fn argumente_beschreiben_pcm_eingabe() {
        let config = EncoderKonfiguration {
            sample_rate: 16000,
            kanaele: 2,
            bitrate_kbps: 96,
            ..Default::default()
        };
        let args: Vec<String> = config
            .argumente(Path::new("/tmp/alice-01-01-2026.mp3"))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let folge = |a: &str, b: &str| args.windows(2).any(|w| w[0] == a && w[1] == b);
        assert!(folge("-f", "s16le"));
        assert!(folge("-ar", "16000"));
        assert!(folge("-ac", "2"));
        assert!(folge("-i", "pipe:0"));
        assert!(folge("-b:a", "96k"));
        assert!(args.contains(&"-y".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/alice-01-01-2026.mp3");
    }

    #[test]
    fn standard_konfiguration() {
        let config = EncoderKonfiguration::default();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.kanaele, 1);
        assert_eq!(config.bitrate_kbps, 64);
        assert_eq!(config.dateiendung, "mp3");
    }

    #[tokio::test]
    async fn unbekanntes_programm_ist_startfehler() {
        let bus = Arc::new(BroadcastBus::default());
        let ergebnis = FfmpegPipeline::starten(
            AufnahmeZiel::benutzer("alice"),
            PathBuf::from("/tmp/alice.mp3"),
            &config_mit_programm("/nicht/vorhanden/voxrelay-encoder"),
            bus,
        );
        match ergebnis {
            Err(RelayFehler::PipelineStart { ziel, .. }) => assert_eq!(ziel, "user:alice"),
            Err(e) => panic!("falscher Fehler: {e}"),
            Ok(_) => panic!("Start muss fehlschlagen"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn encoder_fehler_markiert_pipeline_tot() {
        let bus = Arc::new(BroadcastBus::neu(16));
        let mut rx = bus.abonnieren();

        // `false` ignoriert alle Argumente und endet mit Status 1
        let pipeline = FfmpegPipeline::starten(
            AufnahmeZiel::benutzer("bob"),
            PathBuf::from("/tmp/bob.mp3"),
            &config_mit_programm("false"),
            bus.clone(),
        )
        .expect("`false` muss startbar sein");

        let ereignisse = warte_auf_ende(&mut rx).await;
        assert!(matches!(ereignisse[0], RelayEreignis::PipelineGestartet { .. }));
        assert!(ereignisse.iter().any(|e| matches!(
            e,
            RelayEreignis::PipelineFehler { art, .. } if art == "pipeline_laufzeit"
        )));
        assert!(matches!(
            ereignisse.last(),
            Some(RelayEreignis::PipelineBeendet {
                erfolgreich: false,
                ..
            })
        ));

        assert!(!pipeline.ist_aktiv());
        assert!(pipeline.ist_beendet());

        // Einspeisen in eine tote Pipeline ist ein No-op
        pipeline.einspeisen(Bytes::from_static(&[1, 2, 3, 4]));
        assert_eq!(pipeline.verworfene_chunks(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn beenden_ist_idempotent() {
        let bus = Arc::new(BroadcastBus::default());
        let pipeline = FfmpegPipeline::starten(
            AufnahmeZiel::Kombiniert,
            PathBuf::from("/tmp/combined.mp3"),
            &config_mit_programm("false"),
            bus,
        )
        .unwrap();

        pipeline.beenden().await;
        pipeline.beenden().await;
        assert!(pipeline.ist_beendet());
        assert!(!pipeline.ist_aktiv());
    }

    #[cfg(unix)]
    fn encoder_skript(verzeichnis: &Path, inhalt: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let pfad = verzeichnis.join("encoder.sh");
        std::fs::write(&pfad, inhalt).unwrap();
        std::fs::set_permissions(&pfad, std::fs::Permissions::from_mode(0o755)).unwrap();
        pfad
    }

    /// Startet mit Wiederholung: ein frisch geschriebenes Skript kann
    /// kurzzeitig ETXTBSY liefern, solange ein paralleler Test forkt
    #[cfg(unix)]
    async fn skript_pipeline_starten(
        ziel: AufnahmeZiel,
        datei: PathBuf,
        config: &EncoderKonfiguration,
        bus: Arc<BroadcastBus>,
    ) -> FfmpegPipeline {
        let mut letzter_fehler = None;
        for _ in 0..20 {
            match FfmpegPipeline::starten(ziel.clone(), datei.clone(), config, bus.clone()) {
                Ok(pipeline) => return pipeline,
                Err(e) => letzter_fehler = Some(e),
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("Encoder-Skript nicht startbar: {letzter_fehler:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn volle_queue_verwirft_und_beenden_bricht_haengenden_encoder_ab() {
        let dir = tempfile::tempdir().unwrap();
        // Liest stdin nie und reagiert nicht auf dessen Schliessen
        let skript = encoder_skript(dir.path(), "#!/bin/sh\nexec sleep 30\n");
        let config = EncoderKonfiguration {
            programm: skript,
            queue_groesse: 2,
            beenden_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let bus = Arc::new(BroadcastBus::neu(64));
        let mut rx = bus.abonnieren();

        let pipeline = skript_pipeline_starten(
            AufnahmeZiel::benutzer("erin"),
            dir.path().join("erin.mp3"),
            &config,
            bus.clone(),
        )
        .await;

        // Ohne await laeuft der Schreib-Task nicht: zwei Chunks passen, der Rest faellt weg
        for _ in 0..10 {
            pipeline.einspeisen(Bytes::from(vec![0u8; 320]));
        }
        assert_eq!(pipeline.verworfene_chunks(), 8);
        assert!(pipeline.ist_aktiv());

        let start = std::time::Instant::now();
        pipeline.beenden().await;
        let dauer = start.elapsed();

        assert!(dauer >= Duration::from_millis(450), "Abbruch erst nach Timeout: {dauer:?}");
        assert!(dauer < Duration::from_secs(10), "Encoder muss abgebrochen werden: {dauer:?}");
        assert!(pipeline.ist_beendet());
        assert!(!pipeline.ist_aktiv());

        let ereignisse = warte_auf_ende(&mut rx).await;
        assert!(matches!(
            ereignisse.last(),
            Some(RelayEreignis::PipelineBeendet {
                erfolgreich: false,
                ..
            })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn beenden_schliesst_eingabe_und_encoder_finalisiert() {
        let dir = tempfile::tempdir().unwrap();
        // Letztes Argument ist die Ausgabedatei, stdin wird unveraendert kopiert
        let skript = encoder_skript(
            dir.path(),
            "#!/bin/sh\nfor a; do out=$a; done\ncat > \"$out\"\n",
        );
        let config = EncoderKonfiguration {
            programm: skript,
            beenden_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let datei = dir.path().join("frank-16-10-2026.mp3");
        let bus = Arc::new(BroadcastBus::neu(64));
        let mut rx = bus.abonnieren();

        let pipeline =
            skript_pipeline_starten(AufnahmeZiel::benutzer("frank"), datei.clone(), &config, bus.clone())
                .await;

        pipeline.einspeisen(Bytes::from_static(&[1, 2, 3, 4]));
        pipeline.einspeisen(Bytes::new());
        pipeline.einspeisen(Bytes::from_static(&[5, 6]));

        let start = std::time::Instant::now();
        pipeline.beenden().await;
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "Encoder muss nach Schliessen der Eingabe selbst enden"
        );
        assert!(pipeline.ist_beendet());
        assert_eq!(pipeline.verworfene_chunks(), 0);

        let ereignisse = warte_auf_ende(&mut rx).await;
        assert!(!ereignisse
            .iter()
            .any(|e| matches!(e, RelayEreignis::PipelineFehler { .. })));
        assert!(matches!(
            ereignisse.last(),
            Some(RelayEreignis::PipelineBeendet {
                erfolgreich: true,
                ..
            })
        ));
        assert_eq!(std::fs::read(&datei).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn fabrik_pfad_nutzt_datum_und_endung() {
        let bus = Arc::new(BroadcastBus::default());
        let fabrik = FfmpegFabrik::neu(
            EncoderKonfiguration {
                dateiendung: "ogg".into(),
                ..Default::default()
            },
            "/var/aufnahmen",
            DatumsTag::heute(),
            bus,
        );
        let pfad = fabrik.pfad_fuer(&AufnahmeZiel::benutzer("carol"));
        let name = pfad.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("carol-"));
        assert!(name.ends_with(".ogg"));
    }
}
