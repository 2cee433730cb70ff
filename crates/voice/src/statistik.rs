//! Relay-Statistik – lock-freie Zaehler des Hot Paths
//!
//! Die Zaehler werden vom Empfangs-Loop und den Sende-Tasks erhoeht und vom
//! Server periodisch in die Prometheus-Metriken uebernommen.

use std::sync::atomic::{AtomicU64, Ordering};

/// Zaehler des Relays (nur monoton steigend)
#[derive(Debug, Default)]
pub struct RelayStatistik {
    empfangen: AtomicU64,
    ungueltig: AtomicU64,
    weitergeleitet: AtomicU64,
    sendefehler: AtomicU64,
    neue_sitzungen: AtomicU64,
}

/// Momentaufnahme aller Zaehler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatistikSchnappschuss {
    pub empfangen: u64,
    pub ungueltig: u64,
    pub weitergeleitet: u64,
    pub sendefehler: u64,
    pub neue_sitzungen: u64,
}

impl RelayStatistik {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn paket_empfangen(&self) {
        self.empfangen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn paket_ungueltig(&self) {
        self.ungueltig.fetch_add(1, Ordering::Relaxed);
    }

    pub fn weitergeleitet(&self, anzahl: u64) {
        self.weitergeleitet.fetch_add(anzahl, Ordering::Relaxed);
    }

    pub fn sendefehler(&self) {
        self.sendefehler.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sitzung_erstellt(&self) {
        self.neue_sitzungen.fetch_add(1, Ordering::Relaxed);
    }

    /// Liest alle Zaehler (nicht atomar ueber alle Felder hinweg)
    pub fn schnappschuss(&self) -> StatistikSchnappschuss {
        StatistikSchnappschuss {
            empfangen: self.empfangen.load(Ordering::Relaxed),
            ungueltig: self.ungueltig.load(Ordering::Relaxed),
            weitergeleitet: self.weitergeleitet.load(Ordering::Relaxed),
            sendefehler: self.sendefehler.load(Ordering::Relaxed),
            neue_sitzungen: self.neue_sitzungen.load(Ordering::Relaxed),
        }
    }
}
