// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Tuner adapter abstraction (spec §4.6).
//!
//! Concrete device control is behind the [`TunerAdapter`] trait so the SM
//! core never depends on a specific SDR, rig, or test harness (DESIGN
//! NOTES: "replace weak-symbol fallbacks ... with an adapter interface and
//! dependency injection"). Implementations must be idempotent and safe to
//! call from both the SM thread and the watchdog thread (§5).

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Transient device error (§7 "Transient device errors"). The SM logs and
/// discards these; it never propagates an adapter failure into a state
/// transition.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("device I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("device not ready: {0}")]
    NotReady(String),
}

/// Which logical slot a TDMA voice channel tune should favor, if known in
/// advance (purely advisory -- the demod loop still decodes both slots).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotHint {
    Either,
    Slot0,
    Slot1,
}

/// Abstracts the concrete front-end device (§4.6).
pub trait TunerAdapter: Send + Sync {
    /// Tune to a control channel frequency.
    fn tune_to_cc(&self, freq_hz: u64) -> Result<(), AdapterError>;

    /// Tune to a voice channel frequency.
    fn tune_to_vc(
        &self,
        freq_hz: u64,
        is_tdma: bool,
        slot_hint: SlotHint,
    ) -> Result<(), AdapterError>;

    /// Return to the last-known control channel frequency.
    fn return_to_cc(&self, freq_hz: u64) -> Result<(), AdapterError>;
}

/// No-op adapter: only updates internally-tracked state. Used for file
/// playback sources and as the base for [`MockAdapter`].
#[derive(Debug, Default)]
pub struct NoopAdapter {
    current_freq: AtomicU64,
}

impl NoopAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_freq(&self) -> u64 {
        self.current_freq.load(Ordering::Relaxed)
    }
}

impl TunerAdapter for NoopAdapter {
    fn tune_to_cc(&self, freq_hz: u64) -> Result<(), AdapterError> {
        self.current_freq.store(freq_hz, Ordering::Relaxed);
        Ok(())
    }

    fn tune_to_vc(
        &self,
        freq_hz: u64,
        _is_tdma: bool,
        _slot_hint: SlotHint,
    ) -> Result<(), AdapterError> {
        self.current_freq.store(freq_hz, Ordering::Relaxed);
        Ok(())
    }

    fn return_to_cc(&self, freq_hz: u64) -> Result<(), AdapterError> {
        self.current_freq.store(freq_hz, Ordering::Relaxed);
        Ok(())
    }
}

/// A single recorded adapter call, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    TuneToCc(u64),
    TuneToVc(u64, bool),
    ReturnToCc(u64),
}

/// Records every call for assertions (DESIGN NOTES: "tests supply a mock
/// implementing `tune_to_cc/vc`, `return_to_cc`").
#[derive(Debug, Default)]
pub struct MockAdapter {
    calls: Mutex<Vec<AdapterCall>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AdapterCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn tune_to_vc_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, AdapterCall::TuneToVc(..)))
            .count()
    }

    pub fn return_to_cc_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, AdapterCall::ReturnToCc(_)))
            .count()
    }
}

impl TunerAdapter for MockAdapter {
    fn tune_to_cc(&self, freq_hz: u64) -> Result<(), AdapterError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(AdapterCall::TuneToCc(freq_hz));
        Ok(())
    }

    fn tune_to_vc(
        &self,
        freq_hz: u64,
        is_tdma: bool,
        _slot_hint: SlotHint,
    ) -> Result<(), AdapterError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(AdapterCall::TuneToVc(freq_hz, is_tdma));
        Ok(())
    }

    fn return_to_cc(&self, freq_hz: u64) -> Result<(), AdapterError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(AdapterCall::ReturnToCc(freq_hz));
        Ok(())
    }
}

/// rigctld-style TCP adapter (§4.6, §6 wire surface).
///
/// Issues newline-terminated `M <mode> <bw>` and `F <hz>` commands over
/// TCP; responses are read and discarded except for a leading `RPRT`
/// error check. Memoizes the last frequency/mode/bandwidth sent to avoid
/// redundant round-trips, and must never be called while holding the SM
/// lock (§5 "Suspension points").
pub struct RigctlAdapter {
    stream: Mutex<TcpStream>,
    last_freq_hz: AtomicU64,
    last_mode_key: Mutex<Option<(String, u32)>>,
}

impl RigctlAdapter {
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, AdapterError> {
        let stream = TcpStream::connect(addr)
            .map_err(AdapterError::Io)?;
        stream.set_read_timeout(Some(timeout)).map_err(AdapterError::Io)?;
        stream.set_write_timeout(Some(timeout)).map_err(AdapterError::Io)?;
        Ok(Self {
            stream: Mutex::new(stream),
            last_freq_hz: AtomicU64::new(0),
            last_mode_key: Mutex::new(None),
        })
    }

    fn send_command(&self, line: &str) -> Result<String, AdapterError> {
        let mut stream = self.stream.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(stream, "{line}").map_err(AdapterError::Io)?;
        stream.flush().map_err(AdapterError::Io)?;

        let mut reader = BufReader::new(&*stream);
        let mut response = String::new();
        reader.read_line(&mut response).map_err(AdapterError::Io)?;
        if response.starts_with("RPRT") && !response.trim_end().ends_with("RPRT 0") {
            return Err(AdapterError::NotReady(response.trim().to_string()));
        }
        Ok(response)
    }

    fn set_mode(&self, mode: &str, bandwidth_hz: u32) -> Result<(), AdapterError> {
        let mut last = self.last_mode_key.lock().unwrap_or_else(|e| e.into_inner());
        if last.as_ref() == Some(&(mode.to_string(), bandwidth_hz)) {
            return Ok(());
        }
        self.send_command(&format!("M {mode} {bandwidth_hz}"))?;
        *last = Some((mode.to_string(), bandwidth_hz));
        Ok(())
    }

    fn set_freq(&self, freq_hz: u64) -> Result<(), AdapterError> {
        if self.last_freq_hz.load(Ordering::Relaxed) == freq_hz {
            debug!(freq_hz, "rigctl: frequency unchanged, skipping F command");
            return Ok(());
        }
        self.send_command(&format!("F {freq_hz}"))?;
        self.last_freq_hz.store(freq_hz, Ordering::Relaxed);
        Ok(())
    }
}

impl TunerAdapter for RigctlAdapter {
    fn tune_to_cc(&self, freq_hz: u64) -> Result<(), AdapterError> {
        self.set_mode("FM", 12500)?;
        self.set_freq(freq_hz)
    }

    fn tune_to_vc(
        &self,
        freq_hz: u64,
        _is_tdma: bool,
        _slot_hint: SlotHint,
    ) -> Result<(), AdapterError> {
        // P25 Phase 1 and Phase 2 both occupy a 12.5 kHz channel (Phase 2
        // splits it in time, not bandwidth), so rigctl's `M` command is
        // identical for either; `is_tdma`/`slot_hint` are advisory to the
        // demod side only and carry no rigctl-visible distinction.
        self.set_mode("FM", 12500)?;
        self.set_freq(freq_hz)
    }

    fn return_to_cc(&self, freq_hz: u64) -> Result<(), AdapterError> {
        self.tune_to_cc(freq_hz)
    }
}
