// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! ~1 Hz watchdog thread that drives `sm_tick` independently of the
//! demodulator thread (spec §5 "periodic tick"; SPEC_FULL §0).
//!
//! The demod thread delivers `SmEvent`s as frames arrive and also calls
//! `sm_tick` opportunistically, but hangtime/grant-timeout/safety-net
//! expiry must keep progressing even if no frames are arriving (e.g. the
//! signal dropped out entirely). This thread exists only for that: it
//! never touches the adapter directly and never blocks waiting for the
//! lock, so a long-running event dispatch on the demod thread simply
//! causes one tick to be skipped rather than piling up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use p25_sm::SmContext;

const TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Handle to a running watchdog thread; dropping it does not stop the
/// thread; call [`Watchdog::stop`] for a clean join.
pub struct Watchdog {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Spawn the watchdog, ticking `sm` roughly once per second via a
    /// non-blocking `try_lock` so a busy demod thread is never delayed.
    pub fn spawn(sm: Arc<Mutex<SmContext>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("p25-sm-watchdog".to_string())
            .spawn(move || {
                while !stop_thread.load(Ordering::Relaxed) {
                    if let Some(mut guard) = sm.try_lock() {
                        guard.sm_tick();
                    } else {
                        trace!("watchdog skipped tick: SM busy");
                    }
                    std::thread::sleep(TICK_INTERVAL);
                }
            })
            .expect("failed to spawn watchdog thread");
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the thread to stop and join it.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
