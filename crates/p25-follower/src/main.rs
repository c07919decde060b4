// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! P25 trunking follower: process entry point (spec §6).
//!
//! Wires the resolved configuration, the persisted candidate/lockout
//! state, the event sink, and the watchdog thread around an
//! `SmContext`. Frame decoding and tuning hardware are intentionally
//! abstracted: this binary's job is lifecycle and plumbing, not demod
//! or SDR I/O (out of scope per spec §1 Non-goals).

use std::fs::OpenOptions;
use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use p25_follower::config::IniConfig;
use p25_follower::{resolve_sm_config, CliArgs, FollowerError, ProcessEnv, Watchdog};
use p25_sm::{EventSink, RigctlAdapter, SmContext, SystemClock, TunerAdapter};

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Open the tuner adapter named by the configured rigctl endpoint, or
/// fall back to a no-op adapter when none is configured (spec §7 "Fatal:
/// inability to open the configured input device" covers the former;
/// there is no input device to fail to open in the latter).
fn open_adapter() -> Result<Arc<dyn TunerAdapter>, FollowerError> {
    match std::env::var("DSD_NEO_P25_RIGCTL_ADDR") {
        Ok(addr) => {
            let adapter = RigctlAdapter::connect(&addr, std::time::Duration::from_secs(2))
                .map_err(|e| FollowerError::DeviceOpen(format!("rigctl {addr}: {e}")))?;
            Ok(Arc::new(adapter))
        }
        Err(_) => Ok(Arc::new(p25_sm::NoopAdapter)),
    }
}

fn run() -> Result<(), FollowerError> {
    let cli = CliArgs::parse();
    init_tracing(cli.verbose);

    let ini = match &cli.config_path {
        Some(path) => Some(IniConfig::load_from_file(path)?),
        None => None,
    };
    let cfg = resolve_sm_config(&cli, ini.as_ref(), &ProcessEnv)?;

    if cli.print_config {
        print!("{}", IniConfig::from_sm_config(&cfg).render());
        return Ok(());
    }

    info!(hangtime_s = cfg.hangtime_s, trunking = cfg.trunking_enabled, "resolved configuration");

    let events = match &cli.event_log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(FollowerError::Io)?;
            Arc::new(EventSink::with_writer(Box::new(file)))
        }
        None => Arc::new(EventSink::new()),
    };

    let adapter = open_adapter()?;
    let clock = Arc::new(SystemClock::new());

    let sm = Arc::new(Mutex::new(SmContext::new(
        cfg,
        clock,
        adapter,
        events,
        None,
    )));

    if let Some(base) = p25_follower::persistence::data_dir() {
        if let Err(e) = std::fs::create_dir_all(&base) {
            warn!(error = %e, path = %base.display(), "failed to create data directory");
        }
    } else {
        warn!("no per-user data directory available on this platform; persistence disabled");
    }

    let watchdog = Watchdog::spawn(Arc::clone(&sm));

    info!("p25-follower started; awaiting frames (demod integration is out of scope, spec §1)");
    wait_for_eof();

    watchdog.stop();
    info!("p25-follower shutdown complete");
    Ok(())
}

/// Block until stdin closes. A real demod integration would run the
/// frame-intake loop here instead and treat end-of-stream from the IQ
/// source as the shutdown signal; this binary has no frame source wired
/// in (spec §1 Non-goals), so EOF on stdin stands in for it.
fn wait_for_eof() {
    use std::io::Read;
    let mut buf = [0u8; 64];
    while let Ok(n) = std::io::stdin().read(&mut buf) {
        if n == 0 {
            break;
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("p25-follower: {e}");
        std::process::exit(e.exit_code());
    }
}
