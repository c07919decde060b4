// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Library surface behind the `p25-follower` binary: CLI definitions,
//! configuration resolution, persistence and the watchdog thread, kept
//! importable independently of `main` for integration tests.

pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod persistence;
pub mod watchdog;

pub use cli::CliArgs;
pub use config::{resolve_sm_config, ConfigLoadError, EnvSource, IniConfig, MapEnv, ProcessEnv};
pub use error::FollowerError;
pub use watchdog::Watchdog;
