// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Top-level error type for the follower binary (SPEC_FULL §9).
//!
//! Everything the SM itself does is infallible (spec §7 "SM operations
//! never raise"); the errors modeled here are the process-lifecycle ones
//! named in §7: device-open failure and bad configuration at startup.

use thiserror::Error;

use crate::config::ConfigLoadError;

/// Top-level error surfaced to `main`, mapped to a nonzero exit code.
#[derive(Debug, Error)]
pub enum FollowerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("failed to open input device: {0}")]
    DeviceOpen(String),

    #[error("state machine configuration rejected: {0}")]
    Sm(#[from] p25_sm::ConfigError),
}

impl FollowerError {
    /// Exit code for this error, per spec §6 ("nonzero on fatal
    /// configuration or device open error").
    pub fn exit_code(&self) -> i32 {
        match self {
            FollowerError::Io(_) => 1,
            FollowerError::Config(_) => 2,
            FollowerError::DeviceOpen(_) => 3,
            FollowerError::Sm(_) => 2,
        }
    }
}
