// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! CLI surface (spec §6), mirrored field-for-field so every flag has a
//! matching INI key and `DSD_NEO_P25_*` environment override
//! (SPEC_FULL §11).

use clap::Parser;

/// DSD-neo P25 trunking follower.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "p25-follower")]
#[command(about = "P25 trunking control-channel follower")]
#[command(version)]
pub struct CliArgs {
    /// Enable trunking follow mode.
    #[arg(short = 'T', long)]
    pub trunking: bool,

    /// Conventional scanning; disables trunking.
    #[arg(short = 'Y', long)]
    pub conventional: bool,

    /// Prefer CC candidates during hunt.
    #[arg(short = '^', long = "prefer-candidates")]
    pub prefer_candidates: bool,

    /// Enable optional retune from LCW explicit channel update.
    #[arg(short = 'j', long = "lcw-retune")]
    pub lcw_retune: bool,

    /// Minimum dwell before a VC is eligible to return to the CC.
    #[arg(long = "p25-vc-grace", value_name = "SECONDS")]
    pub vc_grace_s: Option<f64>,

    /// Minimum follow dwell, alias of `--p25-vc-grace`.
    #[arg(long = "p25-min-follow-dwell", value_name = "SECONDS")]
    pub min_follow_dwell_s: Option<f64>,

    /// Timeout waiting for voice after a grant.
    #[arg(long = "p25-grant-voice-timeout", value_name = "SECONDS")]
    pub grant_voice_timeout_s: Option<f64>,

    /// Retune backoff window after a dead grant.
    #[arg(long = "p25-retune-backoff", value_name = "SECONDS")]
    pub retune_backoff_s: Option<f64>,

    /// MAC-hold window for post-end gating.
    #[arg(long = "p25-mac-hold", value_name = "SECONDS")]
    pub mac_hold_s: Option<f64>,

    /// Ring-hold window for post-end gating.
    #[arg(long = "p25-ring-hold", value_name = "SECONDS")]
    pub ring_hold_s: Option<f64>,

    /// Grace period before a missing CC_SYNC triggers a hunt.
    #[arg(long = "p25-cc-grace", value_name = "SECONDS")]
    pub cc_grace_s: Option<f64>,

    /// Extra time added past hangtime before a hard/safety-net release.
    #[arg(long = "p25-force-release-extra", value_name = "SECONDS")]
    pub force_release_extra_s: Option<f64>,

    /// Extra margin past `extra` before a hard safety-net release.
    #[arg(long = "p25-force-release-margin", value_name = "SECONDS")]
    pub force_release_margin_s: Option<f64>,

    /// Elevated IMBE error threshold, in percent, that extends hangtime.
    #[arg(long = "p25-p1-err-hold-pct", value_name = "PCT")]
    pub p1_err_hold_pct: Option<f64>,

    /// Hangtime extension applied while the elevated-error hold is active.
    #[arg(long = "p25-p1-err-hold-sec", value_name = "SECONDS")]
    pub p1_err_hold_s: Option<f64>,

    /// Refuse to follow encrypted calls and emit lock-out events.
    #[arg(long = "enc-lockout", conflicts_with = "enc_follow")]
    pub enc_lockout: bool,

    /// Follow encrypted calls even without a loaded key.
    #[arg(long = "enc-follow", conflicts_with = "enc_lockout")]
    pub enc_follow: bool,

    /// Hangtime after voice ends before returning to the control channel.
    #[arg(short = 't', long = "hangtime", value_name = "SECONDS")]
    pub hangtime_s: Option<f64>,

    /// Hold on a single talkgroup; grants to other TGs are rejected.
    #[arg(short = 'I', long = "tg-hold", value_name = "TG")]
    pub tg_hold: Option<u32>,

    /// Treat the group list as an allow list rather than a deny list.
    #[arg(short = 'W', long = "group-list-allow")]
    pub group_list_allow_list: bool,

    /// Path to an INI configuration file.
    #[arg(long = "config", value_name = "PATH")]
    pub config_path: Option<std::path::PathBuf>,

    /// Append the call-history event log (§6 `YYYY/MM/DD HH:MM:SS <text>`
    /// format) to this file, in addition to the in-memory per-slot rings.
    #[arg(long = "event-log", value_name = "PATH")]
    pub event_log_path: Option<std::path::PathBuf>,

    /// Repeatable verbosity flag.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Resolve and print the effective configuration as INI, then exit.
    #[arg(long = "print-config")]
    pub print_config: bool,
}
