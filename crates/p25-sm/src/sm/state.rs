// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! State machine value types (spec §3).

/// SM state (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmState {
    Idle,
    OnCc,
    Tuned,
    Hunting,
}

/// Currently-tuned voice channel, valid only in `SmState::Tuned`.
#[derive(Debug, Clone, PartialEq)]
pub struct VcInfo {
    pub freq_hz: u64,
    pub channel: u16,
    pub tg: Option<u32>,
    pub src: Option<u32>,
    pub is_tdma: bool,
    /// The slot the originating grant targeted; used to key the retune
    /// backoff window (spec §4.4 "Retune backoff guard").
    pub slot_hint: u8,
}

/// Per-logical-slot state (spec §3 `slots[2]`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotState {
    pub voice_active: bool,
    pub allow_audio: bool,
    pub last_active_m: f64,
    pub enc_pending: bool,
    pub enc_pending_tg: Option<u32>,
    pub enc_confirmed: bool,
    pub algid: u8,
    pub keyid: u16,
    pub tg: Option<u32>,
    /// Last time this slot saw a MAC PDU after voice END, for the
    /// end-ptt-drain tail and the post-hang watchdog (§4.4).
    pub last_mac_after_end_m: f64,
    /// Timestamp voice last transitioned to inactive on this slot, for
    /// the end-ptt-drain tail.
    pub last_end_m: f64,
    /// Whether the slot's jitter/audio ring still has queued samples.
    pub ring_has_samples: bool,
}

/// Retune backoff window (spec §3, §4.4 "Retune backoff guard").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetuneBlock {
    pub block_until_m: f64,
    pub block_freq: u64,
    pub block_slot: u8,
}

/// Observability counters (spec §3).
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub tunes: u64,
    pub releases: u64,
    pub cc_returns: u64,
    pub grants: u64,
}
