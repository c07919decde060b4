// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Typed events the SM consumes, emitted one-way by per-standard parsers
//! (spec §2 flow, DESIGN NOTES "events are one-way: parsers emit, SM
//! consumes").

use crate::policy::ServiceBits;

/// A link-control/signaling event handed to `SmContext::sm_event`.
#[derive(Debug, Clone, PartialEq)]
pub enum SmEvent {
    /// Control-channel sync observed. `freq_hz` is `Some` the first time
    /// a demod/hunt loop learns the CC's own frequency.
    CcSync { freq_hz: Option<u64> },

    /// Voice-channel frame sync observed (any phase).
    VcSync { is_tdma: bool },

    /// A channel grant (group or individual). `slot` is the logical slot
    /// the grant targets (always 0 for Phase 1).
    Grant {
        channel: u16,
        tg: u32,
        src: Option<u32>,
        svc_bits: u8,
        is_individual: bool,
        is_tdma: bool,
        slot: u8,
    },

    /// Slot keyed up (push-to-talk / MAC_ACTIVE with no prior PTT).
    Ptt { slot: u8 },
    /// MAC_ACTIVE continuation on an already-keyed slot.
    Active { slot: u8 },
    /// Explicit end-of-transmission on a slot (MAC_END, P1 END-framed).
    End { slot: u8 },
    /// Slot reported idle (no voice, e.g. MAC_IDLE).
    SlotIdle { slot: u8 },
    /// Terminator Data Unit observed on a slot (Phase 1).
    Tdu { slot: u8 },

    /// Encryption parameters observed for a slot's current call.
    Enc {
        slot: u8,
        algid: u8,
        keyid: u16,
        tg: u32,
    },

    /// A neighbor control-channel frequency was announced.
    NeighborUpdate { freq_hz: u64 },

    /// Explicit, unconditional call-termination LCW (§4.4 "Release path",
    /// scenario S6).
    CallTermination,

    /// Frame sync lost entirely (demod reports no-sync).
    SyncLost,

    /// A MAC PDU was observed for the current VC (post-end activity
    /// tracking, §4.4 tail drains and post-hang watchdog).
    MacActivity { slot: u8 },

    /// IMBE/AMBE frame error percentage sample (Phase 1 elevated-error
    /// hold, §4.4).
    ImbeErrorSample { pct: f64 },

    /// Jitter/audio ring for a slot went empty (drained).
    RingDrained { slot: u8 },
}

impl SmEvent {
    pub(crate) fn svc(svc_bits: u8) -> ServiceBits {
        ServiceBits::from_raw(svc_bits)
    }
}
