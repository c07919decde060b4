// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Link Control Word decoding, Phase 1 voice channel (spec §2, §9 design
//! note on the explicit-retune open question).
//!
//! LCWs ride embedded in the voice frame on the channel the radio is
//! already following; unlike TSBKs they describe the call already in
//! progress rather than granting a new one; `source_id`, call
//! termination, and encryption parameters come from here.

#[derive(Debug, Clone, PartialEq)]
pub enum Lcw {
    GroupVoice { tg: u32, src: Option<u32> },
    UnitVoice { dest: u32, src: u32 },
    CallTermination { tg: u32 },
    Encryption { algid: u8, keyid: u16, tg: u32 },
    /// Format 0x44: explicit channel retune to a different site/channel.
    /// Honoring this is an explicit opt-in (`--p25-lcw-retune`, see
    /// `p25_sm::SmConfig::allow_lcw_explicit_retune`); the decoder always
    /// surfaces it, the caller decides whether to act on it.
    ExplicitRetune { channel: u16 },
    Unknown { format: u8, payload: [u8; 8] },
}

mod format {
    pub const GROUP_VOICE: u8 = 0x00;
    pub const UNIT_VOICE: u8 = 0x03;
    pub const CALL_TERMINATION: u8 = 0x2f;
    pub const ENCRYPTION: u8 = 0x24;
    pub const EXPLICIT_RETUNE: u8 = 0x44;
}

fn be16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn be24(b: &[u8]) -> u32 {
    u32::from_be_bytes([0, b[0], b[1], b[2]])
}

/// Decode an 8-byte LCW payload (the format byte has already been split
/// off by the caller).
pub fn decode(format: u8, payload: &[u8; 8]) -> Lcw {
    match format {
        self::format::GROUP_VOICE => Lcw::GroupVoice {
            tg: be16(&payload[0..2]) as u32,
            src: Some(be24(&payload[2..5])).filter(|&s| s != 0),
        },
        self::format::UNIT_VOICE => Lcw::UnitVoice {
            dest: be24(&payload[0..3]),
            src: be24(&payload[3..6]),
        },
        self::format::CALL_TERMINATION => Lcw::CallTermination {
            tg: be16(&payload[0..2]) as u32,
        },
        self::format::ENCRYPTION => Lcw::Encryption {
            algid: payload[0],
            keyid: be16(&payload[1..3]),
            tg: be16(&payload[3..5]) as u32,
        },
        self::format::EXPLICIT_RETUNE => Lcw::ExplicitRetune {
            channel: be16(&payload[0..2]),
        },
        other => Lcw::Unknown {
            format: other,
            payload: *payload,
        },
    }
}
