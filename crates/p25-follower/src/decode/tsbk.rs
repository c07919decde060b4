// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Trunking Signaling Block (TSBK) field decoding, Phase 1 control
//! channel (spec §2 "[LCW/TSBK/MAC decoders]").
//!
//! A TSBK is a fixed 12-byte block: one opcode byte (top bit is the
//! last-block flag), one manufacturer ID byte, 80 bits of payload, and a
//! 16-bit CRC the demod layer has already checked. Only the opcode and
//! payload reach this decoder.

/// One decoded TSBK, or the opaque catch-all for anything this decoder
/// doesn't know -- including every non-standard MFID, which per spec §9
/// design notes is carried as data rather than dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Tsbk {
    GroupVoiceGrant {
        channel: u16,
        tg: u32,
        src: u32,
        svc_bits: u8,
    },
    GroupVoiceGrantUpdate {
        channel: u16,
        tg: u32,
    },
    UnitVoiceGrant {
        channel: u16,
        dest: u32,
        src: u32,
        svc_bits: u8,
    },
    CallTermination {
        tg: u32,
    },
    IdenUp {
        iden: u8,
        is_tdma: bool,
        base_freq_5khz: u32,
        channel_spacing_hz: u32,
        tx_offset_hz: i32,
    },
    AdjacentStatus {
        freq_hz: u64,
    },
    RfssStatus {
        wacn: u32,
        sysid: u16,
        rfss: u8,
        site: u8,
    },
    NetworkStatus {
        wacn: u32,
        sysid: u16,
    },
    Unknown {
        mfid: u8,
        opcode: u8,
        payload: [u8; 10],
    },
}

fn be16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn be24(b: &[u8]) -> u32 {
    u32::from_be_bytes([0, b[0], b[1], b[2]])
}

/// TSBK opcodes this decoder recognizes. Standard (MFID 0x00) opcodes
/// only; anything else -- including every vendor MFID -- falls through
/// to [`Tsbk::Unknown`].
mod opcode {
    pub const GROUP_VOICE_GRANT: u8 = 0x00;
    pub const GROUP_VOICE_GRANT_UPDATE: u8 = 0x02;
    pub const UNIT_VOICE_GRANT: u8 = 0x04;
    pub const CALL_TERMINATION: u8 = 0x0f;
    pub const IDEN_UP_VU: u8 = 0x34;
    pub const IDEN_UP: u8 = 0x3d;
    pub const NETWORK_STATUS: u8 = 0x3b;
    pub const RFSS_STATUS: u8 = 0x3a;
    pub const ADJACENT_STATUS: u8 = 0x3c;
}

const STANDARD_MFID: u8 = 0x00;

/// Decode a 10-byte TSBK payload given its opcode and manufacturer ID
/// (the last-block flag in bit 7 of the opcode byte has already been
/// stripped by the caller).
pub fn decode(opcode: u8, mfid: u8, payload: &[u8; 10]) -> Tsbk {
    if mfid != STANDARD_MFID {
        return Tsbk::Unknown {
            mfid,
            opcode,
            payload: *payload,
        };
    }

    match opcode {
        self::opcode::GROUP_VOICE_GRANT => Tsbk::GroupVoiceGrant {
            // service opts(1), channel(2), tg(2), src(3)
            svc_bits: payload[0],
            channel: be16(&payload[1..3]),
            tg: be16(&payload[3..5]) as u32,
            src: be24(&payload[5..8]),
        },
        self::opcode::GROUP_VOICE_GRANT_UPDATE => Tsbk::GroupVoiceGrantUpdate {
            channel: be16(&payload[0..2]),
            tg: be16(&payload[2..4]) as u32,
        },
        self::opcode::UNIT_VOICE_GRANT => Tsbk::UnitVoiceGrant {
            svc_bits: payload[0],
            channel: be16(&payload[1..3]),
            dest: be24(&payload[3..6]),
            src: be24(&payload[6..9]) & 0x00ff_ffff,
        },
        self::opcode::CALL_TERMINATION => Tsbk::CallTermination {
            tg: be16(&payload[0..2]) as u32,
        },
        self::opcode::IDEN_UP_VU | self::opcode::IDEN_UP => {
            decode_iden_up(payload, opcode == self::opcode::IDEN_UP_VU)
        }
        self::opcode::ADJACENT_STATUS => {
            let base_5khz = be24(&payload[1..4]);
            Tsbk::AdjacentStatus {
                freq_hz: base_5khz as u64 * 5000,
            }
        }
        self::opcode::RFSS_STATUS => Tsbk::RfssStatus {
            wacn: (be24(&payload[0..3])) << 4 | (payload[3] >> 4) as u32,
            sysid: be16(&payload[3..5]) & 0x0fff,
            rfss: payload[5],
            site: payload[6],
        },
        self::opcode::NETWORK_STATUS => Tsbk::NetworkStatus {
            wacn: (be24(&payload[0..3])) << 4 | (payload[3] >> 4) as u32,
            sysid: be16(&payload[3..5]) & 0x0fff,
        },
        other => Tsbk::Unknown {
            mfid,
            opcode: other,
            payload: *payload,
        },
    }
}

/// IDEN_UP / IDEN_UP_VU share a layout: iden(4 bits) + bandwidth class,
/// transmit offset (9 bits + sign), channel spacing (10 bits), base
/// frequency (32 bits, 5 Hz steps). The TDMA variant additionally
/// repurposes two of the bandwidth-class bits as a slots-per-carrier
/// field; this decoder only needs the `is_tdma` bit out of it.
fn decode_iden_up(payload: &[u8; 10], is_tdma: bool) -> Tsbk {
    let iden = payload[0] >> 4;
    let tx_offset_sign = (payload[0] >> 3) & 0x1;
    let tx_offset_raw = (((payload[0] & 0x07) as u32) << 6) | (payload[1] >> 2) as u32;
    let spacing_raw = (((payload[1] & 0x03) as u32) << 8) | payload[2] as u32;
    let base_freq_5khz = u32::from_be_bytes([payload[3], payload[4], payload[5], payload[6]]);

    let channel_spacing_hz = spacing_raw * 125;
    let tx_offset_hz = if tx_offset_sign == 1 {
        tx_offset_raw as i32 * 250_000
    } else {
        -(tx_offset_raw as i32 * 250_000)
    };

    Tsbk::IdenUp {
        iden,
        is_tdma,
        base_freq_5khz,
        channel_spacing_hz,
        tx_offset_hz,
    }
}
