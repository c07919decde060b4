// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Bridges the raw-frame decoders (TSBK/MAC/LCW) to the state machine's
//! typed event surface (spec §2 "[LCW/TSBK/MAC decoders]"; SPEC_FULL §0
//! names this the demod-loop-facing event intake).
//!
//! Decoding and state-machine mutation are kept in separate modules
//! (`tsbk`/`mac`/`lcw` vs. the `apply_*` functions here) so the frame
//! decoders stay pure and unit-testable without an `SmContext` in hand.

pub mod lcw;
pub mod mac;
pub mod tsbk;

use p25_sm::iden::{IdenEntry, SiteProvenance, TrustLevel};
use p25_sm::{SmContext, SmEvent};

use self::lcw::Lcw;
use self::mac::MacPdu;
use self::tsbk::Tsbk;

/// ALGID value meaning "clear" (P25 standard convention); an `Enc` event
/// at this algid would be a no-op so it's filtered at the source.
const ALGID_CLEAR: u8 = 0x80;

/// Apply a decoded TSBK. Returns the `(wacn, sysid)` pair when a status
/// broadcast carries one, so the caller can key its persistence stores
/// (spec §4.2 "(wacn, sysid)"); every other variant returns `None`.
pub fn apply_tsbk(sm: &mut SmContext, on_known_cc: bool, tsbk: Tsbk) -> Option<(u32, u16)> {
    match tsbk {
        Tsbk::GroupVoiceGrant {
            channel,
            tg,
            src,
            svc_bits,
        } => {
            sm.sm_event(SmEvent::Grant {
                channel,
                tg,
                src: Some(src),
                svc_bits,
                is_individual: false,
                is_tdma: false,
                slot: 0,
            });
            None
        }
        Tsbk::GroupVoiceGrantUpdate { channel, tg } => {
            sm.sm_event(SmEvent::Grant {
                channel,
                tg,
                src: None,
                svc_bits: 0,
                is_individual: false,
                is_tdma: false,
                slot: 0,
            });
            None
        }
        Tsbk::UnitVoiceGrant {
            channel,
            dest,
            src,
            svc_bits,
        } => {
            sm.sm_event(SmEvent::Grant {
                channel,
                tg: dest,
                src: Some(src),
                svc_bits,
                is_individual: true,
                is_tdma: false,
                slot: 0,
            });
            None
        }
        Tsbk::CallTermination { .. } => {
            sm.sm_event(SmEvent::CallTermination);
            None
        }
        Tsbk::IdenUp {
            iden,
            is_tdma,
            base_freq_5khz,
            channel_spacing_hz,
            tx_offset_hz,
        } => {
            let trust = if on_known_cc {
                TrustLevel::Confirmed
            } else {
                TrustLevel::OffCc
            };
            sm.tables_mut().iden.set(
                iden,
                IdenEntry {
                    base_freq_5khz,
                    channel_spacing_hz,
                    tx_offset_hz,
                    is_tdma,
                    trust,
                    site: SiteProvenance::default(),
                },
            );
            None
        }
        Tsbk::AdjacentStatus { freq_hz } => {
            sm.sm_event(SmEvent::NeighborUpdate { freq_hz });
            None
        }
        Tsbk::RfssStatus { wacn, sysid, .. } => Some((wacn, sysid)),
        Tsbk::NetworkStatus { wacn, sysid } => Some((wacn, sysid)),
        Tsbk::Unknown { .. } => None,
    }
}

/// Apply a decoded Phase 2 MAC PDU for `slot`.
pub fn apply_mac(sm: &mut SmContext, slot: u8, pdu: MacPdu) {
    match pdu {
        MacPdu::Active {
            tg,
            algid,
            keyid,
            ..
        } => {
            sm.sm_event(SmEvent::Active { slot });
            sm.sm_event(SmEvent::MacActivity { slot });
            if algid != ALGID_CLEAR {
                sm.sm_event(SmEvent::Enc {
                    slot,
                    algid,
                    keyid,
                    tg,
                });
            }
        }
        MacPdu::Idle => sm.sm_event(SmEvent::SlotIdle { slot }),
        MacPdu::End { .. } => sm.sm_event(SmEvent::End { slot }),
        MacPdu::Signal => sm.sm_event(SmEvent::MacActivity { slot }),
        MacPdu::Unknown { .. } => {}
    }
}

/// Apply a decoded Phase 1 LCW for `slot`.
pub fn apply_lcw(sm: &mut SmContext, slot: u8, lcw: Lcw) {
    match lcw {
        Lcw::GroupVoice { .. } | Lcw::UnitVoice { .. } => {
            sm.sm_event(SmEvent::VcSync { is_tdma: false });
        }
        Lcw::CallTermination { .. } => {
            sm.sm_event(SmEvent::CallTermination);
        }
        Lcw::Encryption { algid, keyid, tg } => {
            if algid != ALGID_CLEAR {
                sm.sm_event(SmEvent::Enc {
                    slot,
                    algid,
                    keyid,
                    tg,
                });
            }
        }
        Lcw::ExplicitRetune { channel } => {
            // Open question (spec §9): explicit LCW retune is honored
            // only behind `allow_lcw_explicit_retune` (`-j`).
            if sm.config().allow_lcw_explicit_retune {
                let tg = sm.vc().map(|v| v.tg).unwrap_or(0);
                sm.sm_event(SmEvent::Grant {
                    channel,
                    tg,
                    src: None,
                    svc_bits: 0,
                    is_individual: false,
                    is_tdma: false,
                    slot,
                });
            }
        }
        Lcw::Unknown { .. } => {}
    }
}
