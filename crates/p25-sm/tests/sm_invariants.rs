// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Invariant and boundary-case coverage (spec §8, bullets not already
//! exercised by the S1-S6 scenarios in `sm_properties.rs`).

use std::sync::Arc;

use p25_sm::adapter::AdapterCall;
use p25_sm::iden::{IdenEntry, SiteProvenance, TrustLevel};
use p25_sm::{EventSink, MockAdapter, SmConfig, SmContext, SmEvent, SmState, TestClock};

fn confirmed_iden(base_5khz: u32, spacing_hz: u32) -> IdenEntry {
    IdenEntry {
        base_freq_5khz: base_5khz,
        channel_spacing_hz: spacing_hz,
        tx_offset_hz: 0,
        is_tdma: false,
        trust: TrustLevel::Confirmed,
        site: SiteProvenance::default(),
    }
}

fn harness(config: SmConfig) -> (SmContext, TestClock, Arc<MockAdapter>) {
    let clock = TestClock::new();
    let adapter = Arc::new(MockAdapter::new());
    let sm = SmContext::new(
        config,
        Arc::new(clock.clone()),
        adapter.clone(),
        Arc::new(EventSink::new()),
        None,
    );
    (sm, clock, adapter)
}

fn group_grant(channel: u16, tg: u32) -> SmEvent {
    SmEvent::Grant {
        channel,
        tg,
        src: None,
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: false,
        slot: 0,
    }
}

/// Release implies CC or HUNTING, `vc.freq_hz = 0`, and no slot has
/// `allow_audio`.
#[test]
fn release_implies_cc_or_hunting_and_cleared_vc() {
    let (mut sm, clock, _adapter) = harness(SmConfig::defaults());
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));
    assert_eq!(sm.state(), SmState::Tuned);

    sm.sm_event(SmEvent::CallTermination);
    assert!(matches!(sm.state(), SmState::OnCc | SmState::Hunting));
    assert!(sm.vc().is_none());
    assert!(!sm.slot(0).allow_audio);
    assert!(!sm.slot(1).allow_audio);
}

/// No tune during backoff: a grant to the blocked (freq, slot) leaves
/// state unchanged, covered at the boundary `now == block_until_m`.
#[test]
fn no_tune_exactly_at_block_boundary() {
    let mut cfg = SmConfig::defaults();
    cfg.retune_backoff_s = 1.0;
    let (mut sm, clock, _adapter) = harness(cfg);
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    let grant = SmEvent::Grant {
        channel: (1u16 << 12) | 0x064,
        tg: 1,
        src: None,
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: true,
        slot: 0,
    };
    sm.sm_event(grant.clone());
    sm.sm_event(SmEvent::CallTermination);
    let block = sm.retune_block().unwrap();

    clock.set(block.block_until_m - 0.01);
    sm.sm_event(grant.clone());
    assert_eq!(sm.state(), SmState::OnCc, "still inside the backoff window");

    clock.set(block.block_until_m);
    sm.sm_event(grant);
    assert_eq!(sm.state(), SmState::Tuned, "backoff window has elapsed");
}

/// Lockout is one-shot per TG until externally cleared.
#[test]
fn lockout_is_one_shot_until_cleared() {
    let mut cfg = SmConfig::defaults();
    cfg.trunk_tune_enc_calls = false;
    let (mut sm, clock, _adapter) = harness(cfg);
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));

    sm.sm_event(SmEvent::Enc {
        slot: 0,
        algid: 0xAA,
        keyid: 1,
        tg: 1,
    });
    clock.set(0.2);
    sm.sm_event(SmEvent::Enc {
        slot: 0,
        algid: 0xAA,
        keyid: 1,
        tg: 1,
    });
    assert_eq!(sm.events().snapshot(0).len(), 1);
    assert_eq!(sm.state(), SmState::OnCc);

    // The lockout marked TG 1 "DE" in the group-list table (§4.3 rule 3a),
    // so a re-grant for the same TG is rejected unconditionally by §4.3
    // rule 3b -- the SM never re-tunes, and no second lockout event can
    // even be produced, until the lockout is cleared externally.
    clock.set(0.4);
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));
    assert_eq!(
        sm.state(),
        SmState::OnCc,
        "a TG locked out as DE/B must stay rejected on re-grant"
    );
    assert_eq!(sm.events().snapshot(0).len(), 1, "no additional event from the rejected re-grant");

    sm.clear_lockout(1);
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));
    sm.sm_event(SmEvent::Enc {
        slot: 0,
        algid: 0xAA,
        keyid: 1,
        tg: 1,
    });
    clock.set(0.6);
    sm.sm_event(SmEvent::Enc {
        slot: 0,
        algid: 0xAA,
        keyid: 1,
        tg: 1,
    });
    assert_eq!(
        sm.events().snapshot(0).len(),
        2,
        "lockout can recur after an external clear"
    );
}

/// A single new (slot,tg) ENC indication never locks out by itself.
#[test]
fn single_enc_indication_does_not_lock_out() {
    let mut cfg = SmConfig::defaults();
    cfg.trunk_tune_enc_calls = false;
    let (mut sm, clock, _adapter) = harness(cfg);
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 7));
    sm.sm_event(SmEvent::Enc {
        slot: 0,
        algid: 0xAA,
        keyid: 1,
        tg: 7,
    });
    assert!(sm.events().snapshot(0).is_empty());
    assert_eq!(sm.state(), SmState::Tuned);
}

/// Safety-net upper bound: once dwell-eligible, exceeding
/// `hangtime + extra + margin` since last voice forces a release on the
/// next tick regardless of gating.
#[test]
fn safety_net_hard_upper_bound() {
    let mut cfg = SmConfig::defaults();
    cfg.hangtime_s = 1.0;
    cfg.force_release_extra_s = 0.5;
    cfg.force_release_margin_s = 0.25;
    cfg.vc_grace_s = 0.1;
    let (mut sm, clock, _adapter) = harness(cfg);
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));
    sm.sm_event(SmEvent::Ptt { slot: 0 });
    sm.sm_event(SmEvent::End { slot: 0 });

    // The hard safety net fires once `hangtime + extra + margin` has
    // elapsed since tune, regardless of any gating.
    clock.set(1.0 + 0.5 + 0.25 + 0.01);
    sm.sm_tick();
    assert_eq!(sm.state(), SmState::OnCc);
}

/// Grant timeout: no voice within `grant_timeout_s` forces a release with
/// that reason on the next tick.
#[test]
fn grant_timeout_releases() {
    let mut cfg = SmConfig::defaults();
    cfg.grant_timeout_s = 2.0;
    let (mut sm, clock, _adapter) = harness(cfg);
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));
    clock.set(2.1);
    sm.sm_tick();
    assert_eq!(sm.state(), SmState::OnCc);
}

/// Idempotent grant: two grants to the same (freq, tg) while already
/// Tuned produce no additional `tune_to_vc` calls.
#[test]
fn idempotent_grant_no_extra_tune() {
    let (mut sm, clock, adapter) = harness(SmConfig::defaults());
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));
    assert_eq!(adapter.tune_to_vc_count(), 1);
}

/// CC recovery: from Hunting, a CC_SYNC transitions to OnCc and cancels
/// the pending candidate eval.
#[test]
fn cc_recovery_cancels_pending_eval() {
    let mut cfg = SmConfig::defaults();
    cfg.prefer_candidates = true;
    let (mut sm, clock, _adapter) = harness(cfg);
    sm.tables_mut().candidates.add(42);
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync { freq_hz: None });
    clock.set(10.0);
    sm.sm_tick(); // -> Hunting -> tentative tune, pending eval window open
    assert_eq!(sm.state(), SmState::OnCc);

    sm.sm_event(SmEvent::CcSync { freq_hz: Some(42) });
    assert_eq!(sm.state(), SmState::OnCc);

    // The eval window (was due at t=13) expiring after recovery must not
    // re-trigger a hunt; a tick still within `cc_grace_s` of the recovery
    // sync stays parked on the control channel.
    clock.set(11.5);
    sm.sm_tick();
    assert_eq!(sm.state(), SmState::OnCc);
}

// ---- Boundary cases -------------------------------------------------

#[test]
fn hangtime_zero_releases_immediately_on_end() {
    let mut cfg = SmConfig::defaults();
    cfg.hangtime_s = 0.000_001; // validate() rejects exactly zero
    let (mut sm, clock, _adapter) = harness(cfg);
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));
    clock.set(1.0);
    sm.sm_event(SmEvent::Ptt { slot: 0 });
    clock.set(1.1);
    sm.sm_tick(); // refresh t_voice_m while active
    sm.sm_event(SmEvent::End { slot: 0 });
    clock.set(1.100_002);
    sm.sm_tick();
    assert_eq!(sm.state(), SmState::OnCc);
}

#[test]
fn grant_timeout_zero_releases_on_first_tick() {
    let mut cfg = SmConfig::defaults();
    cfg.grant_timeout_s = 0.000_001;
    let (mut sm, clock, _adapter) = harness(cfg);
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(group_grant((1u16 << 12) | 0x064, 1));
    clock.set(0.000_01);
    sm.sm_tick();
    assert_eq!(sm.state(), SmState::OnCc);
}

#[test]
fn unknown_iden_spacing_drops_grant() {
    let (mut sm, clock, adapter) = harness(SmConfig::defaults());
    // No IDEN table entries at all -- resolver must return 0.
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(group_grant((3u16 << 12) | 0x010, 1));
    assert_eq!(sm.state(), SmState::OnCc);
    assert!(adapter.calls().is_empty());
}

#[test]
fn simultaneous_end_both_slots_single_release() {
    let mut cfg = SmConfig::defaults();
    cfg.hangtime_s = 0.000_001;
    let (mut sm, clock, adapter) = harness(cfg);
    sm.tables_mut().iden.set(1, confirmed_iden(170_200, 12_500));
    clock.set(0.0);
    sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    sm.sm_event(SmEvent::Grant {
        channel: (1u16 << 12) | 0x064,
        tg: 1,
        src: None,
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: true,
        slot: 0,
    });
    sm.sm_event(SmEvent::Ptt { slot: 0 });
    sm.sm_event(SmEvent::Ptt { slot: 1 });
    clock.set(0.01);
    sm.sm_tick();
    sm.sm_event(SmEvent::End { slot: 0 });
    sm.sm_event(SmEvent::End { slot: 1 });
    clock.set(0.011_01);
    sm.sm_tick();
    assert_eq!(sm.state(), SmState::OnCc);
    assert_eq!(
        adapter
            .calls()
            .iter()
            .filter(|c| matches!(c, AdapterCall::ReturnToCc(_)))
            .count(),
        1
    );
}
