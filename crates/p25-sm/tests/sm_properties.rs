// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! End-to-end scenario coverage (spec §8 "Concrete end-to-end scenarios",
//! S1-S6), driven against a [`MockAdapter`] and a [`TestClock`] so no
//! wall-clock sleeping is needed.

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

struct Harness {
    sm: SmContext,
    clock: TestClock,
    adapter: Arc<MockAdapter>,
}

impl Harness {
    fn new(config: SmConfig, preset_cc_freq_hz: Option<u64>) -> Self {
        let clock = TestClock::new();
        let adapter = Arc::new(MockAdapter::new());
        let sm = SmContext::new(
            config,
            Arc::new(clock.clone()),
            adapter.clone(),
            Arc::new(EventSink::new()),
            preset_cc_freq_hz,
        );
        Self { sm, clock, adapter }
    }

    fn at(&self, secs: f64) {
        self.clock.set(secs);
    }
}

// S1. Follow a clear group call.
#[test]
fn s1_follow_clear_group_call() {
    let mut h = Harness::new(SmConfig::defaults(), Some(851_012_500));
    h.sm
        .tables_mut()
        .iden
        .set(1, confirmed_iden(170_200, 12_500)); // 851_000_000 / 5000

    h.at(0.0);
    h.sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    assert_eq!(h.sm.state(), SmState::OnCc);

    h.at(1.0);
    h.sm.sm_event(SmEvent::Grant {
        channel: (1u16 << 12) | 0x064,
        tg: 1234,
        src: Some(4242),
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: false,
        slot: 0,
    });
    assert_eq!(h.sm.state(), SmState::Tuned);
    assert_eq!(h.sm.vc().unwrap().freq_hz, 852_250_000);
    assert_eq!(
        h.adapter.calls(),
        vec![AdapterCall::TuneToVc(852_250_000, false)]
    );

    h.at(1.1);
    h.sm.sm_event(SmEvent::Ptt { slot: 0 });
    h.at(1.2);
    h.sm.sm_event(SmEvent::VcSync { is_tdma: false });
    // A demod loop keeps ticking throughout the call, refreshing
    // `t_voice_m` while the slot is active (spec §4.4 tick handling).
    h.at(2.9);
    h.sm.sm_tick();
    h.at(3.0);
    h.sm.sm_event(SmEvent::End { slot: 0 });

    // Hangtime 0.75s measured from the last refreshed voice timestamp
    // (~2.9): no release yet at t=3.0.
    h.sm.sm_tick();
    assert_eq!(h.sm.state(), SmState::Tuned);

    h.at(3.8);
    h.sm.sm_tick();
    assert_eq!(h.sm.state(), SmState::OnCc);
    assert!(h
        .adapter
        .calls()
        .contains(&AdapterCall::ReturnToCc(851_012_500)));
}

// S2. ENC lock-out with dual indication.
#[test]
fn s2_enc_lockout_dual_indication() {
    let mut cfg = SmConfig::defaults();
    cfg.trunk_tune_enc_calls = false;
    let mut h = Harness::new(cfg, None);
    h.sm
        .tables_mut()
        .iden
        .set(1, confirmed_iden(170_200, 12_500));

    // Tune to the VC with a clear grant first; the mid-call ENC
    // indication (e.g. observed via LCW after the grant) is what drives
    // the dual-indication path under test.
    h.at(0.0);
    h.sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    h.sm.sm_event(SmEvent::Grant {
        channel: (1u16 << 12) | 0x064,
        tg: 1234,
        src: None,
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: false,
        slot: 0,
    });
    assert_eq!(h.sm.state(), SmState::Tuned);

    h.sm.sm_event(SmEvent::Enc {
        slot: 0,
        algid: 0xAA,
        keyid: 1,
        tg: 1234,
    });
    assert!(h.sm.events().snapshot(0).is_empty());
    assert!(!h.sm.slot(0).allow_audio);

    h.at(0.2);
    h.sm.sm_event(SmEvent::Enc {
        slot: 0,
        algid: 0xAA,
        keyid: 1,
        tg: 1234,
    });
    let events = h.sm.events().snapshot(0);
    assert_eq!(events.len(), 1);
    assert!(events[0].text.contains("locked out"));
    assert_eq!(h.sm.state(), SmState::OnCc);
}

// S3. Retune backoff on dead grant.
#[test]
fn s3_retune_backoff_on_dead_grant() {
    let mut cfg = SmConfig::defaults();
    cfg.grant_timeout_s = 4.0;
    cfg.retune_backoff_s = 1.0;
    let mut h = Harness::new(cfg, None);
    h.sm
        .tables_mut()
        .iden
        .set(1, confirmed_iden(170_200, 12_500));

    h.at(0.0);
    h.sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    h.sm.sm_event(SmEvent::Grant {
        channel: (1u16 << 12) | 0x064,
        tg: 1234,
        src: None,
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: true,
        slot: 0,
    });
    assert_eq!(h.sm.state(), SmState::Tuned);
    let freq = h.sm.vc().unwrap().freq_hz;

    h.at(0.8);
    h.sm.sm_event(SmEvent::CallTermination);
    assert_eq!(h.sm.state(), SmState::OnCc);
    let block = h.sm.retune_block().expect("backoff should be programmed");
    assert_eq!(block.block_freq, freq);
    assert_eq!(block.block_slot, 0);

    h.at(1.2);
    h.sm.sm_event(SmEvent::Grant {
        channel: (1u16 << 12) | 0x064,
        tg: 1234,
        src: None,
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: true,
        slot: 0,
    });
    assert_eq!(
        h.sm.state(),
        SmState::OnCc,
        "grant during backoff window must be dropped"
    );

    h.at(2.0);
    h.sm.sm_event(SmEvent::Grant {
        channel: (1u16 << 12) | 0x064,
        tg: 1234,
        src: None,
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: true,
        slot: 0,
    });
    assert_eq!(
        h.sm.state(),
        SmState::Tuned,
        "grant after backoff expires must succeed"
    );
}

// S4. Opposite slot stays active.
#[test]
fn s4_opposite_slot_stays_active() {
    let mut h = Harness::new(SmConfig::defaults(), None);
    h.sm
        .tables_mut()
        .iden
        .set(1, confirmed_iden(170_200, 12_500));
    h.at(0.0);
    h.sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    h.sm.sm_event(SmEvent::Grant {
        channel: (1u16 << 12) | 0x064,
        tg: 1234,
        src: None,
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: true,
        slot: 0,
    });
    h.sm.sm_event(SmEvent::Ptt { slot: 0 });
    h.sm.sm_event(SmEvent::Ptt { slot: 1 });

    h.sm.sm_event(SmEvent::End { slot: 1 });
    assert_eq!(h.sm.state(), SmState::Tuned);
    assert!(h.sm.slot(0).voice_active);
    assert!(!h.sm.slot(1).voice_active);
}

// S5. Hunting picks candidate with cooldown.
#[test]
fn s5_hunting_skips_cooled_candidate() {
    let mut cfg = SmConfig::defaults();
    cfg.prefer_candidates = true;
    cfg.cc_eval_window_s = 3.0;
    cfg.cc_candidate_cooldown_s = 10.0;
    let mut h = Harness::new(cfg, None);

    h.sm.tables_mut().candidates.add(100);
    h.sm.tables_mut().candidates.add(200);
    h.sm.tables_mut().candidates.add(300);

    // Force into Hunting: no CC sync ever seen while OnCc.
    h.at(0.0);
    h.sm.sm_tick(); // Idle tick is a no-op.
    h.sm.sm_event(SmEvent::CcSync { freq_hz: None }); // enters OnCc w/o freq
    h.at(10.0);
    h.sm.tables_mut().candidates.cooldown(200, 10.0, 5.0);
    h.sm.sm_tick(); // cc_grace_s exceeded -> Hunting, tunes candidate 100.
    assert_eq!(h.sm.state(), SmState::OnCc); // tentative tune re-enters OnCc for eval
    assert_eq!(h.adapter.calls().last(), Some(&AdapterCall::TuneToCc(100)));

    h.at(13.1); // past 3s eval window with no CC_SYNC
    h.sm.sm_tick();
    assert_eq!(h.sm.state(), SmState::OnCc);
    assert_eq!(h.adapter.calls().last(), Some(&AdapterCall::TuneToCc(300)));

    h.sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(300),
    });
    assert_eq!(h.sm.state(), SmState::OnCc);
    assert_eq!(h.sm.vc(), None);
}

// S6. Explicit LCW call termination is unconditional.
#[test]
fn s6_explicit_call_termination_unconditional() {
    let mut h = Harness::new(SmConfig::defaults(), None);
    h.sm
        .tables_mut()
        .iden
        .set(1, confirmed_iden(170_200, 12_500));
    h.at(0.0);
    h.sm.sm_event(SmEvent::CcSync {
        freq_hz: Some(851_012_500),
    });
    h.sm.sm_event(SmEvent::Grant {
        channel: (1u16 << 12) | 0x064,
        tg: 1234,
        src: None,
        svc_bits: 0x00,
        is_individual: false,
        is_tdma: true,
        slot: 0,
    });
    h.sm.sm_event(SmEvent::Ptt { slot: 0 });
    assert!(h.sm.slot(0).voice_active);

    h.sm.sm_event(SmEvent::CallTermination);
    assert_eq!(h.sm.state(), SmState::OnCc);
    assert_eq!(h.adapter.return_to_cc_count(), 1);
}
