// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! `sm_event`/`sm_tick` transition logic (spec §4.4).
//!
//! Every mutation the follower makes goes through one of these two entry
//! points. `sm_event` reacts to a single typed signal; `sm_tick` reacts to
//! time passing and is what drives hangtime, grant timeouts, the safety
//! nets and the hunt cadence even when no new frame arrives.

use super::event::SmEvent;
use super::state::{RetuneBlock, SlotState, SmState, VcInfo};
use super::SmContext;
use crate::adapter::SlotHint;
use crate::events::EventColor;
use crate::policy::{
    grant_allowed, GrantDecision, GrantEvent, PolicyOptions, RejectReason, ServiceBits, StatusTag,
};

impl SmContext {
    /// Handle one typed input event (spec §4.4 edges).
    pub fn sm_event(&mut self, event: SmEvent) {
        match self.state {
            SmState::Idle => self.handle_idle_event(event),
            SmState::OnCc => self.handle_on_cc_event(event),
            SmState::Tuned => self.handle_tuned_event(event),
            SmState::Hunting => self.handle_hunting_event(event),
        }
    }

    /// Advance time-based state: hangtime, grant timeout, safety nets,
    /// tail drains and the hunt cadence (spec §4.4 "Tick").
    pub fn sm_tick(&mut self) {
        let now = self.now_m();
        self.tables.affiliations.age_out(now);
        self.tables.group_affiliations.age_out(now);
        self.tables.patches.age_out(now);
        self.tables.neighbors.age_out(now);

        match self.state {
            SmState::Idle => {}
            SmState::OnCc => self.tick_on_cc(now),
            SmState::Tuned => self.tick_tuned(now),
            SmState::Hunting => self.tick_hunting(now),
        }
    }

    fn slot_mut(&mut self, slot: u8) -> &mut SlotState {
        &mut self.slots[(slot as usize).min(1)]
    }

    // ---- event handlers, by state -----------------------------------

    fn handle_idle_event(&mut self, event: SmEvent) {
        match event {
            SmEvent::CcSync { freq_hz } => self.on_cc_sync(freq_hz),
            other => tracing::debug!(?other, "event ignored while idle"),
        }
    }

    fn handle_on_cc_event(&mut self, event: SmEvent) {
        match event {
            SmEvent::CcSync { freq_hz } => self.on_cc_sync(freq_hz),
            SmEvent::Grant {
                channel,
                tg,
                src,
                svc_bits,
                is_individual,
                is_tdma,
                slot,
            } => self.handle_grant(channel, tg, src, svc_bits, is_individual, is_tdma, slot),
            SmEvent::NeighborUpdate { freq_hz } => {
                let now = self.now_m();
                self.tables.neighbors.observe(freq_hz, now);
            }
            other => tracing::debug!(?other, "event ignored while on control channel"),
        }
    }

    fn handle_hunting_event(&mut self, event: SmEvent) {
        match event {
            SmEvent::CcSync { freq_hz } => self.on_cc_sync(freq_hz),
            SmEvent::NeighborUpdate { freq_hz } => {
                let now = self.now_m();
                self.tables.neighbors.observe(freq_hz, now);
            }
            other => tracing::debug!(?other, "event ignored while hunting"),
        }
    }

    fn handle_tuned_event(&mut self, event: SmEvent) {
        let now = self.now_m();
        match event {
            SmEvent::CcSync { freq_hz } => self.on_cc_sync(freq_hz),
            SmEvent::VcSync { .. } => {
                self.last_sync_m = now;
                self.voice_seen_since_tune = true;
            }
            SmEvent::Grant {
                channel,
                tg,
                src,
                svc_bits,
                is_individual,
                is_tdma,
                slot,
            } => self.handle_grant(channel, tg, src, svc_bits, is_individual, is_tdma, slot),
            SmEvent::Ptt { slot } => {
                let s = self.slot_mut(slot);
                s.voice_active = true;
                s.last_active_m = now;
                self.t_voice_m = now;
                self.voice_seen_since_tune = true;
                self.posthang_start_m = 0.0;
            }
            SmEvent::Active { slot } => {
                let s = self.slot_mut(slot);
                s.voice_active = true;
                s.last_active_m = now;
                self.t_voice_m = now;
                self.voice_seen_since_tune = true;
            }
            SmEvent::End { slot } => {
                let s = self.slot_mut(slot);
                s.voice_active = false;
                s.last_end_m = now;
            }
            SmEvent::SlotIdle { slot } => {
                self.slot_mut(slot).voice_active = false;
            }
            SmEvent::Tdu { slot } => {
                let s = self.slot_mut(slot);
                s.voice_active = false;
                s.last_end_m = now;
                self.last_tdu_m = now;
            }
            SmEvent::Enc {
                slot,
                algid,
                keyid,
                tg,
            } => self.handle_enc(slot, algid, keyid, tg),
            SmEvent::NeighborUpdate { freq_hz } => self.tables.neighbors.observe(freq_hz, now),
            SmEvent::CallTermination => self.release(StatusTag::ReleaseCallTermination),
            SmEvent::SyncLost => tracing::debug!("sync lost while tuned to a voice channel"),
            SmEvent::MacActivity { slot } => {
                self.mac_seen_since_tune = true;
                let s = self.slot_mut(slot);
                if !s.voice_active {
                    s.last_mac_after_end_m = now;
                }
            }
            SmEvent::ImbeErrorSample { pct } => {
                self.p1_err_history.push(pct);
                if self.p1_err_history.len() > 8 {
                    self.p1_err_history.remove(0);
                }
            }
            SmEvent::RingDrained { slot } => {
                self.slot_mut(slot).ring_has_samples = false;
            }
        }
    }

    // ---- CC_SYNC, shared across states --------------------------------

    fn on_cc_sync(&mut self, freq_hz: Option<u64>) {
        let now = self.now_m();
        match self.state {
            SmState::Idle => {
                if let Some(f) = freq_hz {
                    self.last_cc_freq_hz = f;
                    self.current_cc_freq_hz = f;
                }
                self.t_cc_sync_m = now;
                self.state = SmState::OnCc;
            }
            SmState::OnCc => {
                self.t_cc_sync_m = now;
                self.pending_candidate = None;
                if let Some(f) = freq_hz {
                    self.last_cc_freq_hz = f;
                    self.current_cc_freq_hz = f;
                }
            }
            SmState::Tuned => {
                if self.last_cc_freq_hz == 0 {
                    if let Some(f) = freq_hz {
                        self.last_cc_freq_hz = f;
                    }
                }
            }
            SmState::Hunting => {
                self.t_cc_sync_m = now;
                self.pending_candidate = None;
                if let Some(f) = freq_hz {
                    self.last_cc_freq_hz = f;
                    self.current_cc_freq_hz = f;
                } else if self.current_cc_freq_hz != 0 {
                    self.last_cc_freq_hz = self.current_cc_freq_hz;
                }
                self.state = SmState::OnCc;
            }
        }
    }

    // ---- grant handling -------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn handle_grant(
        &mut self,
        channel: u16,
        tg: u32,
        src: Option<u32>,
        svc_bits: u8,
        is_individual: bool,
        is_tdma: bool,
        slot: u8,
    ) {
        let now = self.now_m();
        let on_known_cc = matches!(self.state, SmState::OnCc);
        let freq = self.tables.iden.resolve(channel, on_known_cc);

        if self.state == SmState::Tuned {
            if let Some(vc) = &self.vc {
                if freq != 0 && freq == vc.freq_hz {
                    tracing::debug!(freq, tg, "idempotent grant while already tuned");
                    self.last_status = StatusTag::GrantAllowed;
                    return;
                }
            }
            tracing::debug!(
                freq,
                tg,
                "grant to a different channel while already tuned, ignoring"
            );
            return;
        }

        if freq == 0 {
            self.last_status = StatusTag::GrantResolveFailed;
            return;
        }

        if let Some(block) = self.retune_block {
            if block.block_freq == freq && block.block_slot == slot && now < block.block_until_m {
                self.last_status = StatusTag::GrantBlockedBackoff;
                return;
            }
        }

        let svc = ServiceBits::from_raw(svc_bits);
        let key_clear = self.tables.patches.is_key_clear(tg);
        let group_list_mode = self.tables.group_list.mode(tg);
        let opts = self.policy_options();
        let grant_ev = GrantEvent {
            is_individual,
            svc,
            tg,
            src,
        };

        match grant_allowed(&opts, &grant_ev, key_clear, group_list_mode) {
            GrantDecision::Reject(reason) => {
                self.last_status = reason.status_tag();
                if !is_individual && reason == RejectReason::EncCallsDisabled {
                    self.emit_enc_lockout_once(slot, tg);
                }
                return;
            }
            GrantDecision::Allow => {}
        }

        if let Some(s) = src {
            self.tables.affiliations.observe(s, now);
            self.tables.group_affiliations.record(s, tg, now);
        }

        self.slots = [SlotState::default(), SlotState::default()];
        self.vc = Some(VcInfo {
            freq_hz: freq,
            channel,
            tg: Some(tg),
            src,
            is_tdma,
            slot_hint: slot,
        });
        self.t_tune_m = now;
        self.t_voice_m = 0.0;
        self.posthang_start_m = 0.0;
        self.last_sync_m = 0.0;
        self.last_tdu_m = 0.0;
        self.p1_err_history.clear();
        self.voice_seen_since_tune = false;
        self.mac_seen_since_tune = false;

        if let Err(err) = self.adapter.tune_to_vc(freq, is_tdma, SlotHint::Either) {
            tracing::warn!(?err, freq, "tune_to_vc failed, remaining on control channel");
        }

        self.counters.tunes += 1;
        self.counters.grants += 1;
        self.state = SmState::Tuned;
        self.last_status = StatusTag::GrantAllowed;
    }

    fn policy_options(&self) -> PolicyOptions {
        PolicyOptions {
            trunk_tune_data_calls: self.config.trunk_tune_data_calls,
            trunk_tune_private_calls: self.config.trunk_tune_private_calls,
            trunk_tune_enc_calls: self.config.trunk_tune_enc_calls,
            group_list_allow_list: self.config.group_list_allow_list,
            tg_hold: self.config.tg_hold,
        }
    }

    // ---- encryption lock-out (§4.4 ENC handling, §4.7) -----------------

    fn handle_enc(&mut self, slot: u8, algid: u8, keyid: u16, tg: u32) {
        let decryptable = self.config.trunk_tune_enc_calls
            || algid == 0x00
            || algid == 0x80
            || self.loaded_key_algids.contains(&algid);

        let s = self.slot_mut(slot);
        s.algid = algid;
        s.keyid = keyid;
        s.tg = Some(tg);

        if decryptable {
            s.allow_audio = true;
            s.enc_pending = false;
            s.enc_confirmed = false;
            return;
        }

        if s.enc_pending && s.enc_pending_tg == Some(tg) {
            s.enc_confirmed = true;
            s.allow_audio = false;
            s.ring_has_samples = false;
            self.emit_enc_lockout_once(slot, tg);

            let other = 1 - (slot.min(1) as usize);
            if !self.slots[other].voice_active {
                self.release(StatusTag::ReleaseEncLockout);
            }
        } else {
            s.enc_pending = true;
            s.enc_pending_tg = Some(tg);
        }
    }

    /// Emit the "ENC LO" event for `tg` exactly once until externally
    /// cleared (spec §3, §4.7).
    fn emit_enc_lockout_once(&mut self, slot: u8, tg: u32) {
        if self.enc_lockout_emitted.contains(&tg) {
            return;
        }
        self.enc_lockout_emitted.insert(tg);
        self.tables.group_list.mark_locked_out(tg);
        self.record_event(
            slot,
            EventColor::Alert,
            format!("Target {tg} has been locked out; Encryption Lock Out Enabled"),
        );
    }

    // ---- release path (§4.4 "Release path") ----------------------------

    fn release(&mut self, reason: StatusTag) {
        let now = self.now_m();
        let last_vc = self.vc.take();
        let release_slot = last_vc.as_ref().map(|vc| vc.slot_hint).unwrap_or(0);
        let voice_seen = self.voice_seen_since_tune;
        let mac_seen = self.mac_seen_since_tune;
        let ring_had_samples = self.slots.iter().any(|s| s.ring_has_samples);

        self.slots = [SlotState::default(), SlotState::default()];
        self.posthang_start_m = 0.0;
        self.p1_err_history.clear();
        self.t_voice_m = 0.0;

        if let Err(err) = self.adapter.return_to_cc(self.last_cc_freq_hz) {
            tracing::warn!(?err, "return_to_cc failed");
        }

        self.counters.releases += 1;
        self.counters.cc_returns += 1;
        self.state = SmState::OnCc;
        self.last_status = reason;

        if reason != StatusTag::ReleaseEncLockout {
            self.record_event(
                release_slot,
                EventColor::Normal,
                format!("Call Termination ({reason})"),
            );
        }

        self.retune_block = match last_vc {
            Some(vc) if vc.is_tdma && !voice_seen && !mac_seen && !ring_had_samples => {
                Some(RetuneBlock {
                    block_until_m: now + self.config.retune_backoff_s,
                    block_freq: vc.freq_hz,
                    block_slot: vc.slot_hint,
                })
            }
            _ => None,
        };
    }

    // ---- tick handlers, by state ----------------------------------------

    fn tick_on_cc(&mut self, now: f64) {
        if let Some((freq, deadline)) = self.pending_candidate {
            if now >= deadline {
                self.tables
                    .candidates
                    .cooldown(freq, now, self.config.cc_candidate_cooldown_s);
                self.pending_candidate = None;
                self.state = SmState::Hunting;
                self.t_hunt_try_m = now;
                self.try_next_cc(now);
            }
            return;
        }

        if self.t_cc_sync_m == 0.0 || now - self.t_cc_sync_m > self.config.cc_grace_s {
            self.state = SmState::Hunting;
            self.t_hunt_try_m = now;
            self.try_next_cc(now);
        }
    }

    fn tick_hunting(&mut self, now: f64) {
        if now - self.t_hunt_try_m >= self.config.cc_hunt_interval_s {
            self.t_hunt_try_m = now;
            self.try_next_cc(now);
        }
    }

    /// §4.4 "try_next_cc order": candidates first if preferred, otherwise
    /// the operator-supplied LCN list, round-robin either way.
    fn try_next_cc(&mut self, now: f64) {
        let freq = if self.config.prefer_candidates {
            self.tables.candidates.next(now, self.current_cc_freq_hz)
        } else {
            self.next_hunt_channel()
        };

        let Some(freq) = freq.filter(|&f| f != 0) else {
            tracing::debug!("no hunt candidate available this cycle");
            return;
        };

        if let Err(err) = self.adapter.tune_to_cc(freq) {
            tracing::warn!(?err, freq, "tune_to_cc failed");
            return;
        }

        self.current_cc_freq_hz = freq;
        self.t_cc_sync_m = 0.0;
        self.pending_candidate = Some((freq, now + self.config.cc_eval_window_s));
        self.state = SmState::OnCc;
    }

    fn next_hunt_channel(&mut self) -> Option<u64> {
        if self.hunt_channels.is_empty() {
            return None;
        }
        let len = self.hunt_channels.len();
        for step in 0..len {
            let idx = (self.hunt_cursor + step) % len;
            let channel = self.hunt_channels[idx];
            let freq = self.tables.iden.resolve(channel, false);
            if freq != 0 && freq != self.current_cc_freq_hz {
                self.hunt_cursor = (idx + 1) % len;
                return Some(freq);
            }
        }
        None
    }

    fn err_hold_extra_s(&self) -> f64 {
        if self.p1_err_history.is_empty() {
            return 0.0;
        }
        let avg = self.p1_err_history.iter().sum::<f64>() / self.p1_err_history.len() as f64;
        if avg > self.config.p1_err_hold_pct {
            let cap = self.config.force_release_extra_s + self.config.force_release_margin_s;
            self.config.p1_err_hold_s.min(cap)
        } else {
            0.0
        }
    }

    fn tick_tuned(&mut self, now: f64) {
        let is_tdma = self.vc.as_ref().map(|v| v.is_tdma).unwrap_or(false);
        let any_active = self.slots.iter().any(|s| s.voice_active);
        if any_active {
            self.t_voice_m = now;
            self.posthang_start_m = 0.0;
        }

        let dwell_ok = now - self.t_tune_m >= self.config.vc_grace_s;

        if !any_active {
            if self.t_voice_m == 0.0 {
                if now - self.t_tune_m >= self.config.grant_timeout_s {
                    self.release(StatusTag::ReleaseGrantTimeout);
                    return;
                }
            } else if dwell_ok {
                let effective_hangtime = self.config.hangtime_s + self.err_hold_extra_s();
                if now - self.t_voice_m >= effective_hangtime {
                    let mac_hold_s = self.config.mac_hold_s;
                    let ring_hold_s = self.config.effective_ring_hold_s();
                    let mac_recent = self.slots.iter().any(|s| {
                        s.last_mac_after_end_m > 0.0 && now - s.last_mac_after_end_m < mac_hold_s
                    });
                    let ring_gated = self
                        .slots
                        .iter()
                        .any(|s| s.ring_has_samples && now - s.last_end_m < ring_hold_s);

                    if mac_recent || ring_gated {
                        if self.posthang_start_m == 0.0 {
                            self.posthang_start_m = now;
                        }
                        if now - self.posthang_start_m >= self.config.force_release_extra_s {
                            self.release(StatusTag::ReleasePosthangWatchdog);
                            return;
                        }
                    } else {
                        self.release(StatusTag::ReleaseHangtimeExpired);
                        return;
                    }
                }
            }
        }

        // Safety nets: hard cutoffs regardless of gating, once the VC has
        // been tuned for at least `vc_grace_s`.
        if dwell_ok {
            let ref_t = if self.t_voice_m > 0.0 {
                self.t_voice_m
            } else {
                self.t_tune_m
            };
            let hard_cap = self.config.hangtime_s
                + self.config.force_release_extra_s
                + self.config.force_release_margin_s;
            if now - ref_t >= hard_cap {
                self.release(StatusTag::ReleaseSafetyNetHard);
                return;
            }

            if is_tdma && !any_active {
                let sync_ref = if self.last_sync_m > 0.0 {
                    self.last_sync_m
                } else {
                    self.t_tune_m
                };
                let nosync_cap = self.config.hangtime_s + self.config.force_release_extra_s;
                if now - sync_ref >= nosync_cap {
                    self.release(StatusTag::ReleaseSafetyNetNosync);
                    return;
                }
            }
        }

        // Tail drains.
        if is_tdma {
            let end_seen = self.slots.iter().any(|s| s.last_end_m > 0.0);
            let ring_drained = self.slots.iter().all(|s| !s.ring_has_samples);
            let mac_hold_s = self.config.mac_hold_s;
            let no_post_mac = self.slots.iter().all(|s| {
                s.last_mac_after_end_m == 0.0 || now - s.last_mac_after_end_m >= mac_hold_s
            });
            if end_seen && ring_drained && no_post_mac && !any_active {
                self.release(StatusTag::ReleaseEndPttDrain);
            }
        } else {
            let p1_tail_s = self.config.p1_tail_ms / 1000.0;
            if self.last_tdu_m > 0.0
                && now - self.last_tdu_m >= p1_tail_s
                && now - self.last_sync_m >= p1_tail_s
            {
                self.release(StatusTag::ReleaseP1TduDrain);
            }
        }
    }
}
