// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! P25 trunking-follower state machine core (spec §4.4).
//!
//! `SmContext` is the single-writer owner of all follower state: the
//! current state, the tuned voice channel (if any), per-slot gates, and
//! every collaborator table. Mutation only ever happens through
//! `sm_event` (one typed input at a time) or `sm_tick` (time passing);
//! both take `&mut self`, so the caller (the demod thread or the
//! watchdog) is responsible for serializing access behind one lock, per
//! §5 "the SM core is single-writer logically".

mod core;
mod event;
mod state;

pub use event::SmEvent;
pub use state::{Counters, RetuneBlock, SlotState, SmState, VcInfo};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::adapter::TunerAdapter;
use crate::affiliation::{AffiliationTable, GroupAffiliationTable};
use crate::candidate::CandidateStore;
use crate::config::SmConfig;
use crate::events::{Event, EventColor, EventSink};
use crate::grouplist::GroupListTable;
use crate::iden::IdenTable;
use crate::neighbor::NeighborTable;
use crate::patch::PatchTable;
use crate::policy::StatusTag;
use crate::time::Clock;

/// Every collaborator table named in spec §3, bundled so `SmContext`'s
/// field list stays readable.
#[derive(Default)]
pub struct Tables {
    pub iden: IdenTable,
    pub candidates: CandidateStore,
    pub neighbors: NeighborTable,
    pub affiliations: AffiliationTable,
    pub group_affiliations: GroupAffiliationTable,
    pub patches: PatchTable,
    pub group_list: GroupListTable,
}

/// The P25 trunking-follower state machine (spec §3 `SmContext`).
pub struct SmContext {
    state: SmState,
    config: SmConfig,
    vc: Option<VcInfo>,
    slots: [SlotState; 2],

    t_tune_m: f64,
    t_voice_m: f64,
    t_cc_sync_m: f64,
    t_hunt_try_m: f64,
    posthang_start_m: f64,

    /// Last *confirmed* control-channel frequency, used by `return_to_cc`
    /// and by the resolver's `on_known_cc` trust bypass (§4.1).
    last_cc_freq_hz: u64,
    /// Frequency currently tuned as "the CC", whether or not a `CC_SYNC`
    /// has confirmed it yet (distinct from `last_cc_freq_hz` during a
    /// hunt candidate's 3 s eval window).
    current_cc_freq_hz: u64,
    last_tdu_m: f64,
    /// Last frame sync of any kind on the current VC (P1 voice sync or P2
    /// superframe sync); drives the P1 tail-drain and P2 nosync checks.
    last_sync_m: f64,
    p1_err_history: Vec<f64>,
    /// Candidate currently being evaluated after a hunt tune, with its
    /// eval-window deadline (§4.4 "start a 3-second eval window").
    pending_candidate: Option<(u64, f64)>,

    /// Whether any voice sync/PTT/active has been seen since the current
    /// VC was tuned (release-path backoff condition, §4.4).
    voice_seen_since_tune: bool,
    /// Whether any MAC PDU has been seen since the current VC was tuned.
    mac_seen_since_tune: bool,

    retune_block: Option<RetuneBlock>,
    counters: Counters,
    enc_lockout_emitted: HashSet<u32>,
    loaded_key_algids: HashSet<u8>,

    hunt_channels: Vec<u16>,
    hunt_cursor: usize,

    tables: Tables,
    events: Arc<EventSink>,
    clock: Arc<dyn Clock>,
    adapter: Arc<dyn TunerAdapter>,

    last_status: StatusTag,
}

impl SmContext {
    /// Construct a fresh context. `preset_cc_freq_hz`, if given, starts
    /// the SM in `OnCc` rather than `Idle` (§4.4 "Initial").
    pub fn new(
        config: SmConfig,
        clock: Arc<dyn Clock>,
        adapter: Arc<dyn TunerAdapter>,
        events: Arc<EventSink>,
        preset_cc_freq_hz: Option<u64>,
    ) -> Self {
        let state = if preset_cc_freq_hz.is_some() {
            SmState::OnCc
        } else {
            SmState::Idle
        };
        Self {
            state,
            config,
            vc: None,
            slots: [SlotState::default(), SlotState::default()],
            t_tune_m: 0.0,
            t_voice_m: 0.0,
            t_cc_sync_m: 0.0,
            t_hunt_try_m: 0.0,
            posthang_start_m: 0.0,
            last_cc_freq_hz: preset_cc_freq_hz.unwrap_or(0),
            current_cc_freq_hz: preset_cc_freq_hz.unwrap_or(0),
            last_tdu_m: 0.0,
            last_sync_m: 0.0,
            p1_err_history: Vec::new(),
            pending_candidate: None,
            voice_seen_since_tune: false,
            mac_seen_since_tune: false,
            retune_block: None,
            counters: Counters::default(),
            enc_lockout_emitted: HashSet::new(),
            loaded_key_algids: HashSet::new(),
            hunt_channels: Vec::new(),
            hunt_cursor: 0,
            tables: Tables::default(),
            events,
            clock,
            adapter,
            last_status: StatusTag::GrantAllowed,
        }
    }

    pub fn state(&self) -> SmState {
        self.state
    }

    pub fn vc(&self) -> Option<&VcInfo> {
        self.vc.as_ref()
    }

    pub fn slot(&self, slot: u8) -> &SlotState {
        &self.slots[(slot as usize).min(1)]
    }

    pub fn config(&self) -> &SmConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SmConfig {
        &mut self.config
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut Tables {
        &mut self.tables
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn retune_block(&self) -> Option<RetuneBlock> {
        self.retune_block
    }

    pub fn last_status(&self) -> StatusTag {
        self.last_status
    }

    pub fn events(&self) -> &Arc<EventSink> {
        &self.events
    }

    /// Configure the round-robin hunt list used when `prefer_candidates`
    /// is false (§4.4 "try_next_cc order").
    pub fn set_hunt_channels(&mut self, channels: Vec<u16>) {
        self.hunt_channels = channels;
        self.hunt_cursor = 0;
    }

    /// Mark a key as loaded for an algorithm family, making ENC-tagged
    /// traffic under that algid decryptable (§4.4 ENC handling).
    pub fn load_key(&mut self, algid: u8) {
        self.loaded_key_algids.insert(algid);
    }

    /// Clear a previously-emitted lockout for `tg`, per spec §3
    /// "until its mode entry is cleared externally".
    pub fn clear_lockout(&mut self, tg: u32) {
        self.enc_lockout_emitted.remove(&tg);
        self.tables.group_list.clear(tg);
    }

    fn now_m(&self) -> f64 {
        self.clock.now_m()
    }

    fn now_wall_s(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn record_event(&self, slot: u8, color: EventColor, text: impl Into<String>) {
        self.events.push(Event {
            slot,
            color,
            time_wall_s: self.now_wall_s(),
            text: text.into(),
        });
    }
}
