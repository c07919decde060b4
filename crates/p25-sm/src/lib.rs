// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! `p25-sm` -- the P25 trunking-follower state machine and its
//! collaborators (spec §1: "THE CORE").
//!
//! This crate is pure and host-agnostic: it owns [`SmContext`] and every
//! table it consults (IDEN plan, candidate store, neighbor list,
//! affiliation tables, patch/regroup tracker, group list), the grant
//! policy, the tuner adapter trait, and the event/log sink. It has no
//! CLI, no process lifecycle, and no device I/O of its own beyond the
//! `TunerAdapter` implementations offered for convenience (a no-op stub,
//! a recording mock, and a rigctl-over-TCP client). The `p25-follower`
//! binary crate wires this up to a real demod loop, a watchdog thread,
//! and CLI/INI/env configuration.

pub mod adapter;
pub mod affiliation;
pub mod candidate;
pub mod config;
pub mod events;
pub mod grouplist;
pub mod iden;
pub mod neighbor;
pub mod patch;
pub mod policy;
pub mod sm;
pub mod time;

pub use adapter::{AdapterError, MockAdapter, NoopAdapter, RigctlAdapter, SlotHint, TunerAdapter};
pub use config::{ConfigError, SmConfig};
pub use events::{Event, EventColor, EventSink};
pub use policy::StatusTag;
pub use sm::{Counters, RetuneBlock, SlotState, SmContext, SmEvent, SmState, VcInfo};
pub use time::{Clock, SystemClock, TestClock};
