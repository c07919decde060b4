// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Talkgroup group-list table: per-TG membership mode and label.
//!
//! This is the "group table" referenced by spec §4.3/§4.7 -- distinct
//! from [`crate::affiliation::GroupAffiliationTable`] (which tracks
//! RID<->TG keying history). Populated externally (CSV import, out of
//! scope per §1) and mutated by `emit_enc_lockout_once` (§4.7) when a
//! talkgroup is locked out.

use std::collections::HashMap;

use crate::policy::GroupListMode;

#[derive(Debug, Clone)]
struct Entry {
    mode: GroupListMode,
    label: String,
}

/// Per-TG group-list membership and display label.
#[derive(Debug, Clone, Default)]
pub struct GroupListTable {
    entries: HashMap<u32, Entry>,
}

impl GroupListTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self, tg: u32) -> GroupListMode {
        self.entries
            .get(&tg)
            .map(|e| e.mode)
            .unwrap_or(GroupListMode::Normal)
    }

    pub fn label(&self, tg: u32) -> Option<&str> {
        self.entries.get(&tg).map(|e| e.label.as_str())
    }

    pub fn set(&mut self, tg: u32, mode: GroupListMode, label: impl Into<String>) {
        self.entries.insert(
            tg,
            Entry {
                mode,
                label: label.into(),
            },
        );
    }

    /// Mark `tg` as locked out ("DE"), preserving any existing user
    /// label if one is already set (§4.7 "preserving any user label").
    pub fn mark_locked_out(&mut self, tg: u32) {
        let label = self
            .entries
            .get(&tg)
            .map(|e| e.label.clone())
            .unwrap_or_else(|| "ENC LO".to_string());
        self.set(tg, GroupListMode::Denied, label);
    }

    pub fn clear(&mut self, tg: u32) {
        self.entries.remove(&tg);
    }

    /// Iterate `(tg, mode, label)` for callers that persist lock-out
    /// state (the follower binary's per-system lockout file).
    pub fn iter(&self) -> impl Iterator<Item = (u32, GroupListMode, &str)> {
        self.entries
            .iter()
            .map(|(&tg, e)| (tg, e.mode, e.label.as_str()))
    }
}
