// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Patch / regroup super-group tracker (spec §3 `PatchTable`).
//!
//! A super-group (patch or regroup) bundles talkgroups and/or radios
//! under one `sgid`. `key == 0` ("KEY=0000") is the clear-override signal
//! grant policy (§4.3 rule 3a) uses to bypass ENC lock-out for members of
//! that super-group.

use std::collections::HashMap;

const CAPACITY: usize = 8;
const TTL_S: f64 = 600.0; // 10 min
const MAX_MEMBERS: usize = 8;

#[derive(Debug, Clone)]
pub struct SuperGroup {
    pub sgid: u32,
    pub is_patch: bool,
    pub active: bool,
    pub last_update_m: f64,
    pub member_tgs: Vec<u32>,
    pub member_rids: Vec<u32>,
    pub alg: u8,
    pub key: u16,
    pub ssn: u8,
}

impl SuperGroup {
    fn is_key_clear(&self) -> bool {
        self.key == 0
    }
}

/// Up to 8 tracked super-groups.
#[derive(Debug, Clone, Default)]
pub struct PatchTable {
    groups: HashMap<u32, SuperGroup>,
}

impl PatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Insert or refresh a super-group. On overflow, the stalest entry is
    /// evicted first.
    pub fn upsert(&mut self, mut group: SuperGroup, now_m: f64) {
        group.member_tgs.truncate(MAX_MEMBERS);
        group.member_rids.truncate(MAX_MEMBERS);
        group.last_update_m = now_m;
        if !self.groups.contains_key(&group.sgid) && self.groups.len() >= CAPACITY {
            if let Some((&stalest, _)) = self
                .groups
                .iter()
                .min_by(|a, b| a.1.last_update_m.partial_cmp(&b.1.last_update_m).unwrap())
            {
                self.groups.remove(&stalest);
            }
        }
        self.groups.insert(group.sgid, group);
    }

    pub fn age_out(&mut self, now_m: f64) {
        self.groups.retain(|_, g| now_m - g.last_update_m <= TTL_S);
    }

    pub fn get(&self, sgid: u32) -> Option<&SuperGroup> {
        self.groups.get(&sgid)
    }

    /// Whether `tg` is key-clear, either directly (it *is* a super-group
    /// with KEY=0000) or as a member of one.
    pub fn is_key_clear(&self, tg: u32) -> bool {
        self.groups.values().any(|g| {
            g.active && g.is_key_clear() && (g.sgid == tg || g.member_tgs.contains(&tg))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(sgid: u32, key: u16, members: Vec<u32>) -> SuperGroup {
        SuperGroup {
            sgid,
            is_patch: true,
            active: true,
            last_update_m: 0.0,
            member_tgs: members,
            member_rids: vec![],
            alg: 0,
            key,
            ssn: 0,
        }
    }

    #[test]
    fn key_clear_member_is_reported() {
        let mut table = PatchTable::new();
        table.upsert(group(9000, 0, vec![1234, 5678]), 0.0);
        assert!(table.is_key_clear(1234));
        assert!(!table.is_key_clear(9999));
    }

    #[test]
    fn keyed_supergroup_is_not_clear() {
        let mut table = PatchTable::new();
        table.upsert(group(9000, 0xAA, vec![1234]), 0.0);
        assert!(!table.is_key_clear(1234));
    }

    #[test]
    fn ages_out() {
        let mut table = PatchTable::new();
        table.upsert(group(1, 0, vec![]), 0.0);
        table.age_out(TTL_S + 1.0);
        assert!(table.is_empty());
    }
}
