// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! RID and RID<->TG affiliation tables (spec §3 `AffiliationTable`,
//! `GroupAffiliationTable`).
//!
//! Both are bounded, TTL-aged maps; on overflow the stalest entry is
//! evicted to make room for a new one.

use std::collections::HashMap;

const AFFILIATION_CAPACITY: usize = 256;
const AFFILIATION_TTL_S: f64 = 900.0; // 15 min

const GROUP_AFFILIATION_CAPACITY: usize = 512;
const GROUP_AFFILIATION_TTL_S: f64 = 1800.0; // 30 min

fn evict_stalest<K: Copy + Eq + std::hash::Hash>(map: &mut HashMap<K, f64>) {
    if let Some((&stalest, _)) = map.iter().min_by(|a, b| a.1.partial_cmp(b.1).unwrap()) {
        map.remove(&stalest);
    }
}

/// RID table: tracks which radios have recently been observed.
#[derive(Debug, Clone, Default)]
pub struct AffiliationTable {
    last_seen: HashMap<u32, f64>,
}

impl AffiliationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, rid: u32, now_m: f64) {
        if !self.last_seen.contains_key(&rid) && self.last_seen.len() >= AFFILIATION_CAPACITY {
            evict_stalest(&mut self.last_seen);
        }
        self.last_seen.insert(rid, now_m);
    }

    pub fn age_out(&mut self, now_m: f64) {
        self.last_seen
            .retain(|_, &mut seen| now_m - seen <= AFFILIATION_TTL_S);
    }

    pub fn contains(&self, rid: u32) -> bool {
        self.last_seen.contains_key(&rid)
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }
}

/// RID<->TG table: tracks which radio last keyed which talkgroup.
#[derive(Debug, Clone, Default)]
pub struct GroupAffiliationTable {
    /// (rid, tg) -> last_seen
    last_seen: HashMap<(u32, u32), f64>,
}

impl GroupAffiliationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, rid: u32, tg: u32, now_m: f64) {
        let key = (rid, tg);
        if !self.last_seen.contains_key(&key) && self.last_seen.len() >= GROUP_AFFILIATION_CAPACITY
        {
            evict_stalest(&mut self.last_seen);
        }
        self.last_seen.insert(key, now_m);
    }

    pub fn age_out(&mut self, now_m: f64) {
        self.last_seen
            .retain(|_, &mut seen| now_m - seen <= GROUP_AFFILIATION_TTL_S);
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn talkgroups_for_rid(&self, rid: u32) -> Vec<u32> {
        self.last_seen
            .keys()
            .filter(|(r, _)| *r == rid)
            .map(|(_, tg)| *tg)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affiliation_ages_out() {
        let mut table = AffiliationTable::new();
        table.observe(1234, 0.0);
        assert!(table.contains(1234));
        table.age_out(AFFILIATION_TTL_S + 1.0);
        assert!(!table.contains(1234));
    }

    #[test]
    fn group_affiliation_records_pair() {
        let mut table = GroupAffiliationTable::new();
        table.record(1, 100, 0.0);
        table.record(1, 200, 0.0);
        let mut tgs = table.talkgroups_for_rid(1);
        tgs.sort_unstable();
        assert_eq!(tgs, vec![100, 200]);
    }

    #[test]
    fn overflow_evicts_stalest() {
        let mut table = AffiliationTable::new();
        for rid in 0..AFFILIATION_CAPACITY as u32 {
            table.observe(rid, rid as f64);
        }
        assert_eq!(table.len(), AFFILIATION_CAPACITY);
        table.observe(999_999, AFFILIATION_CAPACITY as f64);
        assert_eq!(table.len(), AFFILIATION_CAPACITY);
        assert!(!table.contains(0));
        assert!(table.contains(999_999));
    }
}
