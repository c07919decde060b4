// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! File-backed persistence for the candidate CC store and per-talkgroup
//! lock-out state (spec §4.2, §4.7; SPEC_FULL §12).
//!
//! Both stores are best-effort: a read or write failure is logged (at
//! `verbose > 1`) and otherwise swallowed, matching the SM's own
//! "persistence never blocks or fails the state machine" rule. Files
//! live under the per-user data directory reported by `directories`,
//! one plain text file per `(wacn, sysid)`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::warn;

use p25_sm::candidate::{CandidateStorage, CandidateStore};
use p25_sm::grouplist::GroupListTable;
use p25_sm::policy::GroupListMode;

const QUALIFIER: &str = "io";
const ORGANIZATION: &str = "dsd-neo";
const APPLICATION: &str = "p25-follower";

/// Resolve the per-user data directory, if the platform exposes one.
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).map(|d| d.data_dir().to_path_buf())
}

fn candidate_path(base: &Path, wacn: u32, sysid: u16) -> PathBuf {
    base.join("candidates")
        .join(format!("{wacn:08x}_{sysid:04x}.txt"))
}

fn lockout_path(base: &Path, wacn: u32, sysid: u16) -> PathBuf {
    base.join("lockout").join(format!("{wacn:08x}_{sysid:04x}.txt"))
}

/// File-backed [`CandidateStorage`], rooted at a configurable base
/// directory (normally [`data_dir`]).
#[derive(Debug, Clone)]
pub struct FileCandidateStore {
    base: PathBuf,
}

impl FileCandidateStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl CandidateStorage for FileCandidateStore {
    fn load(&self, wacn: u32, sysid: u16) -> Option<CandidateStore> {
        let path = candidate_path(&self.base, wacn, sysid);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(CandidateStore::from_lines(
                text.lines().map(str::to_string),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load candidate cache");
                None
            }
        }
    }

    fn persist(&self, wacn: u32, sysid: u16, store: &CandidateStore) -> std::io::Result<()> {
        let path = candidate_path(&self.base, wacn, sysid);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = store.to_lines().join("\n");
        std::fs::write(&path, body)
    }
}

/// Load a candidate store and log (rather than propagate) any failure,
/// per §4.2's "best-effort, failures are logged at `verbose>1`".
pub fn load_candidates_best_effort(
    storage: &dyn CandidateStorage,
    wacn: u32,
    sysid: u16,
    verbose: u8,
) -> CandidateStore {
    match storage.load(wacn, sysid) {
        Some(store) => store,
        None => {
            if verbose > 1 {
                warn!(wacn, sysid, "no persisted candidate cache; starting empty");
            }
            CandidateStore::new()
        }
    }
}

pub fn persist_candidates_best_effort(
    storage: &dyn CandidateStorage,
    wacn: u32,
    sysid: u16,
    store: &CandidateStore,
    verbose: u8,
) {
    if let Err(e) = storage.persist(wacn, sysid, store) {
        if verbose > 1 {
            warn!(wacn, sysid, error = %e, "failed to persist candidate cache");
        }
    }
}

fn mode_tag(mode: GroupListMode) -> &'static str {
    match mode {
        GroupListMode::Normal => "N",
        GroupListMode::Denied => "DE",
        GroupListMode::Blocked => "B",
    }
}

fn mode_from_tag(tag: &str) -> Option<GroupListMode> {
    match tag {
        "N" => Some(GroupListMode::Normal),
        "DE" => Some(GroupListMode::Denied),
        "B" => Some(GroupListMode::Blocked),
        _ => None,
    }
}

/// Persist the locked-out/blocked subset of a [`GroupListTable`] as
/// `tg,mode,label` lines, one per talkgroup. Normal-mode entries are
/// dropped: they carry no state worth restoring across runs.
pub fn persist_lockouts_best_effort(
    base: &Path,
    wacn: u32,
    sysid: u16,
    table: &GroupListTable,
    verbose: u8,
) {
    let path = lockout_path(base, wacn, sysid);
    let mut body = String::new();
    for (tg, mode, label) in table.iter() {
        if mode == GroupListMode::Normal {
            continue;
        }
        body.push_str(&format!("{tg},{},{label}\n", mode_tag(mode)));
    }
    let result = path
        .parent()
        .map(std::fs::create_dir_all)
        .unwrap_or(Ok(()))
        .and_then(|()| std::fs::write(&path, body));
    if let Err(e) = result {
        if verbose > 1 {
            warn!(wacn, sysid, error = %e, "failed to persist lockout state");
        }
    }
}

/// Reload persisted lock-out/blocked entries into `table`. Best-effort:
/// a missing file is the common case (no lockouts recorded yet) and is
/// not logged as an error; malformed lines are skipped individually.
pub fn load_lockouts_best_effort(
    base: &Path,
    wacn: u32,
    sysid: u16,
    table: &mut GroupListTable,
    verbose: u8,
) {
    let path = lockout_path(base, wacn, sysid);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            if verbose > 1 {
                warn!(wacn, sysid, error = %e, "failed to load lockout state");
            }
            return;
        }
    };
    for line in text.lines() {
        let mut parts = line.splitn(3, ',');
        let (Some(tg), Some(mode_tag), Some(label)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let (Ok(tg), Some(mode)) = (tg.parse::<u32>(), mode_from_tag(mode_tag)) else {
            continue;
        };
        table.set(tg, mode, label);
    }
}
