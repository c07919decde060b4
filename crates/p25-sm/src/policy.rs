// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Grant policy (spec §4.3) and the closed status-tag enum used to report
//! policy/lifecycle outcomes to the UI without leaking internal state
//! (DESIGN NOTES: "define as a closed enum, not free-form strings").

use std::fmt;

/// Stable, UI-facing status tags. `Display` stringifies at the boundary;
/// internal code should match on the enum, never on its rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    GrantAllowed,
    GrantBlockedData,
    GrantBlockedPrivateDisabled,
    GrantBlockedEncDisabled,
    GrantBlockedTgHold,
    GrantBlockedGroupListDeny,
    GrantBlockedBackoff,
    GrantResolveFailed,
    ReleaseHangtimeExpired,
    ReleaseGrantTimeout,
    ReleaseCallTermination,
    ReleaseSafetyNetHard,
    ReleaseSafetyNetNosync,
    ReleasePosthangWatchdog,
    ReleaseEndPttDrain,
    ReleaseP1TduDrain,
    ReleaseEncLockout,
    TickSafetyNet,
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusTag::GrantAllowed => "grant-allowed",
            StatusTag::GrantBlockedData => "grant-blocked-data",
            StatusTag::GrantBlockedPrivateDisabled => "grant-blocked-private-disabled",
            StatusTag::GrantBlockedEncDisabled => "grant-blocked-enc-disabled",
            StatusTag::GrantBlockedTgHold => "grant-blocked-tg-hold",
            StatusTag::GrantBlockedGroupListDeny => "grant-blocked-group-list-deny",
            StatusTag::GrantBlockedBackoff => "grant-blocked-backoff",
            StatusTag::GrantResolveFailed => "grant-resolve-failed",
            StatusTag::ReleaseHangtimeExpired => "hangtime-expired",
            StatusTag::ReleaseGrantTimeout => "grant-timeout",
            StatusTag::ReleaseCallTermination => "call-termination",
            StatusTag::ReleaseSafetyNetHard => "safety-net-hard",
            StatusTag::ReleaseSafetyNetNosync => "safety-net-nosync",
            StatusTag::ReleasePosthangWatchdog => "posthang-wd",
            StatusTag::ReleaseEndPttDrain => "end-ptt-drain",
            StatusTag::ReleaseP1TduDrain => "p1-tdu-drain",
            StatusTag::ReleaseEncLockout => "enc-lockout",
            StatusTag::TickSafetyNet => "tick-safety-net",
        };
        f.write_str(s)
    }
}

/// Service-option bits relevant to grant policy (§4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceBits {
    pub is_data: bool,
    pub is_encrypted: bool,
}

impl ServiceBits {
    pub fn from_raw(svc_bits: u8) -> Self {
        Self {
            is_data: svc_bits & 0x10 != 0,
            is_encrypted: svc_bits & 0x40 != 0,
        }
    }
}

/// Group-list membership mode for a talkgroup, as maintained externally
/// by the group table (mirrors the real decoder's `"DE"`/`"B"`/allow
/// conventions named in §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupListMode {
    /// Normal, followable.
    Normal,
    /// "DE" -- locked out (e.g. by ENC lock-out).
    Denied,
    /// "B" -- blocked.
    Blocked,
}

/// A grant event as seen by policy evaluation. Individual vs. group and
/// data-vs-voice are distinguished by `is_individual` / `svc.is_data`.
#[derive(Debug, Clone, Copy)]
pub struct GrantEvent {
    pub is_individual: bool,
    pub svc: ServiceBits,
    pub tg: u32,
    pub src: Option<u32>,
}

/// Policy options, drawn from `SmConfig` (kept separate so `grant_allowed`
/// stays a pure function of its three arguments, per §4.3).
#[derive(Debug, Clone, Copy)]
pub struct PolicyOptions {
    pub trunk_tune_data_calls: bool,
    pub trunk_tune_private_calls: bool,
    pub trunk_tune_enc_calls: bool,
    pub group_list_allow_list: bool,
    pub tg_hold: Option<u32>,
}

/// Outcome of a grant policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantDecision {
    Allow,
    Reject(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    DataCallsDisabled,
    PrivateCallsDisabled,
    EncCallsDisabled,
    TgHoldMismatch,
    GroupListDenied,
}

impl RejectReason {
    pub fn status_tag(self) -> StatusTag {
        match self {
            RejectReason::DataCallsDisabled => StatusTag::GrantBlockedData,
            RejectReason::PrivateCallsDisabled => StatusTag::GrantBlockedPrivateDisabled,
            RejectReason::EncCallsDisabled => StatusTag::GrantBlockedEncDisabled,
            RejectReason::TgHoldMismatch => StatusTag::GrantBlockedTgHold,
            RejectReason::GroupListDenied => StatusTag::GrantBlockedGroupListDeny,
        }
    }
}

/// Evaluate whether a grant should be followed, per §4.3. Rules are
/// evaluated in order; the first rejection wins. `key_clear` reports
/// whether the patch tracker marks `ev.tg` (or its enclosing
/// super-group) as key-clear, and `group_list_mode` the TG's current
/// group-list membership mode.
///
/// This function has no side effects: the caller is responsible for the
/// one-shot encryption lock-out emission and for recording RID<->TG on
/// allow, exactly as described in §4.3.
pub fn grant_allowed(
    opts: &PolicyOptions,
    ev: &GrantEvent,
    key_clear: bool,
    group_list_mode: GroupListMode,
) -> GrantDecision {
    if ev.svc.is_data && !opts.trunk_tune_data_calls {
        return GrantDecision::Reject(RejectReason::DataCallsDisabled);
    }

    if ev.is_individual {
        if !opts.trunk_tune_private_calls {
            return GrantDecision::Reject(RejectReason::PrivateCallsDisabled);
        }
        if ev.svc.is_encrypted && !opts.trunk_tune_enc_calls {
            return GrantDecision::Reject(RejectReason::EncCallsDisabled);
        }
        if let Some(hold) = opts.tg_hold {
            if hold != ev.tg {
                return GrantDecision::Reject(RejectReason::TgHoldMismatch);
            }
        }
        return GrantDecision::Allow;
    }

    // Group grant.
    if ev.svc.is_encrypted && !opts.trunk_tune_enc_calls && !key_clear {
        return GrantDecision::Reject(RejectReason::EncCallsDisabled);
    }
    if matches!(group_list_mode, GroupListMode::Denied | GroupListMode::Blocked) {
        return GrantDecision::Reject(RejectReason::GroupListDenied);
    }
    if let Some(hold) = opts.tg_hold {
        if hold != ev.tg {
            return GrantDecision::Reject(RejectReason::TgHoldMismatch);
        }
    }

    GrantDecision::Allow
}
