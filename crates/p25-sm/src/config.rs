// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! SM tunables.
//!
//! `SmConfig` is the resolved, validated set of knobs named in spec §6. The
//! CLI/INI/env resolution that produces one lives in `p25-follower`; this
//! crate only knows about the final values, cached once on `SmContext`.

use thiserror::Error;

/// Construction-time configuration error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: String },
}

/// Resolved SM tunables (spec §3 `SmContext.config`).
///
/// All durations are in seconds. Defaults match spec §6.
#[derive(Debug, Clone, PartialEq)]
pub struct SmConfig {
    pub hangtime_s: f64,
    pub grant_timeout_s: f64,
    pub cc_grace_s: f64,
    pub vc_grace_s: f64,
    pub mac_hold_s: f64,
    pub ring_hold_s: f64,
    pub p1_tail_ms: f64,
    pub p2_tail_ms: f64,
    pub p1_err_hold_pct: f64,
    pub p1_err_hold_s: f64,
    pub force_release_extra_s: f64,
    pub force_release_margin_s: f64,
    pub retune_backoff_s: f64,

    /// `cc_hunt_interval_s` from §4.4 "try_next_cc" tick cadence.
    pub cc_hunt_interval_s: f64,
    /// §4.4 candidate-eval window before a candidate is cooled down.
    pub cc_eval_window_s: f64,
    /// §4.2 cooldown applied to a candidate that failed its eval window.
    pub cc_candidate_cooldown_s: f64,

    /// `-T` / `-Y`.
    pub trunking_enabled: bool,
    /// `-^` prefer CC candidates during hunt.
    pub prefer_candidates: bool,
    /// `-j` enable optional retune from LCW explicit update (open question
    /// in spec §9: kept behind this explicit opt-in flag).
    pub allow_lcw_explicit_retune: bool,
    /// Grant policy knobs (§4.3).
    pub trunk_tune_data_calls: bool,
    pub trunk_tune_private_calls: bool,
    pub trunk_tune_enc_calls: bool,
    /// `-W` treat group list as allow list.
    pub group_list_allow_list: bool,
    /// `-I <tg>`: TG hold, if any.
    pub tg_hold: Option<u32>,
    /// `--enc-lockout` / `--enc-follow`.
    pub enc_lockout_enabled: bool,

    /// Verbosity level gating persistence logging (§4.2).
    pub verbose: u8,
}

impl SmConfig {
    /// Built-in defaults, per spec §6.
    pub fn defaults() -> Self {
        Self {
            hangtime_s: 0.75,
            grant_timeout_s: 4.0,
            cc_grace_s: 2.0,
            vc_grace_s: 0.75,
            mac_hold_s: 0.75,
            ring_hold_s: 0.75,
            p1_tail_ms: 180.0,
            p2_tail_ms: 360.0,
            p1_err_hold_pct: 8.0,
            p1_err_hold_s: 2.0,
            force_release_extra_s: 0.5,
            force_release_margin_s: 0.25,
            retune_backoff_s: 1.0,
            cc_hunt_interval_s: 2.0,
            cc_eval_window_s: 3.0,
            cc_candidate_cooldown_s: 10.0,
            trunking_enabled: true,
            prefer_candidates: false,
            allow_lcw_explicit_retune: false,
            trunk_tune_data_calls: false,
            trunk_tune_private_calls: true,
            trunk_tune_enc_calls: false,
            group_list_allow_list: false,
            tg_hold: None,
            enc_lockout_enabled: true,
            verbose: 0,
        }
    }

    /// Reject non-positive durations (all config durations must be
    /// positive per spec §3 invariants; `min_follow_dwell` exists only as
    /// an alias of `vc_grace_s` in the CLI surface, so it is not a
    /// distinct field here).
    pub fn validate(&self) -> Result<(), ConfigError> {
        macro_rules! check {
            ($field:ident) => {
                if self.$field <= 0.0 {
                    return Err(ConfigError::NotPositive {
                        field: stringify!($field),
                        value: self.$field.to_string(),
                    });
                }
            };
        }
        check!(hangtime_s);
        check!(grant_timeout_s);
        check!(cc_grace_s);
        check!(vc_grace_s);
        check!(mac_hold_s);
        check!(ring_hold_s);
        check!(p1_tail_ms);
        check!(p2_tail_ms);
        check!(p1_err_hold_pct);
        check!(p1_err_hold_s);
        check!(force_release_extra_s);
        check!(force_release_margin_s);
        check!(retune_backoff_s);
        check!(cc_hunt_interval_s);
        check!(cc_eval_window_s);
        check!(cc_candidate_cooldown_s);
        Ok(())
    }

    /// `ring_hold_s` clamped by `force_release_extra_s` per §6
    /// ("clamped by `extra`").
    pub fn effective_ring_hold_s(&self) -> f64 {
        self.ring_hold_s.min(self.force_release_extra_s)
    }
}

impl Default for SmConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SmConfig::defaults().validate().is_ok());
    }

    #[test]
    fn rejects_nonpositive_hangtime() {
        let mut cfg = SmConfig::defaults();
        cfg.hangtime_s = 0.0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NotPositive {
                field: "hangtime_s",
                value: "0".to_string()
            })
        );
    }

    #[test]
    fn ring_hold_clamped_by_extra() {
        let mut cfg = SmConfig::defaults();
        cfg.ring_hold_s = 5.0;
        cfg.force_release_extra_s = 0.5;
        assert_eq!(cfg.effective_ring_hold_s(), 0.5);
    }
}
