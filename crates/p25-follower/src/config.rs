// SPDX-License-Identifier: GPL-2.0-or-later
// Copyright (c) 2026 dsd-neo contributors

//! Configuration resolution: CLI > env > INI > built-in default
//! (spec §6, SPEC_FULL §11).
//!
//! `p25-sm` only knows about the fully-resolved [`p25_sm::SmConfig`]; this
//! module is where the CLI surface, the `DSD_NEO_P25_*` environment
//! overrides, and the persisted INI file are merged into one.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use p25_sm::SmConfig;

use crate::cli::CliArgs;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("INI parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error(transparent)]
    Sm(#[from] p25_sm::ConfigError),
}

const SECTION: &str = "p25";

/// Parsed view of the INI configuration file, keyed by the same field
/// names used by [`resolve_sm_config`]. Deliberately flat: the persisted
/// format names one `[p25]` section (spec §6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniConfig {
    values: HashMap<String, String>,
}

impl IniConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse INI text into the flat key/value view used by this crate.
    pub fn parse(text: &str) -> Result<Self, ConfigLoadError> {
        let ini = ini::Ini::load_from_str(text).map_err(|e| ConfigLoadError::Parse(e.to_string()))?;
        let mut values = HashMap::new();
        if let Some(section) = ini.section(Some(SECTION)) {
            for (k, v) in section.iter() {
                values.insert(k.to_string(), v.to_string());
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Render canonically: a single `[p25]` section with keys sorted, so
    /// that `render(parse(render(cfg))) == render(cfg)` for any `cfg`
    /// (spec §8 "Config round-trip").
    pub fn render(&self) -> String {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        let mut out = format!("[{SECTION}]\n");
        for k in keys {
            out.push_str(&format!("{k} = {}\n", self.values[k]));
        }
        out
    }

    /// Build the canonical INI view of a resolved [`SmConfig`] (used by
    /// `--print-config`).
    pub fn from_sm_config(cfg: &SmConfig) -> Self {
        let mut ini = Self::default();
        ini.set("hangtime_s", cfg.hangtime_s.to_string());
        ini.set("grant_timeout_s", cfg.grant_timeout_s.to_string());
        ini.set("cc_grace_s", cfg.cc_grace_s.to_string());
        ini.set("vc_grace_s", cfg.vc_grace_s.to_string());
        ini.set("mac_hold_s", cfg.mac_hold_s.to_string());
        ini.set("ring_hold_s", cfg.ring_hold_s.to_string());
        ini.set("p1_tail_ms", cfg.p1_tail_ms.to_string());
        ini.set("p2_tail_ms", cfg.p2_tail_ms.to_string());
        ini.set("p1_err_hold_pct", cfg.p1_err_hold_pct.to_string());
        ini.set("p1_err_hold_s", cfg.p1_err_hold_s.to_string());
        ini.set("force_release_extra_s", cfg.force_release_extra_s.to_string());
        ini.set(
            "force_release_margin_s",
            cfg.force_release_margin_s.to_string(),
        );
        ini.set("retune_backoff_s", cfg.retune_backoff_s.to_string());
        ini.set("cc_hunt_interval_s", cfg.cc_hunt_interval_s.to_string());
        ini.set("cc_eval_window_s", cfg.cc_eval_window_s.to_string());
        ini.set(
            "cc_candidate_cooldown_s",
            cfg.cc_candidate_cooldown_s.to_string(),
        );
        ini.set("trunking_enabled", cfg.trunking_enabled.to_string());
        ini.set("prefer_candidates", cfg.prefer_candidates.to_string());
        ini.set(
            "allow_lcw_explicit_retune",
            cfg.allow_lcw_explicit_retune.to_string(),
        );
        ini.set(
            "trunk_tune_data_calls",
            cfg.trunk_tune_data_calls.to_string(),
        );
        ini.set(
            "trunk_tune_private_calls",
            cfg.trunk_tune_private_calls.to_string(),
        );
        ini.set("trunk_tune_enc_calls", cfg.trunk_tune_enc_calls.to_string());
        ini.set(
            "group_list_allow_list",
            cfg.group_list_allow_list.to_string(),
        );
        if let Some(tg) = cfg.tg_hold {
            ini.set("tg_hold", tg.to_string());
        }
        ini.set("enc_lockout_enabled", cfg.enc_lockout_enabled.to_string());
        ini.set("verbose", cfg.verbose.to_string());
        ini
    }
}

/// Source of `DSD_NEO_P25_*` overrides, abstracted so tests don't have to
/// mutate real process environment variables.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Production [`EnvSource`] backed by `std::env`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory [`EnvSource`] for tests.
#[derive(Debug, Default, Clone)]
pub struct MapEnv(pub HashMap<String, String>);

impl EnvSource for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

fn parse_f64(field: &'static str, value: String) -> Result<f64, ConfigLoadError> {
    value
        .parse()
        .map_err(|_| ConfigLoadError::InvalidValue { field, value })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolve one `f64` tunable with strict CLI > env > INI > default
/// precedence (spec §11).
fn resolve_f64(
    field: &'static str,
    cli_value: Option<f64>,
    ini: Option<&IniConfig>,
    env: &dyn EnvSource,
    env_key: &str,
    current: f64,
) -> Result<f64, ConfigLoadError> {
    if let Some(v) = cli_value {
        return Ok(v);
    }
    if let Some(v) = env.get(env_key) {
        return parse_f64(field, v);
    }
    if let Some(ini) = ini {
        if let Some(v) = ini.get(field) {
            return parse_f64(field, v.to_string());
        }
    }
    Ok(current)
}

fn resolve_bool(
    cli_value: bool,
    ini: Option<&IniConfig>,
    ini_key: &str,
    env: &dyn EnvSource,
    env_key: &str,
    current: bool,
) -> bool {
    if cli_value {
        return true;
    }
    if let Some(v) = env.get(env_key).as_deref().and_then(parse_bool) {
        return v;
    }
    if let Some(ini) = ini {
        if let Some(v) = ini.get(ini_key).and_then(parse_bool) {
            return v;
        }
    }
    current
}

/// Resolve the final [`SmConfig`] from CLI arguments, an optional parsed
/// INI file, and an environment source, with strict CLI > env > INI >
/// built-in-default precedence (spec §11). Validates the result before
/// returning it (spec §7 "Fatal: ... missing mandatory INI field when
/// `--print-config` validates").
pub fn resolve_sm_config(
    cli: &CliArgs,
    ini: Option<&IniConfig>,
    env: &dyn EnvSource,
) -> Result<SmConfig, ConfigLoadError> {
    let mut cfg = SmConfig::defaults();

    cfg.hangtime_s = resolve_f64(
        "hangtime_s",
        cli.hangtime_s,
        ini,
        env,
        "DSD_NEO_P25_HANGTIME_S",
        cfg.hangtime_s,
    )?;
    cfg.grant_timeout_s = resolve_f64(
        "grant_timeout_s",
        cli.grant_voice_timeout_s,
        ini,
        env,
        "DSD_NEO_P25_GRANT_VOICE_TIMEOUT_S",
        cfg.grant_timeout_s,
    )?;
    cfg.cc_grace_s = resolve_f64(
        "cc_grace_s",
        cli.cc_grace_s,
        ini,
        env,
        "DSD_NEO_P25_CC_GRACE_S",
        cfg.cc_grace_s,
    )?;
    cfg.vc_grace_s = resolve_f64(
        "vc_grace_s",
        cli.vc_grace_s.or(cli.min_follow_dwell_s),
        ini,
        env,
        "DSD_NEO_P25_VC_GRACE_S",
        cfg.vc_grace_s,
    )?;
    cfg.mac_hold_s = resolve_f64(
        "mac_hold_s",
        cli.mac_hold_s,
        ini,
        env,
        "DSD_NEO_P25_MAC_HOLD_S",
        cfg.mac_hold_s,
    )?;
    cfg.ring_hold_s = resolve_f64(
        "ring_hold_s",
        cli.ring_hold_s,
        ini,
        env,
        "DSD_NEO_P25_RING_HOLD_S",
        cfg.ring_hold_s,
    )?;
    cfg.p1_err_hold_pct = resolve_f64(
        "p1_err_hold_pct",
        cli.p1_err_hold_pct,
        ini,
        env,
        "DSD_NEO_P25_P1_ERR_HOLD_PCT",
        cfg.p1_err_hold_pct,
    )?;
    cfg.p1_err_hold_s = resolve_f64(
        "p1_err_hold_s",
        cli.p1_err_hold_s,
        ini,
        env,
        "DSD_NEO_P25_P1_ERR_HOLD_SEC",
        cfg.p1_err_hold_s,
    )?;
    cfg.force_release_extra_s = resolve_f64(
        "force_release_extra_s",
        cli.force_release_extra_s,
        ini,
        env,
        "DSD_NEO_P25_FORCE_RELEASE_EXTRA_S",
        cfg.force_release_extra_s,
    )?;
    cfg.force_release_margin_s = resolve_f64(
        "force_release_margin_s",
        cli.force_release_margin_s,
        ini,
        env,
        "DSD_NEO_P25_FORCE_RELEASE_MARGIN_S",
        cfg.force_release_margin_s,
    )?;
    cfg.retune_backoff_s = resolve_f64(
        "retune_backoff_s",
        cli.retune_backoff_s,
        ini,
        env,
        "DSD_NEO_P25_RETUNE_BACKOFF_S",
        cfg.retune_backoff_s,
    )?;
    // Not named on the CLI surface (spec §6); INI/env only.
    cfg.p1_tail_ms = resolve_f64(
        "p1_tail_ms",
        None,
        ini,
        env,
        "DSD_NEO_P25_P1_TAIL_MS",
        cfg.p1_tail_ms,
    )?;
    cfg.p2_tail_ms = resolve_f64(
        "p2_tail_ms",
        None,
        ini,
        env,
        "DSD_NEO_P25_P2_TAIL_MS",
        cfg.p2_tail_ms,
    )?;
    cfg.cc_hunt_interval_s = resolve_f64(
        "cc_hunt_interval_s",
        None,
        ini,
        env,
        "DSD_NEO_P25_CC_HUNT_INTERVAL_S",
        cfg.cc_hunt_interval_s,
    )?;
    cfg.cc_eval_window_s = resolve_f64(
        "cc_eval_window_s",
        None,
        ini,
        env,
        "DSD_NEO_P25_CC_EVAL_WINDOW_S",
        cfg.cc_eval_window_s,
    )?;
    cfg.cc_candidate_cooldown_s = resolve_f64(
        "cc_candidate_cooldown_s",
        None,
        ini,
        env,
        "DSD_NEO_P25_CC_CANDIDATE_COOLDOWN_S",
        cfg.cc_candidate_cooldown_s,
    )?;

    cfg.trunking_enabled = if cli.conventional {
        false
    } else {
        resolve_bool(
            cli.trunking,
            ini,
            "trunking_enabled",
            env,
            "DSD_NEO_P25_TRUNKING",
            cfg.trunking_enabled,
        )
    };
    cfg.prefer_candidates = resolve_bool(
        cli.prefer_candidates,
        ini,
        "prefer_candidates",
        env,
        "DSD_NEO_P25_PREFER_CANDIDATES",
        cfg.prefer_candidates,
    );
    cfg.allow_lcw_explicit_retune = resolve_bool(
        cli.lcw_retune,
        ini,
        "allow_lcw_explicit_retune",
        env,
        "DSD_NEO_P25_LCW_RETUNE",
        cfg.allow_lcw_explicit_retune,
    );
    cfg.trunk_tune_data_calls = resolve_bool(
        false,
        ini,
        "trunk_tune_data_calls",
        env,
        "DSD_NEO_P25_TRUNK_TUNE_DATA_CALLS",
        cfg.trunk_tune_data_calls,
    );
    cfg.trunk_tune_private_calls = resolve_bool(
        false,
        ini,
        "trunk_tune_private_calls",
        env,
        "DSD_NEO_P25_TRUNK_TUNE_PRIVATE_CALLS",
        cfg.trunk_tune_private_calls,
    );
    cfg.group_list_allow_list = resolve_bool(
        cli.group_list_allow_list,
        ini,
        "group_list_allow_list",
        env,
        "DSD_NEO_P25_GROUP_LIST_ALLOW",
        cfg.group_list_allow_list,
    );

    cfg.enc_lockout_enabled = if cli.enc_follow {
        false
    } else if cli.enc_lockout {
        true
    } else {
        resolve_bool(
            false,
            ini,
            "enc_lockout_enabled",
            env,
            "DSD_NEO_P25_ENC_LOCKOUT",
            cfg.enc_lockout_enabled,
        )
    };
    // `trunk_tune_enc_calls` is the policy-facing inverse of lock-out:
    // following encrypted calls means lock-out is off.
    cfg.trunk_tune_enc_calls = resolve_bool(
        cli.enc_follow,
        ini,
        "trunk_tune_enc_calls",
        env,
        "DSD_NEO_P25_TRUNK_TUNE_ENC_CALLS",
        !cfg.enc_lockout_enabled,
    );

    cfg.tg_hold = cli.tg_hold.or_else(|| {
        env.get("DSD_NEO_P25_TG_HOLD")
            .and_then(|v| v.parse().ok())
            .or_else(|| ini.and_then(|i| i.get("tg_hold")).and_then(|v| v.parse().ok()))
    });

    cfg.verbose = cli.verbose.max(
        env.get("DSD_NEO_P25_VERBOSE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
    );

    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ini_round_trip_is_canonical() {
        let mut ini = IniConfig::default();
        ini.set("hangtime_s", "0.75");
        ini.set("cc_grace_s", "2");
        let rendered = ini.render();
        let reparsed = IniConfig::parse(&rendered).unwrap();
        assert_eq!(reparsed.render(), rendered);
    }

    #[test]
    fn cli_overrides_env_overrides_ini() {
        let mut cli = CliArgs::default();
        cli.hangtime_s = Some(1.5);

        let mut ini = IniConfig::default();
        ini.set("hangtime_s", "3.0");
        ini.set("cc_grace_s", "9.0");

        let mut env = MapEnv::default();
        env.0
            .insert("DSD_NEO_P25_CC_GRACE_S".to_string(), "5.0".to_string());

        let cfg = resolve_sm_config(&cli, Some(&ini), &env).unwrap();
        assert_eq!(cfg.hangtime_s, 1.5, "CLI wins over env and INI");
        assert_eq!(cfg.cc_grace_s, 5.0, "env wins over INI");
    }

    #[test]
    fn ini_wins_over_default() {
        let cli = CliArgs::default();
        let mut ini = IniConfig::default();
        ini.set("retune_backoff_s", "2.5");
        let env = MapEnv::default();
        let cfg = resolve_sm_config(&cli, Some(&ini), &env).unwrap();
        assert_eq!(cfg.retune_backoff_s, 2.5);
    }

    #[test]
    fn enc_follow_disables_lockout_and_allows_tuning() {
        let mut cli = CliArgs::default();
        cli.enc_follow = true;
        let env = MapEnv::default();
        let cfg = resolve_sm_config(&cli, None, &env).unwrap();
        assert!(!cfg.enc_lockout_enabled);
        assert!(cfg.trunk_tune_enc_calls);
    }

    #[test]
    fn invalid_numeric_override_is_rejected() {
        let cli = CliArgs::default();
        let mut env = MapEnv::default();
        env.0.insert(
            "DSD_NEO_P25_HANGTIME_S".to_string(),
            "not-a-number".to_string(),
        );
        let result = resolve_sm_config(&cli, None, &env);
        assert!(matches!(result, Err(ConfigLoadError::InvalidValue { .. })));
    }

    #[test]
    fn validation_failure_surfaces_as_config_error() {
        let mut cli = CliArgs::default();
        cli.hangtime_s = Some(0.0);
        let env = MapEnv::default();
        let result = resolve_sm_config(&cli, None, &env);
        assert!(matches!(result, Err(ConfigLoadError::Sm(_))));
    }
}
