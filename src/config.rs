//! Configuration
//!
//! `VortexConfig` is the on-disk (JSON) description of one parameter set;
//! `Tuning` holds performance knobs that never change the output and can be
//! overridden from the environment.

#![forbid(unsafe_code)]

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::CosetTableCache;
use crate::merkle::HashFunc;
use crate::params::{Params, ParamsError};
use crate::ringsis::SisParams;

/// Environment variable overriding [`Tuning::transversal_chunk`].
pub const ENV_TRANSVERSAL_CHUNK: &str = "VORTEX_TRANSVERSAL_CHUNK";

/// Default number of columns per transversal-hash task.
pub const DEFAULT_TRANSVERSAL_CHUNK: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Parameter set, as read from JSON. Missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VortexConfig {
    pub blow_up_factor: usize,
    pub nb_columns: usize,
    pub max_nb_rows: usize,
    pub sis: SisParams,
    pub leaf_hash: HashFunc,
    /// Columns the verifier asks to open.
    pub num_opened_columns: usize,
    /// Commit with raw-column leaves instead of SIS digests.
    pub sis_replaced: bool,
}

impl Default for VortexConfig {
    fn default() -> Self {
        Self {
            blow_up_factor: 2,
            nb_columns: 16,
            max_nb_rows: 32,
            sis: SisParams::STD,
            leaf_hash: HashFunc::Blake3,
            num_opened_columns: 8,
            sis_replaced: false,
        }
    }
}

impl VortexConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    /// Build parameters with tuning taken from the environment.
    pub fn to_params_r(&self) -> Result<Params, ConfigError> {
        let mut cache = CosetTableCache::new();
        Ok(Params::new_with_cache_r(
            self.blow_up_factor,
            self.nb_columns,
            self.max_nb_rows,
            self.sis,
            self.leaf_hash,
            &mut cache,
            &Tuning::from_env(),
        )?)
    }
}

/// Output-neutral performance knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Columns per transversal-hash task.
    pub transversal_chunk: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self { transversal_chunk: DEFAULT_TRANSVERSAL_CHUNK }
    }
}

impl Tuning {
    /// Defaults, overridden by `VORTEX_TRANSVERSAL_CHUNK` when it parses to a
    /// positive integer.
    pub fn from_env() -> Self {
        let mut t = Self::default();
        if let Ok(raw) = std::env::var(ENV_TRANSVERSAL_CHUNK) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => t.transversal_chunk = n,
                _ => tracing::warn!(value = %raw, "ignoring invalid {}", ENV_TRANSVERSAL_CHUNK),
            }
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_takes_defaults() {
        let cfg = VortexConfig::from_json_str(r#"{ "nb_columns": 8, "leaf_hash": "sha256" }"#).unwrap();
        assert_eq!(cfg.nb_columns, 8);
        assert_eq!(cfg.leaf_hash, HashFunc::Sha256);
        assert_eq!(cfg.blow_up_factor, 2);
        assert_eq!(cfg.sis, SisParams::STD);
        assert_eq!(cfg.num_opened_columns, 8);
        assert!(!cfg.sis_replaced);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            VortexConfig::from_json_str(r#"{ "nb_colums": 8 }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let cfg = VortexConfig {
            blow_up_factor: 4,
            sis: SisParams { log_two_bound: 8, log_two_degree: 5 },
            num_opened_columns: 12,
            sis_replaced: true,
            ..VortexConfig::default()
        };
        let s = serde_json::to_string(&cfg).unwrap();
        assert_eq!(VortexConfig::from_json_str(&s).unwrap(), cfg);
    }

    #[test]
    fn invalid_shape_surfaces_params_error() {
        let cfg = VortexConfig { nb_columns: 10, ..VortexConfig::default() };
        assert!(matches!(
            cfg.to_params_r(),
            Err(ConfigError::Params(ParamsError::BadNbColumns(10)))
        ));
    }
}
