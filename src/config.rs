use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Weights of the soft objective terms. A weight of zero or less disables
/// the term and none of its auxiliary variables are created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub teacher_preference: f64,
    pub same_day_repetition: f64,
    pub load_balance: f64,
    pub group_gap: f64,
    pub room_change: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            teacher_preference: 10.0,
            same_day_repetition: 30.0,
            load_balance: 1.0,
            group_gap: 0.0,
            room_change: 0.0,
        }
    }
}

/// Tuning knobs for one solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget handed to the engine.
    pub time_limit_secs: f64,
    /// Parallel search workers handed to the engine.
    pub workers: u32,
    pub random_seed: i32,
    pub log_search: bool,
    pub weights: Weights,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 60.0,
            workers: 8,
            random_seed: 1234,
            log_search: false,
            weights: Weights::default(),
        }
    }
}

impl SolverConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays `TIMETABLE_*` environment variables on top of `self`.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlays values found through `lookup` on top of `self`. Keys that
    /// `lookup` does not know keep their current value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(&lookup, "TIMETABLE_TIME_LIMIT_SECS", &mut self.time_limit_secs)?;
        override_from(&lookup, "TIMETABLE_WORKERS", &mut self.workers)?;
        override_from(&lookup, "TIMETABLE_RANDOM_SEED", &mut self.random_seed)?;
        override_from(&lookup, "TIMETABLE_LOG_SEARCH", &mut self.log_search)?;

        let w = &mut self.weights;
        override_from(&lookup, "TIMETABLE_WEIGHT_TEACHER_PREFERENCE", &mut w.teacher_preference)?;
        override_from(&lookup, "TIMETABLE_WEIGHT_SAME_DAY_REPETITION", &mut w.same_day_repetition)?;
        override_from(&lookup, "TIMETABLE_WEIGHT_LOAD_BALANCE", &mut w.load_balance)?;
        override_from(&lookup, "TIMETABLE_WEIGHT_GROUP_GAP", &mut w.group_gap)?;
        override_from(&lookup, "TIMETABLE_WEIGHT_ROOM_CHANGE", &mut w.room_change)?;

        self.validate()?;
        Ok(self)
    }

    /// Rejects settings the engine cannot accept: a time limit that is not a
    /// positive number, zero workers, a negative seed or a non-finite weight.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key, value: String| Err(ConfigError::InvalidValue { key, value });

        if !(self.time_limit_secs.is_finite() && self.time_limit_secs > 0.0) {
            return invalid("time_limit_secs", self.time_limit_secs.to_string());
        }
        if self.workers == 0 {
            return invalid("workers", self.workers.to_string());
        }
        if self.random_seed < 0 {
            return invalid("random_seed", self.random_seed.to_string());
        }

        let w = &self.weights;
        let weights = [
            ("weights.teacher_preference", w.teacher_preference),
            ("weights.same_day_repetition", w.same_day_repetition),
            ("weights.load_balance", w.load_balance),
            ("weights.group_gap", w.group_gap),
            ("weights.room_change", w.room_change),
        ];
        match weights.into_iter().find(|(_, value)| !value.is_finite()) {
            Some((key, value)) => invalid(key, value.to_string()),
            None => Ok(()),
        }
    }
}

fn override_from<F, T>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw.clone() })?;
    }
    Ok(())
}
