use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

const TICK_ENV: &str = "POSETRACK_TICK_MS";
const SEED_ENV: &str = "POSETRACK_SEED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub tick_interval_ms: u64,
    pub repetition_probability: f64,
    pub accuracy_step: f64,
    pub accuracy_cap: f64,
    pub feedback_probability: f64,
    /// Fixed seed for the tick's random draws; entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            repetition_probability: 0.3,
            accuracy_step: 0.01,
            accuracy_cap: 0.95,
            feedback_probability: 0.1,
            rng_seed: None,
        }
    }
}

impl TrackerConfig {
    /// Reads the config file if it exists, then applies env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed config {}: {}", path.display(), err);
                TrackerConfig::default()
            })
        } else {
            TrackerConfig::default()
        };

        Ok(config.with_env_overrides().sanitized())
    }

    pub fn from_env() -> Self {
        TrackerConfig::default().with_env_overrides().sanitized()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(TICK_ENV) {
            match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.tick_interval_ms = ms,
                _ => warn!("{TICK_ENV}={value:?} is not a positive integer; ignoring"),
            }
        }
        if let Ok(value) = std::env::var(SEED_ENV) {
            match value.trim().parse::<u64>() {
                Ok(seed) => self.rng_seed = Some(seed),
                Err(_) => warn!("{SEED_ENV}={value:?} is not a u64; ignoring"),
            }
        }
        self
    }

    /// Clamps every field into its valid range.
    pub fn sanitized(mut self) -> Self {
        let defaults = TrackerConfig::default();
        self.tick_interval_ms = self.tick_interval_ms.max(1);
        self.repetition_probability = unit_or(self.repetition_probability, defaults.repetition_probability);
        self.feedback_probability = unit_or(self.feedback_probability, defaults.feedback_probability);
        self.accuracy_cap = unit_or(self.accuracy_cap, defaults.accuracy_cap);
        self.accuracy_step = if self.accuracy_step.is_finite() {
            self.accuracy_step.max(0.0)
        } else {
            defaults.accuracy_step
        };
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn unit_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}
