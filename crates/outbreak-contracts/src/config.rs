//! Simulation configuration.
//!
//! `SimConfig` is deserialized from TOML. Every field has a default, so an
//! empty document is a valid configuration. `validate()` must pass before a
//! run starts: the supervisor refuses to spawn workers with undefined or
//! nonsensical termination thresholds.
//!
//! Example:
//! ```toml
//! max_messages = 50
//! deadlock_timeout_s = 5.0
//! seed = 7
//! protected_roles = ["coordinator", "executor"]
//! defense_mode = "vaccine_active"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    agent::AgentRole,
    defense::DefenseMode,
    error::{OutbreakError, OutbreakResult},
};

/// Upper bound for every duration setting: one day.
pub const MAX_DURATION_S: f64 = 86_400.0;
const MAX_DURATION_MS: u64 = 86_400_000;

/// All knobs consumed by the orchestration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Stop once this many messages have been dequeued across all mailboxes.
    pub max_messages: u64,
    /// Stop once this much wall-clock time has elapsed.
    pub max_time_s: f64,
    /// Idle window after which all-empty mailboxes count as a deadlock.
    pub deadlock_timeout_s: f64,
    /// Inject the attack on the first tick where the dequeued total reaches this.
    pub inject_after_messages: u64,
    /// Seed for target and prompt selection.
    pub seed: u64,
    /// Roles never chosen as attack targets.
    pub protected_roles: Vec<AgentRole>,
    /// Inject this prompt instead of drawing one at random.
    pub attack_prompt_id: Option<u32>,
    /// Period of the supervisor tick.
    pub tick_interval_ms: u64,
    /// How long an idle worker waits on its mailbox before re-checking.
    pub idle_poll_ms: u64,
    /// Ceiling on worker teardown after termination.
    pub shutdown_grace_s: f64,
    /// Maximum messages kept in each agent's memory.
    pub memory_capacity: usize,
    pub defense_mode: DefenseMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_messages: 100,
            max_time_s: 300.0,
            deadlock_timeout_s: 10.0,
            inject_after_messages: 2,
            seed: 42,
            protected_roles: AgentRole::default_protected(),
            attack_prompt_id: None,
            tick_interval_ms: 50,
            idle_poll_ms: 100,
            shutdown_grace_s: 5.0,
            memory_capacity: 50,
            defense_mode: DefenseMode::None,
        }
    }
}

impl SimConfig {
    /// Parse `s` as TOML and validate the result.
    pub fn from_toml_str(s: &str) -> OutbreakResult<Self> {
        let config: SimConfig = toml::from_str(s).map_err(|e| OutbreakError::ConfigError {
            reason: format!("failed to parse simulation TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the TOML file at `path`.
    pub fn from_file(path: &Path) -> OutbreakResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| OutbreakError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject thresholds that would leave termination undefined.
    pub fn validate(&self) -> OutbreakResult<()> {
        fn positive_secs(name: &str, value: f64) -> OutbreakResult<()> {
            if value > 0.0 && value <= MAX_DURATION_S && Duration::try_from_secs_f64(value).is_ok() {
                Ok(())
            } else {
                Err(OutbreakError::ConfigError {
                    reason: format!(
                        "{} must be a positive number of seconds no greater than {}, got {}",
                        name, MAX_DURATION_S, value
                    ),
                })
            }
        }

        fn interval_ms(name: &str, value: u64) -> OutbreakResult<()> {
            if value > 0 && value <= MAX_DURATION_MS {
                Ok(())
            } else {
                Err(OutbreakError::ConfigError {
                    reason: format!(
                        "{} must be between 1 and {} milliseconds, got {}",
                        name, MAX_DURATION_MS, value
                    ),
                })
            }
        }

        if self.max_messages == 0 {
            return Err(OutbreakError::ConfigError {
                reason: "max_messages must be at least 1".to_string(),
            });
        }
        positive_secs("max_time_s", self.max_time_s)?;
        positive_secs("deadlock_timeout_s", self.deadlock_timeout_s)?;
        positive_secs("shutdown_grace_s", self.shutdown_grace_s)?;
        interval_ms("tick_interval_ms", self.tick_interval_ms)?;
        interval_ms("idle_poll_ms", self.idle_poll_ms)?;
        if self.memory_capacity == 0 {
            return Err(OutbreakError::ConfigError {
                reason: "memory_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    // Duration helpers clamp to the validated range.

    pub fn max_time(&self) -> Duration {
        clamped_secs(self.max_time_s)
    }

    pub fn deadlock_timeout(&self) -> Duration {
        clamped_secs(self.deadlock_timeout_s)
    }

    pub fn shutdown_grace(&self) -> Duration {
        clamped_secs(self.shutdown_grace_s)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.min(MAX_DURATION_MS))
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms.min(MAX_DURATION_MS))
    }

    /// JSON snapshot embedded in the outcome record.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn clamped_secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.clamp(0.0, MAX_DURATION_S)).unwrap_or_default()
}
