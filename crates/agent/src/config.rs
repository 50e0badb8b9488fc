//! Agent configuration

use anyhow::{bail, Result};
use serde::Deserialize;
use snapshot_lib::{PercentPolicy, SnapshotOptions};
use std::time::Duration;

use crate::runner::RunnerConfig;

/// Agent configuration, read from `SNAPSHOT_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Cluster name attached to log events
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Seconds between snapshots; 0 disables the check
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Time budget for a single snapshot cycle
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_secs: u64,

    /// Use the pod service account instead of a kubeconfig
    #[serde(default = "default_in_cluster")]
    pub in_cluster: bool,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Cap utilization percentages at 100
    #[serde(default)]
    pub clamp_percent: bool,

    /// Write each snapshot as a JSON line to stdout
    #[serde(default = "default_print_snapshot")]
    pub print_snapshot: bool,

    /// Take a single snapshot and exit
    #[serde(default)]
    pub once: bool,
}

fn default_cluster_name() -> String {
    std::env::var("CLUSTER_NAME").unwrap_or_else(|_| "default".to_string())
}

fn default_check_interval() -> u64 {
    300
}

fn default_cycle_timeout() -> u64 {
    90
}

fn default_in_cluster() -> bool {
    true
}

fn default_api_port() -> u16 {
    8080
}

fn default_print_snapshot() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cluster_name: default_cluster_name(),
            check_interval_secs: default_check_interval(),
            cycle_timeout_secs: default_cycle_timeout(),
            in_cluster: default_in_cluster(),
            api_port: default_api_port(),
            clamp_percent: false,
            print_snapshot: default_print_snapshot(),
            once: false,
        }
    }
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("SNAPSHOT").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid configuration, using defaults");
            AgentConfig::default()
        }))
    }

    /// Reject configurations the agent cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 && !self.once {
            bail!("snapshot check is disabled (SNAPSHOT_CHECK_INTERVAL_SECS=0)");
        }
        if self.cycle_timeout_secs == 0 {
            bail!("SNAPSHOT_CYCLE_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }

    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            percent_policy: if self.clamp_percent {
                PercentPolicy::ClampAt100
            } else {
                PercentPolicy::Unclamped
            },
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            interval: Duration::from_secs(self.check_interval_secs),
            cycle_timeout: Duration::from_secs(self.cycle_timeout_secs),
            options: self.snapshot_options(),
            print_snapshot: self.print_snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        assert_eq!(config.check_interval_secs, 300);
        assert!(config.in_cluster);
        assert!(config.validate().is_ok());
        assert_eq!(config.snapshot_options().percent_policy, PercentPolicy::Unclamped);
    }

    #[test]
    fn test_disabled_interval_rejected() {
        let config = AgentConfig {
            check_interval_secs: 0,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());

        let once = AgentConfig {
            check_interval_secs: 0,
            once: true,
            ..AgentConfig::default()
        };
        assert!(once.validate().is_ok());
    }

    #[test]
    fn test_clamp_policy() {
        let config = AgentConfig {
            clamp_percent: true,
            ..AgentConfig::default()
        };
        assert_eq!(config.snapshot_options().percent_policy, PercentPolicy::ClampAt100);
        assert_eq!(config.runner_config().cycle_timeout, Duration::from_secs(90));
    }
}
