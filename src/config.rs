//! Configuration loading: a YAML file layered with environment overrides,
//! plus the two required provider secrets read straight from the process
//! environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "autoscaler", about = "Redis Cloud autoscaling control plane")]
pub struct Args {
    #[arg(short = 'f', long, env = "AUTOSCALER_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,
}

/// Autoscaling thresholds and poll intervals, mirroring the original
/// `config.yaml` block. Every field has a default so a missing config file
/// still produces a runnable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub throughput_threshold: f64,
    pub memory_threshold: f64,
    pub cpu_threshold: f64,
    pub latency_threshold_ms: f64,
    pub payload_size_threshold_kb: f64,

    pub prometheus_server_url: String,

    #[serde(with = "humantime_serde")]
    pub prometheus_query_period: Duration,
    #[serde(with = "humantime_serde")]
    pub autoscale_query_period: Duration,

    pub cloud_api_query_interval_seconds: u64,
    pub cloud_api_query_interval_seconds_autoscale: u64,

    pub memory_scaling_percentage: f64,
    pub throughput_scaling_percentage: f64,

    /// Address the HTTP API binds to.
    pub bind_address: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            throughput_threshold: 0.8,
            memory_threshold: 0.8,
            cpu_threshold: 0.6,
            latency_threshold_ms: 3.0,
            payload_size_threshold_kb: 3.0,
            prometheus_server_url: "http://localhost:9090".to_string(),
            prometheus_query_period: Duration::from_secs(3600),
            autoscale_query_period: Duration::from_secs(300),
            cloud_api_query_interval_seconds: 3600,
            cloud_api_query_interval_seconds_autoscale: 60,
            memory_scaling_percentage: 20.0,
            throughput_scaling_percentage: 20.0,
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// The provider credentials, always sourced from the environment and never
/// from the YAML file.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub api_key: String,
    pub api_secret: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("REDIS_CLOUD_API_KEY")
            .map_err(|_| Error::Config("REDIS_CLOUD_API_KEY is not set".to_string()))?;
        let api_secret = std::env::var("REDIS_CLOUD_API_SECRET")
            .map_err(|_| Error::Config("REDIS_CLOUD_API_SECRET is not set".to_string()))?;
        Ok(Secrets { api_key, api_secret })
    }
}

impl Config {
    /// Layers `path` (if it exists) over the documented defaults, then
    /// applies `AUTOSCALER_`-prefixed environment overrides, matching the
    /// teacher's figment+clap convention.
    pub fn load(path: &PathBuf) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if path.exists() {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed("AUTOSCALER_"));

        figment
            .extract()
            .map_err(|e| Error::Config(format!("failed to load {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.throughput_threshold, 0.8);
        assert_eq!(config.memory_threshold, 0.8);
        assert_eq!(config.cpu_threshold, 0.6);
        assert_eq!(config.cloud_api_query_interval_seconds, 3600);
        assert_eq!(config.cloud_api_query_interval_seconds_autoscale, 60);
    }

    #[test]
    fn load_falls_back_to_defaults_when_file_missing() {
        let config = Config::load(&PathBuf::from("/nonexistent/config.yaml")).unwrap();
        assert_eq!(config.memory_scaling_percentage, 20.0);
    }

    #[test]
    fn env_override_wins_over_default() {
        std::env::set_var("AUTOSCALER_CPU_THRESHOLD", "0.5");
        let config = Config::load(&PathBuf::from("/nonexistent/config.yaml")).unwrap();
        std::env::remove_var("AUTOSCALER_CPU_THRESHOLD");
        assert_eq!(config.cpu_threshold, 0.5);
    }
}
