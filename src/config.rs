use crate::estimation::confidence::ConfidenceBounds;
use crate::estimation::eta::EtaParams;
use crate::estimation::history::HistoryParams;
use crate::estimation::interval::IntervalParams;
use crate::estimation::route::{DEFAULT_OSRM_PROFILE, DEFAULT_OSRM_URL, RoutingParams};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub eta: Option<EtaSection>,
    #[serde(default)]
    pub routing: Option<RoutingSection>,
    #[serde(default)]
    pub interval: Option<IntervalSection>,
    #[serde(default)]
    pub confidence: Option<ConfidenceSection>,
    #[serde(default)]
    pub history: Option<HistorySection>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EtaSection {
    pub default_speed_kmh: Option<f64>,
    pub min_speed_kmh: Option<f64>,
    pub max_speed_kmh: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingSection {
    pub server_url: Option<String>,
    pub profile: Option<String>,
    /// Overall timeout budget for one routing query, retries included.
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IntervalSection {
    pub default_seconds: Option<u32>,
    pub min_seconds: Option<u32>,
    pub max_seconds: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfidenceSection {
    pub min_percent: Option<f64>,
    pub max_percent: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistorySection {
    pub window_days: Option<u32>,
    pub adjustment_floor: Option<f64>,
    pub adjustment_ceiling: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Terminal,
    Stop,
}

/// Static reference data: one candidate destination for the fleet.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub kind: DestinationKind,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Checks bound ordering and reference data before anything is built
    /// from this config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let eta = self.eta_params();
        if eta.min_speed_kmh <= 0.0 || eta.min_speed_kmh > eta.max_speed_kmh {
            return Err(ConfigError::Invalid(format!(
                "speed bounds out of order: min {} max {}",
                eta.min_speed_kmh, eta.max_speed_kmh
            )));
        }
        let interval = self.interval_params();
        if interval.min_seconds > interval.max_seconds {
            return Err(ConfigError::Invalid(format!(
                "interval bounds out of order: min {} max {}",
                interval.min_seconds, interval.max_seconds
            )));
        }
        let confidence = self.confidence_bounds();
        if confidence.min_percent < 0.0
            || confidence.max_percent > 100.0
            || confidence.min_percent > confidence.max_percent
        {
            return Err(ConfigError::Invalid(format!(
                "confidence bounds out of order: min {} max {}",
                confidence.min_percent, confidence.max_percent
            )));
        }
        let history = self.history_params();
        if history.adjustment_floor > history.adjustment_ceiling {
            return Err(ConfigError::Invalid(format!(
                "history adjustment bounds out of order: floor {} ceiling {}",
                history.adjustment_floor, history.adjustment_ceiling
            )));
        }
        if self.destinations.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [[destinations]] entry is required".to_string(),
            ));
        }
        for destination in &self.destinations {
            if !(-90.0..=90.0).contains(&destination.latitude)
                || !(-180.0..=180.0).contains(&destination.longitude)
            {
                return Err(ConfigError::Invalid(format!(
                    "destination {} has invalid coordinates",
                    destination.id
                )));
            }
        }
        Ok(())
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn eta_params(&self) -> EtaParams {
        let defaults = EtaParams::default();
        match &self.eta {
            Some(section) => EtaParams {
                default_speed_kmh: section
                    .default_speed_kmh
                    .unwrap_or(defaults.default_speed_kmh),
                min_speed_kmh: section.min_speed_kmh.unwrap_or(defaults.min_speed_kmh),
                max_speed_kmh: section.max_speed_kmh.unwrap_or(defaults.max_speed_kmh),
            },
            None => defaults,
        }
    }

    pub fn routing_params(&self) -> RoutingParams {
        let defaults = RoutingParams::default();
        let fallback_speed_kmh = self.eta_params().default_speed_kmh;
        match &self.routing {
            Some(section) => RoutingParams {
                server_url: section
                    .server_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OSRM_URL.to_string()),
                profile: section
                    .profile
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OSRM_PROFILE.to_string()),
                timeout: section
                    .timeout_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeout),
                max_retries: section.max_retries.unwrap_or(defaults.max_retries),
                fallback_speed_kmh,
            },
            None => RoutingParams {
                fallback_speed_kmh,
                ..defaults
            },
        }
    }

    pub fn interval_params(&self) -> IntervalParams {
        let defaults = IntervalParams::default();
        match &self.interval {
            Some(section) => IntervalParams {
                default_seconds: section.default_seconds.unwrap_or(defaults.default_seconds),
                min_seconds: section.min_seconds.unwrap_or(defaults.min_seconds),
                max_seconds: section.max_seconds.unwrap_or(defaults.max_seconds),
            },
            None => defaults,
        }
    }

    pub fn confidence_bounds(&self) -> ConfidenceBounds {
        let defaults = ConfidenceBounds::default();
        match &self.confidence {
            Some(section) => ConfidenceBounds {
                min_percent: section.min_percent.unwrap_or(defaults.min_percent),
                max_percent: section.max_percent.unwrap_or(defaults.max_percent),
            },
            None => defaults,
        }
    }

    pub fn history_params(&self) -> HistoryParams {
        let defaults = HistoryParams::default();
        match &self.history {
            Some(section) => HistoryParams {
                window_days: section.window_days.unwrap_or(defaults.window_days),
                adjustment_floor: section
                    .adjustment_floor
                    .unwrap_or(defaults.adjustment_floor),
                adjustment_ceiling: section
                    .adjustment_ceiling
                    .unwrap_or(defaults.adjustment_ceiling),
            },
            None => defaults,
        }
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }
}
