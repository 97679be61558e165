//! Agent configuration.
//!
//! Configuration is TOML, deserialized with serde and validated twice:
//! shape errors surface at parse time (a reactor entry without `latency`
//! never deserializes), structural errors (duplicate names, cycles,
//! latency past look-ahead) surface during agent construction. Both are
//! fatal before the first tick, per the error policy.
//!
//! # Example
//!
//! ```toml
//! name = "surveyor"
//! final_tick = 100
//! sync_failure_limit = 3
//!
//! [clock]
//! mode = "real_time"
//! seconds_per_tick = 1.0
//!
//! [[reactor]]
//! name = "ticker"
//! kind = "pulse"
//! latency = 0
//! look_ahead = 0
//!
//! [[reactor]]
//! name = "mirror"
//! kind = "relay"
//! latency = 1
//! log = true
//! params = { source = "ticker" }
//! ```
//!
//! # Environment overrides
//!
//! - `REFLEX_FINAL_TICK`: replaces `final_tick`
//! - `REFLEX_LOG_DIR`: replaces `log_dir`

use crate::clock::{Clock, RealTimeClock, StepClock};
use crate::factory::FactoryError;
use reflex_reactor::ReactorError;
use reflex_types::{ErrorCode, ReactorName, Tick, TimelineName};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration and agent-construction errors. All fatal before tick 0.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config '{path}': {message}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        message: String,
    },

    /// Config file is not valid TOML or misses required fields.
    #[error("cannot parse config: {0}")]
    Parse(String),

    /// An environment override holds an unusable value.
    #[error("invalid value in ${var}: {message}")]
    InvalidEnvVar {
        /// Variable name.
        var: &'static str,
        /// What was wrong.
        message: String,
    },

    /// Clock parameters are out of range.
    #[error("invalid clock: {0}")]
    InvalidClock(String),

    /// Observation log directory could not be prepared.
    #[error("cannot prepare log dir '{path}': {message}")]
    LogDir {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        message: String,
    },

    /// Two reactor entries share one name.
    #[error("duplicate reactor name '{0}'")]
    DuplicateReactor(ReactorName),

    /// Two reactors both declare a timeline internal.
    #[error("timeline '{timeline}' owned by both '{first}' and '{second}'")]
    DuplicateOwner {
        /// The timeline in dispute.
        timeline: TimelineName,
        /// First declared owner.
        first: ReactorName,
        /// Second declared owner.
        second: ReactorName,
    },

    /// A reactor subscribed to a timeline it owns.
    #[error("reactor '{reactor}' subscribes to its own timeline '{timeline}'")]
    SelfSubscription {
        /// The reactor at fault.
        reactor: ReactorName,
        /// The timeline declared both internal and external.
        timeline: TimelineName,
    },

    /// An external timeline has no owner in the configuration.
    #[error("reactor '{reactor}' observes '{timeline}' but nothing owns it")]
    UnownedTimeline {
        /// The subscribing reactor.
        reactor: ReactorName,
        /// The orphaned timeline.
        timeline: TimelineName,
    },

    /// The reactor dependency graph contains a cycle.
    #[error("dependency cycle through reactor '{reactor}'")]
    DependencyCycle {
        /// A reactor on the cycle.
        reactor: ReactorName,
    },

    /// A reactor's latency exceeds its look-ahead.
    #[error("reactor '{reactor}': latency {latency} exceeds look-ahead {look_ahead}")]
    LatencyExceedsLookAhead {
        /// The misconfigured reactor.
        reactor: ReactorName,
        /// Configured latency.
        latency: Tick,
        /// Configured look-ahead.
        look_ahead: Tick,
    },

    /// Reactor construction failed.
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// A reactor's `handle_init` failed.
    #[error("reactor '{reactor}' failed to initialize: {source}")]
    ReactorInit {
        /// The failing reactor.
        reactor: ReactorName,
        /// The reactor's own error.
        source: ReactorError,
    },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "CONFIG_READ_FAILED",
            Self::Parse(_) => "CONFIG_PARSE_FAILED",
            Self::InvalidEnvVar { .. } => "CONFIG_INVALID_ENV_VAR",
            Self::InvalidClock(_) => "CONFIG_INVALID_CLOCK",
            Self::LogDir { .. } => "CONFIG_LOG_DIR_FAILED",
            Self::DuplicateReactor(_) => "CONFIG_DUPLICATE_REACTOR",
            Self::DuplicateOwner { .. } => "CONFIG_DUPLICATE_OWNER",
            Self::SelfSubscription { .. } => "CONFIG_SELF_SUBSCRIPTION",
            Self::UnownedTimeline { .. } => "CONFIG_UNOWNED_TIMELINE",
            Self::DependencyCycle { .. } => "CONFIG_DEPENDENCY_CYCLE",
            Self::LatencyExceedsLookAhead { .. } => "CONFIG_LATENCY_EXCEEDS_LOOK_AHEAD",
            Self::Factory(_) => "CONFIG_FACTORY_FAILED",
            Self::ReactorInit { .. } => "CONFIG_REACTOR_INIT_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::LogDir { .. })
    }
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Agent name, used in logs.
    pub name: String,

    /// Tick after which the agent shuts down cleanly. `None` runs until
    /// a shutdown is requested.
    #[serde(default)]
    pub final_tick: Option<Tick>,

    /// Clock selection.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Consecutive synchronization failures tolerated per reactor
    /// before the agent stops.
    #[serde(default = "default_sync_failure_limit")]
    pub sync_failure_limit: u32,

    /// Directory for the observation transcript. Defaults to
    /// `./reflex-logs` when any reactor has `log = true`.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Reactor entries, in configuration order.
    #[serde(default, rename = "reactor")]
    pub reactors: Vec<ReactorConfig>,
}

fn default_sync_failure_limit() -> u32 {
    3
}

impl AgentConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or missing
    /// required fields (a reactor without `latency`, for one).
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads a config file and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on read, parse, or override failure.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Applies `REFLEX_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] on unparsable values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var("REFLEX_FINAL_TICK") {
            let tick = raw.parse::<Tick>().map_err(|_| ConfigError::InvalidEnvVar {
                var: "REFLEX_FINAL_TICK",
                message: format!("'{raw}' is not a tick"),
            })?;
            self.final_tick = Some(tick);
        }
        if let Ok(raw) = std::env::var("REFLEX_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(raw));
        }
        Ok(())
    }
}

/// Clock selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClockConfig {
    /// Deterministic stepping clock, for replay and tests.
    Step {
        /// Idle sleep between polls, in seconds.
        #[serde(default)]
        sleep_seconds: f64,
        /// Polls per externally visible tick.
        #[serde(default = "default_steps_per_tick")]
        steps_per_tick: u64,
    },
    /// Wall-clock driven ticks.
    RealTime {
        /// Tick duration in seconds.
        seconds_per_tick: f64,
    },
}

fn default_steps_per_tick() -> u64 {
    1
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::RealTime {
            seconds_per_tick: 1.0,
        }
    }
}

impl ClockConfig {
    /// Builds the configured clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidClock`] on out-of-range parameters.
    pub fn build(&self) -> Result<Box<dyn Clock>, ConfigError> {
        match *self {
            Self::Step {
                sleep_seconds,
                steps_per_tick,
            } => {
                if sleep_seconds < 0.0 {
                    return Err(ConfigError::InvalidClock(
                        "sleep_seconds must be non-negative".to_string(),
                    ));
                }
                Ok(Box::new(StepClock::new(sleep_seconds, steps_per_tick)))
            }
            Self::RealTime { seconds_per_tick } => {
                if seconds_per_tick <= 0.0 {
                    return Err(ConfigError::InvalidClock(
                        "seconds_per_tick must be positive".to_string(),
                    ));
                }
                Ok(Box::new(RealTimeClock::new(seconds_per_tick)))
            }
        }
    }
}

/// One reactor entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ReactorConfig {
    /// Unique reactor name.
    pub name: String,

    /// Factory kind to construct.
    pub kind: String,

    /// Ticks from goal receipt to earliest achievable start. Required;
    /// its absence is a fatal parse error.
    pub latency: Tick,

    /// Planning horizon in ticks. Defaults to the agent's `final_tick`.
    #[serde(default)]
    pub look_ahead: Option<Tick>,

    /// Whether published observations go to the transcript.
    #[serde(default)]
    pub log: bool,

    /// Kind-specific parameters, passed to the factory verbatim.
    #[serde(default)]
    pub params: toml::Table,
}

impl ReactorConfig {
    /// Resolves defaults against the agent configuration.
    #[must_use]
    pub fn resolve(&self, final_tick: Option<Tick>) -> ReactorSpec {
        ReactorSpec {
            name: ReactorName::new(&self.name),
            latency: self.latency,
            look_ahead: self.look_ahead.or(final_tick).unwrap_or(Tick::MAX),
            log: self.log,
            params: self.params.clone(),
        }
    }
}

/// Fully resolved construction request handed to the factory.
#[derive(Debug, Clone)]
pub struct ReactorSpec {
    /// Unique reactor name.
    pub name: ReactorName,
    /// Resolved latency.
    pub latency: Tick,
    /// Resolved look-ahead.
    pub look_ahead: Tick,
    /// Transcript flag.
    pub log: bool,
    /// Kind-specific parameters.
    pub params: toml::Table,
}

impl ReactorSpec {
    /// String parameter lookup helper for factories.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(toml::Value::as_str)
    }
}
