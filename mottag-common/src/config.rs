//! Configuration structures for the simulator and its sinks
//!
//! Every value is fixed for the lifetime of a run. Configuration can come from
//! a YAML file, from command-line flags, or both (flags win).

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Number of antennas in the testbed.
pub const ANTENNA_COUNT: usize = 4;

/// Floor applied to the tick interval when the configured delay is not positive.
pub const MIN_TICK_INTERVAL_S: f64 = 1e-3;

/// Longest tick interval accepted, in seconds (one day).
pub const MAX_TICK_INTERVAL_S: f64 = 86_400.0;

/// Shortest broker keep-alive interval accepted, in seconds.
pub const MIN_KEEP_ALIVE_S: u64 = 5;

/// Default per-sink queue capacity (ticks buffered before drops).
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

fn default_delay() -> f64 {
    0.2
}
fn default_speed() -> f64 {
    2.0
}
fn default_rssi_at_1m() -> f64 {
    -40.0
}
fn default_pathloss_exponent() -> f64 {
    2.0
}
fn default_noise_std() -> f64 {
    1.0
}
fn default_threshold() -> f64 {
    2.0
}
fn default_trail() -> usize {
    400
}
fn default_true() -> bool {
    true
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_store_timeout_ms() -> u64 {
    2000
}
fn default_broker() -> String {
    "localhost".to_string()
}
fn default_mqtt_port() -> u16 {
    1883
}
fn default_topic() -> String {
    "rssi/feed".to_string()
}
fn default_client_id() -> String {
    "mottag-sim".to_string()
}
fn default_keep_alive_s() -> u64 {
    60
}

/// Simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Antenna coordinates `[x, y]`, exactly four
    pub antennas: Vec<[f64; 2]>,
    /// Delay between ticks in seconds
    #[serde(default = "default_delay")]
    pub delay_s: f64,
    /// Nominal target speed (units/s)
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// RSSI at 1 unit distance (dBm)
    #[serde(default = "default_rssi_at_1m")]
    pub rssi_at_1m: f64,
    /// Path-loss exponent
    #[serde(default = "default_pathloss_exponent")]
    pub pathloss_exponent: f64,
    /// RSSI noise standard deviation (dB)
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
    /// center4 RSSI closeness threshold (dBm)
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Number of recent points kept for the visualization trail (0 disables it)
    #[serde(default = "default_trail")]
    pub trail: usize,
    /// RNG seed; drawn from entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Stop after this many ticks; run until interrupted when absent
    #[serde(default)]
    pub max_ticks: Option<u64>,
    /// Pace ticks against the wall clock
    #[serde(default = "default_true")]
    pub real_time: bool,
    /// Sink selection
    #[serde(default)]
    pub sink: SinkConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            antennas: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
            delay_s: default_delay(),
            speed: default_speed(),
            rssi_at_1m: default_rssi_at_1m(),
            pathloss_exponent: default_pathloss_exponent(),
            noise_std: default_noise_std(),
            threshold: default_threshold(),
            trail: default_trail(),
            seed: None,
            max_ticks: None,
            real_time: true,
            sink: SinkConfig::default(),
        }
    }
}

/// Telemetry transport selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkMode {
    /// No network transport
    #[default]
    None,
    /// HTTP PUT to a remote key-value document store
    #[serde(alias = "firebase")]
    DocumentStore,
    /// Publish to a topic on a message broker
    #[serde(alias = "mqtt")]
    Topic,
}

impl fmt::Display for SinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkMode::None => write!(f, "none"),
            SinkMode::DocumentStore => write!(f, "document_store"),
            SinkMode::Topic => write!(f, "topic"),
        }
    }
}

impl std::str::FromStr for SinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(SinkMode::None),
            "firebase" | "document_store" | "document-store" | "rest" => {
                Ok(SinkMode::DocumentStore)
            }
            "mqtt" | "topic" => Ok(SinkMode::Topic),
            _ => Err(format!("unknown sink mode: {s}")),
        }
    }
}

/// Document-store (REST) sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    /// Base URL of the store, e.g. `https://example-rtdb.firebaseio.com`
    pub base_url: String,
    /// Tracked device identifier; the feed document is keyed by it
    pub device_id: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

impl DocumentStoreConfig {
    /// Creates a document-store configuration with the default timeout.
    pub fn new(base_url: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            device_id: device_id.into(),
            timeout_ms: default_store_timeout_ms(),
        }
    }

    /// URL of the feed document: `{base_url}/feed/{device_id}.json`.
    pub fn feed_url(&self) -> String {
        format!(
            "{}/feed/{}.json",
            self.base_url.trim_end_matches('/'),
            self.device_id
        )
    }

    /// Request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Topic-publish (MQTT) sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Broker host
    #[serde(default = "default_broker")]
    pub broker: String,
    /// Broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Topic to publish on
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Username; only used together with `password`
    #[serde(default)]
    pub username: Option<String>,
    /// Password; only used together with `username`
    #[serde(default)]
    pub password: Option<String>,
    /// MQTT client identifier
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Address of the simulated tag reported in every event
    pub tag_addr: String,
    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive_s")]
    pub keep_alive_s: u64,
}

impl TopicConfig {
    /// Creates a topic configuration with defaults for everything but the tag address.
    pub fn new(tag_addr: impl Into<String>) -> Self {
        Self {
            broker: default_broker(),
            port: default_mqtt_port(),
            topic: default_topic(),
            username: None,
            password: None,
            client_id: default_client_id(),
            tag_addr: tag_addr.into(),
            keep_alive_s: default_keep_alive_s(),
        }
    }

    /// Credentials, present only when both username and password are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

/// Sink selection and tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Network transport
    #[serde(default)]
    pub mode: SinkMode,
    /// Settings for [`SinkMode::DocumentStore`]
    #[serde(default)]
    pub document_store: Option<DocumentStoreConfig>,
    /// Settings for [`SinkMode::Topic`]
    #[serde(default)]
    pub topic: Option<TopicConfig>,
    /// Print readings to stdout every tick
    #[serde(default = "default_true")]
    pub console: bool,
    /// Ticks buffered per sink before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            mode: SinkMode::None,
            document_store: None,
            topic: None,
            console: true,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

fn require_finite(name: &str, value: f64) -> Result<(), Error> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::Config(format!("{name} must be finite, got {value}")))
    }
}

fn require_non_negative(name: &str, value: f64) -> Result<(), Error> {
    require_finite(name, value)?;
    if value < 0.0 {
        return Err(Error::Config(format!("{name} must be >= 0, got {value}")));
    }
    Ok(())
}

impl SimConfig {
    /// Parses a configuration from a YAML string.
    ///
    /// # Example
    /// ```
    /// use mottag_common::SimConfig;
    ///
    /// let yaml = r#"
    /// antennas: [[0, 0], [10, 0], [10, 10], [0, 10]]
    /// delay_s: 0.5
    /// "#;
    ///
    /// let config = SimConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.delay_s, 0.5);
    /// assert_eq!(config.threshold, 2.0);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Serializes the configuration to a YAML string.
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Tick interval in seconds, kept within
    /// [`MIN_TICK_INTERVAL_S`]..=[`MAX_TICK_INTERVAL_S`].
    pub fn tick_interval_s(&self) -> f64 {
        self.delay_s
            .max(MIN_TICK_INTERVAL_S)
            .min(MAX_TICK_INTERVAL_S)
    }

    /// Tick interval as a Duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_s())
    }

    /// Validates the configuration.
    ///
    /// Every failure is a [`Error::Config`] and is fatal at startup.
    pub fn validate(&self) -> Result<(), Error> {
        if self.antennas.len() != ANTENNA_COUNT {
            return Err(Error::Config(format!(
                "exactly {ANTENNA_COUNT} antennas are required, got {}",
                self.antennas.len()
            )));
        }
        for (i, [x, y]) in self.antennas.iter().enumerate() {
            require_finite(&format!("antenna {i} x"), *x)?;
            require_finite(&format!("antenna {i} y"), *y)?;
        }

        require_finite("delay_s", self.delay_s)?;
        if self.delay_s > MAX_TICK_INTERVAL_S {
            return Err(Error::Config(format!(
                "delay_s must be at most {MAX_TICK_INTERVAL_S} s, got {}",
                self.delay_s
            )));
        }
        require_non_negative("speed", self.speed)?;
        require_finite("rssi_at_1m", self.rssi_at_1m)?;
        require_finite("pathloss_exponent", self.pathloss_exponent)?;
        require_non_negative("noise_std", self.noise_std)?;
        require_non_negative("threshold", self.threshold)?;

        self.sink.validate()
    }
}

impl SinkConfig {
    /// Validates that the selected transport has its settings.
    pub fn validate(&self) -> Result<(), Error> {
        if self.queue_capacity == 0 {
            return Err(Error::Config("sink queue_capacity must be > 0".into()));
        }
        match self.mode {
            SinkMode::None => Ok(()),
            SinkMode::DocumentStore => {
                let store = self.document_store.as_ref().ok_or_else(|| {
                    Error::Config("document_store mode requires base_url and device_id".into())
                })?;
                if store.base_url.is_empty() || store.device_id.is_empty() {
                    return Err(Error::Config(
                        "document_store base_url and device_id must not be empty".into(),
                    ));
                }
                if !(store.base_url.starts_with("http://")
                    || store.base_url.starts_with("https://"))
                {
                    return Err(Error::Config(format!(
                        "document_store base_url must be an http(s) URL, got {}",
                        store.base_url
                    )));
                }
                Ok(())
            }
            SinkMode::Topic => {
                let topic = self.topic.as_ref().ok_or_else(|| {
                    Error::Config("topic mode requires broker settings and tag_addr".into())
                })?;
                if topic.broker.is_empty() || topic.topic.is_empty() {
                    return Err(Error::Config("topic broker and topic must not be empty".into()));
                }
                if topic.tag_addr.is_empty() {
                    return Err(Error::Config("topic tag_addr must not be empty".into()));
                }
                if topic.keep_alive_s < MIN_KEEP_ALIVE_S {
                    return Err(Error::Config(format!(
                        "topic keep_alive_s must be >= {MIN_KEEP_ALIVE_S}, got {}",
                        topic.keep_alive_s
                    )));
                }
                Ok(())
            }
        }
    }
}
