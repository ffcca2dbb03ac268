//! Command-line arguments and their merge over the file configuration

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mottag_common::{
    DocumentStoreConfig, LogLevel, SimConfig, SinkMode, TopicConfig, ANTENNA_COUNT,
};

/// mottag-sim - synthetic RSSI generator and center4 position estimator
#[derive(Parser, Debug)]
#[command(name = "mottag-sim")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (YAML); flags override its values
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Antenna positions in order: `--ant 0,0 10,0 10,10 0,10` or one
    /// `--ant` per antenna. Write negative coordinates as `(-3,0)` or `--ant=-3,0`
    #[arg(
        long = "ant",
        value_name = "X,Y",
        value_parser = parse_antenna,
        num_args = 1..=ANTENNA_COUNT
    )]
    pub antennas: Vec<[f64; 2]>,

    /// Seconds between ticks
    #[arg(long)]
    pub delay: Option<f64>,

    /// center4 RSSI closeness threshold (dBm)
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// RSSI at 1 unit distance (dBm)
    #[arg(long = "rssi1m", allow_negative_numbers = true)]
    pub rssi_at_1m: Option<f64>,

    /// Path-loss exponent
    #[arg(long = "n")]
    pub pathloss_exponent: Option<f64>,

    /// RSSI noise standard deviation (dB)
    #[arg(long)]
    pub noise: Option<f64>,

    /// Nominal target speed (units/s)
    #[arg(long)]
    pub speed: Option<f64>,

    /// Trail length kept for visualization (0 disables it)
    #[arg(long)]
    pub trail: Option<usize>,

    /// Telemetry transport: none, firebase or mqtt
    #[arg(long)]
    pub mode: Option<SinkMode>,

    /// Do not print readings to stdout
    #[arg(long)]
    pub no_console: bool,

    /// Document-store base URL
    #[arg(long, value_name = "URL")]
    pub store_url: Option<String>,

    /// Device identifier keying the feed document
    #[arg(long)]
    pub device_id: Option<String>,

    /// MQTT broker host
    #[arg(long)]
    pub mqtt_broker: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    pub mqtt_port: Option<u16>,

    /// MQTT topic
    #[arg(long)]
    pub mqtt_topic: Option<String>,

    /// MQTT username (used only with --mqtt-password)
    #[arg(long)]
    pub mqtt_username: Option<String>,

    /// MQTT password (used only with --mqtt-username)
    #[arg(long)]
    pub mqtt_password: Option<String>,

    /// Tag address reported in MQTT events
    #[arg(long)]
    pub tag_addr: Option<String>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many ticks
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Run ticks back to back instead of pacing them
    #[arg(long)]
    pub no_pacing: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

/// Parses `X,Y` or `(X,Y)`.
pub fn parse_antenna(s: &str) -> Result<[f64; 2], String> {
    let trimmed = s.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed);

    let mut parts = inner.split(',').map(str::trim);
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected X,Y, got '{s}'"));
    };
    let x: f64 = x.parse().map_err(|_| format!("invalid X in '{s}'"))?;
    let y: f64 = y.parse().map_err(|_| format!("invalid Y in '{s}'"))?;
    Ok([x, y])
}

impl Args {
    /// Overrides `config` with every flag that was given.
    pub fn apply_to(&self, config: &mut SimConfig) {
        if !self.antennas.is_empty() {
            config.antennas = self.antennas.clone();
        }
        if let Some(v) = self.delay {
            config.delay_s = v;
        }
        if let Some(v) = self.threshold {
            config.threshold = v;
        }
        if let Some(v) = self.rssi_at_1m {
            config.rssi_at_1m = v;
        }
        if let Some(v) = self.pathloss_exponent {
            config.pathloss_exponent = v;
        }
        if let Some(v) = self.noise {
            config.noise_std = v;
        }
        if let Some(v) = self.speed {
            config.speed = v;
        }
        if let Some(v) = self.trail {
            config.trail = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.ticks.is_some() {
            config.max_ticks = self.ticks;
        }
        if self.no_pacing {
            config.real_time = false;
        }

        let sink = &mut config.sink;
        if let Some(mode) = self.mode {
            sink.mode = mode;
        }
        if self.no_console {
            sink.console = false;
        }

        if self.store_url.is_some() || self.device_id.is_some() {
            let store = sink
                .document_store
                .get_or_insert_with(|| DocumentStoreConfig::new("", ""));
            if let Some(url) = &self.store_url {
                store.base_url = url.clone();
            }
            if let Some(id) = &self.device_id {
                store.device_id = id.clone();
            }
        }

        let topic_flags = self.mqtt_broker.is_some()
            || self.mqtt_port.is_some()
            || self.mqtt_topic.is_some()
            || self.mqtt_username.is_some()
            || self.mqtt_password.is_some()
            || self.tag_addr.is_some();
        if topic_flags {
            let topic = sink.topic.get_or_insert_with(|| TopicConfig::new(""));
            if let Some(v) = &self.mqtt_broker {
                topic.broker = v.clone();
            }
            if let Some(v) = self.mqtt_port {
                topic.port = v;
            }
            if let Some(v) = &self.mqtt_topic {
                topic.topic = v.clone();
            }
            if let Some(v) = &self.mqtt_username {
                topic.username = Some(v.clone());
            }
            if let Some(v) = &self.mqtt_password {
                topic.password = Some(v.clone());
            }
            if let Some(v) = &self.tag_addr {
                topic.tag_addr = v.clone();
            }
        }
    }
}

/// Validated settings for one run.
#[derive(Debug)]
pub struct RunOptions {
    /// Effective configuration
    pub config: SimConfig,
}

impl TryFrom<Args> for RunOptions {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        let mut config = match &args.config_file {
            Some(path) => SimConfig::from_yaml_file(path).with_context(|| {
                format!("Failed to load configuration from {}", path.display())
            })?,
            None => SimConfig::default(),
        };

        if !args.antennas.is_empty() && args.antennas.len() != ANTENNA_COUNT {
            bail!(
                "--ant needs exactly {} positions, got {}",
                ANTENNA_COUNT,
                args.antennas.len()
            );
        }

        args.apply_to(&mut config);
        config.validate().context("Invalid configuration")?;

        Ok(Self { config })
    }
}
