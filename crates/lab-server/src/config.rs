use std::{
    env,
    net::{AddrParseError, Ipv4Addr, SocketAddr},
};

use market_sim::{find_preset, IntervalGranularity, ScenarioPreset};

const DEFAULT_LISTEN_PORT: u16 = 8080;
const DEFAULT_MODE: RunMode = RunMode::Run;
const DEFAULT_REPLAY_OUTPUT_PATH: &str = "artifacts/replay.csv";
const DEFAULT_LOG_FILTER: &str = "info";

const ENV_ADDR: &str = "BESS_LAB_ADDR";
const ENV_MODE: &str = "BESS_LAB_MODE";
const ENV_INTERVAL: &str = "BESS_LAB_INTERVAL";
const ENV_PRESET: &str = "BESS_LAB_PRESET";
const ENV_REPLAY_OUTPUT: &str = "BESS_LAB_REPLAY_OUTPUT";
const ENV_LOG: &str = "BESS_LAB_LOG";

/// Whether the tick loop starts with the server or waits for `POST /step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Run,
    Paused,
}

impl RunMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "run" => Some(Self::Run),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub mode: RunMode,
    pub granularity: IntervalGranularity,
    pub preset: Option<ScenarioPreset>,
    pub replay_output_path: String,
    pub log_filter: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BESS_LAB_ADDR is not a valid socket address: {0}")]
    InvalidListenAddr(#[source] AddrParseError),
    #[error("BESS_LAB_MODE must be one of: run, paused")]
    InvalidMode,
    #[error("BESS_LAB_INTERVAL must be one of: 15m, 5m")]
    InvalidInterval,
    #[error("BESS_LAB_PRESET names no known preset: {0}")]
    UnknownPreset(String),
    #[error("BESS_LAB_REPLAY_OUTPUT must not be empty or whitespace")]
    InvalidReplayOutputPath,
    #[error("BESS_LAB_LOG must not be empty or whitespace")]
    InvalidLogFilter,
    #[error("{0} contains non-unicode data")]
    NonUnicode(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = match read_env(ENV_ADDR)? {
            Some(value) => value.parse().map_err(ConfigError::InvalidListenAddr)?,
            None => SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_LISTEN_PORT)),
        };

        let mode = match read_env(ENV_MODE)? {
            Some(value) => RunMode::parse(&value).ok_or(ConfigError::InvalidMode)?,
            None => DEFAULT_MODE,
        };

        let granularity = match read_env(ENV_INTERVAL)? {
            Some(value) => {
                IntervalGranularity::parse(&value).ok_or(ConfigError::InvalidInterval)?
            }
            None => IntervalGranularity::default(),
        };

        let preset = match read_env(ENV_PRESET)? {
            Some(value) => Some(find_preset(&value).ok_or(ConfigError::UnknownPreset(value))?),
            None => None,
        };

        let replay_output_path = non_blank(
            read_env(ENV_REPLAY_OUTPUT)?,
            DEFAULT_REPLAY_OUTPUT_PATH,
            ConfigError::InvalidReplayOutputPath,
        )?;

        let log_filter = non_blank(
            read_env(ENV_LOG)?,
            DEFAULT_LOG_FILTER,
            ConfigError::InvalidLogFilter,
        )?;

        Ok(Self {
            listen_addr,
            mode,
            granularity,
            preset,
            replay_output_path,
            log_filter,
        })
    }
}

fn read_env(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicode(key)),
    }
}

fn non_blank(
    value: Option<String>,
    default_value: &str,
    blank_error: ConfigError,
) -> Result<String, ConfigError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(blank_error),
        Some(value) => Ok(value),
        None => Ok(default_value.to_owned()),
    }
}
