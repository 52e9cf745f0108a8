//! Transport and sink configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SplitShareError};

/// Port the original share servers listen on
pub const DEFAULT_PORT: u16 = 12345;

/// Client-side delivery settings
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on establishing one connection
    pub connect_timeout: Duration,
    /// Upper bound on a single blocked write
    pub write_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// What the sink does with a connection's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// Replace the file content with the latest payload
    ///
    /// A connection that closes without sending data leaves the file as it
    /// was; the file is not truncated just because a connection was
    /// accepted, unlike the earlier share servers.
    #[default]
    Overwrite,
    /// Add each payload after the previous ones
    Append,
}

/// Server-side ingestion settings
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub bind_addr: String,
    pub port: u16,
    /// File receiving the share data
    pub path: PathBuf,
    pub mode: SinkMode,
    /// Idle limit while reading one connection
    pub read_timeout: Duration,
    /// Connections sending more than this many bytes are discarded
    pub max_payload: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            path: PathBuf::from("demo.txt"),
            mode: SinkMode::Overwrite,
            read_timeout: Duration::from_secs(30),
            max_payload: 16 * 1024 * 1024,
        }
    }
}

impl SinkConfig {
    /// Create config from environment variables
    ///
    /// # Errors
    /// Returns `InvalidArgument` if a numeric variable does not parse
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SPLITSHARE_SINK_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(port) = std::env::var("SPLITSHARE_SINK_PORT") {
            config.port = parse_env("SPLITSHARE_SINK_PORT", &port)?;
        }
        if let Ok(path) = std::env::var("SPLITSHARE_SINK_FILE") {
            config.path = PathBuf::from(path);
        }
        if let Ok(append) = std::env::var("SPLITSHARE_SINK_APPEND") {
            if parse_env::<bool>("SPLITSHARE_SINK_APPEND", &append)? {
                config.mode = SinkMode::Append;
            }
        }
        if let Ok(secs) = std::env::var("SPLITSHARE_SINK_READ_TIMEOUT_SECS") {
            config.read_timeout =
                Duration::from_secs(parse_env("SPLITSHARE_SINK_READ_TIMEOUT_SECS", &secs)?);
        }
        if let Ok(max) = std::env::var("SPLITSHARE_SINK_MAX_PAYLOAD") {
            config.max_payload = parse_env("SPLITSHARE_SINK_MAX_PAYLOAD", &max)?;
        }

        Ok(config)
    }

    /// Address string suitable for `TcpListener::bind`
    #[must_use]
    pub fn listen_addr(&self) -> String {
        if self.bind_addr.contains(':') {
            format!("[{}]:{}", self.bind_addr, self.port)
        } else {
            format!("{}:{}", self.bind_addr, self.port)
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SplitShareError::invalid(format!("{name}='{raw}' is not valid")))
}
