// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Server Configuration
//!
//! Defaults, overridden by environment variables, overridden by
//! command-line flags.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Log verbosity, spelled the way the command line accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Level name as understood by `tracing` filters.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Mock server configuration.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Client-facing address (WebSocket and plain HTTP info/health).
    pub listen_addr: SocketAddr,
    /// Address of the Prometheus metrics endpoint.
    pub metrics_addr: SocketAddr,
    /// Directory holding `<req>.json` fixtures.
    pub fixtures_dir: PathBuf,
    /// Directory holding `public_key.pem` and `private_key.pem`.
    pub keys_dir: PathBuf,
    pub log_level: LogLevel,
    /// Idle timeout in seconds. 0 keeps connections open until the client leaves.
    pub idle_timeout_secs: u64,
    /// Maximum message size in bytes.
    pub max_message_size: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        MockConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5666)),
            metrics_addr: SocketAddr::from(([127, 0, 0, 1], 5667)),
            fixtures_dir: PathBuf::from("responses"),
            keys_dir: PathBuf::from("keys"),
            log_level: LogLevel::Info,
            idle_timeout_secs: 0,
            max_message_size: 1_048_576, // 1 MB
        }
    }
}

impl MockConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable lookup.
    ///
    /// Values that fail to parse are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(parsed) = lookup("MOCK_LISTEN_ADDR").and_then(|v| v.parse().ok()) {
            config.listen_addr = parsed;
        }

        if let Some(parsed) = lookup("MOCK_METRICS_ADDR").and_then(|v| v.parse().ok()) {
            config.metrics_addr = parsed;
        }

        if let Some(val) = lookup("MOCK_FIXTURES_DIR") {
            config.fixtures_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("MOCK_KEYS_DIR") {
            config.keys_dir = PathBuf::from(val);
        }

        if let Some(parsed) = lookup("MOCK_LOG_LEVEL").and_then(|v| v.parse().ok()) {
            config.log_level = parsed;
        }

        if let Some(parsed) = lookup("MOCK_IDLE_TIMEOUT").and_then(|v| v.parse().ok()) {
            config.idle_timeout_secs = parsed;
        }

        if let Some(parsed) = lookup("MOCK_MAX_MESSAGE_SIZE").and_then(|v| v.parse().ok()) {
            config.max_message_size = parsed;
        }

        config
    }

    /// Returns the idle timeout, or `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Filter directive enabling this crate's logs at the configured level.
    pub fn log_directive(&self) -> String {
        format!("fnos_mock_server={}", self.log_level.as_filter())
    }
}

/// Command-line flags. Each one, when given, wins over the environment.
#[derive(Debug, Default, Parser)]
#[command(name = "fnos-mock-server", version, about = "Mock fnOS WebSocket server")]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Log level
    #[arg(long, value_enum, ignore_case = true)]
    pub log_level: Option<LogLevel>,

    /// Directory with <req>.json response fixtures
    #[arg(long)]
    pub fixtures_dir: Option<PathBuf>,

    /// Directory with the RSA key pair
    #[arg(long)]
    pub keys_dir: Option<PathBuf>,
}

impl Cli {
    pub fn apply(self, config: &mut MockConfig) {
        if let Some(port) = self.port {
            config.listen_addr.set_port(port);
        }
        if let Some(host) = self.host {
            config.listen_addr.set_ip(host);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(dir) = self.fixtures_dir {
            config.fixtures_dir = dir;
        }
        if let Some(dir) = self.keys_dir {
            config.keys_dir = dir;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = MockConfig::default();

        assert_eq!(config.listen_addr.port(), 5666);
        assert_eq!(config.metrics_addr.to_string(), "127.0.0.1:5667");
        assert_eq!(config.fixtures_dir, PathBuf::from("responses"));
        assert_eq!(config.keys_dir, PathBuf::from("keys"));
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.idle_timeout(), None);
        assert_eq!(config.max_message_size, 1_048_576);
    }

    #[test]
    fn test_env_overrides() {
        let config = MockConfig::from_lookup(lookup(&[
            ("MOCK_LISTEN_ADDR", "127.0.0.1:9000"),
            ("MOCK_FIXTURES_DIR", "/tmp/fixtures"),
            ("MOCK_LOG_LEVEL", "warning"),
            ("MOCK_IDLE_TIMEOUT", "5"),
        ]));

        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.fixtures_dir, PathBuf::from("/tmp/fixtures"));
        assert_eq!(config.log_level, LogLevel::Warning);
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_zero_idle_timeout_disables_it() {
        let config = MockConfig::from_lookup(lookup(&[("MOCK_IDLE_TIMEOUT", "0")]));
        assert_eq!(config.idle_timeout(), None);
    }

    #[test]
    fn test_unparsable_env_values_ignored() {
        let config = MockConfig::from_lookup(lookup(&[
            ("MOCK_LISTEN_ADDR", "not an address"),
            ("MOCK_LOG_LEVEL", "chatty"),
            ("MOCK_MAX_MESSAGE_SIZE", "-1"),
        ]));

        assert_eq!(config.listen_addr.port(), 5666);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.max_message_size, 1_048_576);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config =
            MockConfig::from_lookup(lookup(&[("MOCK_LISTEN_ADDR", "127.0.0.1:9000")]));
        let cli = Cli::parse_from([
            "fnos-mock-server",
            "-p",
            "7000",
            "--host",
            "::1",
            "--log-level",
            "debug",
            "--keys-dir",
            "/etc/mock-keys",
        ]);
        cli.apply(&mut config);

        assert_eq!(config.listen_addr.to_string(), "[::1]:7000");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.keys_dir, PathBuf::from("/etc/mock-keys"));
        assert_eq!(config.fixtures_dir, PathBuf::from("responses"));
    }

    #[test]
    fn test_cli_without_flags_changes_nothing() {
        let mut config = MockConfig::default();
        Cli::parse_from(["fnos-mock-server"]).apply(&mut config);
        assert_eq!(config.listen_addr.port(), 5666);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_cli_accepts_uppercase_level() {
        for (flag, level) in [
            ("DEBUG", LogLevel::Debug),
            ("INFO", LogLevel::Info),
            ("WARNING", LogLevel::Warning),
            ("ERROR", LogLevel::Error),
        ] {
            let cli = Cli::try_parse_from(["fnos-mock-server", "--log-level", flag]).unwrap();
            assert_eq!(cli.log_level, Some(level));
        }
    }

    #[test]
    fn test_cli_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["fnos-mock-server", "--log-level", "verbose"]).is_err());
    }

    #[test]
    fn test_log_directive() {
        let mut config = MockConfig::default();
        assert_eq!(config.log_directive(), "fnos_mock_server=info");
        config.log_level = LogLevel::Warning;
        assert_eq!(config.log_directive(), "fnos_mock_server=warn");
    }
}
