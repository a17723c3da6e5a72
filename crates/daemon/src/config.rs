// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Settings merge in precedence order: built-in defaults, then the config
//! file, then CLI flags, then `--define key=value` lines (treated as inline
//! config lines with the highest precedence).

use std::path::{Path, PathBuf};
use std::time::Duration;

use beacon_core::Limits;
use clap::Parser;
use thiserror::Error;
use tracing::debug;

/// Command-line options for `beacond`.
#[derive(Debug, Parser, Default)]
#[command(
    name = "beacond",
    version,
    disable_version_flag = true,
    about = "Telemetry relay daemon: aggregates observations from instrumented \
             processes and uploads them to the ingest service."
)]
pub struct Opts {
    /// Listener address: a port, host:port, or a socket path.
    #[arg(long, value_name = "ADDRESS")]
    pub addr: Option<String>,

    /// Deprecated alias for --addr.
    #[arg(long, value_name = "PORT", hide = true)]
    pub port: Option<String>,

    /// Config file path.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "FILE")]
    pub logfile: Option<PathBuf>,

    /// Log level: error, warning, info or debug.
    #[arg(long, value_name = "LEVEL")]
    pub loglevel: Option<String>,

    /// PID file path.
    #[arg(long, value_name = "FILE")]
    pub pidfile: Option<PathBuf>,

    /// Skip PID file creation entirely.
    #[arg(long)]
    pub no_pidfile: bool,

    /// Audit log path (payloads logged uncompressed).
    #[arg(long, value_name = "FILE")]
    pub auditlog: Option<PathBuf>,

    /// CA certificate bundle for ingest uploads.
    #[arg(long, value_name = "FILE")]
    pub cafile: Option<PathBuf>,

    /// CA certificate directory for ingest uploads.
    #[arg(long, value_name = "DIR")]
    pub capath: Option<PathBuf>,

    /// Proxy URL for ingest uploads.
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Override a single config file line; repeatable.
    #[arg(long = "define", value_name = "KEY=VALUE")]
    pub defines: Vec<String>,

    /// Run the worker in the foreground (no supervision chain).
    #[arg(short = 'f', long)]
    pub foreground: bool,

    /// Print host facts as JSON and exit.
    #[arg(long)]
    pub utilization: bool,

    /// Print version information.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    pub version: (),
}

/// Log verbosity, ordered from quietest to loudest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// Directive string for the tracing env filter.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "error" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" | "verbose" => Ok(LogLevel::Debug),
            _ => Err(ConfigError::BadValue {
                key: "loglevel".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {0}: {1}")]
    Unreadable(PathBuf, #[source] std::io::Error),

    #[error("malformed config line: {0:?}")]
    BadLine(String),

    #[error("invalid value for {key}: {value:?}")]
    BadValue { key: String, value: String },
}

/// Default listener address.
pub const DEFAULT_ADDR: &str = "/tmp/beacond.sock";

/// Default PID file path.
pub const DEFAULT_PIDFILE: &str = "/var/run/beacond.pid";

/// Default ingest endpoint.
pub const DEFAULT_COLLECTOR: &str = "https://collector.beacon.io";

/// Merged daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub pidfile: Option<PathBuf>,
    pub logfile: Option<PathBuf>,
    pub loglevel: LogLevel,
    pub auditlog: Option<PathBuf>,
    pub cafile: Option<PathBuf>,
    pub capath: Option<PathBuf>,
    pub proxy: Option<String>,
    /// Idle window after which an application entry is evicted.
    pub app_timeout: Duration,
    /// Period of the per-application harvest tick.
    pub harvest_cycle: Duration,
    /// Daemon-wide high-security mode; mismatching applications are rejected.
    pub high_security: bool,
    pub collector: String,
    pub collector_timeout: Duration,
    pub limits: Limits,
    /// Soft limit on open file descriptors, applied at worker startup.
    pub rlimit_files: Option<u64>,
    pub foreground: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            pidfile: Some(PathBuf::from(DEFAULT_PIDFILE)),
            logfile: None,
            loglevel: LogLevel::Info,
            auditlog: None,
            cafile: None,
            capath: None,
            proxy: None,
            app_timeout: Duration::from_secs(600),
            harvest_cycle: Duration::from_secs(60),
            high_security: false,
            collector: DEFAULT_COLLECTOR.to_string(),
            collector_timeout: Duration::from_secs(30),
            limits: Limits::default(),
            rlimit_files: None,
            foreground: false,
        }
    }
}

impl Config {
    /// Merge defaults, the config file, CLI flags and `--define` lines.
    pub fn load(opts: &Opts) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(path) = &opts.config {
            config.apply_file(path)?;
        }
        config.apply_opts(opts)?;
        for line in &opts.defines {
            config.apply_line(line)?;
        }

        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Unreadable(path.to_path_buf(), e))?;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            self.apply_line(line)?;
        }
        Ok(())
    }

    fn apply_opts(&mut self, opts: &Opts) -> Result<(), ConfigError> {
        // The deprecated --port value is assigned raw to the bind address,
        // numeric or not, so socket paths keep working through the legacy
        // flag. --addr beats it.
        if let Some(port) = &opts.port {
            eprintln!("beacond: --port is deprecated; use --addr");
            self.addr = port.clone();
        }
        if let Some(addr) = &opts.addr {
            self.addr = addr.clone();
        }
        if let Some(logfile) = &opts.logfile {
            self.logfile = Some(logfile.clone());
        }
        if let Some(level) = &opts.loglevel {
            self.loglevel = level.parse()?;
        }
        if let Some(pidfile) = &opts.pidfile {
            self.pidfile = Some(pidfile.clone());
        }
        if opts.no_pidfile {
            self.pidfile = None;
        }
        if let Some(auditlog) = &opts.auditlog {
            self.auditlog = Some(auditlog.clone());
        }
        if let Some(cafile) = &opts.cafile {
            self.cafile = Some(cafile.clone());
        }
        if let Some(capath) = &opts.capath {
            self.capath = Some(capath.clone());
        }
        if let Some(proxy) = &opts.proxy {
            self.proxy = Some(proxy.clone());
        }
        self.foreground = opts.foreground;
        Ok(())
    }

    /// Apply one `key = value` line with a dotted key.
    fn apply_line(&mut self, line: &str) -> Result<(), ConfigError> {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::BadLine(line.to_string()))?;
        let key = key.trim();
        let value = value.trim().trim_matches('"');

        match key {
            "addr" | "address" => self.addr = value.to_string(),
            "pidfile" => {
                self.pidfile = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "logfile" => self.logfile = Some(PathBuf::from(value)),
            "loglevel" => self.loglevel = value.parse()?,
            "auditlog" => self.auditlog = Some(PathBuf::from(value)),
            "app_timeout" => self.app_timeout = parse_duration(key, value)?,
            "harvest_cycle" => self.harvest_cycle = parse_duration(key, value)?,
            "high_security" => self.high_security = parse_bool(key, value)?,
            "collector.host" => self.collector = value.to_string(),
            "collector.timeout" => self.collector_timeout = parse_duration(key, value)?,
            "proxy" => self.proxy = Some(value.to_string()),
            "ssl_ca_bundle" => self.cafile = Some(PathBuf::from(value)),
            "ssl_ca_path" => self.capath = Some(PathBuf::from(value)),
            "rlimit_files" => self.rlimit_files = Some(parse_num(key, value)?),
            "limits.events" => self.limits.events = parse_num(key, value)? as usize,
            "limits.custom_events" => self.limits.custom_events = parse_num(key, value)? as usize,
            "limits.errors" => self.limits.errors = parse_num(key, value)? as usize,
            "limits.slow_samples" => self.limits.slow_samples = parse_num(key, value)? as usize,
            "limits.metric_names" => self.limits.metric_names = parse_num(key, value)? as usize,
            _ => debug!(key, "ignoring unknown config key"),
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::BadValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_num(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a duration: bare seconds, or a value with an `ms`/`s`/`m`/`h`
/// suffix.
fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let bad = || ConfigError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    };

    let (digits, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => value.split_at(idx),
        None => (value, "s"),
    };
    let n: u64 = digits.parse().map_err(|_| bad())?;
    match unit {
        "ms" => Ok(Duration::from_millis(n)),
        "s" => Ok(Duration::from_secs(n)),
        "m" => Ok(Duration::from_secs(n * 60)),
        "h" => Ok(Duration::from_secs(n * 3600)),
        _ => Err(bad()),
    }
}

/// Legacy short-flag command line, accepted with a deprecation notice.
///
/// Returns `None` when the arguments do not form a valid legacy
/// invocation, in which case the caller reports the modern parse error.
pub fn parse_legacy(args: &[String]) -> Option<Opts> {
    let mut opts = Opts::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let mut take = || iter.next().cloned();
        match arg.as_str() {
            "-p" => opts.pidfile = Some(PathBuf::from(take()?)),
            "-d" => opts.loglevel = Some(take()?),
            "-l" => opts.logfile = Some(PathBuf::from(take()?)),
            "-P" => opts.port = Some(take()?),
            "-b" => opts.cafile = Some(PathBuf::from(take()?)),
            "-S" => opts.capath = Some(PathBuf::from(take()?)),
            "-x" => opts.proxy = Some(take()?),
            "-a" => opts.auditlog = Some(PathBuf::from(take()?)),
            // Accepted for compatibility; has no modern counterpart.
            "-A" => {}
            _ => return None,
        }
    }
    Some(opts)
}

/// Parse the command line: modern flags first, legacy fallback second; when
/// both fail, the modern error is reported.
pub fn parse_args(args: &[String]) -> Result<Opts, clap::Error> {
    match Opts::try_parse_from(args) {
        Ok(opts) => Ok(opts),
        Err(modern_err) => match parse_legacy(args) {
            Some(opts) => {
                eprintln!("beacond: legacy flags are deprecated; see --help for replacements");
                Ok(opts)
            }
            None => Err(modern_err),
        },
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
