// Configuration management for the router engine
// Supports CLI arguments, config file (TOML), and environment variables

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::error::{RouterError, RouterResult};
use crate::routes::{codec, RouteEntry, RouteSource};

/// Router engine - in-memory IPv4 routing table with longest prefix match
#[derive(Parser, Debug, Clone)]
#[command(name = "router-engine")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(short, long, env = "ROUTER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Path to configuration file
    #[arg(short, long, env = "ROUTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to resolve once the table is loaded (repeatable)
    #[arg(long = "lookup", value_name = "ADDRESS")]
    pub lookups: Vec<String>,

    /// Seed the table from the host routing table
    #[arg(long, env = "ROUTER_IMPORT_KERNEL")]
    pub import_kernel: bool,

    /// Print the routing table as JSON after loading
    #[arg(long)]
    pub dump: bool,

    /// Exit after loading instead of waiting for Ctrl-C
    #[arg(long)]
    pub once: bool,
}

/// Configuration file structure (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Table seeding settings
    #[serde(default)]
    pub table: TableConfig,

    /// Static routes installed at startup
    #[serde(default)]
    pub routes: Vec<StaticRouteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TableConfig {
    /// Import the host routing table at startup
    #[serde(default)]
    pub import_kernel: bool,

    /// Saved `ip route show` output (text or JSON) to import at startup
    #[serde(default)]
    pub import_file: Option<PathBuf>,
}

/// One `[[routes]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticRouteConfig {
    /// Destination in CIDR notation
    pub destination: String,

    pub next_hop: String,

    #[serde(default)]
    pub interface: String,

    #[serde(default)]
    pub outgoing_ip: Option<String>,

    #[serde(default)]
    pub hop_count: u32,

    #[serde(default)]
    pub priority: u32,
}

impl StaticRouteConfig {
    /// Validate and convert into a route entry
    pub fn to_entry(&self) -> RouterResult<RouteEntry> {
        let outgoing_ip = match &self.outgoing_ip {
            Some(ip) => codec::decode(codec::parse_dotted(ip)?),
            None => std::net::Ipv4Addr::UNSPECIFIED,
        };

        Ok(RouteEntry::from_cidr(&self.destination, &self.next_hop)?
            .with_interface(self.interface.clone(), outgoing_ip)
            .with_hop_count(self.hop_count)
            .with_priority(self.priority)
            .with_source(RouteSource::Static))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

/// Merged configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: Option<PathBuf>,
    pub log_level: Level,
    pub import_kernel: bool,
    pub import_file: Option<PathBuf>,
    pub routes: Vec<StaticRouteConfig>,
    pub lookups: Vec<String>,
    pub dump: bool,
    pub once: bool,
}

impl Config {
    /// Load configuration from all sources (CLI args, config file, defaults)
    /// Priority: CLI args / environment > Config file > Defaults
    pub fn load() -> anyhow::Result<Self> {
        let cli_args = CliArgs::parse();

        // Load config file if specified, else try the default locations
        let config_path = match &cli_args.config {
            Some(path) => Some(path.clone()),
            None => [
                PathBuf::from("router-engine.toml"),
                PathBuf::from("config.toml"),
            ]
            .into_iter()
            .find(|path| path.exists()),
        };

        let config_file = match &config_path {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };

        let mut config = Config::merge(cli_args, config_file)?;
        config.config_path = config_path;
        Ok(config)
    }

    /// Merge CLI arguments over a parsed config file
    pub fn merge(cli_args: CliArgs, config_file: ConfigFile) -> anyhow::Result<Self> {
        let level_str = cli_args
            .log_level
            .unwrap_or(config_file.logging.level);
        let log_level = parse_log_level(&level_str)?;

        Ok(Config {
            config_path: None,
            log_level,
            import_kernel: cli_args.import_kernel || config_file.table.import_kernel,
            import_file: config_file.table.import_file,
            routes: config_file.routes,
            lookups: cli_args.lookups,
            dump: cli_args.dump,
            once: cli_args.once,
        })
    }
}

fn read_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let config_content = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<ConfigFile>(&config_content)?)
}

fn parse_log_level(level_str: &str) -> RouterResult<Level> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(RouterError::Config(format!("Invalid log level: {}", level_str))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const SAMPLE: &str = r#"
[logging]
level = "debug"

[table]
import_file = "routes.txt"

[[routes]]
destination = "0.0.0.0/0"
next_hop = "192.168.1.1"
interface = "eth0"
outgoing_ip = "192.168.1.50"

[[routes]]
destination = "10.8.0.0/16"
next_hop = "10.8.0.1"
hop_count = 2
"#;

    fn cli(args: &[&str]) -> CliArgs {
        let mut argv = vec!["router-engine"];
        argv.extend_from_slice(args);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.logging.level, "info");
        assert!(!config.table.import_kernel);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_parse_config_file() {
        let config: ConfigFile = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.table.import_file, Some(PathBuf::from("routes.txt")));
        assert_eq!(config.routes.len(), 2);

        let default = config.routes[0].to_entry().unwrap();
        assert_eq!(default.prefix_len(), 0);
        assert_eq!(default.outgoing_interface, "eth0");
        assert_eq!(default.outgoing_ip, Ipv4Addr::new(192, 168, 1, 50));

        let vpn = config.routes[1].to_entry().unwrap();
        assert_eq!(vpn.hop_count, 2);
        assert_eq!(vpn.outgoing_ip, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn test_bad_static_route() {
        let route = StaticRouteConfig {
            destination: "10.0.0.0/8".to_string(),
            next_hop: "10.0.0.300".to_string(),
            interface: String::new(),
            outgoing_ip: None,
            hop_count: 0,
            priority: 0,
        };
        assert!(route.to_entry().unwrap_err().is_parse_error());
    }

    #[test]
    fn test_merge_prefers_cli() {
        let file: ConfigFile = toml::from_str(SAMPLE).unwrap();

        let config = Config::merge(cli(&["--lookup", "10.8.1.1", "--once"]), file.clone()).unwrap();
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.lookups, vec!["10.8.1.1"]);
        assert!(config.once);
        assert!(!config.import_kernel);

        let config = Config::merge(cli(&["-l", "warn", "--import-kernel"]), file).unwrap();
        assert_eq!(config.log_level, Level::WARN);
        assert!(config.import_kernel);
    }

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(
            parse_log_level("invalid"),
            Err(RouterError::Config(_))
        ));
    }

    #[test]
    fn test_merge_rejects_unknown_log_level() {
        let err = Config::merge(cli(&["-l", "loud"]), ConfigFile::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RouterError>(),
            Some(RouterError::Config(_))
        ));
    }
}
