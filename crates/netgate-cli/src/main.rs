#![deny(unsafe_code)]

//! netgate CLI: interface address and host access queries for operators.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netgate_config::AppConfig;
use netgate_core::{AccessPolicyChecker, NotFound, netif};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// netgate: interface addresses and tcp-wrappers style access checks.
#[derive(Parser)]
#[command(name = "netgate", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "netgate.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the IPv4 address configured on a network interface.
    Ifaddr {
        /// Interface name; defaults to `interface.name` from the config.
        name: Option<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check whether a daemon may serve a client. Exits 1 when denied.
    Check {
        /// Daemon process name (e.g. "sshd").
        daemon: String,
        /// Client host name, or "unknown".
        host: String,
        /// Client address, or "unknown".
        address: String,
        /// Client user name, or "unknown".
        user: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Serialize)]
struct IfaddrReport {
    interface: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<Ipv4Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IfaddrReport {
    fn new(interface: &str, result: &Result<Ipv4Addr, NotFound>) -> Self {
        Self {
            interface: interface.to_string(),
            address: result.as_ref().ok().copied(),
            error: result.as_ref().err().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    daemon: &'a str,
    host: &'a str,
    address: &'a str,
    user: &'a str,
    backend: &'a str,
    allowed: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up tracing subscriber: RUST_LOG, then -v, then [logging] level
    let config = if cli.verbose == 0 && std::env::var_os("RUST_LOG").is_none() {
        load_config(&cli.config).await.ok()
    } else {
        None
    };
    let filter = log_filter(cli.verbose, config.as_ref());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ifaddr { name, json } => cmd_ifaddr(&cli.config, name, json).await,
        Commands::Check {
            daemon,
            host,
            address,
            user,
            json,
        } => cmd_check(&cli.config, daemon, host, address, user, json).await,
        Commands::Config { show } => {
            cmd_config(&cli.config, show).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Filter directive for a verbosity count. Without `-v` the configured
/// `[logging] level` applies.
fn log_filter(verbose: u8, config: Option<&AppConfig>) -> &str {
    match verbose {
        0 => config.map_or("warn", |c| c.logging.level.as_str()),
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

async fn cmd_ifaddr(config_path: &Path, name: Option<String>, json: bool) -> Result<ExitCode> {
    let name = match name {
        Some(name) => name,
        None => load_config(config_path)
            .await?
            .interface
            .name
            .context("no interface given and interface.name is not configured")?,
    };

    let lookup = name.clone();
    let result = tokio::task::spawn_blocking(move || netif::resolve(&lookup)).await?;
    let report = IfaddrReport::new(&name, &result);

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        match (&report.address, &report.error) {
            (Some(addr), _) => println!("{addr}"),
            (None, Some(err)) => eprintln!("{err}"),
            (None, None) => {}
        }
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_check(
    config_path: &Path,
    daemon: String,
    host: String,
    address: String,
    user: String,
    json: bool,
) -> Result<ExitCode> {
    let config = load_config(config_path).await?;
    let checker = AccessPolicyChecker::from_config(&config)?;
    info!(backend = checker.backend(), %daemon, %host, %address, %user, "Checking access");

    let (checker, allowed, daemon, host, address, user) =
        tokio::task::spawn_blocking(move || {
            let allowed = checker.is_allowed(&daemon, &host, &address, &user);
            (checker, allowed, daemon, host, address, user)
        })
        .await?;

    if json {
        let report = CheckReport {
            daemon: &daemon,
            host: &host,
            address: &address,
            user: &user,
            backend: checker.backend(),
            allowed,
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", if allowed { "allowed" } else { "denied" });
    }

    Ok(if allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_config(config_path: &Path, show: bool) -> Result<()> {
    let config = load_config(config_path).await?;
    if show {
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("{}", config_summary(config_path, &config));
    }
    Ok(())
}

fn config_summary(config_path: &Path, config: &AppConfig) -> String {
    let mut summary = format!(
        "Configuration at '{}' is valid (backend: {}).",
        config_path.display(),
        config.access.backend
    );
    if config.access.backend == "rules" {
        let engine = config.build_policy_engine();
        let daemons = engine.daemons();
        summary.push_str(&format!("\n{} rule(s)", engine.rule_count()));
        if !daemons.is_empty() {
            summary.push_str(&format!(" naming {}", daemons.join(", ")));
        }
    }
    summary
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgate_core::NotFoundReason;
    use netgate_test_utils::config::TestConfigBuilder;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_check_command() {
        let cli = Cli::try_parse_from([
            "netgate",
            "-c",
            "/etc/netgate.toml",
            "check",
            "sshd",
            "client.example.com",
            "203.0.113.5",
            "alice",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/netgate.toml"));
        match cli.command {
            Commands::Check {
                daemon, user, json, ..
            } => {
                assert_eq!(daemon, "sshd");
                assert_eq!(user, "alice");
                assert!(json);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_parse_ifaddr_without_name() {
        let cli = Cli::try_parse_from(["netgate", "-vv", "ifaddr"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Ifaddr {
                name: None,
                json: false
            }
        ));
    }

    #[test]
    fn test_check_requires_all_four_values() {
        assert!(Cli::try_parse_from(["netgate", "check", "sshd", "host", "addr"]).is_err());
    }

    #[test]
    fn test_ifaddr_report_json() {
        let ok = IfaddrReport::new("eth0", &Ok(Ipv4Addr::new(192, 0, 2, 7)));
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"interface":"eth0","address":"192.0.2.7"}"#
        );

        let missing = Err(NotFound {
            interface: "eth9".to_string(),
            reason: NotFoundReason::Unsupported,
        });
        let report = IfaddrReport::new("eth9", &missing);
        let value: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["interface"], "eth9");
        assert!(value.get("address").is_none());
        assert!(value["error"].as_str().unwrap().contains("eth9"));
    }

    #[tokio::test]
    async fn test_load_config_defaults_when_missing() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("absent.toml")).await.unwrap();
        assert_eq!(config.access.backend, "hosts");
    }

    #[tokio::test]
    async fn test_load_config_reports_invalid_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("netgate.toml");
        tokio::fs::write(&path, "[access]\nbackend = \"ldap\"\n")
            .await
            .unwrap();
        assert!(load_config(&path).await.is_err());
    }

    #[test]
    fn test_log_filter_precedence() {
        let config = TestConfigBuilder::new().log_level("debug").build();
        assert_eq!(log_filter(0, Some(&config)), "debug");
        assert_eq!(log_filter(0, None), "warn");
        assert_eq!(log_filter(1, Some(&config)), "info");
        assert_eq!(log_filter(3, Some(&config)), "trace");
    }

    #[tokio::test]
    async fn test_logging_level_read_from_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("netgate.toml");
        tokio::fs::write(&path, "[logging]\nlevel = \"debug\"\n")
            .await
            .unwrap();
        let config = load_config(&path).await.unwrap();
        let filter = log_filter(0, Some(&config));
        assert_eq!(filter, "debug");
        assert!(EnvFilter::try_new(filter).is_ok());
    }

    #[test]
    fn test_config_summary_lists_rule_daemons() {
        let config = TestConfigBuilder::new()
            .backend("rules")
            .rule("sshd, approx", "ALL", "allow", 1)
            .rule("ALL", "PARANOID", "deny", 10)
            .build();
        let summary = config_summary(Path::new("netgate.toml"), &config);
        assert_eq!(
            summary,
            "Configuration at 'netgate.toml' is valid (backend: rules).\n\
             2 rule(s) naming approx, sshd"
        );

        let hosts = config_summary(Path::new("netgate.toml"), &AppConfig::default());
        assert_eq!(hosts, "Configuration at 'netgate.toml' is valid (backend: hosts).");
    }

    #[tokio::test]
    async fn test_config_show_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("netgate.toml");
        let config = TestConfigBuilder::new()
            .interface("eth0")
            .backend("rules")
            .rule("approx", "192.168.", "allow", 5)
            .build();
        tokio::fs::write(&path, toml::to_string_pretty(&config).unwrap())
            .await
            .unwrap();

        let loaded = load_config(&path).await.unwrap();
        assert_eq!(loaded.interface.name.as_deref(), Some("eth0"));
        assert_eq!(loaded.access.rules.len(), 1);
        cmd_config(&path, true).await.unwrap();
    }
}
