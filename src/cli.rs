//! Command-line interface for tongyeok
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live Korean-English speech translation relay
#[derive(Parser, Debug)]
#[command(
    name = "tongyeok",
    version,
    about = "Live Korean-English speech translation relay"
)]
pub struct Cli {
    /// Subcommand to execute (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: connection events, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay server
    Serve {
        /// Bind address (default: 127.0.0.1:5995)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Publisher secret (overrides config file and environment)
        #[arg(long, value_name = "SECRET")]
        secret: Option<String>,

        /// Session idle timeout. Examples: 3s, 1500ms, 1m
        #[arg(long, value_name = "DURATION", value_parser = parse_millis)]
        idle_timeout: Option<u64>,

        /// Interim debounce delay. Examples: 500ms, 1s
        #[arg(long, value_name = "DURATION", value_parser = parse_millis)]
        debounce: Option<u64>,
    },

    /// Subscribe to a relay and print translations
    Listen {
        /// Relay address (default: 127.0.0.1:5995)
        #[arg(long, value_name = "ADDR")]
        addr: Option<String>,

        /// Only print final translations, skip interim previews
        #[arg(long)]
        finals_only: bool,
    },

    /// Authenticate as publisher and send stdin lines as fragments
    Publish {
        /// Relay address (default: 127.0.0.1:5995)
        #[arg(long, value_name = "ADDR")]
        addr: Option<String>,

        /// Publisher secret (falls back to the configured secret)
        #[arg(long, value_name = "SECRET")]
        secret: Option<String>,

        /// Send lines as interim fragments instead of finals
        #[arg(long)]
        interim: bool,
    },

    /// Manage configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init,
}

/// Parse a duration string into milliseconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (milliseconds), single-unit (`500ms`, `3s`), and compound (`1m30s`).
fn parse_millis(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → milliseconds
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(ms);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_millis() as u64)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_millis_bare_number() {
        assert_eq!(parse_millis("500").unwrap(), 500);
    }

    #[test]
    fn test_parse_millis_units() {
        assert_eq!(parse_millis("500ms").unwrap(), 500);
        assert_eq!(parse_millis("3s").unwrap(), 3000);
        assert_eq!(parse_millis("1m30s").unwrap(), 90_000);
    }

    #[test]
    fn test_parse_millis_rejects_garbage() {
        assert!(parse_millis("soon").is_err());
    }

    #[test]
    fn test_cli_parses_serve_with_overrides() {
        let cli = Cli::parse_from([
            "tongyeok",
            "serve",
            "--bind",
            "0.0.0.0:7000",
            "--idle-timeout",
            "5s",
        ]);
        match cli.command {
            Some(Commands::Serve {
                bind,
                idle_timeout, ..
            }) => {
                assert_eq!(bind.as_deref(), Some("0.0.0.0:7000"));
                assert_eq!(idle_timeout, Some(5000));
            }
            other => panic!("Expected Serve command, got: {:?}", other),
        }
    }

    #[test]
    fn test_cli_defaults_to_no_subcommand() {
        let cli = Cli::parse_from(["tongyeok"]);
        assert!(cli.command.is_none());
    }
}
