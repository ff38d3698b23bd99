//! Command-line interface support for misugo applications
//!
//! Optional argument parsing for the flags every misugo binary understands:
//! - `--port <PORT>` - Port to listen on, overriding the configuration
//! - `--config <path>` - Configuration file location
//! - `--help` - Show help information
//!
//! With the `cli` feature the arguments go through clap; without it a small
//! hand-written parser handles the same flags.

use crate::config::AppConfig;
use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

#[cfg(feature = "cli")]
use clap::{Arg, ArgAction, Command};

/// CLI arguments parsed from command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Port to listen on
    pub port: Option<u16>,
    /// Path to configuration file
    pub config_file: Option<PathBuf>,
    /// Whether help was requested
    pub help: bool,
}

impl CliArgs {
    /// Parse the process arguments using clap (requires 'cli' feature)
    #[cfg(feature = "cli")]
    pub fn parse() -> Result<Self> {
        let command = Command::new("misugo-app")
            .version(env!("CARGO_PKG_VERSION"))
            .about("misugo HTTP application")
            .disable_help_flag(true)
            .arg(
                Arg::new("port")
                    .long("port")
                    .short('p')
                    .value_name("PORT")
                    .help("Port to listen on")
                    .value_parser(clap::value_parser!(u16)),
            )
            .arg(
                Arg::new("config")
                    .long("config")
                    .short('c')
                    .value_name("FILE")
                    .help("Configuration file path")
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("help")
                    .long("help")
                    .short('h')
                    .help("Print help information")
                    .action(ArgAction::SetTrue),
            );

        let matches = command.try_get_matches().map_err(|e| {
            Error::config(format!("Failed to parse command line arguments: {}", e))
        })?;

        Ok(CliArgs {
            port: matches.get_one::<u16>("port").copied(),
            config_file: matches.get_one::<PathBuf>("config").cloned(),
            help: matches.get_flag("help"),
        })
    }

    /// Parse the process arguments using the lightweight fallback parser
    #[cfg(not(feature = "cli"))]
    pub fn parse() -> Result<Self> {
        Self::parse_simple()
    }

    /// Simple argument parser without clap dependency
    pub fn parse_simple() -> Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse an explicit argument list, program name excluded
    pub fn parse_from<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with('-') => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg, None),
            };

            match flag.as_str() {
                "--port" | "-p" => {
                    let value = inline
                        .or_else(|| args.next())
                        .ok_or_else(|| Error::config("--port flag requires a value"))?;
                    parsed.port = Some(
                        value
                            .parse()
                            .map_err(|_| Error::config(format!("Invalid port: {}", value)))?,
                    );
                }
                "--config" | "-c" => {
                    let value = inline
                        .or_else(|| args.next())
                        .ok_or_else(|| Error::config("--config flag requires a value"))?;
                    parsed.config_file = Some(PathBuf::from(value));
                }
                "--help" | "-h" => parsed.help = true,
                other => log::debug!("Ignoring unknown argument '{}'", other),
            }
        }

        Ok(parsed)
    }

    /// Print help information
    pub fn print_help() {
        let program = env::args()
            .next()
            .unwrap_or_else(|| "misugo-app".to_string());

        println!("misugo HTTP application");
        println!();
        println!("USAGE:");
        println!("    {} [OPTIONS]", program);
        println!();
        println!("OPTIONS:");
        println!("    -p, --port <PORT>      Port to listen on");
        println!("    -c, --config <FILE>    Configuration file path");
        println!("    -h, --help             Print help information");
        println!();
        println!("EXAMPLES:");
        println!("    {} --port 8080", program);
        println!("    {} --config /etc/myapp/config.toml", program);
    }

    /// Load the configuration these arguments point at
    ///
    /// Uses `--config` when given, the environment otherwise, and lets
    /// `--port` win over both.
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config_file {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::from_env()?,
        };
        if let Some(port) = self.port {
            config.server.port = port;
        }
        Ok(config)
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_file.as_ref()
    }

    /// Check if this is a help request
    pub fn is_help(&self) -> bool {
        self.help
    }
}
