use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "ptx")]
#[command(about = "Portunix: cross-platform systems administration CLI")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace). Defaults to info.
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Shortcut for --log-level=debug
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ./portunix.toml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plugin lifecycle management
    Plugin {
        #[command(subcommand)]
        command: PluginCommands,
    },
    /// Discover and inspect sibling `ptx-*` helper binaries
    Helper {
        #[command(subcommand)]
        command: HelperCommands,
    },
}

#[derive(Subcommand)]
pub enum PluginCommands {
    /// Install a plugin from a manifest file (plugin.json)
    Install {
        /// Path to the plugin's manifest
        manifest: PathBuf,
    },
    /// Remove an installed plugin and its files
    Uninstall {
        name: String,
    },
    /// Mark a plugin enabled (eligible to be started)
    Enable {
        name: String,
    },
    /// Mark a plugin disabled, stopping it first if running
    Disable {
        name: String,
    },
    /// Start an enabled plugin's process
    Start {
        name: String,
    },
    /// Stop a running plugin's process
    Stop {
        name: String,
    },
    /// Invoke a command on a running plugin
    Execute {
        name: String,
        command: String,
        /// Extra positional arguments forwarded to the plugin command
        args: Vec<String>,
    },
    /// List every installed plugin and its status
    List,
    /// Show identity and negotiated capabilities for an active plugin
    Info {
        name: String,
    },
    /// Query the command surface a running plugin advertises
    Commands {
        name: String,
    },
    /// Check whether a running plugin reports itself healthy
    Health {
        name: String,
    },
    /// Scaffold a new plugin manifest
    Init {
        /// Directory to write plugin.json into (defaults to the current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Plugin name
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        author: String,
    },
    /// Report registry/manifest inconsistencies without changing anything
    Doctor,
}

#[derive(Subcommand)]
pub enum HelperCommands {
    /// List helper binaries found next to this executable
    List,
}
