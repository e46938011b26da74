use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use portunix_cli::cli::{Cli, Commands, PluginCommands};
use portunix_cli::commands;
use portunix_cli::config::CliConfig;
use portunix_cli::output;
use portunix_host::Host;
use portunix_supervisor::Supervisor;
use portunix_version::Version;

fn host_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).expect("CARGO_PKG_VERSION is a valid version literal")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else {
        match cli.log_level {
            Some(level) => level_str(level),
            None => "info",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(format!("portunix={level}")).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = CliConfig::load(cli.config)?;

    let result = run(config, cli.command).await;
    if let Err(err) = &result {
        output::error(&err.to_string());
    }
    result
}

fn level_str(level: portunix_cli::cli::LogLevel) -> &'static str {
    use portunix_cli::cli::LogLevel;
    match level {
        LogLevel::Off => "off",
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

async fn run(config: CliConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Plugin {
            command: PluginCommands::Doctor,
        } => commands::plugin::doctor(&config).await,
        Commands::Plugin { command } => {
            // `ptx` is a one-shot process: the supervisor it builds here lives
            // only for this invocation, so a plugin started by `start` stays
            // up only as long as something keeps this process alive (each
            // child is spawned with kill_on_drop). A host that wants plugins
            // to outlive individual commands embeds Supervisor in its own
            // long-running process instead of going through this binary.
            let supervisor = Supervisor::new(config.to_supervisor_config()).await?;
            let host = Arc::new(Host::new(supervisor));
            commands::plugin::execute(host, command).await
        }
        Commands::Helper { command } => commands::helper::execute(command, &host_version()).await,
    }
}
