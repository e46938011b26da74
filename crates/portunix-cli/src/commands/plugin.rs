//! `ptx plugin <subcommand>` handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};

use portunix_host::Host;
use portunix_registry::Status;

use crate::cli::PluginCommands;
use crate::config::CliConfig;
use crate::output;

pub async fn execute(host: Arc<Host>, command: PluginCommands) -> Result<()> {
    match command {
        PluginCommands::Install { manifest } => {
            host.install(&manifest).await?;
            output::success(&format!("installed plugin from {}", manifest.display()));
            Ok(())
        }
        PluginCommands::Uninstall { name } => {
            host.uninstall(&name).await?;
            output::success(&format!("uninstalled {name:?}"));
            Ok(())
        }
        PluginCommands::Enable { name } => {
            host.enable(&name).await?;
            output::success(&format!("enabled {name:?}"));
            Ok(())
        }
        PluginCommands::Disable { name } => {
            host.disable(&name).await?;
            output::success(&format!("disabled {name:?}"));
            Ok(())
        }
        PluginCommands::Start { name } => {
            host.start(&name).await?;
            output::success(&format!("started {name:?}"));
            Ok(())
        }
        PluginCommands::Stop { name } => {
            host.stop(&name).await?;
            output::success(&format!("stopped {name:?}"));
            Ok(())
        }
        PluginCommands::Execute { name, command, args } => execute_command(&host, &name, &command, args).await,
        PluginCommands::List => list(&host).await,
        PluginCommands::Info { name } => info(&host, &name).await,
        PluginCommands::Commands { name } => commands(&host, &name).await,
        PluginCommands::Health { name } => health(&host, &name).await,
        PluginCommands::Init {
            path,
            name,
            description,
            author,
        } => init(path, &name, &description, &author),
        PluginCommands::Doctor => unreachable!("Doctor is dispatched before a Host is constructed"),
    }
}

async fn execute_command(host: &Host, name: &str, command: &str, args: Vec<String>) -> Result<()> {
    let response = host
        .execute(name, command, args, Default::default())
        .await?;
    if !response.output.is_empty() {
        println!("{}", response.output);
    }
    if !response.error.is_empty() {
        eprintln!("{}", response.error.red());
    }
    if !response.success {
        anyhow::bail!("plugin command exited with code {}", response.exit_code);
    }
    Ok(())
}

async fn list(host: &Host) -> Result<()> {
    let records = host.list().await;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["NAME", "VERSION", "STATUS", "LAST SEEN"]);

    for record in &records {
        let status_cell = Cell::new(record.status.as_str()).fg(status_color(record.status));
        table.add_row(vec![
            Cell::new(&record.name),
            Cell::new(record.version.to_string()),
            status_cell,
            Cell::new(record.last_seen.to_rfc3339()),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Running => Color::Green,
        Status::Failed => Color::Red,
        Status::Starting | Status::Stopping => Color::Yellow,
        Status::Stopped | Status::Unknown => Color::Grey,
    }
}

async fn info(host: &Host, name: &str) -> Result<()> {
    let info = host.info(name).await?;
    output::header(&format!("{} v{}", info.name, info.version));
    println!("  {}", info.description);
    if !info.capabilities.is_empty() {
        println!("  capabilities: {}", info.capabilities.join(", "));
    }
    if !info.required_permissions.is_empty() {
        println!("  required permissions: {}", info.required_permissions.join(", "));
    }
    Ok(())
}

async fn commands(host: &Host, name: &str) -> Result<()> {
    let commands = host.list_commands(name).await?;
    if commands.is_empty() {
        output::info(&format!("{name:?} advertises no commands"));
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["COMMAND", "DESCRIPTION"]);
    for command in &commands {
        table.add_row(vec![command.name.clone(), command.description.clone()]);
    }
    println!("{table}");
    Ok(())
}

async fn health(host: &Host, name: &str) -> Result<()> {
    let report = host.health(name).await?;
    if report.healthy {
        output::success(&format!("{name:?} is healthy ({}, up {}s)", report.status, report.uptime_seconds));
    } else {
        output::error(&format!("{name:?} is unhealthy ({}): {}", report.status, report.message));
        anyhow::bail!("plugin {name:?} reported unhealthy");
    }
    Ok(())
}

fn init(path: Option<std::path::PathBuf>, name: &str, description: &str, author: &str) -> Result<()> {
    let dir = path.unwrap_or_else(|| std::path::PathBuf::from("."));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let manifest_path = dir.join("plugin.json");
    if manifest_path.exists() {
        anyhow::bail!("{} already exists", manifest_path.display());
    }

    let manifest = portunix_manifest::default(name, description, author);
    portunix_manifest::save(&manifest, &manifest_path)?;
    output::success(&format!("scaffolded plugin manifest at {}", manifest_path.display()));
    Ok(())
}

/// Read the registry file directly (not through a live `Supervisor`, which
/// would already have failed to construct if the file were corrupt) and
/// report install-path/binary inconsistencies.
pub async fn doctor(config: &CliConfig) -> Result<()> {
    output::header("plugin registry diagnostics");

    if !config.registry_file.exists() {
        output::info("no registry file yet; nothing to check");
        return Ok(());
    }

    let bytes = std::fs::read(&config.registry_file)
        .with_context(|| format!("reading {}", config.registry_file.display()))?;
    let registry: portunix_registry::RegistryFile = match serde_json::from_slice(&bytes) {
        Ok(registry) => registry,
        Err(err) => {
            output::error(&format!("registry file is not valid JSON: {err}"));
            anyhow::bail!("registry is corrupt");
        }
    };

    let mut problems = 0;
    for (name, record) in &registry.plugins {
        let install_path = std::path::Path::new(&record.install_path);
        if !install_path.exists() {
            problems += 1;
            output::warning(&format!("{name:?}: install path {} is missing", record.install_path));
            continue;
        }
        let binary_path = install_path.join(&record.binary_name);
        if !binary_path.exists() {
            problems += 1;
            output::warning(&format!("{name:?}: binary {} is missing", binary_path.display()));
        }
        let manifest_path = install_path.join("plugin.json");
        if !manifest_path.exists() {
            problems += 1;
            output::warning(&format!("{name:?}: manifest {} is missing", manifest_path.display()));
        }
    }

    if problems == 0 {
        output::success(&format!("{} plugin(s) checked, no problems found", registry.plugins.len()));
    } else {
        output::error(&format!("{problems} problem(s) found"));
        anyhow::bail!("{problems} registry problem(s) found");
    }
    Ok(())
}
