//! `ptx helper <subcommand>` handlers.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};

use portunix_version::Version;

use crate::cli::HelperCommands;
use crate::output;

pub async fn execute(command: HelperCommands, host_version: &Version) -> Result<()> {
    match command {
        HelperCommands::List => list(host_version).await,
    }
}

async fn list(host_version: &Version) -> Result<()> {
    let helpers = portunix_helpers::discover().await?;
    if helpers.is_empty() {
        output::info("no ptx-* helper binaries found");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["NAME", "VERSION", "AVAILABLE", "DESCRIPTION"]);

    for helper in &helpers {
        let compatible = helper.available && portunix_helpers::validate_version(&helper.version, host_version);
        let available_cell = if !helper.available {
            Cell::new("no").fg(Color::Grey)
        } else if compatible {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("incompatible").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&helper.name),
            Cell::new(&helper.version),
            available_cell,
            Cell::new(&helper.description),
        ]);
    }

    println!("{table}");
    Ok(())
}
