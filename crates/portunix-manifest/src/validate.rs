//! Manifest invariant checks.

use crate::error::ManifestError;
use crate::model::{Manifest, OsKind, ParameterType, PermissionLevel, PluginType, Runtime};

const MIN_GRPC_PORT: u16 = 9000;
const MAX_GRPC_PORT: u16 = 9999;

pub fn validate(manifest: &Manifest) -> Result<(), ManifestError> {
    validate_name(&manifest.name)?;

    if manifest.plugin_type == PluginType::Unknown {
        return Err(ManifestError::validation(
            "type",
            format!("must be one of {:?}", PluginType::allowed_values()),
        ));
    }

    if manifest.runtime == Runtime::Unknown {
        return Err(ManifestError::validation(
            "runtime",
            format!("must be one of {:?}", Runtime::allowed_values()),
        ));
    }

    if manifest.permissions.level == PermissionLevel::Unknown {
        return Err(ManifestError::validation(
            "permissions.level",
            format!("must be one of {:?}", PermissionLevel::allowed_values()),
        ));
    }

    if manifest.plugin_type == PluginType::Grpc {
        match manifest.port {
            None => {
                return Err(ManifestError::validation(
                    "port",
                    "required when type=grpc",
                ))
            }
            Some(port) if !(MIN_GRPC_PORT..=MAX_GRPC_PORT).contains(&port) => {
                return Err(ManifestError::validation(
                    "port",
                    format!("must be in {MIN_GRPC_PORT}-{MAX_GRPC_PORT}, got {port}"),
                ))
            }
            Some(_) => {}
        }
    }

    if manifest.dependencies.os_support.is_empty() {
        return Err(ManifestError::validation(
            "dependencies.osSupport",
            format!(
                "must name at least one of {:?}",
                OsKind::allowed_values()
            ),
        ));
    }

    for command in &manifest.commands {
        if command.name.is_empty() {
            return Err(ManifestError::validation("commands[].name", "must not be empty"));
        }
        for parameter in &command.parameters {
            if parameter.parameter_type == ParameterType::Unknown {
                return Err(ManifestError::validation(
                    format!("commands.{}.parameters[].type", command.name),
                    format!("must be one of {:?}", ParameterType::allowed_values()),
                ));
            }
            if parameter.name.is_empty() {
                return Err(ManifestError::validation(
                    format!("commands.{}.parameters[].name", command.name),
                    "must not be empty",
                ));
            }
        }
    }

    Ok(())
}

fn validate_name(name: &str) -> Result<(), ManifestError> {
    if name.is_empty() {
        return Err(ManifestError::validation("name", "must not be empty"));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(ManifestError::validation(
            "name",
            "must be lowercase alphanumeric characters and hyphens only",
        ));
    }
    Ok(())
}
