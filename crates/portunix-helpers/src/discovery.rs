use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use portunix_version::Version;

use crate::error::HelperError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const UNKNOWN_VERSION: &str = "unknown";

/// What we know about a `ptx-<name>` helper found next to the host binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperInfo {
    pub name: String,
    pub path: PathBuf,
    pub available: bool,
    pub version: String,
    pub description: String,
    pub commands: Vec<String>,
}

impl HelperInfo {
    fn unavailable(name: String, path: PathBuf) -> Self {
        HelperInfo {
            name,
            path,
            available: false,
            version: UNKNOWN_VERSION.to_string(),
            description: String::new(),
            commands: Vec::new(),
        }
    }
}

/// Scan the host executable's directory for `ptx-<name>` siblings and probe
/// each one that looks runnable. Never fails on a single bad helper; a
/// helper that can't be probed is still returned, marked unavailable or
/// with degraded info, so a CLI can report it rather than silently drop it.
pub async fn discover() -> Result<Vec<HelperInfo>, HelperError> {
    let dir = host_executable_dir()?;
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|source| HelperError::ListDir {
            path: dir.display().to_string(),
            source,
        })?;

    let mut helpers = Vec::new();
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|source| HelperError::ListDir {
                path: dir.display().to_string(),
                source,
            })?;
        let Some(entry) = entry else { break };

        let path = entry.path();
        let Some(name) = helper_name(&path) else {
            continue;
        };

        if !is_executable(&path).await {
            debug!(helper = %name, path = %path.display(), "skipping non-executable helper candidate");
            helpers.push(HelperInfo::unavailable(name, path));
            continue;
        }

        helpers.push(probe(name, path).await);
    }

    helpers.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(helpers)
}

/// Extract the helper name from a candidate path, stripping the `ptx-`
/// prefix and, on Windows, the `.exe` suffix. Returns `None` for anything
/// that isn't a `ptx-*` binary, including the host binary itself (`ptx`).
fn helper_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(std::env::consts::EXE_SUFFIX).unwrap_or(file_name);
    let name = stem.strip_prefix("ptx-")?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

async fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

fn host_executable_dir() -> Result<PathBuf, HelperError> {
    let exe = std::env::current_exe().map_err(HelperError::ExecutableDir)?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| HelperError::ExecutableDir(std::io::Error::other("executable has no parent directory")))
}

/// Probe a single helper binary for its version, description, and command
/// list via `--version` / `--description` / `--list-commands`. Each flag is
/// run independently and failures degrade rather than propagate: a helper
/// that doesn't understand a flag is still "available", just with less
/// metadata attached.
pub async fn probe(name: String, path: PathBuf) -> HelperInfo {
    let version = run_flag(&path, "--version")
        .await
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
    let description = run_flag(&path, "--description")
        .await
        .unwrap_or_else(|| format!("{name} helper"));
    let commands = run_flag(&path, "--list-commands")
        .await
        .map(|out| parse_command_list(&out))
        .unwrap_or_else(|| vec![name.clone()]);

    HelperInfo {
        name,
        path,
        available: true,
        version,
        description,
        commands,
    }
}

/// Parse `--list-commands` output: try a JSON array of strings first, since
/// a helper may legitimately print `["build","push"]`, falling back to
/// comma/newline-separated plain text only if that isn't valid JSON.
fn parse_command_list(out: &str) -> Vec<String> {
    if let Ok(commands) = serde_json::from_str::<Vec<String>>(out.trim()) {
        return commands;
    }
    out.split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn run_flag(path: &Path, flag: &str) -> Option<String> {
    let spawned = Command::new(path)
        .arg(flag)
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(PROBE_TIMEOUT, spawned).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            warn!(path = %path.display(), flag, error = %err, "failed to spawn helper for probe");
            return None;
        }
        Err(_) => {
            warn!(path = %path.display(), flag, "helper probe timed out");
            return None;
        }
    };

    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Check a probed helper version against the host's own version, using the
/// same (major, minor) compatibility rule as plugins. A helper that
/// reported `"unknown"` (because probing failed or it doesn't support
/// `--version`) is never rejected on version grounds alone.
pub fn validate_version(helper_version: &str, host_version: &Version) -> bool {
    if helper_version == UNKNOWN_VERSION {
        return true;
    }
    match Version::parse(helper_version) {
        Ok(version) => host_version.compatible(&version),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_list_prefers_json_array() {
        assert_eq!(
            parse_command_list(r#"["build","push"]"#),
            vec!["build".to_string(), "push".to_string()]
        );
    }

    #[test]
    fn parse_command_list_falls_back_to_comma_and_newline_split() {
        assert_eq!(
            parse_command_list("build, push\ndeploy"),
            vec!["build".to_string(), "push".to_string(), "deploy".to_string()]
        );
    }

    #[test]
    fn helper_name_strips_prefix_and_platform_suffix() {
        assert_eq!(helper_name(Path::new("/bin/ptx-docker")), Some("docker".to_string()));
        assert_eq!(helper_name(Path::new("/bin/ptx")), None);
        assert_eq!(helper_name(Path::new("/bin/other-thing")), None);
        assert_eq!(helper_name(Path::new("/bin/ptx-")), None);
    }

    #[test]
    fn validate_version_skips_unknown() {
        let host = Version::parse("1.2.0").unwrap();
        assert!(validate_version("unknown", &host));
    }

    #[test]
    fn validate_version_checks_major_minor() {
        let host = Version::parse("1.2.0").unwrap();
        assert!(validate_version("1.2.5", &host));
        assert!(!validate_version("2.0.0", &host));
    }

    #[test]
    fn validate_version_tolerates_unparseable_string() {
        let host = Version::parse("1.2.0").unwrap();
        assert!(validate_version("not-a-version", &host));
    }

    #[tokio::test]
    async fn discover_returns_empty_for_dir_with_no_helpers() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("plain-file"), b"hi").await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if let Some(name) = helper_name(&entry.path()) {
                found.push(name);
            }
        }
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn probe_degrades_gracefully_for_nonexistent_binary() {
        let info = probe("ghost".to_string(), PathBuf::from("/no/such/ptx-ghost")).await;
        assert_eq!(info.version, UNKNOWN_VERSION);
        assert_eq!(info.description, "ghost helper");
        assert_eq!(info.commands, vec!["ghost".to_string()]);
    }
}
