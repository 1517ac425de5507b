//! Configuration vault – reads/writes `~/.cangate/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use cangate_safety::EngagementMode;

/// Engagement mode as written in the config file.
///
/// Defaults to `strict`; `permissive` must be an explicit, reviewed edit.
/// There is intentionally no environment-variable override for this field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModeChoice {
    #[default]
    Strict,
    Permissive,
}

impl From<ModeChoice> for EngagementMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Strict => EngagementMode::Strict,
            ModeChoice::Permissive => EngagementMode::Permissive,
        }
    }
}

impl std::fmt::Display for ModeChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeChoice::Strict => write!(f, "strict"),
            ModeChoice::Permissive => write!(f, "permissive"),
        }
    }
}

/// Persisted gate configuration stored in `~/.cangate/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Vehicle gate to instantiate.
    #[serde(default = "default_vehicle")]
    pub vehicle: String,

    /// How `controls_allowed` / `vehicle_moving` are derived.
    #[serde(default)]
    pub engagement_mode: ModeChoice,

    /// Whether the replay loop tracks the policy's liveness table and
    /// reports stale entries.
    #[serde(default = "default_true")]
    pub require_liveness: bool,

    /// Whether forwarding decisions are reported during replay.
    #[serde(default = "default_true")]
    pub relay_enabled: bool,

    /// Frame log replayed when no path is given on the command line.
    #[serde(default = "default_log_path")]
    pub log_path: String,
}

fn default_vehicle() -> String {
    "perodua-myvi-psd".to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_path() -> String {
    "gate.log".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vehicle: default_vehicle(),
            engagement_mode: ModeChoice::default(),
            require_liveness: true,
            relay_enabled: true,
            log_path: default_log_path(),
        }
    }
}

/// Return the path to `~/.cangate/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".cangate").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `CANGATE_*` environment variable overrides to `cfg`.
///
/// Only the log path is overridable; the engagement mode deliberately is
/// not, so it can only change through a reviewable config edit.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("CANGATE_LOG_PATH") {
        cfg.log_path = v;
    }
}

/// Save the config to disk, creating `~/.cangate/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Write the file with owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
