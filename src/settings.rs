use crate::paths;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// Resource types the sandbox backend registers when none are configured
pub const DEFAULT_SANDBOX_TYPES: [&str; 6] =
    ["location", "site", "system", "network", "device", "user"];

// ============================================================================
// Settings
// ============================================================================

/// User settings (`settings.toml`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Workspace used when `--workspace` is not given
    pub workspace: String,

    /// Directory holding configuration documents
    pub configs_dir: Option<String>,

    /// Audit log file
    pub audit_log: Option<String>,

    pub sandbox: SandboxSettings,
}

/// Local sandbox backend settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Resource type keys to register
    pub types: Vec<String>,

    /// Store file (defaults to `sandbox.json` in the state dir)
    pub store: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: "default".to_string(),
            configs_dir: None,
            audit_log: None,
            sandbox: SandboxSettings::default(),
        }
    }
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            types: DEFAULT_SANDBOX_TYPES.iter().map(|t| (*t).to_string()).collect(),
            store: None,
        }
    }
}

impl Settings {
    /// Load settings from a specific file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Settings file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Directory configuration documents are loaded from
    pub fn configs_dir(&self, config_dir: &Path) -> PathBuf {
        self.configs_dir
            .as_deref()
            .map_or_else(|| config_dir.join("configs"), paths::expand)
    }

    /// Audit log file path
    pub fn audit_log(&self, state_dir: &Path) -> PathBuf {
        self.audit_log.as_deref().map_or_else(
            || state_dir.join(blueprint::audit::AUDIT_FILE_NAME),
            paths::expand,
        )
    }

    /// Sandbox store file path
    pub fn sandbox_store(&self, state_dir: &Path) -> PathBuf {
        self.sandbox
            .store
            .as_deref()
            .map_or_else(|| state_dir.join("sandbox.json"), paths::expand)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load_from(&tmp.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.workspace, "default");
        assert_eq!(settings.sandbox.types.len(), 6);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            r#"
workspace = "lab-ws"

[sandbox]
types = ["location", "system"]
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.workspace, "lab-ws");
        assert_eq!(settings.sandbox.types, vec!["location", "system"]);
        assert!(settings.configs_dir.is_none());
        assert!(settings.sandbox.store.is_none());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        fs::write(&path, "workspace = [").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_path_defaults() {
        let settings = Settings::default();
        let config = Path::new("/cfg");
        let state = Path::new("/state");
        assert_eq!(settings.configs_dir(config), PathBuf::from("/cfg/configs"));
        assert_eq!(settings.audit_log(state), PathBuf::from("/state/audit.jsonl"));
        assert_eq!(
            settings.sandbox_store(state),
            PathBuf::from("/state/sandbox.json")
        );
    }

    #[test]
    fn test_path_overrides() {
        let settings = Settings {
            configs_dir: Some("/srv/configs".into()),
            audit_log: Some("/var/log/exemplar.jsonl".into()),
            ..Settings::default()
        };
        assert_eq!(
            settings.configs_dir(Path::new("/cfg")),
            PathBuf::from("/srv/configs")
        );
        assert_eq!(
            settings.audit_log(Path::new("/state")),
            PathBuf::from("/var/log/exemplar.jsonl")
        );
    }
}
