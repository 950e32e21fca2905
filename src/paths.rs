//! Centralized path resolution for exemplar
//!
//! # Environment Variables
//!
//! - `EXEMPLAR_CONFIG_DIR` - Override config directory (settings and configs)
//! - `EXEMPLAR_STATE_DIR` - Override state directory (audit log, sandbox)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `EXEMPLAR_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/exemplar` (if set)
//! 3. `~/.config/exemplar`
//!
//! For state_dir():
//! 1. `EXEMPLAR_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/exemplar` (if set)
//! 3. `~/.local/state/exemplar`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "EXEMPLAR_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "EXEMPLAR_STATE_DIR";

const APP_DIR: &str = "exemplar";

/// Get the exemplar config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {ENV_CONFIG_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the exemplar state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {ENV_STATE_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Sets or clears variables for the life of the guard and restores them on drop.
    ///
    /// Tests in this module share the process environment, so each one only
    /// touches the variables it asserts on.
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { saved: Vec::new() }
        }

        fn set(mut self, key: &'static str, value: &str) -> Self {
            self.saved.push((key, env::var(key).ok()));
            // SAFETY: the variables set here are only read by the test holding the guard
            unsafe { env::set_var(key, value) };
            self
        }

        fn unset(mut self, key: &'static str) -> Self {
            self.saved.push((key, env::var(key).ok()));
            // SAFETY: as in `set`
            unsafe { env::remove_var(key) };
            self
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..).rev() {
                // SAFETY: as in `set`
                match value {
                    Some(v) => unsafe { env::set_var(key, v) },
                    None => unsafe { env::remove_var(key) },
                }
            }
        }
    }

    #[test]
    fn test_env_overrides_win() {
        let _env = EnvGuard::new()
            .set(ENV_CONFIG_DIR, "/opt/exemplar/config")
            .set(ENV_STATE_DIR, "/opt/exemplar/state");
        assert_eq!(config_dir().unwrap(), PathBuf::from("/opt/exemplar/config"));
        assert_eq!(state_dir().unwrap(), PathBuf::from("/opt/exemplar/state"));
    }

    #[test]
    fn test_env_override_is_expanded() {
        let _env = EnvGuard::new()
            .set("EXEMPLAR_TEST_LAB_ROOT", "/srv/lab")
            .set(ENV_STATE_DIR, "$EXEMPLAR_TEST_LAB_ROOT/state");
        assert_eq!(state_dir().unwrap(), PathBuf::from("/srv/lab/state"));
    }

    #[test]
    fn test_xdg_fallback_appends_app_dir() {
        let _env = EnvGuard::new()
            .unset(ENV_CONFIG_DIR)
            .set("XDG_CONFIG_HOME", "/tmp/xdg-config-exemplar");
        assert_eq!(
            config_dir().unwrap(),
            PathBuf::from("/tmp/xdg-config-exemplar/exemplar")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_state_dir_home_default() {
        let _env = EnvGuard::new()
            .unset(ENV_STATE_DIR)
            .unset("XDG_STATE_HOME");
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            state_dir().unwrap(),
            home.join(".local").join("state").join("exemplar")
        );
    }

    #[test]
    fn test_settings_paths_go_through_expand() {
        use crate::settings::{SandboxSettings, Settings};
        use std::path::Path;

        let _env = EnvGuard::new().set("EXEMPLAR_TEST_SHARED", "/mnt/shared");
        let settings = Settings {
            configs_dir: Some("$EXEMPLAR_TEST_SHARED/configs".into()),
            audit_log: Some("~/exemplar/audit.jsonl".into()),
            sandbox: SandboxSettings {
                store: Some("${EXEMPLAR_TEST_SHARED}/sandbox.json".into()),
                ..SandboxSettings::default()
            },
            ..Settings::default()
        };

        let state = Path::new("/state");
        assert_eq!(
            settings.configs_dir(Path::new("/cfg")),
            PathBuf::from("/mnt/shared/configs")
        );
        assert_eq!(
            settings.audit_log(state),
            dirs::home_dir().unwrap().join("exemplar").join("audit.jsonl")
        );
        assert_eq!(
            settings.sandbox_store(state),
            PathBuf::from("/mnt/shared/sandbox.json")
        );
    }

    #[test]
    fn test_unknown_variable_left_in_place() {
        assert_eq!(
            expand("/data/$EXEMPLAR_TEST_UNSET_9731/configs"),
            PathBuf::from("/data/$EXEMPLAR_TEST_UNSET_9731/configs")
        );
    }
}
