pub mod configs;
pub mod delete;
pub mod history;
pub mod install;

use crate::paths;
use crate::sandbox::{self, SandboxStore};
use crate::settings::{SETTINGS_FILE, Settings};
use anyhow::Result;
use blueprint::{AuditLog, DriverRegistry, Loader};
use std::path::Path;

/// Everything a command needs to talk to the engine
pub struct Session {
    pub settings: Settings,
    pub registry: DriverRegistry,
    pub loader: Loader,
    pub audit: AuditLog,
}

impl Session {
    /// Resolve paths, read settings, and wire the sandbox backend
    pub fn open() -> Result<Self> {
        let config_dir = paths::config_dir()?;
        let state_dir = paths::state_dir()?;
        let settings = Settings::load_from(&config_dir.join(SETTINGS_FILE))?;
        Ok(Self::new(settings, &config_dir, &state_dir))
    }

    pub fn new(settings: Settings, config_dir: &Path, state_dir: &Path) -> Self {
        let store = SandboxStore::new(settings.sandbox_store(state_dir));
        let registry = sandbox::registry(&store, settings.sandbox.types.as_slice());
        let loader = Loader::for_registry(settings.configs_dir(config_dir), &registry);
        let audit = AuditLog::new(settings.audit_log(state_dir));

        log::debug!(
            "Session: configs in {}, audit log at {}, {} driver(s)",
            loader.dir().display(),
            audit.path().display(),
            registry.len()
        );

        Self {
            settings,
            registry,
            loader,
            audit,
        }
    }

    /// Workspace from the command line, falling back to settings
    pub fn workspace(&self, requested: Option<String>) -> String {
        requested.unwrap_or_else(|| self.settings.workspace.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LAB: &str = r#"
format_version: 1
name: lab
title: Lab
resources:
  - type: location
    name: L1
    id_reference: loc1
    tags: [demoA]
  - type: system
    name: S1
    id_reference: sys1
    tags: [demoA]
    properties:
      location_id: "${loc1}"
cleanup:
  order: [system, location]
  filter_tags: [demoA]
"#;

    #[test]
    fn test_session_round_trip() {
        let tmp = TempDir::new().unwrap();
        let config_dir = tmp.path().join("config");
        let state_dir = tmp.path().join("state");
        fs::create_dir_all(config_dir.join("configs")).unwrap();
        fs::write(config_dir.join("configs").join("lab.yaml"), LAB).unwrap();

        let session = Session::new(Settings::default(), &config_dir, &state_dir);
        assert_eq!(session.workspace(None), "default");
        assert_eq!(session.workspace(Some("ws".into())), "ws");

        let config = session.loader.load_validated("lab").unwrap();
        let opts = blueprint::RunOptions::new("ws");
        let installed = blueprint::provision_simple(&session.registry, &config, &opts);
        assert!(installed.is_success());
        assert!(state_dir.join("sandbox.json").exists());

        // A fresh session sees what the first one created
        let again = Session::new(Settings::default(), &config_dir, &state_dir);
        let second = blueprint::provision_simple(&again.registry, &config, &opts);
        assert_eq!(second.summary().skipped, 2);

        let removed = blueprint::cleanup_simple(&again.registry, &config, &opts);
        assert_eq!(removed.summary().deleted, 2);
    }

    #[test]
    fn test_demo_configs_are_valid() {
        let tmp = TempDir::new().unwrap();
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
        let session = Session::new(Settings::default(), &demos, tmp.path());

        let summaries = session.loader.list().unwrap();
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["net-lab", "starter"]);

        for name in names {
            let config = session.loader.load_validated(name).unwrap();
            let opts = blueprint::RunOptions::new("demo").dry_run(true);
            let outcome = blueprint::provision_simple(&session.registry, &config, &opts);
            assert!(outcome.is_success(), "{name}: {:?}", outcome.error);
        }
    }

    #[test]
    fn test_unregistered_type_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let config_dir = tmp.path().join("config");
        fs::create_dir_all(config_dir.join("configs")).unwrap();
        fs::write(config_dir.join("configs").join("lab.yaml"), LAB).unwrap();

        let mut settings = Settings::default();
        settings.sandbox.types = vec!["location".into()];
        let session = Session::new(settings, &config_dir, tmp.path());

        let err = session.loader.load("lab").unwrap_err();
        assert!(
            err.violations()
                .iter()
                .any(|v| v.contains("type 'system' is not a registered resource type"))
        );
    }
}
