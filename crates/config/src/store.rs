//! File-backed configuration.
//!
//! Layout of the configuration file:
//! ```text
//! client:
//!   catch_block_exceptions: true
//!   catch_item_exceptions: true
//!   attempt_recovery: false
//!   notify_player: true
//! ```

use crate::policy::GuardPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors from reading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    client: GuardPolicy,
}

/// Holds the current policy and the path it was read from.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    policy: GuardPolicy,
}

impl ConfigStore {
    /// Read the policy at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let policy = read_policy(&path)?;
        tracing::debug!(path = %path.display(), %policy, "loaded guard policy");
        Ok(Self { path, policy })
    }

    /// Store holding the default policy, not backed by any file on disk.
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            policy: GuardPolicy::default(),
        }
    }

    /// Re-read the file and replace the policy wholesale.
    ///
    /// On error the previous policy stays in effect.
    pub fn reload(&mut self) -> Result<GuardPolicy, ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Ok(self.policy);
        }
        let policy = read_policy(&self.path)?;
        if policy != self.policy {
            tracing::info!(old = %self.policy, new = %policy, "guard policy reloaded");
        }
        self.policy = policy;
        Ok(policy)
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }
}

fn read_policy(path: &Path) -> Result<GuardPolicy, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(GuardPolicy::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if contents.trim().is_empty() {
        return Ok(GuardPolicy::default());
    }
    let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("drawguard.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(store.policy(), GuardPolicy::default());
    }

    #[test]
    fn empty_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "\n");
        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.policy(), GuardPolicy::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "client:\n  attempt_recovery: true\n");
        let policy = ConfigStore::load(&path).unwrap().policy();
        assert!(policy.attempt_recovery);
        assert!(policy.catch_block_exceptions);
        assert!(policy.catch_item_exceptions);
        assert!(policy.notify_player);
    }

    #[test]
    fn retired_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "client:\n  block_renderer_dispatcher_misc: {}\n  notify_player: false\n",
        );
        let policy = ConfigStore::load(&path).unwrap().policy();
        assert!(!policy.notify_player);
    }

    #[test]
    fn reload_replaces_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "client:\n  catch_item_exceptions: true\n");
        let mut store = ConfigStore::load(&path).unwrap();
        assert!(store.policy().catch_item_exceptions);

        write_config(&dir, "client:\n  catch_item_exceptions: false\n");
        let reloaded = store.reload().unwrap();
        assert!(!reloaded.catch_item_exceptions);
        assert_eq!(store.policy(), reloaded);
    }

    #[test]
    fn failed_reload_keeps_previous_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "client:\n  attempt_recovery: true\n");
        let mut store = ConfigStore::load(&path).unwrap();

        write_config(&dir, "client: [not, a, map\n");
        assert!(matches!(store.reload(), Err(ConfigError::Yaml { .. })));
        assert!(store.policy().attempt_recovery);
    }

    #[test]
    fn in_memory_reload_is_noop() {
        let mut store = ConfigStore::in_memory();
        assert_eq!(store.reload().unwrap(), GuardPolicy::default());
    }
}
