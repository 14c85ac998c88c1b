use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STATE_FILE_NAME: &str = "projects.json";

/// Hours after which `reconcile` considers a running timer forgotten.
pub const DEFAULT_STALE_AFTER_HOURS: u64 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to resolve home directory; set PROJ_HOME or pass --state-file")]
    NoHome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjConfig {
    /// Explicit state file path; overrides the default under the proj home.
    pub state_file: Option<String>,
    /// Threshold for `reconcile`, in hours.
    pub stale_after_hours: Option<u64>,
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_proj_home() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("PROJ_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".proj"))
}

pub fn config_path() -> Option<PathBuf> {
    resolve_proj_home().map(|home| home.join("config.toml"))
}

pub fn load_config() -> Option<ProjConfig> {
    let path = config_path()?;
    if !path.is_file() {
        return None;
    }
    let text = fs::read_to_string(path).ok()?;
    toml::from_str::<ProjConfig>(&text).ok()
}

/// State file precedence: explicit path (CLI flag), then the
/// PROJ_STATE_FILE environment variable, then the config file, then the
/// default under the proj home.
pub fn resolve_state_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(value) = std::env::var("PROJ_STATE_FILE") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    if let Some(value) = load_config().and_then(|config| config.state_file) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    resolve_proj_home()
        .map(|home| home.join(STATE_FILE_NAME))
        .ok_or(ConfigError::NoHome)
}

pub fn resolve_stale_after(explicit_hours: Option<u64>) -> chrono::Duration {
    let hours = explicit_hours
        .or_else(|| load_config().and_then(|config| config.stale_after_hours))
        .unwrap_or(DEFAULT_STALE_AFTER_HOURS);
    chrono::Duration::hours(hours as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
        let _guard = crate::test_env::lock();
        f()
    }

    struct EnvGuard {
        proj_home: Option<OsString>,
        state_file: Option<OsString>,
        home: Option<OsString>,
        userprofile: Option<OsString>,
    }

    impl EnvGuard {
        fn capture() -> Self {
            Self {
                proj_home: std::env::var_os("PROJ_HOME"),
                state_file: std::env::var_os("PROJ_STATE_FILE"),
                home: std::env::var_os("HOME"),
                userprofile: std::env::var_os("USERPROFILE"),
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in [
                ("PROJ_HOME", self.proj_home.as_ref()),
                ("PROJ_STATE_FILE", self.state_file.as_ref()),
                ("HOME", self.home.as_ref()),
                ("USERPROFILE", self.userprofile.as_ref()),
            ] {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn state_path_prefers_explicit_over_env_over_config() {
        with_env_lock(|| {
            let _env = EnvGuard::capture();
            let home = TempDir::new().expect("home tempdir");
            std::env::set_var("PROJ_HOME", home.path());
            std::env::remove_var("PROJ_STATE_FILE");

            // No config, no env -> default under proj home.
            let resolved = resolve_state_path(None).expect("resolve");
            assert_eq!(resolved, home.path().join(STATE_FILE_NAME));

            // Config applies when env is absent.
            std::fs::write(
                home.path().join("config.toml"),
                "state_file = \"/tmp/from-config.json\"\n",
            )
            .expect("config");
            let resolved = resolve_state_path(None).expect("resolve");
            assert_eq!(resolved, PathBuf::from("/tmp/from-config.json"));

            // Env overrides config.
            std::env::set_var("PROJ_STATE_FILE", "/tmp/from-env.json");
            let resolved = resolve_state_path(None).expect("resolve");
            assert_eq!(resolved, PathBuf::from("/tmp/from-env.json"));

            // Explicit flag overrides everything.
            let resolved =
                resolve_state_path(Some(Path::new("/tmp/explicit.json"))).expect("resolve");
            assert_eq!(resolved, PathBuf::from("/tmp/explicit.json"));
        });
    }

    #[test]
    fn proj_home_prefers_env_var() {
        with_env_lock(|| {
            let _env = EnvGuard::capture();
            let dir = TempDir::new().expect("tempdir");
            std::env::set_var("PROJ_HOME", dir.path());
            assert_eq!(resolve_proj_home().expect("home"), dir.path());

            std::env::remove_var("PROJ_HOME");
            std::env::set_var("HOME", "/home/someone");
            assert_eq!(
                resolve_proj_home().expect("home"),
                PathBuf::from("/home/someone/.proj")
            );
        });
    }

    #[test]
    fn stale_threshold_falls_back_to_default() {
        with_env_lock(|| {
            let _env = EnvGuard::capture();
            let home = TempDir::new().expect("home tempdir");
            std::env::set_var("PROJ_HOME", home.path());

            assert_eq!(
                resolve_stale_after(None),
                chrono::Duration::hours(DEFAULT_STALE_AFTER_HOURS as i64)
            );
            assert_eq!(resolve_stale_after(Some(2)), chrono::Duration::hours(2));

            std::fs::write(home.path().join("config.toml"), "stale_after_hours = 12\n")
                .expect("config");
            assert_eq!(resolve_stale_after(None), chrono::Duration::hours(12));
        });
    }
}
