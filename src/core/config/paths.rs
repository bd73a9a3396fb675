//! Where ragdesk reads its config and keeps its data.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "ragdesk";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub store_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// `RAGDESK_ROOT` or the working directory, with data under
    /// `RAGDESK_DATA_DIR` or the platform data directory.
    pub fn new() -> Self {
        let project_root = env_path("RAGDESK_ROOT")
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));
        let user_data_dir =
            env_path("RAGDESK_DATA_DIR").unwrap_or_else(|| default_data_dir(&project_root));
        Self::with_data_dir(project_root, user_data_dir)
    }

    /// Lays out the store, secrets and logs under `user_data_dir`, creating
    /// the directories best effort.
    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        if let Err(err) = fs::create_dir_all(&log_dir) {
            tracing::warn!("Could not create {}: {}", log_dir.display(), err);
        }
        Self {
            store_path: user_data_dir.join(".vectordb").join("vectors.json"),
            secrets_path: user_data_dir.join("secrets.yaml"),
            log_dir,
            user_data_dir,
            project_root,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Debug builds keep data beside the checkout.
fn default_data_dir(project_root: &Path) -> PathBuf {
    if cfg!(debug_assertions) {
        return project_root.to_path_buf();
    }
    let home = || {
        env_path("HOME")
            .or_else(|| env_path("USERPROFILE"))
            .unwrap_or_else(|| PathBuf::from("."))
    };
    let base = match env::consts::OS {
        "windows" => env_path("LOCALAPPDATA").unwrap_or_else(home),
        "macos" => home().join("Library/Application Support"),
        _ => env_path("XDG_DATA_HOME").unwrap_or_else(|| home().join(".local/share")),
    };
    base.join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_files_live_under_the_data_dir() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");
        let paths = AppPaths::with_data_dir(root.path().to_path_buf(), data.clone());

        assert_eq!(paths.store_path, data.join(".vectordb").join("vectors.json"));
        assert_eq!(paths.secrets_path, data.join("secrets.yaml"));
        assert_eq!(paths.project_root, root.path());
        assert!(paths.log_dir.is_dir());
    }

    #[test]
    fn debug_builds_keep_data_beside_the_project() {
        let root = tempfile::tempdir().unwrap();
        if cfg!(debug_assertions) {
            assert_eq!(default_data_dir(root.path()), root.path());
        } else {
            assert!(default_data_dir(root.path()).ends_with(APP_DIR));
        }
    }
}
