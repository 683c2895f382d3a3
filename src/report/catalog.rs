//! Read-only view of the WebArena task catalog (`config_files/<id>.json`).

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Deserialize;

/// Default catalog directory, relative to the driver's working directory.
pub const DEFAULT_CATALOG_DIR: &str = "config_files";

/// Label used when a task's site cannot be determined.
pub const UNKNOWN_SITE: &str = "unknown";

#[derive(Debug, Deserialize)]
struct TaskConfig {
    #[serde(default)]
    sites: Vec<String>,
}

/// Looks up task metadata, caching site labels per task id.
#[derive(Debug)]
pub struct TaskCatalog {
    dir: PathBuf,
    sites: Mutex<HashMap<u64, String>>,
}

impl TaskCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sites: Mutex::new(HashMap::new()),
        }
    }

    pub fn config_path(&self, task_id: u64) -> PathBuf {
        self.dir.join(format!("{}.json", task_id))
    }

    /// True if the catalog has a config file for `task_id`.
    pub fn contains(&self, task_id: u64) -> bool {
        self.config_path(task_id).is_file()
    }

    /// First entry of the task's `sites`, or [`UNKNOWN_SITE`].
    pub fn site(&self, task_id: u64) -> String {
        if let Ok(cache) = self.sites.lock() {
            if let Some(site) = cache.get(&task_id) {
                return site.clone();
            }
        }

        let site = self.read_site(task_id);
        if let Ok(mut cache) = self.sites.lock() {
            cache.insert(task_id, site.clone());
        }
        site
    }

    fn read_site(&self, task_id: u64) -> String {
        fs::read_to_string(self.config_path(task_id))
            .ok()
            .and_then(|contents| serde_json::from_str::<TaskConfig>(&contents).ok())
            .and_then(|config| config.sites.into_iter().next())
            .unwrap_or_else(|| UNKNOWN_SITE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_lookup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("7.json"),
            r#"{"task_id": 7, "sites": ["shopping_admin", "map"], "intent": "x"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("8.json"), r#"{"task_id": 8, "sites": []}"#).unwrap();
        fs::write(dir.path().join("9.json"), "not json").unwrap();

        let catalog = TaskCatalog::new(dir.path());
        assert_eq!(catalog.site(7), "shopping_admin");
        assert_eq!(catalog.site(8), UNKNOWN_SITE);
        assert_eq!(catalog.site(9), UNKNOWN_SITE);
        assert_eq!(catalog.site(10), UNKNOWN_SITE);
        assert!(catalog.contains(7));
        assert!(!catalog.contains(10));
    }

    #[test]
    fn test_site_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.json");
        fs::write(&path, r#"{"sites": ["gitlab"]}"#).unwrap();

        let catalog = TaskCatalog::new(dir.path());
        assert_eq!(catalog.site(1), "gitlab");
        fs::remove_file(&path).unwrap();
        assert_eq!(catalog.site(1), "gitlab");
    }
}
