use std::fs;
use std::path::PathBuf;

use crate::domain::LocalStorage;

/// Snapshot storage backed by a directory of flat files, one per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(cause) = fs::write(self.path_for(key), value) {
            tracing::error!(key, "failed to write snapshot: {:?}", cause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("publication-store-{name}-{}", std::process::id()))
    }

    #[test]
    fn set_then_get_round_trips() {
        let storage = FileStorage::new(scratch_dir("round-trip")).unwrap();
        storage.set("snapshot", "{\"version\":1}");
        assert_eq!(storage.get("snapshot").as_deref(), Some("{\"version\":1}"));
    }

    #[test]
    fn get_of_missing_key_is_none() {
        let storage = FileStorage::new(scratch_dir("missing")).unwrap();
        assert_eq!(storage.get("nothing-here"), None);
    }
}
