//! Slot storage backends.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Raw key/value persistence for serialized slots
pub trait SaveStorage {
    /// `Ok(None)` when the slot has never been written
    fn read(&self, slot: &str) -> Result<Option<String>>;
    fn write(&mut self, slot: &str, contents: &str) -> Result<()>;
    fn remove(&mut self, slot: &str) -> Result<()>;
    /// Slot ids currently present, sorted
    fn slots(&self) -> Result<Vec<String>>;
}

/// One `<prefix><slot>.json` file per slot
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    prefix: String,
}

impl FileStorage {
    /// Open the save directory, creating it if needed
    pub fn new(dir: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create save directory {}", dir.display()))?;
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", self.prefix, slot))
    }
}

impl SaveStorage for FileStorage {
    fn read(&self, slot: &str) -> Result<Option<String>> {
        let path = self.path_for(slot);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read save file {}", path.display()))?;
        Ok(Some(contents))
    }

    fn write(&mut self, slot: &str, contents: &str) -> Result<()> {
        let path = self.path_for(slot);
        let temp_path = path.with_extension("tmp");

        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary save file")?;
        file.write_all(contents.as_bytes())
            .context("Failed to write save data")?;
        file.flush().context("Failed to flush save data")?;
        file.sync_all().context("Failed to sync save data")?;

        // Atomic rename
        fs::rename(&temp_path, &path).context("Failed to commit save file")?;
        Ok(())
    }

    fn remove(&mut self, slot: &str) -> Result<()> {
        let path = self.path_for(slot);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete save file {}", path.display()))?;
        }
        Ok(())
    }

    fn slots(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).context("Failed to read save directory")?;
        let mut slots = Vec::new();
        for entry in entries {
            let path = entry.context("Failed to read directory entry")?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(slot) = stem.strip_prefix(&self.prefix) {
                if !slot.is_empty() {
                    slots.push(slot.to_string());
                }
            }
        }
        slots.sort();
        Ok(slots)
    }
}

/// In-memory backend for tests and headless runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot with raw contents, bypassing the store
    pub fn insert_raw(&mut self, slot: &str, contents: &str) {
        self.entries.insert(slot.to_string(), contents.to_string());
    }

    pub fn raw(&self, slot: &str) -> Option<&str> {
        self.entries.get(slot).map(String::as_str)
    }
}

impl SaveStorage for MemoryStorage {
    fn read(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.entries.get(slot).cloned())
    }

    fn write(&mut self, slot: &str, contents: &str) -> Result<()> {
        self.entries.insert(slot.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&mut self, slot: &str) -> Result<()> {
        self.entries.remove(slot);
        Ok(())
    }

    fn slots(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_storage_round_trip() {
        let dir = tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("saves"), "gloam_").unwrap();
        assert_eq!(storage.read("1").unwrap(), None);

        storage.write("1", "{\"version\":3}").unwrap();
        storage.write("b", "{}").unwrap();
        assert!(storage.path_for("1").exists());
        assert!(!storage.path_for("1").with_extension("tmp").exists());
        assert_eq!(storage.read("1").unwrap().as_deref(), Some("{\"version\":3}"));
        assert_eq!(storage.slots().unwrap(), vec!["1".to_string(), "b".to_string()]);

        storage.remove("1").unwrap();
        storage.remove("1").unwrap();
        assert_eq!(storage.slots().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn foreign_files_are_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("other_1.json"), "{}").unwrap();
        let storage = FileStorage::new(dir.path(), "gloam_").unwrap();
        assert!(storage.slots().unwrap().is_empty());
    }
}
