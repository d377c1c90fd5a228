use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Quest;

const QUESTS_FILE: &str = "quests.json";

/// Returns the directory holding all questhub data files.
///
/// The directory is determined in the following order:
/// 1. `QUESTHUB_DIR` environment variable.
/// 2. `~/.local/share/questhub` (on Linux).
/// 3. `./questhub` (fallback).
pub fn default_data_dir() -> PathBuf {
    std::env::var("QUESTHUB_DIR").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("questhub");
        p
    })
}

/// JSON-file quest store rooted at one data directory.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Opens a store in `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Store> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Store { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a file inside the data directory.
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Loads all quests. A missing file is an empty store.
    pub fn load_quests(&self) -> Result<Vec<Quest>> {
        Ok(read_json(&self.path(QUESTS_FILE))?.unwrap_or_default())
    }

    /// Overwrites the quest file with `quests`.
    pub fn save_quests(&self, quests: &[Quest]) -> Result<()> {
        write_json(&self.path(QUESTS_FILE), quests)
    }

    pub fn load_quest(&self, id: u64) -> Result<Quest> {
        self.load_quests()?
            .into_iter()
            .find(|q| q.id == id)
            .ok_or(Error::NotFound(id))
    }

    /// Replaces the stored quest with the same id.
    pub fn save_quest(&self, quest: &Quest) -> Result<()> {
        let mut quests = self.load_quests()?;
        match quests.iter_mut().find(|q| q.id == quest.id) {
            Some(q) => *q = quest.clone(),
            None => return Err(Error::NotFound(quest.id)),
        }
        self.save_quests(&quests)
    }

    /// Stores a new quest under the next free id and returns that id.
    pub fn insert_quest(&self, quest: Quest) -> Result<u64> {
        let ids = self.insert_quests(vec![quest])?;
        Ok(ids[0])
    }

    /// Stores several new quests in one write, assigning consecutive ids.
    pub fn insert_quests(&self, new_quests: Vec<Quest>) -> Result<Vec<u64>> {
        let mut quests = self.load_quests()?;
        let mut next_id = quests.iter().map(|q| q.id).max().unwrap_or(0) + 1;
        let mut ids = Vec::with_capacity(new_quests.len());
        for mut q in new_quests {
            q.id = next_id;
            ids.push(next_id);
            quests.push(q);
            next_id += 1;
        }
        self.save_quests(&quests)?;
        debug!(?ids, "inserted quests");
        Ok(ids)
    }

    /// Deletes a quest and returns it.
    pub fn remove_quest(&self, id: u64) -> Result<Quest> {
        let mut quests = self.load_quests()?;
        let idx = quests.iter().position(|q| q.id == id).ok_or(Error::NotFound(id))?;
        let removed = quests.remove(idx);
        self.save_quests(&quests)?;
        Ok(removed)
    }

    /// Deletes every data file in the store. The config file is kept.
    pub fn delete_database(&self) -> Result<()> {
        for file in [QUESTS_FILE, crate::calendar::CALENDAR_FILE] {
            let path = self.path(file);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Reads a JSON file, returning `None` if it does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let mut f = match OpenOptions::new().read(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    Ok(Some(serde_json::from_str(&s)?))
}

/// Writes `value` as pretty JSON, replacing the file.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}
