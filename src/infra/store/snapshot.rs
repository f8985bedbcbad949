//! JSON snapshot format used to persist the in-memory store across restarts.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{MusterError, MusterResult};
use crate::core::model::{Event, Poll, PollOption, Vote};

/// Serializable image of one poll and everything it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSnapshot {
    /// The poll itself.
    pub poll: Poll,
    /// Options ordered by id.
    pub options: Vec<PollOption>,
    /// Live votes.
    pub votes: Vec<Vote>,
    /// Next option id to hand out; never reused after pruning.
    pub next_option: u64,
}

/// Serializable image of the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// All events.
    pub events: Vec<Event>,
    /// All polls.
    pub polls: Vec<PollSnapshot>,
}

impl StoreSnapshot {
    /// Read a snapshot, or `None` when the file does not exist yet.
    pub fn load(path: &Path) -> MusterResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path).map_err(|e| MusterError::Storage(e.to_string()))?;
        let snapshot = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| MusterError::Storage(format!("corrupt snapshot {}: {e}", path.display())))?;
        Ok(Some(snapshot))
    }

    /// Write the snapshot next to `path` and atomically rename it into place.
    pub fn save(&self, path: &Path) -> MusterResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| MusterError::Storage(e.to_string()))?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp).map_err(|e| MusterError::Storage(e.to_string()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, self).map_err(|e| MusterError::Storage(e.to_string()))?;
            writer.flush().map_err(|e| MusterError::Storage(e.to_string()))?;
        }
        fs::rename(&tmp, path).map_err(|e| MusterError::Storage(e.to_string()))
    }
}
