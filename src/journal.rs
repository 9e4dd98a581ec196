use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::history::Batch;

/// Metadata needed to reverse one applied operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UndoMetadata {
    /// Undo a move: move `to` back to `from`.
    Move { from: PathBuf, to: PathBuf },
    /// Undo a copy: remove the created destination.
    Copy { created: PathBuf },
    /// Undo a directory creation: remove it if still empty.
    CreateDir { created: PathBuf },
    /// Undo a delete: restore the entry from the trash.
    Trash { original: PathBuf, trashed: PathBuf },
    /// Nothing was done (e.g. `Ignore`).
    Noop,
}

/// A single journal line (NDJSON).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JournalEntry {
    /// A batch was applied; `undo` is parallel to `batch.operations`.
    Committed {
        batch: Batch,
        undo: Vec<UndoMetadata>,
    },
    /// A previously committed batch was reversed.
    Undone {
        batch_id: Uuid,
        ts: DateTime<Utc>,
    },
}

/// Committed batch that has not been undone yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveBatch {
    pub batch: Batch,
    pub undo: Vec<UndoMetadata>,
}

/// Journal writer that appends NDJSON lines.
pub struct JournalWriter {
    file: std::fs::File,
}

impl JournalWriter {
    /// Open journal file for appending.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self { file })
    }

    /// Write a journal entry.
    pub fn write(&mut self, entry: &JournalEntry) -> anyhow::Result<()> {
        let line = serde_json::to_string(entry)?;
        writeln!(&mut self.file, "{}", line)?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Read journal entries; a missing journal is an empty history.
pub fn read_journal(path: &Path) -> anyhow::Result<Vec<JournalEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<JournalEntry> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| anyhow::anyhow!("invalid journal line: {}", e)))
        .collect::<anyhow::Result<_>>()?;
    Ok(entries)
}

/// Fold journal entries into the batches still eligible for undo, oldest first.
pub fn live_batches(entries: Vec<JournalEntry>) -> Vec<LiveBatch> {
    let mut live: Vec<LiveBatch> = Vec::new();
    for entry in entries {
        match entry {
            JournalEntry::Committed { batch, undo } => live.push(LiveBatch { batch, undo }),
            JournalEntry::Undone { batch_id, .. } => live.retain(|b| b.batch.id != batch_id),
        }
    }
    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OpType, Operation};

    #[test]
    fn undone_batches_drop_out_of_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");

        let a = Batch::new(vec![Operation::new(OpType::CreateDir, None, "/x/a", "manual")]);
        let b = Batch::new(vec![]);
        let mut writer = JournalWriter::open(&path).unwrap();
        for batch in [&a, &b] {
            writer
                .write(&JournalEntry::Committed {
                    batch: batch.clone(),
                    undo: vec![UndoMetadata::Noop; batch.operations.len()],
                })
                .unwrap();
        }
        writer
            .write(&JournalEntry::Undone {
                batch_id: b.id,
                ts: Utc::now(),
            })
            .unwrap();

        let live = live_batches(read_journal(&path).unwrap());
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].batch, a);
        assert_eq!(live[0].undo, vec![UndoMetadata::Noop]);
    }

    #[test]
    fn missing_journal_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_journal(&dir.path().join("none.jsonl")).unwrap().is_empty());
    }

    #[test]
    fn garbage_lines_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        assert!(read_journal(&path).is_err());
    }
}
