use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Structured event emitted while a plan is built, edited, enriched or applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ScanCompleted {
        root: PathBuf,
        files: usize,
        projects: usize,
    },
    PlanCreated {
        operations: usize,
        summary: String,
    },
    OpRemoved {
        op_id: String,
        index: usize,
    },
    EnrichStarted {
        candidates: usize,
    },
    NameSuggested {
        op_id: String,
        name: String,
    },
    NamingFailed {
        op_id: String,
        error: String,
    },
    OpRenamed {
        op_id: String,
        from: PathBuf,
        to: PathBuf,
    },
    EnrichCompleted {
        changed: usize,
    },
    /// Emitted by dry runs in place of execution.
    OpPlanned {
        op_id: String,
        op_type: String,
        source: Option<PathBuf>,
        destination: PathBuf,
    },
    OpStarted {
        op_id: String,
    },
    OpCompleted {
        op_id: String,
        bytes_copied: u64,
        final_dst: PathBuf,
    },
    OpFailed {
        op_id: String,
        error: String,
    },
    BatchCommitted {
        batch_id: uuid::Uuid,
        operations: usize,
    },
    BatchRolledBack {
        batch_id: uuid::Uuid,
    },
    UndoStarted {
        batch_id: uuid::Uuid,
    },
    UndoCompleted {
        batch_id: uuid::Uuid,
    },
}

/// Receives events as they happen.
pub type Observer<'a> = &'a mut dyn FnMut(Event);

/// Observer that drops everything.
pub fn discard(_: Event) {}
