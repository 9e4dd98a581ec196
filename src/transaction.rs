use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::events::{Event, Observer};
use crate::journal::UndoMetadata;
use crate::model::{OpType, Operation};

/// All-or-nothing executor for one batch.
pub struct TransactionManager {
    trash_dir: PathBuf,
    applied: Vec<UndoMetadata>,
}

impl TransactionManager {
    /// `trash_dir` receives entries removed by `Delete` operations.
    pub fn new(trash_dir: PathBuf) -> Self {
        Self {
            trash_dir,
            applied: Vec::new(),
        }
    }

    /// Execute a single operation within the transaction.
    pub fn execute(&mut self, op: &Operation) -> Result<u64> {
        let (undo, bytes) = match op.op_type {
            OpType::Move => {
                let src = source(op)?;
                let result = crate::fsops::mv(src, &op.destination)?;
                (
                    UndoMetadata::Move {
                        from: src.to_path_buf(),
                        to: result.final_dst,
                    },
                    result.bytes_copied,
                )
            }
            OpType::Copy => {
                let src = source(op)?;
                let result = crate::fsops::cp(src, &op.destination)?;
                (
                    UndoMetadata::Copy {
                        created: result.final_dst,
                    },
                    result.bytes_copied,
                )
            }
            OpType::CreateDir => {
                if op.destination.is_dir() {
                    (UndoMetadata::Noop, 0)
                } else {
                    crate::fsops::mkdir(&op.destination)?;
                    (
                        UndoMetadata::CreateDir {
                            created: op.destination.clone(),
                        },
                        0,
                    )
                }
            }
            OpType::Delete => {
                let src = source(op)?;
                let result = crate::fsops::trash(src, &self.trash_dir.join(&op.id))?;
                (
                    UndoMetadata::Trash {
                        original: src.to_path_buf(),
                        trashed: result.final_dst,
                    },
                    result.bytes_copied,
                )
            }
            OpType::Ignore => (UndoMetadata::Noop, 0),
        };
        self.applied.push(undo);
        Ok(bytes)
    }

    /// Run every operation in order; on the first failure roll back what was
    /// applied and return the error.
    pub fn run(mut self, operations: &[Operation], observer: Observer<'_>) -> Result<Vec<UndoMetadata>> {
        for op in operations {
            observer(Event::OpStarted { op_id: op.id.clone() });
            match self.execute(op) {
                Ok(bytes_copied) => observer(Event::OpCompleted {
                    op_id: op.id.clone(),
                    bytes_copied,
                    final_dst: op.destination.clone(),
                }),
                Err(e) => {
                    observer(Event::OpFailed {
                        op_id: op.id.clone(),
                        error: format!("{e:#}"),
                    });
                    if let Err(rollback) = self.rollback() {
                        tracing::error!(error = %rollback, "rollback incomplete");
                    }
                    return Err(e.context(format!("failed at {}", op.destination.display())));
                }
            }
        }
        Ok(self.applied)
    }

    /// Rollback already applied operations.
    pub fn rollback(&mut self) -> Result<()> {
        let applied = std::mem::take(&mut self.applied);
        revert(&applied)
    }
}

fn source(op: &Operation) -> Result<&Path> {
    op.source
        .as_deref()
        .with_context(|| format!("{} operation {} has no source", op.op_type, op.id))
}

/// Reverse applied operations, newest first.
pub fn revert(applied: &[UndoMetadata]) -> Result<()> {
    for undo in applied.iter().rev() {
        match undo {
            UndoMetadata::Move { from, to } => {
                crate::fsops::mv(to, from)?;
            }
            UndoMetadata::Copy { created } => {
                crate::fsops::remove_created(created)?;
            }
            UndoMetadata::CreateDir { created } => {
                // Leave it if something else has moved in since.
                let _ = std::fs::remove_dir(created);
            }
            UndoMetadata::Trash { original, trashed } => {
                crate::fsops::mv(trashed, original)?;
            }
            UndoMetadata::Noop => {}
        }
    }
    Ok(())
}
