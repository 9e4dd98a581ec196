use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Event, Observer};
use crate::history::Batch;
use crate::journal::{JournalEntry, JournalWriter, LiveBatch, live_batches, read_journal};
use crate::model::{FileItem, Plan, Project};
use crate::scanner::ScanResult;
use crate::transaction::{TransactionManager, revert};

/// Scan, planning, apply, undo and history collaborators behind the store.
pub trait Backend {
    fn scan(&self, root: &Path, config: &Config) -> Result<ScanResult>;

    fn create_plan(
        &self,
        files: &[FileItem],
        projects: &[Project],
        config: &Config,
        root: &Path,
    ) -> Result<Plan>;

    /// Execute the plan and record it as the newest batch.
    fn apply_plan(&mut self, plan: &Plan, observer: Observer<'_>) -> Result<Batch>;

    /// Reverse the newest batch; fails when there is none.
    fn undo_last_operation(&mut self, observer: Observer<'_>) -> Result<Batch>;

    /// Committed batches, newest last.
    fn history(&self) -> Result<Vec<Batch>>;
}

/// Backend working on the local filesystem, keeping its journal and trash
/// under a state directory.
pub struct LocalBackend {
    state_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        self.state_dir.join("history.jsonl")
    }

    fn trash_dir(&self, batch: &Batch) -> PathBuf {
        self.state_dir.join("trash").join(batch.id.to_string())
    }

    fn live(&self) -> anyhow::Result<Vec<LiveBatch>> {
        Ok(live_batches(read_journal(&self.journal_path())?))
    }
}

impl Backend for LocalBackend {
    fn scan(&self, root: &Path, config: &Config) -> Result<ScanResult> {
        crate::scanner::scan(root, config)
    }

    fn create_plan(
        &self,
        files: &[FileItem],
        projects: &[Project],
        config: &Config,
        root: &Path,
    ) -> Result<Plan> {
        crate::planner::generate_plan(files, projects, config, root)
    }

    fn apply_plan(&mut self, plan: &Plan, observer: Observer<'_>) -> Result<Batch> {
        plan.validate()
            .map_err(|e| Error::Apply(format!("plan rejected: {e}")))?;
        let batch = Batch::new(plan.operations.clone());
        let mut journal =
            JournalWriter::open(&self.journal_path()).map_err(|e| Error::Apply(format!("{e:#}")))?;

        let undo = match TransactionManager::new(self.trash_dir(&batch)).run(&batch.operations, observer) {
            Ok(undo) => undo,
            Err(e) => {
                observer(Event::BatchRolledBack { batch_id: batch.id });
                return Err(Error::Apply(format!("{e:#}")));
            }
        };

        let entry = JournalEntry::Committed {
            batch: batch.clone(),
            undo: undo.clone(),
        };
        if let Err(e) = journal.write(&entry) {
            // An unrecorded batch could never be undone, so take it back now.
            if let Err(revert_err) = revert(&undo) {
                tracing::error!(error = %revert_err, "failed to revert unrecorded batch");
            }
            observer(Event::BatchRolledBack { batch_id: batch.id });
            return Err(Error::Apply(format!("failed to record batch: {e:#}")));
        }

        observer(Event::BatchCommitted {
            batch_id: batch.id,
            operations: batch.operations.len(),
        });
        tracing::info!(batch = %batch.id, operations = batch.operations.len(), "batch applied");
        Ok(batch)
    }

    fn undo_last_operation(&mut self, observer: Observer<'_>) -> Result<Batch> {
        let mut live = self.live().map_err(|e| Error::Undo(format!("{e:#}")))?;
        let last = live
            .pop()
            .ok_or_else(|| Error::Undo("nothing to undo".to_string()))?;
        observer(Event::UndoStarted {
            batch_id: last.batch.id,
        });

        revert(&last.undo).map_err(|e| Error::Undo(format!("{e:#}")))?;
        JournalWriter::open(&self.journal_path())
            .and_then(|mut w| {
                w.write(&JournalEntry::Undone {
                    batch_id: last.batch.id,
                    ts: Utc::now(),
                })
            })
            .map_err(|e| Error::Undo(format!("reverted but failed to record: {e:#}")))?;

        observer(Event::UndoCompleted {
            batch_id: last.batch.id,
        });
        tracing::info!(batch = %last.batch.id, "batch undone");
        Ok(last.batch)
    }

    fn history(&self) -> Result<Vec<Batch>> {
        self.live()
            .map(|live| live.into_iter().map(|l| l.batch).collect())
            .map_err(|e| Error::History(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::discard;
    use crate::model::{OpType, Operation};
    use std::fs;

    #[test]
    fn apply_then_undo_restores_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("desk");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.png"), "img").unwrap();
        let mut backend = LocalBackend::new(dir.path().join("state"));

        let plan = Plan::new(
            "one",
            vec![Operation::new(
                OpType::Move,
                Some(root.join("a.png")),
                root.join("Media/Images/a.png"),
                "Rule: Images",
            )],
        );
        let batch = backend.apply_plan(&plan, &mut discard).unwrap();
        assert!(root.join("Media/Images/a.png").exists());
        assert_eq!(backend.history().unwrap(), vec![batch.clone()]);

        let undone = backend.undo_last_operation(&mut discard).unwrap();
        assert_eq!(undone.id, batch.id);
        assert!(root.join("a.png").exists());
        assert!(backend.history().unwrap().is_empty());
    }

    #[test]
    fn undo_with_empty_history_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = LocalBackend::new(dir.path());
        assert!(matches!(
            backend.undo_last_operation(&mut discard),
            Err(Error::Undo(_))
        ));
    }

    #[test]
    fn unreadable_journal_is_a_history_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        fs::write(backend.journal_path(), "{not json\n").unwrap();

        let err = backend.history().unwrap_err();
        assert!(matches!(err, Error::History(_)));
        assert!(!err.to_string().contains("undo"));
    }

    #[test]
    fn failed_apply_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = LocalBackend::new(dir.path().join("state"));
        let plan = Plan::new(
            "missing source",
            vec![Operation::new(
                OpType::Move,
                Some(dir.path().join("ghost.txt")),
                dir.path().join("out/ghost.txt"),
                "Rule: Documents",
            )],
        );
        let mut events = Vec::new();
        let err = backend.apply_plan(&plan, &mut |e| events.push(e)).unwrap_err();
        assert!(matches!(err, Error::Apply(_)));
        assert!(backend.history().unwrap().is_empty());
        assert!(matches!(events.last(), Some(Event::BatchRolledBack { .. })));
    }
}
