//! The plan slot and everything that mutates it.
//!
//! `PlanStore` moves between two states: Empty and Loaded. A successful
//! scan loads a plan, removals and enrichment replace it with a new value,
//! and a successful apply empties it again. Failed collaborator calls leave
//! the slot exactly as it was.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::backend::Backend;
use crate::config::Config;
use crate::enrich::{EnrichOutcome, enrich_with};
use crate::error::{Error, Result};
use crate::events::{Event, Observer};
use crate::history::{Batch, HistoryLedger};
use crate::model::{Operation, Plan, Project, Session};
use crate::naming::Namer;

/// Snapshot handed out for one enrichment pass.
///
/// Holding a ticket means the store's busy flag is set; it is cleared by
/// [`PlanStore::finish_enrichment`].
#[derive(Debug)]
pub struct EnrichmentTicket {
    lineage: u64,
    plan: Plan,
    projects: Vec<Project>,
    query: String,
}

impl EnrichmentTicket {
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Search query active when the pass started; only matching operations are visited.
    pub fn query(&self) -> &str {
        &self.query
    }
}

#[derive(Debug, Default)]
pub struct PlanStore {
    plan: Option<Plan>,
    projects: Vec<Project>,
    root: Option<PathBuf>,
    files_scanned: usize,
    bytes_scanned: u64,
    search: String,
    history: HistoryLedger,
    /// Bumped whenever a plan from a new scan (or no plan) takes the slot.
    lineage: u64,
    enriching: bool,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_session(session: Session) -> Self {
        Self {
            plan: session.plan,
            projects: session.projects,
            root: session.root,
            files_scanned: session.files_scanned,
            bytes_scanned: session.bytes_scanned,
            ..Self::default()
        }
    }

    pub fn to_session(&self) -> Session {
        Session {
            root: self.root.clone(),
            files_scanned: self.files_scanned,
            bytes_scanned: self.bytes_scanned,
            projects: self.projects.clone(),
            plan: self.plan.clone(),
        }
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    pub fn bytes_scanned(&self) -> u64 {
        self.bytes_scanned
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn is_enriching(&self) -> bool {
        self.enriching
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    /// Operations matching the search query, with their index in the plan.
    pub fn filtered(&self) -> Vec<(usize, &Operation)> {
        self.plan
            .iter()
            .flat_map(|plan| plan.operations.iter().enumerate())
            .filter(|(_, op)| op.matches_query(&self.search))
            .collect()
    }

    /// Remove the operation at `index` in the plan; returns what was removed.
    pub fn remove_operation(&mut self, index: usize) -> Result<Operation> {
        let plan = self.plan.as_ref().ok_or(Error::NoPlan)?;
        let next = plan.without(index)?;
        let removed = plan.operations[index].clone();
        self.plan = Some(next);
        tracing::debug!(op = %removed.id, index, "operation removed");
        Ok(removed)
    }

    /// Remove the `view_index`-th operation of the filtered view; returns its
    /// index in the plan alongside it.
    pub fn remove_visible(&mut self, view_index: usize) -> Result<(usize, Operation)> {
        let visible = self.filtered();
        let plan_index = match visible.get(view_index) {
            Some((i, _)) => *i,
            None => {
                return Err(match self.plan {
                    None => Error::NoPlan,
                    Some(_) => Error::IndexOutOfRange {
                        index: view_index,
                        len: visible.len(),
                    },
                });
            }
        };
        let removed = self.remove_operation(plan_index)?;
        Ok((plan_index, removed))
    }

    /// Swap in a new plan value.
    pub fn replace_plan(&mut self, plan: Plan) -> Result<()> {
        if self.enriching {
            return Err(Error::EnrichmentInProgress);
        }
        self.plan = Some(plan);
        Ok(())
    }

    /// Drop the plan after it has been applied.
    pub fn clear_plan(&mut self) {
        self.plan = None;
        self.lineage += 1;
    }

    /// Start an enrichment pass against the current plan.
    pub fn begin_enrichment(&mut self) -> Result<EnrichmentTicket> {
        if self.enriching {
            return Err(Error::EnrichmentInProgress);
        }
        let plan = self.plan.clone().ok_or(Error::NoPlan)?;
        self.enriching = true;
        Ok(EnrichmentTicket {
            lineage: self.lineage,
            plan,
            projects: self.projects.clone(),
            query: self.search.clone(),
        })
    }

    /// Commit the result of a pass and clear the busy flag.
    ///
    /// Operations removed while the pass was running stay removed. If a new
    /// scan replaced the plan meanwhile the result is discarded.
    pub fn finish_enrichment(&mut self, ticket: EnrichmentTicket, mut enriched: Plan) -> Result<()> {
        self.enriching = false;
        let current = match &self.plan {
            Some(plan) if ticket.lineage == self.lineage => plan,
            _ => return Err(Error::StalePlan),
        };
        let live: HashSet<&str> = current.operations.iter().map(|op| op.id.as_str()).collect();
        enriched.operations.retain(|op| live.contains(op.id.as_str()));
        self.plan = Some(enriched);
        Ok(())
    }

    /// Run a full enrichment pass over the current plan. Renamed destinations
    /// also avoid every path for which `occupied` holds.
    pub fn enrich(
        &mut self,
        namer: &dyn Namer,
        credential: &str,
        occupied: impl Fn(&Path) -> bool,
        observer: Observer<'_>,
    ) -> Result<EnrichOutcome> {
        let ticket = self.begin_enrichment()?;
        let query = ticket.query().to_string();
        let outcome = enrich_with(
            ticket.plan(),
            ticket.projects(),
            credential,
            namer,
            |op| op.matches_query(&query),
            occupied,
            observer,
        );
        self.finish_enrichment(ticket, outcome.plan.clone())?;
        Ok(outcome)
    }

    /// Scan `root`, generate a plan, and load it. Nothing changes on failure.
    pub fn scan_and_plan(
        &mut self,
        backend: &dyn Backend,
        root: &Path,
        config: &Config,
        observer: Observer<'_>,
    ) -> Result<&Plan> {
        let scan = backend.scan(root, config)?;
        observer(Event::ScanCompleted {
            root: scan.root.clone(),
            files: scan.files.len(),
            projects: scan.projects.len(),
        });
        let plan = backend.create_plan(&scan.files, &scan.projects, config, &scan.root)?;
        observer(Event::PlanCreated {
            operations: plan.len(),
            summary: plan.summary.clone(),
        });

        self.bytes_scanned = scan.total_bytes();
        self.files_scanned = scan.files.len();
        self.projects = scan.projects;
        self.root = Some(scan.root);
        self.lineage += 1;
        Ok(&*self.plan.insert(plan))
    }

    /// Apply the current plan. On success the slot empties and history is refreshed.
    pub fn apply(&mut self, backend: &mut dyn Backend, observer: Observer<'_>) -> Result<Batch> {
        if self.enriching {
            return Err(Error::EnrichmentInProgress);
        }
        let plan = self.plan.as_ref().ok_or(Error::NoPlan)?;
        let batch = backend.apply_plan(plan, observer)?;
        self.clear_plan();
        self.projects.clear();
        if let Err(e) = self.refresh_history(backend) {
            tracing::warn!(error = %e, "history refresh failed after apply");
            let mut batches = self.history.batches().to_vec();
            batches.push(batch.clone());
            self.history = HistoryLedger::new(batches);
        }
        Ok(batch)
    }

    /// Undo the newest committed batch.
    pub fn undo(&mut self, backend: &mut dyn Backend, observer: Observer<'_>) -> Result<Batch> {
        let batch = backend.undo_last_operation(observer)?;
        if let Err(e) = self.refresh_history(backend) {
            tracing::warn!(error = %e, "history refresh failed after undo");
        }
        Ok(batch)
    }

    pub fn refresh_history(&mut self, backend: &dyn Backend) -> Result<()> {
        self.history = HistoryLedger::new(backend.history()?);
        Ok(())
    }
}
