//! Conflict-free AI renaming of project moves.
//!
//! Enrichment visits project-origin operations in plan order, asks a
//! [`Namer`] for a better folder name, and routes every candidate through a
//! [`DestinationIndex`] built from the whole plan. Suggestions may be fetched
//! concurrently (feature `parallel`), but they are applied one at a time in
//! original order so disambiguator numbering is deterministic.

use std::path::Path;

use crate::error::NamingError;
use crate::events::{Event, Observer};
use crate::model::{AI_RENAME_SUFFIX, Operation, Plan, Project};
use crate::naming::{Namer, clean_suggestion};
use crate::resolve::{DestinationIndex, Disambiguation, last_segment, replace_last_segment};

/// Result of an enrichment pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichOutcome {
    pub plan: Plan,
    /// Operations whose destination changed.
    pub changed: usize,
    /// Naming calls that failed and fell back to the existing name.
    pub failures: usize,
}

struct Candidate<'a> {
    index: usize,
    project: Option<&'a Project>,
}

type Suggestion = Option<Result<Option<String>, NamingError>>;

/// Enrich every project operation in `plan`.
pub fn enrich(plan: &Plan, projects: &[Project], credential: &str, namer: &dyn Namer) -> EnrichOutcome {
    enrich_with(
        plan,
        projects,
        credential,
        namer,
        |_| true,
        |_| false,
        &mut crate::events::discard,
    )
}

/// Enrich the project operations selected by `scope`.
///
/// The destination index always covers the whole plan, and operations outside
/// `scope` are carried over unchanged. A candidate for which `occupied` holds
/// (typically "exists on disk") is disambiguated like a planned collision,
/// unless it is the operation's own source or current destination.
pub fn enrich_with(
    plan: &Plan,
    projects: &[Project],
    credential: &str,
    namer: &dyn Namer,
    scope: impl Fn(&Operation) -> bool,
    occupied: impl Fn(&Path) -> bool,
    observer: Observer<'_>,
) -> EnrichOutcome {
    let mut operations = plan.operations.clone();
    let mut index = DestinationIndex::build(&operations);

    let candidates: Vec<Candidate<'_>> = operations
        .iter()
        .enumerate()
        .filter(|(_, op)| op.is_enrichable() && scope(op))
        .map(|(index, op)| Candidate {
            index,
            project: projects
                .iter()
                .find(|p| op.source.as_deref() == Some(p.path.as_path())),
        })
        .collect();
    observer(Event::EnrichStarted {
        candidates: candidates.len(),
    });

    let suggestions = fetch_suggestions(&candidates, credential, namer);

    let mut changed = 0;
    let mut failures = 0;
    for (candidate, suggestion) in candidates.iter().zip(suggestions) {
        let op = &mut operations[candidate.index];
        let original = op.destination.clone();
        index.release(&original);

        let Some(suggestion) = suggestion else {
            tracing::debug!(op = %op.id, "no project matches source, keeping destination");
            index.claim(&original);
            continue;
        };

        let suggested = match suggestion {
            Ok(Some(raw)) => clean_suggestion(&raw),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(op = %op.id, error = %e, "name suggestion failed, keeping name");
                observer(Event::NamingFailed {
                    op_id: op.id.clone(),
                    error: e.to_string(),
                });
                failures += 1;
                None
            }
        };
        if let Some(name) = &suggested {
            observer(Event::NameSuggested {
                op_id: op.id.clone(),
                name: name.clone(),
            });
        }

        let name = suggested.clone().unwrap_or_else(|| last_segment(&original));
        let source = op.source.clone();
        let winner = index.resolve_with(
            &replace_last_segment(&original, &name),
            Disambiguation::Append,
            |p| p != original && source.as_deref() != Some(p) && occupied(p),
        );
        if winner != original {
            tracing::info!(op = %op.id, from = %original.display(), to = %winner.display(), "renamed");
            if suggested.is_some() && !op.reason.ends_with(AI_RENAME_SUFFIX) {
                op.reason.push_str(AI_RENAME_SUFFIX);
            }
            op.destination = winner.clone();
            observer(Event::OpRenamed {
                op_id: op.id.clone(),
                from: original,
                to: winner,
            });
            changed += 1;
        }
    }

    observer(Event::EnrichCompleted { changed });
    EnrichOutcome {
        plan: Plan {
            summary: plan.summary.clone(),
            operations,
        },
        changed,
        failures,
    }
}

/// One entry per candidate; `None` when no project matched its source.
#[cfg(not(feature = "parallel"))]
fn fetch_suggestions(candidates: &[Candidate<'_>], credential: &str, namer: &dyn Namer) -> Vec<Suggestion> {
    candidates
        .iter()
        .map(|c| c.project.map(|p| namer.suggest_name(p, credential)))
        .collect()
}

#[cfg(feature = "parallel")]
fn fetch_suggestions(candidates: &[Candidate<'_>], credential: &str, namer: &dyn Namer) -> Vec<Suggestion> {
    use rayon::prelude::*;
    candidates
        .par_iter()
        .map(|c| c.project.map(|p| namer.suggest_name(p, credential)))
        .collect()
}
