use thiserror::Error;

/// Failure reported by a naming collaborator.
///
/// Enrichment never surfaces this to the user: it degrades the affected
/// operation to "no rename" and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("naming failed: {0}")]
pub struct NamingError(pub String);

impl NamingError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors surfaced by the plan core and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    #[error("scan failed: {0}")]
    Scan(String),
    #[error("plan generation failed: {0}")]
    Plan(String),
    #[error("apply failed: {0}")]
    Apply(String),
    #[error("undo failed: {0}")]
    Undo(String),
    #[error("cannot read history: {0}")]
    History(String),
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error("config error: {0}")]
    Config(String),
    #[error("no plan loaded")]
    NoPlan,
    #[error("operation index {index} out of range (plan has {len} operations)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("an enrichment pass is already in progress")]
    EnrichmentInProgress,
    #[error("plan was replaced while the enrichment pass was running")]
    StalePlan,
}

pub type Result<T> = std::result::Result<T, Error>;
