use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Operation;

/// Operations committed together by one apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Batch {
    pub id: Uuid,
    pub applied_at: DateTime<Utc>,
    pub operations: Vec<Operation>,
}

impl Batch {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            applied_at: Utc::now(),
            operations,
        }
    }
}

/// Cached view of committed batches, oldest first.
///
/// The backend owns the real history; this copy is refreshed after every
/// apply and undo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLedger {
    batches: Vec<Batch>,
}

impl HistoryLedger {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self { batches }
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Newest batch, the one `undo` would reverse.
    pub fn latest(&self) -> Option<&Batch> {
        self.batches.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.batches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter().rev()
    }
}
