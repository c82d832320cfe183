use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::models::{MatchStatus, StoredMatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Both ops only act on documents that are still `scheduled` when the batch commits.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Removes `id` unless it has since been settled or archived.
    Delete { id: String },
    /// Full-document overwrite at `id`. A stored document in any other status is kept as is.
    Upsert { id: String, document: StoredMatch },
}

/// Writes staged for a single atomic commit. Ops are applied in staging order.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&mut self, id: impl Into<String>) {
        self.ops.push(WriteOp::Delete { id: id.into() });
    }

    pub fn upsert(&mut self, id: impl Into<String>, document: StoredMatch) {
        self.ops.push(WriteOp::Upsert {
            id: id.into(),
            document,
        });
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn deletes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, WriteOp::Delete { .. }))
            .count()
    }

    pub fn upserts(&self) -> usize {
        self.ops.len() - self.deletes()
    }
}

/// What a commit actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub deleted: usize,
    /// Upsert targets left alone because the stored document is no longer `scheduled`.
    pub preserved: BTreeSet<String>,
}

/// A mapping-document store keyed by document id.
///
/// `commit` must be all-or-nothing: either every op in the batch is applied
/// or none is. The status check behind each op happens inside the commit, so a
/// document settled after `ids_with_status` ran is still left untouched.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ids_with_status(&self, status: MatchStatus) -> Result<Vec<String>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<CommitSummary, StoreError>;
}
