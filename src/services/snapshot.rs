use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::db::{DocumentStore, StoreError, WriteBatch};
use crate::models::{Match, MatchStatus, StoredMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReplaceOutcome {
    /// Nothing to write; the stored snapshot was left alone.
    NoOp,
    Replaced {
        deleted: usize,
        inserted: usize,
        /// Extracted matches whose id already belongs to a settled or archived document.
        preserved: usize,
    },
}

/// Swap the stored `scheduled` snapshot for `matches` in one atomic commit.
pub async fn replace_snapshot<S>(store: &S, matches: &[Match]) -> Result<ReplaceOutcome, StoreError>
where
    S: DocumentStore + ?Sized,
{
    replace_snapshot_at(store, matches, Utc::now()).await
}

/// Same as [`replace_snapshot`] with an explicit write timestamp.
///
/// An empty `matches` never reaches the store: a page that degraded to zero rows
/// must not wipe the current snapshot. Documents in any status other than
/// `scheduled` are neither deleted nor overwritten, even when a match re-extracted
/// today maps to the same id. If two matches share a document id the later one wins.
pub async fn replace_snapshot_at<S>(
    store: &S,
    matches: &[Match],
    scraped_at: DateTime<Utc>,
) -> Result<ReplaceOutcome, StoreError>
where
    S: DocumentStore + ?Sized,
{
    if matches.is_empty() {
        tracing::info!("No matches to write, stored snapshot left untouched");
        return Ok(ReplaceOutcome::NoOp);
    }

    let stale = store.ids_with_status(MatchStatus::Scheduled).await?;

    let mut batch = WriteBatch::new();
    for id in &stale {
        batch.delete(id.clone());
    }

    let mut written = HashSet::new();
    let mut collisions = 0usize;
    for match_info in matches {
        let id = match_info.document_id();
        if !written.insert(id.clone()) {
            collisions += 1;
            tracing::warn!("Duplicate document id {} in this run, last row wins", id);
        }
        batch.upsert(
            id,
            StoredMatch {
                match_info: match_info.clone(),
                scraped_at,
            },
        );
    }

    if collisions > 0 {
        tracing::warn!(
            "{} of {} extracted matches collided on document id",
            collisions,
            matches.len()
        );
    }

    let summary = store.commit(batch).await?;

    if !summary.preserved.is_empty() {
        tracing::warn!(
            "{} extracted matches are already settled or archived, stored documents kept",
            summary.preserved.len()
        );
    }

    let inserted = written.len().saturating_sub(summary.preserved.len());
    tracing::info!(
        "Snapshot replaced: {} scheduled documents deleted, {} inserted",
        summary.deleted,
        inserted
    );

    Ok(ReplaceOutcome::Replaced {
        deleted: summary.deleted,
        inserted,
        preserved: summary.preserved.len(),
    })
}
