use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::db::store::{CommitSummary, DocumentStore, StoreError, WriteBatch, WriteOp};
use crate::models::{MatchDocument, MatchStatus};

/// Test double for the document store. Commits build the next state on a copy and
/// swap it in, so a rejected commit leaves the map untouched.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, MatchDocument>>,
    reject_next_commit: AtomicBool,
    commits: AtomicUsize,
}

impl MemoryStore {
    pub fn with_documents(documents: impl IntoIterator<Item = MatchDocument>) -> Self {
        let store = Self::default();
        {
            let mut docs = store.docs.lock().unwrap();
            for doc in documents {
                docs.insert(doc.id.clone(), doc);
            }
        }
        store
    }

    pub fn reject_next_commit(&self) {
        self.reject_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> BTreeMap<String, MatchDocument> {
        self.docs.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ids_with_status(&self, status: MatchStatus) -> Result<Vec<String>, StoreError> {
        let docs = self.docs.lock().unwrap();
        Ok(docs
            .values()
            .filter(|d| d.status() == status)
            .map(|d| d.id.clone())
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitSummary, StoreError> {
        if self.reject_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }

        let mut docs = self.docs.lock().unwrap();
        let mut next = docs.clone();
        let mut summary = CommitSummary::default();
        for op in batch.ops() {
            match op {
                WriteOp::Delete { id } => {
                    if next.contains_key(id) && open_slot(&next, id) {
                        next.remove(id);
                        summary.deleted += 1;
                    }
                }
                WriteOp::Upsert { id, .. } if !open_slot(&next, id) => {
                    summary.preserved.insert(id.clone());
                }
                WriteOp::Upsert { id, document } => {
                    next.insert(
                        id.clone(),
                        MatchDocument {
                            id: id.clone(),
                            body: document.clone(),
                        },
                    );
                }
            }
        }
        *docs = next;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(summary)
    }
}

/// True when `id` is free or still holds a `scheduled` document.
fn open_slot(docs: &BTreeMap<String, MatchDocument>, id: &str) -> bool {
    docs.get(id).map_or(true, |d| d.status() == MatchStatus::Scheduled)
}
