use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::db::store::{CommitSummary, DocumentStore, StoreError, WriteBatch, WriteOp};
use crate::models::{MatchDocument, MatchStatus, StoredMatch};

/// Document store over the `matches` table. Each row keeps the full JSON document
/// next to the columns we filter on.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn documents_with_status(&self, status: MatchStatus) -> Result<Vec<MatchDocument>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, document FROM matches WHERE status = ? ORDER BY tournament_name, id",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(decode_row(&row)?);
        }
        Ok(documents)
    }

    pub async fn scheduled_documents(&self) -> Result<Vec<MatchDocument>, StoreError> {
        self.documents_with_status(MatchStatus::Scheduled).await
    }

    pub async fn all_documents(&self) -> Result<Vec<MatchDocument>, StoreError> {
        let rows = sqlx::query("SELECT id, document FROM matches ORDER BY tournament_name, id")
            .fetch_all(&self.pool)
            .await?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(decode_row(&row)?);
        }
        Ok(documents)
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<MatchDocument>, StoreError> {
        let row = sqlx::query("SELECT id, document FROM matches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| decode_row(&r)).transpose()
    }

    /// Mark a stored match with a new status. Returns false if no document has that id.
    ///
    /// Once a match leaves `scheduled` the daily replacement no longer deletes it.
    pub async fn set_status(&self, id: &str, status: MatchStatus) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query("SELECT id, document FROM matches WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(false);
        };

        let mut document = decode_row(&row)?;
        document.body.match_info.status = status;
        let body = serde_json::to_string(&document.body)?;

        sqlx::query("UPDATE matches SET status = ?, document = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&body)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Match {} marked {}", id, status);
        Ok(true)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn ids_with_status(&self, status: MatchStatus) -> Result<Vec<String>, StoreError> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM matches WHERE status = ?")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitSummary, StoreError> {
        let mut summary = CommitSummary::default();
        if batch.is_empty() {
            return Ok(summary);
        }

        let mut tx = self.pool.begin().await?;

        for op in batch.ops() {
            match apply_op(&mut tx, op).await {
                Ok(affected) => match op {
                    WriteOp::Delete { .. } => summary.deleted += affected as usize,
                    WriteOp::Upsert { id, .. } if affected == 0 => {
                        summary.preserved.insert(id.clone());
                    }
                    WriteOp::Upsert { .. } => {}
                },
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::warn!("Rollback after failed batch also failed: {}", rollback_err);
                    }
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        tracing::debug!(
            "Committed batch: {} of {} deletes applied, {} upserts ({} preserved)",
            summary.deleted,
            batch.deletes(),
            batch.upserts(),
            summary.preserved.len()
        );
        Ok(summary)
    }
}

/// Returns the number of rows the statement changed. The status guard makes both
/// statements no-ops against a settled or archived row.
async fn apply_op(tx: &mut Transaction<'_, Sqlite>, op: &WriteOp) -> Result<u64, StoreError> {
    let scheduled = MatchStatus::Scheduled.as_str();
    let result = match op {
        WriteOp::Delete { id } => {
            sqlx::query("DELETE FROM matches WHERE id = ? AND status = ?")
                .bind(id)
                .bind(scheduled)
                .execute(&mut **tx)
                .await?
        }
        WriteOp::Upsert { id, document } => {
            let body = serde_json::to_string(document)?;
            sqlx::query(
                r#"INSERT INTO matches (id, status, sport, tournament_name, document, scraped_at)
                   VALUES (?, ?, ?, ?, ?, ?)
                   ON CONFLICT(id) DO UPDATE SET
                       status          = excluded.status,
                       sport           = excluded.sport,
                       tournament_name = excluded.tournament_name,
                       document        = excluded.document,
                       scraped_at      = excluded.scraped_at
                   WHERE matches.status = ?"#,
            )
            .bind(id)
            .bind(document.match_info.status.as_str())
            .bind(&document.match_info.sport)
            .bind(&document.match_info.tournament_name)
            .bind(&body)
            .bind(document.scraped_at.to_rfc3339())
            .bind(scheduled)
            .execute(&mut **tx)
            .await?
        }
    };
    Ok(result.rows_affected())
}

fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<MatchDocument, StoreError> {
    let body: StoredMatch = serde_json::from_str(&row.get::<String, _>("document"))?;
    Ok(MatchDocument {
        id: row.get("id"),
        body,
    })
}
