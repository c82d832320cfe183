use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::db::{DocumentStore, StoreError};
use crate::services::extractor::MatchExtractor;
use crate::services::page_source::PageSource;
use crate::services::snapshot::{replace_snapshot, ReplaceOutcome};

pub const STATUS_OK: &str = "OK";
pub const STATUS_NO_MATCHES: &str = "No matches found";
pub const STATUS_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Replaced {
        deleted: usize,
        inserted: usize,
        preserved: usize,
        skipped_rows: usize,
    },
    /// The page yielded no usable rows; the store was not touched.
    NoMatches { skipped_rows: usize },
    /// The page never became ready; the write phase did not run.
    FetchFailed { reason: String },
}

impl SyncOutcome {
    /// Short status for the scheduler. Store failures never reach here, they
    /// surface as `Err` and map to [`STATUS_ERROR`].
    pub fn status(&self) -> &'static str {
        match self {
            SyncOutcome::Replaced { .. } => STATUS_OK,
            SyncOutcome::NoMatches { .. } | SyncOutcome::FetchFailed { .. } => STATUS_NO_MATCHES,
        }
    }
}

/// Extract matches from already-rendered markup and replace the stored snapshot.
pub async fn sync_daily_matches<S>(
    store: &S,
    extractor: &MatchExtractor,
    html: &str,
) -> Result<SyncOutcome, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let report = extractor.extract_with_report(html);

    if report.matches.is_empty() {
        tracing::info!("Extraction returned no matches, skipping the write phase");
        return Ok(SyncOutcome::NoMatches {
            skipped_rows: report.skipped,
        });
    }

    match replace_snapshot(store, &report.matches).await? {
        ReplaceOutcome::Replaced {
            deleted,
            inserted,
            preserved,
        } => Ok(SyncOutcome::Replaced {
            deleted,
            inserted,
            preserved,
            skipped_rows: report.skipped,
        }),
        ReplaceOutcome::NoOp => Ok(SyncOutcome::NoMatches {
            skipped_rows: report.skipped,
        }),
    }
}

/// One scheduled run: fetch the page, then extract and replace.
///
/// A fetch that fails or times out ends the run before anything is written.
pub async fn run_daily_sync<P, S>(
    source: &P,
    store: &S,
    extractor: &MatchExtractor,
    url: &str,
) -> Result<SyncOutcome, StoreError>
where
    P: PageSource + ?Sized,
    S: DocumentStore + ?Sized,
{
    let run_id = Uuid::new_v4();
    fetch_and_sync(source, store, extractor, url)
        .instrument(tracing::info_span!("daily_sync", %run_id))
        .await
}

async fn fetch_and_sync<P, S>(
    source: &P,
    store: &S,
    extractor: &MatchExtractor,
    url: &str,
) -> Result<SyncOutcome, StoreError>
where
    P: PageSource + ?Sized,
    S: DocumentStore + ?Sized,
{
    tracing::info!("Starting daily tennis sync");

    let html = match source.fetch_rendered(url).await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("Page fetch failed, stored snapshot left untouched: {}", e);
            return Ok(SyncOutcome::FetchFailed {
                reason: e.to_string(),
            });
        }
    };

    let outcome = sync_daily_matches(store, extractor, &html).await?;
    tracing::info!("Daily sync finished: {}", outcome.status());
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::MemoryStore;
    use crate::models::{sample_match, MatchDocument, StoredMatch, DEFAULT_BOOKMAKER};
    use crate::services::extractor::ExtractorSelectors;
    use crate::services::page_source::FetchError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;

    enum FakeSource {
        Page(String),
        TimesOut,
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch_rendered(&self, _url: &str) -> Result<String, FetchError> {
            match self {
                FakeSource::Page(html) => Ok(html.clone()),
                FakeSource::TimesOut => Err(FetchError::Timeout {
                    waited: Duration::from_secs(30),
                    selector: ".sportName-tennis .event__match".to_string(),
                }),
            }
        }
    }

    fn extractor() -> MatchExtractor {
        MatchExtractor::new(&ExtractorSelectors::default(), DEFAULT_BOOKMAKER).unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let m = sample_match("Madrid", "Ana", "Beatriz");
        MemoryStore::with_documents([MatchDocument {
            id: m.document_id(),
            body: StoredMatch {
                match_info: m,
                scraped_at: Utc::now(),
            },
        }])
    }

    const PAGE: &str = r#"<html><body><div class="sportName-tennis">
        <div class="event__title--name">Tournament A</div>
        <div class="event__match--twoLine">
          <div class="event__time">14:30</div>
          <div class="event__participant--home">Ana</div>
          <div class="event__participant--away">Beatriz</div>
          <div class="event__odd">1.5</div><div class="event__odd">2.5</div>
        </div>
        <div class="event__match--twoLine">
          <div class="event__time">16:00</div>
          <div class="event__participant--home">Carla</div>
        </div>
      </div></body></html>"#;

    #[tokio::test]
    async fn test_sync_replaces_snapshot() {
        let store = seeded_store();

        let outcome = sync_daily_matches(&store, &extractor(), PAGE).await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Replaced {
                deleted: 1,
                inserted: 1,
                preserved: 0,
                skipped_rows: 1
            }
        );
        assert_eq!(outcome.status(), STATUS_OK);
        let ids: Vec<String> = store.snapshot().into_keys().collect();
        assert_eq!(ids, vec!["tennis-tournament-a-ana-vs-beatriz".to_string()]);
    }

    #[tokio::test]
    async fn test_page_without_rows_does_not_write() {
        let store = seeded_store();
        let before = store.snapshot();

        let outcome = sync_daily_matches(&store, &extractor(), "<html><body></body></html>")
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::NoMatches { skipped_rows: 0 });
        assert_eq!(outcome.status(), STATUS_NO_MATCHES);
        assert_eq!(store.commits(), 0);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_fetch_timeout_aborts_before_write() {
        let store = seeded_store();
        let before = store.snapshot();

        let outcome = run_daily_sync(&FakeSource::TimesOut, &store, &extractor(), "http://example.test/tennis/")
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::FetchFailed { .. }));
        assert_eq!(outcome.status(), STATUS_NO_MATCHES);
        assert_eq!(store.commits(), 0);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_run_fetches_and_syncs() {
        let store = MemoryStore::default();
        let source = FakeSource::Page(PAGE.to_string());

        let outcome = run_daily_sync(&source, &store, &extractor(), "http://example.test/tennis/")
            .await
            .unwrap();

        assert_eq!(outcome.status(), STATUS_OK);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_propagates() {
        let store = seeded_store();
        let before = store.snapshot();
        store.reject_next_commit();

        let result = run_daily_sync(
            &FakeSource::Page(PAGE.to_string()),
            &store,
            &extractor(),
            "http://example.test/tennis/",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(store.snapshot(), before);
    }
}
