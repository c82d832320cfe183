use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::db::SqliteStore;
use crate::models::{MatchDocument, MatchStatus};
use crate::services::{run_daily_sync, sync_daily_matches, SyncOutcome, STATUS_ERROR};

pub async fn sync_from_web(config: &Config, store: &SqliteStore) -> Result<()> {
    let source = config.page_source()?;
    let extractor = config.extractor()?;

    println!("🎾 Syncing scheduled matches from {}", config.target_url);

    match run_daily_sync(&source, store, &extractor, &config.target_url).await {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            println!("❌ {}: {}", STATUS_ERROR, e);
            Err(e.into())
        }
    }
}

pub async fn sync_from_file(config: &Config, store: &SqliteStore, path: &Path) -> Result<()> {
    let extractor = config.extractor()?;
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Could not read saved page {}", path.display()))?;

    println!("📄 Syncing scheduled matches from {}", path.display());

    match sync_daily_matches(store, &extractor, &html).await {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            println!("❌ {}: {}", STATUS_ERROR, e);
            Err(e.into())
        }
    }
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Replaced {
            deleted,
            inserted,
            preserved,
            skipped_rows,
        } => {
            println!("✅ {}: {} inserted, {} replaced", outcome.status(), inserted, deleted);
            if *preserved > 0 {
                println!("🔒 {} matches already settled or archived, kept as stored", preserved);
            }
            if *skipped_rows > 0 {
                println!("⚠️  {} malformed rows skipped", skipped_rows);
            }
        }
        SyncOutcome::NoMatches { skipped_rows } => {
            println!("📭 {} ({} rows skipped). Stored snapshot unchanged.", outcome.status(), skipped_rows);
        }
        SyncOutcome::FetchFailed { reason } => {
            println!("⚠️  Page fetch failed: {}", reason);
            println!("📭 {}. Stored snapshot unchanged.", outcome.status());
        }
    }
}

/// Print the stored snapshot grouped by tournament. `all` includes settled and archived matches.
pub async fn show_matches(store: &SqliteStore, all: bool) -> Result<()> {
    let documents = if all {
        store.all_documents().await?
    } else {
        store.scheduled_documents().await?
    };

    if documents.is_empty() {
        println!("📭 No matches stored. Try: tennis-snapshot sync");
        return Ok(());
    }

    println!("📅 {} {}matches:\n", documents.len(), if all { "" } else { "scheduled " });

    let mut current_tournament = String::new();
    for doc in &documents {
        let m = &doc.body.match_info;
        if m.tournament_name != current_tournament {
            if !current_tournament.is_empty() {
                println!();
            }
            println!("🏆 {}", m.tournament_name);
            current_tournament = m.tournament_name.clone();
        }

        let prices = m
            .odds
            .iter()
            .map(|(bookmaker, pair)| {
                format!("{} {} | {}", bookmaker, price_label(pair.p1_wins), price_label(pair.p2_wins))
            })
            .collect::<Vec<_>>()
            .join(", ");

        println!(
            "   {}  {} vs {}  ({}) [{}]",
            m.match_time_str, m.player1.name, m.player2.name, prices, m.status
        );
    }

    Ok(())
}

fn price_label(price: Option<f64>) -> String {
    price.map_or("-".to_string(), |p| format!("{:.2}", p))
}

pub async fn settle_match(store: &SqliteStore, id: &str, status: MatchStatus) -> Result<()> {
    if store.set_status(id, status).await? {
        println!("✅ {} marked {}", id, status);
        Ok(())
    } else {
        Err(anyhow!("No stored match with id '{}'", id))
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    tournament: &'a str,
    time: &'a str,
    player1: &'a str,
    player2: &'a str,
    bookmaker: &'a str,
    p1_wins: Option<f64>,
    p2_wins: Option<f64>,
    scraped_at: String,
}

pub async fn export_snapshot(store: &SqliteStore, format: &str, out: &Path, bookmaker: &str) -> Result<()> {
    let documents = store.scheduled_documents().await?;

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    match format.to_lowercase().as_str() {
        "csv" => {
            let file = std::fs::File::create(out)?;
            write_csv(&documents, bookmaker, file)?;
        }
        "json" => {
            let json_str = serde_json::to_string_pretty(&documents)?;
            tokio::fs::write(out, json_str).await?;
        }
        _ => return Err(anyhow!("Unsupported format: {}. Use 'csv' or 'json'", format)),
    }

    println!("💾 Exported {} scheduled matches to {}", documents.len(), out.display());
    Ok(())
}

/// One row per match; prices are those of `bookmaker`, empty when absent.
fn write_csv<W: Write>(documents: &[MatchDocument], bookmaker: &str, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    for doc in documents {
        let m = &doc.body.match_info;
        let pair = m.odds.get(bookmaker).copied().unwrap_or_default();
        writer.serialize(ExportRow {
            id: &doc.id,
            tournament: &m.tournament_name,
            time: &m.match_time_str,
            player1: &m.player1.name,
            player2: &m.player2.name,
            bookmaker,
            p1_wins: pair.p1_wins,
            p2_wins: pair.p2_wins,
            scraped_at: doc.body.scraped_at.to_rfc3339(),
        })?;
    }

    writer.flush()?;
    Ok(())
}
