use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::slug;

pub const SPORT_TENNIS: &str = "tennis";
pub const UNKNOWN_TOURNAMENT: &str = "Unknown Tournament";
pub const DEFAULT_BOOKMAKER: &str = "bookmakerA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Settled,
    Archived,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Settled => "settled",
            MatchStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "settled" => Ok(MatchStatus::Settled),
            "archived" => Ok(MatchStatus::Archived),
            other => Err(anyhow::anyhow!(
                "Unknown status '{}'. Use 'scheduled', 'settled' or 'archived'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Outright prices for one bookmaker. A side is `None` when the page shows no price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OddsPair {
    pub p1_wins: Option<f64>,
    pub p2_wins: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub sport: String,
    pub tournament_name: String,
    /// Time exactly as the page shows it ("14:30", "FRO", ...). Not parsed here.
    pub match_time_str: String,
    pub player1: Player,
    pub player2: Player,
    pub odds: BTreeMap<String, OddsPair>,
    pub status: MatchStatus,
}

impl Match {
    pub fn document_id(&self) -> String {
        document_id(
            &self.sport,
            &self.tournament_name,
            &self.player1.name,
            &self.player2.name,
        )
    }
}

/// Storage key for a match: `sport-tournament-player1-vs-player2`, each part slugged.
///
/// The same real-world match maps to the same key on every run, which is what makes
/// "delete every scheduled document, then insert" idempotent.
pub fn document_id(sport: &str, tournament: &str, player1: &str, player2: &str) -> String {
    format!(
        "{}-{}-{}-vs-{}",
        sport,
        slug(tournament),
        slug(player1),
        slug(player2)
    )
}

/// A match as written to the store. `scraped_at` is stamped at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMatch {
    #[serde(flatten)]
    pub match_info: Match,
    pub scraped_at: DateTime<Utc>,
}

/// A stored document together with its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDocument {
    pub id: String,
    #[serde(flatten)]
    pub body: StoredMatch,
}

impl MatchDocument {
    pub fn status(&self) -> MatchStatus {
        self.body.match_info.status
    }
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_match(tournament: &str, player1: &str, player2: &str) -> Match {
    Match {
        sport: SPORT_TENNIS.to_string(),
        tournament_name: tournament.to_string(),
        match_time_str: "14:30".to_string(),
        player1: Player::new(player1),
        player2: Player::new(player2),
        odds: BTreeMap::from([(
            DEFAULT_BOOKMAKER.to_string(),
            OddsPair {
                p1_wins: Some(1.5),
                p2_wins: Some(2.5),
            },
        )]),
        status: MatchStatus::Scheduled,
    }
}
