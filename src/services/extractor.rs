//! Turns a rendered results page into `Match` records.
//!
//! The page is read as a flat, document-ordered sequence of tournament headings and
//! match rows. Each row is parsed on its own: a malformed row is counted and skipped,
//! it never costs the rest of the page.

use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::models::{Match, MatchStatus, OddsPair, Player, SPORT_TENNIS, UNKNOWN_TOURNAMENT};
use crate::utils::{collapse_whitespace, parse_price};

/// CSS selectors for the results page. Defaults target the tennis listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorSelectors {
    /// Match rows, scoped to the sport's container.
    pub row: String,
    pub heading: String,
    pub home: String,
    pub away: String,
    pub odds: String,
    pub time: String,
}

impl Default for ExtractorSelectors {
    fn default() -> Self {
        Self {
            row: ".sportName-tennis .event__match--twoLine".to_string(),
            heading: "div.event__title--name".to_string(),
            home: ".event__participant--home".to_string(),
            away: ".event__participant--away".to_string(),
            odds: ".event__odd".to_string(),
            time: ".event__time".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => f.write_str("home"),
            Side::Away => f.write_str("away"),
        }
    }
}

/// Why a row was left out of the batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("missing {0} participant")]
    MissingParticipant(Side),

    #[error("empty {0} participant name")]
    EmptyParticipant(Side),

    #[error("missing match time")]
    MissingTime,

    #[error("non-numeric odds '{0}'")]
    InvalidOdds(String),
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub matches: Vec<Match>,
    pub rows_seen: usize,
    pub skipped: usize,
}

enum PageNode<'a> {
    Heading(String),
    Row(ElementRef<'a>),
}

pub struct MatchExtractor {
    // heading and row selectors joined, so one traversal yields both in document order
    scan: Selector,
    heading: Selector,
    home: Selector,
    away: Selector,
    odds: Selector,
    time: Selector,
    bookmaker: String,
}

impl MatchExtractor {
    pub fn new(selectors: &ExtractorSelectors, bookmaker: impl Into<String>) -> Result<Self, ExtractorError> {
        Ok(Self {
            scan: compile(&format!("{}, {}", selectors.heading, selectors.row))?,
            heading: compile(&selectors.heading)?,
            home: compile(&selectors.home)?,
            away: compile(&selectors.away)?,
            odds: compile(&selectors.odds)?,
            time: compile(&selectors.time)?,
            bookmaker: bookmaker.into(),
        })
    }

    pub fn extract(&self, html: &str) -> Vec<Match> {
        self.extract_with_report(html).matches
    }

    pub fn extract_with_report(&self, html: &str) -> ExtractionReport {
        let document = Html::parse_document(html);
        let mut report = ExtractionReport::default();
        let mut tournament: Option<String> = None;

        for node in self.page_nodes(&document) {
            match node {
                // a blank heading still opens a new group, just an unnamed one
                PageNode::Heading(name) => tournament = (!name.is_empty()).then_some(name),
                PageNode::Row(row) => {
                    report.rows_seen += 1;
                    let tournament_name = tournament.as_deref().unwrap_or(UNKNOWN_TOURNAMENT);
                    match self.parse_row(row, tournament_name) {
                        Ok(m) => report.matches.push(m),
                        Err(reason) => {
                            report.skipped += 1;
                            tracing::debug!(
                                "Skipping row {} under '{}': {}",
                                report.rows_seen,
                                tournament_name,
                                reason
                            );
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Extracted {} matches from {} rows ({} skipped)",
            report.matches.len(),
            report.rows_seen,
            report.skipped
        );
        report
    }

    fn page_nodes<'a>(&self, document: &'a Html) -> Vec<PageNode<'a>> {
        document
            .root_element()
            .select(&self.scan)
            .map(|el| {
                if self.heading.matches(&el) {
                    PageNode::Heading(element_text(el))
                } else {
                    PageNode::Row(el)
                }
            })
            .collect()
    }

    fn parse_row(&self, row: ElementRef<'_>, tournament: &str) -> Result<Match, SkipReason> {
        let player1 = self.participant(row, &self.home, Side::Home)?;
        let player2 = self.participant(row, &self.away, Side::Away)?;

        // Only the first two price cells are outright odds; the page may append others.
        let mut prices = row
            .select(&self.odds)
            .take(2)
            .map(|el| parse_price(&element_text(el)).map_err(SkipReason::InvalidOdds));
        let p1_wins = prices.next().transpose()?.flatten();
        let p2_wins = prices.next().transpose()?.flatten();

        let match_time_str = row
            .select(&self.time)
            .next()
            .map(element_text)
            .ok_or(SkipReason::MissingTime)?;

        Ok(Match {
            sport: SPORT_TENNIS.to_string(),
            tournament_name: tournament.to_string(),
            match_time_str,
            player1,
            player2,
            odds: BTreeMap::from([(self.bookmaker.clone(), OddsPair { p1_wins, p2_wins })]),
            status: MatchStatus::Scheduled,
        })
    }

    fn participant(&self, row: ElementRef<'_>, selector: &Selector, side: Side) -> Result<Player, SkipReason> {
        let el = row
            .select(selector)
            .next()
            .ok_or(SkipReason::MissingParticipant(side))?;
        let name = element_text(el);
        if name.is_empty() {
            return Err(SkipReason::EmptyParticipant(side));
        }
        Ok(Player::new(name))
    }
}

fn compile(selector: &str) -> Result<Selector, ExtractorError> {
    Selector::parse(selector).map_err(|e| ExtractorError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}
