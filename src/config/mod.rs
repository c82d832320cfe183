use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::models::DEFAULT_BOOKMAKER;
use crate::services::{ExtractorSelectors, HttpPageSource, MatchExtractor};

const DEFAULT_TARGET_URL: &str = "https://www.flashscore.com/tennis/";
const DEFAULT_DATABASE_URL: &str = "sqlite:data/tennis_snapshot.db";
const DEFAULT_READY_SELECTOR: &str = ".sportName-tennis .event__match";

#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: String,
    pub database_url: String,
    /// Selector that must be present before the page counts as rendered.
    pub ready_selector: String,
    /// Hard cap on the whole fetch-and-wait step.
    pub page_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub bookmaker: String,
    pub selectors: ExtractorSelectors,
}

impl Config {
    /// Read settings from the environment (after `dotenv` has loaded `.env`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let mut selectors = ExtractorSelectors::default();
        if let Some(row) = get("ROW_SELECTOR") {
            selectors.row = row;
        }
        if let Some(heading) = get("HEADING_SELECTOR") {
            selectors.heading = heading;
        }

        Ok(Self {
            target_url: text("TARGET_URL", DEFAULT_TARGET_URL),
            database_url: text("DATABASE_URL", DEFAULT_DATABASE_URL),
            ready_selector: text("READY_SELECTOR", DEFAULT_READY_SELECTOR),
            page_timeout: seconds(&get, "PAGE_TIMEOUT_SECS", 90)?,
            request_timeout: seconds(&get, "REQUEST_TIMEOUT_SECS", 60)?,
            poll_interval: seconds(&get, "POLL_INTERVAL_SECS", 5)?,
            bookmaker: text("BOOKMAKER_KEY", DEFAULT_BOOKMAKER),
            selectors,
        })
    }

    pub fn extractor(&self) -> Result<MatchExtractor> {
        Ok(MatchExtractor::new(&self.selectors, self.bookmaker.clone())?)
    }

    pub fn page_source(&self) -> Result<HttpPageSource> {
        HttpPageSource::new(
            &self.ready_selector,
            self.request_timeout,
            self.page_timeout,
            self.poll_interval,
        )
    }
}

fn seconds(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    match get(key) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, raw))?;
            Ok(Duration::from_secs(secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.target_url, DEFAULT_TARGET_URL);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.page_timeout, Duration::from_secs(90));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.bookmaker, "bookmakerA");
        assert_eq!(config.selectors, ExtractorSelectors::default());
        assert!(config.extractor().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("TARGET_URL", "http://localhost:8080/tennis/"),
            ("PAGE_TIMEOUT_SECS", " 30 "),
            ("BOOKMAKER_KEY", "pinnacle"),
            ("ROW_SELECTOR", "#live .event__match"),
        ])
        .unwrap();
        assert_eq!(config.target_url, "http://localhost:8080/tennis/");
        assert_eq!(config.page_timeout, Duration::from_secs(30));
        assert_eq!(config.bookmaker, "pinnacle");
        assert_eq!(config.selectors.row, "#live .event__match");
        assert_eq!(config.selectors.heading, ExtractorSelectors::default().heading);
    }

    #[test]
    fn test_invalid_timeout_is_an_error() {
        let err = config(&[("PAGE_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("PAGE_TIMEOUT_SECS"));
    }

    #[test]
    fn test_invalid_row_selector_surfaces_from_extractor() {
        let config = config(&[("ROW_SELECTOR", "div[")]).unwrap();
        assert!(config.extractor().is_err());
    }
}
