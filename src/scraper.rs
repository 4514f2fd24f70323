//! Match ingestion: upcoming-match fetch and per-match event scraping

use crate::config::Config;
use crate::db::Database;
use crate::types::{MatchEvent, MatchRecord};
use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Scraper for the external football-data provider
pub struct Scraper {
    client: Client,
    config: Config,
    event_re: Regex,
}

/// Raw upcoming-match entry from the provider API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMatch {
    id: String,
    home_team: String,
    away_team: String,
    #[serde(default)]
    competition: Option<String>,
    #[serde(default)]
    match_url: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    score: Option<ApiScore>,
}

#[derive(Debug, Deserialize)]
struct ApiScore {
    #[serde(default)]
    home: Option<i64>,
    #[serde(default)]
    away: Option<i64>,
}

/// An upcoming match as exposed to the rest of the system
#[derive(Debug, Clone)]
pub struct UpcomingMatch {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub competition: Option<String>,
    pub match_url: Option<String>,
    pub finished: bool,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

/// Summary of one scrape cycle
#[derive(Debug, Default)]
pub struct ScrapeSummary {
    pub matches: usize,
    pub events: usize,
}

impl Scraper {
    pub fn new(config: Config) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        // Event rows look like:
        //   <li class="event"><span class="minute">23'</span>
        //   <span class="player">Saka</span><span class="type">goal</span></li>
        let event_re = Regex::new(
            r#"(?s)<li class="event">\s*<span class="minute">(\d+)'?</span>\s*<span class="player">([^<]+)</span>\s*<span class="type">([^<]+)</span>"#,
        )
        .expect("invalid event regex");

        Self {
            client,
            config,
            event_re,
        }
    }

    /// Fetch the provider's upcoming-match list
    pub async fn fetch_upcoming_matches(&self) -> Result<Vec<UpcomingMatch>> {
        let url = format!("{}/matches/upcoming", self.config.football_api_url);
        debug!("Fetching upcoming matches from: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch upcoming matches")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Football API error {}: {}", status, body);
        }

        let raw: Vec<ApiMatch> = response
            .json()
            .await
            .context("Failed to parse upcoming matches")?;

        let matches = raw.into_iter().map(|m| self.parse_match(m)).collect::<Vec<_>>();
        info!("Upcoming matches fetched: {}", matches.len());
        Ok(matches)
    }

    fn parse_match(&self, raw: ApiMatch) -> UpcomingMatch {
        let finished = raw
            .status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("FINISHED"))
            .unwrap_or(false);

        let (home_score, away_score) = raw
            .score
            .map(|s| (s.home, s.away))
            .unwrap_or((None, None));

        UpcomingMatch {
            id: raw.id,
            home_team: raw.home_team,
            away_team: raw.away_team,
            competition: raw.competition,
            match_url: raw.match_url,
            finished,
            home_score,
            away_score,
        }
    }

    /// Fetch a match page and extract its event rows
    pub async fn scrape_match_events(&self, match_url: &str) -> Result<Vec<MatchEvent>> {
        let response = self
            .client
            .get(match_url)
            .send()
            .await
            .context("Failed to fetch match page")?;

        if !response.status().is_success() {
            anyhow::bail!("Match page error {}", response.status());
        }

        let html = response.text().await.context("Failed to read match page")?;
        Ok(self.extract_events(&html))
    }

    /// Pull (minute, player, event type) triples out of the page markup
    fn extract_events(&self, html: &str) -> Vec<MatchEvent> {
        self.event_re
            .captures_iter(html)
            .filter_map(|caps| {
                let minute = caps.get(1)?.as_str().parse().ok()?;
                Some(MatchEvent {
                    minute,
                    player: caps.get(2)?.as_str().trim().to_string(),
                    event_type: caps.get(3)?.as_str().trim().to_lowercase(),
                })
            })
            .collect()
    }

    /// One full ingestion cycle: fetch the upcoming list and scrape each
    /// match sequentially, upserting as we go. A failed scrape skips that
    /// match and moves on.
    pub async fn run_cycle(&self, db: &Database) -> Result<ScrapeSummary> {
        let matches = self.fetch_upcoming_matches().await?;
        let mut summary = ScrapeSummary {
            matches: matches.len(),
            events: 0,
        };

        for m in &matches {
            if let Err(e) = self.ingest_match(db, m).await {
                warn!("Failed to ingest match {}: {}", m.id, e);
                continue;
            }
            if let Some(record) = db.get_match(&m.id).await? {
                summary.events += record.events.len();
            }
        }

        Ok(summary)
    }

    /// Refresh a single match on demand (missing or stale record)
    pub async fn refresh_match(&self, db: &Database, match_id: &str) -> Result<Option<MatchRecord>> {
        let matches = self.fetch_upcoming_matches().await?;
        let Some(found) = matches.into_iter().find(|m| m.id == match_id) else {
            debug!("Match {} not in provider's upcoming list", match_id);
            return db.get_match(match_id).await;
        };

        self.ingest_match(db, &found).await?;
        db.get_match(match_id).await
    }

    async fn ingest_match(&self, db: &Database, m: &UpcomingMatch) -> Result<()> {
        db.upsert_match(
            &m.id,
            &m.home_team,
            &m.away_team,
            m.competition.as_deref(),
            m.home_score,
            m.away_score,
            m.finished,
        )
        .await?;

        if let Some(url) = &m.match_url {
            let events = self.scrape_match_events(url).await?;
            db.replace_match_events(&m.id, &events).await?;
        }

        Ok(())
    }
}
