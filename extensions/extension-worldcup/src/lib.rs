//! # extension-worldcup
//!
//! World Cup extension for Blockpad.
//!
//! This extension adds two reporter blocks backed by the `worldcup.sfg.io`
//! JSON API: one that reports the group letter a team was drawn into, and one
//! that reports the winner of the match between two finalists. The block
//! menus are fed from a fixed table of the 32 finals participants.
//!
//! ## Blocks
//!
//! - `group of %m.codes` - group letter for a FIFA code
//! - `result of match %m.countries vs %m.countries` - winner of the pairing,
//!   in either venue order
//!
//! Each block invocation resolves exactly once. A scan that comes up dry
//! delivers an explicit empty reply rather than an error, and upstream
//! failures surface as typed errors without taking the extension down; it
//! stays registered and ready for the next invocation.

use async_trait::async_trait;
use blockpad_extension_core::prelude::*;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum WorldCupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("World Cup API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unknown country: {0}")]
    UnknownCountry(String),
}

impl From<WorldCupError> for ExtensionError {
    fn from(err: WorldCupError) -> Self {
        match err {
            WorldCupError::Http(e) => ExtensionError::Network(e.to_string()),
            WorldCupError::Api(e) => ExtensionError::Upstream(e),
            WorldCupError::Parse(e) => ExtensionError::Upstream(format!("Parse error: {e}")),
            WorldCupError::Timeout(secs) => ExtensionError::Timeout(secs),
            WorldCupError::UnknownCountry(name) => ExtensionError::UnknownOption(name),
        }
    }
}

// ============================================================================
// World Cup API Response Types
// ============================================================================

/// One entry from `/teams/results`.
///
/// The live payload carries standings columns (wins, goals, points) as well;
/// only the identity and draw fields matter here and the rest are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResult {
    pub country: String,
    pub fifa_code: String,
    pub group_letter: String,
}

/// One side of a fixture from `/matches/country`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSide {
    pub country: Option<String>,
    pub code: String,
    pub goals: Option<u32>,
}

/// One fixture from `/matches/country`.
///
/// `winner` is the winning side's country name once the match has been
/// decided, and null before that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub home_team: MatchSide,
    pub away_team: MatchSide,
    pub winner: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
}

impl MatchResult {
    /// Whether this fixture pairs the two given FIFA codes, in either venue
    /// order.
    pub fn pairs(&self, code_a: &str, code_b: &str) -> bool {
        (self.home_team.code == code_a && self.away_team.code == code_b)
            || (self.home_team.code == code_b && self.away_team.code == code_a)
    }
}

// ============================================================================
// Configuration
// ============================================================================

const DEFAULT_BASE_URL: &str = "https://worldcup.sfg.io";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the World Cup extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldCupConfig {
    /// Base URL of the results API
    pub base_url: String,

    /// Optional custom user agent (defaults to "Blockpad/0.1.0")
    pub user_agent: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WorldCupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ============================================================================
// Country Table
// ============================================================================

/// The 32 finalists of the 2014 finals, in draw order. Display name first,
/// FIFA trigramme second; the two block menus are projections of this table
/// and stay aligned by construction.
const ROSTER_2014: &[(&str, &str)] = &[
    ("Brazil", "BRA"),
    ("England", "ENG"),
    ("Uruguay", "URU"),
    ("Italy", "ITA"),
    ("Costa Rica", "CRC"),
    ("Netherlands", "NED"),
    ("Australia", "AUS"),
    ("Spain", "ESP"),
    ("Chile", "CHI"),
    ("Croatia", "CRO"),
    ("Cameroon", "CMR"),
    ("Mexico", "MEX"),
    ("Colombia", "COL"),
    ("Ivory Coast", "CIV"),
    ("Greece", "GRE"),
    ("Japan", "JPN"),
    ("Iran", "IRN"),
    ("Argentina", "ARG"),
    ("Nigeria", "NGA"),
    ("Bosnia and Herzegovina", "BIH"),
    ("France", "FRA"),
    ("Switzerland", "SUI"),
    ("Ecuador", "ECU"),
    ("Honduras", "HON"),
    ("Germany", "GER"),
    ("Ghana", "GHA"),
    ("Portugal", "POR"),
    ("USA", "USA"),
    ("Belgium", "BEL"),
    ("Russia", "RUS"),
    ("Algeria", "ALG"),
    ("Korea Republic", "KOR"),
];

/// Fixed lookup table between display names and FIFA codes.
///
/// Lookups are exact and case-sensitive, matching the menu entries the host
/// shows verbatim.
#[derive(Debug, Clone)]
pub struct CountryTable {
    entries: &'static [(&'static str, &'static str)],
}

impl CountryTable {
    /// The table for the 2014 finals.
    pub fn finals_2014() -> Self {
        Self {
            entries: ROSTER_2014,
        }
    }

    /// FIFA code for a display name.
    pub fn code_for(&self, name: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, code)| *code)
    }

    /// Display name for a FIFA code.
    pub fn name_for(&self, code: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(name, _)| *name)
    }

    /// All display names, in table order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.to_string()).collect()
    }

    /// All FIFA codes, in table order.
    pub fn codes(&self) -> Vec<String> {
        self.entries.iter().map(|(_, c)| c.to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CountryTable {
    fn default() -> Self {
        Self::finals_2014()
    }
}

// ============================================================================
// Results Gateway
// ============================================================================

/// Boundary to the remote results API.
///
/// The extension only ever asks two questions of the upstream; splitting them
/// behind a trait lets tests substitute canned data for live HTTP.
#[async_trait]
pub trait ResultsGateway: Send + Sync {
    /// All team standings, one entry per finalist.
    async fn team_results(&self) -> std::result::Result<Vec<TeamResult>, WorldCupError>;

    /// Every fixture involving the given FIFA code.
    async fn country_matches(
        &self,
        fifa_code: &str,
    ) -> std::result::Result<Vec<MatchResult>, WorldCupError>;
}

/// Live HTTP gateway against `worldcup.sfg.io`.
pub struct WorldCupApi {
    config: WorldCupConfig,
    client: Client,
}

impl WorldCupApi {
    /// Create a new gateway with the given configuration.
    pub fn new(config: WorldCupConfig) -> Self {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| "Blockpad/0.1.0 (World Cup Extension)".to_string());

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Fetch and decode a JSON endpoint.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path_and_query: &str,
    ) -> std::result::Result<T, WorldCupError> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            path_and_query
        );

        debug!("Fetching World Cup API: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                WorldCupError::Timeout(self.config.timeout_secs)
            } else {
                WorldCupError::Http(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WorldCupError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| WorldCupError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ResultsGateway for WorldCupApi {
    async fn team_results(&self) -> std::result::Result<Vec<TeamResult>, WorldCupError> {
        self.get_json("/teams/results").await
    }

    async fn country_matches(
        &self,
        fifa_code: &str,
    ) -> std::result::Result<Vec<MatchResult>, WorldCupError> {
        self.get_json(&format!("/matches/country?fifa_code={}", fifa_code))
            .await
    }
}

// ============================================================================
// Mock Gateway
// ============================================================================

/// Canned-data gateway for tests and offline use.
///
/// Answers from fixed team and match lists, filtering `country_matches` the
/// way the live API does, and counts how many upstream calls were made.
pub struct MockResultsGateway {
    teams: Vec<TeamResult>,
    matches: Vec<MatchResult>,
    fail_with: Option<String>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockResultsGateway {
    pub fn new(teams: Vec<TeamResult>, matches: Vec<MatchResult>) -> Self {
        Self {
            teams,
            matches,
            fail_with: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A gateway whose every call fails with the given API error message.
    pub fn failing(message: &str) -> Self {
        Self {
            teams: Vec::new(),
            matches: Vec::new(),
            fail_with: Some(message.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Number of upstream calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn record_call(&self) -> std::result::Result<(), WorldCupError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(WorldCupError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ResultsGateway for MockResultsGateway {
    async fn team_results(&self) -> std::result::Result<Vec<TeamResult>, WorldCupError> {
        self.record_call()?;
        Ok(self.teams.clone())
    }

    async fn country_matches(
        &self,
        fifa_code: &str,
    ) -> std::result::Result<Vec<MatchResult>, WorldCupError> {
        self.record_call()?;
        Ok(self
            .matches
            .iter()
            .filter(|m| m.home_team.code == fifa_code || m.away_team.code == fifa_code)
            .cloned()
            .collect())
    }
}

// ============================================================================
// World Cup Extension
// ============================================================================

/// The World Cup block extension.
pub struct WorldCupExtension {
    table: CountryTable,
    gateway: Arc<dyn ResultsGateway>,
}

impl WorldCupExtension {
    /// Create the extension against the live API.
    pub fn new(config: WorldCupConfig) -> Self {
        Self {
            table: CountryTable::finals_2014(),
            gateway: Arc::new(WorldCupApi::new(config)),
        }
    }

    /// Create the extension against a custom gateway.
    pub fn with_gateway(gateway: Arc<dyn ResultsGateway>) -> Self {
        Self {
            table: CountryTable::finals_2014(),
            gateway,
        }
    }

    /// Group letter for a FIFA code.
    ///
    /// Scans the standings for the first entry carrying the code and reports
    /// its group letter. A code the standings never mention, including one
    /// outside the finals table, reports empty rather than an error.
    async fn group_of(&self, code: &str) -> Result<Reply> {
        let teams = self.gateway.team_results().await?;
        let group = teams
            .iter()
            .find(|team| team.fifa_code == code)
            .map(|team| team.group_letter.clone());

        debug!("Group scan over {} teams for {}: {:?}", teams.len(), code, group);

        Ok(Reply::from(group))
    }

    /// Winner of the pairing between two finalists.
    ///
    /// Both display names must come from the country table; an unrecognized
    /// name is an error before any fetch happens. The scan takes the first
    /// fixture pairing the two codes in either venue order, and an undecided
    /// or unplayed pairing reports empty.
    async fn match_result(&self, name_a: &str, name_b: &str) -> Result<Reply> {
        let code_a = self
            .table
            .code_for(name_a)
            .ok_or_else(|| WorldCupError::UnknownCountry(name_a.to_string()))?;
        let code_b = self
            .table
            .code_for(name_b)
            .ok_or_else(|| WorldCupError::UnknownCountry(name_b.to_string()))?;

        let matches = self.gateway.country_matches(code_a).await?;
        let winner = matches
            .into_iter()
            .find(|m| m.pairs(code_a, code_b))
            .and_then(|m| m.winner);

        debug!("Match scan {} vs {}: {:?}", code_a, code_b, winner);

        Ok(Reply::from(winner))
    }
}

fn expect_arity(selector: &str, expected: usize, args: &[String]) -> Result<()> {
    if args.len() != expected {
        return Err(ExtensionError::Arity {
            selector: selector.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

#[async_trait]
impl Extension for WorldCupExtension {
    fn id(&self) -> &'static str {
        "worldcup"
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            display_name: "World Cup".to_string(),
            blocks: vec![
                BlockSpec::reporter("group of %m.codes", "get_group"),
                BlockSpec::reporter("result of match %m.countries vs %m.countries", "match_result"),
            ],
            menus: vec![
                Menu::new("countries", self.table.names()),
                Menu::new("codes", self.table.codes()),
            ],
        }
    }

    fn status(&self) -> StatusReport {
        StatusReport::ready()
    }

    async fn invoke(&self, selector: &str, args: &[String]) -> Result<Reply> {
        match selector {
            "get_group" => {
                expect_arity(selector, 1, args)?;
                self.group_of(&args[0]).await
            }
            "match_result" => {
                expect_arity(selector, 2, args)?;
                self.match_result(&args[0], &args[1]).await
            }
            other => Err(ExtensionError::UnknownSelector(other.to_string())),
        }
    }

    /// Nothing to release; every request is one-shot.
    fn shutdown(&self) {}
}

// ============================================================================
// Tests
// ============================================================================
