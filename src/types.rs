//! Shared types for the STAKER agent.
//!
//! These types form the data model used across all modules.
//! Feed decoding, selection, location and settlement all depend on
//! them, so they carry no behaviour beyond formatting and small
//! derived views.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Bet category. Each category targets one fixed outcome label in the
/// fixture feed and one fixed cell offset in the market table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetCategory {
    #[serde(rename = "over_1.5")]
    Over15,
    #[serde(rename = "over_1.5 after 0-0")]
    Over15AfterNil,
    #[serde(rename = "x1_x2")]
    DoubleChance,
    #[serde(rename = "both_teams_score")]
    BothTeamsScore,
}

impl BetCategory {
    /// All known categories (useful for iteration).
    pub const ALL: &'static [BetCategory] = &[
        BetCategory::Over15,
        BetCategory::Over15AfterNil,
        BetCategory::DoubleChance,
        BetCategory::BothTeamsScore,
    ];

    /// Name used in the rule table and the selection working set.
    pub fn key(&self) -> &'static str {
        match self {
            BetCategory::Over15 => "over_1.5",
            BetCategory::Over15AfterNil => "over_1.5 after 0-0",
            BetCategory::DoubleChance => "x1_x2",
            BetCategory::BothTeamsScore => "both_teams_score",
        }
    }

    /// Lowercase outcome label this category bets on in the fixture feed.
    ///
    /// Double chance needs a pick to know which side it covers; without
    /// one there is no target label.
    pub fn target_label(&self, pick: Option<Pick>) -> Option<&'static str> {
        match (self, pick) {
            (BetCategory::Over15 | BetCategory::Over15AfterNil, _) => Some("over 1.5"),
            (BetCategory::DoubleChance, Some(Pick::X1)) => Some("home or draw"),
            (BetCategory::DoubleChance, Some(Pick::X2)) => Some("draw or away"),
            (BetCategory::DoubleChance, None) => None,
            (BetCategory::BothTeamsScore, _) => Some("yes"),
        }
    }

    /// Position of the outcome cell to activate within a market row.
    pub fn cell_offset(&self, pick: Option<Pick>) -> usize {
        match (self, pick) {
            (BetCategory::Over15, _) => 1,
            (BetCategory::Over15AfterNil, _) => 0,
            (BetCategory::BothTeamsScore, _) => 0,
            (BetCategory::DoubleChance, Some(Pick::X1)) => 0,
            (BetCategory::DoubleChance, Some(Pick::X2)) => 2,
            (BetCategory::DoubleChance, None) => 1,
        }
    }
}

impl fmt::Display for BetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Parse a rule-table category name (case-insensitive).
impl std::str::FromStr for BetCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        BetCategory::ALL
            .iter()
            .copied()
            .find(|c| c.key() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown bet category: {s}"))
    }
}

/// Double-chance side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pick {
    X1,
    X2,
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pick::X1 => write!(f, "X1"),
            Pick::X2 => write!(f, "X2"),
        }
    }
}

impl std::str::FromStr for Pick {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "X1" => Ok(Pick::X1),
            "X2" => Ok(Pick::X2),
            _ => Err(anyhow::anyhow!("Unknown pick: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Teams key
// ---------------------------------------------------------------------------

/// Ordered home/away pair, written as `"Home vs Away"` on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamsKey {
    pub home: String,
    pub away: String,
}

impl TeamsKey {
    pub const SEPARATOR: &'static str = " vs ";

    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            away: away.into(),
        }
    }
}

impl fmt::Display for TeamsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.home, Self::SEPARATOR, self.away)
    }
}

/// Split on the first `" vs "`. Names are kept verbatim so rule teams
/// compare against fixture names exactly.
impl std::str::FromStr for TeamsKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (home, away) = s
            .split_once(Self::SEPARATOR)
            .ok_or_else(|| anyhow::anyhow!("Teams key has no ' vs ' separator: {s:?}"))?;
        if home.is_empty() || away.is_empty() {
            anyhow::bail!("Teams key is missing a side: {s:?}");
        }
        Ok(Self::new(home, away))
    }
}

impl TryFrom<String> for TeamsKey {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TeamsKey> for String {
    fn from(key: TeamsKey) -> Self {
        key.to_string()
    }
}

// ---------------------------------------------------------------------------
// Fixture snapshot
// ---------------------------------------------------------------------------

/// One selectable outcome in a fixture market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Lowercased, trimmed label (e.g. "over 1.5").
    pub label: String,
    /// Decimal odds.
    pub price: Decimal,
    pub implied_probability: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FixtureMarket {
    pub outcomes: Vec<Outcome>,
}

/// A single fixture from one polling snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureMatch {
    pub group_id: String,
    pub home_team: String,
    pub away_team: String,
    pub markets: Vec<FixtureMarket>,
}

impl FixtureMatch {
    /// Exact, case-sensitive, ordered comparison with a rule's teams.
    pub fn is_fixture_for(&self, teams: &TeamsKey) -> bool {
        self.home_team == teams.home && self.away_team == teams.away
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.markets.iter().flat_map(|m| m.outcomes.iter())
    }
}

impl fmt::Display for FixtureMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} (G={}, markets={})",
            self.home_team,
            self.away_team,
            self.group_id,
            self.markets.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Rules & candidates
// ---------------------------------------------------------------------------

/// A statically configured betting rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRule {
    pub category: BetCategory,
    pub teams: TeamsKey,
    pub target_probability: Decimal,
    pub confidence: Decimal,
    #[serde(default)]
    pub pick: Option<Pick>,
}

/// A scored, not-yet-placed bet proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetCandidate {
    pub category: BetCategory,
    pub teams: TeamsKey,
    /// Decimal odds of the matched outcome.
    pub price: Decimal,
    /// Rule probability (equal to the outcome's implied probability).
    pub target_probability: Decimal,
    pub confidence: Decimal,
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<Pick>,
}

impl fmt::Display for BetCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {} (p={} conf={}",
            self.category, self.teams, self.price, self.target_probability, self.confidence
        )?;
        if let Some(pick) = self.pick {
            write!(f, " pick={pick}")?;
        }
        write!(f, ")")
    }
}

/// A candidate that made it into the cycle's working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBet {
    #[serde(flatten)]
    pub bet: BetCandidate,
    /// Event id, when the driver learned it while placing.
    #[serde(default, rename = "eventId", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl From<BetCandidate> for PlacedBet {
    fn from(bet: BetCandidate) -> Self {
        Self {
            bet,
            event_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Final score of one settled event, already normalised from the raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledEvent {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub event_id: Option<String>,
}

impl SettledEvent {
    /// Raw `"Home vs Away"` key as stored in the result store.
    pub fn teams_key(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    pub fn score_string(&self) -> String {
        format!("{} - {}", self.home_score, self.away_score)
    }
}

/// One line of the append-only result store.
///
/// Field names follow the persisted file layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    #[serde(rename = "Team")]
    pub teams_key: String,
    #[serde(rename = "scores")]
    pub score: String,
    #[serde(default)]
    pub probability: Option<Decimal>,
    /// Empty when the event carried no id.
    #[serde(rename = "eventId", default)]
    pub event_id: String,
    /// Local wall-clock time in the operating locale.
    #[serde(default)]
    pub timestamp: String,
}

impl SettlementRecord {
    pub fn event_id(&self) -> Option<&str> {
        let id = self.event_id.trim();
        (!id.is_empty()).then_some(id)
    }

    /// Key used for (teams, score) deduplication.
    pub fn dedup_key(&self) -> String {
        format!("{}|{}", self.teams_key, self.score)
    }
}

impl fmt::Display for SettlementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.teams_key, self.score)?;
        match self.event_id() {
            Some(id) => write!(f, "(event {id})"),
            None => write!(f, "(no event id)"),
        }
    }
}

/// Win/loss marker appended once per cycle.
///
/// Exactly one flag is set; the metrics loader drops rows that violate this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub won: bool,
    pub lost: bool,
}

impl MetricsRow {
    pub fn from_outcome(won: bool) -> Self {
        Self { won, lost: !won }
    }

    pub fn won() -> Self {
        Self::from_outcome(true)
    }

    pub fn lost() -> Self {
        Self::from_outcome(false)
    }
}

impl fmt::Display for MetricsRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.won {
            write!(f, "WON")
        } else {
            write!(f, "LOST")
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Crate-level error types for STAKER.
#[derive(Debug, thiserror::Error)]
pub enum StakerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed feed ({source_name}): {message}")]
    Feed { source_name: String, message: String },

    #[error("Slip driver error: {0}")]
    Driver(String),

    #[error("Alert delivery failed: {0}")]
    Alert(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
