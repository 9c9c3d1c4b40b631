//! Market location.
//!
//! Resolves a bet to a single outcome cell on the quick-game board. The
//! board is exposed by the UI driver as a [`TableModel`]: a team column
//! and a market column, each an ordered list of league blocks. Row `i`
//! of a team block corresponds to outcome group `i` of the market block
//! at the same league position; the driver that builds the model is
//! responsible for that alignment.
//!
//! Every stage that finds nothing returns its own [`LocateError`] so the
//! caller can log exactly where resolution stopped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::engine::league::LeagueMapper;
use crate::types::{BetCandidate, BetCategory, Pick, TeamsKey};

// ---------------------------------------------------------------------------
// Table model
// ---------------------------------------------------------------------------

/// Snapshot of the board as seen by the driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableModel {
    /// `None` when the page has no team column.
    #[serde(default)]
    pub team_column: Option<Vec<TeamBlock>>,
    /// `None` when the page has no market column.
    #[serde(default)]
    pub market_column: Option<Vec<MarketBlock>>,
}

/// Fixture rows of one league, in board order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamBlock {
    pub rows: Vec<TeamRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRow {
    pub home: String,
    pub away: String,
}

/// Outcome groups of one league, index-aligned with its [`TeamBlock`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketBlock {
    pub rows: Vec<OutcomeGroup>,
}

/// The outcome cells of one fixture row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeGroup {
    pub cells: Vec<OutcomeCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeCell {
    /// Activatable label (the price text). Locked or suspended cells have none.
    #[serde(default)]
    pub label: Option<String>,
}

impl OutcomeCell {
    fn activatable_label(&self) -> Option<&str> {
        self.label.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// A resolved cell, addressed by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRef {
    /// 1-based league block position.
    pub league_index: usize,
    /// 0-based row within the league block.
    pub row: usize,
    /// 0-based cell within the row.
    pub offset: usize,
    pub label: String,
}

impl fmt::Display for OutcomeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "league #{} row {} cell {} ({})",
            self.league_index,
            self.row + 1,
            self.offset,
            self.label
        )
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a cell could not be resolved. Never fatal: the bet is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("team column not found")]
    NoTeamColumn,

    #[error("league block #{index} not found for {league}")]
    NoLeagueBlock { league: String, index: usize },

    #[error("{teams} not found in league {league}")]
    NoMatchingRow { league: String, teams: String },

    #[error("market column not found")]
    NoMarketColumn,

    #[error("market block #{index} not found for {league}")]
    NoMarketBlock { league: String, index: usize },

    #[error("market row not found at index {}", .row + 1)]
    NoMarketRow { row: usize },

    #[error("row {} has {available} outcome cells, need cell {offset}", .row + 1)]
    NoOutcomeCell {
        row: usize,
        offset: usize,
        available: usize,
    },

    #[error("outcome cell {offset} in row {} has no activatable label", .row + 1)]
    EmptyCell { row: usize, offset: usize },
}

impl LocateError {
    /// Short stage name for structured logs.
    pub fn stage(&self) -> &'static str {
        match self {
            LocateError::NoTeamColumn => "team_column",
            LocateError::NoLeagueBlock { .. } => "league_block",
            LocateError::NoMatchingRow { .. } => "team_row",
            LocateError::NoMarketColumn => "market_column",
            LocateError::NoMarketBlock { .. } => "market_block",
            LocateError::NoMarketRow { .. } => "market_row",
            LocateError::NoOutcomeCell { .. } => "outcome_cell",
            LocateError::EmptyCell { .. } => "empty_cell",
        }
    }
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Stateless resolver from (league, teams, category, pick) to a cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketLocator;

impl MarketLocator {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a selected bet, mapping its group id to a league first.
    pub fn locate_bet(
        &self,
        table: &TableModel,
        mapper: &LeagueMapper,
        bet: &BetCandidate,
    ) -> Result<OutcomeRef, LocateError> {
        let league = mapper.resolve(&bet.group_id);
        self.locate(table, league, &bet.teams, bet.category, bet.pick)
    }

    /// Resolve the outcome cell for a fixture in a league.
    ///
    /// Duplicate fixtures within a block are not disambiguated: the
    /// first matching row wins.
    pub fn locate(
        &self,
        table: &TableModel,
        league_name: &str,
        teams: &TeamsKey,
        category: BetCategory,
        pick: Option<Pick>,
    ) -> Result<OutcomeRef, LocateError> {
        let league_index = LeagueMapper::league_order_index(league_name);
        let block_pos = league_index - 1;

        // 1. League block in the team column
        let team_blocks = table.team_column.as_ref().ok_or(LocateError::NoTeamColumn)?;
        let team_block = team_blocks
            .get(block_pos)
            .ok_or_else(|| LocateError::NoLeagueBlock {
                league: league_name.to_string(),
                index: league_index,
            })?;

        // 2. First row whose teams match exactly
        let (home, away) = (teams.home.trim(), teams.away.trim());
        let row = team_block
            .rows
            .iter()
            .position(|r| r.home.trim() == home && r.away.trim() == away)
            .ok_or_else(|| LocateError::NoMatchingRow {
                league: league_name.to_string(),
                teams: teams.to_string(),
            })?;
        debug!(teams = %teams, league = league_name, row = row + 1, "Fixture row found");

        // 3. Same position in the market column
        let market_blocks = table
            .market_column
            .as_ref()
            .ok_or(LocateError::NoMarketColumn)?;
        let market_block = market_blocks
            .get(block_pos)
            .ok_or_else(|| LocateError::NoMarketBlock {
                league: league_name.to_string(),
                index: league_index,
            })?;
        let group = market_block
            .rows
            .get(row)
            .ok_or(LocateError::NoMarketRow { row })?;

        // 4. Category-specific cell
        let offset = category.cell_offset(pick);
        let cell = group.cells.get(offset).ok_or(LocateError::NoOutcomeCell {
            row,
            offset,
            available: group.cells.len(),
        })?;
        let label = cell
            .activatable_label()
            .ok_or(LocateError::EmptyCell { row, offset })?;

        Ok(OutcomeRef {
            league_index,
            row,
            offset,
            label: label.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
