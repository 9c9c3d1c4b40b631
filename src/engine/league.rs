//! League mapping.
//!
//! Resolves a fixture group id to a league name, and a league name to
//! its fixed position among the league blocks on the quick-game board.
//!
//! The team file is a flat list of lines read as adjacent pairs:
//!
//! ```text
//! England
//! 1021
//! Spain
//! 1022
//! ```

use std::collections::HashMap;
use tracing::{debug, warn};

/// League name returned for group ids missing from the team file.
pub const UNKNOWN_LEAGUE: &str = "Unknown";

/// Board position of each known league (1-based).
const LEAGUE_ORDER: &[(&str, usize)] = &[
    ("England", 1),
    ("Spain", 2),
    ("Germany", 3),
    ("Champions", 4),
    ("Italy", 5),
    ("African cup", 6),
    ("Euros", 7),
    ("Club world cup", 8),
];

/// Group id → league name lookup, loaded once per cycle.
#[derive(Debug, Clone, Default)]
pub struct LeagueMapper {
    by_group: HashMap<String, String>,
}

impl LeagueMapper {
    /// Build the mapping from team-file text.
    ///
    /// Lines are trimmed and blank lines dropped before pairing. A
    /// trailing name without an id is ignored; a repeated id keeps the
    /// last league listed for it.
    pub fn from_team_file(contents: &str) -> Self {
        let lines: Vec<&str> = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        if lines.len() % 2 != 0 {
            warn!(
                lines = lines.len(),
                "Team file has an unpaired trailing line, ignoring it"
            );
        }

        let by_group: HashMap<String, String> = lines
            .chunks_exact(2)
            .map(|pair| (pair[1].to_string(), pair[0].to_string()))
            .collect();

        debug!(leagues = by_group.len(), "League mapping loaded");
        Self { by_group }
    }

    /// League name for a group id, or [`UNKNOWN_LEAGUE`].
    pub fn resolve(&self, group_id: &str) -> &str {
        self.by_group
            .get(group_id.trim())
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LEAGUE)
    }

    pub fn len(&self) -> usize {
        self.by_group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_group.is_empty()
    }

    /// Fixed board position (1..=8) of a league.
    ///
    /// Unmapped names, `Unknown` included, fall back to position 1. A
    /// bet from an unmapped league is therefore searched for in the
    /// first block and normally ends as a row miss.
    pub fn league_order_index(league_name: &str) -> usize {
        LEAGUE_ORDER
            .iter()
            .find(|(name, _)| *name == league_name)
            .map(|(_, idx)| *idx)
            .unwrap_or(1)
    }
}
