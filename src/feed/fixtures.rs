//! Fixture snapshot decoding.
//!
//! The captured event-list response nests matches under
//! `wrapEventList.value`. Field names are single letters:
//! `F` home, `B` away, `G` group id, `I` markets, `R` outcomes,
//! `a` price, `b` implied probability, `c` label.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::opt_string_or_number;
use crate::types::{FixtureMarket, FixtureMatch, Outcome};

// ---------------------------------------------------------------------------
// Raw response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawMatch {
    #[serde(rename = "F", default)]
    home: Option<String>,
    #[serde(rename = "B", default)]
    away: Option<String>,
    #[serde(rename = "G", default, deserialize_with = "opt_string_or_number")]
    group_id: Option<String>,
    #[serde(rename = "I", default)]
    markets: Option<Vec<RawMarket>>,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    #[serde(rename = "R", default)]
    outcomes: Option<Vec<RawOutcome>>,
}

#[derive(Debug, Deserialize)]
struct RawOutcome {
    #[serde(rename = "a", default)]
    price: Option<Decimal>,
    #[serde(rename = "b", default)]
    probability: Option<Decimal>,
    #[serde(rename = "c", default)]
    label: Option<String>,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse a captured fixture response.
pub fn parse_fixture_snapshot(json: &str) -> Result<Vec<FixtureMatch>> {
    let value: Value = serde_json::from_str(json).context("Fixture snapshot is not valid JSON")?;
    Ok(decode_fixture_snapshot(&value))
}

/// Decode an already-parsed fixture response. A missing event list is
/// an empty snapshot.
pub fn decode_fixture_snapshot(value: &Value) -> Vec<FixtureMatch> {
    let Some(items) = value
        .get("wrapEventList")
        .and_then(|w| w.get("value"))
        .and_then(Value::as_array)
    else {
        debug!("Fixture snapshot has no wrapEventList.value");
        return Vec::new();
    };

    let mut matches = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let raw: RawMatch = match serde_json::from_value(item.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(index = idx, error = %e, "Skipping malformed fixture");
                continue;
            }
        };
        if let Some(m) = convert_match(raw, idx) {
            matches.push(m);
        }
    }

    debug!(count = matches.len(), "Fixture snapshot decoded");
    matches
}

fn convert_match(raw: RawMatch, idx: usize) -> Option<FixtureMatch> {
    let home = raw.home.filter(|s| !s.is_empty());
    let away = raw.away.filter(|s| !s.is_empty());
    let (Some(home_team), Some(away_team)) = (home, away) else {
        warn!(index = idx, "Skipping fixture without both team names");
        return None;
    };

    let markets = raw
        .markets
        .unwrap_or_default()
        .into_iter()
        .map(|market| FixtureMarket {
            outcomes: market
                .outcomes
                .unwrap_or_default()
                .into_iter()
                .filter_map(convert_outcome)
                .collect(),
        })
        .collect();

    Some(FixtureMatch {
        group_id: raw.group_id.unwrap_or_default(),
        home_team,
        away_team,
        markets,
    })
}

/// Outcomes without a label, price or probability can never match a rule.
fn convert_outcome(raw: RawOutcome) -> Option<Outcome> {
    Some(Outcome {
        label: raw.label?.trim().to_lowercase(),
        price: raw.price?,
        implied_probability: raw.probability?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
