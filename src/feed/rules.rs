//! Rule table decoding.
//!
//! `stats.json` maps a category name to an ordered list of rules:
//!
//! ```json
//! { "over_1.5": [ { "teams": "Arsenal vs Chelsea", "probability": 0.72, "confidence": 85 } ],
//!   "x1_x2":    [ { "teams": "Lazio vs Roma", "probability": "0.7", "confidence": "80", "pick": "X1" } ] }
//! ```
//!
//! Category order and rule order are preserved; they are the discovery
//! order the selector's stable tie-break relies on.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{BetCategory, Pick, StatRule, TeamsKey};

#[derive(Debug, Deserialize)]
struct RawRule {
    teams: String,
    probability: Decimal,
    confidence: Decimal,
    #[serde(default)]
    pick: Option<String>,
}

/// Parse a rule table document.
pub fn parse_rule_table(json: &str) -> Result<Vec<StatRule>> {
    let value: Value = serde_json::from_str(json).context("Rule table is not valid JSON")?;
    decode_rule_table(&value)
}

/// Decode a parsed rule table. The document itself must be an object;
/// bad categories and bad rules inside it are skipped.
pub fn decode_rule_table(value: &Value) -> Result<Vec<StatRule>> {
    let categories = value
        .as_object()
        .context("Rule table must be an object keyed by category")?;

    let mut rules = Vec::new();
    for (name, entries) in categories {
        let category: BetCategory = match name.parse() {
            Ok(c) => c,
            Err(_) => {
                warn!(category = %name, "Skipping unknown rule category");
                continue;
            }
        };
        let Some(entries) = entries.as_array() else {
            warn!(category = %name, "Skipping rule category that is not a list");
            continue;
        };

        for (idx, entry) in entries.iter().enumerate() {
            match decode_rule(category, entry) {
                Ok(rule) => rules.push(rule),
                Err(e) => warn!(
                    category = %category,
                    index = idx,
                    error = %e,
                    "Skipping malformed rule"
                ),
            }
        }
    }

    debug!(count = rules.len(), "Rule table decoded");
    Ok(rules)
}

fn decode_rule(category: BetCategory, entry: &Value) -> Result<StatRule> {
    let raw: RawRule = serde_json::from_value(entry.clone())?;
    let teams: TeamsKey = raw.teams.parse()?;
    let pick = match raw.pick.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(p) => Some(p.parse::<Pick>()?),
    };
    Ok(StatRule {
        category,
        teams,
        target_probability: raw.probability,
        confidence: raw.confidence,
        pick,
    })
}
