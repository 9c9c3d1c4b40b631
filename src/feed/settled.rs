//! Settled-event payload decoding.
//!
//! Settlement notifications do not have a stable shape: the event array
//! sits at varying depth and team, score and id fields appear under
//! several names. This module finds the array and maps each element to
//! a [`SettledEvent`] exactly once.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::scalar_to_string;
use crate::types::SettledEvent;

/// Maximum nesting depth searched for event arrays.
const MAX_SEARCH_DEPTH: usize = 6;

/// Keys (lowercase) that mark an array element as a settled event.
const EVENT_MARKER_KEYS: &[&str] = &["hometeamname", "home_team_name", "eventid", "home"];

const HOME_NAME_KEYS: &[&str] = &["homeTeamName", "home_team_name", "home", "homeTeam"];
const AWAY_NAME_KEYS: &[&str] = &["awayTeamName", "away_team_name", "away", "awayTeam"];
const HOME_SCORE_KEYS: &[&str] = &["homeTeamScore", "homeScore", "home_score"];
const AWAY_SCORE_KEYS: &[&str] = &["awayTeamScore", "awayScore", "away_score"];
const EVENT_ID_KEYS: &[&str] = &["eventId", "event_id", "id"];

/// Parse a raw settled-events response body.
pub fn parse_settled_payload(json: &str) -> Result<Vec<SettledEvent>> {
    let value: Value =
        serde_json::from_str(json).context("Settled-events payload is not valid JSON")?;
    Ok(decode_settled_events(&value))
}

/// Decode settled events from a parsed payload.
///
/// Elements that are not objects are skipped. Events with a missing
/// team name are kept with an empty name; the reconciler rejects them.
pub fn decode_settled_events(value: &Value) -> Vec<SettledEvent> {
    let mut arrays = Vec::new();
    collect_arrays(value, 0, &mut arrays);

    let Some(events) = pick_event_array(&arrays) else {
        debug!("Settled-events payload contains no event array");
        return Vec::new();
    };

    let mut decoded = Vec::with_capacity(events.len());
    for (idx, item) in events.iter().enumerate() {
        match item.as_object() {
            Some(obj) => decoded.push(decode_event(obj)),
            None => warn!(index = idx, "Skipping settled event that is not an object"),
        }
    }
    decoded
}

/// Depth-first collection of every array reachable from `value`.
/// Arrays are not descended into.
fn collect_arrays<'a>(value: &'a Value, depth: usize, out: &mut Vec<&'a Vec<Value>>) {
    if depth > MAX_SEARCH_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => out.push(items),
        Value::Object(map) => {
            for child in map.values() {
                collect_arrays(child, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// First non-empty array whose first element looks like an event,
/// falling back to the first array found.
fn pick_event_array<'a>(arrays: &[&'a Vec<Value>]) -> Option<&'a Vec<Value>> {
    let looks_like_event = |items: &Vec<Value>| {
        items
            .first()
            .and_then(Value::as_object)
            .is_some_and(|obj| {
                obj.keys()
                    .any(|k| EVENT_MARKER_KEYS.contains(&k.to_lowercase().as_str()))
            })
    };

    arrays
        .iter()
        .copied()
        .find(|items| !items.is_empty() && looks_like_event(items))
        .or_else(|| arrays.first().copied())
}

fn decode_event(obj: &Map<String, Value>) -> SettledEvent {
    SettledEvent {
        home_team: first_string(obj, HOME_NAME_KEYS).unwrap_or_default(),
        away_team: first_string(obj, AWAY_NAME_KEYS).unwrap_or_default(),
        home_score: first_score(obj, HOME_SCORE_KEYS),
        away_score: first_score(obj, AWAY_SCORE_KEYS),
        event_id: first_string(obj, EVENT_ID_KEYS),
    }
}

/// First key whose value is a non-empty string or a number.
fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(scalar_to_string)
}

/// First key present decides the score; unreadable values count as 0.
fn first_score(obj: &Map<String, Value>, keys: &[&str]) -> u32 {
    let Some(value) = keys.iter().find_map(|k| obj.get(*k)) else {
        return 0;
    };
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
