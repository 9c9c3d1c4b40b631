//! Persistence layer.
//!
//! Every file the agent reads or writes goes through here: the fixture
//! snapshot, rule table, team file and board snapshot (read-only), the
//! cycle's working set, the result store, the metrics log and the
//! settled-event inbox.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::engine::league::LeagueMapper;
use crate::engine::locator::TableModel;
use crate::feed;
use crate::types::{
    FixtureMatch, MetricsRow, PlacedBet, SettledEvent, SettlementRecord, StakerError, StatRule,
};

/// Suffix given to inbox payloads once they have been handed off.
pub const PROCESSED_SUFFIX: &str = "done";

const METRICS_HEADER: [&str; 2] = ["Won", "Lost"];

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Load the latest fixture snapshot. `None` if the driver has not
/// written one yet.
pub fn load_fixture_snapshot(path: &Path) -> Result<Option<Vec<FixtureMatch>>> {
    if !path.exists() {
        debug!(path = %path.display(), "No fixture snapshot yet");
        return Ok(None);
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture snapshot {}", path.display()))?;
    let fixtures = feed::parse_fixture_snapshot(&json)
        .with_context(|| format!("Failed to parse fixture snapshot {}", path.display()))?;
    Ok(Some(fixtures))
}

pub fn load_rules(path: &Path) -> Result<Vec<StatRule>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule table {}", path.display()))?;
    let rules = feed::parse_rule_table(&json)
        .with_context(|| format!("Failed to parse rule table {}", path.display()))?;
    debug!(path = %path.display(), rules = rules.len(), "Rule table loaded");
    Ok(rules)
}

/// Load the team file. A missing file gives an empty mapper.
pub fn load_league_mapper(path: &Path) -> Result<LeagueMapper> {
    if !path.exists() {
        warn!(path = %path.display(), "Team file not found, every group maps to Unknown");
        return Ok(LeagueMapper::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read team file {}", path.display()))?;
    Ok(LeagueMapper::from_team_file(&contents))
}

pub fn load_table_model(path: &Path) -> Result<TableModel> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read table model {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse table model {}", path.display()))
}

pub fn load_settled_payload(path: &Path) -> Result<Vec<SettledEvent>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settled payload {}", path.display()))?;
    feed::parse_settled_payload(&json)
        .with_context(|| format!("Failed to parse settled payload {}", path.display()))
}

// ---------------------------------------------------------------------------
// Working set
// ---------------------------------------------------------------------------

pub fn save_placed_bets(path: &Path, placed: &[PlacedBet]) -> Result<()> {
    let json = serde_json::to_string_pretty(placed).context("Failed to serialise working set")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write working set to {}", path.display()))?;
    debug!(path = %path.display(), bets = placed.len(), "Working set saved");
    Ok(())
}

/// Load the working set.
///
/// Accepts a JSON array, a single object, or one object per line;
/// unreadable lines are skipped. Missing or empty files are empty sets.
pub fn load_placed_bets(path: &Path) -> Result<Vec<PlacedBet>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read working set {}", path.display()))?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(list) = serde_json::from_str::<Vec<PlacedBet>>(text) {
        return Ok(list);
    }
    if let Ok(single) = serde_json::from_str::<PlacedBet>(text) {
        return Ok(vec![single]);
    }

    let mut placed = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<PlacedBet>(line) {
            Ok(bet) => placed.push(bet),
            Err(e) => warn!(line = idx + 1, error = %e, "Skipping unreadable working-set line"),
        }
    }
    Ok(placed)
}

// ---------------------------------------------------------------------------
// Result store
// ---------------------------------------------------------------------------

/// Load the result store. Missing, empty or unparsable files start fresh.
pub fn load_results(path: &Path) -> Result<Vec<SettlementRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read result store {}", path.display()))?;
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(&json) {
        Ok(records) => Ok(records),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Result store unreadable, starting fresh");
            Ok(Vec::new())
        }
    }
}

/// Replace the result store via a temp file and rename.
pub fn save_results(path: &Path, records: &[SettlementRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialise result store")?;
    let tmp = tmp_path(path);
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", tmp.display()))?;
    info!(path = %path.display(), records = records.len(), "Result store saved");
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Metrics log
// ---------------------------------------------------------------------------

/// Read the metrics log in file order. A missing file is an empty log.
///
/// The header and rows that are not exactly one `yes` and one `no` are
/// skipped.
pub fn load_metrics(path: &Path) -> Result<Vec<MetricsRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open metrics log {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(line = idx + 1, error = %e, "Skipping unreadable metrics row");
                continue;
            }
        };

        let won = record.get(0).unwrap_or_default();
        let lost = record.get(1).unwrap_or_default();
        if idx == 0 && won.eq_ignore_ascii_case(METRICS_HEADER[0]) {
            continue;
        }

        match (parse_flag(won), parse_flag(lost)) {
            (Some(w), Some(l)) if w != l => rows.push(MetricsRow { won: w, lost: l }),
            _ => warn!(line = idx + 1, won, lost, "Skipping malformed metrics row"),
        }
    }
    Ok(rows)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Append one row, writing the header first if the file is new.
pub fn append_metrics_row(path: &Path, row: MetricsRow) -> Result<()> {
    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open metrics log {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if is_new {
        writer.write_record(METRICS_HEADER)?;
    }
    let flag = |b: bool| if b { "yes" } else { "no" };
    writer.write_record([flag(row.won), flag(row.lost)])?;
    writer
        .flush()
        .map_err(|e| StakerError::Storage(format!("metrics log {}: {e}", path.display())))?;

    info!(path = %path.display(), outcome = %row, "Metrics row appended");
    Ok(())
}

// ---------------------------------------------------------------------------
// Settled-event inbox
// ---------------------------------------------------------------------------

/// Pending `*.json` payloads in the inbox, oldest name first.
/// A missing inbox is empty.
pub fn list_inbox(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut pending: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list inbox {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    pending.sort();
    Ok(pending)
}

/// Rename a handled payload to `<name>.done` so it is not picked up again.
pub fn mark_processed(path: &Path) -> Result<PathBuf> {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(PROCESSED_SUFFIX);
    let done = path.with_file_name(name);
    fs::rename(path, &done)
        .with_context(|| format!("Failed to mark {} processed", path.display()))?;
    Ok(done)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
