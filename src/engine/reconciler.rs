//! Settlement reconciler: settled events × placed bets → result records.
//!
//! Settled-event batches arrive at unpredictable times relative to the
//! betting cycle. They are delivered over a channel to a single
//! [`SettlementWorker`], which owns the result store and performs one
//! load → reconcile → save per batch.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::storage;
use crate::types::{PlacedBet, SettledEvent, SettlementRecord};

/// Timestamp layout written to the result store.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

// ---------------------------------------------------------------------------
// Team-name normalization
// ---------------------------------------------------------------------------

/// Canonical comparison form of a team name or teams string.
///
/// Diacritics are stripped and every character outside ASCII letters and
/// digits becomes a space. Whitespace is collapsed and the result lowercased.
pub fn normalize_team_name(name: &str) -> String {
    let spaced: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a stored teams string refers to the settled pairing.
///
/// Matches any `home vs/-/v away` form in either order, falling back to
/// the stored string containing both names.
pub fn teams_match(stored: &str, home: &str, away: &str) -> bool {
    let stored = normalize_team_name(stored);
    let home = normalize_team_name(home);
    let away = normalize_team_name(away);
    if stored.is_empty() || home.is_empty() || away.is_empty() {
        return false;
    }

    let canonical_forms = [(&home, &away), (&away, &home)]
        .into_iter()
        .flat_map(|(a, b)| {
            ["vs", "-", "v"]
                .into_iter()
                .map(move |sep| normalize_team_name(&format!("{a} {sep} {b}")))
        });

    for form in canonical_forms {
        if form == stored {
            return true;
        }
    }

    stored.contains(home.as_str()) && stored.contains(away.as_str())
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Why a settled event produced no record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("event is missing a team name")]
    MissingTeam,
    #[error("no placed bet matches {teams}")]
    NoMatchingBet { teams: String },
    #[error("event {event_id} already recorded")]
    DuplicateEventId { event_id: String },
    #[error("{teams} {score} already recorded")]
    DuplicateScore { teams: String, score: String },
}

impl SkipReason {
    /// Duplicates are expected on replays and are not worth a warning.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            SkipReason::DuplicateEventId { .. } | SkipReason::DuplicateScore { .. }
        )
    }
}

/// Result of reconciling one batch.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Full result store: prior records followed by the new ones.
    pub results: Vec<SettlementRecord>,
    /// Number of records appended by this batch.
    pub added: usize,
    pub skipped: Vec<(SettledEvent, SkipReason)>,
}

impl Reconciliation {
    pub fn any_added(&self) -> bool {
        self.added > 0
    }

    pub fn new_records(&self) -> &[SettlementRecord] {
        &self.results[self.results.len() - self.added..]
    }
}

#[derive(Debug, Clone)]
pub struct SettlementReconciler {
    offset: FixedOffset,
}

impl SettlementReconciler {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Build from a locale offset in minutes east of UTC.
    pub fn from_offset_minutes(minutes: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(minutes * 60)
            .ok_or_else(|| anyhow::anyhow!("Invalid UTC offset: {minutes} minutes"))?;
        Ok(Self::new(offset))
    }

    pub fn reconcile(
        &self,
        events: &[SettledEvent],
        placed: &[PlacedBet],
        prior: &[SettlementRecord],
    ) -> Reconciliation {
        self.reconcile_at(events, placed, prior, Utc::now())
    }

    /// Reconcile a batch with an explicit clock.
    ///
    /// Dedup covers the prior store and records emitted earlier in the
    /// same batch, so replaying a batch never grows the store.
    pub fn reconcile_at(
        &self,
        events: &[SettledEvent],
        placed: &[PlacedBet],
        prior: &[SettlementRecord],
        now: DateTime<Utc>,
    ) -> Reconciliation {
        let timestamp = now.with_timezone(&self.offset).format(TIMESTAMP_FORMAT).to_string();

        let mut seen_ids: HashSet<String> = prior
            .iter()
            .filter_map(|r| r.event_id().map(str::to_string))
            .collect();
        let mut seen_scores: HashSet<String> = prior.iter().map(SettlementRecord::dedup_key).collect();

        let mut results = prior.to_vec();
        let mut added = 0usize;
        let mut skipped = Vec::new();

        for event in events {
            match self.reconcile_event(event, placed, &seen_ids, &seen_scores, &timestamp) {
                Ok(record) => {
                    info!(record = %record, "Settlement recorded");
                    if let Some(id) = record.event_id() {
                        seen_ids.insert(id.to_string());
                    }
                    seen_scores.insert(record.dedup_key());
                    results.push(record);
                    added += 1;
                }
                Err(reason) => {
                    if reason.is_duplicate() {
                        debug!(teams = %event.teams_key(), reason = %reason, "Settlement skipped");
                    } else {
                        warn!(
                            teams = %event.teams_key(),
                            score = %event.score_string(),
                            reason = %reason,
                            "Settlement skipped"
                        );
                    }
                    skipped.push((event.clone(), reason));
                }
            }
        }

        Reconciliation {
            results,
            added,
            skipped,
        }
    }

    fn reconcile_event(
        &self,
        event: &SettledEvent,
        placed: &[PlacedBet],
        seen_ids: &HashSet<String>,
        seen_scores: &HashSet<String>,
        timestamp: &str,
    ) -> Result<SettlementRecord, SkipReason> {
        if event.home_team.trim().is_empty() || event.away_team.trim().is_empty() {
            return Err(SkipReason::MissingTeam);
        }

        let bet = find_placed_bet(event, placed).ok_or_else(|| SkipReason::NoMatchingBet {
            teams: event.teams_key(),
        })?;

        let event_id = event
            .event_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        if let Some(id) = event_id {
            if seen_ids.contains(id) {
                return Err(SkipReason::DuplicateEventId {
                    event_id: id.to_string(),
                });
            }
        }

        let record = SettlementRecord {
            teams_key: event.teams_key(),
            score: event.score_string(),
            probability: Some(bet.bet.target_probability),
            event_id: event_id.unwrap_or_default().to_string(),
            timestamp: timestamp.to_string(),
        };

        if seen_scores.contains(&record.dedup_key()) {
            return Err(SkipReason::DuplicateScore {
                teams: record.teams_key,
                score: record.score,
            });
        }

        Ok(record)
    }
}

/// Matching bet for an event: an equal event id wins outright, otherwise
/// the first bet whose teams match by name.
fn find_placed_bet<'a>(event: &SettledEvent, placed: &'a [PlacedBet]) -> Option<&'a PlacedBet> {
    let event_id = event.event_id.as_deref().map(str::trim).filter(|id| !id.is_empty());

    if let Some(id) = event_id {
        let by_id = placed
            .iter()
            .find(|b| b.event_id.as_deref().map(str::trim) == Some(id));
        if by_id.is_some() {
            return by_id;
        }
    }

    placed
        .iter()
        .find(|b| teams_match(&b.bet.teams.to_string(), &event.home_team, &event.away_team))
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Messages accepted by the settlement worker.
#[derive(Debug, Clone)]
pub enum SettlementMessage {
    /// Working set of the latest cycle. Replaces the previous one.
    Placed(Arc<Vec<PlacedBet>>),
    /// A decoded settled-events payload.
    Batch(Vec<SettledEvent>),
}

/// Totals reported when the worker shuts down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub batches: usize,
    pub records_added: usize,
}

/// Single writer of the result store.
pub struct SettlementWorker {
    reconciler: SettlementReconciler,
    result_path: PathBuf,
    placed: Arc<Vec<PlacedBet>>,
}

impl SettlementWorker {
    pub fn new(reconciler: SettlementReconciler, result_path: PathBuf) -> Self {
        Self {
            reconciler,
            result_path,
            placed: Arc::new(Vec::new()),
        }
    }

    /// Seed the worker with a working set loaded at startup.
    pub fn with_placed(mut self, placed: Vec<PlacedBet>) -> Self {
        self.placed = Arc::new(placed);
        self
    }

    /// Process messages until every sender is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<SettlementMessage>) -> WorkerSummary {
        let mut summary = WorkerSummary::default();

        while let Some(message) = rx.recv().await {
            match message {
                SettlementMessage::Placed(placed) => {
                    debug!(bets = placed.len(), "Settlement worker received working set");
                    self.placed = placed;
                }
                SettlementMessage::Batch(events) => {
                    summary.batches += 1;
                    match self.handle_batch(&events) {
                        Ok(added) => summary.records_added += added,
                        Err(e) => error!(error = %e, "Failed to reconcile settlement batch"),
                    }
                }
            }
        }

        info!(
            batches = summary.batches,
            added = summary.records_added,
            "Settlement worker stopped"
        );
        summary
    }

    /// One read-modify-write of the result store.
    fn handle_batch(&self, events: &[SettledEvent]) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let prior = storage::load_results(&self.result_path)?;
        let outcome = self.reconciler.reconcile(events, &self.placed, &prior);

        if outcome.any_added() {
            storage::save_results(&self.result_path, &outcome.results)?;
        }

        info!(
            events = events.len(),
            placed = self.placed.len(),
            added = outcome.added,
            skipped = outcome.skipped.len(),
            "Settlement batch reconciled"
        );
        Ok(outcome.added)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
