//! One betting cycle: snapshot → selection → working set → execution.
//!
//! The runner is driven by the main loop on a timer. A cycle only runs
//! when the driver has written a fixture snapshot newer than the last
//! one seen; otherwise there is nothing to do.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PathsConfig;
use crate::engine::executor::{Executor, SlipResult};
use crate::engine::reconciler::SettlementMessage;
use crate::storage;
use crate::strategy::policy::SelectionOutcome;
use crate::strategy::CandidateSelector;
use crate::types::{MetricsRow, PlacedBet};

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of a completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub cycle_id: Uuid,
    pub fixtures: usize,
    pub candidates_found: usize,
    pub outcome: SelectionOutcome,
    pub placed: usize,
    pub activated: usize,
    pub skipped: usize,
    pub slip: Option<SlipResult>,
    /// Row appended to the metrics log, if any.
    pub metrics: Option<MetricsRow>,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct CycleRunner {
    paths: PathsConfig,
    selector: CandidateSelector,
    executor: Executor,
    settlement: mpsc::Sender<SettlementMessage>,
    last_snapshot: Option<SystemTime>,
    cycle_count: u64,
}

impl CycleRunner {
    pub fn new(
        paths: PathsConfig,
        selector: CandidateSelector,
        executor: Executor,
        settlement: mpsc::Sender<SettlementMessage>,
    ) -> Self {
        Self {
            paths,
            selector,
            executor,
            settlement,
            last_snapshot: None,
            cycle_count: 0,
        }
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Whether the fixture snapshot changed since the last call that
    /// returned true. A missing snapshot is never fresh.
    pub fn snapshot_is_fresh(&mut self) -> bool {
        let Ok(modified) = std::fs::metadata(&self.paths.fixture_file).and_then(|m| m.modified())
        else {
            return false;
        };
        if self.last_snapshot == Some(modified) {
            return false;
        }
        self.last_snapshot = Some(modified);
        true
    }

    /// Run a single cycle against the files currently on disk.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycle_count += 1;
        let mut report = CycleReport {
            cycle_number: self.cycle_count,
            cycle_id: Uuid::new_v4(),
            fixtures: 0,
            candidates_found: 0,
            outcome: SelectionOutcome::NoCandidates,
            placed: 0,
            activated: 0,
            skipped: 0,
            slip: None,
            metrics: None,
            timestamp: Utc::now(),
        };
        info!(cycle = report.cycle_number, cycle_id = %report.cycle_id, "Starting cycle");

        // 1. Inputs
        let Some(fixtures) = storage::load_fixture_snapshot(&self.paths.fixture_file)? else {
            debug!("No fixture snapshot, cycle skipped");
            return Ok(report);
        };
        report.fixtures = fixtures.len();
        let rules = storage::load_rules(&self.paths.stats_file)?;
        let mapper = storage::load_league_mapper(&self.paths.team_file)?;

        // 2. Selection
        let selection = self.selector.select(&fixtures, &rules);
        report.candidates_found = selection.candidates_found;
        report.outcome = selection.outcome;
        if selection.bets.is_empty() {
            return Ok(report);
        }

        // 3. Working set, handed to settlement as an immutable snapshot
        let placed: Vec<PlacedBet> = selection.bets.into_iter().map(PlacedBet::from).collect();
        report.placed = placed.len();
        storage::save_placed_bets(&self.paths.selection_file, &placed)?;
        let placed = Arc::new(placed);
        self.settlement
            .send(SettlementMessage::Placed(Arc::clone(&placed)))
            .await
            .context("Settlement worker has stopped")?;

        // 4. Execution
        let execution = self.executor.execute_batch(&placed, &mapper).await;
        report.activated = execution.activated.len();
        report.skipped = execution.skipped.len();
        report.slip = execution.slip;

        // 5. Metrics: one row per live cycle with a working set. Anything
        // short of a won slip counts as a loss.
        if !self.executor.is_dry_run() {
            let won = execution.slip.is_some_and(|s| s.won);
            let row = MetricsRow::from_outcome(won);
            if execution.slip.is_none() {
                warn!(
                    skipped = report.skipped,
                    "No slip result for a placed working set, recording a loss"
                );
            }
            storage::append_metrics_row(&self.paths.metrics_file, row)?;
            report.metrics = Some(row);
        }

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
