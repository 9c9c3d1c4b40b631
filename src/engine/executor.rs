//! Bet-slip executor.
//!
//! Resolves each placed bet to a board cell and drives the external UI
//! through the `BetSlipDriver` seam: open the category's market view,
//! activate the cell, submit the slip once at the end. Bets that cannot
//! be resolved are skipped with the stage that failed.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::league::LeagueMapper;
use crate::engine::locator::{MarketLocator, OutcomeRef, TableModel};
use crate::types::{BetCategory, PlacedBet};

// ---------------------------------------------------------------------------
// Driver seam
// ---------------------------------------------------------------------------

/// Outcome of a submitted slip, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlipResult {
    pub won: bool,
}

/// The browser-side automation that owns the live board.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BetSlipDriver: Send + Sync {
    /// Switch the board to a category's market and return its table model.
    async fn open_market(&self, category: BetCategory) -> Result<TableModel>;

    /// Add a resolved cell to the slip.
    async fn activate(&self, cell: &OutcomeRef) -> Result<()>;

    /// Place the slip and wait for its result.
    async fn submit_slip(&self) -> Result<SlipResult>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Execution result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ActivatedBet {
    pub bet: PlacedBet,
    pub cell: OutcomeRef,
}

#[derive(Debug, Clone)]
pub struct SkippedBet {
    pub bet: PlacedBet,
    /// Stage at which resolution or activation stopped.
    pub stage: &'static str,
    pub reason: String,
}

/// Result of executing a working set.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub activated: Vec<ActivatedBet>,
    pub skipped: Vec<SkippedBet>,
    /// Set when a slip was submitted and its result reported.
    pub slip: Option<SlipResult>,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor {
    driver: Option<Arc<dyn BetSlipDriver>>,
    locator: MarketLocator,
    dry_run: bool,
    /// Board snapshot used to resolve cells when dry-running.
    dry_run_table: Option<TableModel>,
}

impl Executor {
    pub fn new(driver: Option<Arc<dyn BetSlipDriver>>, dry_run: bool) -> Self {
        Self {
            driver,
            locator: MarketLocator::new(),
            dry_run,
            dry_run_table: None,
        }
    }

    pub fn with_dry_run_table(mut self, table: TableModel) -> Self {
        self.dry_run_table = Some(table);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Execute a working set, one bet at a time, in order.
    ///
    /// In dry-run mode nothing is activated: resolutions against the
    /// snapshot table (if any) are logged and reported, and no slip is
    /// submitted.
    pub async fn execute_batch(&self, placed: &[PlacedBet], mapper: &LeagueMapper) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        if placed.is_empty() {
            return report;
        }

        info!(count = placed.len(), dry_run = self.dry_run, "Executing working set");

        if self.dry_run {
            self.dry_run_batch(placed, mapper, &mut report);
            return report;
        }

        let Some(driver) = self.driver.as_ref() else {
            warn!("No slip driver configured, nothing executed");
            return report;
        };

        let mut open: Option<(BetCategory, TableModel)> = None;

        for bet in placed {
            let category = bet.bet.category;

            let table = match open.take() {
                Some((c, table)) if c == category => table,
                _ => match driver.open_market(category).await {
                    Ok(table) => table,
                    Err(e) => {
                        skip(&mut report, bet, "open_market", e.to_string());
                        continue;
                    }
                },
            };

            match self.locator.locate_bet(&table, mapper, &bet.bet) {
                Ok(cell) => match driver.activate(&cell).await {
                    Ok(()) => {
                        info!(bet = %bet.bet, cell = %cell, "Outcome activated");
                        report.activated.push(ActivatedBet {
                            bet: bet.clone(),
                            cell,
                        });
                    }
                    Err(e) => skip(&mut report, bet, "activate", e.to_string()),
                },
                Err(e) => skip(&mut report, bet, e.stage(), e.to_string()),
            }

            open = Some((category, table));
        }

        if report.activated.is_empty() {
            info!(skipped = report.skipped.len(), "Nothing activated, slip not submitted");
            return report;
        }

        match driver.submit_slip().await {
            Ok(slip) => {
                info!(
                    driver = driver.name(),
                    activated = report.activated.len(),
                    won = slip.won,
                    "Slip settled"
                );
                report.slip = Some(slip);
            }
            Err(e) => warn!(driver = driver.name(), error = %e, "Slip submission failed"),
        }

        report
    }

    fn dry_run_batch(&self, placed: &[PlacedBet], mapper: &LeagueMapper, report: &mut ExecutionReport) {
        let Some(table) = self.dry_run_table.as_ref() else {
            for bet in placed {
                info!(
                    bet = %bet.bet,
                    league = mapper.resolve(&bet.bet.group_id),
                    "[DRY RUN] Would locate and activate"
                );
            }
            return;
        };

        for bet in placed {
            match self.locator.locate_bet(table, mapper, &bet.bet) {
                Ok(cell) => {
                    info!(bet = %bet.bet, cell = %cell, "[DRY RUN] Would activate");
                    report.activated.push(ActivatedBet {
                        bet: bet.clone(),
                        cell,
                    });
                }
                Err(e) => skip(report, bet, e.stage(), e.to_string()),
            }
        }
    }
}

fn skip(report: &mut ExecutionReport, bet: &PlacedBet, stage: &'static str, reason: String) {
    warn!(
        category = %bet.bet.category,
        teams = %bet.bet.teams,
        stage,
        reason = %reason,
        "Bet skipped"
    );
    report.skipped.push(SkippedBet {
        bet: bet.clone(),
        stage,
        reason,
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
