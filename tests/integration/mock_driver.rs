//! Mock slip driver for integration testing.
//!
//! Provides a deterministic `BetSlipDriver` that serves a fixed board,
//! records every activation, and settles slips from a scripted list of
//! results, all in-memory with no browser behind it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use staker::engine::executor::{BetSlipDriver, SlipResult};
use staker::engine::locator::{
    MarketBlock, OutcomeCell, OutcomeGroup, OutcomeRef, TableModel, TeamBlock, TeamRow,
};
use staker::types::BetCategory;

/// A scripted slip driver.
///
/// Clones share state, so a test can keep one handle while the executor
/// owns another.
#[derive(Clone)]
pub struct MockDriver {
    table: TableModel,
    opened: Arc<Mutex<Vec<BetCategory>>>,
    activated: Arc<Mutex<Vec<OutcomeRef>>>,
    /// Results handed out by successive `submit_slip` calls.
    results: Arc<Mutex<VecDeque<bool>>>,
    /// If set, all operations will return this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockDriver {
    /// Driver over the default board, settling slips with `results` in order.
    pub fn new(results: &[bool]) -> Self {
        Self::with_table(default_board(), results)
    }

    pub fn with_table(table: TableModel, results: &[bool]) -> Self {
        Self {
            table,
            opened: Arc::new(Mutex::new(Vec::new())),
            activated: Arc::new(Mutex::new(Vec::new())),
            results: Arc::new(Mutex::new(results.iter().copied().collect())),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn opened(&self) -> Vec<BetCategory> {
        self.opened.lock().unwrap().clone()
    }

    pub fn activated(&self) -> Vec<OutcomeRef> {
        self.activated.lock().unwrap().clone()
    }

    pub fn remaining_results(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    fn check_error(&self) -> Result<()> {
        match self.force_error.lock().unwrap().as_ref() {
            Some(err) => Err(anyhow!("{err}")),
            None => Ok(()),
        }
    }
}

/// England in block 1, Spain in block 2. Cell labels are the prices.
pub fn default_board() -> TableModel {
    let row = |home: &str, away: &str| TeamRow {
        home: home.to_string(),
        away: away.to_string(),
    };
    let cells = |labels: &[&str]| OutcomeGroup {
        cells: labels
            .iter()
            .map(|l| OutcomeCell {
                label: Some(l.to_string()),
            })
            .collect(),
    };

    TableModel {
        team_column: Some(vec![
            TeamBlock {
                rows: vec![row("Arsenal", "Chelsea"), row("Leeds", "Fulham")],
            },
            TeamBlock {
                rows: vec![row("Sevilla", "Betis")],
            },
        ]),
        market_column: Some(vec![
            MarketBlock {
                rows: vec![cells(&["1.21", "1.35", "3.10"]), cells(&["1.40", "1.62", "2.90"])],
            },
            MarketBlock {
                rows: vec![cells(&["1.30", "1.44", "2.75"])],
            },
        ]),
    }
}

#[async_trait]
impl BetSlipDriver for MockDriver {
    async fn open_market(&self, category: BetCategory) -> Result<TableModel> {
        self.check_error()?;
        self.opened.lock().unwrap().push(category);
        Ok(self.table.clone())
    }

    async fn activate(&self, cell: &OutcomeRef) -> Result<()> {
        self.check_error()?;
        self.activated.lock().unwrap().push(cell.clone());
        Ok(())
    }

    async fn submit_slip(&self) -> Result<SlipResult> {
        self.check_error()?;
        let won = self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("No scripted slip result left"))?;
        Ok(SlipResult { won })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Self-tests for the mock itself
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use staker::engine::league::LeagueMapper;
    use staker::engine::locator::MarketLocator;
    use staker::types::TeamsKey;

    #[tokio::test]
    async fn test_mock_scripted_results_in_order() {
        let driver = MockDriver::new(&[false, true]);
        assert!(!driver.submit_slip().await.unwrap().won);
        assert!(driver.submit_slip().await.unwrap().won);
        assert!(driver.submit_slip().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_forced_error() {
        let driver = MockDriver::new(&[true]);
        driver.set_error("browser crashed");
        assert!(driver.open_market(BetCategory::Over15).await.is_err());

        driver.clear_error();
        assert!(driver.open_market(BetCategory::Over15).await.is_ok());
        assert_eq!(driver.opened(), vec![BetCategory::Over15]);
    }

    #[tokio::test]
    async fn test_default_board_resolves_spain_block() {
        let driver = MockDriver::new(&[]);
        let table = driver.open_market(BetCategory::BothTeamsScore).await.unwrap();
        let teams: TeamsKey = "Sevilla vs Betis".parse().unwrap();

        let cell = MarketLocator::new()
            .locate(&table, "Spain", &teams, BetCategory::BothTeamsScore, None)
            .unwrap();
        assert_eq!(cell.league_index, 2);
        assert_eq!(cell.label, "1.30");
        assert_eq!(LeagueMapper::league_order_index("Spain"), 2);
    }
}
