//! Loss-streak guard.
//!
//! Walks the metrics history in order and halts the session once the
//! configured number of consecutive losses is reached. Any row that is
//! not a loss resets the streak.

use tracing::{error, info, warn};

use crate::alerts::Alerter;
use crate::types::MetricsRow;

#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub max_consecutive_losses: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_consecutive_losses: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LossStreakGuard {
    config: GuardConfig,
}

impl LossStreakGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn max_consecutive_losses(&self) -> usize {
        self.config.max_consecutive_losses
    }

    /// Index of the row at which the streak first reaches the limit.
    pub fn first_halt_index(&self, rows: &[MetricsRow]) -> Option<usize> {
        let limit = self.config.max_consecutive_losses.max(1);
        let mut streak = 0usize;

        for (idx, row) in rows.iter().enumerate() {
            if !row.lost {
                streak = 0;
                continue;
            }
            streak += 1;
            if streak >= limit {
                return Some(idx);
            }
        }
        None
    }

    /// Current losing streak at the end of the history.
    pub fn trailing_streak(&self, rows: &[MetricsRow]) -> usize {
        rows.iter().rev().take_while(|r| r.lost).count()
    }

    pub fn should_halt(&self, rows: &[MetricsRow]) -> bool {
        self.first_halt_index(rows).is_some()
    }

    /// Evaluate the history and alert the operator on a halt.
    ///
    /// Alert delivery failures are logged; the halt decision stands.
    pub async fn check(&self, rows: &[MetricsRow], alerter: &dyn Alerter) -> bool {
        let Some(idx) = self.first_halt_index(rows) else {
            info!(
                rows = rows.len(),
                streak = self.trailing_streak(rows),
                limit = self.config.max_consecutive_losses,
                "Loss-streak guard clear"
            );
            return false;
        };

        warn!(
            row = idx + 1,
            limit = self.config.max_consecutive_losses,
            "Consecutive loss limit reached, halting"
        );

        let message = format!(
            "{} losses in a row. Stop for today.",
            self.config.max_consecutive_losses
        );
        if let Err(e) = alerter.send(&message).await {
            error!(alerter = alerter.name(), error = %e, "Failed to deliver halt alert");
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
