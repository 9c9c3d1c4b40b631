//! Multi-cycle session simulation.
//!
//! Replays the same snapshot through several cycles with scripted slip
//! results and checks the loss-streak guard stops the session at the
//! right cycle.

use std::sync::Arc;
use tokio::sync::mpsc;

use staker::alerts::LogAlerter;
use staker::engine::cycle::CycleRunner;
use staker::engine::executor::Executor;
use staker::storage;
use staker::strategy::risk::LossStreakGuard;
use staker::strategy::CandidateSelector;

use super::cycle::{make_paths, write_inputs};
use super::mock_driver::MockDriver;

/// Run cycles until the guard halts or the script runs out.
/// Returns the cycles played and whether the guard halted.
async fn play_session(results: &[bool]) -> (u64, bool) {
    let dir = tempfile::tempdir().unwrap();
    let paths = make_paths(dir.path());
    write_inputs(&paths);

    let driver = MockDriver::new(results);
    let (tx, mut rx) = mpsc::channel(64);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let executor = Executor::new(Some(Arc::new(driver.clone())), false);
    let mut runner = CycleRunner::new(paths.clone(), CandidateSelector::default(), executor, tx);
    let guard = LossStreakGuard::default();

    while driver.remaining_results() > 0 {
        let report = runner.run_cycle().await.unwrap();
        assert!(report.slip.is_some());

        let rows = storage::load_metrics(&paths.metrics_file).unwrap();
        if guard.check(&rows, &LogAlerter).await {
            return (runner.cycle_count(), true);
        }
    }
    (runner.cycle_count(), false)
}

#[tokio::test]
async fn test_session_halts_on_third_straight_loss() {
    let (cycles, halted) = play_session(&[true, false, false, false, true]).await;
    assert!(halted);
    assert_eq!(cycles, 4);
}

#[tokio::test]
async fn test_win_between_losses_keeps_session_alive() {
    let (cycles, halted) = play_session(&[false, false, true, false, false, true]).await;
    assert!(!halted);
    assert_eq!(cycles, 6);
}
