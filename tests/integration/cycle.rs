//! End-to-end cycle: snapshot → selection → slip → metrics → settlement.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use staker::alerts::LogAlerter;
use staker::config::PathsConfig;
use staker::engine::cycle::CycleRunner;
use staker::engine::executor::Executor;
use staker::engine::reconciler::{SettlementMessage, SettlementReconciler, SettlementWorker};
use staker::storage;
use staker::strategy::policy::SelectionOutcome;
use staker::strategy::risk::LossStreakGuard;
use staker::strategy::CandidateSelector;
use staker::types::{BetCategory, MetricsRow};

use super::mock_driver::MockDriver;

// ---- helpers ---------------------------------------------------------------

pub fn make_paths(dir: &Path) -> PathsConfig {
    PathsConfig {
        fixture_file: dir.join("fixture.json"),
        stats_file: dir.join("stats.json"),
        team_file: dir.join("team.txt"),
        selection_file: dir.join("selbet.txt"),
        result_file: dir.join("result.json"),
        metrics_file: dir.join("metrics.csv"),
        settled_inbox: dir.join("settled"),
        table_file: None,
    }
}

pub const FIXTURE: &str = r#"{"wrapEventList": {"value": [
    {"F": "Arsenal", "B": "Chelsea", "G": "1021", "I": [
        {"R": [{"a": 2.60, "b": 0.26, "c": "Under 1.5"}, {"a": 1.35, "b": 0.74, "c": "Over 1.5"}]}
    ]},
    {"F": "Leeds", "B": "Fulham", "G": "1021", "I": [
        {"R": [{"a": 1.40, "b": 0.58, "c": "Yes"}, {"a": 2.70, "b": 0.42, "c": "No"}]}
    ]},
    {"F": "Sevilla", "B": "Betis", "G": "1022", "I": [
        {"R": [{"a": 1.25, "b": 0.77, "c": "Yes"}]}
    ]}
]}}"#;

pub const STATS: &str = r#"{
    "both_teams_score": [
        {"teams": "Leeds vs Fulham", "probability": 0.58, "confidence": 70}
    ],
    "over_1.5": [
        {"teams": "Arsenal vs Chelsea", "probability": 0.74, "confidence": 85}
    ]
}"#;

pub const TEAM_FILE: &str = "England\n1021\nSpain\n1022\n";

pub fn write_inputs(paths: &PathsConfig) {
    std::fs::write(&paths.fixture_file, FIXTURE).unwrap();
    std::fs::write(&paths.stats_file, STATS).unwrap();
    std::fs::write(&paths.team_file, TEAM_FILE).unwrap();
}

fn make_runner(
    paths: &PathsConfig,
    driver: &MockDriver,
    tx: mpsc::Sender<SettlementMessage>,
) -> CycleRunner {
    let executor = Executor::new(Some(Arc::new(driver.clone())), false);
    CycleRunner::new(paths.clone(), CandidateSelector::default(), executor, tx)
}

// ---- tests -----------------------------------------------------------------

#[tokio::test]
async fn test_full_cycle_places_pair_and_records_win() {
    let dir = tempfile::tempdir().unwrap();
    let paths = make_paths(dir.path());
    write_inputs(&paths);

    let driver = MockDriver::new(&[true]);
    let (tx, _rx) = mpsc::channel(8);
    let mut runner = make_runner(&paths, &driver, tx);

    let report = runner.run_cycle().await.unwrap();

    assert_eq!(report.fixtures, 3);
    assert_eq!(report.candidates_found, 2);
    assert!(matches!(report.outcome, SelectionOutcome::Pair { .. }));
    assert_eq!(report.activated, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.slip.map(|s| s.won), Some(true));

    // Highest confidence first, one market view per category switch
    assert_eq!(
        driver.opened(),
        vec![BetCategory::Over15, BetCategory::BothTeamsScore]
    );
    let cells = driver.activated();
    assert_eq!(cells[0].label, "1.35");
    assert_eq!(cells[1].label, "1.40");
    assert_eq!(cells[1].row, 1);

    assert_eq!(
        storage::load_metrics(&paths.metrics_file).unwrap(),
        vec![MetricsRow::won()]
    );
    let placed = storage::load_placed_bets(&paths.selection_file).unwrap();
    assert_eq!(placed.len(), 2);
    assert_eq!(placed[0].bet.teams.to_string(), "Arsenal vs Chelsea");
}

#[tokio::test]
async fn test_low_priced_single_places_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let paths = make_paths(dir.path());
    write_inputs(&paths);
    std::fs::write(
        &paths.stats_file,
        r#"{"over_1.5": [{"teams": "Sevilla vs Betis", "probability": 0.77, "confidence": 90}],
            "both_teams_score": [{"teams": "Sevilla vs Betis", "probability": 0.77, "confidence": 90}]}"#,
    )
    .unwrap();

    let driver = MockDriver::new(&[true]);
    let (tx, _rx) = mpsc::channel(8);
    let mut runner = make_runner(&paths, &driver, tx);
    let report = runner.run_cycle().await.unwrap();

    assert_eq!(report.candidates_found, 1);
    assert!(report.outcome.is_rejected());
    assert_eq!(report.placed, 0);
    assert!(driver.opened().is_empty());
    assert!(!paths.metrics_file.exists());
}

#[tokio::test]
async fn test_unreachable_board_records_loss_and_trips_guard() {
    let dir = tempfile::tempdir().unwrap();
    let paths = make_paths(dir.path());
    write_inputs(&paths);

    let driver = MockDriver::new(&[]);
    driver.set_error("board did not load");
    let (tx, _rx) = mpsc::channel(8);
    let mut runner = make_runner(&paths, &driver, tx);
    let guard = LossStreakGuard::default();

    for _ in 0..3 {
        let report = runner.run_cycle().await.unwrap();
        assert_eq!(report.placed, 2);
        assert_eq!(report.activated, 0);
        assert_eq!(report.skipped, 2);
        assert!(report.slip.is_none());
        assert_eq!(report.metrics, Some(MetricsRow::lost()));
    }

    let rows = storage::load_metrics(&paths.metrics_file).unwrap();
    assert_eq!(rows, vec![MetricsRow::lost(); 3]);
    assert!(guard.check(&rows, &LogAlerter).await);
}

#[tokio::test]
async fn test_settlement_after_cycle_fills_result_store_once() {
    let dir = tempfile::tempdir().unwrap();
    let paths = make_paths(dir.path());
    write_inputs(&paths);
    std::fs::create_dir_all(&paths.settled_inbox).unwrap();

    let reconciler = SettlementReconciler::from_offset_minutes(60).unwrap();
    let worker = SettlementWorker::new(reconciler, paths.result_file.clone());
    let (tx, rx) = mpsc::channel(8);
    let worker_handle = tokio::spawn(worker.run(rx));

    let driver = MockDriver::new(&[false]);
    let mut runner = make_runner(&paths, &driver, tx.clone());
    runner.run_cycle().await.unwrap();

    let payload = r#"{"data": {"events": [
        {"eventId": "e1", "homeTeamName": "Arsenal", "awayTeamName": "Chelsea", "homeTeamScore": 0, "awayTeamScore": 1},
        {"eventId": "e2", "homeTeamName": "Leeds", "awayTeamName": "Fulham", "homeTeamScore": "1", "awayTeamScore": "1"},
        {"eventId": "e3", "homeTeamName": "Sevilla", "awayTeamName": "Betis", "homeTeamScore": 2, "awayTeamScore": 0}
    ]}}"#;
    // Same payload delivered twice
    std::fs::write(paths.settled_inbox.join("001.json"), payload).unwrap();
    std::fs::write(paths.settled_inbox.join("002.json"), payload).unwrap();

    for path in storage::list_inbox(&paths.settled_inbox).unwrap() {
        let events = storage::load_settled_payload(&path).unwrap();
        tx.send(SettlementMessage::Batch(events)).await.unwrap();
        storage::mark_processed(&path).unwrap();
    }
    drop(runner);
    drop(tx);

    let summary = worker_handle.await.unwrap();
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.records_added, 2);

    let results = storage::load_results(&paths.result_file).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].teams_key, "Arsenal vs Chelsea");
    assert_eq!(results[0].score, "0 - 1");
    assert_eq!(results[1].event_id, "e2");
    assert!(results.iter().all(|r| r.probability.is_some()));

    assert!(storage::list_inbox(&paths.settled_inbox).unwrap().is_empty());
    assert_eq!(
        storage::load_metrics(&paths.metrics_file).unwrap(),
        vec![MetricsRow::lost()]
    );
}
