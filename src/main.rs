//! STAKER: rule-driven bet selection for instant-virtual football
//!
//! Entry point. Loads configuration, initialises structured logging,
//! runs the loss-streak guard, then drives betting cycles and the
//! settlement worker until the session ends.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use staker::alerts::{build_alerter, Alerter};
use staker::config;
use staker::engine::cycle::{CycleReport, CycleRunner};
use staker::engine::executor::Executor;
use staker::engine::reconciler::{SettlementMessage, SettlementReconciler, SettlementWorker};
use staker::storage;
use staker::strategy::matcher::{ProbabilityMatch, RuleMatcher};
use staker::strategy::policy::{PolicyConfig, SelectionPolicy};
use staker::strategy::risk::{GuardConfig, LossStreakGuard};
use staker::strategy::CandidateSelector;

const BANNER: &str = r#"
 ____  _____  _    _  _______ ____
/ ___||_   _|/ \  | |/ / ____|  _ \
\___ \  | | / _ \ | ' /|  _| | |_) |
 ___) | | |/ ___ \| . \| |___|  _ <
|____/  |_/_/   \_\_|\_\_____|_| \_\

  Instant-virtual football bet selector
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        poll_interval_secs = cfg.agent.poll_interval_secs,
        run_duration_mins = cfg.agent.run_duration_mins,
        dry_run = cfg.agent.dry_run,
        "STAKER starting up"
    );

    // -- Loss-streak guard -----------------------------------------------

    let alerter = build_alerter(&cfg.alerts);
    let guard = LossStreakGuard::new(GuardConfig {
        max_consecutive_losses: cfg.guard.max_consecutive_losses,
    });
    if guard_trips(&guard, &cfg.paths.metrics_file, alerter.as_ref()).await {
        warn!("Loss-streak guard tripped, session not started");
        return Ok(());
    }

    // -- Initialise components -------------------------------------------

    let selector = CandidateSelector::new(
        RuleMatcher::new(ProbabilityMatch::from_tolerance(cfg.selection.probability_tolerance)),
        SelectionPolicy::new(PolicyConfig {
            single_min_price: cfg.selection.single_min_price,
            pair_min_combined_price: cfg.selection.pair_min_combined_price,
        }),
    );

    // No in-process slip driver: live runs need one wired in here.
    let mut executor = Executor::new(None, cfg.agent.dry_run);
    if let Some(table_path) = cfg.paths.table_file.as_deref() {
        match storage::load_table_model(table_path) {
            Ok(table) => executor = executor.with_dry_run_table(table),
            Err(e) => warn!(error = %e, "Board snapshot unavailable, dry run will not resolve cells"),
        }
    }

    // Settlement worker: sole writer of the result store
    let reconciler = SettlementReconciler::from_offset_minutes(cfg.settlement.utc_offset_minutes)?;
    let previous = storage::load_placed_bets(&cfg.paths.selection_file).unwrap_or_else(|e| {
        warn!(error = %e, "Previous working set unreadable, starting empty");
        Vec::new()
    });
    let worker = SettlementWorker::new(reconciler, cfg.paths.result_file.clone()).with_placed(previous);
    let (tx, rx) = mpsc::channel(cfg.settlement.channel_capacity);
    let worker_handle = tokio::spawn(worker.run(rx));

    let mut runner = CycleRunner::new(cfg.paths.clone(), selector, executor, tx.clone());

    // -- Main loop -------------------------------------------------------

    let mut cycle_tick = tokio::time::interval(Duration::from_secs(cfg.agent.poll_interval_secs));
    let mut inbox_tick = tokio::time::interval(Duration::from_secs(cfg.settlement.inbox_poll_secs));
    let cycle_timeout = Duration::from_secs(cfg.agent.cycle_timeout_secs);
    let session_end = tokio::time::sleep(Duration::from_secs(cfg.agent.run_duration_mins * 60));
    tokio::pin!(session_end);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.agent.poll_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = cycle_tick.tick() => {
                if !runner.snapshot_is_fresh() {
                    debug!("Fixture snapshot unchanged, waiting");
                    continue;
                }

                match tokio::time::timeout(cycle_timeout, runner.run_cycle()).await {
                    Ok(Ok(report)) => {
                        log_cycle_report(&report);
                        if report.metrics.is_some()
                            && guard_trips(&guard, &cfg.paths.metrics_file, alerter.as_ref()).await
                        {
                            warn!("Loss-streak guard tripped, ending session");
                            break;
                        }
                    }
                    Ok(Err(e)) => error!(error = %e, "Cycle failed, continuing to next"),
                    Err(_) => warn!(
                        timeout_secs = cfg.agent.cycle_timeout_secs,
                        "Cycle abandoned after timeout"
                    ),
                }
            }
            _ = inbox_tick.tick() => {
                if let Err(e) = drain_inbox(&cfg.paths.settled_inbox, &tx).await {
                    error!(error = %e, "Failed to drain settled-event inbox");
                }
            }
            _ = &mut session_end => {
                info!(minutes = cfg.agent.run_duration_mins, "Session duration reached.");
                break;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    // Pick up anything that settled while shutting down, then close the channel
    if let Err(e) = drain_inbox(&cfg.paths.settled_inbox, &tx).await {
        error!(error = %e, "Failed to drain settled-event inbox");
    }
    let cycles = runner.cycle_count();
    drop(runner);
    drop(tx);
    let summary = worker_handle.await?;

    info!(
        cycles,
        batches = summary.batches,
        settlements = summary.records_added,
        "STAKER shut down cleanly."
    );

    Ok(())
}

/// Re-read the metrics log and run the guard over it.
async fn guard_trips(guard: &LossStreakGuard, metrics_path: &Path, alerter: &dyn Alerter) -> bool {
    match storage::load_metrics(metrics_path) {
        Ok(rows) => guard.check(&rows, alerter).await,
        Err(e) => {
            error!(error = %e, "Metrics log unreadable, guard not evaluated");
            false
        }
    }
}

/// Hand every pending inbox payload to the settlement worker.
async fn drain_inbox(inbox: &Path, tx: &mpsc::Sender<SettlementMessage>) -> Result<()> {
    for path in storage::list_inbox(inbox)? {
        match storage::load_settled_payload(&path) {
            Ok(events) => {
                debug!(path = %path.display(), events = events.len(), "Settled payload received");
                tx.send(SettlementMessage::Batch(events))
                    .await
                    .map_err(|_| anyhow::anyhow!("Settlement worker has stopped"))?;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable settled payload"),
        }
        storage::mark_processed(&path)?;
    }
    Ok(())
}

/// Log a human-readable cycle summary.
fn log_cycle_report(report: &CycleReport) {
    info!(
        cycle = report.cycle_number,
        cycle_id = %report.cycle_id,
        fixtures = report.fixtures,
        candidates = report.candidates_found,
        outcome = %report.outcome,
        placed = report.placed,
        activated = report.activated,
        skipped = report.skipped,
        won = ?report.slip.map(|s| s.won),
        recorded_loss = report.metrics.is_some_and(|m| m.lost),
        "Cycle complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("staker=info"));

    let json_logging = std::env::var("STAKER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
