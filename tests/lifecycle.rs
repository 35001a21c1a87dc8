//! End-to-end lifecycle runs with in-memory collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockExchange, ScriptedMarket, ScriptedStrategy, StopClock};
use lendbot::config::StatusServerConfig;
use lendbot::dashboard::StatusServer;
use lendbot::engine::autorenew::AutoRenewController;
use lendbot::engine::interrupt;
use lendbot::engine::lifecycle::LifecycleManager;
use lendbot::engine::orchestrator::{CycleOrchestrator, CycleSettings};
use lendbot::status::{load_snapshot, StatusLog};
use lendbot::types::{ErrorClass, ProcessExit, ProcessState};

fn settings() -> CycleSettings {
    CycleSettings {
        output_currency: "BTC".into(),
        report_extended: true,
        end_date: None,
    }
}

#[tokio::test]
async fn successful_cycle_persists_one_status_line_then_sleeps() {
    let mut path = std::env::temp_dir();
    path.push(format!("lendbot_it_status_{}.json", uuid::Uuid::new_v4()));

    let (trigger, interrupt) = interrupt::channel();
    let clock = Arc::new(StopClock::new(1, trigger));
    let market = Arc::new(ScriptedMarket::default());
    let strategy = Arc::new(ScriptedStrategy::new(90));
    let status = Arc::new(StatusLog::new(Some(path.clone()), 100));

    let orchestrator = CycleOrchestrator::new(
        market.clone(),
        strategy.clone(),
        status.clone(),
        clock.clone(),
        settings(),
    );
    let mut manager = LifecycleManager::new(orchestrator, status.clone());

    let exit = manager.run(interrupt).await.unwrap();

    assert_eq!(exit, ProcessExit::Graceful);
    assert_eq!(exit.code(), 0);
    assert_eq!(market.refreshes(), 1);
    assert_eq!(strategy.calls(), vec!["transfer", "cancel", "lend"]);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(90)]);

    let persisted = load_snapshot(&path).unwrap();
    assert_eq!(persisted.revision, 1);
    assert_eq!(persisted.status, "Lended: BTC:0.30000000");
    assert_eq!(persisted.log.back().unwrap().message, "bye");

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn recoverable_errors_retry_until_interrupted() {
    let (trigger, interrupt) = interrupt::channel();
    let clock = Arc::new(StopClock::new(3, trigger));
    let market = Arc::new(ScriptedMarket::failing_with(&[
        "The read operation timed out",
        "Unexpected token in JSON response",
    ]));
    let strategy = Arc::new(ScriptedStrategy::new(15));
    let status = Arc::new(StatusLog::new(None, 100));

    let orchestrator = CycleOrchestrator::new(
        market.clone(),
        strategy.clone(),
        status.clone(),
        clock.clone(),
        settings(),
    );
    let mut manager = LifecycleManager::new(orchestrator, status.clone());

    let exit = manager.run(interrupt).await.unwrap();

    assert_eq!(exit, ProcessExit::Graceful);
    assert_eq!(market.refreshes(), 3);
    // Only the third cycle got past refresh.
    assert_eq!(strategy.calls(), vec!["transfer", "cancel", "lend"]);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(15); 3]);

    let errors: Vec<_> = status
        .snapshot()
        .log
        .iter()
        .filter(|e| e.level == lendbot::status::LogLevel::Error)
        .map(|e| e.message.clone())
        .collect();
    assert_eq!(
        errors,
        vec!["The read operation timed out", "Unexpected token in JSON response"]
    );
}

#[tokio::test]
async fn permission_denied_is_fatal_and_skips_cleanup() {
    let exchange = MockExchange::with_flags(&[true, true]);
    let (trigger, interrupt) = interrupt::channel();
    let clock = Arc::new(StopClock::new(1, trigger));
    let strategy = Arc::new(ScriptedStrategy::failing_lend(60, "Permission denied: key restricted"));
    let status = Arc::new(StatusLog::new(None, 100));

    let orchestrator = CycleOrchestrator::new(
        Arc::new(ScriptedMarket::default()),
        strategy,
        status.clone(),
        clock.clone(),
        settings(),
    );
    let mut manager = LifecycleManager::new(orchestrator, status.clone())
        .with_auto_renew(AutoRenewController::new(Arc::new(exchange.clone()), status.clone()));

    let exit = manager.run(interrupt).await.unwrap();

    assert_eq!(exit, ProcessExit::Fatal(ErrorClass::PermissionDenied));
    assert_eq!(exit.code(), 1);
    assert!(clock.sleeps().is_empty());
    assert_eq!(manager.state(), ProcessState::Running);
    // Cleared at startup, never restored.
    assert_eq!(exchange.flags(), vec![false, false]);
    assert_eq!(
        ErrorClass::PermissionDenied.hint(),
        Some("Are you using IP filter on the key? Maybe your IP changed?")
    );
}

#[tokio::test]
async fn full_run_with_status_server_and_auto_renew() {
    let exchange = MockExchange::with_flags(&[true, false, true]);
    let (trigger, interrupt) = interrupt::channel();
    let clock = Arc::new(StopClock::new(2, trigger));
    let status = Arc::new(StatusLog::new(None, 100));

    let orchestrator = CycleOrchestrator::new(
        Arc::new(ScriptedMarket::default()),
        Arc::new(ScriptedStrategy::new(30)),
        status.clone(),
        clock.clone(),
        settings(),
    );
    let server_config = StatusServerConfig {
        enabled: true,
        host: "127.0.0.1".into(),
        port: 0,
    };
    let mut manager = LifecycleManager::new(orchestrator, status.clone())
        .with_auto_renew(AutoRenewController::new(Arc::new(exchange.clone()), status.clone()))
        .with_status_reporter(Box::new(StatusServer::new(status.subscribe())), server_config);

    let exit = manager.run(interrupt).await.unwrap();

    assert_eq!(exit, ProcessExit::Graceful);
    assert_eq!(manager.state(), ProcessState::Stopped);
    assert_eq!(manager.orchestrator().cycles(), 2);
    // Two cleared at startup, three set at shutdown.
    assert_eq!(exchange.toggles().len(), 5);
    assert_eq!(exchange.flags(), vec![true, true, true]);
}

#[tokio::test]
async fn interrupt_on_last_startup_toggle_skips_the_loop() {
    let exchange = MockExchange::with_flags(&[true, true]);
    let (trigger, interrupt) = interrupt::channel();
    exchange.interrupt_after(2, trigger.clone());
    let clock = Arc::new(StopClock::new(1, trigger));
    let market = Arc::new(ScriptedMarket::default());
    let strategy = Arc::new(ScriptedStrategy::new(60));
    let status = Arc::new(StatusLog::new(None, 100));

    let orchestrator = CycleOrchestrator::new(
        market.clone(),
        strategy.clone(),
        status.clone(),
        clock.clone(),
        settings(),
    );
    let mut manager = LifecycleManager::new(orchestrator, status.clone())
        .with_auto_renew(AutoRenewController::new(Arc::new(exchange.clone()), status.clone()));

    let exit = manager.run(interrupt).await.unwrap();

    assert_eq!(exit, ProcessExit::Graceful);
    assert_eq!(manager.state(), ProcessState::Stopped);
    assert_eq!(manager.orchestrator().cycles(), 0);
    assert_eq!(market.refreshes(), 0);
    assert!(strategy.calls().is_empty());
    assert!(clock.sleeps().is_empty());
    // Both cleared, then both restored.
    assert_eq!(exchange.toggles().len(), 4);
    assert_eq!(exchange.flags(), vec![true, true]);
}
