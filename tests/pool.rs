
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use testvisor::{
    Config, EventKind, HarnessError, RuntimeError, Supervisor, TaskOutcome, TaskQueue, Worker,
    baskets,
};
use tokio_util::sync::CancellationToken;

use test_helpers::*;

#[tokio::test]
async fn every_task_runs_exactly_once_across_workers() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::passing("box", 10));

    let sup = Supervisor::new(config(dir.path(), 3), Vec::new());
    let report = sup.run(baskets(vec![suite.clone()])).await?;

    assert!(report.is_success());
    assert_eq!(report.total(), 10);

    let mut seen: HashMap<String, usize> = HashMap::new();
    for (_, task) in suite.runs() {
        *seen.entry(task).or_default() += 1;
    }
    assert_eq!(seen.len(), 10);
    assert!(seen.values().all(|&n| n == 1));

    let mut stops = suite.stops();
    stops.sort();
    assert_eq!(
        stops,
        vec![
            ("01_box".to_string(), true),
            ("02_box".to_string(), true),
            ("03_box".to_string(), true),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn single_worker_keeps_discovery_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::passing("engine", 5));

    let report = Supervisor::new(config(dir.path(), 1), Vec::new())
        .run(baskets(vec![suite.clone()]))
        .await?;

    let order: Vec<String> = report.suites[0].records.iter().map(|r| r.task.clone()).collect();
    let expected: Vec<String> = (0..5).map(|i| format!("t{i:02}.test.lua")).collect();
    assert_eq!(order, expected);
    assert!(report.suites[0].records.iter().all(|r| r.worker == "01_engine"));
    Ok(())
}

#[tokio::test]
async fn failing_and_panicking_tests_do_not_stop_the_worker() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::new(
        "box",
        &[
            ("first.test.lua", Behavior::Pass),
            ("broken.test.lua", Behavior::Fail("assertion failed")),
            ("panics.test.lua", Behavior::Panic),
            ("last.test.lua", Behavior::Pass),
        ],
    ));

    let sup = Supervisor::new(config(dir.path(), 1), Vec::new());
    let mut rx = sup.bus().subscribe();
    let report = sup.run(baskets(vec![suite.clone()])).await?;

    assert_eq!(report.total(), 4);
    assert_eq!(report.passed(), 2);
    assert_eq!(report.failed(), 2);
    let outcomes: Vec<&TaskOutcome> = report.suites[0].records.iter().map(|r| &r.outcome).collect();
    assert_eq!(outcomes[1], &TaskOutcome::Failed("assertion failed".into()));
    assert!(matches!(outcomes[2], TaskOutcome::Failed(r) if r.contains("test body exploded")));
    assert_eq!(outcomes[3], &TaskOutcome::Passed);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::TaskFailed), 2);
    assert_eq!(count(&events, EventKind::WorkerHalted), 0);
    assert_eq!(suite.stops(), vec![("01_box".to_string(), true)]);
    Ok(())
}

#[tokio::test]
async fn start_failure_releases_server_and_skips_tasks() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::passing("box", 3).failing_start(&[1, 2]));

    let sup = Supervisor::new(config(dir.path(), 2), Vec::new());
    let mut rx = sup.bus().subscribe();
    let report = sup.run(baskets(vec![suite.clone()])).await?;

    let box_report = &report.suites[0];
    assert!(box_report.records.is_empty());
    assert_eq!(box_report.skipped.len(), 3);
    assert_eq!(box_report.start_failures.len(), 2);
    assert!(box_report.start_failures[0].1.to_string().starts_with("failed: "));
    assert!(!report.is_success());

    assert!(suite.runs().is_empty());
    let mut stops = suite.stops();
    stops.sort();
    assert_eq!(
        stops,
        vec![("01_box".to_string(), false), ("02_box".to_string(), false)]
    );
    assert_eq!(count(&drain(&mut rx), EventKind::WorkerStartFailed), 2);
    Ok(())
}

#[tokio::test]
async fn healthy_worker_picks_up_tasks_of_a_failed_peer() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::passing("box", 4).failing_start(&[1]));

    let report = Supervisor::new(config(dir.path(), 2), Vec::new())
        .run(baskets(vec![suite.clone()]))
        .await?;

    let box_report = &report.suites[0];
    assert_eq!(box_report.records.len(), 4);
    assert!(box_report.skipped.is_empty());
    assert!(box_report.records.iter().all(|r| r.worker == "02_box"));
    assert_eq!(box_report.start_failures.len(), 1);
    Ok(())
}

#[tokio::test]
async fn stress_mode_repeats_rounds() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::passing("box", 3));
    let cfg = Config {
        repeat: 3,
        ..config(dir.path(), 2)
    };

    let report = Supervisor::new(cfg, Vec::new())
        .run(baskets(vec![suite.clone()]))
        .await?;

    assert_eq!(report.total(), 9);
    let mut per_task: HashMap<String, usize> = HashMap::new();
    for (_, task) in suite.runs() {
        *per_task.entry(task).or_default() += 1;
    }
    assert!(per_task.values().all(|&n| n == 3));
    Ok(())
}

#[tokio::test]
async fn suites_without_tasks_are_not_scheduled() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let empty = Arc::new(MockSuite::new("suites/empty", &[]));
    let full = Arc::new(MockSuite::passing("suites/box", 1));

    let b = baskets(vec![empty.clone(), full]);
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].key(), "box");

    let report = Supervisor::new(config(dir.path(), 1), Vec::new()).run(b).await?;
    assert_eq!(report.suites.len(), 1);
    assert!(empty.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn task_timeout_fails_the_task_only() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::new(
        "box",
        &[
            ("hang.test.lua", Behavior::HangForever),
            ("after.test.lua", Behavior::Pass),
        ],
    ));
    let cfg = Config {
        task_timeout: Duration::from_millis(100),
        ..config(dir.path(), 1)
    };

    let sup = Supervisor::new(cfg, Vec::new());
    let mut rx = sup.bus().subscribe();
    let report = sup.run(baskets(vec![suite])).await?;

    let records = &report.suites[0].records;
    assert!(matches!(&records[0].outcome, TaskOutcome::Failed(r) if r.contains("timed out")));
    assert_eq!(records[1].outcome, TaskOutcome::Passed);
    assert_eq!(count(&drain(&mut rx), EventKind::TimeoutHit), 1);
    Ok(())
}

#[tokio::test]
async fn cancel_interrupts_endless_stress_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::passing("box", 2));
    let cfg = Config {
        repeat: 0,
        ..config(dir.path(), 2)
    };

    let sup = Supervisor::new(cfg, Vec::new());
    let token = sup.cancel_token();
    let run = tokio::spawn(sup.run(baskets(vec![suite.clone()])));

    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();
    let res = tokio::time::timeout(Duration::from_secs(5), run).await??;

    match res {
        Err(RuntimeError::Interrupted { report }) => assert!(report.total() > 2),
        other => panic!("expected interruption, got {other:?}"),
    }
    assert_eq!(suite.stops().len(), 2);
    Ok(())
}

#[tokio::test]
async fn grace_exceeded_names_stuck_workers() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::new("box", &[("stuck.test.lua", Behavior::HangForever)]));
    let cfg = Config {
        grace: Duration::from_millis(200),
        no_output_timeout: Duration::ZERO,
        ..config(dir.path(), 1)
    };

    let sup = Supervisor::new(cfg, Vec::new());
    let token = sup.cancel_token();
    let run = tokio::spawn(sup.run(baskets(vec![suite.clone()])));

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();
    let res = tokio::time::timeout(Duration::from_secs(5), run).await??;

    match res {
        Err(RuntimeError::GraceExceeded { stuck, .. }) => {
            assert_eq!(stuck, vec!["01_box".to_string()])
        }
        other => panic!("expected grace overrun, got {other:?}"),
    }

    // the abandoned worker still releases its server from the drop guard
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(suite.stops(), vec![("01_box".to_string(), true)]);
    Ok(())
}

#[tokio::test]
async fn cooperative_test_stops_on_cancel_within_grace() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::new(
        "box",
        &[("waits.test.lua", Behavior::Hang), ("never.test.lua", Behavior::Pass)],
    ));

    let sup = Supervisor::new(config(dir.path(), 1), Vec::new());
    let token = sup.cancel_token();
    let run = tokio::spawn(sup.run(baskets(vec![suite.clone()])));

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();
    let res = tokio::time::timeout(Duration::from_secs(5), run).await??;

    let Err(RuntimeError::Interrupted { report }) = res else {
        panic!("expected interruption");
    };
    let suite_report = &report.suites[0];
    assert_eq!(suite_report.records.len(), 1);
    assert_eq!(suite_report.skipped, vec!["never.test.lua".to_string()]);
    assert_eq!(suite.stops(), vec![("01_box".to_string(), true)]);
    Ok(())
}

#[tokio::test]
async fn unknown_task_id_is_a_harness_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::passing("box", 1));
    let cfg = Arc::new(config(dir.path(), 1));
    let bus = testvisor::Bus::new(16);

    let ctx = testvisor::WorkerContext::new(1, "box", cfg);
    let mut worker = Worker::start(suite.clone(), ctx, bus, CancellationToken::new()).await?;
    let err = worker
        .run_task("missing.test.lua", &CancellationToken::new())
        .await
        .expect_err("unknown id");
    assert!(matches!(err, HarnessError::UnknownTask { ref task, .. } if task == "missing.test.lua"));

    let queue = Arc::new(TaskQueue::new());
    queue.push(testvisor::QueueItem::Task("missing.test.lua".into()))?;
    queue.push(testvisor::QueueItem::Stop)?;
    let report = worker.run_all(queue.clone(), CancellationToken::new()).await;

    assert!(report.halted.is_some());
    assert!(report.records.is_empty());
    assert_eq!(suite.stops(), vec![("01_box".to_string(), true)]);
    assert_eq!(queue.drain_remaining(), Vec::<String>::new());
    tokio::time::timeout(Duration::from_secs(1), queue.join()).await?;
    Ok(())
}

#[tokio::test]
async fn server_abandoned_mid_start_is_still_released() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::passing("box", 2).hanging_start(StartHang::Forever));
    let cfg = Config {
        grace: Duration::from_millis(100),
        ..config(dir.path(), 1)
    };

    let sup = Supervisor::new(cfg, Vec::new());
    let token = sup.cancel_token();
    let run = tokio::spawn(sup.run(baskets(vec![suite.clone()])));

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();
    let res = tokio::time::timeout(Duration::from_secs(5), run).await??;
    assert!(matches!(res, Err(RuntimeError::GraceExceeded { .. })));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(suite.calls().contains(&Call::Gen("01_box".into())));
    assert_eq!(suite.stops(), vec![("01_box".to_string(), false)]);
    Ok(())
}

#[tokio::test]
async fn shutdown_reaches_a_pending_server_start() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let suite = Arc::new(MockSuite::passing("box", 2).hanging_start(StartHang::UntilCancelled));

    let sup = Supervisor::new(config(dir.path(), 1), Vec::new());
    let token = sup.cancel_token();
    let run = tokio::spawn(sup.run(baskets(vec![suite.clone()])));

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();
    let res = tokio::time::timeout(Duration::from_secs(5), run).await??;

    let Err(RuntimeError::Interrupted { report }) = res else {
        panic!("expected interruption");
    };
    let suite_report = &report.suites[0];
    assert_eq!(suite_report.start_failures.len(), 1);
    assert_eq!(suite_report.skipped.len(), 2);
    assert!(suite.runs().is_empty());
    assert_eq!(suite.stops(), vec![("01_box".to_string(), false)]);
    Ok(())
}
