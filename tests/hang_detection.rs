
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use testvisor::{
    Config, LogWatcher, SeekOptions, StatusFile, Subscribe, Supervisor, TaskOutcome, baskets,
};

use test_helpers::*;

fn append(path: &Path, line: &str) -> std::io::Result<()> {
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(f, "{line}")
}

fn next(timeout: Duration) -> SeekOptions<'static> {
    SeekOptions::new().timeout(timeout).from_last_match()
}

#[tokio::test]
async fn hanging_start_is_visible_in_the_run_log() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test-run.log");
    append(&path, "[01_replication] hang.test.lua ... starting")?;

    let writer_path = path.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        append(&writer_path, "[01_replication] No output during 10 seconds. Will abort after 60 seconds")?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        append(&writer_path, "[01_replication] No output during 20 seconds. Will abort after 60 seconds")?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        append(&writer_path, "[01_replication] hang.test.lua: [Instance 'replica'] Start timeout 30 was reached.")?;
        append(&writer_path, "[01_replication] hang.test.lua [ fail ]")
    });

    let mut log = LogWatcher::new(&path);
    let warning = r"No output during \d+ seconds\. Will abort after 60 seconds";
    for _ in 0..2 {
        assert!(log.seek_wait(warning, next(Duration::from_secs(5))).await?);
    }
    assert!(
        !log.seek_wait(
            r"No output during 30 seconds\. Will abort after 60 seconds",
            next(Duration::from_secs(1)),
        )
        .await?
    );
    assert!(
        log.seek_wait(
            r"\[Instance 'replica'\] Start timeout 30 was reached\.",
            next(Duration::from_secs(1)),
        )
        .await?
    );
    assert!(log.seek_wait(r"\[ fail \]", next(Duration::from_secs(1))).await?);

    writer.await??;
    Ok(())
}

#[tokio::test]
async fn status_file_reports_hang_through_the_pool() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let status_path = dir.path().join("test-run.log");
    let status = Arc::new(StatusFile::open(&status_path).await?);
    let subs: Vec<Arc<dyn Subscribe>> = vec![status];

    let suite = Arc::new(MockSuite::new(
        "replication",
        &[(
            "hang.test.lua",
            Behavior::StartHangingReplica(Duration::from_millis(500)),
        )],
    ));
    let cfg = Config {
        no_output_timeout: Duration::from_secs(2),
        no_output_warn_period: Duration::from_millis(200),
        ..config(dir.path(), 1)
    };

    let mut log = LogWatcher::new(&status_path);
    log.positioning().await?;

    let report = Supervisor::new(cfg, subs)
        .run(baskets(vec![suite]))
        .await?;
    assert_eq!(
        report.suites[0].records[0].outcome,
        TaskOutcome::Failed("[Instance 'replica'] Start timeout 0.5 was reached.".into())
    );

    let warning = r"\[01_replication\] No output during [\d.]+ seconds\. Will abort after 2 seconds";
    for _ in 0..2 {
        assert!(log.seek_wait(warning, next(Duration::from_secs(1))).await?);
    }
    assert!(
        !log.seek_wait(
            r"No output during 0\.6 seconds",
            next(Duration::from_millis(300)),
        )
        .await?
    );
    assert!(
        log.seek_wait(
            r"hang\.test\.lua: \[Instance 'replica'\] Start timeout 0\.5 was reached\.",
            next(Duration::from_secs(1)),
        )
        .await?
    );
    assert!(
        log.seek_wait(
            r"\[01_replication\] hang\.test\.lua \[ fail \]",
            next(Duration::from_secs(1)),
        )
        .await?
    );
    Ok(())
}
