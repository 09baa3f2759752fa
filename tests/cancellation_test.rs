use anyhow::Result;
use diskscope::services::fs::MemoryStatSource;
use diskscope::{CancelFlag, EngineConfig, SnapshotApi};
use std::thread;
use std::time::{Duration, Instant};

/// 40 top-level directories of 40 subdirectories each, every listing taking 5ms.
fn slow_wide_tree() -> MemoryStatSource {
    let mut source = MemoryStatSource::new().with_latency(Duration::from_millis(5));
    for i in 0..40 {
        for j in 0..40 {
            source = source.file(format!("/big/d{i}/s{j}/payload.bin"), 1_000);
        }
    }
    source
}

fn api(source: MemoryStatSource) -> SnapshotApi<MemoryStatSource> {
    SnapshotApi::new(source, EngineConfig::default().with_workers(2))
}

#[tokio::test]
async fn test_cancel_mid_scan_returns_partial_tree() -> Result<()> {
    let api = api(slow_wide_tree());
    let cancel = CancelFlag::new();

    let trigger = cancel.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        trigger.cancel();
    });

    let started = Instant::now();
    let snapshot = api
        .get_tree("/big", 1, cancel)
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;
    let elapsed = started.elapsed();

    // A full run needs well over four seconds at this latency.
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    assert!(snapshot.incomplete);
    assert!(snapshot.root.incomplete);
    let warning = snapshot.warning.expect("cancelled snapshot carries a warning");
    assert!(warning.cancelled);
    assert!(snapshot.root.item.size < 1_600_000);
    Ok(())
}

#[tokio::test]
async fn test_already_cancelled_request_still_answers() -> Result<()> {
    let api = api(MemoryStatSource::new().file("/small/a/b.txt", 5));
    let cancel = CancelFlag::new();
    cancel.cancel();

    let snapshot = api
        .get_tree("/small", 3, cancel)
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;

    assert!(snapshot.incomplete);
    assert_eq!(snapshot.root.item.name, "small");
    Ok(())
}

#[tokio::test]
async fn test_uncancelled_small_tree_completes() -> Result<()> {
    let source = MemoryStatSource::new()
        .with_latency(Duration::from_millis(1))
        .file("/t/a/1", 1)
        .file("/t/b/2", 2)
        .file("/t/c/d/3", 3);
    let snapshot = api(source)
        .get_tree("/t", 1, CancelFlag::new())
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;

    assert!(!snapshot.incomplete);
    assert_eq!(snapshot.root.item.size, 6);
    Ok(())
}
