use anyhow::Result;
use diskscope::services::fs::MemoryStatSource;
use diskscope::{EngineConfig, SnapshotApi};
use tempfile::tempdir;

#[tokio::test]
async fn test_volume_usage_scenario() -> Result<()> {
    let source = MemoryStatSource::new().volume("/mnt/x", 1_000_000_000_000, 250_000_000_000);
    let api = SnapshotApi::new(source, EngineConfig::default());

    let info = api
        .get_disk_space("/mnt/x")
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;

    assert_eq!(info.used_bytes, 750_000_000_000);
    assert_eq!(info.usage_percent, 75.0);
    assert_eq!(info.used_bytes + info.free_bytes, info.total_bytes);
    Ok(())
}

#[tokio::test]
async fn test_local_volume_invariants() -> Result<()> {
    let dir = tempdir()?;
    let api = SnapshotApi::local(EngineConfig::default());

    let info = api
        .get_disk_space(dir.path())
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;
    assert_eq!(info.used_bytes + info.free_bytes, info.total_bytes);
    assert!((0.0..=100.0).contains(&info.usage_percent));

    let system = api
        .get_system_disk_space()
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;
    assert!(system.total_bytes > 0);
    assert_eq!(system.used_bytes + system.free_bytes, system.total_bytes);
    Ok(())
}

#[tokio::test]
async fn test_wire_field_names() -> Result<()> {
    let source = MemoryStatSource::new().volume("/", 2048, 1024);
    let api = SnapshotApi::new(source, EngineConfig::default());
    let info = api
        .get_disk_space("/home/user")
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;

    let json = serde_json::to_value(&info)?;
    for field in [
        "totalBytes",
        "freeBytes",
        "usedBytes",
        "totalSpaceGB",
        "freeSpaceGB",
        "usedSpaceGB",
        "usagePercent",
    ] {
        assert!(json.get(field).is_some(), "missing {field}");
    }
    assert_eq!(json["usagePercent"], 50.0);
    Ok(())
}
