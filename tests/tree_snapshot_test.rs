use anyhow::Result;
use diskscope::core::telemetry::init_logging;
use diskscope::{CancelFlag, EngineConfig, FileSystemNode, SnapshotApi};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use walkdir::WalkDir;

fn local_api() -> SnapshotApi {
    init_logging("diskscope=debug");
    SnapshotApi::local(EngineConfig::default().with_workers(4))
}

fn write_bytes(path: &Path, len: usize) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, vec![b'x'; len])?;
    Ok(())
}

fn assert_consistent(node: &FileSystemNode) {
    for node in node.walk() {
        if !node.item.is_directory {
            assert!(node.item.is_leaf, "file {} must be a leaf", node.item.path);
        }
        if node.expanded && !node.incomplete {
            let sum: u64 = node.children.iter().map(|c| c.item.size).sum();
            assert_eq!(node.item.size, sum, "size mismatch at {}", node.item.path);
        }
    }
}

#[tokio::test]
async fn test_data_scenario_sizes() -> Result<()> {
    let root = tempdir()?;
    let data = root.path().join("data");
    write_bytes(&data.join("a.txt"), 100)?;
    write_bytes(&data.join("b").join("c.txt"), 50)?;

    let snapshot = local_api()
        .get_tree(&data, 2, CancelFlag::new())
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;

    assert!(!snapshot.incomplete);
    assert_eq!(snapshot.root.item.size, 150);
    let b = snapshot.root.find("b").expect("b is listed");
    assert_eq!(b.item.size, 50);
    assert!(b.expanded);
    assert_eq!(b.find("c.txt").expect("c.txt is listed").item.size, 50);
    assert_consistent(&snapshot.root);
    Ok(())
}

#[tokio::test]
async fn test_shallow_scan_matches_full_walk() -> Result<()> {
    let root = tempdir()?;
    for (i, dir) in ["src", "src/a", "src/a/b", "docs", "docs/img/raw"].iter().enumerate() {
        for j in 0..3 {
            write_bytes(&root.path().join(dir).join(format!("f{j}.bin")), (i + 1) * 97 + j)?;
        }
    }
    fs::create_dir_all(root.path().join("empty"))?;

    let expected: u64 = WalkDir::new(root.path())
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.metadata().map(|m| m.len()).unwrap_or(0))
        .sum();

    let api = local_api();
    for depth in [0, 1, 3] {
        let snapshot = api
            .get_tree(root.path(), depth, CancelFlag::new())
            .await
            .map_err(|e| anyhow::anyhow!(e.message))?;
        assert_eq!(snapshot.root.item.size, expected, "depth {depth}");
        assert_consistent(&snapshot.root);
    }

    let shallow = api
        .get_tree(root.path(), 1, CancelFlag::new())
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;
    let src = shallow.root.find("src").expect("src is listed");
    assert!(!src.expanded);
    assert!(!src.item.is_leaf);
    assert!(src.children.is_empty());
    assert!(shallow.root.find("empty").expect("empty is listed").item.is_leaf);
    Ok(())
}

#[tokio::test]
async fn test_keys_are_unique_absolute_paths() -> Result<()> {
    let root = tempdir()?;
    write_bytes(&root.path().join("x/same.txt"), 1)?;
    write_bytes(&root.path().join("y/same.txt"), 2)?;

    let snapshot = local_api()
        .get_tree(root.path(), 5, CancelFlag::new())
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;

    let nodes = snapshot.root.walk();
    let mut keys: Vec<&str> = nodes.iter().map(|n| n.item.key.as_str()).collect();
    let total = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), total);
    assert!(nodes.iter().all(|n| Path::new(&n.item.key).is_absolute()));
    assert!(nodes.iter().all(|n| n.item.key == n.item.path && n.item.label == n.item.name));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_cycle_is_not_followed() -> Result<()> {
    let root = tempdir()?;
    write_bytes(&root.path().join("inner/file.bin"), 10)?;
    std::os::unix::fs::symlink(root.path(), root.path().join("inner/back"))?;

    let snapshot = local_api()
        .get_tree(root.path(), usize::MAX, CancelFlag::new())
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;

    let inner = snapshot.root.find("inner").expect("inner is listed");
    let back = inner.find("back").expect("link is listed");
    assert!(!back.item.is_directory);
    assert!(back.item.is_leaf);
    assert!(back.children.is_empty());
    assert!(!snapshot.incomplete);
    assert_consistent(&snapshot.root);
    Ok(())
}

#[tokio::test]
async fn test_missing_root_is_not_found() -> Result<()> {
    let root = tempdir()?;
    let err = local_api()
        .get_tree(root.path().join("missing"), 1, CancelFlag::new())
        .await
        .expect_err("missing root must fail");
    assert_eq!(err.kind, diskscope::ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_wire_shape() -> Result<()> {
    let root = tempdir()?;
    write_bytes(&root.path().join("a.txt"), 4)?;

    let snapshot = local_api()
        .get_tree(root.path(), 1, CancelFlag::new())
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;
    let json = serde_json::to_value(&snapshot)?;

    let child = &json["root"]["children"][0];
    assert_eq!(child["name"], "a.txt");
    assert_eq!(child["isDirectory"], false);
    assert_eq!(child["isLeaf"], true);
    assert_eq!(child["size"], 4);
    assert!(child["modified"].as_i64().unwrap_or(0) > 1_000_000_000_000);
    assert_eq!(json["incomplete"], false);
    Ok(())
}
