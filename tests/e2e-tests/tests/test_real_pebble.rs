//! Local and container backends must agree on results and error kinds.
//!
//! Needs a running Pebble; skipped unless `RUN_REAL_PEBBLE_TESTS=1`.
//! Run under the fixture, e.g.
//!   pebble-fixture -- cargo test -p e2e-tests --test test_real_pebble
//!
//! Pebble is expected to run on this host, so container paths and host
//! paths name the same files.

use fileops::{
    ContainerFileOps, FileInfo, FileOperations, ListOptions, LocalFileOps, MakeDirOptions,
    PushOptions,
};
use std::path::Path;

fn real_pebble_enabled() -> bool {
    if std::env::var("RUN_REAL_PEBBLE_TESTS").as_deref() == Ok("1") {
        true
    } else {
        println!("Skipping: RUN_REAL_PEBBLE_TESTS is not set to 1");
        false
    }
}

fn backends() -> Vec<Box<dyn FileOperations>> {
    vec![
        Box::new(LocalFileOps::new()),
        Box::new(ContainerFileOps::from_env("pebble").expect("PEBBLE or PEBBLE_SOCKET must be set")),
    ]
}

fn root_for(base: &Path, ops: &dyn FileOperations) -> String {
    base.join(ops.name()).to_string_lossy().into_owned()
}

/// Everything but path and modification time.
fn summary(info: &FileInfo) -> (String, String, Option<u64>, u32, Option<String>, Option<String>) {
    (
        info.name.clone(),
        info.file_type.to_string(),
        info.size,
        info.permissions,
        info.user.clone(),
        info.group.clone(),
    )
}

#[tokio::test]
async fn test_listing_parity() {
    if !real_pebble_enabled() {
        return;
    }
    let base = tempfile::tempdir().unwrap();
    let mut listings = Vec::new();

    for ops in backends() {
        let root = root_for(base.path(), ops.as_ref());
        ops.make_dir(&format!("{}/sub/deeper", root), &MakeDirOptions::new().make_parents(true))
            .await
            .unwrap();
        ops.push(
            &format!("{}/secret.txt", root),
            b"hush",
            &PushOptions::new().with_permissions(0o600),
        )
        .await
        .unwrap();
        ops.push(&format!("{}/sub/a.txt", root), b"a", &PushOptions::new())
            .await
            .unwrap();

        let mut listing: Vec<_> = ops
            .list_files(&root, &ListOptions::new())
            .await
            .unwrap()
            .iter()
            .map(summary)
            .collect();
        listing.sort();
        let matched = ops
            .list_files(&format!("{}/sub", root), &ListOptions::new().with_pattern("*.txt"))
            .await
            .unwrap();
        let itself = ops
            .list_files(&root, &ListOptions::new().itself())
            .await
            .unwrap();

        assert_eq!(matched.len(), 1, "{}", ops.name());
        assert_eq!(itself.len(), 1, "{}", ops.name());
        assert_eq!(ops.pull_text(&format!("{}/secret.txt", root)).await.unwrap(), "hush");
        listings.push(listing);
    }

    assert_eq!(listings[0], listings[1]);
}

#[tokio::test]
async fn test_pattern_parity() {
    if !real_pebble_enabled() {
        return;
    }
    let base = tempfile::tempdir().unwrap();
    let names = ["abc", "abd", "a-b", "a!b", "a]b", "x.txt", ".hidden.txt", "aaab", "a*b"];
    let patterns = [
        "*", "a*", "*b*", "a?b", "*a*a*b", "[ab]b?", "a[^b]?", "a[\\!\\-]b", "a[\\]]b",
        "a\\*b", "*.txt", "[a-c]*", "[^a]*",
    ];
    let mut results = Vec::new();

    for ops in backends() {
        let root = root_for(base.path(), ops.as_ref());
        ops.make_dir(&root, &MakeDirOptions::new()).await.unwrap();
        for name in names {
            ops.push(&format!("{}/{}", root, name), b"", &PushOptions::new())
                .await
                .unwrap();
        }

        let mut per_backend = Vec::new();
        for pattern in patterns {
            let mut matched: Vec<String> = ops
                .list_files(&root, &ListOptions::new().with_pattern(pattern))
                .await
                .unwrap()
                .into_iter()
                .map(|info| info.name)
                .collect();
            matched.sort();
            per_backend.push((pattern, matched));
        }
        for bad in ["[]a]", "[-x]", "a\\"] {
            let err = ops
                .list_files(&root, &ListOptions::new().with_pattern(bad))
                .await
                .unwrap_err();
            assert!(err.is_bad_request(), "{} {:?}: {}", ops.name(), bad, err);
        }
        results.push(per_backend);
    }

    assert_eq!(results[0], results[1]);
}

#[tokio::test]
async fn test_error_kind_parity() {
    if !real_pebble_enabled() {
        return;
    }
    let base = tempfile::tempdir().unwrap();

    for ops in backends() {
        let root = root_for(base.path(), ops.as_ref());
        let name = ops.name().to_string();
        ops.make_dir(&root, &MakeDirOptions::new()).await.unwrap();
        ops.push(&format!("{}/file", root), b"x", &PushOptions::new())
            .await
            .unwrap();

        let err = ops.pull(&format!("{}/missing", root)).await.unwrap_err();
        assert!(err.is_path_not_found(), "{}: {}", name, err);

        let err = ops.make_dir(&root, &MakeDirOptions::new()).await.unwrap_err();
        assert!(err.is_file_exists(), "{}: {}", name, err);

        let err = ops
            .list_files(&format!("{}/missing", root), &ListOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_api_not_found(), "{}: {}", name, err);

        let err = ops
            .list_files(&root, &ListOptions::new().with_pattern("["))
            .await
            .unwrap_err();
        assert!(err.is_bad_request(), "{}: {}", name, err);

        let err = ops.remove_path(&root, false).await.unwrap_err();
        assert!(err.is_generic(), "{}: {}", name, err);

        let err = ops.pull("relative/path").await.unwrap_err();
        assert!(err.is_relative_path(), "{}: {}", name, err);

        ops.remove_path(&root, true).await.unwrap();
        assert!(!ops.exists(&root).await.unwrap());
    }
}

#[tokio::test]
async fn test_push_and_pull_trees() {
    if !real_pebble_enabled() {
        return;
    }
    let base = tempfile::tempdir().unwrap();
    let source = base.path().join("source");
    std::fs::create_dir_all(source.join("nested")).unwrap();
    std::fs::write(source.join("top.txt"), "top").unwrap();
    std::fs::write(source.join("nested").join("inner.txt"), "inner").unwrap();

    let container = ContainerFileOps::from_env("pebble").unwrap();
    let remote = base.path().join("remote").to_string_lossy().into_owned();
    container.push_path(&[source.clone()], &remote).await.unwrap();
    assert_eq!(
        container.pull_text(&format!("{}/source/nested/inner.txt", remote)).await.unwrap(),
        "inner"
    );

    let pulled = base.path().join("pulled");
    container
        .pull_path(&[format!("{}/source", remote)], &pulled)
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(pulled.join("source").join("top.txt")).unwrap(), "top");
    assert_eq!(
        std::fs::read_to_string(pulled.join("source").join("nested").join("inner.txt")).unwrap(),
        "inner"
    );
}
