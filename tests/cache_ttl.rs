use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use serde_json::{Value, json};
use tempfile::tempdir;

use kubefan::cache::TtlCache;

type TestResult = Result<(), Box<dyn Error>>;

const TTL: Duration = Duration::from_secs(300);

type BoxedRetrieval = std::pin::Pin<Box<dyn Future<Output = anyhow::Result<Value>>>>;

/// Retriever that counts how often it is actually invoked.
fn counting_retriever(calls: &Arc<AtomicUsize>) -> impl FnOnce() -> BoxedRetrieval {
    let calls = calls.clone();
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(json!({"fetched": true})) })
    }
}

fn backdate(path: &Path, by: Duration) -> TestResult {
    let file = fs::OpenOptions::new().write(true).open(path)?;
    file.set_modified(SystemTime::now() - by)?;
    Ok(())
}

#[tokio::test]
async fn second_get_within_ttl_does_not_invoke_the_retriever() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("pods.json");
    let calls = Arc::new(AtomicUsize::new(0));

    let mut cache: TtlCache<Value> = TtlCache::new(&path, TTL);
    cache.get(counting_retriever(&calls)).await?;
    cache.get(counting_retriever(&calls)).await?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn fresh_file_is_loaded_instead_of_retrieved() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("pods.json");
    fs::write(&path, r#"{"from_disk": 1}"#)?;

    let calls = Arc::new(AtomicUsize::new(0));
    let mut cache: TtlCache<Value> = TtlCache::new(&path, TTL);
    let value = cache.get(counting_retriever(&calls)).await?.clone();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(value, json!({"from_disk": 1}));
    Ok(())
}

#[tokio::test]
async fn expired_mtime_forces_exactly_one_retrieval_and_a_rewrite() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("pods.json");
    fs::write(&path, r#"{"stale": true}"#)?;
    backdate(&path, TTL + Duration::from_secs(1))?;

    let calls = Arc::new(AtomicUsize::new(0));
    let mut cache: TtlCache<Value> = TtlCache::new(&path, TTL);
    let value = cache.get(counting_retriever(&calls)).await?.clone();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(value, json!({"fetched": true}));
    // The file was rewritten with the fresh value.
    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(on_disk, json!({"fetched": true}));

    // And the rewritten file is fresh again for a second get.
    cache.get(counting_retriever(&calls)).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn missing_and_empty_files_are_unconditionally_stale() -> TestResult {
    let dir = tempdir()?;

    let missing = dir.path().join("missing.json");
    let calls = Arc::new(AtomicUsize::new(0));
    let mut cache: TtlCache<Value> = TtlCache::new(&missing, TTL);
    cache.get(counting_retriever(&calls)).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let empty = dir.path().join("empty.json");
    fs::write(&empty, "")?;
    let mut cache: TtlCache<Value> = TtlCache::new(&empty, TTL);
    cache.get(counting_retriever(&calls)).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn parent_directories_are_created_on_refresh() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("nested").join("deeper").join("pods.json");

    let calls = Arc::new(AtomicUsize::new(0));
    let mut cache: TtlCache<Value> = TtlCache::new(&path, TTL);
    cache.get(counting_retriever(&calls)).await?;

    assert!(path.is_file());
    Ok(())
}

#[tokio::test]
async fn malformed_json_on_disk_is_a_fatal_parse_error() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("pods.json");
    fs::write(&path, "not json at all")?;

    let calls = Arc::new(AtomicUsize::new(0));
    let mut cache: TtlCache<Value> = TtlCache::new(&path, TTL);
    let result = cache.get(counting_retriever(&calls)).await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}
