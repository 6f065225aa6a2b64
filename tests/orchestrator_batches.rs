#![cfg(unix)]

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use kubefan::exec::{Orchestrator, RowCollector};

type TestResult = Result<(), Box<dyn Error>>;

fn sh() -> Orchestrator {
    Orchestrator::from_path("/bin/sh", Vec::new())
}

#[tokio::test]
async fn aggregate_keeps_last_failing_exit_code() -> TestResult {
    let ctl = sh();
    ctl.run_detached("-c", &["exit 0".to_string()])?;
    ctl.run_detached("-c", &["exit 0".to_string()])?;
    ctl.run_detached("-c", &["exit 7".to_string()])?;

    assert_eq!(ctl.join().await?, 7);
    Ok(())
}

#[tokio::test]
async fn all_successes_join_to_zero() -> TestResult {
    let ctl = sh();
    for _ in 0..3 {
        ctl.run_detached("-c", &["exit 0".to_string()])?;
    }
    assert_eq!(ctl.join().await?, 0);
    Ok(())
}

#[tokio::test]
async fn join_resets_the_aggregate() -> TestResult {
    let ctl = sh();
    ctl.run_detached("-c", &["exit 5".to_string()])?;
    assert_eq!(ctl.join().await?, 5);

    ctl.run_detached("-c", &["exit 0".to_string()])?;
    assert_eq!(ctl.join().await?, 0);
    Ok(())
}

#[tokio::test]
async fn synchronous_run_returns_and_records_the_exit_code() -> TestResult {
    let ctl = sh();
    assert_eq!(ctl.run("-c", &["exit 3".to_string()]).await?, 3);
    assert_eq!(ctl.run("-c", &["exit 0".to_string()]).await?, 0);
    // The failure above is still reflected in the aggregate.
    assert_eq!(ctl.join().await?, 3);
    Ok(())
}

#[tokio::test]
async fn fifty_detached_invocations_are_all_tracked_and_joined() -> TestResult {
    let ctl = sh();
    for _ in 0..50 {
        ctl.run_detached("-c", &["exit 0".to_string()])?;
    }
    assert_eq!(ctl.tracked_len(), 50);
    assert_eq!(ctl.join().await?, 0);
    assert_eq!(ctl.tracked_len(), 0);
    Ok(())
}

#[tokio::test]
async fn capture_returns_stdout() -> TestResult {
    let ctl = sh();
    let out = ctl.run_capture("-c", &["echo hi".to_string()]).await?;
    assert_eq!(out, "hi\n");
    Ok(())
}

#[tokio::test]
async fn capture_of_a_failing_command_is_an_error() {
    let ctl = sh();
    let result = ctl.run_capture("-c", &["exit 9".to_string()]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn prefixed_invocations_complete_through_join() -> TestResult {
    let ctl = sh();
    ctl.run_prefixed("[a] ", "-c", &["echo one; echo two".to_string()])?;
    ctl.run_prefixed("[b] ", "-c", &["echo three >&2".to_string()])?;
    assert_eq!(ctl.join().await?, 0);
    assert_eq!(ctl.tracked_len(), 0);
    Ok(())
}

#[tokio::test]
async fn tabular_invocation_streams_rows_into_the_handler() -> TestResult {
    let ctl = sh();
    let collector = Arc::new(Mutex::new(RowCollector::new()));
    let script = "printf 'NAME  READY  STATUS\\npod-1 2/2    Running\\npod-2 0/1    Pending\\n'";
    ctl.run_tabular(
        RowCollector::handler(collector.clone()),
        "-c",
        &[script.to_string()],
    )?;
    assert_eq!(ctl.join().await?, 0);

    let collector = collector.lock().unwrap();
    assert_eq!(
        collector.headers.as_deref(),
        Some(&["NAME".to_string(), "READY".to_string(), "STATUS".to_string()][..])
    );
    assert_eq!(
        collector.rows,
        vec![
            vec!["pod-1".to_string(), "2/2".to_string(), "Running".to_string()],
            vec!["pod-2".to_string(), "0/1".to_string(), "Pending".to_string()],
        ]
    );
    Ok(())
}

#[tokio::test]
async fn consumer_failure_does_not_abort_sibling_invocations() -> TestResult {
    let ctl = sh();
    // Invalid UTF-8 output fails the first child's stdout consumer.
    ctl.run_prefixed("[bad] ", "-c", &[r"printf '\377\n'".to_string()])?;
    ctl.run_detached("-c", &["sleep 2; exit 7".to_string()])?;

    let started = Instant::now();
    assert!(ctl.join().await.is_err());

    // The slow sibling was still waited on, not dropped and killed early,
    // and its exit code survives for the next join.
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(ctl.join().await?, 7);
    Ok(())
}

#[tokio::test]
async fn prefix_arguments_are_prepended_to_every_invocation() -> TestResult {
    // Here "-c" acts as the fixed prefix and the script is the subcommand.
    let ctl = Orchestrator::from_path("/bin/sh", vec!["-c".to_string()]);
    let out = ctl.run_capture("echo prefixed", &[]).await?;
    assert_eq!(out, "prefixed\n");
    Ok(())
}

#[test]
fn locating_a_missing_program_is_fatal() {
    assert!(Orchestrator::new("kubefan-test-no-such-program", Vec::new()).is_err());
    assert!(Orchestrator::new("sh", Vec::new()).is_ok());
}
