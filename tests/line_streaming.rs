use std::error::Error;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use kubefan::exec::{prefix_lines, spawn_line_proxy};

type TestResult = Result<(), Box<dyn Error>>;

fn sink() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) + Send + 'static) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let captured = lines.clone();
    let forward = move |line: &str| captured.lock().unwrap().push(line.to_string());
    (lines, forward)
}

#[tokio::test]
async fn lines_are_delivered_in_order() -> TestResult {
    let (lines, forward) = sink();
    let handle = spawn_line_proxy(Cursor::new(b"a\nb\nc\n".to_vec()), forward);
    handle.await??;

    assert_eq!(*lines.lock().unwrap(), vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn trailing_partial_line_is_flushed() -> TestResult {
    let (lines, forward) = sink();
    let handle = spawn_line_proxy(Cursor::new(b"a\nb".to_vec()), forward);
    handle.await??;

    assert_eq!(*lines.lock().unwrap(), vec!["a", "b"]);
    Ok(())
}

#[tokio::test]
async fn empty_stream_delivers_nothing() -> TestResult {
    let (lines, forward) = sink();
    let handle = spawn_line_proxy(Cursor::new(Vec::new()), forward);
    handle.await??;

    assert!(lines.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn prefixed_lines_preserve_order_and_content() -> TestResult {
    let (lines, forward) = sink();
    let handle = spawn_line_proxy(
        Cursor::new(b"a\nb\n".to_vec()),
        prefix_lines("[x] ", forward),
    );
    handle.await??;

    assert_eq!(*lines.lock().unwrap(), vec!["[x] a", "[x] b"]);
    Ok(())
}
