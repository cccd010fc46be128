use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Duration;

use file_writer::{AsyncFileWriter, FileWriterError};
use test_utils::{ScriptedStorage, WriteStep};

/// `close()` scheduled while a write is still in flight must not release the
/// resource until that write (and everything chained after it) resolves.
#[tokio::test]
async fn test_close_waits_for_pending_writes() {
    let storage = Arc::new(ScriptedStorage::with_steps(vec![WriteStep::full().delayed_ms(100)]));
    let writer = AsyncFileWriter::from_storage(storage.clone());

    let pending = writer.write(&b"slow payload"[..]);
    let closed = writer.close();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!storage.released(), "resource released before the pending write resolved");

    closed.await.unwrap();
    assert!(storage.released());
    assert_eq!(pending.await.unwrap(), 12);
    assert_eq!(storage.value(), b"slow payload");
}

/// A fault on write k leaves writes 1..k-1 intact, fails k..end without
/// attempting them, and still releases the resource exactly once.
#[tokio::test]
async fn test_fault_poisons_tail_but_prefix_stands() {
    let storage = Arc::new(ScriptedStorage::with_steps(vec![WriteStep::full(), WriteStep::fail()]));
    let writer = AsyncFileWriter::from_storage(storage.clone());

    assert_eq!(writer.write(&b"intact"[..]).await.unwrap(), 6);
    let faulted = writer.write(&b"lost"[..]);
    let queued_after = writer.write(&b"also lost"[..]);

    let fault = faulted.await.unwrap_err();
    assert!(matches!(&fault, FileWriterError::Io(_)));
    // The poisoned tail propagates a clone of the same fault; the underlying
    // write is never attempted for it.
    assert_eq!(queued_after.await.unwrap_err(), fault);
    assert_eq!(storage.write_log().len(), 1);
    assert_eq!(storage.value(), b"intact");

    writer.close().await.unwrap();
    assert_eq!(storage.release_count(), 1);
}

#[tokio::test]
async fn test_round_trip_lines() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lines.txt");

    let writer = AsyncFileWriter::create_new(&path)?;
    let _ = writer.write_line("alpha");
    let _ = writer.write_line("beta");
    let tail = writer.write_line("gamma");
    writer.close().await?;
    tail.await?;

    let contents = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines, vec!["alpha", "beta", "gamma"]);
    Ok(())
}

#[tokio::test]
async fn test_open_options_pass_through() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("opts.bin");

    let writer = AsyncFileWriter::with_options(&path, OpenOptions::new().create(true).write(true))?;
    writer.write(&b"hello"[..]).await?;
    writer.close().await?;

    assert_eq!(std::fs::read(&path)?, b"hello");

    // Reopening with create-if-absent succeeds where create-new would not.
    let writer = AsyncFileWriter::with_options(&path, OpenOptions::new().create(true).write(true))?;
    writer.close().await?;
    assert!(AsyncFileWriter::create_new(&path).is_err());
    Ok(())
}
