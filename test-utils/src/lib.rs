//! Scriptable in-memory storage for exercising the ordered writer without a
//! real file system: per-write completion delays, short writes, injected
//! faults, and release accounting.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use file_writer::PositionedWrite;

#[derive(Clone, Debug, Default)]
enum Outcome {
    /// Report the full payload length as written.
    #[default]
    Full,
    /// Report at most this many bytes as written (short write).
    Truncated(usize),
    /// Report an I/O fault; nothing lands in the buffer.
    Fail,
}

/// One scripted `write_at` behavior. Steps are consumed in write-issue order;
/// once the script runs out, every further write completes fully with no
/// delay.
#[derive(Clone, Debug, Default)]
pub struct WriteStep {
    delay: Option<Duration>,
    outcome: Outcome,
}

impl WriteStep {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn fail() -> Self {
        Self {
            delay: None,
            outcome: Outcome::Fail,
        }
    }

    pub fn truncated(len: usize) -> Self {
        Self {
            delay: None,
            outcome: Outcome::Truncated(len),
        }
    }

    /// Delay completion by `ms` milliseconds before applying the outcome.
    pub fn delayed_ms(self, ms: u64) -> Self {
        Self {
            delay: Some(Duration::from_millis(ms)),
            ..self
        }
    }
}

#[derive(Default)]
struct State {
    buf: Vec<u8>,
    script: VecDeque<WriteStep>,
    log: Vec<(u64, usize)>,
}

/// In-memory [`PositionedWrite`] implementation driven by a script of
/// [`WriteStep`]s.
#[derive(Default)]
pub struct ScriptedStorage {
    state: Mutex<State>,
    release_count: AtomicUsize,
    fail_release: bool,
}

impl ScriptedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: Vec<WriteStep>) -> Self {
        Self {
            state: Mutex::new(State {
                script: steps.into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Make `release` report an I/O fault (after counting the attempt).
    pub fn with_failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    /// Current buffer contents.
    pub fn value(&self) -> Vec<u8> {
        self.state.lock().unwrap().buf.clone()
    }

    /// Every completed write as `(offset, reported_len)`, in completion order.
    pub fn write_log(&self) -> Vec<(u64, usize)> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn release_count(&self) -> usize {
        self.release_count.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.release_count() > 0
    }
}

#[async_trait]
impl PositionedWrite for ScriptedStorage {
    async fn write_at(&self, data: Bytes, offset: u64) -> io::Result<usize> {
        let step = self.state.lock().unwrap().script.pop_front().unwrap_or_default();

        if let Some(delay) = step.delay {
            tokio::time::sleep(delay).await;
        }

        let reported = match step.outcome {
            Outcome::Full => data.len(),
            Outcome::Truncated(len) => len.min(data.len()),
            Outcome::Fail => return Err(io::Error::other("injected write fault")),
        };

        let mut state = self.state.lock().unwrap();
        let offset = offset as usize;
        let end = offset + reported;
        if state.buf.len() < end {
            state.buf.resize(end, 0);
        }
        state.buf[offset..end].copy_from_slice(&data[..reported]);
        state.log.push((offset as u64, reported));
        Ok(reported)
    }

    async fn release(&self) -> io::Result<()> {
        self.release_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(io::Error::other("injected release fault"));
        }
        Ok(())
    }
}
