use std::fs::OpenOptions;
use std::mem::replace;
use std::path::Path;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{FileWriterError, Result};
use crate::file_handle::FileHandle;
use crate::interface::PositionedWrite;

#[cfg(windows)]
const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
const LINE_SEPARATOR: &str = "\n";

/// Future resolving to the cumulative file offset once a queued write (and
/// everything queued before it) has completed.
///
/// `Shared` lets one resolution feed two consumers: the caller that requested
/// the write, and the next link of the chain.
pub type OffsetFuture = Shared<BoxFuture<'static, Result<u64>>>;

enum ChainState {
    Open(OffsetFuture),
    Closing,
}

/// Asynchronous non-blocking write operations over a single storage resource.
///
/// Every write is chained onto the instance's tail future, so writes land in
/// call order even though each one completes out-of-band, and the offset of
/// write *k+1* is derived from the reported length of write *k*. `close()` is
/// itself asynchronous: it chains the resource release onto the tail so the
/// resource is only let go once every requested write has resolved.
///
/// All methods must be called from within a Tokio runtime: each chain link
/// runs as a spawned task, so a write makes progress even if nobody polls the
/// returned future.
pub struct AsyncFileWriter<S: PositionedWrite = FileHandle> {
    storage: Arc<S>,
    tail: Mutex<ChainState>,
}

impl AsyncFileWriter<FileHandle> {
    /// Open `path` with create-new + write semantics and wrap it in a writer
    /// starting at offset 0.
    pub fn create_new(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_storage(Arc::new(FileHandle::create_new(path)?)))
    }

    /// Open `path` with caller-chosen options. The caller is responsible for
    /// picking an initial offset consistent with the flags (e.g.
    /// [`from_storage_at`](Self::from_storage_at) with the current length
    /// when appending to pre-existing content).
    pub fn with_options(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Self> {
        Ok(Self::from_storage(Arc::new(FileHandle::open(path, options)?)))
    }
}

impl<S: PositionedWrite> AsyncFileWriter<S> {
    /// Wrap an already-acquired resource; the tail starts pre-resolved at
    /// offset 0.
    pub fn from_storage(storage: Arc<S>) -> Self {
        Self::from_storage_at(storage, 0)
    }

    /// Wrap an already-acquired resource with a caller-supplied initial
    /// offset. Callers holding their own handle to the resource must route
    /// every write through this writer; going around it breaks the offset
    /// chain.
    pub fn from_storage_at(storage: Arc<S>, offset: u64) -> Self {
        Self {
            storage,
            tail: Mutex::new(ChainState::Open(futures::future::ready(Ok(offset)).boxed().shared())),
        }
    }

    /// Queue `data` behind every previously requested write and return a
    /// future resolving to the file offset immediately after it.
    ///
    /// Never blocks; the write itself runs once the prior chain link has
    /// resolved. If an earlier link faulted, the returned future resolves to
    /// a clone of that fault without the underlying write being attempted.
    pub fn write(&self, data: impl Into<Bytes>) -> OffsetFuture {
        self.chain_write(data.into())
    }

    /// Queue `text` followed by the platform line separator.
    pub fn write_line(&self, text: impl AsRef<str>) -> OffsetFuture {
        let text = text.as_ref();
        let mut line = String::with_capacity(text.len() + LINE_SEPARATOR.len());
        line.push_str(text);
        line.push_str(LINE_SEPARATOR);
        self.chain_write(line.into())
    }

    fn chain_write(&self, data: Bytes) -> OffsetFuture {
        let mut tail = self.tail.lock().unwrap();
        let prev = match &*tail {
            ChainState::Open(prev) => prev.clone(),
            ChainState::Closing => {
                return futures::future::ready(Err(FileWriterError::Closed)).boxed().shared();
            },
        };

        let storage = self.storage.clone();
        let task = tokio::spawn(async move {
            let offset = prev.await?;
            let written = storage.write_at(data, offset).await.map_err(FileWriterError::from)?;
            Ok(offset + written as u64)
        });
        let next: OffsetFuture = async move { task.await? }.boxed().shared();

        // Replace the tail before the caller can observe the returned future,
        // so the next write chains after this one.
        *tail = ChainState::Open(next.clone());
        next
    }

    /// Schedule release of the storage resource to run once every write
    /// requested so far has resolved, success or failure alike.
    ///
    /// Returns immediately; the handle resolves once the resource has been
    /// released and may be ignored. Calling `close` again releases nothing.
    /// Writes submitted after `close` resolve to [`FileWriterError::Closed`].
    pub fn close(&self) -> JoinHandle<()> {
        let prev = {
            let mut tail = self.tail.lock().unwrap();
            match replace(&mut *tail, ChainState::Closing) {
                ChainState::Open(prev) => Some(prev),
                ChainState::Closing => None,
            }
        };

        let storage = self.storage.clone();
        tokio::spawn(async move {
            let Some(prev) = prev else {
                return;
            };
            // Drain the chain; a faulted tail still gates the release.
            let _ = prev.await;
            match storage.release().await {
                Ok(()) => debug!("storage resource released"),
                Err(e) => error!("failed to release storage resource: {e}"),
            }
        })
    }
}
