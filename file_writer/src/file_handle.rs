use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::interface::PositionedWrite;

#[cfg(unix)]
fn positioned_write(file: &File, data: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.write_at(data, offset)
}

#[cfg(windows)]
fn positioned_write(file: &File, data: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_write(data, offset)
}

/// A real file exposed through the [`PositionedWrite`] contract.
///
/// Writes go through `spawn_blocking` over the platform positioned-write
/// primitive, so no offset cursor is shared with any other handle. `release`
/// takes the file out of the slot; a second call finds it empty and does
/// nothing.
pub struct FileHandle {
    file: Mutex<Option<Arc<File>>>,
}

impl FileHandle {
    /// Open `path` with create-new + write semantics, failing if the file
    /// already exists.
    pub fn create_new(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::open(path, OpenOptions::new().create_new(true).write(true))
    }

    /// Open `path` with caller-chosen options (create, create_new, write,
    /// append, ...). Effects of the flags are the platform's.
    pub fn open(path: impl AsRef<Path>, options: &OpenOptions) -> io::Result<Self> {
        let path = path.as_ref();
        let file = options.open(path)?;
        debug!("opened {path:?} for ordered writing");
        Ok(Self::from_file(file))
    }

    /// Wrap an already-open file.
    pub fn from_file(file: File) -> Self {
        Self {
            file: Mutex::new(Some(Arc::new(file))),
        }
    }

    fn current(&self) -> io::Result<Arc<File>> {
        let guard = self.file.lock().map_err(|e| io::Error::other(format!("{e}")))?;
        guard
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "file handle already released"))
    }
}

#[async_trait]
impl PositionedWrite for FileHandle {
    async fn write_at(&self, data: Bytes, offset: u64) -> io::Result<usize> {
        let file = self.current()?;
        spawn_blocking(move || positioned_write(&file, &data, offset))
            .await
            .map_err(io::Error::other)?
    }

    async fn release(&self) -> io::Result<()> {
        let file = {
            let mut guard = self.file.lock().map_err(|e| io::Error::other(format!("{e}")))?;
            guard.take()
        };
        if let Some(file) = file {
            // Closing a file can block; keep it off the async threads. By the
            // time release runs the chain has drained, so this is the last
            // reference and dropping it closes the descriptor.
            spawn_blocking(move || drop(file)).await.map_err(io::Error::other)?;
            debug!("released file handle");
        }
        Ok(())
    }
}
