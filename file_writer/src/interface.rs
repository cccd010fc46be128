use std::io;

use async_trait::async_trait;
use bytes::Bytes;

/// Write-side contract of the underlying storage resource.
///
/// The writer serializes access: `write_at` is only ever invoked after the
/// previous call's future has resolved, so implementations never see two
/// positioned writes in flight on the same resource.
#[async_trait]
pub trait PositionedWrite: Send + Sync + 'static {
    /// Write `data` starting at byte `offset`, returning the number of bytes
    /// actually written. A short count is not an error; the writer advances
    /// the next offset by the reported count and does not retry.
    async fn write_at(&self, data: Bytes, offset: u64) -> io::Result<usize>;

    /// Release the resource. The writer calls this at most once, after every
    /// queued write has resolved (success or failure). Implementations must
    /// tolerate a redundant call.
    async fn release(&self) -> io::Result<()>;
}
