#![cfg_attr(feature = "strict", deny(warnings))]

pub mod error;
mod file_handle;
mod interface;
mod writer;

pub use error::{FileWriterError, Result};
pub use file_handle::FileHandle;
pub use interface::PositionedWrite;
pub use writer::{AsyncFileWriter, OffsetFuture};
