//! Byte sources the demuxer pulls transport packets from.
//!
//! The demuxer never performs I/O itself. It asks a [`DataReader`] for 188
//! bytes at a monotonically increasing offset; a read of zero bytes means the
//! source is exhausted.

use crate::error::{DemuxError, Result};
use bytes::Bytes;
use std::io::{ErrorKind, Read};

/// Random or sequential access to the bytes of a transport stream.
pub trait DataReader {
    /// Copies up to `dst.len()` bytes starting at `offset` into `dst` and
    /// returns how many were copied. Zero signals end of data.
    fn read_data(&mut self, dst: &mut [u8], offset: u64) -> Result<usize>;

    /// Total size of the source, if known.
    fn total_size(&self) -> Option<u64>;

    fn has_reached_eof(&self) -> bool;
}

/// In-memory source. Also backs the init segment of a session.
#[derive(Debug, Clone, Default)]
pub struct SliceReader {
    data: Bytes,
    position: u64,
}

impl SliceReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl DataReader for SliceReader {
    fn read_data(&mut self, dst: &mut [u8], offset: u64) -> Result<usize> {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        let count = dst.len().min(self.data.len() - start);
        dst[..count].copy_from_slice(&self.data[start..start + count]);
        self.position = (start + count) as u64;
        Ok(count)
    }

    fn total_size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn has_reached_eof(&self) -> bool {
        self.position >= self.data.len() as u64
    }
}

/// Adapts any [`std::io::Read`] (file, pipe, socket) as a sequential source.
///
/// Offsets must follow on from the previous read; seeking is not supported.
#[derive(Debug)]
pub struct ReadAdapter<R: Read> {
    inner: R,
    position: u64,
    total_size: Option<u64>,
    eof: bool,
}

impl<R: Read> ReadAdapter<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            total_size: None,
            eof: false,
        }
    }

    /// Announces the size of the underlying stream, e.g. from file metadata.
    pub fn with_total_size(mut self, total_size: u64) -> Self {
        self.total_size = Some(total_size);
        self
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> DataReader for ReadAdapter<R> {
    fn read_data(&mut self, dst: &mut [u8], offset: u64) -> Result<usize> {
        if offset != self.position {
            return Err(DemuxError::ReadError(format!(
                "sequential source is at offset {}, cannot read from {}",
                self.position, offset
            )));
        }
        // Fill the whole request unless the stream ends, so that a short
        // count really means end of data.
        let mut filled = 0;
        while filled < dst.len() {
            match self.inner.read(&mut dst[filled..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    fn has_reached_eof(&self) -> bool {
        self.eof
    }
}
