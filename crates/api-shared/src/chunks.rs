//! Splitting byte sources into [`FileChunk`]s and observing chunk streams.
//!
//! [`ChunkReader`] is used by both the client (store) and the server (fetch), so both sides emit
//! identically shaped streams: every chunk but the last carries exactly [`CHUNK_SIZE`] bytes, an
//! empty source produces no chunks at all, and `chunk_num` counts up from zero.

use crate::constants::CHUNK_SIZE;
use crate::pb::FileChunk;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads a byte source into sequentially numbered chunks.
#[derive(Debug)]
pub struct ChunkReader<R> {
    source: R,
    chunk_size: usize,
    next_num: i32,
    done: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Creates a reader emitting chunks of [`CHUNK_SIZE`] bytes.
    pub fn new(source: R) -> Self {
        Self::with_chunk_size(source, CHUNK_SIZE)
    }

    /// Creates a reader with a custom chunk size. A size of zero falls back to [`CHUNK_SIZE`].
    pub fn with_chunk_size(source: R, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 { CHUNK_SIZE } else { chunk_size };
        Self {
            source,
            chunk_size,
            next_num: 0,
            done: false,
        }
    }

    /// Reads the next chunk, or `None` once the source is exhausted.
    ///
    /// A short read from the underlying source does not end a chunk early; the buffer is filled
    /// until it is full or the source reports end of file.
    pub async fn next_chunk(&mut self) -> io::Result<Option<FileChunk>> {
        if self.done {
            return Ok(None);
        }

        let mut content = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < content.len() {
            let n = self.source.read(&mut content[filled..]).await?;
            if n == 0 {
                self.done = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        content.truncate(filled);

        let chunk_num = self.next_num;
        self.next_num = self.next_num.checked_add(1).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "chunk sequence number overflow")
        })?;

        Ok(Some(FileChunk { content, chunk_num }))
    }

    /// Number of chunks emitted so far.
    pub fn chunks_read(&self) -> i32 {
        self.next_num
    }
}

/// Running totals for a received chunk stream.
///
/// Receivers never reorder by `chunk_num`; the tally only notes when a sender broke the ordering
/// so that it shows up in logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTally {
    pub chunks: u64,
    pub bytes: u64,
    pub out_of_order: u64,
    last_num: Option<i32>,
}

impl ChunkTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `chunk`, returning `false` if its number does not follow the previous one.
    pub fn record(&mut self, chunk: &FileChunk) -> bool {
        let expected = self.last_num.map_or(0, |n| n.saturating_add(1));
        let in_order = chunk.chunk_num == expected;
        if !in_order {
            self.out_of_order += 1;
            tracing::warn!(
                "chunk {} arrived where {} was expected",
                chunk.chunk_num,
                expected
            );
        }
        self.last_num = Some(chunk.chunk_num);
        self.chunks += 1;
        self.bytes += chunk.content.len() as u64;
        in_order
    }
}
