//! Fixed-size chunking.
//!
//! A file is read sequentially in windows of exactly `block_size` bytes; only
//! the final block may be shorter. An empty input produces no blocks at all,
//! so an empty file is described by an empty hash list.

use std::io::{self, Read};

use crate::error::{CoreError, Result};
use crate::hash::BlockHash;
use crate::types::Block;

/// Iterator over the blocks of a reader.
pub struct Chunker<R> {
    reader: R,
    block_size: usize,
    done: bool,
}

impl<R: Read> Chunker<R> {
    /// Create a chunker. `block_size` must be non-zero.
    pub fn new(reader: R, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(CoreError::InvalidBlockSize);
        }
        Ok(Self {
            reader,
            block_size,
            done: false,
        })
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = io::Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // `take` keeps reading through short reads until the window is full.
        let mut buf = Vec::with_capacity(self.block_size);
        match self
            .reader
            .by_ref()
            .take(self.block_size as u64)
            .read_to_end(&mut buf)
        {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                if n < self.block_size {
                    self.done = true;
                }
                Some(Ok(Block::new(buf)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Read all blocks from `reader`.
pub fn chunk_reader<R: Read>(reader: R, block_size: usize) -> io::Result<Vec<Block>> {
    Chunker::new(reader, block_size)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        .collect()
}

/// Split an in-memory buffer into blocks.
pub fn chunk_bytes(data: &[u8], block_size: usize) -> Result<Vec<Block>> {
    if block_size == 0 {
        return Err(CoreError::InvalidBlockSize);
    }
    Ok(data
        .chunks(block_size)
        .map(|chunk| Block::new(chunk.to_vec()))
        .collect())
}

/// Hashes of `blocks`, in order.
pub fn hash_list(blocks: &[Block]) -> Vec<BlockHash> {
    blocks.iter().map(Block::hash).collect()
}

/// Concatenate blocks back into file content.
pub fn reassemble<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Vec<u8> {
    let mut out = Vec::new();
    for block in blocks {
        out.extend_from_slice(block.as_bytes());
    }
    out
}
