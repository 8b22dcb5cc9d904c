use bitvec::prelude::*;

use super::cell::CellIndex;
use crate::geometry::metrics::{CHUNK_SIZE_X, CHUNK_SIZE_Z};

/// Index of a chunk within its grid; chunks are stored row-major.
pub type ChunkIndex = usize;

/// A fixed block of `CHUNK_SIZE_X * CHUNK_SIZE_Z` cells whose geometry is rebuilt together.
///
/// Chunk membership is computed once, when the map is created.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chunk {
    cells: Vec<CellIndex>,
}

impl Chunk {
    pub(crate) fn new() -> Chunk {
        Chunk {
            cells: vec![0; CHUNK_SIZE_X * CHUNK_SIZE_Z],
        }
    }

    /// Cells of this chunk, row-major within the chunk.
    pub fn cells(&self) -> &[CellIndex] {
        &self.cells
    }

    pub(crate) fn set_cell(&mut self, local_index: usize, cell: CellIndex) {
        self.cells[local_index] = cell;
    }
}

/// Find the chunk owning the cell at offset `(col, row)`, and the cell's index within it.
pub(crate) fn locate(col: usize, row: usize, chunk_count_x: usize) -> (ChunkIndex, usize) {
    let chunk_x = col / CHUNK_SIZE_X;
    let chunk_z = row / CHUNK_SIZE_Z;
    let local_x = col - chunk_x * CHUNK_SIZE_X;
    let local_z = row - chunk_z * CHUNK_SIZE_Z;
    (
        chunk_x + chunk_z * chunk_count_x,
        local_x + local_z * CHUNK_SIZE_X,
    )
}

/// Set of chunks whose geometry is out of date.
///
/// Mutations mark chunks; the renderer drains the set once per frame.
#[derive(Clone, Debug, Default)]
pub(crate) struct DirtyChunks(BitVec);

impl DirtyChunks {
    /// All `count` chunks start dirty.
    pub(crate) fn new(count: usize) -> Self {
        DirtyChunks(bitvec![1; count])
    }

    pub(crate) fn mark(&mut self, chunk: ChunkIndex) {
        self.0.set(chunk, true);
    }

    pub(crate) fn mark_all(&mut self) {
        self.0.fill(true);
    }

    pub(crate) fn is_dirty(&self, chunk: ChunkIndex) -> bool {
        self.0.get(chunk).map_or(false, |bit| *bit)
    }

    pub(crate) fn drain(&mut self) -> Vec<ChunkIndex> {
        let dirty = self.0.iter_ones().collect();
        self.0.fill(false);
        dirty
    }
}
