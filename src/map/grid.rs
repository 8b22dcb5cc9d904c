use std::{fmt, ops::Index};

use glam::Vec3;
use itertools::Itertools;
use log::{info, warn};

use super::{
    cell::{Cell, CellDataChange, CellIndex},
    chunk::{self, Chunk, ChunkIndex, DirtyChunks},
    unit::Unit,
};
use crate::geometry::{
    metrics::{CHUNK_SIZE_X, CHUNK_SIZE_Z},
    Coordinate, Direction, EdgeType,
};

/// A HexGrid owns every cell of a hex map.
///
/// Cells are stored row-major over offset coordinates: the cell at `(col, row)` has
/// index `col + row * width`. Odd rows are shifted half a cell to the east.
///
/// ## Entry Points
///
/// - [`HexGrid::new`] builds a map of flat, dry, featureless cells.
/// - [`HexGrid::create_map`] throws away every cell and rebuilds at a new size.
/// - [`persistence::load`](crate::persistence::load) restores a saved map.
///
/// ## Render synchronization
///
/// Edits never call into a renderer. Instead the grid accumulates the chunks whose
/// geometry is stale and the per-cell data changes an external sink must pick up;
/// drain them with [`HexGrid::drain_dirty_chunks`] and
/// [`HexGrid::drain_cell_data_changes`] once per frame.
#[derive(Clone)]
pub struct HexGrid {
    pub(crate) cells: Vec<Cell>,
    chunks: Vec<Chunk>,
    width: usize,
    height: usize,
    chunk_count_x: usize,
    pub(crate) dirty_chunks: DirtyChunks,
    pub(crate) cell_data_changes: Vec<CellDataChange>,
    pub(crate) units: Vec<Option<Unit>>,
}

impl HexGrid {
    /// Create a new map of the specified dimensions.
    ///
    /// Both dimensions must be positive multiples of the chunk size.
    pub fn new(width: usize, height: usize) -> Result<HexGrid, InvalidDimensions> {
        let mut grid = HexGrid {
            cells: Vec::new(),
            chunks: Vec::new(),
            width: 0,
            height: 0,
            chunk_count_x: 0,
            dirty_chunks: DirtyChunks::default(),
            cell_data_changes: Vec::new(),
            units: Vec::new(),
        };
        grid.create_map(width, height)?;
        Ok(grid)
    }

    /// Largest number of cells a map may hold.
    pub const MAX_CELLS: usize = 1 << 20;

    /// Check that a map of these dimensions can be built.
    pub fn validate_dimensions(width: usize, height: usize) -> Result<(), InvalidDimensions> {
        let too_large = width
            .checked_mul(height)
            .map_or(true, |cells| cells > Self::MAX_CELLS);
        if width == 0
            || width % CHUNK_SIZE_X != 0
            || height == 0
            || height % CHUNK_SIZE_Z != 0
            || too_large
        {
            return Err(InvalidDimensions {
                width: width as i64,
                height: height as i64,
            });
        }
        Ok(())
    }

    /// Discard every cell, chunk, and unit, and rebuild the map at the given size.
    ///
    /// On failure, the existing map is left untouched.
    pub fn create_map(&mut self, width: usize, height: usize) -> Result<(), InvalidDimensions> {
        if let Err(err) = Self::validate_dimensions(width, height) {
            warn!("can't create a new map: {}", err);
            return Err(err);
        }

        let chunk_count_x = width / CHUNK_SIZE_X;
        let chunk_count_z = height / CHUNK_SIZE_Z;
        let mut chunks = vec![Chunk::new(); chunk_count_x * chunk_count_z];
        let mut cells = Vec::with_capacity(width * height);

        for (row, col) in (0..height).cartesian_product(0..width) {
            let index = cells.len();
            let (chunk, local_index) = chunk::locate(col, row, chunk_count_x);
            chunks[chunk].set_cell(local_index, index);
            let coordinate = Coordinate::from_offset(col as i32, row as i32);
            cells.push(Cell::new(index, coordinate, chunk));

            if col > 0 {
                connect(&mut cells, index, Direction::W, index - 1);
            }
            if row > 0 {
                let below = index - width;
                if row % 2 == 1 {
                    connect(&mut cells, index, Direction::SW, below);
                    if col < width - 1 {
                        connect(&mut cells, index, Direction::SE, below + 1);
                    }
                } else {
                    connect(&mut cells, index, Direction::SE, below);
                    if col > 0 {
                        connect(&mut cells, index, Direction::SW, below - 1);
                    }
                }
            }
        }

        self.cell_data_changes = (0..cells.len())
            .flat_map(|cell| [CellDataChange::Terrain(cell), CellDataChange::Visibility(cell)])
            .collect();
        self.cells = cells;
        self.dirty_chunks = DirtyChunks::new(chunks.len());
        self.chunks = chunks;
        self.width = width;
        self.height = height;
        self.chunk_count_x = chunk_count_x;
        self.units.clear();

        info!("created {}x{} map", width, height);
        Ok(())
    }

    /// Number of cell columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of cell rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, index: CellIndex) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Find the cell at a coordinate.
    ///
    /// Returns `None` when the coordinate lies outside the map.
    pub fn cell_at(&self, coordinate: Coordinate) -> Option<CellIndex> {
        let (col, row) = coordinate.to_offset();
        if row < 0 || row as usize >= self.height || col < 0 || col as usize >= self.width {
            return None;
        }
        Some(col as usize + row as usize * self.width)
    }

    /// Find the cell containing a world position.
    ///
    /// Returns `None` when the position lies outside the map.
    pub fn cell_at_position(&self, position: Vec3) -> Option<CellIndex> {
        self.cell_at(Coordinate::from_position(position))
    }

    /// Find the cell at offset coordinates `(col, row)`.
    pub fn cell_at_offset(&self, col: usize, row: usize) -> Option<CellIndex> {
        (col < self.width && row < self.height).then(|| col + row * self.width)
    }

    /// The adjacent cell in `direction`; `None` at the map boundary.
    #[inline]
    pub fn neighbor(&self, cell: CellIndex, direction: Direction) -> Option<CellIndex> {
        self.cells[cell].neighbor(direction)
    }

    /// Absolute elevation difference across the edge in `direction`.
    pub fn elevation_difference(&self, cell: CellIndex, direction: Direction) -> Option<u32> {
        let neighbor = self.neighbor(cell, direction)?;
        Some(self.cells[cell].elevation.abs_diff(self.cells[neighbor].elevation))
    }

    /// Classify the edge in `direction`.
    pub fn edge_type(&self, cell: CellIndex, direction: Direction) -> Option<EdgeType> {
        let neighbor = self.neighbor(cell, direction)?;
        Some(self.edge_type_between(cell, neighbor))
    }

    /// Classify the elevation relationship between any two cells.
    pub fn edge_type_between(&self, a: CellIndex, b: CellIndex) -> EdgeType {
        EdgeType::between(self.cells[a].elevation, self.cells[b].elevation)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, chunk: ChunkIndex) -> Option<&Chunk> {
        self.chunks.get(chunk)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Mark this cell's chunk for redraw, along with any neighboring chunk sharing its edges.
    pub(crate) fn refresh(&mut self, cell: CellIndex) {
        let chunk = self.cells[cell].chunk;
        self.dirty_chunks.mark(chunk);
        for (_, neighbor) in self.cells[cell].neighbors() {
            let neighbor_chunk = self.cells[neighbor].chunk;
            if neighbor_chunk != chunk {
                self.dirty_chunks.mark(neighbor_chunk);
            }
        }
    }

    /// Mark only this cell's own chunk for redraw.
    pub(crate) fn refresh_self(&mut self, cell: CellIndex) {
        self.dirty_chunks.mark(self.cells[cell].chunk);
    }

    /// Mark every chunk for redraw.
    pub fn refresh_all(&mut self) {
        self.dirty_chunks.mark_all();
    }

    pub fn is_chunk_dirty(&self, chunk: ChunkIndex) -> bool {
        self.dirty_chunks.is_dirty(chunk)
    }

    /// Take the set of chunks which need new geometry, in ascending order.
    pub fn drain_dirty_chunks(&mut self) -> Vec<ChunkIndex> {
        self.dirty_chunks.drain()
    }

    /// Take the per-cell data changes accumulated since the last drain, in order.
    pub fn drain_cell_data_changes(&mut self) -> Vec<CellDataChange> {
        std::mem::take(&mut self.cell_data_changes)
    }
}

/// Make `a` and `b` neighbors: `b` lies in `direction` from `a`.
fn connect(cells: &mut [Cell], a: CellIndex, direction: Direction, b: CellIndex) {
    cells[a].neighbors[direction.index()] = Some(b);
    cells[b].neighbors[direction.opposite().index()] = Some(a);
}

impl Index<CellIndex> for HexGrid {
    type Output = Cell;

    fn index(&self, index: CellIndex) -> &Cell {
        &self.cells[index]
    }
}

impl fmt::Debug for HexGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HexGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("cells", &format_args!("[...; {}]", self.cells.len()))
            .field("chunks", &format_args!("[...; {}]", self.chunks.len()))
            .field("units", &self.units.iter().flatten().count())
            .finish()
    }
}

/// Map dimensions must be positive multiples of the chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error(
    "unsupported map size {width}x{height}: dimensions must be positive multiples of {}x{} \
     covering at most {} cells",
    CHUNK_SIZE_X,
    CHUNK_SIZE_Z,
    HexGrid::MAX_CELLS
)]
pub struct InvalidDimensions {
    pub width: i64,
    pub height: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_dimensions() {
        assert!(HexGrid::new(0, 15).is_err());
        assert!(HexGrid::new(20, 0).is_err());
        assert!(HexGrid::new(21, 15).is_err());
        assert_eq!(
            HexGrid::new(20, 16).unwrap_err(),
            InvalidDimensions {
                width: 20,
                height: 16
            }
        );
        // multiples of the chunk size, but too many cells
        assert!(HexGrid::validate_dimensions(5000, 5000).is_err());
        assert_eq!(usize::MAX % CHUNK_SIZE_X, 0);
        assert!(HexGrid::validate_dimensions(usize::MAX, 10).is_err());
        assert!(HexGrid::validate_dimensions(1000, 1000).is_ok());
    }

    #[test]
    fn test_failed_create_keeps_map() {
        let mut grid = HexGrid::new(10, 5).unwrap();
        assert!(grid.create_map(7, 5).is_err());
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.cell_count(), 50);
    }

    #[test]
    fn test_create_map_replaces_cells() {
        let mut grid = HexGrid::new(5, 5).unwrap();
        grid.create_map(20, 15).unwrap();
        assert_eq!(grid.cell_count(), 300);
        assert_eq!(grid.chunk_count(), 12);
        assert_eq!(grid.drain_dirty_chunks(), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_index_matches_offset() {
        let grid = HexGrid::new(10, 10).unwrap();
        for (row, col) in (0..10).cartesian_product(0..10) {
            let index = grid.cell_at_offset(col, row).unwrap();
            assert_eq!(grid[index].index(), index);
            assert_eq!(grid[index].coordinate().to_offset(), (col as i32, row as i32));
            assert_eq!(grid.cell_at(grid[index].coordinate()), Some(index));
        }
        assert_eq!(grid.cell_at_offset(10, 0), None);
    }

    #[test]
    fn test_neighbors_are_symmetric_and_geometric() {
        let grid = HexGrid::new(15, 10).unwrap();
        for cell in grid.cells() {
            for direction in Direction::iter() {
                let expected = grid.cell_at(cell.coordinate() + direction);
                assert_eq!(cell.neighbor(direction), expected);
                if let Some(neighbor) = cell.neighbor(direction) {
                    assert_eq!(grid[neighbor].neighbor(direction.opposite()), Some(cell.index()));
                }
            }
        }
    }

    #[test]
    fn test_boundary_cells_lack_neighbors() {
        let grid = HexGrid::new(5, 5).unwrap();
        let corner = grid.cell_at_offset(0, 0).unwrap();
        let present = grid[corner].neighbors().map(|(direction, _)| direction).collect::<Vec<_>>();
        assert_eq!(present, vec![Direction::NE, Direction::E]);
        let interior = grid.cell_at_offset(2, 2).unwrap();
        assert_eq!(grid[interior].neighbors().count(), 6);
    }

    #[test]
    fn test_out_of_range_lookup() {
        let grid = HexGrid::new(5, 5).unwrap();
        assert_eq!(grid.cell_at(Coordinate::new(-1, 0)), None);
        assert_eq!(grid.cell_at(Coordinate::new(0, -1)), None);
        assert_eq!(grid.cell_at(Coordinate::from_offset(5, 2)), None);
        assert_eq!(grid.cell_at(Coordinate::from_offset(2, 5)), None);
    }

    #[test]
    fn test_cell_at_position() {
        let grid = HexGrid::new(10, 10).unwrap();
        for cell in grid.cells() {
            assert_eq!(grid.cell_at_position(cell.position()), Some(cell.index()));
        }
        assert_eq!(grid.cell_at_position(Vec3::new(-100.0, 0.0, -100.0)), None);
    }

    #[test]
    fn test_chunk_assignment() {
        let grid = HexGrid::new(10, 10).unwrap();
        for (chunk_index, chunk) in grid.chunks().iter().enumerate() {
            assert_eq!(chunk.cells().len(), CHUNK_SIZE_X * CHUNK_SIZE_Z);
            for &cell in chunk.cells() {
                assert_eq!(grid[cell].chunk(), chunk_index);
            }
        }
        let total: usize = grid.chunks().iter().map(|chunk| chunk.cells().len()).sum();
        assert_eq!(total, grid.cell_count());
    }
}
