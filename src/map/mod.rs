//! The cell graph: cells, chunks, units, and the searches which run over them.
//!
//! ## Entry Points
//!
//! - [`HexGrid`] owns every cell; all edits go through it.
//! - [`SearchContext`] runs pathfinding and visibility searches over a grid.
//! - [`terrain_move_cost`] is the standard movement rule for [`SearchContext::find_path`].

mod cell;
mod chunk;
mod editing;
mod grid;
mod movement;
mod search;
mod unit;

pub use cell::{Cell, CellDataChange, CellIndex, RoadFlags, MAX_FEATURE_LEVEL};
pub use chunk::{Chunk, ChunkIndex};
pub use grid::{HexGrid, InvalidDimensions};
pub use movement::{
    terrain_move_cost, DEFAULT_SPEED, FLAT_MOVE_COST, ROAD_MOVE_COST, SLOPE_MOVE_COST,
};
pub use search::{Path, SearchContext};
pub use unit::{Unit, UnitId};

pub use crate::geometry::EdgeType;
