pub mod config;
pub mod data_structures;
pub mod geometry;
pub mod map;
pub mod persistence;

pub use geometry::{Coordinate, Direction};
pub use map::{CellIndex, HexGrid, Path, SearchContext};
