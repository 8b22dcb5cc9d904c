use bitvec::prelude::*;
use glam::Vec3;

use super::{chunk::ChunkIndex, unit::UnitId};
use crate::geometry::{metrics::ELEVATION_STEP, Coordinate, Direction};

/// Index of a cell within its grid; cells are stored row-major over offset coordinates.
pub type CellIndex = usize;

/// One flag per edge, indexed by [`Direction::index`].
pub type RoadFlags = BitArray<[u8; 1], Lsb0>;

/// Highest urban, farm, or plant density level.
pub const MAX_FEATURE_LEVEL: u8 = 3;

/// A single hex tile.
///
/// Cells are owned by a [`HexGrid`](super::HexGrid) and refer to each other only by
/// [`CellIndex`]. All mutation goes through the grid, which keeps neighboring cells
/// consistent and records what needs redrawing.
#[derive(Clone, Debug)]
pub struct Cell {
    pub(crate) index: CellIndex,
    pub(crate) coordinate: Coordinate,
    pub(crate) chunk: ChunkIndex,
    pub(crate) neighbors: [Option<CellIndex>; 6],

    pub(crate) terrain_type: u8,
    pub(crate) elevation: i32,
    pub(crate) water_level: i32,
    pub(crate) urban_level: u8,
    pub(crate) farm_level: u8,
    pub(crate) plant_level: u8,
    pub(crate) special_index: u8,
    pub(crate) walled: bool,

    pub(crate) incoming_river: Option<Direction>,
    pub(crate) outgoing_river: Option<Direction>,
    pub(crate) roads: RoadFlags,

    pub(crate) visibility: u32,
    pub(crate) explored: bool,
    pub(crate) unit: Option<UnitId>,
}

impl Cell {
    pub(crate) fn new(index: CellIndex, coordinate: Coordinate, chunk: ChunkIndex) -> Cell {
        Cell {
            index,
            coordinate,
            chunk,
            neighbors: [None; 6],
            terrain_type: 0,
            elevation: 0,
            water_level: 0,
            urban_level: 0,
            farm_level: 0,
            plant_level: 0,
            special_index: 0,
            walled: false,
            incoming_river: None,
            outgoing_river: None,
            roads: BitArray::new([0]),
            visibility: 0,
            explored: false,
            unit: None,
        }
    }

    #[inline]
    pub fn index(&self) -> CellIndex {
        self.index
    }

    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// The render chunk this cell belongs to.
    #[inline]
    pub fn chunk(&self) -> ChunkIndex {
        self.chunk
    }

    /// The adjacent cell in `direction`; `None` at the map boundary.
    #[inline]
    pub fn neighbor(&self, direction: Direction) -> Option<CellIndex> {
        self.neighbors[direction.index()]
    }

    /// Iterate over `(direction, neighbor)` for every neighbor which exists.
    pub fn neighbors(&self) -> impl '_ + Iterator<Item = (Direction, CellIndex)> {
        Direction::iter().filter_map(move |direction| {
            self.neighbor(direction)
                .map(|neighbor| (direction, neighbor))
        })
    }

    pub fn terrain_type(&self) -> u8 {
        self.terrain_type
    }

    pub fn elevation(&self) -> i32 {
        self.elevation
    }

    pub fn water_level(&self) -> i32 {
        self.water_level
    }

    /// A cell is underwater when its water level is above its elevation.
    pub fn is_underwater(&self) -> bool {
        self.water_level > self.elevation
    }

    /// Height from which this cell sees, and at which it can be seen.
    pub fn view_elevation(&self) -> i32 {
        self.elevation.max(self.water_level)
    }

    pub fn urban_level(&self) -> u8 {
        self.urban_level
    }

    pub fn farm_level(&self) -> u8 {
        self.farm_level
    }

    pub fn plant_level(&self) -> u8 {
        self.plant_level
    }

    pub fn special_index(&self) -> u8 {
        self.special_index
    }

    pub fn is_special(&self) -> bool {
        self.special_index > 0
    }

    pub fn walled(&self) -> bool {
        self.walled
    }

    pub fn incoming_river(&self) -> Option<Direction> {
        self.incoming_river
    }

    pub fn outgoing_river(&self) -> Option<Direction> {
        self.outgoing_river
    }

    pub fn has_incoming_river(&self) -> bool {
        self.incoming_river.is_some()
    }

    pub fn has_outgoing_river(&self) -> bool {
        self.outgoing_river.is_some()
    }

    pub fn has_river(&self) -> bool {
        self.has_incoming_river() || self.has_outgoing_river()
    }

    /// `true` when a river starts or ends in this cell.
    pub fn has_river_begin_or_end(&self) -> bool {
        self.has_incoming_river() != self.has_outgoing_river()
    }

    /// Direction of the river edge of a cell where a river starts or ends.
    pub fn river_begin_or_end_direction(&self) -> Option<Direction> {
        self.incoming_river.or(self.outgoing_river)
    }

    pub fn has_river_through_edge(&self, direction: Direction) -> bool {
        self.incoming_river == Some(direction) || self.outgoing_river == Some(direction)
    }

    pub fn roads(&self) -> RoadFlags {
        self.roads
    }

    pub fn has_roads(&self) -> bool {
        self.roads.any()
    }

    pub fn has_road_through_edge(&self, direction: Direction) -> bool {
        self.roads[direction.index()]
    }

    /// `true` while at least one observer sees this cell.
    pub fn is_visible(&self) -> bool {
        self.visibility > 0
    }

    /// Number of observers currently seeing this cell.
    pub fn visibility(&self) -> u32 {
        self.visibility
    }

    /// `true` once this cell has ever been visible.
    pub fn is_explored(&self) -> bool {
        self.explored
    }

    pub fn unit(&self) -> Option<UnitId> {
        self.unit
    }

    /// World position of this cell's center, raised to its elevation.
    pub fn position(&self) -> Vec3 {
        let mut position = self.coordinate.to_position();
        position.y = self.elevation as f32 * ELEVATION_STEP;
        position
    }
}

/// Change to a cell which an external per-cell data sink (for example, a shader texture)
/// must pick up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellDataChange {
    /// The cell became visible or hidden, or its explored flag changed.
    Visibility(CellIndex),
    /// The cell's terrain type or elevation changed.
    Terrain(CellIndex),
}

impl CellDataChange {
    pub fn cell(self) -> CellIndex {
        match self {
            CellDataChange::Visibility(cell) | CellDataChange::Terrain(cell) => cell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> Cell {
        Cell::new(0, Coordinate::default(), 0)
    }

    #[test]
    fn test_underwater() {
        let mut cell = cell();
        assert!(!cell.is_underwater());
        cell.water_level = 1;
        assert!(cell.is_underwater());
        assert_eq!(cell.view_elevation(), 1);
        cell.elevation = 3;
        assert!(!cell.is_underwater());
        assert_eq!(cell.view_elevation(), 3);
    }

    #[test]
    fn test_river_queries() {
        let mut cell = cell();
        assert!(!cell.has_river());
        cell.incoming_river = Some(Direction::W);
        assert!(cell.has_river_begin_or_end());
        assert_eq!(cell.river_begin_or_end_direction(), Some(Direction::W));
        cell.outgoing_river = Some(Direction::E);
        assert!(!cell.has_river_begin_or_end());
        assert!(cell.has_river_through_edge(Direction::W));
        assert!(cell.has_river_through_edge(Direction::E));
        assert!(!cell.has_river_through_edge(Direction::NE));
    }

    #[test]
    fn test_roads() {
        let mut cell = cell();
        assert!(!cell.has_roads());
        cell.roads.set(Direction::SE.index(), true);
        assert!(cell.has_roads());
        assert!(cell.has_road_through_edge(Direction::SE));
        assert!(!cell.has_road_through_edge(Direction::NW));
        assert_eq!(cell.roads().into_inner(), [0b100]);
    }

    #[test]
    fn test_position_follows_elevation() {
        let mut cell = cell();
        cell.elevation = 2;
        assert_eq!(cell.position().y, 2.0 * ELEVATION_STEP);
    }
}
