//! Standard terrain-dependent movement rules.

use super::{cell::CellIndex, HexGrid};
use crate::geometry::{Direction, EdgeType};

/// Movement budget per turn of a standard unit.
pub const DEFAULT_SPEED: u32 = 24;

/// Cost of following a road across an edge.
pub const ROAD_MOVE_COST: u32 = 1;

/// Base cost of crossing a flat edge without a road.
pub const FLAT_MOVE_COST: u32 = 5;

/// Base cost of crossing a slope without a road.
pub const SLOPE_MOVE_COST: u32 = 10;

/// Cost for a standard unit to move from `from` into its neighbor `to`.
///
/// Suitable as the movement-cost function of
/// [`SearchContext::find_path`](super::SearchContext::find_path).
///
/// Returns `None` when the move is impossible: `to` is underwater or occupied, the
/// edge is a cliff, or the edge crosses a wall without a road. Roads cost
/// [`ROAD_MOVE_COST`]; otherwise the base cost of the edge is increased by every
/// feature level of the destination.
pub fn terrain_move_cost(
    grid: &HexGrid,
    from: CellIndex,
    to: CellIndex,
    direction: Direction,
) -> Option<u32> {
    let current = &grid[from];
    let neighbor = &grid[to];
    if neighbor.is_underwater() || neighbor.unit().is_some() {
        return None;
    }

    let edge_type = grid.edge_type_between(from, to);
    if edge_type == EdgeType::Cliff {
        return None;
    }

    if current.has_road_through_edge(direction) {
        return Some(ROAD_MOVE_COST);
    }
    if current.walled() != neighbor.walled() {
        return None;
    }

    let base = match edge_type {
        EdgeType::Flat => FLAT_MOVE_COST,
        _ => SLOPE_MOVE_COST,
    };
    Some(
        base + u32::from(neighbor.urban_level())
            + u32::from(neighbor.farm_level())
            + u32::from(neighbor.plant_level()),
    )
}
