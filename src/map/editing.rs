//! Attribute edits, and the river, road, and visibility rules they must uphold.
//!
//! Every setter is a no-op when the value does not change. Rejected river and road
//! placements are ordinary outcomes of speculative edits, not errors; they leave the
//! map untouched and report `false`.

use log::trace;

use super::{
    cell::{CellDataChange, CellIndex, MAX_FEATURE_LEVEL},
    search::SearchContext,
    HexGrid,
};
use crate::geometry::Direction;

impl HexGrid {
    pub fn set_terrain_type(&mut self, cell: CellIndex, terrain_type: u8) {
        if self.cells[cell].terrain_type == terrain_type {
            return;
        }
        self.cells[cell].terrain_type = terrain_type;
        self.refresh(cell);
        self.cell_data_changes.push(CellDataChange::Terrain(cell));
    }

    /// Change a cell's elevation.
    ///
    /// Rivers which no longer flow downhill are removed, as are roads across edges
    /// which have become too steep.
    pub fn set_elevation(&mut self, cell: CellIndex, elevation: i32) {
        if self.cells[cell].elevation == elevation {
            return;
        }
        self.cells[cell].elevation = elevation;
        self.validate_rivers(cell);
        self.validate_roads(cell);
        self.refresh(cell);
        self.cell_data_changes.push(CellDataChange::Terrain(cell));
    }

    /// Change a cell's water level.
    ///
    /// Rivers which relied on the old water level to flow uphill are removed.
    pub fn set_water_level(&mut self, cell: CellIndex, water_level: i32) {
        if self.cells[cell].water_level == water_level {
            return;
        }
        self.cells[cell].water_level = water_level;
        self.validate_rivers(cell);
        self.validate_roads(cell);
        self.refresh(cell);
    }

    /// Levels are clamped to `0..=MAX_FEATURE_LEVEL`.
    pub fn set_urban_level(&mut self, cell: CellIndex, level: u8) {
        let level = level.min(MAX_FEATURE_LEVEL);
        if self.cells[cell].urban_level != level {
            self.cells[cell].urban_level = level;
            self.refresh_self(cell);
        }
    }

    /// Levels are clamped to `0..=MAX_FEATURE_LEVEL`.
    pub fn set_farm_level(&mut self, cell: CellIndex, level: u8) {
        let level = level.min(MAX_FEATURE_LEVEL);
        if self.cells[cell].farm_level != level {
            self.cells[cell].farm_level = level;
            self.refresh_self(cell);
        }
    }

    /// Levels are clamped to `0..=MAX_FEATURE_LEVEL`.
    pub fn set_plant_level(&mut self, cell: CellIndex, level: u8) {
        let level = level.min(MAX_FEATURE_LEVEL);
        if self.cells[cell].plant_level != level {
            self.cells[cell].plant_level = level;
            self.refresh_self(cell);
        }
    }

    /// Place a special feature, or clear it with `0`.
    ///
    /// Ignored while the cell has a river. A special feature removes every road of the cell.
    pub fn set_special_index(&mut self, cell: CellIndex, special_index: u8) {
        if self.cells[cell].special_index == special_index || self.cells[cell].has_river() {
            return;
        }
        self.cells[cell].special_index = special_index;
        self.remove_roads(cell);
        self.refresh_self(cell);
    }

    pub fn set_walled(&mut self, cell: CellIndex, walled: bool) {
        if self.cells[cell].walled != walled {
            self.cells[cell].walled = walled;
            self.refresh(cell);
        }
    }

    /// A river may flow from `from` into `to` when `to` is not higher than `from`,
    /// or when `from`'s water surface sits exactly at `to`'s elevation.
    pub fn is_valid_river_destination(&self, from: CellIndex, to: CellIndex) -> bool {
        let from = &self.cells[from];
        let to = &self.cells[to];
        from.elevation >= to.elevation || from.water_level == to.elevation
    }

    fn validate_rivers(&mut self, cell: CellIndex) {
        if let Some(direction) = self.cells[cell].outgoing_river {
            let valid = self
                .neighbor(cell, direction)
                .map_or(false, |neighbor| self.is_valid_river_destination(cell, neighbor));
            if !valid {
                self.remove_outgoing_river(cell);
            }
        }
        if let Some(direction) = self.cells[cell].incoming_river {
            let valid = self
                .neighbor(cell, direction)
                .map_or(false, |neighbor| self.is_valid_river_destination(neighbor, cell));
            if !valid {
                self.remove_incoming_river(cell);
            }
        }
    }

    fn validate_roads(&mut self, cell: CellIndex) {
        for direction in Direction::iter() {
            if self.cells[cell].has_road_through_edge(direction)
                && self
                    .elevation_difference(cell, direction)
                    .map_or(true, |difference| difference > 1)
            {
                self.set_road(cell, direction, false);
            }
        }
    }

    /// Start a river in `cell` flowing out through `direction`.
    ///
    /// Replaces any river already leaving `cell` or entering the neighbor, clears
    /// special features on both cells, and removes the road on the shared edge.
    ///
    /// Returns `false`, leaving the map unchanged, when there is no neighbor in that
    /// direction or the neighbor is not a valid river destination.
    pub fn set_outgoing_river(&mut self, cell: CellIndex, direction: Direction) -> bool {
        if self.cells[cell].outgoing_river == Some(direction) {
            return true;
        }

        let Some(neighbor) = self.neighbor(cell, direction) else {
            trace!("river from cell {} toward {} leaves the map", cell, direction);
            return false;
        };
        if !self.is_valid_river_destination(cell, neighbor) {
            trace!("river from cell {} cannot flow uphill into cell {}", cell, neighbor);
            return false;
        }

        self.remove_outgoing_river(cell);
        if self.cells[cell].incoming_river == Some(direction) {
            self.remove_incoming_river(cell);
        }
        self.cells[cell].outgoing_river = Some(direction);
        self.cells[cell].special_index = 0;

        self.remove_incoming_river(neighbor);
        self.cells[neighbor].incoming_river = Some(direction.opposite());
        self.cells[neighbor].special_index = 0;

        self.set_road(cell, direction, false);
        self.refresh_self(cell);
        self.refresh_self(neighbor);
        true
    }

    pub fn remove_outgoing_river(&mut self, cell: CellIndex) {
        let Some(direction) = self.cells[cell].outgoing_river.take() else {
            return;
        };
        self.refresh_self(cell);

        if let Some(neighbor) = self.neighbor(cell, direction) {
            self.cells[neighbor].incoming_river = None;
            self.refresh_self(neighbor);
        }
    }

    pub fn remove_incoming_river(&mut self, cell: CellIndex) {
        let Some(direction) = self.cells[cell].incoming_river.take() else {
            return;
        };
        self.refresh_self(cell);

        if let Some(neighbor) = self.neighbor(cell, direction) {
            self.cells[neighbor].outgoing_river = None;
            self.refresh_self(neighbor);
        }
    }

    pub fn remove_river(&mut self, cell: CellIndex) {
        self.remove_outgoing_river(cell);
        self.remove_incoming_river(cell);
    }

    fn set_road(&mut self, cell: CellIndex, direction: Direction, state: bool) {
        self.cells[cell].roads.set(direction.index(), state);
        self.refresh_self(cell);
        if let Some(neighbor) = self.neighbor(cell, direction) {
            self.cells[neighbor]
                .roads
                .set(direction.opposite().index(), state);
            self.refresh_self(neighbor);
        }
    }

    /// Build a road across the edge in `direction`.
    ///
    /// Returns `false`, leaving the map unchanged, when a river crosses that edge, the
    /// edge is steeper than a slope, or either cell holds a special feature.
    pub fn add_road(&mut self, cell: CellIndex, direction: Direction) -> bool {
        if self.cells[cell].has_road_through_edge(direction) {
            return true;
        }
        let Some(neighbor) = self.neighbor(cell, direction) else {
            return false;
        };
        let allowed = !self.cells[cell].has_river_through_edge(direction)
            && self.cells[cell].elevation.abs_diff(self.cells[neighbor].elevation) <= 1
            && !self.cells[cell].is_special()
            && !self.cells[neighbor].is_special();
        if !allowed {
            trace!("road from cell {} toward {} rejected", cell, direction);
            return false;
        }
        self.set_road(cell, direction, true);
        true
    }

    pub fn remove_roads(&mut self, cell: CellIndex) {
        for direction in Direction::iter() {
            if self.cells[cell].has_road_through_edge(direction) {
                self.set_road(cell, direction, false);
            }
        }
    }

    /// Drop rivers, roads, and special features which break the editing rules.
    ///
    /// Edits uphold these rules as they go; this is for cell data which arrived some
    /// other way, such as from a map file. Nothing is refreshed or reported.
    pub(crate) fn enforce_invariants(&mut self) {
        for cell in 0..self.cells.len() {
            if let Some(direction) = self.cells[cell].outgoing_river {
                let valid = self.neighbor(cell, direction).map_or(false, |neighbor| {
                    self.cells[neighbor].incoming_river == Some(direction.opposite())
                        && self.is_valid_river_destination(cell, neighbor)
                });
                if !valid {
                    trace!("dropping broken outgoing river of cell {}", cell);
                    self.cells[cell].outgoing_river = None;
                }
            }
        }

        for cell in 0..self.cells.len() {
            if let Some(direction) = self.cells[cell].incoming_river {
                let valid = self.neighbor(cell, direction).map_or(false, |neighbor| {
                    self.cells[neighbor].outgoing_river == Some(direction.opposite())
                });
                if !valid {
                    trace!("dropping broken incoming river of cell {}", cell);
                    self.cells[cell].incoming_river = None;
                }
            }
            if self.cells[cell].has_river() {
                self.cells[cell].special_index = 0;
            }
        }

        for cell in 0..self.cells.len() {
            for direction in Direction::iter() {
                if !self.cells[cell].has_road_through_edge(direction) {
                    continue;
                }
                let valid = self.neighbor(cell, direction).map_or(false, |neighbor| {
                    let (here, there) = (&self.cells[cell], &self.cells[neighbor]);
                    there.has_road_through_edge(direction.opposite())
                        && !here.has_river_through_edge(direction)
                        && here.elevation.abs_diff(there.elevation) <= 1
                        && !here.is_special()
                        && !there.is_special()
                });
                if !valid {
                    trace!("dropping broken road of cell {} toward {}", cell, direction);
                    self.cells[cell].roads.set(direction.index(), false);
                }
            }
        }
    }

    /// Add one observer to a cell. The first observer makes it visible and explored.
    pub fn increase_visibility(&mut self, cell: CellIndex) {
        let target = &mut self.cells[cell];
        target.visibility = target.visibility.saturating_add(1);
        if target.visibility == 1 {
            target.explored = true;
            self.cell_data_changes.push(CellDataChange::Visibility(cell));
        }
    }

    /// Remove one observer from a cell. Removing the last observer hides it.
    pub fn decrease_visibility(&mut self, cell: CellIndex) {
        let target = &mut self.cells[cell];
        if target.visibility == 0 {
            return;
        }
        target.visibility -= 1;
        if target.visibility == 0 {
            self.cell_data_changes.push(CellDataChange::Visibility(cell));
        }
    }

    /// Hide every cell. Explored cells stay explored.
    pub fn reset_visibility(&mut self) {
        for cell in self.cells.iter_mut() {
            if cell.visibility > 0 {
                cell.visibility = 0;
                self.cell_data_changes
                    .push(CellDataChange::Visibility(cell.index));
            }
        }
    }

    pub(crate) fn set_explored(&mut self, cell: CellIndex, explored: bool) {
        if self.cells[cell].explored != explored {
            self.cells[cell].explored = explored;
            self.cell_data_changes.push(CellDataChange::Visibility(cell));
        }
    }

    /// Add an observer at `from` to every cell it can see within `range`.
    pub fn increase_visibility_from(
        &mut self,
        context: &mut SearchContext,
        from: CellIndex,
        range: u32,
    ) {
        for cell in context.visible_cells(self, from, range) {
            self.increase_visibility(cell);
        }
    }

    /// Remove an observer at `from` from every cell it can see within `range`.
    ///
    /// The map must not have changed in a way that affects sight lines since the matching
    /// [`increase_visibility_from`](Self::increase_visibility_from).
    pub fn decrease_visibility_from(
        &mut self,
        context: &mut SearchContext,
        from: CellIndex,
        range: u32,
    ) {
        for cell in context.visible_cells(self, from, range) {
            self.decrease_visibility(cell);
        }
    }
}
