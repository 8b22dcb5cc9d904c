use super::{cell::CellIndex, search::Path, HexGrid};

/// Handle to a unit placed on a [`HexGrid`].
///
/// Handles stay valid until the unit is removed or the map is rebuilt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(usize);

/// A unit standing on a cell. Each cell holds at most one unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Unit {
    location: CellIndex,
    orientation: f32,
}

impl Unit {
    #[inline]
    pub fn location(&self) -> CellIndex {
        self.location
    }

    /// Facing, in degrees around the vertical axis.
    #[inline]
    pub fn orientation(&self) -> f32 {
        self.orientation
    }
}

impl HexGrid {
    /// Place a new unit.
    ///
    /// Returns `None` when the cell is already occupied.
    pub fn add_unit(&mut self, location: CellIndex, orientation: f32) -> Option<UnitId> {
        if self.cells[location].unit.is_some() {
            return None;
        }

        let unit = Unit {
            location,
            orientation,
        };
        let id = match self.units.iter().position(Option::is_none) {
            Some(slot) => {
                self.units[slot] = Some(unit);
                UnitId(slot)
            }
            None => {
                self.units.push(Some(unit));
                UnitId(self.units.len() - 1)
            }
        };
        self.cells[location].unit = Some(id);
        Some(id)
    }

    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.get_mut(id.0)?.take()?;
        self.cells[unit.location].unit = None;
        Some(unit)
    }

    pub fn clear_units(&mut self) {
        for unit in self.units.drain(..).flatten() {
            self.cells[unit.location].unit = None;
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0)?.as_ref()
    }

    /// Iterate over every unit on the map, in placement-slot order.
    pub fn units(&self) -> impl '_ + Iterator<Item = (UnitId, &Unit)> {
        self.units
            .iter()
            .enumerate()
            .filter_map(|(slot, unit)| unit.as_ref().map(|unit| (UnitId(slot), unit)))
    }

    pub fn unit_count(&self) -> usize {
        self.units.iter().flatten().count()
    }

    pub fn set_unit_orientation(&mut self, id: UnitId, orientation: f32) -> bool {
        match self.units.get_mut(id.0).and_then(Option::as_mut) {
            Some(unit) => {
                unit.orientation = orientation;
                true
            }
            None => false,
        }
    }

    /// A unit may end its move on a cell which is dry and unoccupied.
    pub fn is_valid_destination(&self, cell: CellIndex) -> bool {
        !self.cells[cell].is_underwater() && self.cells[cell].unit.is_none()
    }

    /// Move a unit to the end of a path it was planned for.
    ///
    /// Returns `false` when the unit does not exist, does not stand at the start of the
    /// path, or the end of the path is not a valid destination.
    pub fn travel(&mut self, id: UnitId, path: &Path) -> bool {
        let Some(location) = self.unit(id).map(Unit::location) else {
            return false;
        };
        if path.start() != location {
            return false;
        }
        let destination = path.end();
        if destination == location {
            return true;
        }
        if !self.is_valid_destination(destination) {
            return false;
        }

        self.cells[location].unit = None;
        self.cells[destination].unit = Some(id);
        if let Some(unit) = self.units[id.0].as_mut() {
            unit.location = destination;
        }
        true
    }

    /// Rebuild units from their saved locations; the map must have no units.
    pub(crate) fn restore_units(&mut self, units: impl IntoIterator<Item = (CellIndex, f32)>) {
        debug_assert!(self.units.is_empty());
        for (location, orientation) in units {
            self.add_unit(location, orientation);
        }
    }
}
