/// Direction in a hexagonal coordinate system
///
/// Assumes pointy-topped hexes: every cell has a neighbor due east and due west,
/// and the remaining four sit on the diagonals.
///
/// Directions are numbered clockwise from `NE`; the discriminant is the index used
/// for neighbor arrays and in the save format.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    parse_display::Display,
    parse_display::FromStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    NE = 0,
    E = 1,
    SE = 2,
    SW = 3,
    W = 4,
    NW = 5,
}

impl Direction {
    /// All directions, clockwise from `NE`.
    pub const ALL: [Direction; 6] = [
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    /// Iterate through all `Direction`s, clockwise from `NE`.
    pub fn iter() -> impl Iterator<Item = Direction> {
        Self::ALL.into_iter()
    }

    /// Index of this direction, `0..6`.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Direction for an index; `None` when `index >= 6`.
    pub fn from_index(index: usize) -> Option<Direction> {
        Self::ALL.get(index).copied()
    }

    /// The direction pointing back the way this one came.
    pub fn opposite(self) -> Direction {
        Self::ALL[(self.index() + 3) % 6]
    }

    /// The next direction counter-clockwise.
    pub fn previous(self) -> Direction {
        Self::ALL[(self.index() + 5) % 6]
    }

    /// The next direction clockwise.
    pub fn next(self) -> Direction {
        Self::ALL[(self.index() + 1) % 6]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for direction in Direction::iter() {
            assert_ne!(direction, direction.opposite());
            assert_eq!(direction, direction.opposite().opposite());
        }
    }

    #[test]
    fn test_next_previous() {
        assert_eq!(Direction::NW.next(), Direction::NE);
        assert_eq!(Direction::NE.previous(), Direction::NW);
        for direction in Direction::iter() {
            assert_eq!(direction.next().previous(), direction);
        }
    }

    #[test]
    fn test_index_roundtrip() {
        for (idx, direction) in Direction::iter().enumerate() {
            assert_eq!(direction.index(), idx);
            assert_eq!(Direction::from_index(idx), Some(direction));
        }
        assert_eq!(Direction::from_index(6), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("sw".parse::<Direction>().unwrap(), Direction::SW);
        assert_eq!(Direction::NE.to_string(), "ne");
        assert!("north".parse::<Direction>().is_err());
    }
}
