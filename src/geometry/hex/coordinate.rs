use std::{
    fmt,
    ops::{Add, AddAssign},
};

use glam::Vec3;

use super::direction::Direction;
use crate::geometry::metrics::{INNER_RADIUS, OUTER_RADIUS};

/// Cube hex coordinates.
///
/// See [reference](https://www.redblobgames.com/grids/hexagons/#coordinates).
///
/// Only `x` and `z` are stored; `y` is derived.
///
/// Constraint: `x + y + z == 0`
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Coordinate {
    x: i32,
    z: i32,
}

impl Coordinate {
    pub const fn new(x: i32, z: i32) -> Coordinate {
        Coordinate { x, z }
    }

    #[inline]
    pub const fn x(self) -> i32 {
        self.x
    }

    #[inline]
    pub const fn y(self) -> i32 {
        -self.x - self.z
    }

    #[inline]
    pub const fn z(self) -> i32 {
        self.z
    }

    /// Convert offset coordinates (`col`, `row`) into cube coordinates.
    ///
    /// Odd rows are shifted half a cell to the right.
    pub const fn from_offset(col: i32, row: i32) -> Coordinate {
        Coordinate {
            x: col - row / 2,
            z: row,
        }
    }

    /// Convert these cube coordinates back into offset coordinates: `(col, row)`.
    pub const fn to_offset(self) -> (i32, i32) {
        (self.x + self.z / 2, self.z)
    }

    /// Find the coordinate of the cell containing a world position.
    ///
    /// Only `x` and `z` of the position are considered. Fractional cube coordinates
    /// are rounded; when rounding breaks the `x + y + z == 0` constraint, the component
    /// with the largest rounding error is recomputed from the other two.
    pub fn from_position(position: Vec3) -> Coordinate {
        let offset = position.z / (OUTER_RADIUS * 3.0);
        let x = position.x / (INNER_RADIUS * 2.0) - offset;
        let y = -position.x / (INNER_RADIUS * 2.0) - offset;
        let z = -x - y;

        let mut ix = x.round() as i32;
        let iy = y.round() as i32;
        let mut iz = z.round() as i32;

        if ix + iy + iz != 0 {
            let dx = (x - ix as f32).abs();
            let dy = (y - iy as f32).abs();
            let dz = (z - iz as f32).abs();

            if dx > dy && dx > dz {
                ix = -iy - iz;
            } else if dz > dy {
                iz = -ix - iy;
            }
            // otherwise y had the largest error, and y is never stored
        }

        Coordinate { x: ix, z: iz }
    }

    /// World position of the center of the cell at this coordinate, at elevation 0.
    pub fn to_position(self) -> Vec3 {
        Vec3::new(
            (self.x as f32 + self.z as f32 * 0.5) * INNER_RADIUS * 2.0,
            0.0,
            self.z as f32 * OUTER_RADIUS * 1.5,
        )
    }

    /// Hex distance between two coordinates: the minimum number of steps between them.
    pub fn distance_to(self, other: Coordinate) -> u32 {
        (self.x.abs_diff(other.x) + self.y().abs_diff(other.y()) + self.z.abs_diff(other.z)) / 2
    }

    pub fn neighbors(self) -> impl 'static + Iterator<Item = Coordinate> {
        Direction::iter().map(move |direction| self + direction)
    }
}

impl AddAssign<Direction> for Coordinate {
    fn add_assign(&mut self, rhs: Direction) {
        match rhs {
            Direction::NE => {
                self.z += 1;
            }
            Direction::E => {
                self.x += 1;
            }
            Direction::SE => {
                self.x += 1;
                self.z -= 1;
            }
            Direction::SW => {
                self.z -= 1;
            }
            Direction::W => {
                self.x -= 1;
            }
            Direction::NW => {
                self.x -= 1;
                self.z += 1;
            }
        }
    }
}

impl Add<Direction> for Coordinate {
    type Output = Coordinate;

    fn add(mut self, rhs: Direction) -> Self::Output {
        self += rhs;
        self
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y(), self.z)
    }
}
