//! Fixed measurements of the hex layout.

/// Distance from a cell's center to any of its corners.
pub const OUTER_RADIUS: f32 = 10.0;

/// Distance from a cell's center to the midpoint of any of its edges.
pub const INNER_RADIUS: f32 = OUTER_RADIUS * 0.866_025_4;

/// World-space height of a single elevation level.
pub const ELEVATION_STEP: f32 = 3.0;

/// Cells per chunk along the x (column) axis.
pub const CHUNK_SIZE_X: usize = 5;

/// Cells per chunk along the z (row) axis.
pub const CHUNK_SIZE_Z: usize = 5;

/// Classification of the elevation relationship across a shared cell edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeType {
    /// Both sides have equal elevation.
    Flat,
    /// The elevations differ by exactly one.
    Slope,
    /// The elevations differ by two or more.
    Cliff,
}

impl EdgeType {
    pub fn between(elevation_a: i32, elevation_b: i32) -> EdgeType {
        match elevation_a.abs_diff(elevation_b) {
            0 => EdgeType::Flat,
            1 => EdgeType::Slope,
            _ => EdgeType::Cliff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_type() {
        assert_eq!(EdgeType::between(2, 2), EdgeType::Flat);
        assert_eq!(EdgeType::between(2, 3), EdgeType::Slope);
        assert_eq!(EdgeType::between(3, 2), EdgeType::Slope);
        assert_eq!(EdgeType::between(0, 2), EdgeType::Cliff);
        assert_eq!(EdgeType::between(-4, 0), EdgeType::Cliff);
        assert_eq!(EdgeType::between(i32::MIN, 1), EdgeType::Cliff);
        assert_eq!(EdgeType::between(i32::MAX, i32::MIN), EdgeType::Cliff);
        assert_eq!(EdgeType::between(i32::MIN, i32::MIN + 1), EdgeType::Slope);
    }
}
