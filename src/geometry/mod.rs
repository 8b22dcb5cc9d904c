pub mod hex;
pub mod metrics;

pub use hex::{Coordinate, Direction};
pub use metrics::EdgeType;
