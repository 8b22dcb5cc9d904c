//! Versioned binary map files.
//!
//! A map file is a little-endian `i32` format version, followed by the sections that
//! version carries:
//!
//! | version | dimensions | cell records | explored flag | units |
//! |---|---|---|---|---|
//! | 0 | (fixed 20x15) | yes | no | no |
//! | 1 | yes | yes | no | no |
//! | 2 | yes | yes | no | yes |
//! | 3 | yes | yes | yes | yes |
//!
//! Dimensions are two `i32`: width then height. Each cell record is one byte apiece for
//! terrain type, elevation, water level, urban, farm, and plant levels, and special
//! index; then the walled flag, incoming and outgoing river (`0` for none, otherwise
//! `128 + direction`), a bitmask of roads by direction, and from version 3 the explored
//! flag. Units are an `i32` count, then per unit its cube `x` and `z` as `i32` and its
//! orientation as `f32`.
//!
//! Files are always written in the current version.
//!
//! ## Entry Points
//!
//! - [`save`] and [`load`] work over any byte stream.
//! - [`save_to_path`] and [`load_from_path`] work with files on disk.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use bitvec::prelude::*;
use log::{info, warn};
use thiserror::Error;

use crate::{
    geometry::{Coordinate, Direction},
    map::{CellIndex, HexGrid, InvalidDimensions},
};

/// Dimensions of every map saved before dimensions were recorded.
pub const LEGACY_WIDTH: usize = 20;
pub const LEGACY_HEIGHT: usize = 15;

const RIVER_FLAG: u8 = 128;
const ROAD_MASK: u8 = 0b0011_1111;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatVersion {
    V0 = 0,
    V1 = 1,
    V2 = 2,
    V3 = 3,
}

/// Sections present in a map file of some format version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Layout {
    dimensions: bool,
    units: bool,
    explored: bool,
}

impl FormatVersion {
    /// The version written by [`save`].
    pub const CURRENT: FormatVersion = FormatVersion::V3;

    pub fn from_header(header: i32) -> Option<FormatVersion> {
        match header {
            0 => Some(FormatVersion::V0),
            1 => Some(FormatVersion::V1),
            2 => Some(FormatVersion::V2),
            3 => Some(FormatVersion::V3),
            _ => None,
        }
    }

    #[inline]
    pub fn header(self) -> i32 {
        self as i32
    }

    fn layout(self) -> Layout {
        match self {
            FormatVersion::V0 => Layout {
                dimensions: false,
                units: false,
                explored: false,
            },
            FormatVersion::V1 => Layout {
                dimensions: true,
                units: false,
                explored: false,
            },
            FormatVersion::V2 => Layout {
                dimensions: true,
                units: true,
                explored: false,
            },
            FormatVersion::V3 => Layout {
                dimensions: true,
                units: true,
                explored: true,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("map data could not be read or written")]
    Io(#[from] std::io::Error),
    #[error("unknown map format version {0}")]
    UnsupportedVersion(i32),
    #[error(transparent)]
    InvalidDimensions(#[from] InvalidDimensions),
    #[error("{field} value {value} is out of range")]
    ValueOutOfRange { field: &'static str, value: i64 },
    #[error("invalid river byte {0:#04x}")]
    InvalidRiver(u8),
    #[error("unit at {0} lies outside the map")]
    UnitOutOfBounds(Coordinate),
    #[error("more than one unit at {0}")]
    DuplicateUnit(Coordinate),
    #[error("map file {} does not exist", .0.display())]
    MissingFile(PathBuf),
}

/// Everything stored for one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct CellRecord {
    terrain_type: u8,
    elevation: u8,
    water_level: u8,
    urban_level: u8,
    farm_level: u8,
    plant_level: u8,
    special_index: u8,
    walled: bool,
    incoming_river: Option<Direction>,
    outgoing_river: Option<Direction>,
    roads: u8,
    explored: bool,
}

/// A fully decoded map, not yet applied to any grid.
#[derive(Debug)]
struct MapRecord {
    version: FormatVersion,
    width: usize,
    height: usize,
    cells: Vec<CellRecord>,
    units: Vec<(CellIndex, f32)>,
}

fn to_byte(field: &'static str, value: i32) -> Result<u8, Error> {
    u8::try_from(value).map_err(|_| Error::ValueOutOfRange {
        field,
        value: value.into(),
    })
}

fn encode_river(river: Option<Direction>) -> u8 {
    match river {
        Some(direction) => RIVER_FLAG + direction as u8,
        None => 0,
    }
}

fn decode_river(byte: u8) -> Result<Option<Direction>, Error> {
    match byte {
        0 => Ok(None),
        _ => byte
            .checked_sub(RIVER_FLAG)
            .and_then(|index| Direction::from_index(index.into()))
            .map(Some)
            .ok_or(Error::InvalidRiver(byte)),
    }
}

fn read_u8(reader: &mut impl Read) -> Result<u8, Error> {
    let mut buf = [0; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_bool(reader: &mut impl Read) -> Result<bool, Error> {
    read_u8(reader).map(|byte| byte != 0)
}

fn read_i32(reader: &mut impl Read) -> Result<i32, Error> {
    let mut buf = [0; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f32(reader: &mut impl Read) -> Result<f32, Error> {
    let mut buf = [0; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

/// Serialize a map in the current format version.
///
/// The map is fully encoded before anything is written, so a map which cannot be
/// represented writes nothing.
pub fn save(grid: &HexGrid, writer: &mut impl Write) -> Result<(), Error> {
    let mut out = Vec::with_capacity(12 + grid.cell_count() * 12);
    out.extend_from_slice(&FormatVersion::CURRENT.header().to_le_bytes());
    for dimension in [grid.width(), grid.height()] {
        let dimension = i32::try_from(dimension).map_err(|_| Error::ValueOutOfRange {
            field: "dimension",
            value: dimension as i64,
        })?;
        out.extend_from_slice(&dimension.to_le_bytes());
    }

    for cell in grid.cells() {
        out.extend_from_slice(&[
            cell.terrain_type(),
            to_byte("elevation", cell.elevation())?,
            to_byte("water level", cell.water_level())?,
            cell.urban_level(),
            cell.farm_level(),
            cell.plant_level(),
            cell.special_index(),
            cell.walled().into(),
            encode_river(cell.incoming_river()),
            encode_river(cell.outgoing_river()),
            cell.roads().into_inner()[0] & ROAD_MASK,
            cell.is_explored().into(),
        ]);
    }

    out.extend_from_slice(&(grid.unit_count() as i32).to_le_bytes());
    for (_, unit) in grid.units() {
        let coordinate = grid[unit.location()].coordinate();
        out.extend_from_slice(&coordinate.x().to_le_bytes());
        out.extend_from_slice(&coordinate.z().to_le_bytes());
        out.extend_from_slice(&unit.orientation().to_le_bytes());
    }

    writer.write_all(&out)?;
    Ok(())
}

fn decode(reader: &mut impl Read) -> Result<MapRecord, Error> {
    let header = read_i32(reader)?;
    let Some(version) = FormatVersion::from_header(header) else {
        warn!("unknown map format {}; map not loaded", header);
        return Err(Error::UnsupportedVersion(header));
    };
    let layout = version.layout();

    let (width, height) = if layout.dimensions {
        let width = read_i32(reader)?;
        let height = read_i32(reader)?;
        let invalid = InvalidDimensions {
            width: width.into(),
            height: height.into(),
        };
        (
            usize::try_from(width).map_err(|_| invalid)?,
            usize::try_from(height).map_err(|_| invalid)?,
        )
    } else {
        (LEGACY_WIDTH, LEGACY_HEIGHT)
    };
    // bounds the cell count before anything is sized from it
    HexGrid::validate_dimensions(width, height)?;

    let mut cells = Vec::new();
    for _ in 0..width * height {
        cells.push(CellRecord {
            terrain_type: read_u8(reader)?,
            elevation: read_u8(reader)?,
            water_level: read_u8(reader)?,
            urban_level: read_u8(reader)?,
            farm_level: read_u8(reader)?,
            plant_level: read_u8(reader)?,
            special_index: read_u8(reader)?,
            walled: read_bool(reader)?,
            incoming_river: decode_river(read_u8(reader)?)?,
            outgoing_river: decode_river(read_u8(reader)?)?,
            roads: read_u8(reader)? & ROAD_MASK,
            explored: layout.explored && read_bool(reader)?,
        });
    }

    let mut units = Vec::new();
    if layout.units {
        let count = read_i32(reader)?;
        let count = usize::try_from(count).map_err(|_| Error::ValueOutOfRange {
            field: "unit count",
            value: count.into(),
        })?;
        let mut occupied = bitvec![0; width * height];
        for _ in 0..count {
            let coordinate = Coordinate::new(read_i32(reader)?, read_i32(reader)?);
            let orientation = read_f32(reader)?;

            let (col, row) = coordinate.to_offset();
            let location = match (usize::try_from(col), usize::try_from(row)) {
                (Ok(col), Ok(row)) if col < width && row < height => col + row * width,
                _ => return Err(Error::UnitOutOfBounds(coordinate)),
            };
            if occupied.replace(location, true) {
                return Err(Error::DuplicateUnit(coordinate));
            }
            units.push((location, orientation));
        }
    }

    Ok(MapRecord {
        version,
        width,
        height,
        cells,
        units,
    })
}

/// Replace the contents of `grid` with a map read from `reader`.
///
/// The whole stream is decoded before the grid is touched: on error, `grid` is unchanged.
///
/// A loaded map is hidden: no cell is visible, though cells keep their explored flag.
/// Every chunk is dirty and every cell reports both a terrain and a visibility change.
///
/// Rivers, roads, and special features which break the editing rules are dropped.
pub fn load(grid: &mut HexGrid, reader: &mut impl Read) -> Result<FormatVersion, Error> {
    let record = decode(reader)?;
    grid.create_map(record.width, record.height)?;

    for (cell, saved) in grid.cells.iter_mut().zip(&record.cells) {
        cell.terrain_type = saved.terrain_type;
        cell.elevation = saved.elevation.into();
        cell.water_level = saved.water_level.into();
        cell.urban_level = saved.urban_level;
        cell.farm_level = saved.farm_level;
        cell.plant_level = saved.plant_level;
        cell.special_index = saved.special_index;
        cell.walled = saved.walled;
        cell.incoming_river = saved.incoming_river;
        cell.outgoing_river = saved.outgoing_river;
        cell.roads = BitArray::new([saved.roads]);
    }
    grid.enforce_invariants();
    for (cell, saved) in record.cells.iter().enumerate() {
        grid.set_explored(cell, saved.explored);
    }
    grid.restore_units(record.units);

    Ok(record.version)
}

/// Save a map to a file, replacing any file already there.
pub fn save_to_path(grid: &HexGrid, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    save(grid, &mut writer)?;
    writer.flush()?;
    info!("map saved to {}", path.display());
    Ok(())
}

/// Load a map from a file into `grid`.
///
/// On error, `grid` is unchanged.
pub fn load_from_path(grid: &mut HexGrid, path: impl AsRef<Path>) -> Result<FormatVersion, Error> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingFile(path.to_owned()));
    }
    let mut reader = BufReader::new(File::open(path)?);
    let version = load(grid, &mut reader)?;
    info!(
        "map loaded from {} (version {})",
        path.display(),
        version.header()
    );
    Ok(version)
}
