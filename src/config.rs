use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// File extension of saved maps.
pub const MAP_EXTENSION: &str = "map";

/// Location of the configuration file, if the platform has a configuration directory.
pub fn path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("hexmap").join("config.toml"))
}

/// Map sizes offered when creating a new map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl MapSize {
    /// `(width, height)` in cells.
    pub fn dimensions(self) -> (usize, usize) {
        match self {
            MapSize::Small => (20, 15),
            MapSize::Medium => (40, 30),
            MapSize::Large => (80, 60),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding saved maps
    pub maps_directory: Option<PathBuf>,

    /// Size of newly created maps
    #[serde(default)]
    pub default_size: MapSize,
}

impl Config {
    pub fn save(&self) -> Result<(), Error> {
        let path = path().ok_or(Error::NoConfigDirectory)?;
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let serialized = toml::to_string_pretty(self)?;
        std::fs::write(path, serialized.as_bytes()).map_err(Into::into)
    }

    pub fn load() -> Result<Self, Error> {
        let path = path().ok_or(Error::NoConfigDirectory)?;
        let data = std::fs::read_to_string(path)?;
        toml::from_str(&data).map_err(Into::into)
    }

    fn maps_directory_inner(&self) -> Option<PathBuf> {
        match &self.maps_directory {
            Some(maps_directory) => Some(maps_directory.to_owned()),
            None => Some(dirs::data_dir()?.join("hexmap").join("maps")),
        }
    }

    /// Directory holding saved maps.
    ///
    /// Falls back to `maps` under the current directory when the platform has no data
    /// directory.
    pub fn maps_directory(&self) -> PathBuf {
        self.maps_directory_inner()
            .unwrap_or_else(|| PathBuf::from("maps"))
    }

    /// Path of the saved map called `name`; `None` for an empty name.
    pub fn map_path(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        Some(
            self.maps_directory()
                .join(name)
                .with_extension(MAP_EXTENSION),
        )
    }

    /// Names of every map in the maps directory, sorted.
    ///
    /// A missing maps directory holds no maps.
    pub fn saved_maps(&self) -> Result<Vec<String>, Error> {
        let directory = self.maps_directory();
        if !directory.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            if path.extension().map_or(false, |extension| extension == MAP_EXTENSION) {
                if let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration could not be loaded")]
    CouldNotLoad(#[from] std::io::Error),
    #[error("malformed configuration")]
    Malformed(#[from] toml::de::Error),
    #[error("failed to serialize")]
    CouldNotSerialize(#[from] toml::ser::Error),
    #[error("no configuration directory for this user")]
    NoConfigDirectory,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_directory(directory: PathBuf) -> Config {
        Config {
            maps_directory: Some(directory),
            ..Config::default()
        }
    }

    #[test]
    fn test_map_path() {
        let config = in_directory(PathBuf::from("/tmp/maps"));
        assert_eq!(config.map_path(""), None);
        assert_eq!(
            config.map_path("island"),
            Some(PathBuf::from("/tmp/maps/island.map"))
        );
    }

    #[test]
    fn test_sizes() {
        assert_eq!(MapSize::default().dimensions(), (40, 30));
        assert_eq!(MapSize::Small.dimensions(), (20, 15));
        assert_eq!(MapSize::Large.dimensions(), (80, 60));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config {
            maps_directory: Some(PathBuf::from("/srv/maps")),
            default_size: MapSize::Large,
        };
        let serialized = toml::to_string_pretty(&config).unwrap();
        assert!(serialized.contains("default_size = \"large\""));
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.maps_directory, config.maps_directory);
        assert_eq!(parsed.default_size, MapSize::Large);

        let sparse: Config = toml::from_str("").unwrap();
        assert_eq!(sparse.maps_directory, None);
        assert_eq!(sparse.default_size, MapSize::Medium);
    }

    #[test]
    fn test_saved_maps() {
        let directory =
            std::env::temp_dir().join(format!("hexmap-config-test-{}", std::process::id()));
        let config = in_directory(directory.clone());
        assert!(config.saved_maps().unwrap().is_empty());

        std::fs::create_dir_all(&directory).unwrap();
        for file in ["b.map", "a.map", "notes.txt"] {
            std::fs::write(directory.join(file), b"").unwrap();
        }
        assert_eq!(config.saved_maps().unwrap(), vec!["a", "b"]);
        std::fs::remove_dir_all(&directory).unwrap();
    }
}
