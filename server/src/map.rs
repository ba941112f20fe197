//! Map templates available to games.
//!
//! A maps directory contains one sub-directory per map. A sub-directory is a
//! map if it has a `world` directory holding the world snapshot; its
//! `config.yml` is read verbatim and decoded on demand by the rules that
//! understand it.

use crate::error::MapError;
use crate::utils::copy_dir;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const WORLD_DIR_NAME: &str = "world";
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Immutable description of a playable map template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    name: String,
    world_path: PathBuf,
    config_raw: Vec<u8>,
}

impl Map {
    pub fn new(name: impl Into<String>, world_path: impl Into<PathBuf>, config_raw: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            world_path: world_path.into(),
            config_raw,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn world_path(&self) -> &Path {
        &self.world_path
    }

    /// Materializes the template's world snapshot at `path`.
    pub fn copy_world_to(&self, path: &Path) -> std::io::Result<()> {
        copy_dir(&self.world_path, path)
    }

    /// Decodes the map's `config.yml` into the rules' own config type.
    pub fn unmarshal_config<T: DeserializeOwned>(&self) -> Result<T, serde_yaml::Error> {
        serde_yaml::from_slice(&self.config_raw)
    }
}

/// Lists the maps under `dir`, sorted by name.
pub fn load_maps(dir: &Path) -> Result<Vec<Arc<Map>>, MapError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| MapError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| MapError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut maps = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let world_path = path.join(WORLD_DIR_NAME);
        if !world_path.is_dir() {
            continue;
        }
        let config_path = path.join(CONFIG_FILE_NAME);
        let config_raw = fs::read(&config_path).map_err(|source| MapError::ReadConfig {
            path: config_path,
            source,
        })?;

        maps.push(Arc::new(Map::new(
            entry.file_name().to_string_lossy(),
            world_path,
            config_raw,
        )));
    }

    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::Vec3;
    use serde::Deserialize;

    fn write_map(root: &Path, name: &str, config: &str) {
        let world = root.join(name).join(WORLD_DIR_NAME);
        fs::create_dir_all(world.join("db")).unwrap();
        fs::write(world.join("level.dat"), name.as_bytes()).unwrap();
        fs::write(root.join(name).join(CONFIG_FILE_NAME), config).unwrap();
    }

    #[test]
    fn test_load_maps_sorted_and_filtered() {
        let root = tempfile::tempdir().unwrap();
        write_map(root.path(), "volcano", "spawn: {x: 1.0, y: 2.0, z: 3.0}\n");
        write_map(root.path(), "island", "spawn: {x: 0.0, y: 70.0, z: 0.0}\n");
        // No world directory: not a map.
        fs::create_dir_all(root.path().join("drafts")).unwrap();
        // Plain files are ignored.
        fs::write(root.path().join("README"), "maps").unwrap();

        let maps = load_maps(root.path()).unwrap();
        let names: Vec<_> = maps.iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["island", "volcano"]);
        assert!(maps[0].world_path().ends_with("island/world"));
    }

    #[test]
    fn test_load_maps_missing_config() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("broken").join(WORLD_DIR_NAME)).unwrap();

        let err = load_maps(root.path()).unwrap_err();
        assert!(matches!(err, MapError::ReadConfig { .. }));
    }

    #[test]
    fn test_load_maps_missing_dir() {
        let err = load_maps(Path::new("/no/such/maps")).unwrap_err();
        assert!(matches!(err, MapError::ReadDir { .. }));
    }

    #[derive(Debug, Deserialize)]
    struct MapConfig {
        spawn: Vec3,
        #[serde(default)]
        teams: u32,
    }

    #[test]
    fn test_unmarshal_config() {
        let map = Map::new("island", "/maps/island/world", b"spawn: {x: 0.5, y: 70.0, z: -3.5}\nteams: 4\n".to_vec());
        let config: MapConfig = map.unmarshal_config().unwrap();
        assert_eq!(config.spawn, Vec3::new(0.5, 70.0, -3.5));
        assert_eq!(config.teams, 4);

        let bad = Map::new("bad", "/maps/bad/world", b"spawn: [not, a, vec]".to_vec());
        assert!(bad.unmarshal_config::<MapConfig>().is_err());
    }

    #[test]
    fn test_copy_world_to() {
        let root = tempfile::tempdir().unwrap();
        write_map(root.path(), "island", "{}\n");
        let maps = load_maps(root.path()).unwrap();

        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("game-1");
        maps[0].copy_world_to(&target).unwrap();

        assert_eq!(fs::read(target.join("level.dat")).unwrap(), b"island");
        assert!(target.join("db").is_dir());
    }
}
