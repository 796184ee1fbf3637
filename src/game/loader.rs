//! Map file loader
//!
//! Reads the JSON game description (maps with their roads, buildings and
//! offices plus speed settings) into immutable [`Map`]s. The same document
//! types serialise a loaded map back out for map queries.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::game::constants::movement::DEFAULT_DOG_SPEED;
use crate::game::map::{
    Building, Coord, Map, MapError, MapId, Office, Offset, Orientation, Point, Rectangle, Road,
    Size,
};

/// Top-level config document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_dog_speed: Option<f64>,
    pub maps: Vec<MapDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dog_speed: Option<f64>,
    pub roads: Vec<RoadDef>,
    #[serde(default)]
    pub buildings: Vec<BuildingDef>,
    #[serde(default)]
    pub offices: Vec<OfficeDef>,
}

/// A road is horizontal when it has `x1`, vertical when it has `y1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadDef {
    pub x0: Coord,
    pub y0: Coord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<Coord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<Coord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingDef {
    pub x: Coord,
    pub y: Coord,
    pub w: Coord,
    pub h: Coord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeDef {
    pub id: String,
    pub x: Coord,
    pub y: Coord,
    pub offset_x: Coord,
    pub offset_y: Coord,
}

/// Result of loading a config document
#[derive(Debug, Clone)]
pub struct LoadedGame {
    pub default_dog_speed: f64,
    pub maps: Vec<Map>,
}

/// Load and validate a config file
pub fn load_game(path: &Path) -> Result<LoadedGame, LoadError> {
    let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = parse_game(&json)?;
    info!(
        "Loaded {} map(s) from {}",
        loaded.maps.len(),
        path.display()
    );
    Ok(loaded)
}

/// Parse and validate a config document
pub fn parse_game(json: &str) -> Result<LoadedGame, LoadError> {
    let file: GameFile = serde_json::from_str(json)?;

    let default_dog_speed = match file.default_dog_speed {
        Some(speed) if !speed.is_finite() || speed < 0.0 => {
            return Err(LoadError::InvalidDefaultSpeed(speed));
        }
        Some(speed) => speed,
        None => DEFAULT_DOG_SPEED,
    };

    let mut seen = HashSet::with_capacity(file.maps.len());
    let mut maps = Vec::with_capacity(file.maps.len());
    for def in file.maps {
        if !seen.insert(def.id.clone()) {
            return Err(LoadError::DuplicateMap(MapId::new(def.id)));
        }
        let map = def.into_map()?;
        debug!(
            "Map {} ({}): {} roads, {} buildings, {} offices",
            map.id(),
            map.name(),
            map.roads().len(),
            map.buildings().len(),
            map.offices().len()
        );
        maps.push(map);
    }

    Ok(LoadedGame {
        default_dog_speed,
        maps,
    })
}

impl MapDef {
    pub fn into_map(self) -> Result<Map, LoadError> {
        let id = MapId::new(self.id);

        let roads = self
            .roads
            .iter()
            .enumerate()
            .map(|(index, road)| {
                road.to_road().ok_or_else(|| LoadError::RoadWithoutEnd {
                    map: id.clone(),
                    index,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let buildings = self
            .buildings
            .iter()
            .map(|b| Building {
                bounds: Rectangle {
                    position: Point::new(b.x, b.y),
                    size: Size {
                        width: b.w,
                        height: b.h,
                    },
                },
            })
            .collect();

        let offices = self
            .offices
            .into_iter()
            .map(|o| Office {
                id: o.id,
                position: Point::new(o.x, o.y),
                offset: Offset {
                    dx: o.offset_x,
                    dy: o.offset_y,
                },
            })
            .collect();

        Ok(Map::new(id, self.name, roads, buildings, offices, self.dog_speed)?)
    }
}

impl RoadDef {
    fn to_road(self) -> Option<Road> {
        let start = Point::new(self.x0, self.y0);
        match (self.x1, self.y1) {
            (Some(x1), _) => Some(Road::horizontal(start, x1)),
            (None, Some(y1)) => Some(Road::vertical(start, y1)),
            (None, None) => None,
        }
    }
}

impl From<&Road> for RoadDef {
    fn from(road: &Road) -> Self {
        let start = road.start();
        let end = road.end();
        match road.orientation() {
            Orientation::Horizontal => Self {
                x0: start.x,
                y0: start.y,
                x1: Some(end.x),
                y1: None,
            },
            Orientation::Vertical => Self {
                x0: start.x,
                y0: start.y,
                x1: None,
                y1: Some(end.y),
            },
        }
    }
}

impl From<&Map> for MapDef {
    fn from(map: &Map) -> Self {
        Self {
            id: map.id().to_string(),
            name: map.name().to_string(),
            dog_speed: map.dog_speed(),
            roads: map.roads().iter().map(RoadDef::from).collect(),
            buildings: map
                .buildings()
                .iter()
                .map(|b| BuildingDef {
                    x: b.bounds.position.x,
                    y: b.bounds.position.y,
                    w: b.bounds.size.width,
                    h: b.bounds.size.height,
                })
                .collect(),
            offices: map
                .offices()
                .iter()
                .map(|o| OfficeDef {
                    id: o.id.clone(),
                    x: o.position.x,
                    y: o.position.y,
                    offset_x: o.offset.dx,
                    offset_y: o.offset.dy,
                })
                .collect(),
        }
    }
}

/// Config loading errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("map {map}: road {index} has neither x1 nor y1")]
    RoadWithoutEnd { map: MapId, index: usize },
    #[error("map with id {0} already exists")]
    DuplicateMap(MapId),
    #[error("invalid default dog speed {0}")]
    InvalidDefaultSpeed(f64),
    #[error(transparent)]
    Map(#[from] MapError),
}
