//! Static map model: roads, buildings and offices
//!
//! A [`Map`] is built once at load time and never mutated afterwards. Its
//! [`AdjacencyIndex`] is derived from the road list during construction so
//! every dog navigating the map shares the same read-only index.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::game::adjacency::AdjacencyIndex;
use crate::game::constants::road::HALF_WIDTH;
use crate::util::vec2::Vec2;

/// Integer map coordinate
pub type Coord = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f64, self.y as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: Coord,
    pub height: Coord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub position: Point,
    pub size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub dx: Coord,
    pub dy: Coord,
}

/// Axis a road runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn perpendicular(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

/// Axis-aligned road segment.
///
/// `start` and `end` keep the order they were declared in; use
/// [`Road::span`] for the normalised `(min, max)` along the road.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Road {
    orientation: Orientation,
    start: Point,
    end: Point,
}

impl Road {
    pub fn horizontal(start: Point, end_x: Coord) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            start,
            end: Point::new(end_x, start.y),
        }
    }

    pub fn vertical(start: Point, end_y: Coord) -> Self {
        Self {
            orientation: Orientation::Vertical,
            start,
            end: Point::new(start.x, end_y),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn is_horizontal(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }

    pub fn is_vertical(&self) -> bool {
        self.orientation == Orientation::Vertical
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    /// Coordinate that is constant along the road (`y` for horizontal roads)
    pub fn fixed_coord(&self) -> Coord {
        match self.orientation {
            Orientation::Horizontal => self.start.y,
            Orientation::Vertical => self.start.x,
        }
    }

    /// Normalised `(min, max)` of the coordinate that varies along the road
    pub fn span(&self) -> (Coord, Coord) {
        let (a, b) = match self.orientation {
            Orientation::Horizontal => (self.start.x, self.end.x),
            Orientation::Vertical => (self.start.y, self.end.y),
        };
        (a.min(b), a.max(b))
    }

    /// Normalised x extent
    pub fn x_range(&self) -> (Coord, Coord) {
        (self.start.x.min(self.end.x), self.start.x.max(self.end.x))
    }

    /// Normalised y extent
    pub fn y_range(&self) -> (Coord, Coord) {
        (self.start.y.min(self.end.y), self.start.y.max(self.end.y))
    }

    /// Whether the two roads have at least one endpoint in common
    pub fn shares_endpoint(&self, other: &Road) -> bool {
        self.start == other.start
            || self.start == other.end
            || self.end == other.start
            || self.end == other.end
    }

    /// Clamp a position into the road's bounding box widened by the road
    /// half-width. Returns the clamped position and whether any axis moved.
    pub fn clamp(&self, pos: Vec2) -> (Vec2, bool) {
        let (x_min, x_max) = self.x_range();
        let (y_min, y_max) = self.y_range();
        let x = pos
            .x
            .clamp(x_min as f64 - HALF_WIDTH, x_max as f64 + HALF_WIDTH);
        let y = pos
            .y
            .clamp(y_min as f64 - HALF_WIDTH, y_max as f64 + HALF_WIDTH);
        let clamped = Vec2::new(x, y);
        (clamped, clamped != pos)
    }

    /// Whether a position lies inside the widened bounding box
    pub fn contains(&self, pos: Vec2) -> bool {
        !self.clamp(pos).1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Building {
    pub bounds: Rectangle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Office {
    pub id: String,
    pub position: Point,
    pub offset: Offset,
}

/// Map identifier as it appears in the config file and join requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapId(String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MapId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable game map with its derived adjacency index
#[derive(Debug, Clone)]
pub struct Map {
    id: MapId,
    name: String,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    dog_speed: Option<f64>,
    adjacency: AdjacencyIndex,
}

impl Map {
    pub fn new(
        id: MapId,
        name: String,
        roads: Vec<Road>,
        buildings: Vec<Building>,
        offices: Vec<Office>,
        dog_speed: Option<f64>,
    ) -> Result<Self, MapError> {
        if roads.is_empty() {
            return Err(MapError::NoRoads(id));
        }

        for (i, office) in offices.iter().enumerate() {
            if offices[..i].iter().any(|o| o.id == office.id) {
                return Err(MapError::DuplicateOffice {
                    map: id,
                    office: office.id.clone(),
                });
            }
        }

        if let Some(speed) = dog_speed {
            if !speed.is_finite() || speed < 0.0 {
                return Err(MapError::InvalidSpeed { map: id, speed });
            }
        }

        let adjacency = AdjacencyIndex::build(&roads);

        Ok(Self {
            id,
            name,
            roads,
            buildings,
            offices,
            dog_speed,
            adjacency,
        })
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    /// Per-map speed override, if the config set one
    pub fn dog_speed(&self) -> Option<f64> {
        self.dog_speed
    }

    pub fn adjacency(&self) -> &AdjacencyIndex {
        &self.adjacency
    }
}

/// Map construction errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MapError {
    #[error("map {0} has no roads")]
    NoRoads(MapId),
    #[error("map {map} declares office {office} twice")]
    DuplicateOffice { map: MapId, office: String },
    #[error("map {map} has invalid dog speed {speed}")]
    InvalidSpeed { map: MapId, speed: f64 },
}
