//! Request and response types at the API boundary
//!
//! Requests arrive as JSON objects tagged by `"type"`. Responses serialise to
//! the bodies the HTTP API returns; errors carry a stable `code`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::game::dog::DogSnapshot;
use crate::game::loader::MapDef;
use crate::game::map::Map;
use crate::lobby::manager::GameError;
use crate::lobby::player::{Player, PlayerId};
use crate::net::token::PlayerToken;

/// Every operation a client can request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ApiRequest {
    GetMaps,
    GetMap {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    Join {
        map_id: String,
        user_name: String,
    },
    /// `token` may be bare or an `Authorization: Bearer` value
    ListPlayers {
        token: String,
    },
    GetState {
        token: String,
    },
    SetDirection {
        token: String,
        #[serde(rename = "move", alias = "direction")]
        direction: String,
    },
    /// Kept loose so a bad delta is reported as such rather than as a
    /// malformed request
    #[serde(rename_all = "camelCase")]
    Tick {
        #[serde(default)]
        time_delta: Option<Value>,
    },
}

impl ApiRequest {
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        serde_json::from_str(body).map_err(|e| ApiError::BadRequest(e.to_string()))
    }

    /// Operation name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiRequest::GetMaps => "getMaps",
            ApiRequest::GetMap { .. } => "getMap",
            ApiRequest::Join { .. } => "join",
            ApiRequest::ListPlayers { .. } => "listPlayers",
            ApiRequest::GetState { .. } => "getState",
            ApiRequest::SetDirection { .. } => "setDirection",
            ApiRequest::Tick { .. } => "tick",
        }
    }
}

/// Validate a client-supplied token
pub fn parse_token(raw: &str) -> Result<PlayerToken, ApiError> {
    PlayerToken::from_bearer(raw)
        .or_else(|| PlayerToken::parse(raw))
        .ok_or(ApiError::InvalidToken)
}

/// Tick delta in whole milliseconds. Missing, fractional or negative values
/// are rejected.
pub fn parse_time_delta(value: Option<&Value>) -> Result<Duration, GameError> {
    value
        .and_then(Value::as_u64)
        .map(Duration::from_millis)
        .ok_or(GameError::BadDeltaTime)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSummary {
    pub id: String,
    pub name: String,
}

impl From<&Map> for MapSummary {
    fn from(map: &Map) -> Self {
        Self {
            id: map.id().to_string(),
            name: map.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub auth_token: PlayerToken,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub name: String,
}

impl From<&Player> for PlayerEntry {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DogState {
    pub id: PlayerId,
    pub pos: [f64; 2],
    pub speed: [f64; 2],
    pub dir: &'static str,
}

impl DogState {
    pub fn new(id: PlayerId, snapshot: &DogSnapshot) -> Self {
        Self {
            id,
            pos: snapshot.position.to_array(),
            speed: snapshot.velocity.to_array(),
            dir: snapshot.direction.state_code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Maps(Vec<MapSummary>),
    Map(MapDef),
    Joined(JoinResponse),
    Players(Vec<PlayerEntry>),
    State { players: Vec<DogState> },
    Ok {},
}

impl ApiResponse {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Errors surfaced to clients
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("Authorization header is missing or malformed")]
    InvalidToken,
    #[error("Ticks are driven by the server clock")]
    TickNotPermitted,
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Stable error code for clients
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Game(e) => match e {
                GameError::MapNotFound(_) => "mapNotFound",
                GameError::EmptyName
                | GameError::InvalidDirection(_)
                | GameError::BadDeltaTime => "invalidArgument",
                GameError::UnknownToken => "unknownToken",
                GameError::InvalidSession
                | GameError::PlayerAbsent
                | GameError::Navigation(_) => "internalError",
            },
            ApiError::InvalidToken => "invalidToken",
            ApiError::TickNotPermitted | ApiError::BadRequest(_) => "badRequest",
        }
    }

    pub fn is_internal_fault(&self) -> bool {
        matches!(self, ApiError::Game(e) if e.is_internal_fault())
    }
}
