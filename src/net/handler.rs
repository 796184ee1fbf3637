//! API request handler
//!
//! Every mutation of the game goes through the write half of one
//! `tokio::sync::RwLock`, shared with the game clock.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::config::TickMode;
use crate::game::dog::Direction;
use crate::game::loader::MapDef;
use crate::lobby::manager::{Game, GameError};
use crate::metrics::Metrics;
use crate::net::protocol::{
    parse_time_delta, parse_token, ApiError, ApiRequest, ApiResponse, DogState, JoinResponse,
    MapSummary, PlayerEntry,
};

/// Game shared between the handler and the clock
pub type SharedGame = Arc<RwLock<Game>>;

#[derive(Clone)]
pub struct ApiHandler {
    game: SharedGame,
    tick_mode: TickMode,
    metrics: Arc<Metrics>,
}

impl ApiHandler {
    pub fn new(game: SharedGame, tick_mode: TickMode, metrics: Arc<Metrics>) -> Self {
        Self {
            game,
            tick_mode,
            metrics,
        }
    }

    pub fn game(&self) -> &SharedGame {
        &self.game
    }

    pub fn tick_mode(&self) -> TickMode {
        self.tick_mode
    }

    /// Parse and handle a raw JSON request
    pub async fn handle_json(&self, body: &str) -> Result<ApiResponse, ApiError> {
        match ApiRequest::from_json(body) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                self.metrics.record_request();
                self.metrics.record_request_error(false);
                debug!("Rejected malformed request: {}", e);
                Err(e)
            }
        }
    }

    pub async fn handle(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.metrics.record_request();
        let kind = request.kind();

        let result = self.dispatch(request).await;

        if let Err(e) = &result {
            let internal = e.is_internal_fault();
            self.metrics.record_request_error(internal);
            if internal {
                error!("{} request hit a game invariant violation: {}", kind, e);
            } else {
                debug!("{} request failed: {} ({})", kind, e, e.code());
            }
        }
        result
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        match request {
            ApiRequest::GetMaps => {
                let game = self.game.read().await;
                Ok(ApiResponse::Maps(
                    game.maps().iter().map(MapSummary::from).collect(),
                ))
            }
            ApiRequest::GetMap { id } => {
                let game = self.game.read().await;
                let map = game
                    .find_map(&id)
                    .ok_or(GameError::MapNotFound(id))?;
                Ok(ApiResponse::Map(MapDef::from(map)))
            }
            ApiRequest::Join { map_id, user_name } => {
                let mut game = self.game.write().await;
                let joined = game.join(&map_id, &user_name)?;
                self.metrics.record_join();
                self.metrics
                    .set_population(game.session_count(), game.player_count());
                Ok(ApiResponse::Joined(JoinResponse {
                    auth_token: joined.token,
                    player_id: joined.player_id,
                }))
            }
            ApiRequest::ListPlayers { token } => {
                let token = parse_token(&token)?;
                let game = self.game.read().await;
                let players = game.list_players(&token)?;
                Ok(ApiResponse::Players(
                    players.iter().map(PlayerEntry::from).collect(),
                ))
            }
            ApiRequest::GetState { token } => {
                let token = parse_token(&token)?;
                let game = self.game.read().await;
                let players = game
                    .state(&token)?
                    .iter()
                    .map(|(id, snapshot)| DogState::new(*id, snapshot))
                    .collect();
                Ok(ApiResponse::State { players })
            }
            ApiRequest::SetDirection { token, direction } => {
                let token = parse_token(&token)?;
                let direction = Direction::from_str(&direction).map_err(GameError::from)?;
                self.game.write().await.set_direction(&token, direction)?;
                Ok(ApiResponse::Ok {})
            }
            ApiRequest::Tick { time_delta } => {
                if self.tick_mode.is_periodic() {
                    return Err(ApiError::TickNotPermitted);
                }
                let dt = parse_time_delta(time_delta.as_ref())?;

                let started = Instant::now();
                let report = self.game.write().await.advance(dt);
                self.metrics.record_advance(started.elapsed(), report);
                Ok(ApiResponse::Ok {})
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::loader::parse_game;
    use crate::lobby::manager::GameSettings;
    use crate::net::token::{PlayerToken, SequentialTokenSource};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const CONFIG: &str = r#"{
        "defaultDogSpeed": 2.0,
        "maps": [
            {
                "id": "map1",
                "name": "Map 1",
                "roads": [
                    { "x0": 0, "y0": 0, "x1": 10 },
                    { "x0": 4, "y0": -5, "y1": 5 }
                ],
                "offices": [ { "id": "o0", "x": 10, "y": 0, "offsetX": 1, "offsetY": 1 } ]
            }
        ]
    }"#;

    fn handler(tick_mode: TickMode) -> ApiHandler {
        let loaded = parse_game(CONFIG).unwrap();
        let game = Game::from_loaded(loaded, GameSettings::default())
            .unwrap()
            .with_token_source(Box::new(SequentialTokenSource::new()));
        ApiHandler::new(
            Arc::new(RwLock::new(game)),
            tick_mode,
            Arc::new(Metrics::new()),
        )
    }

    async fn join(handler: &ApiHandler, name: &str) -> JoinResponse {
        let request = ApiRequest::Join {
            map_id: "map1".into(),
            user_name: name.into(),
        };
        match handler.handle(request).await.unwrap() {
            ApiResponse::Joined(joined) => joined,
            other => panic!("unexpected response {other:?}"),
        }
    }

    async fn state(handler: &ApiHandler, token: &PlayerToken) -> Vec<DogState> {
        let request = ApiRequest::GetState {
            token: token.to_string(),
        };
        match handler.handle(request).await.unwrap() {
            ApiResponse::State { players } => players,
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_join_and_list_players() {
        let handler = handler(TickMode::External);
        let a = join(&handler, "a").await;
        let b = join(&handler, "b").await;
        assert_eq!((a.player_id, b.player_id), (0, 1));

        let response = handler
            .handle(ApiRequest::ListPlayers {
                token: format!("Bearer {}", a.auth_token),
            })
            .await
            .unwrap();

        assert_eq!(
            response,
            ApiResponse::Players(vec![
                PlayerEntry { id: 0, name: "a".into() },
                PlayerEntry { id: 1, name: "b".into() },
            ])
        );
        assert_eq!(handler.metrics.joins.load(Ordering::Relaxed), 2);
        assert_eq!(handler.metrics.players.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_rejoin_returns_same_token() {
        let handler = handler(TickMode::External);
        let first = join(&handler, "Rex").await;
        let second = join(&handler, "Rex").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_move_and_tick() {
        let handler = handler(TickMode::External);
        let joined = join(&handler, "a").await;

        handler
            .handle_json(&format!(
                r#"{{"type": "setDirection", "token": "{}", "move": "R"}}"#,
                joined.auth_token
            ))
            .await
            .unwrap();
        handler
            .handle_json(r#"{"type": "tick", "timeDelta": 1500}"#)
            .await
            .unwrap();

        let players = state(&handler, &joined.auth_token).await;
        assert_eq!(players[0].pos, [3.0, 0.0]);
        assert_eq!(players[0].speed, [2.0, 0.0]);
        assert_eq!(players[0].dir, "R");
    }

    #[tokio::test]
    async fn test_stopped_dog_reports_up() {
        let handler = handler(TickMode::External);
        let joined = join(&handler, "a").await;

        for direction in ["R", ""] {
            handler
                .handle(ApiRequest::SetDirection {
                    token: joined.auth_token.to_string(),
                    direction: direction.into(),
                })
                .await
                .unwrap();
        }

        let players = state(&handler, &joined.auth_token).await;
        assert_eq!(players[0].speed, [0.0, 0.0]);
        assert_eq!(players[0].dir, "U");
    }

    #[tokio::test]
    async fn test_bad_delta_leaves_state_unchanged() {
        let handler = handler(TickMode::External);
        let joined = join(&handler, "a").await;
        handler
            .handle(ApiRequest::SetDirection {
                token: joined.auth_token.to_string(),
                direction: "R".into(),
            })
            .await
            .unwrap();
        let before = state(&handler, &joined.auth_token).await;

        for body in [
            r#"{"type": "tick"}"#,
            r#"{"type": "tick", "timeDelta": "soon"}"#,
            r#"{"type": "tick", "timeDelta": -10}"#,
        ] {
            let err = handler.handle_json(body).await.unwrap_err();
            assert_eq!(err, ApiError::Game(GameError::BadDeltaTime));
        }

        assert_eq!(state(&handler, &joined.auth_token).await, before);
        assert_eq!(handler.metrics.tick_count.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_tick_rejected_with_periodic_clock() {
        let handler = handler(TickMode::Periodic(Duration::from_millis(50)));
        let err = handler
            .handle(ApiRequest::Tick {
                time_delta: Some(json!(100)),
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::TickNotPermitted);
    }

    #[tokio::test]
    async fn test_token_errors() {
        let handler = handler(TickMode::External);
        join(&handler, "a").await;

        let err = handler
            .handle(ApiRequest::GetState {
                token: "garbage".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalidToken");

        let err = handler
            .handle(ApiRequest::GetState {
                token: PlayerToken::generate().to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unknownToken");
        assert_eq!(handler.metrics.request_errors.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_invalid_direction() {
        let handler = handler(TickMode::External);
        let joined = join(&handler, "a").await;
        let err = handler
            .handle(ApiRequest::SetDirection {
                token: joined.auth_token.to_string(),
                direction: "X".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Game(GameError::InvalidDirection("X".into())));
    }

    #[tokio::test]
    async fn test_join_errors() {
        let handler = handler(TickMode::External);
        let err = handler
            .handle(ApiRequest::Join {
                map_id: "nowhere".into(),
                user_name: "a".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "mapNotFound");

        let err = handler
            .handle(ApiRequest::Join {
                map_id: "map1".into(),
                user_name: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalidArgument");
    }

    #[tokio::test]
    async fn test_map_queries() {
        let handler = handler(TickMode::External);

        let response = handler.handle(ApiRequest::GetMaps).await.unwrap();
        assert_eq!(
            response,
            ApiResponse::Maps(vec![MapSummary {
                id: "map1".into(),
                name: "Map 1".into()
            }])
        );

        let response = handler
            .handle(ApiRequest::GetMap { id: "map1".into() })
            .await
            .unwrap();
        match response {
            ApiResponse::Map(def) => {
                assert_eq!(def.roads.len(), 2);
                assert_eq!(def.offices[0].id, "o0");
            }
            other => panic!("unexpected response {other:?}"),
        }

        let err = handler
            .handle(ApiRequest::GetMap { id: "nope".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "mapNotFound");
    }

    #[test]
    fn test_handle_from_sync_context() {
        let handler = handler(TickMode::External);
        let response = tokio_test::block_on(handler.handle_json(r#"{"type": "getMaps"}"#));
        assert!(matches!(response, Ok(ApiResponse::Maps(maps)) if maps.len() == 1));

        let err = tokio_test::block_on(handler.handle_json("{")).unwrap_err();
        assert_eq!(err.code(), "badRequest");
    }
}
