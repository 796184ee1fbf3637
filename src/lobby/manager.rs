use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::time::Duration;
use tracing::{debug, info};

use crate::game::constants::movement::DEFAULT_DOG_SPEED;
use crate::game::dog::{Direction, DogSnapshot};
use crate::game::loader::{LoadError, LoadedGame};
use crate::game::map::{Map, MapId};
use crate::game::navigator::NavigatorError;
use crate::lobby::player::{Player, PlayerId};
use crate::lobby::session::GameSession;
use crate::net::token::{PlayerToken, RandomTokenSource, TokenSource};

/// Startup settings that stay fixed for the life of the game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSettings {
    pub default_dog_speed: f64,
    pub randomize_spawn: bool,
    /// Seed for spawn placement; `None` draws from OS entropy
    pub spawn_seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            default_dog_speed: DEFAULT_DOG_SPEED,
            randomize_spawn: false,
            spawn_seed: None,
        }
    }
}

/// Where a token's player lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerHandle {
    pub session: usize,
    pub player: PlayerId,
}

/// Successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinResult {
    pub token: PlayerToken,
    pub player_id: PlayerId,
}

/// Outcome of one simulation step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub players: usize,
    pub failures: usize,
}

/// The game registry: loaded maps plus one session per map in use
pub struct Game {
    maps: Vec<Map>,
    map_index: HashMap<MapId, usize>,
    sessions: Vec<GameSession>,
    session_index: HashMap<MapId, usize>,
    settings: GameSettings,
    rng: StdRng,
    tokens: Box<dyn TokenSource>,
}

impl Game {
    /// Build a game over `maps`. Duplicate map ids are rejected.
    pub fn new(maps: Vec<Map>, settings: GameSettings) -> Result<Self, LoadError> {
        let mut map_index = HashMap::with_capacity(maps.len());
        for (i, map) in maps.iter().enumerate() {
            if map_index.insert(map.id().clone(), i).is_some() {
                return Err(LoadError::DuplicateMap(map.id().clone()));
            }
        }

        let rng = match settings.spawn_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            maps,
            map_index,
            sessions: Vec::new(),
            session_index: HashMap::new(),
            settings,
            rng,
            tokens: Box::new(RandomTokenSource),
        })
    }

    /// Build from a loaded config file; the file's default speed wins
    pub fn from_loaded(loaded: LoadedGame, settings: GameSettings) -> Result<Self, LoadError> {
        let settings = GameSettings {
            default_dog_speed: loaded.default_dog_speed,
            ..settings
        };
        Self::new(loaded.maps, settings)
    }

    /// Replace the token generator
    pub fn with_token_source(mut self, tokens: Box<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn join(&mut self, map_id: &str, name: &str) -> Result<JoinResult, GameError> {
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }
        let map_index = *self
            .map_index
            .get(map_id)
            .ok_or_else(|| GameError::MapNotFound(map_id.to_string()))?;

        let session_index = self.session_for(map_index);

        if let Some(player) = self.sessions[session_index].player_by_name(name) {
            debug!("{} already in {}, returning existing player", name, map_id);
            return Ok(JoinResult {
                token: player.token.clone(),
                player_id: player.id,
            });
        }

        let token = self.unique_token();

        let Self {
            maps,
            sessions,
            settings,
            rng,
            ..
        } = self;
        let player = sessions[session_index].join(
            name,
            &maps[map_index],
            settings.randomize_spawn,
            rng,
            token,
        )?;

        Ok(JoinResult {
            token: player.token.clone(),
            player_id: player.id,
        })
    }

    /// Advance every session by `dt`. Sessions run in parallel, players within
    /// a session in join order.
    pub fn advance(&mut self, dt: Duration) -> AdvanceReport {
        let maps = &self.maps;
        self.sessions
            .par_iter_mut()
            .map(|session| {
                let failures = session.advance(&maps[session.map_index()], dt);
                AdvanceReport {
                    players: session.player_count(),
                    failures,
                }
            })
            .reduce(AdvanceReport::default, |a, b| AdvanceReport {
                players: a.players + b.players,
                failures: a.failures + b.failures,
            })
    }

    /// Linear scan over every session's roster
    pub fn find_by_token(&self, token: &PlayerToken) -> Option<PlayerHandle> {
        self.sessions
            .iter()
            .enumerate()
            .find_map(|(i, session)| {
                session.player_by_token(token).map(|p| PlayerHandle {
                    session: i,
                    player: p.id,
                })
            })
    }

    /// Session of the token's owner
    pub fn session_of(&self, token: &PlayerToken) -> Result<&GameSession, GameError> {
        let handle = self.find_by_token(token).ok_or(GameError::UnknownToken)?;
        self.sessions
            .get(handle.session)
            .ok_or(GameError::InvalidSession)
    }

    /// Players sharing a session with the token's owner, in join order
    pub fn list_players(&self, token: &PlayerToken) -> Result<&[Player], GameError> {
        Ok(self.session_of(token)?.players())
    }

    /// Dog snapshots for the token owner's session, in join order
    pub fn state(&self, token: &PlayerToken) -> Result<Vec<(PlayerId, DogSnapshot)>, GameError> {
        Ok(self
            .session_of(token)?
            .players()
            .iter()
            .map(|p| (p.id, p.dog.snapshot()))
            .collect())
    }

    pub fn set_direction(
        &mut self,
        token: &PlayerToken,
        direction: Direction,
    ) -> Result<(), GameError> {
        let handle = self.find_by_token(token).ok_or(GameError::UnknownToken)?;
        let session = self
            .sessions
            .get_mut(handle.session)
            .ok_or(GameError::InvalidSession)?;
        let speed = self
            .maps
            .get(session.map_index())
            .and_then(Map::dog_speed)
            .filter(|speed| *speed > 0.0)
            .unwrap_or(self.settings.default_dog_speed);
        let player = session
            .player_mut(handle.player)
            .ok_or(GameError::PlayerAbsent)?;

        player.dog.set_speed(direction, speed);
        Ok(())
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn find_map(&self, id: &str) -> Option<&Map> {
        self.map_index.get(id).map(|&i| &self.maps[i])
    }

    pub fn sessions(&self) -> &[GameSession] {
        &self.sessions
    }

    pub fn session_for_map(&self, id: &str) -> Option<&GameSession> {
        self.session_index.get(id).map(|&i| &self.sessions[i])
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn player_count(&self) -> usize {
        self.sessions.iter().map(GameSession::player_count).sum()
    }

    fn session_for(&mut self, map_index: usize) -> usize {
        let map_id = self.maps[map_index].id();
        if let Some(&index) = self.session_index.get(map_id) {
            return index;
        }

        let index = self.sessions.len();
        self.sessions
            .push(GameSession::new(map_id.clone(), map_index));
        self.session_index.insert(map_id.clone(), index);
        info!("Created session for map {}", map_id);
        index
    }

    fn unique_token(&mut self) -> PlayerToken {
        loop {
            let token = self.tokens.next_token();
            if self.find_by_token(&token).is_none() {
                return token;
            }
            debug!("Token collision, generating another");
        }
    }
}

/// Game operation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Map {0} not found")]
    MapNotFound(String),
    #[error("Player name is empty")]
    EmptyName,
    #[error("Player token has not been found")]
    UnknownToken,
    #[error("Token resolves to no session")]
    InvalidSession,
    #[error("Invalid direction {0:?}")]
    InvalidDirection(String),
    #[error("Failed to parse tick request")]
    BadDeltaTime,
    #[error("Player missing from its session")]
    PlayerAbsent,
    #[error("Navigation failed: {0}")]
    Navigation(NavigatorError),
}

impl From<NavigatorError> for GameError {
    fn from(e: NavigatorError) -> Self {
        match e {
            NavigatorError::InvalidDirection(code) => GameError::InvalidDirection(code),
            other => GameError::Navigation(other),
        }
    }
}

impl GameError {
    /// Invariant violations inside the game rather than bad input
    pub fn is_internal_fault(&self) -> bool {
        matches!(
            self,
            GameError::InvalidSession | GameError::PlayerAbsent | GameError::Navigation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::{Point, Road};
    use crate::net::token::SequentialTokenSource;
    use crate::util::vec2::Vec2;

    fn road_map(id: &str, dog_speed: Option<f64>) -> Map {
        Map::new(
            MapId::new(id),
            format!("Map {id}"),
            vec![
                Road::horizontal(Point::new(0, 0), 10),
                Road::vertical(Point::new(4, -5), 5),
            ],
            vec![],
            vec![],
            dog_speed,
        )
        .unwrap()
    }

    fn game() -> Game {
        let settings = GameSettings {
            default_dog_speed: 2.0,
            randomize_spawn: false,
            spawn_seed: Some(1),
        };
        Game::new(vec![road_map("map1", None), road_map("town", Some(5.0))], settings)
            .unwrap()
            .with_token_source(Box::new(SequentialTokenSource::new()))
    }

    #[test]
    fn test_join_assigns_sequential_ids() {
        let mut game = game();
        let ids: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|name| game.join("map1", name).unwrap().player_id)
            .collect();

        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(game.session_count(), 1);
        assert_eq!(game.player_count(), 3);
    }

    #[test]
    fn test_rejoin_same_name_is_idempotent() {
        let mut game = game();
        let first = game.join("map1", "Rex").unwrap();
        let second = game.join("map1", "Rex").unwrap();

        assert_eq!(first, second);
        assert_eq!(game.player_count(), 1);
    }

    #[test]
    fn test_same_name_on_other_map_is_new_player() {
        let mut game = game();
        let a = game.join("map1", "Rex").unwrap();
        let b = game.join("town", "Rex").unwrap();

        assert_ne!(a.token, b.token);
        assert_eq!(b.player_id, 0);
        assert_eq!(game.session_count(), 2);
    }

    #[test]
    fn test_join_errors() {
        let mut game = game();
        assert_eq!(game.join("nowhere", "Rex"), Err(GameError::MapNotFound("nowhere".into())));
        assert_eq!(game.join("map1", ""), Err(GameError::EmptyName));
        // Empty name is reported before the unknown map
        assert_eq!(game.join("nowhere", ""), Err(GameError::EmptyName));
        assert_eq!(game.session_count(), 0);
    }

    #[test]
    fn test_tokens_unique_across_game() {
        let mut game = game();
        let a = game.join("map1", "a").unwrap();

        // Restarting the counter forces a collision with the first token
        game.tokens = Box::new(SequentialTokenSource::new());
        let b = game.join("town", "b").unwrap();

        assert_ne!(a.token, b.token);
        assert_eq!(game.find_by_token(&b.token), Some(PlayerHandle { session: 1, player: 0 }));
    }

    #[test]
    fn test_unknown_token() {
        let game = game();
        let token = PlayerToken::generate();
        assert!(game.find_by_token(&token).is_none());
        assert_eq!(game.list_players(&token).unwrap_err(), GameError::UnknownToken);
        assert_eq!(game.state(&token).unwrap_err(), GameError::UnknownToken);
    }

    #[test]
    fn test_list_players_is_session_scoped() {
        let mut game = game();
        let a = game.join("map1", "a").unwrap();
        game.join("map1", "b").unwrap();
        game.join("town", "c").unwrap();

        let names: Vec<_> = game
            .list_players(&a.token)
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_set_direction_uses_default_speed() {
        let mut game = game();
        let joined = game.join("map1", "a").unwrap();
        game.set_direction(&joined.token, Direction::East).unwrap();

        let state = game.state(&joined.token).unwrap();
        assert_eq!(state[0].1.velocity, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_set_direction_uses_map_speed() {
        let mut game = game();
        let joined = game.join("town", "a").unwrap();
        game.set_direction(&joined.token, Direction::East).unwrap();

        game.advance(Duration::from_millis(1000));

        let state = game.state(&joined.token).unwrap();
        assert_eq!(state[0].1.position, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_zero_map_speed_falls_back_to_default() {
        let settings = GameSettings {
            default_dog_speed: 2.0,
            ..GameSettings::default()
        };
        let mut game = Game::new(vec![road_map("still", Some(0.0))], settings).unwrap();
        let joined = game.join("still", "a").unwrap();
        game.set_direction(&joined.token, Direction::East).unwrap();

        game.advance(Duration::from_millis(1000));

        let state = game.state(&joined.token).unwrap();
        assert_eq!(state[0].1.position, Vec2::new(2.0, 0.0));
        assert_eq!(state[0].1.velocity, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_stop_zeroes_velocity() {
        let mut game = game();
        let joined = game.join("map1", "a").unwrap();
        game.set_direction(&joined.token, Direction::East).unwrap();
        game.set_direction(&joined.token, Direction::Stop).unwrap();

        let state = game.state(&joined.token).unwrap();
        assert_eq!(state[0].1.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_advance_all_sessions() {
        let mut game = game();
        let a = game.join("map1", "a").unwrap();
        let b = game.join("town", "b").unwrap();
        game.set_direction(&a.token, Direction::East).unwrap();
        game.set_direction(&b.token, Direction::East).unwrap();

        let report = game.advance(Duration::from_millis(500));

        assert_eq!(report, AdvanceReport { players: 2, failures: 0 });
        assert_eq!(game.state(&a.token).unwrap()[0].1.position, Vec2::new(1.0, 0.0));
        assert_eq!(game.state(&b.token).unwrap()[0].1.position, Vec2::new(2.5, 0.0));
    }

    #[test]
    fn test_duplicate_map_rejected() {
        let result = Game::new(
            vec![road_map("map1", None), road_map("map1", None)],
            GameSettings::default(),
        );
        assert!(matches!(result, Err(LoadError::DuplicateMap(_))));
    }

    #[test]
    fn test_find_map() {
        let game = game();
        assert_eq!(game.maps().len(), 2);
        assert_eq!(game.find_map("town").unwrap().dog_speed(), Some(5.0));
        assert!(game.find_map("nope").is_none());
        assert!(game.session_for_map("town").is_none());
    }

    #[test]
    fn test_navigator_error_conversion() {
        let e: GameError = NavigatorError::InvalidDirection("X".into()).into();
        assert_eq!(e, GameError::InvalidDirection("X".into()));
        assert!(!e.is_internal_fault());

        let e: GameError = NavigatorError::UnknownRoad(3).into();
        assert!(e.is_internal_fault());
    }
}
