//! Per-map game session
//!
//! A session owns the roster of players on one map. Players are never
//! removed, so a player's id is also its index in the roster.

use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::game::dog::Dog;
use crate::game::map::{Map, MapId};
use crate::lobby::manager::GameError;
use crate::lobby::player::{Player, PlayerId};
use crate::net::token::PlayerToken;

#[derive(Debug, Clone)]
pub struct GameSession {
    map_id: MapId,
    /// Index of the map in the owning game's map list
    map_index: usize,
    players: Vec<Player>,
}

impl GameSession {
    pub fn new(map_id: MapId, map_index: usize) -> Self {
        Self {
            map_id,
            map_index,
            players: Vec::new(),
        }
    }

    pub fn map_id(&self) -> &MapId {
        &self.map_id
    }

    pub fn map_index(&self) -> usize {
        self.map_index
    }

    /// Join by name. An existing player with the same name is returned as is
    /// and `token` is dropped unused.
    pub fn join<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        map: &Map,
        randomize: bool,
        rng: &mut R,
        token: PlayerToken,
    ) -> Result<&Player, GameError> {
        if let Some(index) = self.players.iter().position(|p| p.name == name) {
            debug!("{} rejoined session {}", name, self.map_id);
            return Ok(&self.players[index]);
        }

        let id = self.players.len() as PlayerId;
        let dog = Dog::spawn(map, randomize, rng)?;
        let position = dog.position();
        self.players
            .push(Player::new(id, name.to_string(), token, dog));

        info!(
            "Player {} ({}) joined {} at ({:.2}, {:.2})",
            id, name, self.map_id, position.x, position.y
        );

        self.players.last().ok_or(GameError::PlayerAbsent)
    }

    /// Move every dog in join order. Returns the number of dogs that failed
    /// to move; a failure leaves that dog where it was.
    pub fn advance(&mut self, map: &Map, dt: Duration) -> usize {
        let mut failures = 0;
        for player in &mut self.players {
            if let Err(e) = player.dog.move_by(map, dt) {
                warn!(
                    "Dog of player {} in {} failed to move: {}",
                    player.id, self.map_id, e
                );
                failures += 1;
            }
        }
        failures
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize).filter(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id as usize).filter(|p| p.id == id)
    }

    pub fn player_by_token(&self, token: &PlayerToken) -> Option<&Player> {
        self.players.iter().find(|p| &p.token == token)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
