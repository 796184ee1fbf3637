use crate::game::dog::Dog;
use crate::net::token::PlayerToken;

/// Player id, dense and sequential within a session
pub type PlayerId = u32;

/// A joined player and the dog it steers
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub token: PlayerToken,
    pub dog: Dog,
}

impl Player {
    pub fn new(id: PlayerId, name: String, token: PlayerToken, dog: Dog) -> Self {
        Self {
            id,
            name,
            token,
            dog,
        }
    }
}
