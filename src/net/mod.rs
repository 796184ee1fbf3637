pub mod game_loop;
pub mod handler;
pub mod protocol;
pub mod token;
