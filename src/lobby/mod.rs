//! Players, per-map sessions and the game registry
//!
//! Sessions are created lazily on the first join to a map and, like players,
//! live for the whole process.

pub mod manager;
pub mod player;
pub mod session;
