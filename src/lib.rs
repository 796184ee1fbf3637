//! Dog Patrol Server Library
//!
//! Multiplayer simulation of dogs moving along the road grid of
//! JSON-configured maps. Players join a map, steer their dog and query the
//! shared state; time advances on a server clock or on explicit requests.

pub mod config;
pub mod game;
pub mod lobby;
pub mod metrics;
pub mod net;
pub mod util;
