pub mod adjacency;
pub mod constants;
pub mod dog;
pub mod loader;
pub mod map;
pub mod navigator;
