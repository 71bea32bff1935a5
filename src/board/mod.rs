pub mod generator;
pub mod pathfind;
pub mod tiles;
