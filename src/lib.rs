//! Core engine for a personality-themed party board game: board generation
//! over two topologies, stack-gated pathfinding, the turn state machine,
//! peer-review scoring, speculative task prefetching, and bot drivers.

pub mod board;
pub mod engine;
pub mod persona;
pub mod tasks;
