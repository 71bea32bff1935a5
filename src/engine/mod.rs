pub mod bot;
pub mod cache;
pub mod models;
pub mod scoring;
pub mod settings;
pub mod state;
pub mod turn;
