pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod game;
pub mod gateway;
pub mod links;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub db: db::Database,
    pub engine: std::sync::Arc<game::GameEngine>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
