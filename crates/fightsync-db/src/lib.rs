pub mod config;
pub mod database;
mod error;
pub mod event_repository;
pub mod fight_repository;
pub mod fighter_repository;
pub mod store;

pub use config::DatabaseConfig;
pub use database::Database;
pub use event_repository::EventRepository;
pub use fight_repository::FightRepository;
pub use fighter_repository::FighterRepository;
pub use store::PgSyncStore;
