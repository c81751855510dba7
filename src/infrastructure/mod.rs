pub mod config;
pub mod db;
pub mod repositories;
pub mod seed;
pub mod server;
pub mod state;

pub use repositories::{SeaOrmBookRepository, SeaOrmMemberRepository};
pub use state::AppState;
