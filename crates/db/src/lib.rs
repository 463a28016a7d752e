pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_lazy_with_settings, connect_with_settings, DbPool};
pub use repositories::{FileStorage, InMemoryStorage, SqlStorage};
