pub mod connection_pool;
pub mod encounter_service;
pub mod error;
pub mod migration_runner;
pub mod repository;

pub use encounter_service::{DefaultEncounterService, EncounterService};
pub use error::{QueryError, QueryResult};
pub use repository::{Repository, SqliteRepository};

#[cfg(test)]
pub use encounter_service::MockEncounterService;
