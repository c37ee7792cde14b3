//! Persistencia Postgres para la cola de primos.
//! Expone el módulo `schema` y el repositorio Diesel que implementa
//! `primos_domain::JobRepository`. Las migraciones se aplican al construir
//! el repositorio.

mod job_persistence;
pub mod schema;

pub use job_persistence::{database_url_from_env, DieselJobRepository, MIGRATIONS};
