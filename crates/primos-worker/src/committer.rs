// Archivo: committer.rs
use primos_domain::{CommitOutcome, JobRepository, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Registra primos encontrados. La inserción y el incremento de `generados`
/// ocurren en una sola transacción del repositorio.
pub struct ResultCommitter<R>
    where R: JobRepository + ?Sized
{
    repo: Arc<R>,
}

impl<R> ResultCommitter<R> where R: JobRepository + ?Sized
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn commit(&self, solicitud_id: &Uuid, primo: u64) -> Result<CommitOutcome> {
        self.repo.insert_result(solicitud_id, &primo.to_string())
    }
}
