// Archivo: service.rs
// Propósito: fachada de alto nivel que usa el adaptador HTTP: alta de
// solicitudes, consulta de estado y listado de resultados.
use crate::enqueue::EnqueueCoordinator;
use primos_domain::{FastQueue, JobRepository, PrimeRequest, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Servicio de solicitudes.
///
/// Las lecturas van siempre al almacenamiento durable; no hay caché.
pub struct PrimeService<R, Q>
    where R: JobRepository + ?Sized,
          Q: FastQueue + ?Sized
{
    repo: Arc<R>,
    enqueue: EnqueueCoordinator<R, Q>,
}

impl<R, Q> PrimeService<R, Q>
    where R: JobRepository + ?Sized,
          Q: FastQueue + ?Sized
{
    pub fn new(repo: Arc<R>, queue: Arc<Q>) -> Self {
        let enqueue = EnqueueCoordinator::new(repo.clone(), queue);
        Self { repo, enqueue }
    }

    pub fn submit(&self, cantidad: i64, digitos: i64) -> Result<Uuid> {
        self.enqueue.submit(cantidad, digitos)
    }

    /// `None` si el id no existe.
    pub fn status(&self, id: &Uuid) -> Result<Option<PrimeRequest>> {
        self.repo.get_request(id)
    }

    /// Primos encontrados en orden de descubrimiento. Un id desconocido da
    /// una lista vacía.
    pub fn results(&self, id: &Uuid) -> Result<Vec<String>> {
        self.repo.list_results(id)
    }
}
