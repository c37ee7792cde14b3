// Archivo: enqueue.rs
// Propósito: alta de solicitudes. La solicitud y su entrada en `cola` se
// persisten en una sola transacción; recién después del commit se publica el
// mensaje en la cola rápida.
use primos_domain::{FastQueue, JobError, JobMessage, JobRepository, NewRequest, Result};
use std::sync::Arc;
use uuid::Uuid;

pub struct EnqueueCoordinator<R, Q>
    where R: JobRepository + ?Sized,
          Q: FastQueue + ?Sized
{
    repo: Arc<R>,
    queue: Arc<Q>,
}

impl<R, Q> EnqueueCoordinator<R, Q>
    where R: JobRepository + ?Sized,
          Q: FastQueue + ?Sized
{
    pub fn new(repo: Arc<R>, queue: Arc<Q>) -> Self {
        Self { repo, queue }
    }

    /// Valida, persiste y publica. Devuelve el id de la nueva solicitud.
    ///
    /// - `JobError::Validation` si los parámetros están fuera de rango; en ese
    ///   caso no se toca el almacenamiento.
    /// - `JobError::Dispatch` si la solicitud quedó persistida pero la
    ///   publicación falló. La entrada durable permite recuperarla.
    pub fn submit(&self, cantidad: i64, digitos: i64) -> Result<Uuid> {
        let params = NewRequest::new(cantidad, digitos)?;
        let id = self.repo.create_request(&params)?;
        let message = JobMessage::new(id, &params);
        if let Err(e) = self.queue.publish(&message) {
            log::warn!("solicitud {} persistida pero no publicada: {}", id, e);
            return Err(JobError::Dispatch { id, reason: e.to_string() });
        }
        log::info!("solicitud {} encolada (cantidad={}, digitos={})", id, params.cantidad(), params.digitos());
        Ok(id)
    }
}
