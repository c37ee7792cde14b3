// Archivo: dequeue.rs
// Propósito: estrategias para obtener un trabajo y el coordinador que las
// combina según `DequeueMode`.
//
// La entrada de `cola` es la autoridad sobre la propiedad de un trabajo: un
// mensaje de la cola rápida sólo se procesa si el worker logra reclamar la
// entrada durable de esa solicitud.
use crate::config::DequeueMode;
use primos_domain::{FastQueue, Job, JobError, JobMessage, JobRepository, Result};
use std::sync::Arc;
use std::time::Duration;

/// Fuente de trabajos. `Ok(None)` significa "no hay trabajo por ahora".
pub trait DequeueStrategy: Send + Sync {
    fn next_job(&self) -> Result<Option<Job>>;
}

/// Pop bloqueante sobre la cola rápida. Los trabajos salen sin `handle`.
pub struct FastDequeue<Q>
    where Q: FastQueue + ?Sized
{
    queue: Arc<Q>,
    timeout: Duration,
}

impl<Q> FastDequeue<Q> where Q: FastQueue + ?Sized
{
    pub fn new(queue: Arc<Q>, timeout: Duration) -> Self {
        Self { queue, timeout }
    }
}

impl<Q> DequeueStrategy for FastDequeue<Q> where Q: FastQueue + ?Sized
{
    /// Un mensaje mal formado devuelve `JobError::Protocol`; el mensaje ya
    /// salió de la lista, así que el llamador sólo debe registrarlo.
    fn next_job(&self) -> Result<Option<Job>> {
        match self.queue.pop(self.timeout)? {
            None => Ok(None),
            Some(raw) => Ok(Some(raw.parse::<JobMessage>()?.into_job())),
        }
    }
}

/// Reclamo `SKIP LOCKED` sobre la cola durable. Los trabajos traen `handle`.
pub struct DurableDequeue<R>
    where R: JobRepository + ?Sized
{
    repo: Arc<R>,
}

impl<R> DurableDequeue<R> where R: JobRepository + ?Sized
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R> DequeueStrategy for DurableDequeue<R> where R: JobRepository + ?Sized
{
    fn next_job(&self) -> Result<Option<Job>> {
        Ok(self.repo.claim_next()?.map(Job::from))
    }
}

/// Combina ambas estrategias.
///
/// - `Fast`: pop + confirmación con `claim_for_request`.
/// - `Durable`: sólo `claim_next`; si no hay trabajo espera `idle_wait`.
/// - `Both`: como `Fast`, y al vencer la espera del pop o si la cola rápida
///   falla intenta `claim_next`.
pub struct DequeueCoordinator<R, Q>
    where R: JobRepository + ?Sized,
          Q: FastQueue + ?Sized
{
    mode: DequeueMode,
    repo: Arc<R>,
    fast: FastDequeue<Q>,
    durable: DurableDequeue<R>,
    idle_wait: Duration,
}

impl<R, Q> DequeueCoordinator<R, Q>
    where R: JobRepository + ?Sized,
          Q: FastQueue + ?Sized
{
    pub fn new(mode: DequeueMode, repo: Arc<R>, queue: Arc<Q>, pop_timeout: Duration) -> Self {
        Self { mode,
               repo: repo.clone(),
               fast: FastDequeue::new(queue, pop_timeout),
               durable: DurableDequeue::new(repo),
               idle_wait: pop_timeout }
    }

    pub fn mode(&self) -> DequeueMode {
        self.mode
    }

    /// Camino rápido. `Ok(None)` tanto si venció la espera como si el mensaje
    /// resultó obsoleto o ilegible; `timed_out` distingue el primer caso.
    fn next_fast(&self) -> Result<(Option<Job>, bool)> {
        let job = match self.fast.next_job() {
            Ok(Some(job)) => job,
            Ok(None) => return Ok((None, true)),
            Err(JobError::Protocol(reason)) => {
                log::warn!("mensaje descartado: {}", reason);
                return Ok((None, false));
            }
            Err(e) => return Err(e),
        };
        match self.repo.claim_for_request(&job.solicitud_id) {
            Ok(Some(entry)) => Ok((Some(Job::from(entry)), false)),
            Ok(None) => {
                log::debug!("mensaje obsoleto para solicitud {}: la entrada ya fue reclamada", job.solicitud_id);
                Ok((None, false))
            }
            Err(e) => {
                // El mensaje ya salió de la lista: se devuelve para no perderlo.
                let message = JobMessage { solicitud_id: job.solicitud_id, cantidad: job.cantidad, digitos: job.digitos };
                if let Err(publish_err) = self.fast.queue.publish(&message) {
                    log::error!("no se pudo republicar el mensaje {}: {}", message, publish_err);
                }
                Err(e)
            }
        }
    }
}

impl<R, Q> DequeueStrategy for DequeueCoordinator<R, Q>
    where R: JobRepository + ?Sized,
          Q: FastQueue + ?Sized
{
    fn next_job(&self) -> Result<Option<Job>> {
        match self.mode {
            DequeueMode::Fast => Ok(self.next_fast()?.0),
            DequeueMode::Both => match self.next_fast() {
                Ok((Some(job), _)) => Ok(Some(job)),
                Ok((None, true)) => self.durable.next_job(),
                Ok((None, false)) => Ok(None),
                // Con la cola rápida caída la cola durable sigue atendiendo.
                // Sin trabajo se propaga el error para que el bucle espere.
                Err(e) if e.is_transient() => {
                    log::warn!("camino rápido no disponible, usando la cola durable: {}", e);
                    match self.durable.next_job()? {
                        Some(job) => Ok(Some(job)),
                        None => Err(e),
                    }
                }
                Err(e) => Err(e),
            },
            DequeueMode::Durable => {
                let job = self.durable.next_job()?;
                if job.is_none() {
                    std::thread::sleep(self.idle_wait);
                }
                Ok(job)
            }
        }
    }
}
