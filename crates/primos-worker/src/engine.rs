// Archivo: engine.rs
// Propósito: bucle de worker. Obtiene un trabajo, genera candidatos hasta
// que la solicitud alcanza su cantidad y libera la entrada de `cola`.
use crate::committer::ResultCommitter;
use crate::config::LoopConfig;
use crate::dequeue::{DequeueCoordinator, DequeueStrategy};
use primos_domain::{is_probable_prime, CandidateGenerator, CommitOutcome, FastQueue, Job, JobError, JobRepository,
                    Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

/// Resultado de un intento de búsqueda (generar, probar, registrar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep {
    Accepted(u64),
    RejectedComposite,
    RejectedDuplicate,
    StoreFailed(JobError),
    /// El almacenamiento informó que la solicitud ya estaba completa.
    Completed,
}

/// Resumen de un trabajo procesado.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub solicitud_id: Uuid,
    pub found: u32,
    pub composites: u64,
    pub duplicates: u64,
    pub store_failures: u64,
    /// La solicitud alcanzó `cantidad`.
    pub completed: bool,
    /// Se abandonó por superar el límite de duplicados seguidos.
    pub exhausted: bool,
}

/// Bucle de un worker. Cada instancia posee su propio generador de
/// candidatos; las instancias comparten repositorio y cola.
pub struct WorkerLoop<R, Q>
    where R: JobRepository + ?Sized,
          Q: FastQueue + ?Sized
{
    repo: Arc<R>,
    dequeue: DequeueCoordinator<R, Q>,
    committer: ResultCommitter<R>,
    generator: CandidateGenerator,
    config: LoopConfig,
}

impl<R, Q> WorkerLoop<R, Q>
    where R: JobRepository + ?Sized,
          Q: FastQueue + ?Sized
{
    pub fn new(repo: Arc<R>, queue: Arc<Q>, config: LoopConfig) -> Self {
        Self::with_generator(repo, queue, config, CandidateGenerator::new())
    }

    pub fn with_generator(repo: Arc<R>, queue: Arc<Q>, config: LoopConfig, generator: CandidateGenerator) -> Self {
        let dequeue = DequeueCoordinator::new(config.mode, repo.clone(), queue, config.pop_timeout);
        let committer = ResultCommitter::new(repo.clone());
        Self { repo, dequeue, committer, generator, config }
    }

    /// Un intento: genera un candidato, lo prueba y, si es primo, lo registra.
    /// Sólo falla si `job.digitos` está fuera de rango.
    pub fn step(&mut self, job: &Job) -> Result<SearchStep> {
        let candidate = self.generator.generate(job.digitos)?;
        if !is_probable_prime(candidate) {
            return Ok(SearchStep::RejectedComposite);
        }
        let step = match self.committer.commit(&job.solicitud_id, candidate) {
            Ok(CommitOutcome::Inserted) => SearchStep::Accepted(candidate),
            Ok(CommitOutcome::DuplicateRejected) => SearchStep::RejectedDuplicate,
            Ok(CommitOutcome::RequestComplete) => SearchStep::Completed,
            Err(e) => SearchStep::StoreFailed(e),
        };
        Ok(step)
    }

    /// Repite `op` mientras falle con un error transitorio y `stop` no esté
    /// activo, durmiendo `backoff` entre intentos.
    fn retry<T, F>(&self, stop: &AtomicBool, what: &str, mut op: F) -> Result<T>
        where F: FnMut(&R) -> Result<T>
    {
        loop {
            match op(&*self.repo) {
                Err(e) if e.is_transient() && !stop.load(Ordering::SeqCst) => {
                    log::warn!("{} falló, reintentando en {:?}: {}", what, self.config.backoff, e);
                    thread::sleep(self.config.backoff);
                }
                other => return other,
            }
        }
    }

    /// Procesa un trabajo ya reclamado hasta completarlo.
    ///
    /// El progreso arranca desde los resultados ya guardados, de modo que un
    /// trabajo reclamado de nuevo continúa donde quedó. Las lecturas iniciales
    /// y el `mark_done` final se reintentan ante errores transitorios hasta
    /// que `stop` se active; la entrada de `cola` sigue reclamada mientras
    /// tanto.
    pub fn run_job(&mut self, job: &Job, stop: &AtomicBool) -> Result<JobReport> {
        let mut report = JobReport { solicitud_id: job.solicitud_id, ..Default::default() };
        let id = job.solicitud_id;
        if self.retry(stop, "lectura de solicitud", |repo| repo.get_request(&id))?.is_none() {
            log::warn!("{} ignorado: la solicitud no existe", job);
            return Ok(report);
        }
        let mut progress = self.retry(stop, "conteo de resultados", |repo| repo.count_results(&id))?;
        let mut duplicate_streak = 0u64;
        while progress < job.cantidad {
            match self.step(job)? {
                SearchStep::Accepted(primo) => {
                    progress += 1;
                    report.found += 1;
                    duplicate_streak = 0;
                    log::debug!("solicitud {}: primo {} ({}/{})", job.solicitud_id, primo, progress, job.cantidad);
                }
                SearchStep::RejectedComposite => report.composites += 1,
                SearchStep::RejectedDuplicate => {
                    report.duplicates += 1;
                    duplicate_streak += 1;
                    log::debug!("solicitud {}: primo duplicado", job.solicitud_id);
                    if duplicate_streak >= self.config.duplicate_streak_limit {
                        log::warn!("solicitud {}: {} duplicados seguidos, no quedan primos distintos de {} dígitos",
                                   job.solicitud_id,
                                   duplicate_streak,
                                   job.digitos);
                        report.exhausted = true;
                        break;
                    }
                }
                SearchStep::StoreFailed(e) => {
                    report.store_failures += 1;
                    log::warn!("solicitud {}: candidato descartado por error de almacenamiento: {}", job.solicitud_id, e);
                    thread::sleep(self.config.backoff);
                }
                SearchStep::Completed => {
                    progress = job.cantidad;
                }
            }
        }
        report.completed = progress >= job.cantidad;
        if let Some(handle) = job.handle {
            if let Err(e) = self.retry(stop, "mark_done", |repo| repo.mark_done(&handle)) {
                // La entrada queda reclamada; los resultados ya están guardados.
                log::error!("no se pudo eliminar la entrada {} de cola: {}", handle, e);
            }
        }
        log::info!("solicitud {} terminada: {} nuevos, {} compuestos, {} duplicados",
                   job.solicitud_id,
                   report.found,
                   report.composites,
                   report.duplicates);
        Ok(report)
    }

    /// Obtiene y procesa un trabajo. `Ok(None)` si no había trabajo.
    pub fn run_once(&mut self, stop: &AtomicBool) -> Result<Option<JobReport>> {
        match self.dequeue.next_job()? {
            None => Ok(None),
            Some(job) => {
                log::info!("trabajo recibido: {}", job);
                self.run_job(&job, stop).map(Some)
            }
        }
    }

    /// Bucle principal: procesa trabajos hasta que `stop` se active. Los
    /// errores transitorios provocan una pausa de `backoff` y un reintento.
    /// Devuelve la cantidad de trabajos procesados.
    pub fn run(&mut self, stop: &AtomicBool) -> usize {
        let mut processed = 0usize;
        while !stop.load(Ordering::SeqCst) {
            match self.run_once(stop) {
                Ok(Some(_)) => processed += 1,
                Ok(None) => {}
                Err(e) => {
                    log::warn!("error en el worker, reintentando en {:?}: {}", self.config.backoff, e);
                    thread::sleep(self.config.backoff);
                }
            }
        }
        log::info!("worker detenido tras {} trabajos (modo {})", processed, self.dequeue.mode());
        processed
    }
}
