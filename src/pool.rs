// Archivo: pool.rs
// Propósito: arranca `workers` bucles de worker en hilos dedicados que
// comparten los pools de conexiones y una bandera de parada.
use crate::config::WorkerConfig;
use primos_domain::{FastQueue, JobRepository};
use primos_worker::WorkerLoop;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct WorkerPool {
    handles: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    pub fn spawn(repo: Arc<dyn JobRepository>,
                 queue: Arc<dyn FastQueue>,
                 config: &WorkerConfig,
                 stop: Arc<AtomicBool>)
                 -> anyhow::Result<Self> {
        let mut handles = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let (repo, queue, stop) = (repo.clone(), queue.clone(), stop.clone());
            let loop_config = config.loop_config.clone();
            let handle = thread::Builder::new().name(format!("primos-worker-{}", worker_id))
                                               .spawn(move || WorkerLoop::new(repo, queue, loop_config).run(&stop))?;
            handles.push(handle);
        }
        tracing::info!("{} workers iniciados (modo {})", config.workers, config.loop_config.mode);
        Ok(Self { handles })
    }

    /// Espera a que todos los hilos terminen y devuelve los trabajos
    /// procesados en total.
    pub fn join(self) -> usize {
        let mut total = 0;
        for handle in self.handles {
            match handle.join() {
                Ok(n) => total += n,
                Err(_) => tracing::error!("un hilo de worker terminó con pánico"),
            }
        }
        total
    }
}
