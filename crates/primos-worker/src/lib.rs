//! Crate `primos-worker`: coordinación de la cola de primos.
//!
//! Contiene el alta de solicitudes (`EnqueueCoordinator`, `PrimeService`),
//! las estrategias de dequeue (`FastDequeue`, `DurableDequeue`,
//! `DequeueCoordinator`), el registro de resultados (`ResultCommitter`) y el
//! bucle de worker (`WorkerLoop`). Todo es genérico sobre los traits
//! `JobRepository` y `FastQueue` de `primos-domain`.
pub mod committer;
pub mod config;
pub mod dequeue;
pub mod engine;
pub mod enqueue;
pub mod service;

pub use committer::ResultCommitter;
pub use config::{DequeueMode, LoopConfig, UnknownMode, DEFAULT_BACKOFF, DEFAULT_DUPLICATE_STREAK_LIMIT,
                 DEFAULT_POP_TIMEOUT};
pub use dequeue::{DequeueCoordinator, DequeueStrategy, DurableDequeue, FastDequeue};
pub use engine::{JobReport, SearchStep, WorkerLoop};
pub use enqueue::EnqueueCoordinator;
pub use service::PrimeService;
