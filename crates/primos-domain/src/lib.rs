//! Crate `primos-domain`: tipos y contratos de la cola de trabajos de primos.
//!
//! Define la solicitud (`PrimeRequest`), la entrada de la cola durable
//! (`QueueEntry`), el descriptor de trabajo (`Job`), el formato del mensaje de
//! la cola rápida (`JobMessage`), el oráculo de primalidad, el generador de
//! candidatos y los traits `JobRepository` / `FastQueue`, junto con
//! implementaciones en memoria útiles para pruebas.
//!
//! Ejemplo rápido:
//! ```rust
//! use primos_domain::{InMemoryJobRepository, JobRepository, NewRequest};
//! let repo = InMemoryJobRepository::new();
//! let id = repo.create_request(&NewRequest::new(3, 4).unwrap()).unwrap();
//! assert_eq!(repo.get_request(&id).unwrap().unwrap().generados, 0);
//! ```
mod candidate;
mod errors;
mod message;
mod primality;
mod repository;
mod request;
mod stubs;

pub use candidate::{decimal_digits, digit_bounds, CandidateGenerator};
pub use errors::{JobError, Result};
pub use message::{JobMessage, DELIMITER};
pub use primality::{is_probable_prime, WITNESSES};
pub use repository::{CommitOutcome, FastQueue, JobRepository};
pub use request::{validate_cantidad, validate_digitos, Job, NewRequest, PrimeRequest, QueueEntry, MAX_CANTIDAD,
                  MAX_DIGITOS, MIN_CANTIDAD, MIN_DIGITOS};
pub use stubs::{InMemoryFastQueue, InMemoryJobRepository};
