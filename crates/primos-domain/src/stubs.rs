// Archivo: stubs.rs
// Propósito: implementaciones en memoria de `JobRepository` y `FastQueue`
// para pruebas y wiring local. No son durables, pero respetan las mismas
// garantías de atomicidad que las implementaciones reales: todo el estado
// del repositorio vive detrás de un único `Mutex`, lo que hace de cada
// operación una transacción.
use crate::errors::{JobError, Result};
use crate::message::JobMessage;
use crate::repository::{CommitOutcome, FastQueue, JobRepository};
use crate::request::{NewRequest, PrimeRequest, QueueEntry};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
  requests: HashMap<Uuid, PrimeRequest>,
  /// Entradas de `cola` en orden de creación.
  queue: Vec<QueueEntry>,
  results: HashMap<Uuid, Vec<String>>,
}

/// Repositorio en memoria con la semántica de la cola durable.
#[derive(Default)]
pub struct InMemoryJobRepository {
  state: Mutex<MemoryState>,
}

impl InMemoryJobRepository {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
    self.state.lock().map_err(|e| JobError::Store(format!("mutex poisoned: {}", e)))
  }

  /// Copia de la cola durable, para inspección en pruebas.
  pub fn queue_snapshot(&self) -> Result<Vec<QueueEntry>> {
    Ok(self.lock()?.queue.clone())
  }

  fn claim_where<F>(&self, pred: F) -> Result<Option<QueueEntry>>
    where F: Fn(&QueueEntry) -> bool
  {
    let mut state = self.lock()?;
    match state.queue.iter_mut().find(|e| !e.procesado && pred(e)) {
      Some(entry) => {
        entry.procesado = true;
        Ok(Some(entry.clone()))
      }
      None => Ok(None),
    }
  }
}

impl JobRepository for InMemoryJobRepository {
  fn create_request(&self, params: &NewRequest) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let mut state = self.lock()?;
    state.requests.insert(id,
                          PrimeRequest { id,
                                         cantidad: params.cantidad(),
                                         digitos: params.digitos(),
                                         generados: 0,
                                         created_at: now });
    state.queue.push(QueueEntry { id: Uuid::new_v4(),
                                  solicitud_id: id,
                                  cantidad: params.cantidad(),
                                  digitos: params.digitos(),
                                  procesado: false,
                                  created_at: now });
    Ok(id)
  }

  fn claim_next(&self) -> Result<Option<QueueEntry>> {
    self.claim_where(|_| true)
  }

  fn claim_for_request(&self, solicitud_id: &Uuid) -> Result<Option<QueueEntry>> {
    self.claim_where(|e| &e.solicitud_id == solicitud_id)
  }

  fn mark_done(&self, entry_id: &Uuid) -> Result<()> {
    self.lock()?.queue.retain(|e| &e.id != entry_id);
    Ok(())
  }

  fn insert_result(&self, solicitud_id: &Uuid, primo: &str) -> Result<CommitOutcome> {
    let mut state = self.lock()?;
    let state = &mut *state;
    let request = state.requests
                       .get_mut(solicitud_id)
                       .ok_or_else(|| JobError::Store(format!("solicitud {} no existe", solicitud_id)))?;
    let found = state.results.entry(*solicitud_id).or_default();
    if found.iter().any(|p| p == primo) {
      return Ok(CommitOutcome::DuplicateRejected);
    }
    if request.generados >= request.cantidad {
      return Ok(CommitOutcome::RequestComplete);
    }
    found.push(primo.to_string());
    request.generados += 1;
    Ok(CommitOutcome::Inserted)
  }

  fn get_request(&self, id: &Uuid) -> Result<Option<PrimeRequest>> {
    Ok(self.lock()?.requests.get(id).cloned())
  }

  fn list_results(&self, solicitud_id: &Uuid) -> Result<Vec<String>> {
    Ok(self.lock()?.results.get(solicitud_id).cloned().unwrap_or_default())
  }

  fn count_results(&self, solicitud_id: &Uuid) -> Result<u32> {
    Ok(self.lock()?.results.get(solicitud_id).map(|r| r.len() as u32).unwrap_or(0))
  }
}

/// Lista FIFO bloqueante en memoria, equivalente a RPUSH/BLPOP.
#[derive(Default)]
pub struct InMemoryFastQueue {
  items: Mutex<VecDeque<String>>,
  ready: Condvar,
}

impl InMemoryFastQueue {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, VecDeque<String>>> {
    self.items.lock().map_err(|e| JobError::Broker(format!("mutex poisoned: {}", e)))
  }

  /// Encola texto arbitrario; permite simular mensajes mal formados.
  pub fn push_raw(&self, raw: &str) -> Result<()> {
    self.lock()?.push_back(raw.to_string());
    self.ready.notify_one();
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.items.lock().map(|q| q.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl FastQueue for InMemoryFastQueue {
  fn publish(&self, message: &JobMessage) -> Result<()> {
    self.push_raw(&message.to_string())
  }

  fn pop(&self, timeout: Duration) -> Result<Option<String>> {
    let deadline = Instant::now() + timeout;
    let mut items = self.lock()?;
    loop {
      if let Some(raw) = items.pop_front() {
        return Ok(Some(raw));
      }
      let now = Instant::now();
      if now >= deadline {
        return Ok(None);
      }
      let (guard, _) = self.ready
                           .wait_timeout(items, deadline - now)
                           .map_err(|e| JobError::Broker(format!("mutex poisoned: {}", e)))?;
      items = guard;
    }
  }
}
