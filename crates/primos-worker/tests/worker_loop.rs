use primos_domain::{decimal_digits, is_probable_prime, CandidateGenerator, CommitOutcome, InMemoryFastQueue,
                    InMemoryJobRepository, Job, JobError, JobRepository, NewRequest, PrimeRequest, QueueEntry, Result};
use primos_worker::{LoopConfig, WorkerLoop};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn config() -> LoopConfig {
  LoopConfig { pop_timeout: Duration::from_millis(20), backoff: Duration::from_millis(1), ..Default::default() }
}

fn worker(repo: Arc<InMemoryJobRepository>) -> WorkerLoop<InMemoryJobRepository, InMemoryFastQueue> {
  WorkerLoop::with_generator(repo, Arc::new(InMemoryFastQueue::new()), config(), CandidateGenerator::with_seed(11))
}

fn claim(repo: &InMemoryJobRepository, cantidad: i64, digitos: i64) -> Job {
  repo.create_request(&NewRequest::new(cantidad, digitos).unwrap()).unwrap();
  Job::from(repo.claim_next().unwrap().unwrap())
}

#[test]
fn job_runs_to_completion_and_releases_entry() {
  let repo = Arc::new(InMemoryJobRepository::new());
  let job = claim(&repo, 3, 4);
  let report = worker(repo.clone()).run_job(&job, &AtomicBool::new(false)).unwrap();
  assert!(report.completed);
  assert_eq!(report.found, 3);
  let primes = repo.list_results(&job.solicitud_id).unwrap();
  let distinct: HashSet<_> = primes.iter().collect();
  assert_eq!(distinct.len(), 3);
  for p in &primes {
    let n: u64 = p.parse().unwrap();
    assert!(is_probable_prime(n));
    assert_eq!(decimal_digits(n), 4);
    assert_eq!(n % 2, 1);
  }
  assert_eq!(repo.get_request(&job.solicitud_id).unwrap().unwrap().generados, 3);
  assert!(repo.queue_snapshot().unwrap().is_empty());
}

#[test]
fn reclaimed_job_resumes_from_stored_results() {
  let repo = Arc::new(InMemoryJobRepository::new());
  let job = claim(&repo, 3, 5);
  assert_eq!(repo.insert_result(&job.solicitud_id, "10007").unwrap(), CommitOutcome::Inserted);
  let report = worker(repo.clone()).run_job(&job, &AtomicBool::new(false)).unwrap();
  assert_eq!(report.found, 2);
  assert_eq!(repo.count_results(&job.solicitud_id).unwrap(), 3);
}

#[test]
fn complete_request_is_not_overproduced() {
  let repo = Arc::new(InMemoryJobRepository::new());
  let job = claim(&repo, 1, 4);
  repo.insert_result(&job.solicitud_id, "7919").unwrap();
  let report = worker(repo.clone()).run_job(&job, &AtomicBool::new(false)).unwrap();
  assert!(report.completed);
  assert_eq!(report.found, 0);
  assert_eq!(repo.list_results(&job.solicitud_id).unwrap(), vec!["7919".to_string()]);
}

#[test]
fn job_for_unknown_request_is_skipped() {
  let repo = Arc::new(InMemoryJobRepository::new());
  let job = Job { handle: None, solicitud_id: Uuid::new_v4(), cantidad: 2, digitos: 4 };
  let report = worker(repo).run_job(&job, &AtomicBool::new(false)).unwrap();
  assert!(!report.completed);
  assert_eq!(report.found, 0);
}

/// Repositorio cuyas operaciones fallan tantas veces como indique su contador.
#[derive(Default)]
struct FlakyRepo {
  inner: InMemoryJobRepository,
  failures: AtomicU32,
  count_failures: AtomicU32,
  done_failures: AtomicU32,
}

fn fail_once_more(counter: &AtomicU32) -> Result<()> {
  let left = counter.load(Ordering::SeqCst);
  if left > 0 {
    counter.store(left - 1, Ordering::SeqCst);
    return Err(JobError::Store("conexión perdida".into()));
  }
  Ok(())
}

impl JobRepository for FlakyRepo {
  fn create_request(&self, params: &NewRequest) -> Result<Uuid> {
    self.inner.create_request(params)
  }
  fn claim_next(&self) -> Result<Option<QueueEntry>> {
    self.inner.claim_next()
  }
  fn claim_for_request(&self, solicitud_id: &Uuid) -> Result<Option<QueueEntry>> {
    self.inner.claim_for_request(solicitud_id)
  }
  fn mark_done(&self, entry_id: &Uuid) -> Result<()> {
    fail_once_more(&self.done_failures)?;
    self.inner.mark_done(entry_id)
  }
  fn insert_result(&self, solicitud_id: &Uuid, primo: &str) -> Result<CommitOutcome> {
    fail_once_more(&self.failures)?;
    self.inner.insert_result(solicitud_id, primo)
  }
  fn get_request(&self, id: &Uuid) -> Result<Option<PrimeRequest>> {
    self.inner.get_request(id)
  }
  fn list_results(&self, solicitud_id: &Uuid) -> Result<Vec<String>> {
    self.inner.list_results(solicitud_id)
  }
  fn count_results(&self, solicitud_id: &Uuid) -> Result<u32> {
    fail_once_more(&self.count_failures)?;
    self.inner.count_results(solicitud_id)
  }
}

#[test]
fn store_failures_discard_candidate_and_continue() {
  let repo = Arc::new(FlakyRepo { failures: AtomicU32::new(2), ..Default::default() });
  let id = repo.create_request(&NewRequest::new(2, 6).unwrap()).unwrap();
  let job = Job::from(repo.claim_for_request(&id).unwrap().unwrap());
  let report = flaky_worker(repo).run_job(&job, &AtomicBool::new(false)).unwrap();
  assert_eq!(report.store_failures, 2);
  assert_eq!(report.found, 2);
  assert!(report.completed);
}

fn flaky_worker(repo: Arc<FlakyRepo>) -> WorkerLoop<FlakyRepo, InMemoryFastQueue> {
  WorkerLoop::with_generator(repo, Arc::new(InMemoryFastQueue::new()), config(), CandidateGenerator::with_seed(5))
}

#[test]
fn failed_progress_read_is_retried_instead_of_dropping_job() {
  let repo = Arc::new(FlakyRepo { count_failures: AtomicU32::new(1), ..Default::default() });
  let id = repo.create_request(&NewRequest::new(2, 5).unwrap()).unwrap();
  let report = flaky_worker(repo.clone()).run_once(&AtomicBool::new(false)).unwrap().unwrap();
  assert!(report.completed);
  assert_eq!(report.found, 2);
  assert_eq!(repo.get_request(&id).unwrap().unwrap().generados, 2);
  assert!(repo.inner.queue_snapshot().unwrap().is_empty());
}

#[test]
fn failed_acknowledgement_is_retried_until_entry_is_removed() {
  let repo = Arc::new(FlakyRepo { done_failures: AtomicU32::new(3), ..Default::default() });
  let id = repo.create_request(&NewRequest::new(1, 4).unwrap()).unwrap();
  let job = Job::from(repo.claim_for_request(&id).unwrap().unwrap());
  let report = flaky_worker(repo.clone()).run_job(&job, &AtomicBool::new(false)).unwrap();
  assert!(report.completed);
  assert_eq!(repo.done_failures.load(Ordering::SeqCst), 0);
  assert!(repo.inner.queue_snapshot().unwrap().is_empty());
}

#[test]
fn stop_interrupts_retries_and_keeps_entry_claimed() {
  let repo = Arc::new(FlakyRepo { count_failures: AtomicU32::new(u32::MAX), ..Default::default() });
  let id = repo.create_request(&NewRequest::new(1, 4).unwrap()).unwrap();
  let job = Job::from(repo.claim_for_request(&id).unwrap().unwrap());
  let err = flaky_worker(repo.clone()).run_job(&job, &AtomicBool::new(true)).unwrap_err();
  assert!(err.is_transient());
  let snapshot = repo.inner.queue_snapshot().unwrap();
  assert_eq!(snapshot.len(), 1);
  assert!(snapshot[0].procesado);
}

#[test]
fn exhausted_digit_range_is_abandoned() {
  // Sólo hay 21 primos de dos dígitos.
  let repo = Arc::new(InMemoryJobRepository::new());
  let job = claim(&repo, 30, 2);
  let cfg = LoopConfig { duplicate_streak_limit: 2_000, ..config() };
  let mut w = WorkerLoop::with_generator(repo.clone(), Arc::new(InMemoryFastQueue::new()), cfg, CandidateGenerator::with_seed(3));
  let report = w.run_job(&job, &AtomicBool::new(false)).unwrap();
  assert!(report.exhausted);
  assert!(!report.completed);
  assert_eq!(report.found, 21);
  assert_eq!(repo.get_request(&job.solicitud_id).unwrap().unwrap().generados, 21);
}

#[test]
fn run_returns_immediately_when_already_stopped() {
  let repo = Arc::new(InMemoryJobRepository::new());
  repo.create_request(&NewRequest::new(1, 4).unwrap()).unwrap();
  let stop = AtomicBool::new(true);
  assert_eq!(worker(repo.clone()).run(&stop), 0);
  assert!(!repo.queue_snapshot().unwrap()[0].procesado);
}
