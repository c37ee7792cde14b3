use primos_domain::{decimal_digits, is_probable_prime, FastQueue, InMemoryFastQueue, InMemoryJobRepository,
                    JobRepository, NewRequest};
use primos_worker::{DequeueMode, LoopConfig, PrimeService, WorkerLoop};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn wait_until_complete(service: &PrimeService<dyn JobRepository, dyn FastQueue>, ids: &[Uuid]) {
  let deadline = Instant::now() + Duration::from_secs(20);
  loop {
    let done = ids.iter().all(|id| service.status(id).unwrap().map(|r| r.is_complete()).unwrap_or(false));
    if done {
      return;
    }
    assert!(Instant::now() < deadline, "las solicitudes no se completaron a tiempo");
    thread::sleep(Duration::from_millis(10));
  }
}

#[test]
fn submit_work_and_collect_results_end_to_end() {
  let repo: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
  let queue: Arc<dyn FastQueue> = Arc::new(InMemoryFastQueue::new());
  let service = PrimeService::new(repo.clone(), queue.clone());

  let stop = Arc::new(AtomicBool::new(false));
  let workers: Vec<_> = (0..3).map(|_| {
                                let (repo, queue, stop) = (repo.clone(), queue.clone(), stop.clone());
                                thread::spawn(move || {
                                  let cfg = LoopConfig { mode: DequeueMode::Both,
                                                         pop_timeout: Duration::from_millis(25),
                                                         backoff: Duration::from_millis(5),
                                                         ..Default::default() };
                                  WorkerLoop::new(repo, queue, cfg).run(&stop)
                                })
                              })
                              .collect();

  let main = service.submit(3, 4).unwrap();
  // Mismos parámetros: solicitud independiente.
  let twin = service.submit(3, 4).unwrap();
  // Solicitud sin mensaje en la cola rápida: la recoge el respaldo durable.
  let silent = repo.create_request(&NewRequest::new(2, 7).unwrap()).unwrap();
  assert_ne!(main, twin);

  let ids = [main, twin, silent];
  wait_until_complete(&service, &ids);
  stop.store(true, Ordering::SeqCst);
  let processed: usize = workers.into_iter().map(|h| h.join().unwrap()).sum();
  assert_eq!(processed, 3);

  let status = service.status(&main).unwrap().unwrap();
  assert_eq!((status.cantidad, status.digitos, status.generados), (3, 4, 3));
  let primes = service.results(&main).unwrap();
  assert_eq!(primes.len(), 3);
  assert_eq!(primes.iter().collect::<HashSet<_>>().len(), 3);
  for p in &primes {
    let n: u64 = p.parse().unwrap();
    assert!(is_probable_prime(n), "{} no es primo", n);
    assert_eq!(decimal_digits(n), 4);
    assert_eq!(n & 1, 1);
  }
  assert_eq!(service.results(&twin).unwrap().len(), 3);
  assert_eq!(service.status(&silent).unwrap().unwrap().generados, 2);
}
