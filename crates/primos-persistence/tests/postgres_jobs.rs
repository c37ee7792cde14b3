use primos_domain::{CommitOutcome, JobRepository, NewRequest};
use primos_persistence::DieselJobRepository;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use uuid::Uuid;

// `claim_next` drena la cola global, así que las pruebas se serializan.
static DB_LOCK: Mutex<()> = Mutex::new(());

// Las pruebas usan una base real; sin `PRIMOS_TEST_DATABASE_URL` se saltan.
fn repo_or_skip(test: &str) -> Option<(MutexGuard<'static, ()>, DieselJobRepository)> {
  let url = match std::env::var("PRIMOS_TEST_DATABASE_URL") {
    Ok(u) => u,
    Err(_) => {
      eprintln!("skipping {}: PRIMOS_TEST_DATABASE_URL not set", test);
      return None;
    }
  };
  let guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
  Some((guard, DieselJobRepository::new(&url, 8).expect("no se pudo conectar a Postgres")))
}

#[test]
fn create_then_status_and_empty_results() {
  let Some((_guard, repo)) = repo_or_skip("create_then_status_and_empty_results") else { return };
  let id = repo.create_request(&NewRequest::new(3, 4).unwrap()).unwrap();
  let req = repo.get_request(&id).unwrap().expect("la solicitud debe existir");
  assert_eq!((req.cantidad, req.digitos, req.generados), (3, 4, 0));
  assert!(repo.list_results(&id).unwrap().is_empty());
  assert_eq!(repo.count_results(&id).unwrap(), 0);
  assert!(repo.get_request(&Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn commit_rejects_duplicates_and_caps_progress() {
  let Some((_guard, repo)) = repo_or_skip("commit_rejects_duplicates_and_caps_progress") else { return };
  let id = repo.create_request(&NewRequest::new(2, 2).unwrap()).unwrap();
  assert_eq!(repo.insert_result(&id, "11").unwrap(), CommitOutcome::Inserted);
  assert_eq!(repo.insert_result(&id, "11").unwrap(), CommitOutcome::DuplicateRejected);
  assert_eq!(repo.insert_result(&id, "13").unwrap(), CommitOutcome::Inserted);
  assert_eq!(repo.insert_result(&id, "17").unwrap(), CommitOutcome::RequestComplete);
  let req = repo.get_request(&id).unwrap().unwrap();
  assert_eq!(req.generados, 2);
  assert!(req.is_complete());
  assert_eq!(repo.list_results(&id).unwrap(), vec!["11".to_string(), "13".to_string()]);
  assert_eq!(repo.count_results(&id).unwrap(), 2);
}

#[test]
fn claim_for_request_succeeds_once_and_mark_done_removes_entry() {
  let Some((_guard, repo)) = repo_or_skip("claim_for_request_succeeds_once_and_mark_done_removes_entry") else { return };
  let id = repo.create_request(&NewRequest::new(1, 5).unwrap()).unwrap();
  let entry = repo.claim_for_request(&id).unwrap().expect("primer reclamo");
  assert_eq!(entry.solicitud_id, id);
  assert!(entry.procesado);
  assert!(repo.claim_for_request(&id).unwrap().is_none());
  repo.mark_done(&entry.id).unwrap();
  assert!(repo.claim_for_request(&id).unwrap().is_none());
}

#[test]
fn concurrent_claims_never_share_an_entry() {
  let Some((_guard, repo)) = repo_or_skip("concurrent_claims_never_share_an_entry") else { return };
  let repo = Arc::new(repo);
  let mut ids = HashSet::new();
  for _ in 0..12 {
    ids.insert(repo.create_request(&NewRequest::new(1, 6).unwrap()).unwrap());
  }
  let handles: Vec<_> = (0..6).map(|_| {
                                let repo = Arc::clone(&repo);
                                thread::spawn(move || {
                                  let mut mine = Vec::new();
                                  while let Some(e) = repo.claim_next().unwrap() {
                                    mine.push(e.id);
                                  }
                                  mine
                                })
                              })
                              .collect();
  let mut seen = HashSet::new();
  for h in handles {
    for entry_id in h.join().unwrap() {
      assert!(seen.insert(entry_id), "entrada {} reclamada dos veces", entry_id);
    }
  }
  // Nuestras solicitudes ya no tienen entradas pendientes.
  for id in ids {
    assert!(repo.claim_for_request(&id).unwrap().is_none());
  }
}

#[test]
fn racing_committers_never_exceed_cantidad() {
  let Some((_guard, repo)) = repo_or_skip("racing_committers_never_exceed_cantidad") else { return };
  let repo = Arc::new(repo);
  let id = repo.create_request(&NewRequest::new(5, 4).unwrap()).unwrap();
  let handles: Vec<_> = (0..4u64).map(|t| {
                                   let repo = Arc::clone(&repo);
                                   thread::spawn(move || {
                                     let mut inserted = 0u32;
                                     for k in 0..10u64 {
                                       let primo = (1000 + t * 100 + k).to_string();
                                       if repo.insert_result(&id, &primo).unwrap() == CommitOutcome::Inserted {
                                         inserted += 1;
                                       }
                                     }
                                     inserted
                                   })
                                 })
                                 .collect();
  let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
  assert_eq!(total, 5);
  assert_eq!(repo.get_request(&id).unwrap().unwrap().generados, 5);
  assert_eq!(repo.count_results(&id).unwrap(), 5);
}
