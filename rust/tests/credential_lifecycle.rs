use std::fs;
use std::sync::Arc;
use std::thread;

use hashkeep::persistence::{load, save};
use hashkeep::{CredentialStore, HashEngine, HashParams, Session, StoreError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn engine() -> HashEngine {
    HashEngine::new(HashParams {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    })
    .expect("cheap params are valid")
}

#[test]
fn first_run_creates_store_and_later_runs_see_credentials() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("passwords.json");

    let session = Session::open(&path, engine()).unwrap();
    assert!(path.exists(), "opening creates the durable store");
    session.store().add("email", "Secret123!").unwrap();
    session.store().add("bank", "hunter2").unwrap();
    session.close().unwrap();

    let stored: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let object = stored.as_object().expect("store file is a flat object");
    assert_eq!(object.len(), 2);
    for value in object.values() {
        let hash = value.as_str().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("Secret123!") && !hash.contains("hunter2"));
    }

    let session = Session::open(&path, engine()).unwrap();
    let store = session.store();
    assert!(store.get("email", "Secret123!").is_ok());
    assert!(matches!(store.get("email", "wrong"), Err(StoreError::AuthenticationFailed(_))));
    assert!(matches!(store.get("missing", "x"), Err(StoreError::ServiceNotFound(_))));
    session.close().unwrap();
}

#[test]
fn store_shared_across_threads_persists_every_add() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("passwords.json");

    let store = Arc::new(CredentialStore::new(engine()));
    store.restore(load(&path).unwrap()).unwrap();

    let handles: Vec<_> = ["alpha", "bravo", "charlie"]
        .into_iter()
        .map(|service| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.add(service, &format!("{service}-secret")))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    save(&store.snapshot(), &path).unwrap();

    let reloaded = CredentialStore::new(engine());
    reloaded.restore(load(&path).unwrap()).unwrap();
    assert_eq!(reloaded.services(), vec!["alpha", "bravo", "charlie"]);
    assert!(reloaded.verify("charlie", "charlie-secret").unwrap());
}

#[test]
fn stores_written_with_other_costs_still_verify() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("passwords.json");

    let session = Session::open(&path, engine()).unwrap();
    session.store().add("legacy", "old-cost").unwrap();
    session.close().unwrap();

    let stronger = HashEngine::new(HashParams {
        memory_cost_kib: 2048,
        time_cost: 2,
        parallelism: 1,
    })
    .unwrap();
    let session = Session::open(&path, stronger).unwrap();
    assert!(session.store().verify("legacy", "old-cost").unwrap());
    session.store().add("fresh", "new-cost").unwrap();
    assert!(session.store().export("fresh").unwrap().contains("m=2048,t=2,p=1"));
    session.close().unwrap();
}
