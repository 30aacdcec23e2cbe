//! Concurrent transfers against the in-memory store
//!
//! Every task runs its own unit of work on the multi-threaded runtime, so
//! row latches are contended for real.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;

use benefit_transfer::config::{ConcurrencyMode, TransferConfig};
use benefit_transfer::{
    AccountId, AccountRegistry, MemoryAccountStore, NewAccount, RetryPolicy, TransferError,
    TransferExecutor, TransferOutcome, TransferRequest, TransferService,
};

type Executor = Arc<TransferExecutor<MemoryAccountStore>>;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn seed(store: &MemoryAccountStore, name: &str, balance: &str) -> AccountId {
    store
        .create(&NewAccount::new(name, None, dec(balance)).unwrap())
        .await
        .unwrap()
        .id
}

async fn balance(store: &MemoryAccountStore, id: AccountId) -> Decimal {
    store.get(id).await.unwrap().unwrap().balance
}

fn pessimistic(store: &MemoryAccountStore) -> Executor {
    Arc::new(TransferExecutor::new(
        store.clone(),
        TransferService::default(),
        RetryPolicy::none(),
    ))
}

/// Spawn one task per request and collect the results in request order
async fn run_all(
    executor: &Executor,
    requests: Vec<TransferRequest>,
) -> Vec<Result<TransferOutcome, TransferError>> {
    let handles = requests.into_iter().map(|req| {
        let executor = Arc::clone(executor);
        tokio::spawn(async move { executor.execute(&req).await })
    });
    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("transfer task panicked"))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_debits_never_overdraw() {
    let store = MemoryAccountStore::new();
    let a = seed(&store, "Conta A", "500.00").await;
    let b = seed(&store, "Conta B", "0.00").await;
    let executor = pessimistic(&store);

    let requests = (0..20)
        .map(|_| TransferRequest::new(a, b, dec("100.00")))
        .collect();
    let results = run_all(&executor, requests).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(TransferError::InsufficientBalance { .. })))
        .count();

    assert_eq!(succeeded, 5);
    assert_eq!(insufficient, 15);
    assert_eq!(balance(&store, a).await, Decimal::ZERO);
    assert_eq!(balance(&store, b).await, dec("500.00"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_total_balance_conserved() {
    let store = MemoryAccountStore::new();
    let mut ids = Vec::new();
    for (i, initial) in ["1000.00", "750.50", "20.00", "0.00"].iter().enumerate() {
        ids.push(seed(&store, &format!("Conta {}", i), initial).await);
    }
    let before = store.total_balance(&ids).await.unwrap();
    let executor = pessimistic(&store);

    // 10 workers x 100 transfers over every ordered pair
    let mut requests = Vec::new();
    for worker in 0..10usize {
        for n in 0..100usize {
            let from = ids[(worker + n) % ids.len()];
            let to = ids[(worker + n + 1 + n % 3) % ids.len()];
            if from != to {
                requests.push(TransferRequest::new(from, to, dec("7.25")));
            }
        }
    }
    let results = run_all(&executor, requests).await;

    for result in &results {
        match result {
            Ok(_) | Err(TransferError::InsufficientBalance { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert!(results.iter().any(|r| r.is_ok()));

    let after = store.total_balance(&ids).await.unwrap();
    assert_eq!(after, before);
    for id in &ids {
        assert!(balance(&store, *id).await >= Decimal::ZERO);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_opposite_directions_do_not_deadlock() {
    let store = MemoryAccountStore::with_lock_timeout(Duration::from_secs(10));
    let executor = pessimistic(&store);

    let mut requests = Vec::new();
    let mut pairs = Vec::new();
    for p in 0..5 {
        let a = seed(&store, &format!("Par {} A", p), "10000.00").await;
        let b = seed(&store, &format!("Par {} B", p), "10000.00").await;
        pairs.push((a, b));
        for _ in 0..50 {
            requests.push(TransferRequest::new(a, b, dec("10.00")));
            requests.push(TransferRequest::new(b, a, dec("10.00")));
        }
    }

    let results = tokio::time::timeout(Duration::from_secs(30), run_all(&executor, requests))
        .await
        .expect("transfers deadlocked");

    assert!(results.iter().all(|r| r.is_ok()));
    for (a, b) in pairs {
        assert_eq!(balance(&store, a).await, dec("10000.00"));
        assert_eq!(balance(&store, b).await, dec("10000.00"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_optimistic_mode_serializes_through_retries() {
    let store = MemoryAccountStore::new();
    let a = seed(&store, "Origem", "1000.00").await;
    let b = seed(&store, "Destino", "0.00").await;
    let config = TransferConfig {
        mode: ConcurrencyMode::Optimistic,
        max_attempts: 64,
        backoff_base_ms: 1,
        backoff_max_ms: 20,
        ..Default::default()
    };
    let executor = Arc::new(TransferExecutor::from_config(store.clone(), &config));

    let requests = (0..20)
        .map(|_| TransferRequest::new(a, b, dec("10.00")))
        .collect();
    let results = run_all(&executor, requests).await;

    assert!(results.iter().all(|r| r.is_ok()), "{:?}", results);
    assert_eq!(balance(&store, a).await, dec("800.00"));
    assert_eq!(balance(&store, b).await, dec("200.00"));
    assert_eq!(store.get(a).await.unwrap().unwrap().version, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelled_transfer_releases_locks() {
    let store = MemoryAccountStore::with_lock_timeout(Duration::from_millis(500));
    let a = seed(&store, "Conta A", "100.00").await;
    let b = seed(&store, "Conta B", "100.00").await;
    let executor = pessimistic(&store);

    // Hold `b` so the spawned transfer parks holding `a`
    let holder = {
        use benefit_transfer::{AccountStore, TransactionBoundary};
        let mut tx = store.begin().await.unwrap();
        tx.load_for_update(b).await.unwrap();
        tx
    };

    let pending = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move {
            executor
                .execute(&TransferRequest::new(a, b, dec("1.00")))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    pending.abort();
    let _ = pending.await;
    drop(holder);

    executor
        .execute(&TransferRequest::new(a, b, dec("1.00")))
        .await
        .unwrap();
    assert_eq!(balance(&store, a).await, dec("99.00"));
    assert_eq!(balance(&store, b).await, dec("101.00"));
}
