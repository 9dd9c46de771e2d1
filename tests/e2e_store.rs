//! End-to-end tests for the transactional store: atomicity, isolation,
//! session lifecycle, cancellation and deadlines.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use servicegraph::model::property_map::props;
use servicegraph::{Context, Error, GraphStore, MemoryBackend, StorageBackend, StoreConfig, TxMode, Value};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helpers
// ============================================================================

fn store() -> GraphStore<MemoryBackend> {
    GraphStore::with_backend(MemoryBackend::new())
}

async fn count(store: &GraphStore<MemoryBackend>, label: &'static str) -> usize {
    store
        .execute_read(&Context::background(), move |tx| Box::pin(async move {
            Ok(tx.nodes_by_label(label).await?.len())
        }))
        .await
        .unwrap()
}

// ============================================================================
// 1. Atomicity
// ============================================================================

#[tokio::test]
async fn test_failed_write_commits_nothing() {
    let store = store();
    let ctx = Context::background();

    let err = store
        .execute_write(&ctx, |tx| Box::pin(async move {
            let a = tx.create_node(&["Service"], props([("id", "a")])).await?;
            let b = tx.create_node(&["Service"], props([("id", "b")])).await?;
            tx.create_relationship(a, b, "DEPENDS_ON", Default::default()).await?;
            Err::<(), _>(Error::Validation("abort".into()))
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(count(&store, "Service").await, 0);
    let tx = store.backend().begin_tx(TxMode::ReadOnly).await.unwrap();
    assert_eq!(store.backend().relationship_count(&tx).await.unwrap(), 0);
}

#[tokio::test]
async fn test_panicking_work_leaves_no_trace() {
    let store = store();

    let handle = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .execute_write(&Context::background(), |tx| Box::pin(async move {
                    tx.create_node(&["Service"], props([("id", "a")])).await?;
                    if tx.mode() == TxMode::ReadWrite {
                        panic!("work blew up");
                    }
                    Ok(())
                }))
                .await
        })
    };
    assert!(handle.await.unwrap_err().is_panic());

    assert!(store.open_sessions().is_empty());
    assert_eq!(count(&store, "Service").await, 0);
}

// ============================================================================
// 2. Isolation
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reader_never_sees_uncommitted_write() {
    let store = store();
    let (staged_tx, staged_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .execute_write(&Context::background(), move |tx| Box::pin(async move {
                    tx.create_node(&["Service"], props([("id", "a")])).await?;
                    let _ = staged_tx.send(());
                    let _ = release_rx.await;
                    Ok(())
                }))
                .await
        })
    };

    staged_rx.await.unwrap();
    // The writer holds the graph; a read has to wait for it to finish.
    let reader = {
        let store = store.clone();
        tokio::spawn(async move { count(&store, "Service").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!reader.is_finished());

    release_tx.send(()).unwrap();
    writer.await.unwrap().unwrap();
    assert_eq!(reader.await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_serialize() {
    let store = store();
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .execute_write(&Context::background(), move |tx| Box::pin(async move {
                    tx.create_node(&["Service"], props([("id", Value::from(format!("svc-{i}")))])).await?;
                    Ok(())
                }))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(count(&store, "Service").await, 16);
    assert_eq!(store.sessions_opened(), 17);
    assert!(store.open_sessions().is_empty());
}

// ============================================================================
// 3. Sessions
// ============================================================================

#[tokio::test]
async fn test_session_visible_while_work_runs() {
    let store = store();
    let ctx = Context::background().with_correlation_id("req-42");
    let probe = store.clone();

    let seen = store
        .execute_read(&ctx, move |tx| Box::pin(async move {
            let open = probe.open_sessions();
            assert_eq!(open.len(), 1);
            assert_eq!(open[0].id, tx.session_id());
            Ok(open[0].clone())
        }))
        .await
        .unwrap();
    assert_eq!(seen.mode, TxMode::ReadOnly);
    assert_eq!(seen.correlation_id, "req-42");
    assert!(store.open_sessions().is_empty());
}

// ============================================================================
// 4. Cancellation and deadlines
// ============================================================================

#[tokio::test]
async fn test_cancel_mid_work_rolls_back() {
    let store = store();
    let token = CancellationToken::new();
    let ctx = Context::with_token(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    let err = store
        .execute_write(&ctx, |tx| Box::pin(async move {
            tx.create_node(&["Service"], props([("id", "a")])).await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }))
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(err.status_code(), 499);
    assert_eq!(count(&store, "Service").await, 0);
    assert!(store.open_sessions().is_empty());
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let store = store();
    let ctx = Context::background().with_timeout(Duration::from_millis(10));

    let err = store
        .execute_write(&ctx, |tx| Box::pin(async move {
            tx.create_node(&["Service"], props([("id", "a")])).await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DeadlineExceeded));
    assert_eq!(err.status_code(), 504);
    assert_eq!(count(&store, "Service").await, 0);
}

#[tokio::test]
async fn test_configured_transaction_timeout() {
    let config = StoreConfig::from_toml_str("transaction_timeout_ms = 10").unwrap();
    let store = GraphStore::open(config).unwrap();

    let err = store
        .execute_read(&Context::background(), |_tx| Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded));

    // Fast work is unaffected.
    store
        .execute_read(&Context::background(), |_tx| Box::pin(async move { Ok(()) }))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_context_opens_no_session() {
    let store = store();
    let ctx = Context::background().with_timeout(Duration::ZERO);

    let err = store
        .execute_read(&ctx, |_tx| Box::pin(async move { Ok(()) }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded));
    assert_eq!(store.sessions_opened(), 0);
}

#[tokio::test]
async fn test_store_handle_shared_across_tasks() {
    let store = Arc::new(store());
    let a = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { count(&store, "Service").await })
    };
    let b = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { count(&store, "Team").await })
    };
    assert_eq!(a.await.unwrap() + b.await.unwrap(), 0);
}
