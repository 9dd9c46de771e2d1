//! End-to-end tests for debt items.

use std::time::Duration;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use servicegraph::domain::{DebtStatus, DebtType, NewDebt, NewService, Service};
use servicegraph::{Context, Error, MemoryBackend, ServiceGraph};

// ============================================================================
// Helpers
// ============================================================================

async fn setup() -> (ServiceGraph<MemoryBackend>, Service) {
    let graph = ServiceGraph::open_memory().unwrap();
    let svc = graph
        .services
        .create_service(&Context::background(), NewService::new("ledger", "grpc"))
        .await
        .unwrap();
    (graph, svc)
}

/// Create `n` items with strictly increasing `created` timestamps.
async fn seed_debts(graph: &ServiceGraph<MemoryBackend>, service_id: &str, n: usize) -> Vec<String> {
    let ctx = Context::background();
    let mut ids = Vec::new();
    for i in 0..n {
        let debt = graph
            .debts
            .create_debt_item(&ctx, service_id, NewDebt::new(DebtType::Code, format!("item {i}")))
            .await
            .unwrap();
        ids.push(debt.id);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    ids
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_debt_item_is_pending() {
    let (graph, svc) = setup().await;
    let ctx = Context::background();

    let new = NewDebt::new(DebtType::Security, "TLS 1.0")
        .with_description("legacy endpoint")
        .with_status(DebtStatus::Remediated);
    let debt = graph.debts.create_debt_item(&ctx, &svc.id, new).await.unwrap();
    assert_eq!(debt.status, DebtStatus::Pending);

    let stored = graph.debts.get_debt_item(&ctx, &debt.id).await.unwrap();
    assert_eq!(stored, debt);
    assert_eq!(stored.description, "legacy endpoint");
}

#[tokio::test]
async fn test_create_debt_item_rejects_unknown_type() {
    let (graph, svc) = setup().await;
    let ctx = Context::background();

    let new = NewDebt::new(DebtType::Other("operational".into()), "pager fatigue");
    let err = graph.debts.create_debt_item(&ctx, &svc.id, new).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(graph.store().sessions_opened(), 1);
}

#[tokio::test]
async fn test_create_debt_item_missing_service_persists_nothing() {
    let (graph, svc) = setup().await;
    let ctx = Context::background();

    let err = graph
        .debts
        .create_debt_item(&ctx, "ghost", NewDebt::new(DebtType::Testing, "no tests"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(ref msg) if msg.contains("ghost")));

    // Nothing dangling anywhere in the graph.
    let debts = graph
        .store()
        .execute_read(&ctx, |tx| Box::pin(async move { Ok(tx.nodes_by_label("Debt").await?.len()) }))
        .await
        .unwrap();
    assert_eq!(debts, 0);
    assert!(graph.debts.get_debt_by_service_id(&ctx, &svc.id, 1, 10, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_debt_item_missing_is_not_found() {
    let (graph, _) = setup().await;
    let err = graph.debts.get_debt_item(&Context::background(), "ghost").await.unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Listing and pagination
// ============================================================================

#[tokio::test]
async fn test_list_newest_first_and_paginated() {
    let (graph, svc) = setup().await;
    let ctx = Context::background();
    let ids = seed_debts(&graph, &svc.id, 5).await;
    let newest_first: Vec<String> = ids.iter().rev().cloned().collect();

    let all = graph.debts.get_debt_by_service_id(&ctx, &svc.id, 1, 10, false).await.unwrap();
    let all_ids: Vec<String> = all.into_iter().map(|d| d.id).collect();
    assert_eq!(all_ids, newest_first);

    let page1 = graph.debts.get_debt_by_service_id(&ctx, &svc.id, 1, 2, false).await.unwrap();
    let page2 = graph.debts.get_debt_by_service_id(&ctx, &svc.id, 2, 2, false).await.unwrap();
    let page3 = graph.debts.get_debt_by_service_id(&ctx, &svc.id, 3, 2, false).await.unwrap();
    let page4 = graph.debts.get_debt_by_service_id(&ctx, &svc.id, 4, 2, false).await.unwrap();

    assert_eq!(page1.iter().map(|d| d.id.clone()).collect::<Vec<_>>(), newest_first[0..2].to_vec());
    assert_eq!(page2.iter().map(|d| d.id.clone()).collect::<Vec<_>>(), newest_first[2..4].to_vec());
    assert_eq!(page3.iter().map(|d| d.id.clone()).collect::<Vec<_>>(), newest_first[4..5].to_vec());
    assert!(page4.is_empty());
}

#[tokio::test]
async fn test_only_resolved_filter() {
    let (graph, svc) = setup().await;
    let ctx = Context::background();
    let ids = seed_debts(&graph, &svc.id, 3).await;

    assert!(graph.debts.get_debt_by_service_id(&ctx, &svc.id, 1, 10, true).await.unwrap().is_empty());

    graph.debts.update_status(&ctx, &ids[1], DebtStatus::Remediated).await.unwrap();
    graph.debts.update_status(&ctx, &ids[2], DebtStatus::InProgress).await.unwrap();

    let resolved = graph.debts.get_debt_by_service_id(&ctx, &svc.id, 1, 10, true).await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, ids[1]);
    assert_eq!(resolved[0].status, DebtStatus::Remediated);

    let all = graph.debts.get_debt_by_service_id(&ctx, &svc.id, 1, 10, false).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_unknown_service_yields_empty_page() {
    let (graph, _) = setup().await;
    let items = graph
        .debts
        .get_debt_by_service_id(&Context::background(), "ghost", 1, 10, false)
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_invalid_page_is_validation_error() {
    let (graph, svc) = setup().await;
    let ctx = Context::background();

    let err = graph.debts.get_debt_by_service_id(&ctx, &svc.id, 0, 10, false).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.status_code(), 400);

    let err = graph.debts.get_debt_by_service_id(&ctx, &svc.id, 1, -3, false).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_non_positive_page_never_touches_the_store(page in -50i64..=0, page_size in -50i64..=50) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let graph = ServiceGraph::open_memory().unwrap();
            let before = graph.store().sessions_opened();
            let err = graph
                .debts
                .get_debt_by_service_id(&Context::background(), "svc", page, page_size, false)
                .await
                .unwrap_err();
            prop_assert!(matches!(err, Error::Validation(_)));
            prop_assert_eq!(graph.store().sessions_opened(), before);
            Ok(())
        })?;
    }

    #[test]
    fn prop_non_positive_page_size_rejected(page in 1i64..100, page_size in -50i64..=0) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let graph = ServiceGraph::open_memory().unwrap();
            let err = graph
                .debts
                .get_debt_by_service_id(&Context::background(), "svc", page, page_size, false)
                .await
                .unwrap_err();
            prop_assert!(matches!(err, Error::Validation(_)));
            prop_assert_eq!(graph.store().sessions_opened(), 0);
            Ok(())
        })?;
    }
}

// ============================================================================
// Status updates
// ============================================================================

#[tokio::test]
async fn test_update_status() {
    let (graph, svc) = setup().await;
    let ctx = Context::background();
    let debt = graph
        .debts
        .create_debt_item(&ctx, &svc.id, NewDebt::new(DebtType::Architecture, "monolith"))
        .await
        .unwrap();

    graph.debts.update_status(&ctx, &debt.id, DebtStatus::InProgress).await.unwrap();
    assert_eq!(graph.debts.get_debt_item(&ctx, &debt.id).await.unwrap().status, DebtStatus::InProgress);

    // Any transition is allowed, including back to pending.
    graph.debts.update_status(&ctx, &debt.id, DebtStatus::Remediated).await.unwrap();
    graph.debts.update_status(&ctx, &debt.id, DebtStatus::Pending).await.unwrap();
    assert_eq!(graph.debts.get_debt_item(&ctx, &debt.id).await.unwrap().status, DebtStatus::Pending);
}

#[tokio::test]
async fn test_update_status_rejects_unknown_status() {
    let (graph, svc) = setup().await;
    let ctx = Context::background();
    let ids = seed_debts(&graph, &svc.id, 1).await;

    let err = graph
        .debts
        .update_status(&ctx, &ids[0], DebtStatus::Other("archived".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(graph.debts.get_debt_item(&ctx, &ids[0]).await.unwrap().status, DebtStatus::Pending);
}

#[tokio::test]
async fn test_update_status_missing_is_not_found() {
    let (graph, _) = setup().await;
    let err = graph
        .debts
        .update_status(&Context::background(), "ghost", DebtStatus::Remediated)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_deleting_service_orphans_no_debt_edges() {
    let (graph, svc) = setup().await;
    let ctx = Context::background();
    let ids = seed_debts(&graph, &svc.id, 2).await;

    graph.services.delete_service(&ctx, &svc.id).await.unwrap();

    // Debt nodes survive; the owning edge is gone with the service.
    let debt = graph.debts.get_debt_item(&ctx, &ids[0]).await.unwrap();
    assert_eq!(debt.status, DebtStatus::Pending);
    assert!(graph.debts.get_debt_by_service_id(&ctx, &svc.id, 1, 10, false).await.unwrap().is_empty());
}
