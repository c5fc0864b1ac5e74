//! Integration tests for async resources.
//!
//! Timing-sensitive tests run on a paused clock, so "100 ms" fetches
//! resolve instantly and in a deterministic order.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hostdesk_backend::{BackendError, Latency, MemoryBackend, QueryFilter};
use hostdesk_resource::{AsyncResource, ResourceError, TableQuery};
use serde::Serialize;
use serde_json::json;

// =========================================================================
// Helpers
// =========================================================================

#[derive(Serialize)]
struct Filters {
    status: &'static str,
    page: u32,
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

// =========================================================================
// Ordering
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_slow_superseded_fetch_never_overwrites_newer_result() {
    let r: AsyncResource<&'static str, String> = AsyncResource::new();

    r.activate(&"A", || async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok("A")
    })
    .unwrap();
    r.activate(&"B", || async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok("B")
    })
    .unwrap();

    let state = r.settled().await;
    assert_eq!(state.data, Some("B"));

    // Let the slow first fetch finish; its result must be dropped.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let state = r.state();
    assert_eq!(state.data, Some("B"));
    assert!(!state.loading);
}

#[tokio::test(start_paused = true)]
async fn test_loading_stays_true_until_latest_cycle_finishes() {
    let r: AsyncResource<u32, String> = AsyncResource::new();

    r.activate(&1, || async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(1)
    })
    .unwrap();
    r.activate(&2, || async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(2)
    })
    .unwrap();

    // The first (superseded) fetch completes here but must not end loading.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let state = r.state();
    assert!(state.loading);
    assert_eq!(state.data, None);

    assert_eq!(r.settled().await.data, Some(2));
}

// =========================================================================
// Dependency comparison
// =========================================================================

#[tokio::test]
async fn test_equal_dependencies_do_not_refetch() {
    let r: AsyncResource<u32, String> = AsyncResource::new();
    let calls = counter();

    for round in 0..3 {
        let calls = Arc::clone(&calls);
        // A freshly built options value each time, same content.
        let started = r
            .activate(&Filters { status: "active", page: 1 }, move || {
                let calls = Arc::clone(&calls);
                async move { Ok(calls.fetch_add(1, Ordering::SeqCst) as u32) }
            })
            .unwrap();
        assert_eq!(started, round == 0);
        r.settled().await;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_changed_dependencies_refetch() {
    let r: AsyncResource<u32, String> = AsyncResource::new();

    assert!(r.activate(&Filters { status: "active", page: 1 }, || async { Ok(1) }).unwrap());
    r.settled().await;
    assert!(!r.activate(&Filters { status: "active", page: 1 }, || async { Ok(9) }).unwrap());
    assert!(r.activate(&Filters { status: "active", page: 2 }, || async { Ok(2) }).unwrap());

    assert_eq!(r.settled().await.data, Some(2));
}

#[tokio::test]
async fn test_unserializable_dependencies_are_rejected() {
    let r: AsyncResource<u32, String> = AsyncResource::new();
    let mut deps = std::collections::HashMap::new();
    deps.insert((1, 2), "x");

    let err = r.activate(&deps, || async { Ok(1) }).unwrap_err();

    assert!(matches!(err, ResourceError::Dependencies(_)));
    assert!(!r.state().loading);
}

// =========================================================================
// Data / error commits
// =========================================================================

#[tokio::test]
async fn test_error_keeps_previous_data() {
    let r: AsyncResource<Vec<&'static str>, String> = AsyncResource::new();

    r.activate(&1, || async { Ok(vec!["x"]) }).unwrap();
    assert_eq!(r.settled().await.data, Some(vec!["x"]));

    r.activate(&2, || async { Err("network down".to_string()) }).unwrap();
    let state = r.settled().await;

    assert_eq!(state.data, Some(vec!["x"]), "stale data must survive an error");
    assert_eq!(state.error.as_deref(), Some("network down"));
    assert!(!state.loading);
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let r: AsyncResource<u32, String> = AsyncResource::new();

    r.activate(&1, || async { Err("boom".to_string()) }).unwrap();
    assert!(r.settled().await.error.is_some());

    r.activate(&2, || async { Ok(5) }).unwrap();
    let state = r.settled().await;

    assert_eq!(state.data, Some(5));
    assert_eq!(state.error, None);
}

#[tokio::test(start_paused = true)]
async fn test_new_cycle_clears_error_while_loading() {
    let r: AsyncResource<u32, String> = AsyncResource::new();
    r.activate(&1, || async { Err("boom".to_string()) }).unwrap();
    r.settled().await;

    r.activate(&2, || async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(1)
    })
    .unwrap();

    let state = r.state();
    assert!(state.loading);
    assert_eq!(state.error, None);
}

// =========================================================================
// refetch()
// =========================================================================

#[tokio::test]
async fn test_refetch_reruns_latest_fetch() {
    let r: AsyncResource<usize, String> = AsyncResource::new();
    let calls = counter();
    let c = Arc::clone(&calls);
    r.activate(&"invoices", move || {
        let c = Arc::clone(&c);
        async move { Ok(c.fetch_add(1, Ordering::SeqCst) + 1) }
    })
    .unwrap();
    assert_eq!(r.settled().await.data, Some(1));

    assert!(r.refetch());
    assert!(r.state().loading);

    assert_eq!(r.settled().await.data, Some(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =========================================================================
// TableQuery
// =========================================================================

fn backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new().with_rows(
        "customers",
        vec![
            json!({"id": 1, "name": "Acme", "status": "active"}),
            json!({"id": 2, "name": "Bolt", "status": "suspended"}),
            json!({"id": 3, "name": "Cirrus", "status": "active"}),
        ],
    ))
}

#[tokio::test]
async fn test_table_query_loads_filtered_rows() {
    let b = backend();
    let q = TableQuery::new(
        Arc::clone(&b),
        "customers",
        QueryFilter::new().eq("status", "active").order("name", false),
    )
    .unwrap();

    let rows = q.settled().await.data.expect("rows loaded");

    let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Cirrus", "Acme"]);
    assert_eq!(q.table(), "customers");
}

#[tokio::test]
async fn test_table_query_same_filter_does_not_requery() {
    let b = backend();
    let q = TableQuery::new(Arc::clone(&b), "customers", QueryFilter::new().eq("status", "active")).unwrap();
    q.settled().await;

    assert!(!q.set_filter(QueryFilter::new().eq("status", "active")).unwrap());
    assert!(q.set_filter(QueryFilter::new().eq("status", "suspended")).unwrap());

    let rows = q.settled().await.data.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(b.calls().query, 2);
}

#[tokio::test]
async fn test_table_query_reordered_constraints_do_not_requery() {
    let b = backend();
    let q = TableQuery::new(
        Arc::clone(&b),
        "customers",
        QueryFilter::new().eq("status", "active").eq("id", 3),
    )
    .unwrap();
    q.settled().await;

    assert!(!q.set_filter(QueryFilter::new().eq("id", 3).eq("status", "active")).unwrap());

    assert_eq!(q.state().data.map(|r| r.len()), Some(1));
    assert_eq!(b.calls().query, 1);
}

#[tokio::test]
async fn test_table_query_outage_keeps_rows() {
    let b = backend();
    let q = TableQuery::new(Arc::clone(&b), "customers", QueryFilter::new()).unwrap();
    assert_eq!(q.settled().await.data.map(|r| r.len()), Some(3));

    b.set_offline(true);
    assert!(q.refetch());
    let state = q.settled().await;

    assert_eq!(state.data.map(|r| r.len()), Some(3));
    assert!(matches!(state.error, Some(BackendError::Transport(_))));
}

#[tokio::test(start_paused = true)]
async fn test_table_query_reports_loading_during_latency() {
    let b = Arc::new(
        MemoryBackend::new()
            .with_rows("orders", vec![json!({"id": 10})])
            .with_latency(Latency {
                query: Duration::from_millis(300),
                ..Latency::default()
            }),
    );
    let q = TableQuery::new(b, "orders", QueryFilter::new()).unwrap();

    assert!(q.state().loading);
    let state = q.settled().await;
    assert!(!state.loading);
    assert_eq!(state.data, Some(vec![json!({"id": 10})]));
}
