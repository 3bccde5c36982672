use std::sync::Arc;

use super::mocks::{check_request, MockCheckResolver};
use crate::error::DomainError;
use crate::resolver::{CheckContext, CheckResolver, CycleDetectionCheckResolver};

fn wired(mock: &Arc<MockCheckResolver>) -> CycleDetectionCheckResolver {
    let resolver = CycleDetectionCheckResolver::new();
    resolver.set_delegate(Arc::clone(mock) as Arc<dyn CheckResolver>);
    resolver
}

#[tokio::test]
async fn test_revisited_path_is_denied_with_cycle_marker() {
    let mock = Arc::new(MockCheckResolver::allowing());
    let resolver = wired(&mock);

    let request = check_request("store", "model", "group:1", "member", "user:jon", 25);
    let request = request.with_visited(CycleDetectionCheckResolver::path_signature(&request));

    let response = resolver
        .resolve_check(&CheckContext::new(), &request)
        .await
        .unwrap();

    assert!(!response.allowed);
    assert!(response.cycle_detected());
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_delegate_receives_extended_visited_set() {
    let mock = Arc::new(MockCheckResolver::allowing());
    let resolver = wired(&mock);

    let request = check_request("store", "model", "group:1", "member", "user:jon", 25);
    let response = resolver
        .resolve_check(&CheckContext::new(), &request)
        .await
        .unwrap();

    assert!(response.allowed);
    assert!(request.visited_paths.is_empty());

    let forwarded = mock.requests();
    assert_eq!(forwarded.len(), 1);
    assert!(forwarded[0]
        .visited_paths
        .contains("group:1#member@user:jon"));
    assert_eq!(forwarded[0].tuple_key, request.tuple_key);
}

#[tokio::test]
async fn test_exhausted_depth_is_an_error() {
    let mock = Arc::new(MockCheckResolver::allowing());
    let resolver = wired(&mock);

    let request = check_request("store", "model", "group:1", "member", "user:jon", 0);
    let err = resolver
        .resolve_check(&CheckContext::new(), &request)
        .await
        .unwrap_err();

    assert_eq!(err, DomainError::DepthLimitExceeded { max_depth: 0 });
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_cycle_is_reported_before_depth_exhaustion() {
    let mock = Arc::new(MockCheckResolver::allowing());
    let resolver = wired(&mock);

    let request = check_request("store", "model", "group:1", "member", "user:jon", 0);
    let request = request.with_visited("group:1#member@user:jon");

    let response = resolver
        .resolve_check(&CheckContext::new(), &request)
        .await
        .unwrap();
    assert!(response.cycle_detected());
}

#[tokio::test]
async fn test_delegate_errors_pass_through() {
    let mock = Arc::new(MockCheckResolver::returning(Err(DomainError::StorageError {
        message: "unavailable".to_string(),
    })));
    let resolver = wired(&mock);

    let request = check_request("store", "model", "group:1", "member", "user:jon", 25);
    let err = resolver
        .resolve_check(&CheckContext::new(), &request)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::StorageError {
            message: "unavailable".to_string()
        }
    );
}

#[tokio::test]
async fn test_cancelled_context_fails_fast() {
    let mock = Arc::new(MockCheckResolver::allowing());
    let resolver = wired(&mock);

    let ctx = CheckContext::new();
    ctx.cancel();

    let request = check_request("store", "model", "group:1", "member", "user:jon", 25);
    let err = resolver.resolve_check(&ctx, &request).await.unwrap_err();

    assert!(err.is_cancellation());
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_unwired_and_closed_resolver_errors() {
    let request = check_request("store", "model", "group:1", "member", "user:jon", 25);

    let unwired = CycleDetectionCheckResolver::new();
    let err = unwired
        .resolve_check(&CheckContext::new(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ResolverError { .. }));

    let mock = Arc::new(MockCheckResolver::allowing());
    let resolver = wired(&mock);
    resolver.close().await;
    let err = resolver
        .resolve_check(&CheckContext::new(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ResolverError { .. }));
    assert_eq!(Arc::strong_count(&mock), 1);
}
