//! Concurrent decisions on the same request.
//!
//! Writes are conditional on the version that was read; a losing writer
//! re-reads and re-applies its decision against the committed state.

mod common;

use std::sync::Arc;

use approval_engine::adapters::sqlite::SqliteApprovalRepository;
use approval_engine::domain::errors::DomainError;
use approval_engine::domain::models::{
    ApproverSelector, DecisionAction, DecisionState, EngineConfig, LogAction, RequestStatus,
    StepTemplate,
};
use approval_engine::domain::ports::ApprovalRepository;
use chrono::Utc;
use common::{id, Harness, RECORD_EFFECT};

#[tokio::test]
async fn test_stale_write_is_rejected() {
    let h = Harness::new().await;
    h.form("leave", None, vec![StepTemplate::new(ApproverSelector::tag("HR")).all_must_approve(true)])
        .await;
    let request = h.submit("leave", "A1").await;
    let repo = SqliteApprovalRepository::new(h.pool.clone());

    let mut first = repo.get(request.id).await.unwrap().unwrap();
    let mut second = first.clone();

    first.decide(&id("H1"), DecisionAction::Approve, None, Utc::now()).unwrap();
    let version = repo.update(&first).await.unwrap();
    assert_eq!(version, request.version + 1);

    second.decide(&id("H2"), DecisionAction::Approve, None, Utc::now()).unwrap();
    let err = repo.update(&second).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(matches!(err, DomainError::ConcurrencyConflict { .. }));

    let stored = repo.get(request.id).await.unwrap().unwrap();
    assert_eq!(stored.version, version);
    assert_eq!(stored.steps[0].approvers[0].decision, DecisionState::Approved);
    assert_eq!(stored.steps[0].approvers[1].decision, DecisionState::Pending);
}

#[tokio::test]
async fn test_update_of_missing_request_is_not_found() {
    let h = Harness::new().await;
    h.form("leave", None, vec![StepTemplate::new(ApproverSelector::manager())]).await;
    let request = h.submit("leave", "A1").await;
    let repo = SqliteApprovalRepository::new(h.pool.clone());

    let mut ghost = request.clone();
    ghost.id = uuid::Uuid::new_v4();
    let err = repo.update(&ghost).await.unwrap_err();
    assert!(matches!(err, DomainError::RequestNotFound(_)));
}

#[tokio::test]
async fn test_concurrent_all_must_approve_decisions_both_land() {
    let config = EngineConfig { max_conflict_retries: 10, conflict_backoff_ms: 1 };
    let h = Harness::with_engine_config(config).await;
    h.form(
        "leave",
        Some(RECORD_EFFECT),
        vec![StepTemplate::new(ApproverSelector::tag("HR")).all_must_approve(true)],
    )
    .await;
    let request = h.submit("leave", "A1").await;

    let handles: Vec<_> = ["H1", "H2"]
        .into_iter()
        .map(|actor| {
            let service = Arc::clone(&h.service);
            let request_id = request.id;
            tokio::spawn(async move { service.decide(request_id, &id(actor), "approve", None).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = h.service.get(request.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Approved);
    assert!(stored.steps[0].approvers.iter().all(|d| d.decision == DecisionState::Approved));
    assert_eq!(h.effect.count(), 1, "terminal effect must run exactly once");
}

#[tokio::test]
async fn test_racing_any_one_approvers_one_wins() {
    let config = EngineConfig { max_conflict_retries: 10, conflict_backoff_ms: 1 };
    let h = Harness::with_engine_config(config).await;
    h.form("leave", Some(RECORD_EFFECT), vec![StepTemplate::new(ApproverSelector::tag("HR"))]).await;
    let request = h.submit("leave", "A1").await;

    let handles: Vec<_> = ["H1", "H2"]
        .into_iter()
        .map(|actor| {
            let service = Arc::clone(&h.service);
            let request_id = request.id;
            tokio::spawn(async move { service.decide(request_id, &id(actor), "reject", None).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    // The loser re-reads a closed request and is refused instead of
    // overwriting the winner's decision.
    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(outcomes
        .iter()
        .filter_map(|o| o.as_ref().err())
        .all(|e| matches!(e, DomainError::RequestNotPending { .. })));

    let stored = h.service.get(request.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Rejected);
    let rejected = stored.steps[0].approvers.iter().filter(|d| d.decision == DecisionState::Rejected).count();
    assert_eq!(rejected, 1);
    assert_eq!(h.effect.count(), 0);
}

#[tokio::test]
async fn test_service_applies_decision_to_externally_updated_state() {
    let config = EngineConfig { max_conflict_retries: 0, conflict_backoff_ms: 0 };
    let h = Harness::with_engine_config(config).await;
    h.form("leave", None, vec![StepTemplate::new(ApproverSelector::tag("HR")).all_must_approve(true)])
        .await;
    let request = h.submit("leave", "A1").await;
    let repo = SqliteApprovalRepository::new(h.pool.clone());

    // Bump the stored version behind the service's back, then check a
    // stale in-memory copy can no longer be written.
    let mut fresh = repo.get(request.id).await.unwrap().unwrap();
    fresh.log(Utc::now(), None, LogAction::StepAdvanced, "touch");
    repo.update(&fresh).await.unwrap();

    let err = repo.update(&request).await.unwrap_err();
    assert!(err.is_conflict());

    // The service reads fresh state, so it still succeeds without retries.
    let decided = h.service.decide(request.id, &id("H1"), "approve", None).await.unwrap();
    assert_eq!(decided.version, request.version + 2);
}
