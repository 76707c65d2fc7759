//! Engine behavior tests over the in-memory backend
//!
//! Covers the correctness properties of the review and crediting paths:
//! idempotent webhook crediting, review atomicity, adjustment bounds,
//! admission policies, terminal-state immutability, and bulk partial skip.

mod support;

use serde_json::json;

use points_core::entities::{AuditAction, ExternalEventStatus, SubmissionStatus};
use points_core::policy::QuotaDimension;
use points_core::value_objects::RecordId;
use points_core::{ActivityCode, CreditSource, DomainError, Submission, SubmissionPayload, Visibility};
use points_service::dto::{BulkReviewRequest, CreateSubmissionRequest, ReviewRequest};
use points_service::{IngestService, PointsService, ReviewService, SubmissionService};

use support::{next_id, test_context, InMemoryBackend};

fn amplify_request(peers: u32, students: u32) -> CreateSubmissionRequest {
    CreateSubmissionRequest {
        activity: "amplify".to_string(),
        visibility: None,
        payload: json!({ "peers_trained": peers, "students_trained": students }),
    }
}

fn learn_request() -> CreateSubmissionRequest {
    CreateSubmissionRequest {
        activity: "learn".to_string(),
        visibility: None,
        payload: json!({ "course_name": "Foundations" }),
    }
}

fn approve(note: Option<&str>, point_override: Option<i64>) -> ReviewRequest {
    ReviewRequest {
        decision: "approve".to_string(),
        note: note.map(String::from),
        point_override,
    }
}

fn reject() -> ReviewRequest {
    ReviewRequest {
        decision: "reject".to_string(),
        note: None,
        point_override: None,
    }
}

fn webhook_delivery(event_id: &str, email: &str) -> serde_json::Value {
    json!({
        "id": event_id,
        "tag": " Learn_Course_Complete ",
        "contact_id": "contact-77",
        "email": email,
    })
}

fn backdated_amplify(user_id: RecordId, peers: u32, students: u32) -> Submission {
    Submission::new(
        next_id(),
        user_id,
        SubmissionPayload::Amplify {
            peers_trained: peers,
            students_trained: students,
            session_format: None,
            evidence_path: None,
        },
        Visibility::Public,
    )
}

// ============================================================================
// Webhook idempotency
// ============================================================================

#[tokio::test]
async fn ingesting_the_same_event_twice_credits_once() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let ingest = IngestService::new(&ctx);

    let delivery = webhook_delivery("evt-100", "pat@example.edu");

    let first = ingest.ingest_event(delivery.clone()).await.unwrap();
    assert_eq!(first.status, "processed");

    let second = ingest.ingest_event(delivery).await.unwrap();
    assert_eq!(second.status, "duplicate");

    let entries = backend.ledger_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].delta, 50);
    assert_eq!(entries[0].user_id, user_id);
    assert_eq!(entries[0].source, CreditSource::Webhook);

    // Both records kept their terminal statuses.
    assert_eq!(
        backend.event(first.event_record_id).unwrap().status,
        ExternalEventStatus::Processed
    );
    assert_eq!(
        backend.event(second.event_record_id).unwrap().status,
        ExternalEventStatus::Duplicate
    );

    // Badge evaluation ran exactly once, for the credited user.
    assert_eq!(backend.badge_evaluations(), vec![user_id.into_inner()]);
}

#[tokio::test]
async fn redelivery_with_fresh_event_id_is_stopped_by_the_grant() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    backend.seed_user("pat@example.edu");
    let ingest = IngestService::new(&ctx);

    let first = ingest
        .ingest_event(webhook_delivery("evt-100", "pat@example.edu"))
        .await
        .unwrap();
    assert_eq!(first.status, "processed");

    // Upstream re-sends the same completion under a new event id.
    let second = ingest
        .ingest_event(webhook_delivery("evt-200", "pat@example.edu"))
        .await
        .unwrap();
    assert_eq!(second.status, "duplicate");

    assert_eq!(backend.ledger_entries().len(), 1);
}

#[tokio::test]
async fn unmatched_event_queues_and_reprocesses_after_linkage() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let ingest = IngestService::new(&ctx);

    let response = ingest
        .ingest_event(webhook_delivery("evt-300", "new@example.edu"))
        .await
        .unwrap();
    assert_eq!(response.status, "queued_unmatched");
    assert!(backend.ledger_entries().is_empty());

    // Account appears later; reprocess resolves and credits.
    backend.seed_user("new@example.edu");
    let reprocessed = ingest.reprocess_event(response.event_record_id).await.unwrap();
    assert_eq!(reprocessed.status, "processed");
    assert_eq!(backend.ledger_entries().len(), 1);

    // Reprocessing a processed event is a no-op.
    let again = ingest.reprocess_event(response.event_record_id).await.unwrap();
    assert_eq!(again.status, "processed");
    assert_eq!(backend.ledger_entries().len(), 1);
}

#[tokio::test]
async fn ineligible_user_is_silent_in_webhook_path_but_errors_interactively() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_ineligible_user("student@example.edu");
    let ingest = IngestService::new(&ctx);

    let response = ingest
        .ingest_event(webhook_delivery("evt-400", "student@example.edu"))
        .await
        .unwrap();
    assert_eq!(response.status, "rejected_ineligible");
    assert!(backend.ledger_entries().is_empty());

    let err = ingest
        .reprocess_event(response.event_record_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::Ineligible(id)) if *id == user_id
    ));
}

#[tokio::test]
async fn unrecognized_signal_is_stored_but_ignored() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    backend.seed_user("pat@example.edu");
    let ingest = IngestService::new(&ctx);

    let response = ingest
        .ingest_event(json!({
            "id": "evt-500",
            "tag": "newsletter_signup",
            "email": "pat@example.edu",
        }))
        .await
        .unwrap();
    assert_eq!(response.status, "ignored");
    assert!(backend.ledger_entries().is_empty());
    assert_eq!(
        backend.event(response.event_record_id).unwrap().status,
        ExternalEventStatus::Ignored
    );
}

// ============================================================================
// Review atomicity
// ============================================================================

#[tokio::test]
async fn failed_commit_leaves_submission_and_ledger_untouched() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let reviewer_id = backend.seed_user("reviewer@example.edu");

    let submissions = SubmissionService::new(&ctx);
    let created = submissions
        .create_submission(user_id, amplify_request(10, 20))
        .await
        .unwrap();
    let submission_id: RecordId = created.id.parse().unwrap();

    backend.fail_next_review_commit();
    let reviews = ReviewService::new(&ctx);
    let err = reviews
        .review(submission_id, reviewer_id, approve(None, None))
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::Database(_))));

    // No partial commit: still pending, no credit, no review audit.
    let stored = backend.submission(submission_id).unwrap();
    assert_eq!(stored.status, SubmissionStatus::Pending);
    assert!(stored.reviewer_id.is_none());
    assert!(backend.ledger_entries().is_empty());
    assert!(backend
        .audits()
        .iter()
        .all(|a| a.action != AuditAction::ApproveSubmission));

    // The retry succeeds and credits exactly once.
    reviews
        .review(submission_id, reviewer_id, approve(None, None))
        .await
        .unwrap();
    assert_eq!(backend.ledger_entries().len(), 1);
}

// ============================================================================
// Adjustment bounds
// ============================================================================

#[tokio::test]
async fn point_override_is_bounded_to_twenty_percent_of_base() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let reviewer_id = backend.seed_user("reviewer@example.edu");
    let submissions = SubmissionService::new(&ctx);
    let reviews = ReviewService::new(&ctx);

    // 2*40 + 20 = 100 base points.
    let cases = [(121, false), (120, true), (80, true), (79, false)];
    for (override_points, should_pass) in cases {
        let created = submissions
            .create_submission(user_id, amplify_request(40, 20))
            .await
            .unwrap();
        let submission_id: RecordId = created.id.parse().unwrap();

        let result = reviews
            .review(submission_id, reviewer_id, approve(Some("adjusted"), Some(override_points)))
            .await;

        if should_pass {
            let response = result.unwrap();
            assert_eq!(response.status, "approved");
        } else {
            let err = result.unwrap_err();
            match err.as_domain() {
                Some(DomainError::PointAdjustmentOutOfBounds {
                    base_points,
                    override_points: attempted,
                    max_adjustment,
                }) => {
                    assert_eq!(*base_points, 100);
                    assert_eq!(*attempted, override_points);
                    assert_eq!(*max_adjustment, 20);
                }
                other => panic!("expected PointAdjustmentOutOfBounds, got {other:?}"),
            }
            // A rejected override must not transition the submission.
            let stored = backend.submission(submission_id).unwrap();
            assert_eq!(stored.status, SubmissionStatus::Pending);
        }
    }

    // Accepted overrides produced a ledger entry and an adjustment audit each.
    let deltas: Vec<i64> = backend.ledger_entries().iter().map(|e| e.delta).collect();
    assert_eq!(deltas, vec![120, 80]);
    let adjust_audits = backend
        .audits()
        .iter()
        .filter(|a| a.action == AuditAction::AdjustPoints)
        .count();
    assert_eq!(adjust_audits, 2);
}

// ============================================================================
// Single-completion policy
// ============================================================================

#[tokio::test]
async fn learn_stage_allows_one_active_submission() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let reviewer_id = backend.seed_user("reviewer@example.edu");
    let submissions = SubmissionService::new(&ctx);
    let reviews = ReviewService::new(&ctx);

    let first = submissions
        .create_submission(user_id, learn_request())
        .await
        .unwrap();

    let err = submissions
        .create_submission(user_id, learn_request())
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::DuplicateSubmission)));

    // Rejection frees the stage.
    let first_id: RecordId = first.id.parse().unwrap();
    reviews.review(first_id, reviewer_id, reject()).await.unwrap();

    submissions
        .create_submission(user_id, learn_request())
        .await
        .unwrap();
}

#[tokio::test]
async fn learn_approval_acknowledges_without_crediting() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let reviewer_id = backend.seed_user("reviewer@example.edu");
    let submissions = SubmissionService::new(&ctx);
    let reviews = ReviewService::new(&ctx);

    let created = submissions
        .create_submission(user_id, learn_request())
        .await
        .unwrap();
    let submission_id: RecordId = created.id.parse().unwrap();

    let response = reviews
        .review(submission_id, reviewer_id, approve(None, None))
        .await
        .unwrap();
    assert_eq!(response.status, "approved");

    // Learn credit is owned by the webhook path.
    assert!(backend.ledger_entries().is_empty());
}

// ============================================================================
// Rolling quota
// ============================================================================

#[tokio::test]
async fn rolling_quota_admits_up_to_the_ceiling() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let submissions = SubmissionService::new(&ctx);

    // 45 peers inside the window; 30 more just outside it must not count.
    backend.seed_submission(backdated_amplify(user_id, 20, 0), 1);
    backend.seed_submission(backdated_amplify(user_id, 25, 0), 3);
    backend.seed_submission(backdated_amplify(user_id, 30, 0), 8);

    // 45 + 5 = 50: exactly at the ceiling, admitted.
    submissions
        .create_submission(user_id, amplify_request(5, 0))
        .await
        .unwrap();
}

#[tokio::test]
async fn rolling_quota_rejects_one_past_the_ceiling() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let submissions = SubmissionService::new(&ctx);

    backend.seed_submission(backdated_amplify(user_id, 20, 0), 1);
    backend.seed_submission(backdated_amplify(user_id, 25, 0), 3);

    let err = submissions
        .create_submission(user_id, amplify_request(6, 0))
        .await
        .unwrap_err();
    match err.as_domain() {
        Some(DomainError::QuotaExceeded {
            dimension,
            attempted,
            ceiling,
        }) => {
            assert_eq!(*dimension, QuotaDimension::Peers);
            assert_eq!(*attempted, 51);
            assert_eq!(*ceiling, 50);
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }
}

// ============================================================================
// Terminal-state immutability
// ============================================================================

#[tokio::test]
async fn double_review_fails_and_credits_once() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let reviewer_id = backend.seed_user("reviewer@example.edu");
    let submissions = SubmissionService::new(&ctx);
    let reviews = ReviewService::new(&ctx);

    let created = submissions
        .create_submission(user_id, amplify_request(10, 20))
        .await
        .unwrap();
    let submission_id: RecordId = created.id.parse().unwrap();

    reviews
        .review(submission_id, reviewer_id, approve(None, None))
        .await
        .unwrap();

    let err = reviews
        .review(submission_id, reviewer_id, approve(None, None))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::InvalidState {
            current: SubmissionStatus::Approved
        })
    ));

    assert_eq!(backend.ledger_entries().len(), 1);
}

// ============================================================================
// Bulk review
// ============================================================================

#[tokio::test]
async fn bulk_review_skips_concurrently_reviewed_submissions() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let reviewer_id = backend.seed_user("reviewer@example.edu");
    let other_reviewer_id = backend.seed_user("lead@example.edu");
    let submissions = SubmissionService::new(&ctx);
    let reviews = ReviewService::new(&ctx);

    let mut ids = Vec::new();
    for peers in [1u32, 2, 3] {
        let created = submissions
            .create_submission(user_id, amplify_request(peers, 0))
            .await
            .unwrap();
        ids.push(created.id);
    }

    // Another actor approves the middle one first.
    let middle: RecordId = ids[1].parse().unwrap();
    reviews
        .review(middle, other_reviewer_id, approve(None, None))
        .await
        .unwrap();

    let response = reviews
        .bulk_review(
            reviewer_id,
            BulkReviewRequest {
                submission_ids: ids.clone(),
                decision: "approve".to_string(),
                note: Some("cohort review".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(response.processed_count, 2);

    for raw_id in &ids {
        let id: RecordId = raw_id.parse().unwrap();
        assert_eq!(
            backend.submission(id).unwrap().status,
            SubmissionStatus::Approved
        );
    }
}

#[tokio::test]
async fn bulk_review_rejects_oversized_batches() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let reviewer_id = backend.seed_user("reviewer@example.edu");
    let reviews = ReviewService::new(&ctx);

    let err = reviews
        .bulk_review(
            reviewer_id,
            BulkReviewRequest {
                submission_ids: (0..51).map(|i| i.to_string()).collect(),
                decision: "approve".to_string(),
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn amplify_approval_end_to_end() {
    let backend = InMemoryBackend::new();
    let ctx = test_context(&backend);
    let user_id = backend.seed_user("pat@example.edu");
    let reviewer_id = backend.seed_user("reviewer@example.edu");
    let submissions = SubmissionService::new(&ctx);
    let reviews = ReviewService::new(&ctx);
    let points = PointsService::new(&ctx);

    let created = submissions
        .create_submission(user_id, amplify_request(10, 20))
        .await
        .unwrap();
    let submission_id: RecordId = created.id.parse().unwrap();

    let response = reviews
        .review(submission_id, reviewer_id, approve(None, None))
        .await
        .unwrap();
    assert_eq!(response.status, "approved");
    assert_eq!(response.reviewer_id.as_deref(), Some(reviewer_id.to_string().as_str()));

    // delta = computePoints(amplify, payload) = 2*10 + 20.
    let entries = backend.ledger_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].delta, 40);
    assert_eq!(entries[0].activity, ActivityCode::Amplify);
    assert_eq!(entries[0].source, CreditSource::Manual);

    // Exactly one APPROVE_SUBMISSION audit entry for this submission.
    let approvals = backend
        .audits()
        .iter()
        .filter(|a| {
            a.action == AuditAction::ApproveSubmission
                && a.target_id == submission_id.to_string()
        })
        .count();
    assert_eq!(approvals, 1);

    // Derived totals reflect the single credit.
    let summary = points.summary_for_user(user_id).await.unwrap();
    assert_eq!(summary.total, 40);
    assert_eq!(summary.by_activity.len(), 1);
    assert_eq!(summary.by_activity[0].activity, "amplify");
}
