use docflow_core::workflow::graph;
use docflow_core::{
    AuthorizationFailure, DocflowError, DocflowService, Document, DocumentContent, Identity,
    NewDocument, Role, WorkflowPolicy, WorkflowState,
};
use std::sync::Barrier;
use std::thread;

fn alice() -> Identity {
    Identity::new("alice", Role::Submitter)
}

fn rita() -> Identity {
    Identity::new("rita", Role::Reviewer)
}

fn aaron() -> Identity {
    Identity::new("aaron", Role::Approver)
}

fn create_draft(service: &DocflowService) -> Document {
    let draft = NewDocument::new(
        "Travel policy",
        "alice",
        vec!["hr".to_string()],
        DocumentContent::text("Book economy."),
    );
    service.create_document(&draft, &alice()).unwrap()
}

/// Drives a fresh document into `state` using legitimate actors.
fn document_in(service: &DocflowService, state: WorkflowState) -> Document {
    let document = create_draft(service);
    let path: &[(WorkflowState, Identity)] = match state {
        WorkflowState::Draft => &[],
        WorkflowState::Submitted => &[(WorkflowState::Submitted, alice())],
        WorkflowState::UnderReview => &[
            (WorkflowState::Submitted, alice()),
            (WorkflowState::UnderReview, rita()),
        ],
        WorkflowState::Approved => &[
            (WorkflowState::Submitted, alice()),
            (WorkflowState::UnderReview, rita()),
            (WorkflowState::Approved, aaron()),
        ],
        WorkflowState::Rejected => &[
            (WorkflowState::Submitted, alice()),
            (WorkflowState::UnderReview, rita()),
            (WorkflowState::Rejected, aaron()),
        ],
    };
    let mut current = document;
    for (target, actor) in path {
        current = service
            .transition_document(&current.id, *target, actor)
            .unwrap();
    }
    assert_eq!(current.workflow_state, state);
    current
}

#[test]
fn create_starts_in_draft_and_is_audited() {
    let service = DocflowService::open_in_memory().unwrap();
    let document = create_draft(&service);

    assert_eq!(document.workflow_state, WorkflowState::Draft);
    assert_eq!(document.created_at, document.updated_at);
    let audits = service.list_audits(&document.id).unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "Created");
}

#[test]
fn every_state_target_role_combination_follows_the_tables() {
    for from in WorkflowState::ALL {
        for target in WorkflowState::ALL {
            for role in Role::ALL {
                let service = DocflowService::open_in_memory().unwrap();
                let before = document_in(&service, from);
                let actor = Identity::new("zed", role);
                let audits_before = service.list_audits(&before.id).unwrap().len();

                let result = service.transition_document(&before.id, target, &actor);
                let after = service.get_document(&before.id, &actor).unwrap();
                let audits_after = service.list_audits(&before.id).unwrap().len();

                if !graph::is_legal(from, target) {
                    assert!(
                        matches!(result, Err(DocflowError::IllegalTransition { .. })),
                        "{from} -> {target} as {role}: {result:?}"
                    );
                } else if !graph::is_authorized(role, target) {
                    assert!(
                        matches!(
                            result,
                            Err(DocflowError::Unauthorized(
                                AuthorizationFailure::RoleNotPermitted { .. }
                            ))
                        ),
                        "{from} -> {target} as {role}: {result:?}"
                    );
                } else {
                    let updated = result.unwrap();
                    assert_eq!(updated.workflow_state, target);
                    assert!(updated.updated_at > before.updated_at);
                    assert_eq!(after, updated);
                    assert_eq!(audits_after, audits_before + 1);
                    continue;
                }

                assert_eq!(after, before, "failed transition must not mutate");
                assert_eq!(audits_after, audits_before, "failed transition must not audit");
            }
        }
    }
}

#[test]
fn transition_event_records_label_actor_and_time() {
    let service = DocflowService::open_in_memory().unwrap();
    let submitted = document_in(&service, WorkflowState::Submitted);

    let reviewed = service
        .transition_document(&submitted.id, WorkflowState::UnderReview, &rita())
        .unwrap();

    let audits = service.list_audits(&submitted.id).unwrap();
    let last = audits.last().unwrap();
    assert_eq!(last.action, "Workflow → Under Review");
    assert_eq!(last.details, "Submitted to Under Review");
    assert_eq!(last.actor, "rita");
    assert!(last.at >= reviewed.updated_at);
}

#[test]
fn pdf_marker_document_follows_submitter_scenario() {
    let service = DocflowService::open_in_memory().unwrap();
    let content =
        DocumentContent::from_input("file:Policy.pdf;type:application/pdf;data:JVBERi0xLjQK")
            .unwrap();
    let draft = NewDocument::new("Policy.pdf", "alice", vec!["hr".to_string()], content);
    let document = service.create_document(&draft, &alice()).unwrap();
    assert_eq!(document.workflow_state, WorkflowState::Draft);

    let submitted = service
        .transition_document(&document.id, WorkflowState::Submitted, &alice())
        .unwrap();
    assert_eq!(submitted.workflow_state, WorkflowState::Submitted);
    let transition_events = service
        .list_audits(&document.id)
        .unwrap()
        .into_iter()
        .filter(|event| event.action.starts_with("Workflow"))
        .count();
    assert_eq!(transition_events, 1);

    let err = service
        .transition_document(&document.id, WorkflowState::Approved, &alice())
        .unwrap_err();
    assert!(matches!(err, DocflowError::Unauthorized(_)));
    assert_eq!(
        service
            .get_document(&document.id, &alice())
            .unwrap()
            .workflow_state,
        WorkflowState::Submitted
    );
}

#[test]
fn approving_a_draft_is_illegal() {
    let service = DocflowService::open_in_memory().unwrap();
    let document = create_draft(&service);

    let err = service
        .transition_document(&document.id, WorkflowState::Approved, &aaron())
        .unwrap_err();
    match err {
        DocflowError::IllegalTransition { from, to } => {
            assert_eq!(from, WorkflowState::Draft);
            assert_eq!(to, WorkflowState::Approved);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_document_is_not_found() {
    let service = DocflowService::open_in_memory().unwrap();
    let err = service
        .transition_document(&"missing".into(), WorkflowState::Submitted, &alice())
        .unwrap_err();
    assert!(matches!(err, DocflowError::NotFound(_)));
}

#[test]
fn authors_cannot_review_their_own_documents() {
    let service = DocflowService::open_in_memory().unwrap();
    let submitted = document_in(&service, WorkflowState::Submitted);
    let alice_as_approver = Identity::new("alice", Role::Approver);

    let err = service
        .transition_document(&submitted.id, WorkflowState::UnderReview, &alice_as_approver)
        .unwrap_err();
    assert!(matches!(
        err,
        DocflowError::Unauthorized(AuthorizationFailure::SelfReview { .. })
    ));
}

#[test]
fn self_review_is_allowed_when_policy_permits_it() {
    let conn = docflow_core::db::open_db_in_memory().unwrap();
    let service = DocflowService::builder(conn)
        .policy(WorkflowPolicy {
            forbid_self_review: false,
        })
        .build();
    let submitted = document_in(&service, WorkflowState::Submitted);

    let reviewed = service
        .transition_document(
            &submitted.id,
            WorkflowState::UnderReview,
            &Identity::new("alice", Role::Reviewer),
        )
        .unwrap();
    assert_eq!(reviewed.workflow_state, WorkflowState::UnderReview);
}

#[test]
fn stale_expected_state_is_a_conflict() {
    let service = DocflowService::open_in_memory().unwrap();
    let reviewed = document_in(&service, WorkflowState::UnderReview);
    service
        .transition_document(&reviewed.id, WorkflowState::Rejected, &aaron())
        .unwrap();

    let err = service
        .transition_document_from(
            &reviewed.id,
            WorkflowState::UnderReview,
            WorkflowState::Approved,
            &aaron(),
        )
        .unwrap_err();
    match err {
        DocflowError::Conflict {
            expected, actual, ..
        } => {
            assert_eq!(expected, WorkflowState::UnderReview);
            assert_eq!(actual, WorkflowState::Rejected);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn concurrent_decisions_on_one_document_let_exactly_one_win() {
    for _ in 0..20 {
        let service = DocflowService::open_in_memory().unwrap();
        let reviewed = document_in(&service, WorkflowState::UnderReview);
        let barrier = Barrier::new(2);

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = [WorkflowState::Approved, WorkflowState::Rejected]
                .into_iter()
                .map(|target| {
                    let service = &service;
                    let barrier = &barrier;
                    let id = reviewed.id.clone();
                    scope.spawn(move || {
                        barrier.wait();
                        service.transition_document_from(
                            &id,
                            WorkflowState::UnderReview,
                            target,
                            &aaron(),
                        )
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        let winners: Vec<&Document> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DocflowError::Conflict { .. }))));

        let stored = service.get_document(&reviewed.id, &aaron()).unwrap();
        assert_eq!(stored.workflow_state, winners[0].workflow_state);
        let decisions = service
            .list_audits(&reviewed.id)
            .unwrap()
            .into_iter()
            .filter(|event| event.details.starts_with("Under Review to"))
            .count();
        assert_eq!(decisions, 1);
    }
}

#[test]
fn concurrent_plain_decisions_let_one_win_and_the_other_see_a_stale_or_final_state() {
    for _ in 0..20 {
        let service = DocflowService::open_in_memory().unwrap();
        let reviewed = document_in(&service, WorkflowState::UnderReview);
        let barrier = Barrier::new(2);

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = [WorkflowState::Approved, WorkflowState::Rejected]
                .into_iter()
                .map(|target| {
                    let service = &service;
                    let barrier = &barrier;
                    let id = reviewed.id.clone();
                    scope.spawn(move || {
                        barrier.wait();
                        service.transition_document(&id, target, &aaron())
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(
            loser,
            DocflowError::Conflict { .. } | DocflowError::IllegalTransition { .. }
        ));
        let decisions = service
            .list_audits(&reviewed.id)
            .unwrap()
            .into_iter()
            .filter(|event| event.details.starts_with("Under Review to"))
            .count();
        assert_eq!(decisions, 1);
    }
}

#[test]
fn reads_do_not_mutate_state_or_history() {
    let service = DocflowService::open_in_memory().unwrap();
    let document = document_in(&service, WorkflowState::Submitted);
    let audits = service.list_audits(&document.id).unwrap();

    for _ in 0..5 {
        assert_eq!(service.get_document(&document.id, &rita()).unwrap(), document);
    }
    assert_eq!(service.list_audits(&document.id).unwrap(), audits);
}
