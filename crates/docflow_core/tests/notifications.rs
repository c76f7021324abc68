use docflow_core::db::open_db_in_memory;
use docflow_core::model::notification::Notification;
use docflow_core::repo::{RepoError, RepoResult};
use docflow_core::{
    DocflowService, DocumentContent, Identity, NewDocument, NotificationInbox, Role,
    WorkflowState,
};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const FLUSH: Duration = Duration::from_secs(5);

fn alice() -> Identity {
    Identity::new("alice", Role::Submitter)
}

fn rita() -> Identity {
    Identity::new("rita", Role::Reviewer)
}

fn aaron() -> Identity {
    Identity::new("aaron", Role::Approver)
}

fn draft() -> NewDocument {
    NewDocument::new("Budget", "alice", Vec::new(), DocumentContent::text("numbers"))
}

/// Inbox whose writes always fail.
struct FailingInbox;

impl NotificationInbox for FailingInbox {
    fn deliver(&self, _username: &str, _message: &str) -> RepoResult<Notification> {
        Err(RepoError::InvalidData("inbox unavailable".to_string()))
    }

    fn list_for_user(&self, _username: &str) -> RepoResult<Vec<Notification>> {
        Ok(Vec::new())
    }
}

/// Inbox that blocks every delivery until released.
struct GatedInbox {
    gate: Barrier,
}

impl NotificationInbox for GatedInbox {
    fn deliver(&self, username: &str, message: &str) -> RepoResult<Notification> {
        self.gate.wait();
        Ok(Notification {
            id: "n".to_string(),
            username: username.to_string(),
            message: message.to_string(),
            read: false,
            created_at: 0,
        })
    }

    fn list_for_user(&self, _username: &str) -> RepoResult<Vec<Notification>> {
        Ok(Vec::new())
    }
}

#[test]
fn author_is_notified_of_transitions_made_by_others() {
    let service = DocflowService::open_in_memory().unwrap();
    let document = service.create_document(&draft(), &alice()).unwrap();

    service
        .transition_document(&document.id, WorkflowState::Submitted, &alice())
        .unwrap();
    service
        .transition_document(&document.id, WorkflowState::UnderReview, &rita())
        .unwrap();
    service
        .transition_document(&document.id, WorkflowState::Approved, &aaron())
        .unwrap();
    assert!(service.flush_notifications(FLUSH));

    let inbox = service.list_notifications("alice").unwrap();
    let messages: Vec<&str> = inbox.iter().map(|item| item.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Your document has been approved successfully",
            "Your document \"Budget\" is now Under Review",
        ]
    );
    assert!(inbox.iter().all(|item| !item.read && item.username == "alice"));
    assert!(service.list_notifications("rita").unwrap().is_empty());
}

#[test]
fn rejection_message_names_the_document() {
    let service = DocflowService::open_in_memory().unwrap();
    let document = service.create_document(&draft(), &alice()).unwrap();
    for (target, actor) in [
        (WorkflowState::Submitted, alice()),
        (WorkflowState::UnderReview, rita()),
        (WorkflowState::Rejected, aaron()),
    ] {
        service.transition_document(&document.id, target, &actor).unwrap();
    }
    assert!(service.flush_notifications(FLUSH));

    let latest = &service.list_notifications("alice").unwrap()[0];
    assert_eq!(latest.message, "Your document \"Budget\" has been rejected");
}

#[test]
fn failing_inbox_never_fails_a_transition() {
    let service = DocflowService::builder(open_db_in_memory().unwrap())
        .inbox(Arc::new(FailingInbox))
        .build();
    let document = service.create_document(&draft(), &alice()).unwrap();
    service
        .transition_document(&document.id, WorkflowState::Submitted, &alice())
        .unwrap();

    let reviewed = service
        .transition_document(&document.id, WorkflowState::UnderReview, &rita())
        .unwrap();
    assert_eq!(reviewed.workflow_state, WorkflowState::UnderReview);
    assert!(service.flush_notifications(FLUSH));
    assert_eq!(service.list_audits(&document.id).unwrap().len(), 3);
}

#[test]
fn slow_inbox_does_not_delay_a_transition() {
    let inbox = Arc::new(GatedInbox {
        gate: Barrier::new(2),
    });
    let service = DocflowService::builder(open_db_in_memory().unwrap())
        .inbox(inbox.clone())
        .build();
    let document = service.create_document(&draft(), &alice()).unwrap();
    service
        .transition_document(&document.id, WorkflowState::Submitted, &alice())
        .unwrap();

    // Delivery blocks on the gate; the transition must return regardless.
    let reviewed = service
        .transition_document(&document.id, WorkflowState::UnderReview, &rita())
        .unwrap();
    assert_eq!(reviewed.workflow_state, WorkflowState::UnderReview);

    inbox.gate.wait();
    assert!(service.flush_notifications(FLUSH));
}
