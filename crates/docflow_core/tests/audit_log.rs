use docflow_core::db::{open_db_in_memory, share};
use docflow_core::model::audit::AuditEvent;
use docflow_core::repo::audit_repo::{AuditRepository, SqliteAuditRepository};
use docflow_core::repo::{RepoError, RepoResult};
use docflow_core::{
    AuditLog, DocflowError, DocflowService, DocumentContent, DocumentFilter, DocumentId,
    Identity, NewDocument, Role, WorkflowState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// SQLite ledger whose appends can be switched off.
struct SwitchableLedger {
    inner: SqliteAuditRepository,
    failing: AtomicBool,
}

impl SwitchableLedger {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteAuditRepository::new(share(open_db_in_memory().unwrap())),
            failing: AtomicBool::new(false),
        })
    }

    fn fail_appends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl AuditRepository for SwitchableLedger {
    fn append_event(&self, event: &AuditEvent) -> RepoResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::InvalidData("ledger offline".to_string()));
        }
        self.inner.append_event(event)
    }

    fn list_for_document(&self, document_id: &DocumentId) -> RepoResult<Vec<AuditEvent>> {
        self.inner.list_for_document(document_id)
    }
}

fn service_with_ledger(ledger: Arc<SwitchableLedger>) -> DocflowService {
    DocflowService::builder(open_db_in_memory().unwrap())
        .audit_repository(ledger)
        .build()
}

fn memo_draft() -> NewDocument {
    NewDocument::new("Memo", "alice", Vec::new(), DocumentContent::text("body"))
}

#[test]
fn events_are_listed_oldest_first_per_document() {
    let log = AuditLog::sqlite(share(open_db_in_memory().unwrap()));
    let doc_a = DocumentId::from("doc-a");
    let doc_b = DocumentId::from("doc-b");

    log.append(&AuditEvent::new(doc_a.clone(), "third", "x", 300, ""))
        .unwrap();
    log.append(&AuditEvent::new(doc_a.clone(), "first", "x", 100, ""))
        .unwrap();
    log.append(&AuditEvent::new(doc_b.clone(), "other", "x", 200, ""))
        .unwrap();
    log.append(&AuditEvent::new(doc_a.clone(), "second", "x", 200, ""))
        .unwrap();

    let actions: Vec<String> = log
        .list_for_document(&doc_a)
        .unwrap()
        .into_iter()
        .map(|event| event.action)
        .collect();
    assert_eq!(actions, vec!["first", "second", "third"]);
    assert_eq!(log.list_for_document(&doc_b).unwrap().len(), 1);
}

#[test]
fn events_with_equal_timestamps_keep_append_order() {
    let log = AuditLog::sqlite(share(open_db_in_memory().unwrap()));
    let doc = DocumentId::from("doc");
    for action in ["one", "two", "three"] {
        log.append(&AuditEvent::new(doc.clone(), action, "x", 500, ""))
            .unwrap();
    }
    let actions: Vec<String> = log
        .list_for_document(&doc)
        .unwrap()
        .into_iter()
        .map(|event| event.action)
        .collect();
    assert_eq!(actions, vec!["one", "two", "three"]);
}

#[test]
fn history_survives_document_removal() {
    let service = DocflowService::open_in_memory().unwrap();
    let alice = Identity::new("alice", Role::Submitter);
    let document = service
        .create_document(
            &NewDocument::new("Temp", "alice", Vec::new(), DocumentContent::text("x")),
            &alice,
        )
        .unwrap();
    service
        .transition_document(&document.id, WorkflowState::Submitted, &alice)
        .unwrap();
    service.remove_document(&document.id, &alice).unwrap();

    let actions: Vec<String> = service
        .list_audits(&document.id)
        .unwrap()
        .into_iter()
        .map(|event| event.action)
        .collect();
    assert_eq!(actions, vec!["Created", "Workflow → Submitted", "Deleted"]);
}

#[test]
fn failed_audit_append_rolls_the_transition_back() {
    let ledger = SwitchableLedger::new();
    let service = service_with_ledger(ledger.clone());
    let alice = Identity::new("alice", Role::Submitter);
    let document = service.create_document(&memo_draft(), &alice).unwrap();

    ledger.fail_appends();
    let err = service
        .transition_document(&document.id, WorkflowState::Submitted, &alice)
        .unwrap_err();
    assert!(matches!(err, DocflowError::Storage(_)));

    let after = service.get_document(&document.id, &alice).unwrap();
    assert_eq!(after, document);
    assert_eq!(service.list_audits(&document.id).unwrap().len(), 1);
}

#[test]
fn failed_audit_append_restores_a_removed_document() {
    let ledger = SwitchableLedger::new();
    let service = service_with_ledger(ledger.clone());
    let alice = Identity::new("alice", Role::Submitter);
    let document = service.create_document(&memo_draft(), &alice).unwrap();

    ledger.fail_appends();
    assert!(service.remove_document(&document.id, &alice).is_err());
    assert_eq!(service.get_document(&document.id, &alice).unwrap(), document);
}

#[test]
fn failed_audit_append_discards_a_new_document() {
    let ledger = SwitchableLedger::new();
    ledger.fail_appends();
    let service = service_with_ledger(ledger);
    let alice = Identity::new("alice", Role::Submitter);

    assert!(service.create_document(&memo_draft(), &alice).is_err());
    assert!(service
        .list_documents(&DocumentFilter::default(), &alice)
        .unwrap()
        .is_empty());
}
