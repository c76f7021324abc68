//! Remote-first gateway over a local document repository.

use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument, WorkflowState};
use crate::model::identity::Identity;
use crate::model::stamp_after;
use crate::repo::document_repo::{DocumentFilter, DocumentRepository};
use crate::repo::{RepoError, RepoResult};
use crate::sync::remote::{RemoteBackend, UpstreamResult};
use crate::sync::{try_remote, DocumentStore};
use log::warn;
use std::sync::Arc;

/// Outcome of a remote compare-and-set attempt.
enum RemoteCommit {
    Committed(Document),
    StateMoved(WorkflowState),
}

/// `DocumentStore` that prefers the remote backend and falls back to `local`.
pub struct SyncGateway<R: DocumentRepository> {
    local: R,
    remote: Option<Arc<dyn RemoteBackend>>,
}

impl<R: DocumentRepository> SyncGateway<R> {
    pub fn new(local: R, remote: Option<Arc<dyn RemoteBackend>>) -> Self {
        Self { local, remote }
    }

    pub fn local_only(local: R) -> Self {
        Self::new(local, None)
    }

    pub fn is_remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    pub fn local(&self) -> &R {
        &self.local
    }

    fn try_remote<T>(
        &self,
        operation: &'static str,
        call: impl FnOnce(&dyn RemoteBackend) -> UpstreamResult<T>,
    ) -> Option<T> {
        try_remote(self.remote.as_deref(), operation, call)
    }
}

impl<R: DocumentRepository> DocumentStore for SyncGateway<R> {
    fn list(&self, filter: &DocumentFilter, identity: &Identity) -> RepoResult<Vec<Document>> {
        if let Some(documents) =
            self.try_remote("list_documents", |remote| remote.list_documents(identity))
        {
            return Ok(filter.apply(documents));
        }
        self.local.list_documents(filter)
    }

    fn get(&self, id: &DocumentId, identity: &Identity) -> RepoResult<Document> {
        if let Some(document) =
            self.try_remote("get_document", |remote| remote.get_document(id, identity))
        {
            return Ok(document);
        }
        self.local
            .get_document(id)?
            .ok_or_else(|| RepoError::NotFound(id.clone()))
    }

    fn create(&self, draft: &NewDocument, identity: &Identity) -> RepoResult<Document> {
        if let Some(document) = self.try_remote("create_document", |remote| {
            remote.create_document(draft, identity)
        }) {
            return Ok(document);
        }
        self.local.create_document(draft)
    }

    fn update(
        &self,
        id: &DocumentId,
        patch: &DocumentPatch,
        identity: &Identity,
    ) -> RepoResult<Document> {
        if let Some(document) = self.try_remote("update_document", |remote| {
            remote.update_document(id, patch, identity)
        }) {
            return Ok(document);
        }
        self.local.update_document(id, patch)
    }

    fn commit_transition(
        &self,
        id: &DocumentId,
        expected: WorkflowState,
        target: WorkflowState,
        identity: &Identity,
    ) -> RepoResult<Document> {
        let outcome = self.try_remote("commit_transition", |remote| {
            let current = remote.get_document(id, identity)?;
            if current.workflow_state != expected {
                return Ok(RemoteCommit::StateMoved(current.workflow_state));
            }
            remote.set_workflow_state(id, target, identity)?;
            // The state write already landed; a failed refresh must not
            // trigger a second, local commit.
            let refreshed = remote.get_document(id, identity).unwrap_or_else(|err| {
                warn!(
                    "event=remote_call module=sync status=error operation=refresh_after_commit reason={}",
                    err
                );
                let mut document = current;
                document.workflow_state = target;
                document.updated_at = stamp_after(document.updated_at);
                document
            });
            Ok(RemoteCommit::Committed(refreshed))
        });

        match outcome {
            Some(RemoteCommit::Committed(document)) => Ok(document),
            Some(RemoteCommit::StateMoved(actual)) => Err(RepoError::Conflict {
                id: id.clone(),
                expected,
                actual,
            }),
            None => self.local.compare_and_set_state(id, expected, target),
        }
    }

    fn revert_transition(
        &self,
        previous: &Document,
        committed: WorkflowState,
        identity: &Identity,
    ) -> RepoResult<()> {
        let outcome = self.try_remote("revert_transition", |remote| {
            let current = remote.get_document(&previous.id, identity)?;
            if current.workflow_state != committed {
                return Ok(Some(current.workflow_state));
            }
            remote.set_workflow_state(&previous.id, previous.workflow_state, identity)?;
            Ok(None)
        });

        match outcome {
            Some(None) => Ok(()),
            Some(Some(actual)) => Err(RepoError::Conflict {
                id: previous.id.clone(),
                expected: committed,
                actual,
            }),
            None => self.local.revert_state(previous, committed),
        }
    }

    fn remove(&self, id: &DocumentId, identity: &Identity) -> RepoResult<()> {
        if self
            .try_remote("remove_document", |remote| remote.remove_document(id, identity))
            .is_some()
        {
            return Ok(());
        }
        self.local.remove_document(id)
    }

    /// The remote API has no way to re-create a document under its old id,
    /// so restores always land in the local store.
    fn restore(&self, document: &Document, _identity: &Identity) -> RepoResult<()> {
        self.local.restore_document(document)
    }
}
