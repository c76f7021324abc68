//! Remote-first document access with local fallback.
//!
//! # Responsibility
//! - Define the `DocumentStore` contract the workflow engine runs against.
//! - Route every operation to the remote backend when one is configured and
//!   transparently retry it on the local store when the remote fails.
//! - Route notification delivery and listing the same way, so a notification
//!   is read back from wherever it was written while the remote stays up.
//!
//! # Invariants
//! - Remote failures never reach callers; only local failures do.
//! - There is no reconciliation: a write that lands locally during an outage
//!   is not replayed remotely later, and vice versa.
//! - The audit ledger is local only; the engine appends every event there.

pub mod gateway;
pub mod http;
pub mod inbox;
pub mod remote;
mod wire;

pub use gateway::SyncGateway;
pub use http::HttpRemoteBackend;
pub use inbox::RemoteFirstInbox;
pub use remote::{RemoteBackend, UpstreamError, UpstreamResult};

use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument, WorkflowState};
use crate::model::identity::Identity;
use crate::repo::document_repo::DocumentFilter;
use crate::repo::RepoResult;
use log::{info, warn};
use std::time::Instant;

/// Document persistence as seen by the workflow engine.
///
/// Every call carries the acting identity so remote backends can attribute
/// requests.
pub trait DocumentStore: Send + Sync {
    fn list(&self, filter: &DocumentFilter, identity: &Identity) -> RepoResult<Vec<Document>>;
    /// Fails with `RepoError::NotFound` when the document does not exist.
    fn get(&self, id: &DocumentId, identity: &Identity) -> RepoResult<Document>;
    fn create(&self, draft: &NewDocument, identity: &Identity) -> RepoResult<Document>;
    fn update(
        &self,
        id: &DocumentId,
        patch: &DocumentPatch,
        identity: &Identity,
    ) -> RepoResult<Document>;
    /// Writes `target` only if the document is still in `expected`.
    fn commit_transition(
        &self,
        id: &DocumentId,
        expected: WorkflowState,
        target: WorkflowState,
        identity: &Identity,
    ) -> RepoResult<Document>;
    /// Undoes a committed transition, putting `previous` back in place.
    fn revert_transition(
        &self,
        previous: &Document,
        committed: WorkflowState,
        identity: &Identity,
    ) -> RepoResult<()>;
    fn remove(&self, id: &DocumentId, identity: &Identity) -> RepoResult<()>;
    /// Undoes a removal by re-inserting `document` unchanged.
    fn restore(&self, document: &Document, identity: &Identity) -> RepoResult<()>;
}

/// Runs `call` against `remote` when one is configured.
///
/// Returns `None` when there is no remote or the call failed; the failure is
/// logged and the caller continues on local storage.
pub(crate) fn try_remote<T>(
    remote: Option<&dyn RemoteBackend>,
    operation: &'static str,
    call: impl FnOnce(&dyn RemoteBackend) -> UpstreamResult<T>,
) -> Option<T> {
    let remote = remote?;
    let started_at = Instant::now();
    match call(remote) {
        Ok(value) => {
            info!(
                "event=remote_call module=sync status=ok operation={} duration_ms={}",
                operation,
                started_at.elapsed().as_millis()
            );
            Some(value)
        }
        Err(err) => {
            warn!(
                "event=remote_call module=sync status=fallback operation={} duration_ms={} reason={}",
                operation,
                started_at.elapsed().as_millis(),
                err
            );
            None
        }
    }
}
