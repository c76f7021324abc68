//! HTTP implementation of `RemoteBackend`.
//!
//! # Invariants
//! - Every document and workflow request carries `X-USER` and `X-ROLE`
//!   headers for the acting identity.
//! - Every request is bounded by the configured timeout.
//! - Any non-2xx status is an `UpstreamError::Status`.

use crate::model::content::DocumentContent;
use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument, WorkflowState};
use crate::model::identity::Identity;
use crate::model::notification::Notification;
use crate::sync::remote::{RemoteBackend, UpstreamError, UpstreamResult};
use crate::sync::wire::{DocumentDto, NewNotificationDto, NotificationDto};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

const HEADER_USER: &str = "X-USER";
const HEADER_ROLE: &str = "X-ROLE";

/// Blocking HTTP client for the remote document service.
pub struct HttpRemoteBackend {
    client: Client,
    base_url: Url,
}

impl HttpRemoteBackend {
    /// Builds a client rooted at `base_url` (for example
    /// `http://localhost:9090/api`).
    pub fn new(base_url: &str, timeout: Duration) -> UpstreamResult<Self> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|_| UpstreamError::InvalidBaseUrl(base_url.to_string()))?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(UpstreamError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| UpstreamError::Transport {
                operation: "configure",
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> UpstreamResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        identity: Option<&Identity>,
    ) -> UpstreamResult<Response> {
        let request = match identity {
            Some(identity) => request
                .header(HEADER_USER, identity.username.as_str())
                .header(HEADER_ROLE, identity.role.as_str()),
            None => request,
        };
        let response = request
            .send()
            .map_err(|err| UpstreamError::Transport {
                operation,
                message: err.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
        identity: Option<&Identity>,
    ) -> UpstreamResult<T> {
        let response = self.send(operation, self.client.get(url), identity)?;
        read_json(operation, response)
    }
}

fn read_json<T: DeserializeOwned>(operation: &'static str, response: Response) -> UpstreamResult<T> {
    response.json::<T>().map_err(|err| UpstreamError::Malformed {
        operation,
        message: err.to_string(),
    })
}

fn into_document(operation: &'static str, dto: DocumentDto) -> UpstreamResult<Document> {
    dto.into_document()
        .map_err(|message| UpstreamError::Malformed { operation, message })
}

fn into_notification(operation: &'static str, dto: NotificationDto) -> UpstreamResult<Notification> {
    dto.into_notification()
        .map_err(|message| UpstreamError::Malformed { operation, message })
}

fn upload_form(operation: &'static str, draft: &NewDocument) -> UpstreamResult<Form> {
    let mut form = Form::new()
        .text("title", draft.title.clone())
        .text("author", draft.author.clone());
    for tag in &draft.tags {
        form = form.text("tags", tag.clone());
    }
    let form = match &draft.content {
        DocumentContent::Text(text) => form.text("content", text.clone()),
        DocumentContent::File { name, mime, bytes } => {
            let part = Part::bytes(bytes.clone())
                .file_name(name.clone())
                .mime_str(mime)
                .map_err(|err| UpstreamError::Transport {
                    operation,
                    message: err.to_string(),
                })?;
            form.part("file", part)
        }
    };
    Ok(form)
}

impl RemoteBackend for HttpRemoteBackend {
    fn list_documents(&self, identity: &Identity) -> UpstreamResult<Vec<Document>> {
        const OP: &str = "list_documents";
        let url = self.endpoint(&["documents"])?;
        let dtos: Vec<DocumentDto> = self.get_json(OP, url, Some(identity))?;
        dtos.into_iter().map(|dto| into_document(OP, dto)).collect()
    }

    fn get_document(&self, id: &DocumentId, identity: &Identity) -> UpstreamResult<Document> {
        const OP: &str = "get_document";
        let url = self.endpoint(&["documents", id.as_str()])?;
        let dto: DocumentDto = self.get_json(OP, url, Some(identity))?;
        into_document(OP, dto)
    }

    fn create_document(
        &self,
        draft: &NewDocument,
        identity: &Identity,
    ) -> UpstreamResult<Document> {
        const OP: &str = "create_document";
        let form = upload_form(OP, draft)?;
        let request = self.client.post(self.endpoint(&["documents"])?).multipart(form);
        let dto: DocumentDto = read_json(OP, self.send(OP, request, Some(identity))?)?;
        // Metadata-only responses omit content; keep what was uploaded.
        let echoed_content = dto.has_content();
        let mut document = into_document(OP, dto)?;
        if !echoed_content {
            document.content = draft.content.clone();
        }
        Ok(document)
    }

    fn update_document(
        &self,
        id: &DocumentId,
        patch: &DocumentPatch,
        identity: &Identity,
    ) -> UpstreamResult<Document> {
        const OP: &str = "update_document";
        let url = self.endpoint(&["documents", id.as_str()])?;
        let request = self.client.patch(url).json(patch);
        let dto: DocumentDto = read_json(OP, self.send(OP, request, Some(identity))?)?;
        into_document(OP, dto)
    }

    fn set_workflow_state(
        &self,
        id: &DocumentId,
        target: WorkflowState,
        identity: &Identity,
    ) -> UpstreamResult<()> {
        const OP: &str = "set_workflow_state";
        let mut url = self.endpoint(&["workflow", id.as_str(), "state"])?;
        url.query_pairs_mut()
            .append_pair("state", target.display_name())
            .append_pair("actor", &identity.username);
        self.send(OP, self.client.post(url), Some(identity))?;
        Ok(())
    }

    fn remove_document(&self, id: &DocumentId, identity: &Identity) -> UpstreamResult<()> {
        const OP: &str = "remove_document";
        let url = self.endpoint(&["documents", id.as_str()])?;
        self.send(OP, self.client.delete(url), Some(identity))?;
        Ok(())
    }

    fn create_notification(&self, username: &str, message: &str) -> UpstreamResult<Notification> {
        const OP: &str = "create_notification";
        let request = self
            .client
            .post(self.endpoint(&["notifications"])?)
            .json(&NewNotificationDto { username, message });
        let dto: NotificationDto = read_json(OP, self.send(OP, request, None)?)?;
        into_notification(OP, dto)
    }

    fn list_notifications(&self, username: &str) -> UpstreamResult<Vec<Notification>> {
        const OP: &str = "list_notifications";
        let url = self.endpoint(&["notifications", "user", username])?;
        let dtos: Vec<NotificationDto> = self.get_json(OP, url, None)?;
        dtos.into_iter().map(|dto| into_notification(OP, dto)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::HttpRemoteBackend;
    use crate::sync::remote::UpstreamError;
    use std::time::Duration;

    #[test]
    fn endpoint_appends_segments_to_base_path() {
        let backend = HttpRemoteBackend::new("http://localhost:9090/api/", Duration::from_secs(1))
            .expect("backend should build");
        let url = backend
            .endpoint(&["documents", "a b"])
            .expect("endpoint should build");
        assert_eq!(url.as_str(), "http://localhost:9090/api/documents/a%20b");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = HttpRemoteBackend::new("ftp://example.com", Duration::from_secs(1))
            .err()
            .expect("ftp must be rejected");
        assert!(matches!(err, UpstreamError::InvalidBaseUrl(_)));
    }
}
