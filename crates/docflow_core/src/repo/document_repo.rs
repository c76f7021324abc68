//! Document repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the canonical `documents` table and its ordered tags.
//! - Provide the compare-and-set state write used by workflow commits.
//!
//! # Invariants
//! - `create_document` always starts in `Draft` with `created_at == updated_at`.
//! - Every successful write strictly increases `updated_at`.
//! - `compare_and_set_state` never overwrites a state it did not expect.
//! - Tags keep input order; duplicates are preserved.

use crate::db::{lock, SharedConnection};
use crate::model::content::DocumentContent;
use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument, WorkflowState};
use crate::model::{now_epoch_ms, stamp_after};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    author,
    content_kind,
    content_text,
    file_name,
    file_mime,
    file_data,
    workflow_state,
    created_at,
    updated_at
FROM documents";

/// Result ordering for document listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Creation order, oldest first.
    #[default]
    Created,
    /// `updated_at DESC`, ties broken by id.
    RecentlyUpdatedFirst,
}

/// Listing filter shared by local and remote reads.
///
/// `search` is a case-insensitive (ASCII) substring match over title,
/// author and tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub search: Option<String>,
    pub state: Option<WorkflowState>,
    pub author: Option<String>,
    pub order: ListOrder,
}

impl DocumentFilter {
    pub fn recent_first() -> Self {
        Self {
            order: ListOrder::RecentlyUpdatedFirst,
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_state(mut self, state: WorkflowState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Returns whether `doc` passes every filter criterion.
    pub fn matches(&self, doc: &Document) -> bool {
        if self.state.is_some_and(|state| state != doc.workflow_state) {
            return false;
        }
        if self
            .author
            .as_deref()
            .is_some_and(|author| author != doc.author)
        {
            return false;
        }
        match self.normalized_search() {
            Some(needle) => {
                contains_folded(&doc.title, &needle)
                    || contains_folded(&doc.author, &needle)
                    || doc.tags.iter().any(|tag| contains_folded(tag, &needle))
            }
            None => true,
        }
    }

    /// Filters and orders an already-loaded listing.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let mut kept: Vec<Document> = docs.into_iter().filter(|doc| self.matches(doc)).collect();
        match self.order {
            ListOrder::Created => {
                kept.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            }
            ListOrder::RecentlyUpdatedFirst => {
                kept.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)))
            }
        }
        kept
    }

    fn normalized_search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_ascii_lowercase)
    }
}

fn contains_folded(haystack: &str, needle_lowercase: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle_lowercase)
}

/// Repository interface for local document persistence.
pub trait DocumentRepository: Send + Sync {
    fn create_document(&self, draft: &NewDocument) -> RepoResult<Document>;
    fn get_document(&self, id: &DocumentId) -> RepoResult<Option<Document>>;
    fn list_documents(&self, filter: &DocumentFilter) -> RepoResult<Vec<Document>>;
    fn update_document(&self, id: &DocumentId, patch: &DocumentPatch) -> RepoResult<Document>;
    /// Moves `id` from `expected` to `target`, failing with `Conflict` when the
    /// stored state is no longer `expected`.
    fn compare_and_set_state(
        &self,
        id: &DocumentId,
        expected: WorkflowState,
        target: WorkflowState,
    ) -> RepoResult<Document>;
    /// Puts `committed` back to `previous.workflow_state` and
    /// `previous.updated_at`; fails with `Conflict` when the document moved on.
    fn revert_state(&self, previous: &Document, committed: WorkflowState) -> RepoResult<()>;
    fn remove_document(&self, id: &DocumentId) -> RepoResult<()>;
    /// Re-inserts a removed document with its original id and timestamps.
    fn restore_document(&self, document: &Document) -> RepoResult<()>;
}

/// SQLite-backed document repository.
#[derive(Clone)]
pub struct SqliteDocumentRepository {
    conn: SharedConnection,
}

impl SqliteDocumentRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl DocumentRepository for SqliteDocumentRepository {
    fn create_document(&self, draft: &NewDocument) -> RepoResult<Document> {
        let now = now_epoch_ms();
        let document = Document {
            id: DocumentId::generate(),
            title: draft.title.clone(),
            author: draft.author.clone(),
            tags: draft.tags.clone(),
            content: draft.content.clone(),
            workflow_state: WorkflowState::Draft,
            created_at: now,
            updated_at: now,
        };

        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        insert_document(&tx, &document)?;
        tx.commit()?;

        Ok(document)
    }

    fn get_document(&self, id: &DocumentId) -> RepoResult<Option<Document>> {
        let conn = lock(&self.conn)?;
        load_document(&conn, id)
    }

    fn list_documents(&self, filter: &DocumentFilter) -> RepoResult<Vec<Document>> {
        let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(state) = filter.state {
            sql.push_str(" AND workflow_state = ?");
            bind_values.push(Value::Text(state.as_db_str().to_string()));
        }

        if let Some(author) = filter.author.as_ref() {
            sql.push_str(" AND author = ?");
            bind_values.push(Value::Text(author.clone()));
        }

        if let Some(needle) = filter.normalized_search() {
            sql.push_str(
                " AND (
                    instr(lower(title), ?) > 0
                    OR instr(lower(author), ?) > 0
                    OR EXISTS (
                        SELECT 1
                        FROM document_tags dt
                        WHERE dt.document_id = documents.id
                          AND instr(lower(dt.tag), ?) > 0
                    )
                )",
            );
            for _ in 0..3 {
                bind_values.push(Value::Text(needle.clone()));
            }
        }

        match filter.order {
            ListOrder::Created => sql.push_str(" ORDER BY created_at ASC, id ASC"),
            ListOrder::RecentlyUpdatedFirst => sql.push_str(" ORDER BY updated_at DESC, id ASC"),
        }

        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let mut document = parse_document_row(row)?;
            document.tags = load_tags(&conn, &document.id)?;
            documents.push(document);
        }

        Ok(documents)
    }

    fn update_document(&self, id: &DocumentId, patch: &DocumentPatch) -> RepoResult<Document> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let mut document = load_document(&tx, id)?.ok_or_else(|| RepoError::NotFound(id.clone()))?;

        if let Some(title) = patch.title.as_ref() {
            document.title = title.clone();
        }
        if let Some(content) = patch.content.as_ref() {
            document.content = content.clone();
        }
        if let Some(tags) = patch.tags.as_ref() {
            document.tags = tags.clone();
            tx.execute(
                "DELETE FROM document_tags WHERE document_id = ?1;",
                [id.as_str()],
            )?;
            write_tags(&tx, id, tags)?;
        }
        document.updated_at = stamp_after(document.updated_at);

        let columns = ContentColumns::from(&document.content);
        tx.execute(
            "UPDATE documents
             SET
                title = ?2,
                content_kind = ?3,
                content_text = ?4,
                file_name = ?5,
                file_mime = ?6,
                file_data = ?7,
                updated_at = ?8
             WHERE id = ?1;",
            params![
                id.as_str(),
                document.title.as_str(),
                columns.kind,
                columns.text,
                columns.file_name,
                columns.file_mime,
                columns.file_data,
                document.updated_at,
            ],
        )?;
        tx.commit()?;

        Ok(document)
    }

    fn compare_and_set_state(
        &self,
        id: &DocumentId,
        expected: WorkflowState,
        target: WorkflowState,
    ) -> RepoResult<Document> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let mut document = load_document(&tx, id)?.ok_or_else(|| RepoError::NotFound(id.clone()))?;
        if document.workflow_state != expected {
            return Err(RepoError::Conflict {
                id: id.clone(),
                expected,
                actual: document.workflow_state,
            });
        }

        let updated_at = stamp_after(document.updated_at);
        let changed = tx.execute(
            "UPDATE documents
             SET workflow_state = ?3, updated_at = ?4
             WHERE id = ?1
               AND workflow_state = ?2;",
            params![
                id.as_str(),
                expected.as_db_str(),
                target.as_db_str(),
                updated_at
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::Conflict {
                id: id.clone(),
                expected,
                actual: document.workflow_state,
            });
        }
        tx.commit()?;

        document.workflow_state = target;
        document.updated_at = updated_at;
        Ok(document)
    }

    fn revert_state(&self, previous: &Document, committed: WorkflowState) -> RepoResult<()> {
        let conn = lock(&self.conn)?;
        let changed = conn.execute(
            "UPDATE documents
             SET workflow_state = ?3, updated_at = ?4
             WHERE id = ?1
               AND workflow_state = ?2;",
            params![
                previous.id.as_str(),
                committed.as_db_str(),
                previous.workflow_state.as_db_str(),
                previous.updated_at
            ],
        )?;
        if changed == 0 {
            let actual = load_document(&conn, &previous.id)?
                .ok_or_else(|| RepoError::NotFound(previous.id.clone()))?
                .workflow_state;
            return Err(RepoError::Conflict {
                id: previous.id.clone(),
                expected: committed,
                actual,
            });
        }
        Ok(())
    }

    fn remove_document(&self, id: &DocumentId) -> RepoResult<()> {
        let conn = lock(&self.conn)?;
        let changed = conn.execute("DELETE FROM documents WHERE id = ?1;", [id.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.clone()));
        }
        Ok(())
    }

    fn restore_document(&self, document: &Document) -> RepoResult<()> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        insert_document(&tx, document)?;
        tx.commit()?;
        Ok(())
    }
}

/// Flattened column values for one `DocumentContent`.
struct ContentColumns<'a> {
    kind: &'static str,
    text: Option<&'a str>,
    file_name: Option<&'a str>,
    file_mime: Option<&'a str>,
    file_data: Option<&'a [u8]>,
}

impl<'a> From<&'a DocumentContent> for ContentColumns<'a> {
    fn from(content: &'a DocumentContent) -> Self {
        match content {
            DocumentContent::Text(text) => Self {
                kind: content.kind(),
                text: Some(text.as_str()),
                file_name: None,
                file_mime: None,
                file_data: None,
            },
            DocumentContent::File { name, mime, bytes } => Self {
                kind: content.kind(),
                text: None,
                file_name: Some(name.as_str()),
                file_mime: Some(mime.as_str()),
                file_data: Some(bytes.as_slice()),
            },
        }
    }
}

fn load_document(conn: &Connection, id: &DocumentId) -> RepoResult<Option<Document>> {
    let mut stmt = conn.prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.as_str()])?;
    if let Some(row) = rows.next()? {
        let mut document = parse_document_row(row)?;
        document.tags = load_tags(conn, id)?;
        return Ok(Some(document));
    }
    Ok(None)
}

fn load_tags(conn: &Connection, id: &DocumentId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tag
         FROM document_tags
         WHERE document_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([id.as_str()])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get(0)?);
    }
    Ok(tags)
}

fn insert_document(tx: &Transaction<'_>, document: &Document) -> RepoResult<()> {
    let columns = ContentColumns::from(&document.content);
    tx.execute(
        "INSERT INTO documents (
            id,
            title,
            author,
            content_kind,
            content_text,
            file_name,
            file_mime,
            file_data,
            workflow_state,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
        params![
            document.id.as_str(),
            document.title.as_str(),
            document.author.as_str(),
            columns.kind,
            columns.text,
            columns.file_name,
            columns.file_mime,
            columns.file_data,
            document.workflow_state.as_db_str(),
            document.created_at,
            document.updated_at,
        ],
    )?;
    write_tags(tx, &document.id, &document.tags)
}

fn write_tags(tx: &Transaction<'_>, id: &DocumentId, tags: &[String]) -> RepoResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO document_tags (document_id, position, tag)
         VALUES (?1, ?2, ?3);",
    )?;
    for (position, tag) in tags.iter().enumerate() {
        let position = i64::try_from(position)
            .map_err(|_| RepoError::InvalidData("too many tags".to_string()))?;
        stmt.execute(params![id.as_str(), position, tag.as_str()])?;
    }
    Ok(())
}

/// Parses one row; tags are loaded separately by the caller.
fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    let id = DocumentId::new(row.get::<_, String>("id")?);

    let state_text: String = row.get("workflow_state")?;
    let workflow_state = WorkflowState::from_db_str(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid workflow state `{state_text}` in documents.workflow_state"
        ))
    })?;

    let kind: String = row.get("content_kind")?;
    let content = match kind.as_str() {
        "text" => DocumentContent::Text(row.get::<_, Option<String>>("content_text")?.unwrap_or_default()),
        "file" => {
            let name: Option<String> = row.get("file_name")?;
            let mime: Option<String> = row.get("file_mime")?;
            let bytes: Option<Vec<u8>> = row.get("file_data")?;
            match (name, mime, bytes) {
                (Some(name), Some(mime), Some(bytes)) => DocumentContent::File { name, mime, bytes },
                _ => {
                    return Err(RepoError::InvalidData(format!(
                        "document {id} is marked as file content but lacks file columns"
                    )));
                }
            }
        }
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid content kind `{other}` in documents.content_kind"
            )));
        }
    };

    Ok(Document {
        id,
        title: row.get("title")?,
        author: row.get("author")?,
        tags: Vec::new(),
        content,
        workflow_state,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
