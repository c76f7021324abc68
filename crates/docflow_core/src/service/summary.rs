//! Dashboard-style aggregates over document listings.

use crate::model::document::{Document, WorkflowState};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Snapshot of workflow progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSummary {
    pub total: usize,
    /// Documents in `Submitted` or `Under Review`.
    pub pending: usize,
    /// Documents approved on the UTC day containing the reference time.
    pub approved_today: usize,
    /// Count per state; every state is present, possibly with zero.
    pub by_state: BTreeMap<WorkflowState, usize>,
}

impl WorkflowSummary {
    pub fn count(&self, state: WorkflowState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Aggregates `documents` relative to `now_ms` (epoch milliseconds).
pub fn summarize(documents: &[Document], now_ms: i64) -> WorkflowSummary {
    let today = utc_date(now_ms);
    let mut by_state: BTreeMap<WorkflowState, usize> =
        WorkflowState::ALL.into_iter().map(|state| (state, 0)).collect();
    let mut pending = 0;
    let mut approved_today = 0;

    for document in documents {
        *by_state.entry(document.workflow_state).or_insert(0) += 1;
        if document.is_pending() {
            pending += 1;
        }
        if document.workflow_state == WorkflowState::Approved
            && today.is_some()
            && utc_date(document.updated_at) == today
        {
            approved_today += 1;
        }
    }

    WorkflowSummary {
        total: documents.len(),
        pending,
        approved_today,
        by_state,
    }
}

fn utc_date(epoch_ms: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms).map(|at| at.date_naive())
}

#[cfg(test)]
mod tests {
    use super::summarize;
    use crate::model::content::DocumentContent;
    use crate::model::document::{Document, DocumentId, WorkflowState};

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    // 2024-05-01T10:00:00Z
    const NOW: i64 = 1_714_557_600_000;

    fn document(id: &str, state: WorkflowState, updated_at: i64) -> Document {
        Document {
            id: DocumentId::from(id),
            title: id.to_string(),
            author: "alice".to_string(),
            tags: Vec::new(),
            content: DocumentContent::default(),
            workflow_state: state,
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn counts_pending_and_same_day_approvals() {
        let docs = vec![
            document("a", WorkflowState::Draft, NOW),
            document("b", WorkflowState::Submitted, NOW),
            document("c", WorkflowState::UnderReview, NOW),
            document("d", WorkflowState::Approved, NOW - 60_000),
            document("e", WorkflowState::Approved, NOW - DAY_MS),
            document("f", WorkflowState::Rejected, NOW),
        ];
        let summary = summarize(&docs, NOW);
        assert_eq!(summary.total, 6);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.approved_today, 1);
        assert_eq!(summary.count(WorkflowState::Approved), 2);
        assert_eq!(summary.by_state.len(), WorkflowState::ALL.len());
    }

    #[test]
    fn empty_listing_has_zero_for_every_state() {
        let summary = summarize(&[], NOW);
        assert_eq!(summary.total, 0);
        assert!(summary.by_state.values().all(|count| *count == 0));
    }
}
