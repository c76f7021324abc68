//! Domain model for the document review workflow.
//!
//! # Responsibility
//! - Define canonical records owned by core storage (documents, audit events,
//!   notifications).
//! - Define the identity shape consumed from external collaborators.
//!
//! # Invariants
//! - Every document is identified by a stable `DocumentId`.
//! - Timestamps are epoch milliseconds in UTC.
//! - Audit events are immutable once created.

pub mod audit;
pub mod content;
pub mod document;
pub mod identity;
pub mod notification;

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Returns a timestamp strictly greater than `previous`.
///
/// Falls back to `previous + 1` when the wall clock has not advanced past it,
/// so mutation stamps stay strictly increasing per record.
pub fn stamp_after(previous: i64) -> i64 {
    now_epoch_ms().max(previous.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::{now_epoch_ms, stamp_after};

    #[test]
    fn stamp_after_is_strictly_greater_than_previous() {
        let future = now_epoch_ms() + 60_000;
        assert_eq!(stamp_after(future), future + 1);

        let past = now_epoch_ms() - 60_000;
        assert!(stamp_after(past) > past);
    }
}
