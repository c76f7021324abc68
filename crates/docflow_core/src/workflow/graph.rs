//! Transition and permission tables.

use crate::model::document::WorkflowState;
use crate::model::identity::Role;

/// Outgoing edges per source state.
const TRANSITIONS: &[(WorkflowState, &[WorkflowState])] = &[
    (WorkflowState::Draft, &[WorkflowState::Submitted]),
    (WorkflowState::Submitted, &[WorkflowState::UnderReview]),
    (
        WorkflowState::UnderReview,
        &[WorkflowState::Approved, WorkflowState::Rejected],
    ),
    (WorkflowState::Approved, &[]),
    (WorkflowState::Rejected, &[]),
];

/// Roles allowed to move a document into each target state.
const AUTHORIZED_ROLES: &[(WorkflowState, &[Role])] = &[
    (WorkflowState::Draft, &[]),
    (WorkflowState::Submitted, &[Role::Submitter]),
    (WorkflowState::UnderReview, &[Role::Reviewer, Role::Approver]),
    (WorkflowState::Approved, &[Role::Approver]),
    (WorkflowState::Rejected, &[Role::Approver]),
];

/// Targets that count as reviewing or deciding on a document.
const REVIEW_TARGETS: &[WorkflowState] = &[
    WorkflowState::UnderReview,
    WorkflowState::Approved,
    WorkflowState::Rejected,
];

/// Legal targets reachable from `from` in one step.
pub fn allowed_targets(from: WorkflowState) -> &'static [WorkflowState] {
    TRANSITIONS
        .iter()
        .find(|(state, _)| *state == from)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

pub fn is_legal(from: WorkflowState, to: WorkflowState) -> bool {
    allowed_targets(from).contains(&to)
}

/// Roles permitted to move a document into `target`.
pub fn required_roles(target: WorkflowState) -> &'static [Role] {
    AUTHORIZED_ROLES
        .iter()
        .find(|(state, _)| *state == target)
        .map(|(_, roles)| *roles)
        .unwrap_or(&[])
}

pub fn is_authorized(role: Role, target: WorkflowState) -> bool {
    required_roles(target).contains(&role)
}

pub fn is_terminal(state: WorkflowState) -> bool {
    allowed_targets(state).is_empty()
}

/// Returns whether moving into `target` must be done by someone other than
/// the document author.
pub fn is_review_step(target: WorkflowState) -> bool {
    REVIEW_TARGETS.contains(&target)
}

#[cfg(test)]
mod tests {
    use super::{allowed_targets, is_authorized, is_legal, is_review_step, is_terminal};
    use crate::model::document::WorkflowState;
    use crate::model::identity::Role;

    #[test]
    fn legal_edges_match_review_pipeline() {
        let expected = [
            (WorkflowState::Draft, WorkflowState::Submitted),
            (WorkflowState::Submitted, WorkflowState::UnderReview),
            (WorkflowState::UnderReview, WorkflowState::Approved),
            (WorkflowState::UnderReview, WorkflowState::Rejected),
        ];
        for from in WorkflowState::ALL {
            for to in WorkflowState::ALL {
                assert_eq!(
                    is_legal(from, to),
                    expected.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn no_edge_returns_to_draft_or_leaves_terminal_states() {
        for from in WorkflowState::ALL {
            assert!(!is_legal(from, WorkflowState::Draft));
            assert!(!is_legal(from, from));
        }
        assert!(is_terminal(WorkflowState::Approved));
        assert!(is_terminal(WorkflowState::Rejected));
        assert!(allowed_targets(WorkflowState::Approved).is_empty());
    }

    #[test]
    fn permission_table_matches_roles() {
        let allowed = [
            (Role::Submitter, WorkflowState::Submitted),
            (Role::Reviewer, WorkflowState::UnderReview),
            (Role::Approver, WorkflowState::UnderReview),
            (Role::Approver, WorkflowState::Approved),
            (Role::Approver, WorkflowState::Rejected),
        ];
        for role in Role::ALL {
            for target in WorkflowState::ALL {
                assert_eq!(
                    is_authorized(role, target),
                    allowed.contains(&(role, target)),
                    "{role} -> {target}"
                );
            }
        }
    }

    #[test]
    fn submitting_is_not_a_review_step() {
        assert!(!is_review_step(WorkflowState::Submitted));
        assert!(is_review_step(WorkflowState::UnderReview));
        assert!(is_review_step(WorkflowState::Approved));
    }
}
