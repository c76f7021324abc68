//! Document review workflow.
//!
//! # Responsibility
//! - Hold the legal transition graph and role permissions as data.
//! - Validate, commit, audit and announce state changes.
//!
//! # Invariants
//! - A state change is committed only after it passed legality and
//!   authorization checks, in that order.
//! - Every committed change gets exactly one audit event.

pub mod engine;
pub mod graph;

pub use engine::{WorkflowEngine, WorkflowPolicy};
