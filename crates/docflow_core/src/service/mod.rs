//! Caller-facing services.
//!
//! # Responsibility
//! - Wire storage, gateway, audit, notifications and workflow together.
//! - Expose the document operations consumed by presentation layers.

pub mod docflow_service;
pub mod summary;

pub use docflow_service::{DocflowService, DocflowServiceBuilder, LocalGateway};
pub use summary::{summarize, WorkflowSummary};
