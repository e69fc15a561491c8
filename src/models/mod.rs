//! Data models for crosscheck.
//!
//! This module contains all the core data structures used throughout the system.

mod query;
mod result;
mod source;

pub use query::KnowledgeQuery;
pub use result::{ConsolidatedResult, SourceResult};
pub use source::{Source, SourceCategory};
