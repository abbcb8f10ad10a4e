//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod description;
pub mod duplicate;
mod record;
mod report;
pub mod result;

pub use description::Description;
pub use duplicate::{group_duplicates, DuplicateGroup, DuplicateKey};
pub use record::{CanonicalField, CanonicalRecord, MappedRow, StagedId, StagedRecord};
pub use report::{CommittedRecord, DescriptionPattern, ReportFilter};
