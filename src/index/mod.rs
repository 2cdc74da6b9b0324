//! Gradebook Index Structures
//!
//! - **RelationshipIndex**: foreign-key lookups over one [`crate::store::Snapshot`]
//!
//! # Architecture
//!
//! ```text
//! Query: "average grade Ivanova gives to Ada"
//!        ↓
//! teachers_named("Ivanova") → subjects_of(teacher) → grades_of_subject(subject)
//!        ↓
//! keep grades whose student_of(grade) is named "Ada" → average
//! ```

mod relations;

pub use relations::RelationshipIndex;
