//! Gradebook Entity Model
//!
//! The logical shapes the query engine reads:
//!
//! - **types**: Group, Student, Teacher, Subject, Grade and their typed ids
//! - **records**: Write-side field structs validated at the store boundary
//!
//! # Relationships
//!
//! ```text
//! Group 1 ── * Student 1 ── * Grade * ── 1 Subject * ── 1 Teacher
//! ```
//!
//! Relationships are carried as foreign-key ids only. Navigation happens
//! through [`crate::index::RelationshipIndex`], never through owning links.

mod records;
mod types;

pub use records::{
    EntityRef, GradeChanges, GradeScale, GroupChanges, NewGrade, NewGroup, NewStudent,
    NewSubject, NewTeacher, StudentChanges, SubjectChanges, TeacherChanges, ValidationError,
    GROUP_NAME_MAX, PERSON_NAME_MAX,
};
pub use types::{
    Grade, GradeId, Group, GroupId, Student, StudentId, Subject, SubjectId, Teacher, TeacherId,
};
