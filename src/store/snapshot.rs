//! Snapshots and read cancellation

use crate::model::{Grade, Group, Student, Subject, Teacher};
use crate::store::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A consistent view of the record store for the duration of one query.
///
/// Rows are held in store order (ascending id). Tables a request skipped
/// are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a group
    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Builder: add a student
    pub fn student(mut self, student: Student) -> Self {
        self.students.push(student);
        self
    }

    /// Builder: add a teacher
    pub fn teacher(mut self, teacher: Teacher) -> Self {
        self.teachers.push(teacher);
        self
    }

    /// Builder: add a subject
    pub fn subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Builder: add a grade
    pub fn grade(mut self, grade: Grade) -> Self {
        self.grades.push(grade);
        self
    }

    /// Total number of rows across all tables
    pub fn row_count(&self) -> usize {
        self.groups.len()
            + self.students.len()
            + self.teachers.len()
            + self.subjects.len()
            + self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

/// Caller-side cancellation signal shared with store scans.
///
/// Clones share the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fail with [`StoreError::Cancelled`] once cancelled
    pub fn check(&self) -> StoreResult<()> {
        if self.is_cancelled() {
            Err(StoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}
