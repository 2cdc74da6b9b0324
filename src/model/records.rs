//! Write-side field structs
//!
//! Each entity has an explicit creation struct and an explicit change struct.
//! A change field set to `Some(..)` means "argument provided": the value is
//! written even when it is zero or otherwise falsy.

use crate::model::types::{GradeId, GroupId, StudentId, SubjectId, TeacherId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum length of a group name
pub const GROUP_NAME_MAX: usize = 50;

/// Maximum length of a student, teacher or subject name
pub const PERSON_NAME_MAX: usize = 100;

/// Boundary validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyName { field: &'static str },

    #[error("{field} is longer than {max} characters")]
    NameTooLong { field: &'static str, max: usize },

    #[error("grade {value} is outside the scale {min}..={max}")]
    GradeOutOfScale { value: f64, min: f64, max: f64 },

    #[error("invalid grade scale: min {min} must be below max {max}")]
    InvalidScale { min: f64, max: f64 },
}

fn validate_name(field: &'static str, name: &str, max: usize) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName { field });
    }
    if name.chars().count() > max {
        return Err(ValidationError::NameTooLong { field, max });
    }
    Ok(())
}

/// Inclusive range of valid grade values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeScale {
    pub min: f64,
    pub max: f64,
}

impl Default for GradeScale {
    fn default() -> Self {
        Self { min: 2.0, max: 5.0 }
    }
}

impl GradeScale {
    pub fn new(min: f64, max: f64) -> Result<Self, ValidationError> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(ValidationError::InvalidScale { min, max });
        }
        Ok(Self { min, max })
    }

    /// NaN is never contained
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn validate(&self, value: f64) -> Result<(), ValidationError> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(ValidationError::GradeOutOfScale {
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGroup {
    pub name: String,
}

impl NewGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("group name", &self.name, GROUP_NAME_MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub group_id: Option<GroupId>,
}

impl NewStudent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_id: None,
        }
    }

    pub fn in_group(mut self, group_id: impl Into<GroupId>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("student name", &self.name, PERSON_NAME_MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTeacher {
    pub name: String,
}

impl NewTeacher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("teacher name", &self.name, PERSON_NAME_MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubject {
    pub name: String,
    pub teacher_id: Option<TeacherId>,
}

impl NewSubject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            teacher_id: None,
        }
    }

    pub fn taught_by(mut self, teacher_id: impl Into<TeacherId>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("subject name", &self.name, PERSON_NAME_MAX)
    }
}

/// A grade to record. `received_at` defaults to the creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGrade {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub value: f64,
    pub received_at: Option<DateTime<Utc>>,
}

impl NewGrade {
    pub fn new(student_id: impl Into<StudentId>, subject_id: impl Into<SubjectId>, value: f64) -> Self {
        Self {
            student_id: student_id.into(),
            subject_id: subject_id.into(),
            value,
            received_at: None,
        }
    }

    pub fn received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = Some(at);
        self
    }

    pub fn validate(&self, scale: &GradeScale) -> Result<(), ValidationError> {
        scale.validate(self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupChanges {
    pub name: Option<String>,
}

impl GroupChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => validate_name("group name", name, GROUP_NAME_MAX),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub group_id: Option<GroupId>,
}

impl StudentChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.group_id.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => validate_name("student name", name, PERSON_NAME_MAX),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeacherChanges {
    pub name: Option<String>,
}

impl TeacherChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => validate_name("teacher name", name, PERSON_NAME_MAX),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectChanges {
    pub name: Option<String>,
    pub teacher_id: Option<TeacherId>,
}

impl SubjectChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.teacher_id.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => validate_name("subject name", name, PERSON_NAME_MAX),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeChanges {
    pub student_id: Option<StudentId>,
    pub subject_id: Option<SubjectId>,
    pub value: Option<f64>,
    pub received_at: Option<DateTime<Utc>>,
}

impl GradeChanges {
    pub fn is_empty(&self) -> bool {
        self.student_id.is_none()
            && self.subject_id.is_none()
            && self.value.is_none()
            && self.received_at.is_none()
    }

    pub fn validate(&self, scale: &GradeScale) -> Result<(), ValidationError> {
        match self.value {
            Some(value) => scale.validate(value),
            None => Ok(()),
        }
    }
}

/// Identifies one stored record, used for deletion and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Group(GroupId),
    Student(StudentId),
    Teacher(TeacherId),
    Subject(SubjectId),
    Grade(GradeId),
}

impl EntityRef {
    /// Entity kind, as used in messages
    pub fn kind(&self) -> &'static str {
        match self {
            EntityRef::Group(_) => "group",
            EntityRef::Student(_) => "student",
            EntityRef::Teacher(_) => "teacher",
            EntityRef::Subject(_) => "subject",
            EntityRef::Grade(_) => "grade",
        }
    }

    /// Raw primary key
    pub fn id(&self) -> i64 {
        match self {
            EntityRef::Group(id) => id.get(),
            EntityRef::Student(id) => id.get(),
            EntityRef::Teacher(id) => id.get(),
            EntityRef::Subject(id) => id.get(),
            EntityRef::Grade(id) => id.get(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}
