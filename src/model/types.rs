//! Core entity types for the gradebook record store
//!
//! Every entity is an immutable value from the query engine's point of view.
//! Foreign keys are plain typed ids; a dangling id is representable and is
//! resolved to "absent" by the relationship index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw database value
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Primary key of a [`Group`]
    GroupId
);
entity_id!(
    /// Primary key of a [`Student`]
    StudentId
);
entity_id!(
    /// Primary key of a [`Teacher`]
    TeacherId
);
entity_id!(
    /// Primary key of a [`Subject`]
    SubjectId
);
entity_id!(
    /// Primary key of a [`Grade`]
    GradeId
);

/// A group of students. Names are unique across groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A student, optionally enrolled in one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

impl Student {
    pub fn new(id: impl Into<StudentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group_id: None,
        }
    }

    /// Builder: enroll in a group
    pub fn in_group(mut self, group_id: impl Into<GroupId>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// A teacher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
}

impl Teacher {
    pub fn new(id: impl Into<TeacherId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A subject, optionally taught by one teacher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
}

impl Subject {
    pub fn new(id: impl Into<SubjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            teacher_id: None,
        }
    }

    /// Builder: assign a teacher
    pub fn taught_by(mut self, teacher_id: impl Into<TeacherId>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }
}

/// A single grade a student received in a subject.
///
/// This is the only fact table: every analytical query aggregates grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: GradeId,
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub value: f64,
    pub received_at: DateTime<Utc>,
}

impl Grade {
    pub fn new(
        id: impl Into<GradeId>,
        student_id: impl Into<StudentId>,
        subject_id: impl Into<SubjectId>,
        value: f64,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            student_id: student_id.into(),
            subject_id: subject_id.into(),
            value,
            received_at,
        }
    }
}
