//! Read requests
//!
//! A [`ReadRequest`] names, per entity type, which rows a query needs. Stores
//! may use the filters to narrow their scans; the query catalog re-applies
//! every filter itself, so a store that over-fetches is still correct.

/// Selection for one entity table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fetch {
    /// Do not read this table
    #[default]
    Skip,
    /// Read every row
    All,
    /// Read rows whose name equals the given value exactly
    Named(String),
}

impl Fetch {
    pub fn named(name: impl Into<String>) -> Self {
        Fetch::Named(name.into())
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Fetch::Skip)
    }
}

/// Push-down restrictions for the grades table.
///
/// Every set field narrows the scan; unset fields do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradeFilter {
    /// Grades in subjects with this name
    pub subject_name: Option<String>,
    /// Grades of students with this name
    pub student_name: Option<String>,
    /// Grades in subjects taught by teachers with this name
    pub teacher_name: Option<String>,
    /// Grades of students enrolled in groups with this name
    pub group_name: Option<String>,
}

impl GradeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, name: impl Into<String>) -> Self {
        self.subject_name = Some(name.into());
        self
    }

    pub fn student(mut self, name: impl Into<String>) -> Self {
        self.student_name = Some(name.into());
        self
    }

    pub fn teacher(mut self, name: impl Into<String>) -> Self {
        self.teacher_name = Some(name.into());
        self
    }

    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.group_name = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.subject_name.is_none()
            && self.student_name.is_none()
            && self.teacher_name.is_none()
            && self.group_name.is_none()
    }
}

/// Selection for the grades table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GradeFetch {
    #[default]
    Skip,
    All,
    Filtered(GradeFilter),
}

/// The rows one query needs, read together as a single snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadRequest {
    pub groups: Fetch,
    pub students: Fetch,
    pub teachers: Fetch,
    pub subjects: Fetch,
    pub grades: GradeFetch,
}

impl ReadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request every row of every table
    pub fn everything() -> Self {
        Self {
            groups: Fetch::All,
            students: Fetch::All,
            teachers: Fetch::All,
            subjects: Fetch::All,
            grades: GradeFetch::All,
        }
    }

    pub fn groups(mut self, fetch: Fetch) -> Self {
        self.groups = fetch;
        self
    }

    pub fn students(mut self, fetch: Fetch) -> Self {
        self.students = fetch;
        self
    }

    pub fn teachers(mut self, fetch: Fetch) -> Self {
        self.teachers = fetch;
        self
    }

    pub fn subjects(mut self, fetch: Fetch) -> Self {
        self.subjects = fetch;
        self
    }

    pub fn all_grades(mut self) -> Self {
        self.grades = GradeFetch::All;
        self
    }

    /// Request grades narrowed by `filter`; an empty filter reads all grades
    pub fn grades(mut self, filter: GradeFilter) -> Self {
        self.grades = if filter.is_empty() {
            GradeFetch::All
        } else {
            GradeFetch::Filtered(filter)
        };
        self
    }
}
