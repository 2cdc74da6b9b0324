//! Named queries
//!
//! [`NamedQuery`] carries one catalog query with its parameters, knows which
//! rows it needs from the store and how to evaluate itself over an index.

use crate::index::RelationshipIndex;
use crate::query::catalog::{self, GroupAverage, StudentAverage, StudentGrade};
use crate::query::error::{QueryError, QueryResult};
use crate::store::{Fetch, GradeFilter, ReadRequest};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a catalog query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    TopPerformers,
    BestInSubject,
    GroupAveragesInSubject,
    OverallAverage,
    SubjectsOfTeacher,
    StudentsInGroup,
    GradesInGroupSubject,
    TeacherAverage,
    SubjectsOfStudent,
    SubjectsTeacherTeachesStudent,
    TeacherAverageForStudent,
    LastLessonGrades,
}

impl QueryKind {
    /// Every query in catalog order
    pub fn all() -> &'static [QueryKind] {
        &[
            QueryKind::TopPerformers,
            QueryKind::BestInSubject,
            QueryKind::GroupAveragesInSubject,
            QueryKind::OverallAverage,
            QueryKind::SubjectsOfTeacher,
            QueryKind::StudentsInGroup,
            QueryKind::GradesInGroupSubject,
            QueryKind::TeacherAverage,
            QueryKind::SubjectsOfStudent,
            QueryKind::SubjectsTeacherTeachesStudent,
            QueryKind::TeacherAverageForStudent,
            QueryKind::LastLessonGrades,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::TopPerformers => "top-performers",
            QueryKind::BestInSubject => "best-in-subject",
            QueryKind::GroupAveragesInSubject => "group-averages-in-subject",
            QueryKind::OverallAverage => "overall-average",
            QueryKind::SubjectsOfTeacher => "subjects-of-teacher",
            QueryKind::StudentsInGroup => "students-in-group",
            QueryKind::GradesInGroupSubject => "grades-in-group-subject",
            QueryKind::TeacherAverage => "teacher-average",
            QueryKind::SubjectsOfStudent => "subjects-of-student",
            QueryKind::SubjectsTeacherTeachesStudent => "subjects-teacher-teaches-student",
            QueryKind::TeacherAverageForStudent => "teacher-average-for-student",
            QueryKind::LastLessonGrades => "last-lesson-grades",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| QueryError::InvalidArgument(format!("Unknown query: {}", s)))
    }
}

/// A catalog query with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum NamedQuery {
    /// `limit` falls back to the configured default when unset
    TopPerformers { limit: Option<i64> },
    BestInSubject { subject: String },
    GroupAveragesInSubject { subject: String },
    OverallAverage,
    SubjectsOfTeacher { teacher: String },
    StudentsInGroup { group: String },
    GradesInGroupSubject { group: String, subject: String },
    TeacherAverage { teacher: String },
    SubjectsOfStudent { student: String },
    SubjectsTeacherTeachesStudent { student: String, teacher: String },
    TeacherAverageForStudent { teacher: String, student: String },
    LastLessonGrades { group: String, subject: String },
}

impl NamedQuery {
    pub fn kind(&self) -> QueryKind {
        match self {
            NamedQuery::TopPerformers { .. } => QueryKind::TopPerformers,
            NamedQuery::BestInSubject { .. } => QueryKind::BestInSubject,
            NamedQuery::GroupAveragesInSubject { .. } => QueryKind::GroupAveragesInSubject,
            NamedQuery::OverallAverage => QueryKind::OverallAverage,
            NamedQuery::SubjectsOfTeacher { .. } => QueryKind::SubjectsOfTeacher,
            NamedQuery::StudentsInGroup { .. } => QueryKind::StudentsInGroup,
            NamedQuery::GradesInGroupSubject { .. } => QueryKind::GradesInGroupSubject,
            NamedQuery::TeacherAverage { .. } => QueryKind::TeacherAverage,
            NamedQuery::SubjectsOfStudent { .. } => QueryKind::SubjectsOfStudent,
            NamedQuery::SubjectsTeacherTeachesStudent { .. } => {
                QueryKind::SubjectsTeacherTeachesStudent
            }
            NamedQuery::TeacherAverageForStudent { .. } => QueryKind::TeacherAverageForStudent,
            NamedQuery::LastLessonGrades { .. } => QueryKind::LastLessonGrades,
        }
    }

    /// Reject malformed parameters before touching the store
    pub fn validate(&self) -> QueryResult<()> {
        if let NamedQuery::TopPerformers { limit: Some(limit) } = self {
            check_limit(*limit)?;
        }
        Ok(())
    }

    /// The smallest read that still answers this query
    pub fn read_request(&self) -> ReadRequest {
        match self {
            NamedQuery::TopPerformers { .. } => ReadRequest::new().students(Fetch::All).all_grades(),
            NamedQuery::BestInSubject { subject } => ReadRequest::new()
                .students(Fetch::All)
                .subjects(Fetch::named(subject.as_str()))
                .grades(GradeFilter::new().subject(subject.as_str())),
            NamedQuery::GroupAveragesInSubject { subject } => ReadRequest::new()
                .groups(Fetch::All)
                .students(Fetch::All)
                .subjects(Fetch::named(subject.as_str()))
                .grades(GradeFilter::new().subject(subject.as_str())),
            NamedQuery::OverallAverage => ReadRequest::new().all_grades(),
            NamedQuery::SubjectsOfTeacher { teacher } => ReadRequest::new()
                .teachers(Fetch::named(teacher.as_str()))
                .subjects(Fetch::All),
            NamedQuery::StudentsInGroup { group } => ReadRequest::new()
                .groups(Fetch::named(group.as_str()))
                .students(Fetch::All),
            NamedQuery::GradesInGroupSubject { group, subject }
            | NamedQuery::LastLessonGrades { group, subject } => ReadRequest::new()
                .groups(Fetch::named(group.as_str()))
                .students(Fetch::All)
                .subjects(Fetch::named(subject.as_str()))
                .grades(
                    GradeFilter::new()
                        .group(group.as_str())
                        .subject(subject.as_str()),
                ),
            NamedQuery::TeacherAverage { teacher } => ReadRequest::new()
                .teachers(Fetch::named(teacher.as_str()))
                .subjects(Fetch::All)
                .grades(GradeFilter::new().teacher(teacher.as_str())),
            NamedQuery::SubjectsOfStudent { student } => ReadRequest::new()
                .students(Fetch::named(student.as_str()))
                .subjects(Fetch::All)
                .grades(GradeFilter::new().student(student.as_str())),
            NamedQuery::SubjectsTeacherTeachesStudent { student, teacher }
            | NamedQuery::TeacherAverageForStudent { teacher, student } => ReadRequest::new()
                .students(Fetch::named(student.as_str()))
                .teachers(Fetch::named(teacher.as_str()))
                .subjects(Fetch::All)
                .grades(
                    GradeFilter::new()
                        .student(student.as_str())
                        .teacher(teacher.as_str()),
                ),
        }
    }

    /// Run the query over an index built from (at least) [`Self::read_request`]
    pub fn evaluate(
        &self,
        index: &RelationshipIndex<'_>,
        default_top_n: usize,
    ) -> QueryResult<QueryOutput> {
        let output = match self {
            NamedQuery::TopPerformers { limit } => {
                let n = resolve_limit(*limit, default_top_n)?;
                QueryOutput::Ranking(catalog::top_performers(index, n)?)
            }
            NamedQuery::BestInSubject { subject } => {
                QueryOutput::Best(catalog::best_in_subject(index, subject)?)
            }
            NamedQuery::GroupAveragesInSubject { subject } => {
                QueryOutput::GroupAverages(catalog::group_averages_in_subject(index, subject))
            }
            NamedQuery::OverallAverage => QueryOutput::Scalar(catalog::overall_average(index)),
            NamedQuery::SubjectsOfTeacher { teacher } => {
                QueryOutput::Names(catalog::subjects_of_teacher(index, teacher))
            }
            NamedQuery::StudentsInGroup { group } => {
                QueryOutput::Names(catalog::students_in_group(index, group))
            }
            NamedQuery::GradesInGroupSubject { group, subject } => {
                QueryOutput::Grades(catalog::grades_in_group_subject(index, group, subject))
            }
            NamedQuery::TeacherAverage { teacher } => {
                QueryOutput::Scalar(catalog::teacher_average(index, teacher))
            }
            NamedQuery::SubjectsOfStudent { student } => {
                QueryOutput::Names(catalog::subjects_of_student(index, student))
            }
            NamedQuery::SubjectsTeacherTeachesStudent { student, teacher } => QueryOutput::Names(
                catalog::subjects_teacher_teaches_student(index, student, teacher),
            ),
            NamedQuery::TeacherAverageForStudent { teacher, student } => QueryOutput::Scalar(
                catalog::teacher_average_for_student(index, teacher, student),
            ),
            NamedQuery::LastLessonGrades { group, subject } => {
                QueryOutput::Grades(catalog::last_lesson_grades(index, group, subject))
            }
        };
        Ok(output)
    }
}

/// Resolve an optional caller-supplied count against the configured default
pub(crate) fn resolve_limit(limit: Option<i64>, default: usize) -> QueryResult<usize> {
    match limit {
        Some(limit) => check_limit(limit),
        None => Ok(default),
    }
}

fn check_limit(limit: i64) -> QueryResult<usize> {
    if limit <= 0 {
        return Err(QueryError::InvalidArgument(format!(
            "limit must be positive, got {}",
            limit
        )));
    }
    usize::try_from(limit)
        .map_err(|_| QueryError::InvalidArgument(format!("limit {} is too large", limit)))
}

/// Typed result of a [`NamedQuery`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum QueryOutput {
    Ranking(Vec<StudentAverage>),
    Best(Option<StudentAverage>),
    GroupAverages(Vec<GroupAverage>),
    Scalar(Option<f64>),
    Names(Vec<String>),
    Grades(Vec<StudentGrade>),
}

impl QueryOutput {
    /// Number of rows; a scalar or single result counts as one row when present
    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Ranking(rows) => rows.len(),
            QueryOutput::Best(best) => usize::from(best.is_some()),
            QueryOutput::GroupAverages(rows) => rows.len(),
            QueryOutput::Scalar(value) => usize::from(value.is_some()),
            QueryOutput::Names(names) => names.len(),
            QueryOutput::Grades(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            QueryOutput::Scalar(value) => *value,
            _ => None,
        }
    }

    pub fn as_names(&self) -> Option<&[String]> {
        match self {
            QueryOutput::Names(names) => Some(names),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures::school;
    use crate::store::GradeFetch;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in QueryKind::all() {
            let parsed: QueryKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, *kind);
        }
        assert_eq!(QueryKind::all().len(), 12);
        assert_eq!(QueryKind::LastLessonGrades.to_string(), "last-lesson-grades");
    }

    #[test]
    fn test_unknown_kind() {
        let result = "select-everything".parse::<QueryKind>();
        assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
    }

    #[test]
    fn test_limit_validation() {
        for limit in [0, -3] {
            let query = NamedQuery::TopPerformers { limit: Some(limit) };
            assert!(matches!(query.validate(), Err(QueryError::InvalidArgument(_))));
        }
        assert!(NamedQuery::TopPerformers { limit: None }.validate().is_ok());
        assert!(NamedQuery::TopPerformers { limit: Some(1) }.validate().is_ok());
        assert_eq!(resolve_limit(None, 5).unwrap(), 5);
        assert_eq!(resolve_limit(Some(2), 5).unwrap(), 2);
    }

    #[test]
    fn test_read_requests_are_minimal() {
        assert_eq!(
            NamedQuery::OverallAverage.read_request(),
            ReadRequest::new().all_grades()
        );

        let request = NamedQuery::SubjectsOfTeacher {
            teacher: "Ivanova".into(),
        }
        .read_request();
        assert_eq!(request.teachers, Fetch::named("Ivanova"));
        assert_eq!(request.subjects, Fetch::All);
        assert!(request.students.is_skip());
        assert_eq!(request.grades, GradeFetch::Skip);

        let request = NamedQuery::LastLessonGrades {
            group: "Group-1".into(),
            subject: "Math".into(),
        }
        .read_request();
        assert_eq!(
            request.grades,
            GradeFetch::Filtered(GradeFilter::new().group("Group-1").subject("Math"))
        );
    }

    #[test]
    fn test_evaluate_dispatches() {
        let snapshot = school();
        let index = RelationshipIndex::build(&snapshot);

        let output = NamedQuery::TopPerformers { limit: None }
            .evaluate(&index, 2)
            .unwrap();
        assert!(matches!(output, QueryOutput::Ranking(ref rows) if rows.len() == 2));

        let output = NamedQuery::OverallAverage.evaluate(&index, 5).unwrap();
        assert_eq!(output.as_scalar(), Some(4.0));

        let output = NamedQuery::StudentsInGroup {
            group: "Group-1".into(),
        }
        .evaluate(&index, 5)
        .unwrap();
        assert_eq!(output.as_names(), Some(&["S1".to_string(), "S2".to_string()][..]));

        let output = NamedQuery::BestInSubject {
            subject: "Chemistry".into(),
        }
        .evaluate(&index, 5)
        .unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_every_query_answers_from_its_own_read() {
        // Only the rows named by the read request should be needed
        let snapshot = school();
        let queries = vec![
            NamedQuery::TopPerformers { limit: Some(3) },
            NamedQuery::BestInSubject { subject: "Math".into() },
            NamedQuery::GroupAveragesInSubject { subject: "Math".into() },
            NamedQuery::OverallAverage,
            NamedQuery::SubjectsOfTeacher { teacher: "Ivanova".into() },
            NamedQuery::StudentsInGroup { group: "Group-1".into() },
            NamedQuery::GradesInGroupSubject { group: "Group-1".into(), subject: "Math".into() },
            NamedQuery::TeacherAverage { teacher: "Ivanova".into() },
            NamedQuery::SubjectsOfStudent { student: "S1".into() },
            NamedQuery::SubjectsTeacherTeachesStudent { student: "S2".into(), teacher: "Ivanova".into() },
            NamedQuery::TeacherAverageForStudent { teacher: "Ivanova".into(), student: "S2".into() },
            NamedQuery::LastLessonGrades { group: "Group-1".into(), subject: "Math".into() },
        ];

        for query in queries {
            let trimmed = trim(&snapshot, &query.read_request());
            let full = query.evaluate(&RelationshipIndex::build(&snapshot), 5).unwrap();
            let partial = query.evaluate(&RelationshipIndex::build(&trimmed), 5).unwrap();
            assert_eq!(full, partial, "{}", query.kind());
            assert!(!full.is_empty(), "{}", query.kind());
        }
    }

    /// Drop the tables a request skips and the rows a named fetch excludes
    fn trim(snapshot: &crate::store::Snapshot, request: &ReadRequest) -> crate::store::Snapshot {
        fn keep<T: Clone>(rows: &[T], fetch: &Fetch, name: impl Fn(&T) -> &str) -> Vec<T> {
            match fetch {
                Fetch::Skip => Vec::new(),
                Fetch::All => rows.to_vec(),
                Fetch::Named(wanted) => rows.iter().filter(|r| name(r) == wanted).cloned().collect(),
            }
        }

        crate::store::Snapshot {
            groups: keep(&snapshot.groups, &request.groups, |g| g.name.as_str()),
            students: keep(&snapshot.students, &request.students, |s| s.name.as_str()),
            teachers: keep(&snapshot.teachers, &request.teachers, |t| t.name.as_str()),
            subjects: keep(&snapshot.subjects, &request.subjects, |s| s.name.as_str()),
            grades: match request.grades {
                GradeFetch::Skip => Vec::new(),
                _ => snapshot.grades.clone(),
            },
        }
    }
}
