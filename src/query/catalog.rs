//! Query catalog
//!
//! The twelve analytical queries, each a pure function of a
//! [`RelationshipIndex`] and explicit parameters. Name lookups are exact and
//! case-sensitive, every entity carrying the requested name matches, and a
//! name that resolves to nothing yields an empty list or `None`.
//!
//! Result ordering:
//! - plain lists follow ascending id
//! - grouped and per-grade results follow ascending grade id (first seen)
//! - distinct subject names keep their first occurrence

use crate::index::RelationshipIndex;
use crate::model::{Grade, GroupId, StudentId, Subject};
use crate::query::aggregate::{average, average_groups, group_by, top_n};
use crate::query::error::QueryResult;
use crate::query::temporal::at_latest;
use serde::Serialize;
use std::collections::HashSet;

/// A student with their average over some set of grades
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAverage {
    pub student: String,
    pub average: f64,
}

/// A group with the average of its students' grades
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAverage {
    pub group: String,
    pub average: f64,
}

/// A single grade attributed to a student
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentGrade {
    pub student: String,
    pub value: f64,
}

/// The `n` students with the highest average across all their grades
pub fn top_performers(index: &RelationshipIndex<'_>, n: usize) -> QueryResult<Vec<StudentAverage>> {
    let ranked = top_n(student_averages(index, index.grades()), n)?;
    Ok(name_students(index, ranked))
}

/// The student with the highest average in the named subject
pub fn best_in_subject(
    index: &RelationshipIndex<'_>,
    subject: &str,
) -> QueryResult<Option<StudentAverage>> {
    let ranked = top_n(student_averages(index, subject_scope(index, subject)), 1)?;
    Ok(name_students(index, ranked).into_iter().next())
}

/// Average grade per group in the named subject
pub fn group_averages_in_subject(index: &RelationshipIndex<'_>, subject: &str) -> Vec<GroupAverage> {
    let rows = subject_scope(index, subject)
        .into_iter()
        .filter_map(|g| index.group_of_grade(g).map(|group| (group.id, g.value)));

    let groups: Vec<(GroupId, Vec<(GroupId, f64)>)> = group_by(rows, |(id, _)| *id);

    average_groups(groups, |(_, value)| *value)
        .into_iter()
        .filter_map(|(id, average)| {
            index.group(id).map(|group| GroupAverage {
                group: group.name.clone(),
                average,
            })
        })
        .collect()
}

/// Average of every grade in the snapshot
pub fn overall_average(index: &RelationshipIndex<'_>) -> Option<f64> {
    average(index.grades().iter().map(|g| g.value))
}

pub fn subjects_of_teacher(index: &RelationshipIndex<'_>, teacher: &str) -> Vec<String> {
    let mut subjects: Vec<&Subject> = index
        .teachers_named(teacher)
        .into_iter()
        .flat_map(move |t| index.subjects_of(t.id))
        .collect();
    subjects.sort_by_key(|s| s.id);

    subjects.into_iter().map(|s| s.name.clone()).collect()
}

pub fn students_in_group(index: &RelationshipIndex<'_>, group: &str) -> Vec<String> {
    let mut students: Vec<_> = index
        .groups_named(group)
        .into_iter()
        .flat_map(move |g| index.students_of(g.id))
        .collect();
    students.sort_by_key(|s| s.id);

    students.into_iter().map(|s| s.name.clone()).collect()
}

/// Every grade in the subject received by a student of the group
pub fn grades_in_group_subject(
    index: &RelationshipIndex<'_>,
    group: &str,
    subject: &str,
) -> Vec<StudentGrade> {
    student_grades(index, group_subject_scope(index, group, subject))
}

/// Average over all grades in subjects the named teacher teaches
pub fn teacher_average(index: &RelationshipIndex<'_>, teacher: &str) -> Option<f64> {
    average(teacher_scope(index, teacher).into_iter().map(|g| g.value))
}

/// Distinct names of the subjects the student has grades in
pub fn subjects_of_student(index: &RelationshipIndex<'_>, student: &str) -> Vec<String> {
    distinct_subject_names(index, student_scope(index, student))
}

/// Distinct names of the named teacher's subjects the student has grades in
pub fn subjects_teacher_teaches_student(
    index: &RelationshipIndex<'_>,
    student: &str,
    teacher: &str,
) -> Vec<String> {
    distinct_subject_names(index, student_teacher_scope(index, student, teacher))
}

pub fn teacher_average_for_student(
    index: &RelationshipIndex<'_>,
    teacher: &str,
    student: &str,
) -> Option<f64> {
    let grades = student_teacher_scope(index, student, teacher);
    average(grades.into_iter().map(|g| g.value))
}

/// Grades of the group in the subject at the most recent lesson.
///
/// The lesson is the latest `received_at` among the group's grades in the
/// subject; every grade at exactly that instant is returned.
pub fn last_lesson_grades(
    index: &RelationshipIndex<'_>,
    group: &str,
    subject: &str,
) -> Vec<StudentGrade> {
    student_grades(index, at_latest(group_subject_scope(index, group, subject)))
}

// Scopes. Each returns grades in ascending id order.

fn by_id(mut grades: Vec<&Grade>) -> Vec<&Grade> {
    grades.sort_by_key(|g| g.id);
    grades
}

fn subject_scope<'a>(index: &RelationshipIndex<'a>, subject: &str) -> Vec<&'a Grade> {
    by_id(
        index
            .subjects_named(subject)
            .into_iter()
            .flat_map(move |s| index.grades_of_subject(s.id))
            .collect(),
    )
}

fn student_scope<'a>(index: &RelationshipIndex<'a>, student: &str) -> Vec<&'a Grade> {
    by_id(
        index
            .students_named(student)
            .into_iter()
            .flat_map(move |s| index.grades_of_student(s.id))
            .collect(),
    )
}

fn teacher_scope<'a>(index: &RelationshipIndex<'a>, teacher: &str) -> Vec<&'a Grade> {
    by_id(
        index
            .teachers_named(teacher)
            .into_iter()
            .flat_map(move |t| index.subjects_of(t.id))
            .flat_map(move |s| index.grades_of_subject(s.id))
            .collect(),
    )
}

fn group_subject_scope<'a>(
    index: &RelationshipIndex<'a>,
    group: &str,
    subject: &str,
) -> Vec<&'a Grade> {
    subject_scope(index, subject)
        .into_iter()
        .filter(|g| index.group_of_grade(g).is_some_and(|grp| grp.name == group))
        .collect()
}

fn student_teacher_scope<'a>(
    index: &RelationshipIndex<'a>,
    student: &str,
    teacher: &str,
) -> Vec<&'a Grade> {
    teacher_scope(index, teacher)
        .into_iter()
        .filter(|g| index.student_of(g).is_some_and(|s| s.name == student))
        .collect()
}

// Projections

fn student_averages<'a, I>(index: &RelationshipIndex<'a>, grades: I) -> Vec<(StudentId, f64)>
where
    I: IntoIterator<Item = &'a Grade>,
{
    let rows = grades
        .into_iter()
        .filter(|g| index.student_of(g).is_some());
    average_groups(group_by(rows, |g| g.student_id), |g| g.value)
}

fn name_students(index: &RelationshipIndex<'_>, ranked: Vec<(StudentId, f64)>) -> Vec<StudentAverage> {
    ranked
        .into_iter()
        .filter_map(|(id, average)| {
            index.student(id).map(|s| StudentAverage {
                student: s.name.clone(),
                average,
            })
        })
        .collect()
}

fn student_grades(index: &RelationshipIndex<'_>, grades: Vec<&Grade>) -> Vec<StudentGrade> {
    grades
        .into_iter()
        .filter_map(|g| {
            index.student_of(g).map(|s| StudentGrade {
                student: s.name.clone(),
                value: g.value,
            })
        })
        .collect()
}

fn distinct_subject_names(index: &RelationshipIndex<'_>, grades: Vec<&Grade>) -> Vec<String> {
    let mut seen = HashSet::new();
    grades
        .into_iter()
        .filter_map(|g| index.subject_of(g))
        .filter(|s| seen.insert(s.name.as_str()))
        .map(|s| s.name.clone())
        .collect()
}
