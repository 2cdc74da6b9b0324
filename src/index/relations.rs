//! Relationship Index - one-directional lookups over a snapshot
//!
//! Maps foreign keys to positions in the borrowed [`Snapshot`] so joins are
//! O(1) lookups instead of scans:
//!
//! ```text
//! student.group_id ──► groups          group ──► students
//! subject.teacher_id ──► teachers      teacher ──► subjects
//! grade.student_id ──► students        student ──► grades
//! grade.subject_id ──► subjects        subject ──► grades
//! ```
//!
//! Nothing is owned or materialized beyond the position vectors. A foreign key
//! that points outside the snapshot resolves to `None`.

use crate::model::{Grade, Group, GroupId, Student, StudentId, Subject, SubjectId, Teacher, TeacherId};
use crate::store::Snapshot;
use std::collections::HashMap;
use std::hash::Hash;

/// Lookup tables over one snapshot
#[derive(Debug)]
pub struct RelationshipIndex<'a> {
    snapshot: &'a Snapshot,
    groups: HashMap<GroupId, usize>,
    students: HashMap<StudentId, usize>,
    teachers: HashMap<TeacherId, usize>,
    subjects: HashMap<SubjectId, usize>,
    students_by_group: HashMap<GroupId, Vec<usize>>,
    subjects_by_teacher: HashMap<TeacherId, Vec<usize>>,
    grades_by_student: HashMap<StudentId, Vec<usize>>,
    grades_by_subject: HashMap<SubjectId, Vec<usize>>,
}

fn positions<T, K: Eq + Hash>(rows: &[T], key: impl Fn(&T) -> K) -> HashMap<K, usize> {
    rows.iter().enumerate().map(|(i, row)| (key(row), i)).collect()
}

fn adjacency<T, K: Eq + Hash>(rows: &[T], key: impl Fn(&T) -> Option<K>) -> HashMap<K, Vec<usize>> {
    let mut map: HashMap<K, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        if let Some(k) = key(row) {
            map.entry(k).or_default().push(i);
        }
    }
    map
}

impl<'a> RelationshipIndex<'a> {
    /// Index every relation present in `snapshot`
    pub fn build(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            groups: positions(&snapshot.groups, |g| g.id),
            students: positions(&snapshot.students, |s| s.id),
            teachers: positions(&snapshot.teachers, |t| t.id),
            subjects: positions(&snapshot.subjects, |s| s.id),
            students_by_group: adjacency(&snapshot.students, |s| s.group_id),
            subjects_by_teacher: adjacency(&snapshot.subjects, |s| s.teacher_id),
            grades_by_student: adjacency(&snapshot.grades, |g| Some(g.student_id)),
            grades_by_subject: adjacency(&snapshot.grades, |g| Some(g.subject_id)),
        }
    }

    /// All grades in store order
    pub fn grades(&self) -> &'a [Grade] {
        &self.snapshot.grades
    }

    pub fn group(&self, id: GroupId) -> Option<&'a Group> {
        let snapshot = self.snapshot;
        self.groups.get(&id).map(|&i| &snapshot.groups[i])
    }

    pub fn student(&self, id: StudentId) -> Option<&'a Student> {
        let snapshot = self.snapshot;
        self.students.get(&id).map(|&i| &snapshot.students[i])
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&'a Teacher> {
        let snapshot = self.snapshot;
        self.teachers.get(&id).map(|&i| &snapshot.teachers[i])
    }

    pub fn subject(&self, id: SubjectId) -> Option<&'a Subject> {
        let snapshot = self.snapshot;
        self.subjects.get(&id).map(|&i| &snapshot.subjects[i])
    }

    // Many-to-one

    pub fn group_of(&self, student: &Student) -> Option<&'a Group> {
        student.group_id.and_then(|id| self.group(id))
    }

    pub fn teacher_of(&self, subject: &Subject) -> Option<&'a Teacher> {
        subject.teacher_id.and_then(|id| self.teacher(id))
    }

    pub fn student_of(&self, grade: &Grade) -> Option<&'a Student> {
        self.student(grade.student_id)
    }

    pub fn subject_of(&self, grade: &Grade) -> Option<&'a Subject> {
        self.subject(grade.subject_id)
    }

    /// Grade → Subject → Teacher
    pub fn teacher_of_grade(&self, grade: &Grade) -> Option<&'a Teacher> {
        self.subject_of(grade).and_then(|subject| self.teacher_of(subject))
    }

    /// Grade → Student → Group
    pub fn group_of_grade(&self, grade: &Grade) -> Option<&'a Group> {
        self.student_of(grade).and_then(|student| self.group_of(student))
    }

    // One-to-many, each in store order

    pub fn students_of(&self, group: GroupId) -> impl Iterator<Item = &'a Student> + '_ {
        let snapshot = self.snapshot;
        self.students_by_group
            .get(&group)
            .into_iter()
            .flatten()
            .map(move |&i| &snapshot.students[i])
    }

    pub fn subjects_of(&self, teacher: TeacherId) -> impl Iterator<Item = &'a Subject> + '_ {
        let snapshot = self.snapshot;
        self.subjects_by_teacher
            .get(&teacher)
            .into_iter()
            .flatten()
            .map(move |&i| &snapshot.subjects[i])
    }

    pub fn grades_of_student(&self, student: StudentId) -> impl Iterator<Item = &'a Grade> + '_ {
        let snapshot = self.snapshot;
        self.grades_by_student
            .get(&student)
            .into_iter()
            .flatten()
            .map(move |&i| &snapshot.grades[i])
    }

    pub fn grades_of_subject(&self, subject: SubjectId) -> impl Iterator<Item = &'a Grade> + '_ {
        let snapshot = self.snapshot;
        self.grades_by_subject
            .get(&subject)
            .into_iter()
            .flatten()
            .map(move |&i| &snapshot.grades[i])
    }

    // Exact, case-sensitive name resolution. Every entity with the name matches.

    pub fn groups_named(&self, name: &str) -> Vec<&'a Group> {
        self.snapshot.groups.iter().filter(|g| g.name == name).collect()
    }

    pub fn students_named(&self, name: &str) -> Vec<&'a Student> {
        self.snapshot.students.iter().filter(|s| s.name == name).collect()
    }

    pub fn teachers_named(&self, name: &str) -> Vec<&'a Teacher> {
        self.snapshot.teachers.iter().filter(|t| t.name == name).collect()
    }

    pub fn subjects_named(&self, name: &str) -> Vec<&'a Subject> {
        self.snapshot.subjects.iter().filter(|s| s.name == name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> Snapshot {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Snapshot::new()
            .group(Group::new(1, "Group-1"))
            .group(Group::new(2, "Group-2"))
            .teacher(Teacher::new(1, "Ivanova"))
            .subject(Subject::new(1, "Math").taught_by(1))
            .subject(Subject::new(2, "Art"))
            .student(Student::new(1, "Ada").in_group(1))
            .student(Student::new(2, "Bo").in_group(1))
            .student(Student::new(3, "Cy"))
            .student(Student::new(4, "Ada").in_group(2))
            .grade(Grade::new(1, 1, 1, 4.0, at))
            .grade(Grade::new(2, 2, 1, 5.0, at))
            .grade(Grade::new(3, 1, 2, 3.0, at))
            .grade(Grade::new(4, 99, 1, 3.5, at))
    }

    #[test]
    fn test_many_to_one() {
        let snapshot = snapshot();
        let index = RelationshipIndex::build(&snapshot);

        let ada = index.student(StudentId(1)).unwrap();
        assert_eq!(index.group_of(ada).unwrap().name, "Group-1");

        let cy = index.student(StudentId(3)).unwrap();
        assert!(index.group_of(cy).is_none());

        let art = index.subject(SubjectId(2)).unwrap();
        assert!(index.teacher_of(art).is_none());
    }

    #[test]
    fn test_one_to_many_in_store_order() {
        let snapshot = snapshot();
        let index = RelationshipIndex::build(&snapshot);

        let names: Vec<_> = index.students_of(GroupId(1)).map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Bo"]);

        let grades: Vec<_> = index.grades_of_subject(SubjectId(1)).map(|g| g.id.get()).collect();
        assert_eq!(grades, vec![1, 2, 4]);

        let subjects: Vec<_> = index.subjects_of(TeacherId(1)).map(|s| s.name.as_str()).collect();
        assert_eq!(subjects, vec!["Math"]);

        assert_eq!(index.grades_of_student(StudentId(1)).count(), 2);
        assert_eq!(index.students_of(GroupId(42)).count(), 0);
    }

    #[test]
    fn test_transitive_lookups() {
        let snapshot = snapshot();
        let index = RelationshipIndex::build(&snapshot);
        let grades = index.grades();

        assert_eq!(index.teacher_of_grade(&grades[0]).unwrap().name, "Ivanova");
        assert!(index.teacher_of_grade(&grades[2]).is_none());
        assert_eq!(index.group_of_grade(&grades[1]).unwrap().name, "Group-1");
    }

    #[test]
    fn test_dangling_reference_is_absent() {
        let snapshot = snapshot();
        let index = RelationshipIndex::build(&snapshot);

        let orphan = &index.grades()[3];
        assert!(index.student_of(orphan).is_none());
        assert!(index.group_of_grade(orphan).is_none());
    }

    #[test]
    fn test_name_resolution() {
        let snapshot = snapshot();
        let index = RelationshipIndex::build(&snapshot);

        assert_eq!(index.students_named("Ada").len(), 2);
        assert!(index.students_named("ada").is_empty());
        assert_eq!(index.groups_named("Group-2")[0].id, GroupId(2));
        assert!(index.teachers_named("Nobody").is_empty());
        assert_eq!(index.subjects_named("Math").len(), 1);
    }
}
