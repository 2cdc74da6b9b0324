//! Shared test data for the query layer
//!
//! ```text
//! Group-1: S1, S2     Group-2: S3     no group: S4
//! Ivanova(1): Math    Petrov: Physics    Ivanova(3): Art    History has no teacher
//!
//! g1 S1 Math    4.0 d1      g5 S2 Math    4.0 d2
//! g2 S2 Math    5.0 d1      g6 S2 Art     5.0 d2
//! g3 S1 Physics 3.0 d1      g7 S4 Math    2.0 d3
//! g4 S1 Math    4.0 d2      g8 S4 History 5.0 d1
//! ```

use crate::model::{Grade, Group, Student, Subject, Teacher};
use crate::store::Snapshot;
use chrono::{DateTime, TimeZone, Utc};

pub(crate) fn day(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub(crate) fn school() -> Snapshot {
    Snapshot::new()
        .group(Group::new(1, "Group-1"))
        .group(Group::new(2, "Group-2"))
        .teacher(Teacher::new(1, "Ivanova"))
        .teacher(Teacher::new(2, "Petrov"))
        .teacher(Teacher::new(3, "Ivanova"))
        .subject(Subject::new(1, "Math").taught_by(1))
        .subject(Subject::new(2, "Physics").taught_by(2))
        .subject(Subject::new(3, "Art").taught_by(3))
        .subject(Subject::new(4, "History"))
        .student(Student::new(1, "S1").in_group(1))
        .student(Student::new(2, "S2").in_group(1))
        .student(Student::new(3, "S3").in_group(2))
        .student(Student::new(4, "S4"))
        .grade(Grade::new(1, 1, 1, 4.0, day(1, 10)))
        .grade(Grade::new(2, 2, 1, 5.0, day(1, 10)))
        .grade(Grade::new(3, 1, 2, 3.0, day(1, 12)))
        .grade(Grade::new(4, 1, 1, 4.0, day(2, 10)))
        .grade(Grade::new(5, 2, 1, 4.0, day(2, 10)))
        .grade(Grade::new(6, 2, 3, 5.0, day(2, 12)))
        .grade(Grade::new(7, 4, 1, 2.0, day(3, 10)))
        .grade(Grade::new(8, 4, 4, 5.0, day(1, 9)))
}

pub(crate) fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}
