//! Temporal resolver
//!
//! "Last lesson" semantics: find the latest `received_at` in a scope, then keep
//! every grade recorded at exactly that instant.

use crate::model::Grade;
use chrono::{DateTime, Utc};

/// Latest `received_at` among `grades`, or `None` when there are none
pub fn latest_timestamp<'a, I>(grades: I) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = &'a Grade>,
{
    grades.into_iter().map(|g| g.received_at).max()
}

/// Grades of `scope` stamped with the scope's latest timestamp.
///
/// Ties are all kept. An empty scope gives an empty result.
pub fn at_latest<'a>(scope: Vec<&'a Grade>) -> Vec<&'a Grade> {
    match latest_timestamp(scope.iter().copied()) {
        Some(latest) => scope
            .into_iter()
            .filter(|g| g.received_at == latest)
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_latest_timestamp() {
        let grades = vec![
            Grade::new(1, 1, 1, 4.0, at(9)),
            Grade::new(2, 2, 1, 5.0, at(11)),
            Grade::new(3, 3, 1, 3.0, at(10)),
        ];

        assert_eq!(latest_timestamp(&grades), Some(at(11)));
        assert_eq!(latest_timestamp(&Vec::<Grade>::new()), None);
    }

    #[test]
    fn test_at_latest_keeps_only_latest() {
        let grades = vec![
            Grade::new(1, 1, 1, 4.0, at(9)),
            Grade::new(2, 2, 1, 5.0, at(10)),
        ];

        let latest = at_latest(grades.iter().collect());
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id.get(), 2);
    }

    #[test]
    fn test_at_latest_keeps_ties() {
        let grades = vec![
            Grade::new(1, 1, 1, 4.0, at(10)),
            Grade::new(2, 2, 1, 5.0, at(9)),
            Grade::new(3, 3, 1, 3.0, at(10)),
        ];

        let ids: Vec<_> = at_latest(grades.iter().collect())
            .iter()
            .map(|g| g.id.get())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_at_latest_empty_scope() {
        assert!(at_latest(Vec::new()).is_empty());
    }
}
