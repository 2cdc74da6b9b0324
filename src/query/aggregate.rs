//! Aggregation engine
//!
//! Averages, top-N ranking and identity-keyed grouping over grade values.

use crate::query::error::{QueryError, QueryResult};
use std::collections::HashMap;
use std::hash::Hash;

/// Arithmetic mean, or `None` for an empty input.
///
/// `None` is distinct from `Some(0.0)`: something with no grades has no
/// average.
pub fn average<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// The `n` highest-valued items, descending.
///
/// The sort is stable, so equal values keep their input order and repeated
/// calls on the same input give the same output.
pub fn top_n<K>(mut items: Vec<(K, f64)>, n: usize) -> QueryResult<Vec<(K, f64)>> {
    if n == 0 {
        return Err(QueryError::InvalidArgument(
            "top-N count must be at least 1".to_string(),
        ));
    }

    items.sort_by(|a, b| b.1.total_cmp(&a.1));
    items.truncate(n);
    Ok(items)
}

/// Partition `items` by `key_fn`, keeping every item.
///
/// Groups come out in the order their key is first seen; items inside a
/// group keep input order. Keys should be entity ids, not names, so two
/// entities sharing a name stay apart.
pub fn group_by<K, T, I, F>(items: I, key_fn: F) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> K,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();

    for item in items {
        let key = key_fn(&item);
        match slots.get(&key) {
            Some(&slot) => groups[slot].1.push(item),
            None => {
                slots.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }

    groups
}

/// Average each group's values, dropping groups with nothing to average
pub fn average_groups<K, T>(groups: Vec<(K, Vec<T>)>, value: impl Fn(&T) -> f64) -> Vec<(K, f64)> {
    groups
        .into_iter()
        .filter_map(|(key, items)| average(items.iter().map(&value)).map(|avg| (key, avg)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average() {
        assert_eq!(average(Vec::<f64>::new()), None);
        assert_eq!(average(vec![4.0, 5.0]), Some(4.5));
        assert_eq!(average(vec![3.0]), Some(3.0));
    }

    #[test]
    fn test_top_n_limits_and_orders() {
        let items: Vec<(u32, f64)> = (0..10).map(|i| (i, (i % 4) as f64)).collect();
        let top = top_n(items, 5).unwrap();

        assert_eq!(top.len(), 5);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_top_n_ties_keep_input_order() {
        let items = vec![("A", 3.0), ("B", 5.0), ("C", 5.0)];

        let first = top_n(items.clone(), 5).unwrap();
        assert_eq!(first, vec![("B", 5.0), ("C", 5.0), ("A", 3.0)]);

        let again = top_n(items, 5).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_top_n_fewer_items_than_n() {
        let top = top_n(vec![("A", 2.5)], 5).unwrap();
        assert_eq!(top, vec![("A", 2.5)]);

        let empty: Vec<(&str, f64)> = Vec::new();
        assert!(top_n(empty, 1).unwrap().is_empty());
    }

    #[test]
    fn test_top_n_rejects_zero() {
        let result = top_n(vec![("A", 1.0)], 0);
        assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
    }

    #[test]
    fn test_group_by_preserves_items_and_first_seen_order() {
        let rows = vec![(2, 4.0), (1, 3.0), (2, 5.0), (3, 2.0), (1, 4.0)];
        let groups = group_by(rows, |(id, _)| *id);

        let keys: Vec<_> = groups.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![2, 1, 3]);
        assert_eq!(groups[0].1, vec![(2, 4.0), (2, 5.0)]);
        assert_eq!(groups.iter().map(|(_, v)| v.len()).sum::<usize>(), 5);
    }

    #[test]
    fn test_group_by_identity_not_name() {
        // Two distinct ids sharing one name
        let rows = vec![((1, "Group-A"), 4.0), ((2, "Group-A"), 2.0)];
        let groups = group_by(rows, |((id, _), _)| *id);
        let averages = average_groups(groups, |(_, v)| *v);

        assert_eq!(averages, vec![(1, 4.0), (2, 2.0)]);
    }
}
