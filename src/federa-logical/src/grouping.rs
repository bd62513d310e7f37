//! Grouping-set classification and aggregate row types.

use std::fmt;

use common_error::{FederaError, FederaResult};
use federa_core::{BitSet, DataType, Field, RowType};
use serde::{Deserialize, Serialize};

use crate::ops::AggCall;

/// Shape of an aggregate's grouping sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupType {
    /// One grouping set equal to the group key.
    Simple,
    /// Successive prefixes of the group key: `ROLLUP(a, b)`.
    Rollup,
    /// Every subset of the group key: `CUBE(a, b)`.
    Cube,
    /// Any other list of grouping sets.
    Other,
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Simple => "SIMPLE",
            Self::Rollup => "ROLLUP",
            Self::Cube => "CUBE",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Check that `group_sets` is non-empty, that every member is a subset of
/// `group_set` and that the list is strictly ordered by
/// [`BitSet::grouping_cmp`]. Malformed input is never reordered.
pub fn validate(group_set: &BitSet, group_sets: &[BitSet]) -> FederaResult<()> {
    if group_sets.is_empty() {
        return Err(FederaError::grouping(format!(
            "aggregate with group key {group_set} has no grouping sets"
        )));
    }
    if let Some(stray) = group_sets.iter().find(|s| !group_set.contains_all(s)) {
        return Err(FederaError::grouping(format!(
            "grouping set {stray} is not a subset of group key {group_set}"
        )));
    }
    if let Some(pair) = group_sets
        .windows(2)
        .find(|w| w[0].grouping_cmp(&w[1]) != std::cmp::Ordering::Less)
    {
        return Err(FederaError::grouping(format!(
            "grouping sets must be strictly ordered, but {} does not precede {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// Classify validated grouping sets.
///
/// A one-column key such as `{0}` with sets `[{0}, {}]` is both a rollup and
/// a cube; it is reported as [`GroupType::Cube`].
pub fn classify(group_set: &BitSet, group_sets: &[BitSet]) -> FederaResult<GroupType> {
    validate(group_set, group_sets)?;
    if group_sets.len() == 1 && group_sets[0] == *group_set {
        return Ok(GroupType::Simple);
    }
    let keys = group_set.cardinality();
    // Distinct subsets of the key: the count alone identifies the power set.
    if keys < usize::BITS as usize && group_sets.len() == 1usize << keys {
        return Ok(GroupType::Cube);
    }
    if is_rollup(group_set, group_sets) {
        return Ok(GroupType::Rollup);
    }
    Ok(GroupType::Other)
}

/// Each set is the previous one with its highest member removed, starting
/// at the full key and ending at `{}`.
fn is_rollup(group_set: &BitSet, group_sets: &[BitSet]) -> bool {
    if group_sets.len() != group_set.cardinality() + 1 {
        return false;
    }
    let mut expected = group_set.clone();
    for set in group_sets {
        if *set != expected {
            return false;
        }
        if let Some(top) = expected.last() {
            expected = expected.without(top);
        }
    }
    true
}

/// Grouping sets of `ROLLUP` over `keys` in the given order.
pub fn rollup(keys: &[usize]) -> Vec<BitSet> {
    (0..=keys.len())
        .rev()
        .map(|n| BitSet::of(keys[..n].iter().copied()))
        .collect()
}

/// Grouping sets of `CUBE` over `group_set`.
pub fn cube(group_set: &BitSet) -> Vec<BitSet> {
    group_set.power_set()
}

/// Output row type of an aggregate.
///
/// Fields are the group key columns in ascending ordinal order, then one
/// `BOOLEAN` indicator per key column when `indicator` is set, then one
/// field per aggregate call. A key column is nullable when the input column
/// is, or when some grouping set leaves it out.
pub fn derive_row_type(
    input: &RowType,
    group_set: &BitSet,
    group_sets: &[BitSet],
    indicator: bool,
    agg_calls: &[AggCall],
) -> FederaResult<RowType> {
    validate(group_set, group_sets)?;
    let mut fields = Vec::with_capacity(
        group_set.cardinality() * if indicator { 2 } else { 1 } + agg_calls.len(),
    );
    for key in group_set.iter() {
        let source = input.field(key)?;
        let in_all = group_sets.iter().all(|s| s.contains(key));
        fields.push(source.clone().with_nullable(source.nullable || !in_all));
    }
    if indicator {
        for key in group_set.iter() {
            let source = input.field(key)?;
            fields.push(Field::new(format!("i${}", source.name), DataType::Bool));
        }
    }
    for call in agg_calls {
        let name = call
            .name
            .clone()
            .unwrap_or_else(|| format!("$f{}", fields.len()));
        fields.push(Field {
            name,
            data_type: call.data_type.clone(),
            nullable: call.is_nullable(),
        });
    }
    Ok(RowType::new(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::AggKind;

    fn s(bits: &[usize]) -> BitSet {
        BitSet::of(bits.iter().copied())
    }

    #[test]
    fn test_classify_examples() {
        let key = s(&[0, 1]);
        assert_eq!(
            classify(&key, &[s(&[0, 1]), s(&[0]), s(&[])]).unwrap(),
            GroupType::Rollup
        );
        assert_eq!(
            classify(&key, &[s(&[0, 1]), s(&[0]), s(&[1]), s(&[])]).unwrap(),
            GroupType::Cube
        );
        assert_eq!(classify(&key, &[s(&[0, 1])]).unwrap(), GroupType::Simple);
        assert_eq!(
            classify(&key, &[s(&[0, 1]), s(&[1])]).unwrap(),
            GroupType::Other
        );
        assert_eq!(
            classify(&key, &[s(&[0, 1]), s(&[1]), s(&[])]).unwrap(),
            GroupType::Other
        );
    }

    #[test]
    fn test_unordered_sets_are_rejected() {
        let key = s(&[0, 1]);
        let err = classify(&key, &[s(&[0]), s(&[0, 1]), s(&[])]).unwrap_err();
        assert!(matches!(err, FederaError::GroupingError(_)));
        assert!(classify(&key, &[s(&[0]), s(&[0])]).is_err());
        assert!(classify(&key, &[s(&[0, 2])]).is_err());
        assert!(classify(&key, &[]).is_err());
    }

    #[test]
    fn test_rollup_and_cube_builders() {
        let sets = rollup(&[0, 1, 2]);
        assert_eq!(sets, vec![s(&[0, 1, 2]), s(&[0, 1]), s(&[0]), s(&[])]);
        assert_eq!(classify(&s(&[0, 1, 2]), &sets).unwrap(), GroupType::Rollup);
        let all = cube(&s(&[0, 1, 2]));
        assert_eq!(all.len(), 8);
        assert_eq!(classify(&s(&[0, 1, 2]), &all).unwrap(), GroupType::Cube);
    }

    #[test]
    fn test_derived_row_type() {
        let input = RowType::new(vec![
            Field::new("region", DataType::String),
            Field::new("year", DataType::Int64),
            Field::nullable("amount", DataType::Float64),
        ]);
        let sum = AggCall::create(AggKind::Sum, vec![2], false, None, &input, None).unwrap();
        let count = AggCall::create(
            AggKind::Count,
            vec![],
            false,
            None,
            &input,
            Some("n".into()),
        )
        .unwrap();
        let row = derive_row_type(
            &input,
            &s(&[0, 1]),
            &[s(&[0, 1]), s(&[0])],
            true,
            &[sum, count],
        )
        .unwrap();
        assert_eq!(
            row.field_names(),
            vec!["region", "year", "i$region", "i$year", "$f4", "n"]
        );
        assert!(!row.fields[0].nullable);
        assert!(row.fields[1].nullable);
        assert!(!row.fields[2].nullable);
        assert!(row.fields[4].nullable);
        assert!(!row.fields[5].nullable);
    }
}
