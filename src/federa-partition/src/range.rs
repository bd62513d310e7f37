//! RANGE partitioning over numeric columns.
//!
//! Every group except UNBOUND carries `[lower, upper]`, both inclusive.
//! Ranges may not overlap; values outside all of them go to UNBOUND.

use common_config::PartitionSettings;
use common_error::{FederaError, FederaResult, ensure};
use federa_catalog::{PartitionGroup, PartitionGroupId, PartitionKind};
use federa_core::{DataType, Value};

use crate::manager::{PartitionManager, PartitionRequest, unbound_group, validate_group_count};

fn parse_bound(text: &str, column_type: &DataType) -> FederaResult<f64> {
    Value::parse(text, column_type)
        .ok()
        .and_then(|v| v.as_float64())
        .filter(|f| !f.is_nan())
        .ok_or_else(|| FederaError::partition(format!("qualifier '{text}' is not a valid number")))
}

/// Bounds of a non-UNBOUND group.
fn bounds(qualifiers: &[String], column_type: &DataType) -> FederaResult<(f64, f64)> {
    match qualifiers {
        [lower, upper] => Ok((parse_bound(lower, column_type)?, parse_bound(upper, column_type)?)),
        _ => Err(FederaError::partition(format!(
            "a RANGE partition group needs exactly two qualifiers (lower and upper bound), got {}",
            qualifiers.len()
        ))),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RangePartitionManager;

impl PartitionManager for RangePartitionManager {
    fn kind(&self) -> PartitionKind {
        PartitionKind::Range
    }

    fn requires_unbound_group(&self) -> bool {
        true
    }

    fn validate(&self, request: &PartitionRequest<'_>, settings: &PartitionSettings) -> FederaResult<()> {
        let lists = request.qualifiers;
        ensure!(
            request.column_type.is_numeric(),
            PartitionError: "RANGE partitioning requires a numeric partition column, got {}",
            request.column_type
        );
        ensure!(!lists.is_empty(), PartitionError: "RANGE partitioning requires qualifiers");
        ensure!(
            request.group_count == lists.len() + 1,
            PartitionError: "RANGE partitioning with {} ranges requires {} partition groups (including UNBOUND), got {}",
            lists.len(),
            lists.len() + 1,
            request.group_count
        );

        let mut ranges = Vec::with_capacity(lists.len());
        for (i, list) in lists.iter().enumerate() {
            let (lower, upper) = bounds(list, request.column_type)?;
            ensure!(
                lower <= upper,
                PartitionError: "partition group {i} has lower bound {lower} above upper bound {upper}"
            );
            ranges.push((lower, upper, i));
        }
        ranges.sort_by(|a, b| a.0.total_cmp(&b.0));
        for pair in ranges.windows(2) {
            let (_, prev_upper, prev) = pair[0];
            let (next_lower, _, next) = pair[1];
            ensure!(
                next_lower > prev_upper,
                PartitionError: "ranges of partition groups {prev} and {next} overlap"
            );
        }
        validate_group_count(PartitionKind::Range, request, settings)
    }

    fn target_partition(
        &self,
        groups: &[&PartitionGroup],
        column_type: &DataType,
        value: &Value,
    ) -> FederaResult<PartitionGroupId> {
        if let Some(v) = value.as_float64() {
            for group in groups.iter().filter(|g| !g.is_unbound) {
                let (lower, upper) = bounds(&group.qualifiers, column_type)?;
                if lower <= v && v <= upper {
                    return Ok(group.id);
                }
            }
        }
        unbound_group(groups, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(group_count: usize, ranges: &[(&str, &str)]) -> FederaResult<()> {
        let qualifiers: Vec<Vec<String>> = ranges
            .iter()
            .map(|(lo, hi)| vec![lo.to_string(), hi.to_string()])
            .collect();
        let request = PartitionRequest {
            column_type: &DataType::Int64,
            group_count,
            qualifiers: &qualifiers,
        };
        RangePartitionManager.validate(&request, &PartitionSettings::default())
    }

    #[test]
    fn test_valid_ranges() {
        assert!(validate(3, &[("0", "99"), ("100", "199")]).is_ok());
    }

    #[test]
    fn test_overlap_rejected() {
        let err = validate(3, &[("100", "199"), ("0", "100")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "PartitionError: ranges of partition groups 1 and 0 overlap"
        );
    }

    #[test]
    fn test_bad_bounds_rejected() {
        assert!(validate(2, &[("5", "1")]).is_err());
        assert!(validate(2, &[("a", "1")]).is_err());
        assert!(validate(2, &[("0", "1"), ("2", "3")]).is_err());

        let text = PartitionRequest {
            column_type: &DataType::String,
            group_count: 2,
            qualifiers: &[vec!["a".to_string(), "m".to_string()]],
        };
        assert!(RangePartitionManager.validate(&text, &PartitionSettings::default()).is_err());
    }
}
