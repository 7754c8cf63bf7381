//! Time-axis reconstruction and tabular assembly.
//!
//! The provider returns axis *descriptors* — `(start, end, interval)` triples
//! — rather than explicit per-point timestamps, so the explicit axis has to
//! be rebuilt before variable arrays can be joined. Every array is checked
//! against the reconstructed axis length; a mismatch is a fatal integrity
//! fault, never a silent truncation.

use crate::error::WxError;
use crate::provider::VariableBlock;
use crate::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

/// Aligned tabular series: one reconstructed timestamp per row, one value
/// per tracked variable, all positionally aligned to the same axis.
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    times: Vec<DateTime<Utc>>,
    columns: HashMap<String, Vec<Option<f64>>>,
}

impl TimeSeriesTable {
    /// Number of rows (== number of reconstructed timestamps)
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The reconstructed time axis
    #[must_use]
    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    /// A variable column by name, if it was assembled
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

/// Reconstruct the explicit timestamp sequence described by a block's
/// descriptor: the half-open range `[start, end)` stepped by `interval`,
/// inclusive of start, exclusive of end.
pub fn reconstruct_axis(block: &VariableBlock) -> Result<Vec<DateTime<Utc>>> {
    if block.interval <= 0 {
        return Err(WxError::data_integrity(format!(
            "non-positive axis interval {}",
            block.interval
        )));
    }
    let span = block.end - block.start;
    if span < 0 || span % block.interval != 0 {
        return Err(WxError::data_integrity(format!(
            "axis span {span}s is not a whole number of {}s steps",
            block.interval
        )));
    }

    let steps = span / block.interval;
    (0..steps)
        .map(|i| {
            let epoch = block.start + i * block.interval;
            Utc.timestamp_opt(epoch, 0)
                .single()
                .ok_or_else(|| WxError::data_integrity(format!("unrepresentable epoch {epoch}")))
        })
        .collect()
}

/// Join the named variable arrays of a block against its reconstructed axis.
///
/// Fails when a requested variable is absent or when any array's length
/// disagrees with the timestamp count.
pub fn assemble(block: &VariableBlock, variables: &[&str]) -> Result<TimeSeriesTable> {
    let times = reconstruct_axis(block)?;

    let mut columns = HashMap::with_capacity(variables.len());
    for &name in variables {
        let values = block.series.get(name).ok_or_else(|| {
            WxError::data_integrity(format!("variable `{name}` missing from block"))
        })?;
        if values.len() != times.len() {
            return Err(WxError::data_integrity(format!(
                "variable `{name}` has {} values for {} timestamps",
                values.len(),
                times.len()
            )));
        }
        columns.insert(name.to_string(), values.clone());
    }

    Ok(TimeSeriesTable { times, columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(start: i64, end: i64, interval: i64) -> VariableBlock {
        VariableBlock {
            start,
            end,
            interval,
            series: HashMap::new(),
        }
    }

    #[test]
    fn test_axis_count_matches_descriptor() {
        let axis = reconstruct_axis(&block(0, 24 * 3600, 3600)).unwrap();
        assert_eq!(axis.len(), 24);
    }

    #[test]
    fn test_axis_is_half_open() {
        let axis = reconstruct_axis(&block(1_700_000_000, 1_700_000_000 + 3 * 3600, 3600)).unwrap();
        assert_eq!(axis.first().unwrap().timestamp(), 1_700_000_000);
        // end is exclusive
        assert_eq!(axis.last().unwrap().timestamp(), 1_700_000_000 + 2 * 3600);
    }

    #[test]
    fn test_axis_rejects_bad_descriptors() {
        assert!(reconstruct_axis(&block(0, 3600, 0)).is_err());
        assert!(reconstruct_axis(&block(3600, 0, 3600)).is_err());
        assert!(reconstruct_axis(&block(0, 5000, 3600)).is_err());
    }

    #[test]
    fn test_assemble_aligns_columns() {
        let mut b = block(0, 3 * 3600, 3600);
        b.series.insert(
            "temperature_2m".to_string(),
            vec![Some(30.0), Some(31.5), None],
        );
        let table = assemble(&b, &["temperature_2m"]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.column("temperature_2m").unwrap(),
            &[Some(30.0), Some(31.5), None]
        );
        assert!(table.column("precipitation").is_none());
    }

    #[test]
    fn test_assemble_rejects_short_array() {
        let mut b = block(0, 3 * 3600, 3600);
        b.series
            .insert("precipitation".to_string(), vec![Some(0.0), Some(0.1)]);
        let err = assemble(&b, &["precipitation"]).unwrap_err();
        assert!(matches!(err, WxError::DataIntegrity { .. }));
    }

    #[test]
    fn test_assemble_rejects_missing_variable() {
        let b = block(0, 3600, 3600);
        let err = assemble(&b, &["cloud_cover"]).unwrap_err();
        assert!(matches!(err, WxError::DataIntegrity { .. }));
    }

    #[test]
    fn test_empty_block_is_valid() {
        let table = assemble(&block(0, 0, 3600), &[]).unwrap();
        assert!(table.is_empty());
    }
}
