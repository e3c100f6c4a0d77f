use crate::constants::{
    MEASUREMENT_TYPE_COLUMN, REFERENCE_MEASUREMENT_TYPE, REFERENCE_SAMPLE_NAME, SAMPLE_NAME_COLUMN,
    ZETA_POTENTIAL_COLUMN,
};
use crate::error::{AssayError, Result};
use crate::pipeline::FormulationResult;
use crate::table::{Cell, RawTable};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-group running means for every column of the table. Only numeric
/// cells contribute; blanks and text are excluded from the average, which is
/// how replicate rows with a missing reading are handled.
struct Replicates {
    sums: Vec<f64>,
    counts: Vec<usize>,
}

impl Replicates {
    fn new(width: usize) -> Self {
        Self {
            sums: vec![0.0; width],
            counts: vec![0; width],
        }
    }

    fn add_row(&mut self, row: &[Cell]) {
        for (col, cell) in row.iter().enumerate().take(self.sums.len()) {
            if let Some(value) = cell.as_number() {
                self.sums[col] += value;
                self.counts[col] += 1;
            }
        }
    }

    fn mean(&self, col: usize) -> Option<f64> {
        (self.counts[col] > 0).then(|| self.sums[col] / self.counts[col] as f64)
    }
}

/// Normalize a cleaned zeta-potential export into per-formulation values.
///
/// Rows are grouped by (measurement type, sample name) and replicates
/// averaged; every group's averaged zeta potential is then divided by the
/// averaged zeta potential of the `("Zeta", "STD 1")` calibration group,
/// which is itself excluded from the output. Any normalized value at or
/// below `threshold` rejects the whole batch.
pub fn process(table: &RawTable, threshold: f64) -> Result<Vec<FormulationResult>> {
    let type_col = require_column(table, MEASUREMENT_TYPE_COLUMN)?;
    let name_col = require_column(table, SAMPLE_NAME_COLUMN)?;
    let zeta_col = require_column(table, ZETA_POTENTIAL_COLUMN)?;

    let width = table.headers().len();
    let mut groups: BTreeMap<(String, String), Replicates> = BTreeMap::new();

    for row in table.rows() {
        // Rows without both grouping labels belong to no group and are skipped.
        let (Some(measurement_type), Some(sample_name)) =
            (group_key(row.get(type_col)), group_key(row.get(name_col)))
        else {
            continue;
        };
        groups
            .entry((measurement_type, sample_name))
            .or_insert_with(|| Replicates::new(width))
            .add_row(row);
    }

    let reference_key = (
        REFERENCE_MEASUREMENT_TYPE.to_string(),
        REFERENCE_SAMPLE_NAME.to_string(),
    );
    let reference = groups
        .get(&reference_key)
        .and_then(|replicates| replicates.mean(zeta_col))
        .ok_or(AssayError::ReferenceSampleMissing)?;

    debug!(reference, groups = groups.len(), "normalizing against reference sample");

    let mut results = Vec::new();
    for ((measurement_type, sample_name), replicates) in &groups {
        if (measurement_type.as_str(), sample_name.as_str())
            == (REFERENCE_MEASUREMENT_TYPE, REFERENCE_SAMPLE_NAME)
        {
            continue;
        }
        let averaged = replicates.mean(zeta_col).ok_or_else(|| {
            AssayError::unreadable(
                "csv",
                format!("sample '{sample_name}' has no numeric zeta potential reading"),
            )
        })?;
        let calculated_value = averaged / reference;

        if calculated_value <= threshold {
            return Err(AssayError::BatchRejected {
                formulation_id: sample_name.clone(),
                value: calculated_value,
                threshold,
            });
        }
        results.push(FormulationResult::new(sample_name.clone(), calculated_value));
    }

    Ok(results)
}

fn require_column(table: &RawTable, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| AssayError::unreadable("csv", format!("missing column '{name}'")))
}

/// Grouping labels are usually text, but numeric sample names are accepted
/// and keyed by their display form. Empty cells disqualify the row.
fn group_key(cell: Option<&Cell>) -> Option<String> {
    match cell? {
        Cell::Text(s) => Some(s.clone()),
        Cell::Number(n) => Some(n.to_string()),
        Cell::Empty => None,
    }
}
