use crate::error::{AssayError, Result};
use crate::pipeline::FormulationResult;
use crate::table::{Cell, RawTable};
use tracing::warn;

/// Number of wells per measurement triplet, for formulations and controls alike.
const TRIPLET: usize = 3;

/// Convert a cleaned TNS plate grid into ratio-based per-formulation values.
///
/// The first remaining row and the first column are plate id artifacts and
/// dropped. In every surviving row the trailing triplet is the control; each
/// preceding non-overlapping triplet is one formulation, valued as
/// triplet sum / control sum. Identifiers are synthesized as
/// `FORMULATION1`, `FORMULATION2`, ... and keep counting across rows for the
/// whole upload. Any ratio at or below `threshold` rejects the batch.
pub fn process(table: &RawTable, threshold: f64) -> Result<Vec<FormulationResult>> {
    let mut results = Vec::new();
    let mut formulation_counter = 1usize;

    // Skip the leading label row; drop the leading id column of each row.
    for (row_number, row) in table.rows().iter().enumerate().skip(1) {
        let cells = row.get(1..).unwrap_or_default();
        let values = numeric_row(cells, row_number)?;

        if values.len() < TRIPLET {
            return Err(AssayError::unreadable(
                "spreadsheet",
                format!("row {row_number} has fewer than {TRIPLET} wells for the control triplet"),
            ));
        }

        let (measurements, control) = values.split_at(values.len() - TRIPLET);
        let control_total: f64 = control.iter().sum();

        // Trailing wells that do not complete a triplet carry no usable
        // formulation and are dropped by policy.
        let leftover = measurements.len() % TRIPLET;
        if leftover != 0 {
            warn!(row = row_number, leftover, "dropping incomplete trailing formulation triplet");
        }

        for triplet in measurements.chunks_exact(TRIPLET) {
            let formulation_id = format!("FORMULATION{formulation_counter}");
            let calculated_value = triplet.iter().sum::<f64>() / control_total;

            if calculated_value <= threshold {
                return Err(AssayError::BatchRejected {
                    formulation_id,
                    value: calculated_value,
                    threshold,
                });
            }
            results.push(FormulationResult {
                formulation_id,
                calculated_value,
            });
            formulation_counter += 1;
        }
    }

    Ok(results)
}

/// The measurement grid must be entirely numeric; a blank or textual well
/// means the export is malformed.
fn numeric_row(cells: &[Cell], row_number: usize) -> Result<Vec<f64>> {
    cells
        .iter()
        .enumerate()
        .map(|(col, cell)| {
            cell.as_number().ok_or_else(|| {
                AssayError::unreadable(
                    "spreadsheet",
                    format!("non-numeric well at row {row_number}, column {col}"),
                )
            })
        })
        .collect()
}
