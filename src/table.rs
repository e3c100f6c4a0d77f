use crate::error::{AssayError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::fs;
use std::path::Path;
use tracing::debug;

/// A single cell of a measurement table. The numeric/text decision is made
/// once at load time so the pipelines never re-infer types downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    fn parse(field: &str) -> Cell {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) => Cell::Number(n),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }
}

/// An immutable, ordered measurement table: one header row plus data rows of
/// typed cells. Loaded once per upload from either a CSV instrument export
/// or a spreadsheet plate export.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Load a delimited instrument export. The first record is taken as the
    /// header row. Instrument exports are UTF-8 with an optional BOM.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AssayError::unreadable("csv", format!("{}: {e}", path.display())))?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AssayError::unreadable("csv", e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| AssayError::unreadable("csv", e.to_string()))?;
            rows.push(record.iter().map(Cell::parse).collect());
        }

        debug!(rows = rows.len(), columns = headers.len(), "loaded csv table");
        Ok(Self { headers, rows })
    }

    /// Load the first worksheet of a spreadsheet plate export. As with CSV,
    /// the first row is taken as the header row.
    pub fn from_spreadsheet<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| AssayError::unreadable("spreadsheet", format!("{}: {e}", path.display())))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AssayError::unreadable("spreadsheet", "workbook has no sheets"))?
            .map_err(|e| AssayError::unreadable("spreadsheet", e.to_string()))?;

        let mut sheet_rows = range.rows();
        let headers: Vec<String> = sheet_rows
            .next()
            .ok_or_else(|| AssayError::unreadable("spreadsheet", "first sheet is empty"))?
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let rows: Vec<Vec<Cell>> = sheet_rows
            .map(|row| row.iter().map(convert_sheet_cell).collect())
            .collect();

        debug!(rows = rows.len(), columns = headers.len(), "loaded spreadsheet table");
        Ok(Self { headers, rows })
    }

    /// Drop rows and columns that carry no data at all. A row (or column) is
    /// removed only when every cell in it is empty; partially-empty rows and
    /// columns are kept as-is, with no imputation.
    pub fn clean(mut self) -> Self {
        self.rows.retain(|row| !row.iter().all(Cell::is_empty));

        let width = self
            .rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(self.headers.len());
        let keep: Vec<bool> = (0..width)
            .map(|col| {
                self.rows.is_empty()
                    || self
                        .rows
                        .iter()
                        .any(|row| row.get(col).map_or(false, |c| !c.is_empty()))
            })
            .collect();

        if keep.iter().all(|k| *k) {
            return self;
        }

        self.headers = filter_by_mask(std::mem::take(&mut self.headers), &keep);
        self.rows = self
            .rows
            .into_iter()
            .map(|row| filter_by_mask(row, &keep))
            .collect();
        self
    }
}

fn filter_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.get(*i).copied().unwrap_or(true))
        .map(|(_, item)| item)
        .collect()
}

fn convert_sheet_cell(cell: &Data) -> Cell {
    match cell {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => Cell::parse(s),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{e:?}")),
        Data::Empty => Cell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_csv_with_typed_cells() {
        let file = write_csv("Sample Name,Zeta Potential (mV)\nSTD 1,10.5\nA,text\n");
        let table = RawTable::from_csv(file.path()).unwrap();

        assert_eq!(table.headers(), &["Sample Name", "Zeta Potential (mV)"]);
        assert_eq!(table.rows()[0][1], Cell::Number(10.5));
        assert_eq!(table.rows()[1][1], Cell::Text("text".to_string()));
    }

    #[test]
    fn strips_utf8_bom_from_header() {
        let file = write_csv("\u{feff}Sample Name,Value\nA,1\n");
        let table = RawTable::from_csv(file.path()).unwrap();
        assert_eq!(table.headers()[0], "Sample Name");
    }

    #[test]
    fn unreadable_path_is_surfaced() {
        let err = RawTable::from_csv("no/such/file.csv").unwrap_err();
        assert!(matches!(err, AssayError::UnreadableFile { .. }));
    }

    #[test]
    fn missing_spreadsheet_path_is_surfaced() {
        let err = RawTable::from_spreadsheet("no/such/plate.xlsx").unwrap_err();
        assert!(matches!(err, AssayError::UnreadableFile { .. }));
    }

    #[test]
    fn garbage_bytes_are_not_a_workbook() {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"this is not a zip archive").unwrap();

        let err = RawTable::from_spreadsheet(file.path()).unwrap_err();
        assert!(matches!(err, AssayError::UnreadableFile { .. }));
    }

    #[test]
    fn loads_spreadsheet_with_typed_cells() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/tns_plate.xlsx");
        let table = RawTable::from_spreadsheet(path).unwrap();

        assert_eq!(table.headers()[0], "Plate");
        assert_eq!(table.headers().len(), 10);
        // Row 0 is the plate layout labels, row 1 the measurements.
        assert_eq!(table.rows()[0][1], Cell::Text("F1".to_string()));
        assert_eq!(table.rows()[1][0], Cell::Text("Plate 1".to_string()));
        assert_eq!(table.rows()[1][1], Cell::Number(1.0));
        assert_eq!(table.rows()[1][9], Cell::Number(3.0));
    }

    #[test]
    fn clean_drops_fully_empty_rows_and_columns() {
        let table = RawTable::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![Cell::Number(1.0), Cell::Empty, Cell::Number(2.0)],
                vec![Cell::Empty, Cell::Empty, Cell::Empty],
                vec![Cell::Number(3.0), Cell::Empty, Cell::Empty],
            ],
        )
        .clean();

        assert_eq!(table.headers(), &["a", "c"]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[1], vec![Cell::Number(3.0), Cell::Empty]);
    }

    #[test]
    fn clean_keeps_partially_empty_rows() {
        let table = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![Cell::Number(1.0), Cell::Empty]],
        )
        .clean();

        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0], vec![Cell::Number(1.0), Cell::Empty]);
    }
}
