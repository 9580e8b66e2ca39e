//! Cell-level storage a [`Sheet`](super::Sheet) can be written to and read
//! back from. Row 0 holds the column ids.

/// Minimal tabular store: addressable string cells.
pub trait TableStore {
    fn set_cell(&mut self, column: usize, row: usize, text: &str);
    fn get_cell(&self, column: usize, row: usize) -> Option<&str>;
    /// Number of columns holding at least one cell.
    fn width(&self) -> usize;
    /// Number of rows, header included.
    fn height(&self) -> usize;
}

/// Row-major in-memory table, used as the staging area between sheets and
/// workbook files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    rows: Vec<Vec<String>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a header row followed by data rows.
    pub fn with_rows(header: &[&str], rows: Vec<Vec<String>>) -> Self {
        let mut table = Self::new();
        for (column, id) in header.iter().enumerate() {
            table.set_cell(column, 0, id);
        }
        for (row, cells) in rows.into_iter().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                table.set_cell(column, row + 1, cell);
            }
        }
        table
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

impl TableStore for MemoryTable {
    fn set_cell(&mut self, column: usize, row: usize, text: &str) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.resize_with(column + 1, String::new);
        }
        cells[column] = text.to_string();
    }

    fn get_cell(&self, column: usize, row: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }

    fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn height(&self) -> usize {
        self.rows.len()
    }
}
