use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use crate::error::Result;
use crate::sheet::TableStore;
use crate::workbook::WorkbookData;

/// Width applied to every column so multi-line templates stay readable.
const COLUMN_WIDTH: f64 = 60.0;

/// Writes the provided workbook data to the given path.
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let header_format = Format::new().set_bold();
    let cell_format = Format::new().set_text_wrap();

    for sheet in &workbook.tables {
        let table = &sheet.table;
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&sheet.sheet_name)?;

        for (row_idx, row) in table.rows().iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let format = if row_idx == 0 {
                    &header_format
                } else {
                    &cell_format
                };
                worksheet.write_string_with_format(row_idx as u32, col_idx as u16, cell, format)?;
            }
        }

        let col_end = (table.width() as u16).saturating_sub(1);
        for col_idx in 0..=col_end {
            worksheet.set_column_width(col_idx, COLUMN_WIDTH)?;
        }
        worksheet.set_freeze_panes(1, 0)?;
    }

    workbook_writer.save(path)?;
    Ok(())
}
