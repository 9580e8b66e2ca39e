use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::error::{Result, ToolError};
use crate::sheet::{MemoryTable, TableStore};
use crate::workbook::{SheetTable, WorkbookData};

/// Reads every worksheet of an Excel workbook written by
/// [`excel_write`](crate::io::excel_write) into memory.
pub fn read_workbook(path: &Path) -> Result<WorkbookData> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let mut tables = Vec::new();
    for sheet_name in workbook.sheet_names().to_owned() {
        let range = read_required_sheet(&mut workbook, &sheet_name)?;
        tables.push(SheetTable {
            sheet_name,
            table: range_to_table(&range),
        });
    }

    Ok(WorkbookData { tables })
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn range_to_table(range: &calamine::Range<DataType>) -> MemoryTable {
    let mut table = MemoryTable::new();
    let Some((row_offset, col_offset)) = range.start() else {
        return table;
    };

    for (row, col, cell) in range.cells() {
        let value = cell_to_string(cell);
        if value.is_empty() {
            continue;
        }
        table.set_cell(
            col + col_offset as usize,
            row + row_offset as usize,
            &value,
        );
    }
    table
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(value) => decode_escapes(value),
        DataType::Float(value) => value.to_string(),
        DataType::Int(value) => value.to_string(),
        DataType::Bool(value) => value.to_string(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Decodes the `_xHHHH_` character escapes spreadsheet writers use for
/// control characters such as `\r`; `_x005F_` stands for a literal `_`.
fn decode_escapes(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(position) = rest.find("_x") {
        decoded.push_str(&rest[..position]);
        let candidate = &rest[position..];
        match escaped_char(candidate) {
            Some(ch) => {
                decoded.push(ch);
                rest = &candidate[ESCAPE_WIDTH..];
            }
            None => {
                decoded.push('_');
                rest = &candidate[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

/// Width of `_xHHHH_`.
const ESCAPE_WIDTH: usize = 7;

fn escaped_char(candidate: &str) -> Option<char> {
    let bytes = candidate.as_bytes();
    if bytes.len() < ESCAPE_WIDTH || bytes[ESCAPE_WIDTH - 1] != b'_' {
        return None;
    }
    let digits = &candidate[2..ESCAPE_WIDTH - 1];
    if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
}
