//! Workbook file adapters.

pub mod excel_read;
pub mod excel_write;
