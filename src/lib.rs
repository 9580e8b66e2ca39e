//! Core library for the locsheet command line application.
//!
//! The library turns line-oriented scenario scripts and flat key/value text
//! documents into row-aligned spreadsheets that translators can fill in, and
//! turns those spreadsheets back into source and per-locale documents.
//! Line models live under [`document`] and [`script`], the placeholder
//! machinery in [`composite`], translation alignment in [`align`], the
//! row-aligned tables in [`sheet`], the Excel mapping under [`workbook`] and
//! [`io`], and the project-level orchestration in [`sync`].

pub mod align;
pub mod catalog;
pub mod composite;
pub mod config;
pub mod document;
pub mod error;
pub mod io;
pub mod script;
pub mod sheet;
pub mod sync;
pub mod workbook;

pub use error::{Result, ToolError};
