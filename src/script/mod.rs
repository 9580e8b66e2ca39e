//! Default line analyzer for scenario scripts and flat records.
//!
//! The sheet model only relies on the [`LineAnalyzer`] contract; callers with
//! their own script parser can supply a different implementation.

pub mod analyzer;
pub mod parser;

pub use analyzer::{LineAnalyzer, RecordAnalyzer, ScriptAnalyzer, analyzer_for};
