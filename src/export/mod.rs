//! Result sinks
//!
//! Consumers of a successful row set: CSV export and terminal table rendering.

pub mod csv;
pub mod table;

pub use self::csv::{csv_escape, export_csv_to_file, to_csv};
pub use self::table::format_table;
