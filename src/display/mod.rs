//! Terminal display utilities for CLI output.
//!
//! Provides styled tables, spinners, and a shared color theme.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::create_spinner;
pub use tables::{TableBuilder, create_index_table, create_results_table, create_status_table};
pub use theme::{THEME, Theme};
