//! # Utility Functions
//!
//! Shared helpers for week arithmetic used across the analysis modules.

mod week;

pub use week::{week_start_of, week_window, weeks_in_window, DEFAULT_WEEKS};
