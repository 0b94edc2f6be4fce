//! Utility functions for string formatting.

pub mod format;

pub use format::{format_dob, format_optional, truncate_string};
