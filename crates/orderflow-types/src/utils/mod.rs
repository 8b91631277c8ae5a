//! Formatting helpers.

pub mod formatting;

pub use formatting::truncate_id;
