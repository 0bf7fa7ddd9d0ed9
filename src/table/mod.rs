//! Drill-down table pipeline: column configuration, record flattening, row
//! normalization, request sequencing, sorting and CSV export.

pub mod columns;
pub mod export;
pub mod flatten;
pub mod normalize;
pub mod sequencer;
pub mod sort;
