//! FIT activity-file decoder: reads the binary container emitted by sports
//! devices and reconstructs a structured activity without loss, then
//! projects it into a simplified summary shape.

pub mod processing;
pub mod report;

pub use processing::{
    ActivityType, ComprehensiveActivity, FitDecodeError, GpsSamplePoint, Lap, NormalizedActivity,
    Segment, Split, ValidationConfig, ValidationOutcome, export_comprehensive, parse_fit_file,
    parse_fit_summary, validate_fit_file,
};
