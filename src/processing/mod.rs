pub mod decode;
pub mod export;
pub mod model;
pub mod project;
pub mod splits;
pub mod types;
pub mod validate;

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

pub use export::export_comprehensive;
pub use model::{FieldValue, ParseMetadata, RawActivityData, RawField, RawMessage, RawValue};
pub use splits::{KILOMETER_METERS, MILE_METERS, calculate_splits};
pub use types::{
    ActivityType, ActivityZones, FitDecodeError, GpsSamplePoint, Lap, NormalizedActivity, Segment,
    Split, ValidationConfig, ValidationOutcome, ZoneRange,
};
pub use validate::validate_fit_file;

/// The full parse result: every decoded message preserved verbatim in
/// `raw_data`, the normalized projection in `summary`, and parse metadata
/// including the per-type message count table.
#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveActivity {
    pub raw_data: RawActivityData,
    pub summary: NormalizedActivity,
    pub metadata: ParseMetadata,
}

impl ComprehensiveActivity {
    pub fn laps(&self) -> &[Lap] {
        &self.summary.laps
    }

    pub fn gps_track(&self) -> &[GpsSamplePoint] {
        &self.summary.gps_track
    }

    /// Work-interval laps only (intensity "active").
    pub fn intervals(&self) -> Vec<&Lap> {
        self.summary.intervals()
    }
}

/// Parse a FIT activity file end to end, preserving everything.
///
/// Stages: read the file, decode it with `fitparser` (framing and CRC
/// validation included), recover the raw field encodings with the sidecar
/// walk, bucket and count every message, then project the normalized
/// summary. Any decode failure aborts the whole parse; a partial activity is
/// never returned.
pub fn parse_fit_file(path: &Path) -> Result<ComprehensiveActivity, FitDecodeError> {
    let bytes = fs::read(path).map_err(|source| FitDecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = decode::decode_records(&bytes)?;
    if records.is_empty() {
        return Err(FitDecodeError::Empty);
    }

    // The sidecar is best-effort: the decoded values are already lossless,
    // so a walk that fails or falls out of step only costs raw encodings.
    let raw_maps = match decode::raw_field_maps(&bytes) {
        Ok(maps) if maps.len() == records.len() => maps,
        Ok(maps) => {
            tracing::warn!(
                decoded = records.len(),
                walked = maps.len(),
                "raw encoding walk out of step with decoded stream, dropping raw values"
            );
            Vec::new()
        }
        Err(err) => {
            tracing::warn!(%err, "raw encoding walk failed, dropping raw values");
            Vec::new()
        }
    };

    let (raw_data, message_counts) = model::build_raw_activity(&records, &raw_maps);
    let summary = project::normalize(&raw_data);

    tracing::debug!(
        messages = records.len(),
        track_points = summary.gps_track.len(),
        laps = summary.laps.len(),
        "parsed FIT file"
    );

    Ok(ComprehensiveActivity {
        raw_data,
        summary,
        metadata: ParseMetadata {
            file_path: path.display().to_string(),
            parsed_at: Utc::now(),
            message_counts,
        },
    })
}

/// Normalized-only mode: the summary shape alone.
pub fn parse_fit_summary(path: &Path) -> Result<NormalizedActivity, FitDecodeError> {
    Ok(parse_fit_file(path)?.summary)
}
