use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::processing::ComprehensiveActivity;
use crate::processing::types::FitDecodeError;

/// Write the comprehensive parse result to `path` as pretty-printed JSON: a
/// lossless textual dump of the in-memory structure, for offline inspection.
pub fn export_comprehensive(
    data: &ComprehensiveActivity,
    path: &Path,
) -> Result<(), FitDecodeError> {
    let export_err = |source: std::io::Error| FitDecodeError::Export {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(export_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|source| export_err(source.into()))?;
    writer.flush().map_err(export_err)
}
