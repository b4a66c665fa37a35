use std::fs;
use std::path::Path;

use crate::processing::decode;
use crate::processing::types::{ValidationConfig, ValidationOutcome};

/// Cheap pre-flight gate run before parsing untrusted uploads. Checks
/// short-circuit in order: existence, extension, size cap, non-emptiness,
/// and finally a full decode attempt. Failures are reported as data, never
/// raised, so callers can show the reason without a stack trace.
pub fn validate_fit_file(path: &Path, config: &ValidationConfig) -> ValidationOutcome {
    if !path.exists() {
        return ValidationOutcome::rejected("File does not exist");
    }

    // Suffix check on the whole name, so a bare ".fit" dotfile counts too.
    let has_fit_extension = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(".fit"));
    if !has_fit_extension {
        return ValidationOutcome::rejected("File must have .fit extension");
    }

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) => return ValidationOutcome::rejected(format!("Cannot stat file: {err}")),
    };
    if metadata.len() > config.max_size_bytes {
        return ValidationOutcome::rejected(format!(
            "FIT file is too large (max {} MB)",
            config.max_size_bytes / (1024 * 1024)
        ));
    }
    if metadata.len() == 0 {
        return ValidationOutcome::rejected("FIT file is empty");
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => return ValidationOutcome::rejected(format!("Cannot read file: {err}")),
    };
    match decode::decode_records(&bytes) {
        Ok(records) if records.is_empty() => {
            ValidationOutcome::rejected("FIT file contains no data")
        }
        Ok(_) => ValidationOutcome::ok(),
        Err(err) => ValidationOutcome::rejected(format!("Invalid FIT file format: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_rejected_first() {
        let outcome = validate_fit_file(Path::new("/no/such/activity.fit"), &Default::default());
        assert!(!outcome.is_valid);
        assert_eq!(outcome.reason.as_deref(), Some("File does not exist"));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("activity.FIT");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(b"not really fit data").expect("write");

        let outcome = validate_fit_file(&path, &Default::default());
        // The extension passes; rejection comes from the decode attempt.
        assert!(!outcome.is_valid);
        assert!(
            outcome
                .reason
                .as_deref()
                .is_some_and(|reason| reason.starts_with("Invalid FIT file format"))
        );
    }

    #[test]
    fn bare_dotfile_named_fit_passes_the_extension_check() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".fit");
        std::fs::write(&path, b"not really fit data").expect("write");

        let outcome = validate_fit_file(&path, &Default::default());
        assert!(
            outcome
                .reason
                .as_deref()
                .is_some_and(|reason| reason.starts_with("Invalid FIT file format"))
        );
    }

    #[test]
    fn wrong_extension_is_rejected_without_decoding() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("activity.gpx");
        std::fs::write(&path, b"whatever").expect("write");

        let outcome = validate_fit_file(&path, &Default::default());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("File must have .fit extension")
        );
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.fit");
        std::fs::File::create(&path).expect("create");

        let outcome = validate_fit_file(&path, &Default::default());
        assert_eq!(outcome.reason.as_deref(), Some("FIT file is empty"));
    }

    #[test]
    fn size_cap_comes_from_the_passed_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.fit");
        std::fs::write(&path, vec![0u8; 64]).expect("write");

        let config = ValidationConfig { max_size_bytes: 16 };
        let outcome = validate_fit_file(&path, &config);
        assert!(!outcome.is_valid);
        assert!(
            outcome
                .reason
                .as_deref()
                .is_some_and(|reason| reason.contains("too large"))
        );

        // The same file passes under the default cap (then fails decode).
        let outcome = validate_fit_file(&path, &Default::default());
        assert!(
            outcome
                .reason
                .as_deref()
                .is_some_and(|reason| reason.starts_with("Invalid FIT file format"))
        );
    }
}
