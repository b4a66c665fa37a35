use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitbridge::processing::{
    ValidationConfig, export_comprehensive, parse_fit_file, validate_fit_file,
};
use fitbridge::report::{format_message_counts, format_summary};

/// Decode a FIT activity file into a simplified activity summary.
#[derive(Debug, Parser)]
#[command(name = "fitbridge", version)]
struct Cli {
    /// Path to the .fit activity file
    file: PathBuf,

    /// Print the per-message-type count table alongside the summary
    #[arg(short, long)]
    comprehensive: bool,

    /// Export the full preserved structure to <file>_comprehensive.json
    #[arg(short, long)]
    export: bool,

    /// Upper bound on accepted file size, in megabytes
    #[arg(long, default_value_t = 50)]
    max_size_mb: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitbridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = ValidationConfig {
        max_size_bytes: cli.max_size_mb * 1024 * 1024,
    };
    let outcome = validate_fit_file(&cli.file, &config);
    if !outcome.is_valid {
        eprintln!(
            "Validation failed: {}",
            outcome.reason.as_deref().unwrap_or("unknown reason")
        );
        return ExitCode::FAILURE;
    }

    let parsed = match parse_fit_file(&cli.file) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("Failed to parse FIT file: {err}");
            return ExitCode::FAILURE;
        }
    };

    if cli.comprehensive {
        print!("{}", format_message_counts(&parsed));
        println!();
    }
    print!("{}", format_summary(&parsed.summary));

    if cli.export {
        let export_path = export_path_for(&cli.file);
        if let Err(err) = export_comprehensive(&parsed, &export_path) {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
        println!("Comprehensive data exported to: {}", export_path.display());
    }

    ExitCode::SUCCESS
}

fn export_path_for(input: &PathBuf) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "activity".to_string());
    input.with_file_name(format!("{stem}_comprehensive.json"))
}
