use std::fmt::Write;

use crate::processing::{ComprehensiveActivity, NormalizedActivity, splits::MILE_METERS};

fn format_duration(seconds: f64) -> String {
    let rounded = seconds.round().max(0.0) as u64;
    let hours = rounded / 3600;
    let minutes = (rounded % 3600) / 60;
    let seconds = rounded % 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else {
        format!("{minutes}m {seconds:02}s")
    }
}

fn format_pace_min_per_mile(moving_time_seconds: f64, distance_meters: f64) -> Option<String> {
    if distance_meters <= 0.0 {
        return None;
    }
    let pace = (moving_time_seconds / 60.0) / (distance_meters / MILE_METERS);
    Some(format!("{pace:.2} min/mile"))
}

/// Render the activity summary as plain text for the CLI.
pub fn format_summary(activity: &NormalizedActivity) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Name: {}", activity.name);
    let _ = writeln!(out, "Type: {}", activity.activity_type);
    if let Some(date) = &activity.start_date_local {
        let _ = writeln!(out, "Date: {date}");
    }
    let _ = writeln!(
        out,
        "Distance: {:.2} miles ({:.0} meters)",
        activity.distance / MILE_METERS,
        activity.distance
    );
    let _ = writeln!(out, "Moving Time: {}", format_duration(activity.moving_time));
    if let Some(pace) = format_pace_min_per_mile(activity.moving_time, activity.distance) {
        let _ = writeln!(out, "Pace: {pace}");
    }
    let _ = writeln!(
        out,
        "Elevation Gain: {:.0} meters",
        activity.total_elevation_gain
    );

    if activity.has_heartrate {
        if let Some(avg) = activity.average_heartrate {
            let _ = writeln!(out, "Avg HR: {avg:.0} bpm");
        }
        if let Some(max) = activity.max_heartrate {
            let _ = writeln!(out, "Max HR: {max:.0} bpm");
        }
    }
    if activity.has_power {
        if let Some(avg) = activity.average_watts {
            let _ = writeln!(out, "Avg Power: {avg:.0} watts");
        }
        if let Some(max) = activity.max_watts {
            let _ = writeln!(out, "Max Power: {max:.0} watts");
        }
    }
    let _ = writeln!(out, "Calories: {:.0}", activity.calories);

    let device = [
        activity.device_manufacturer.as_deref(),
        activity.device_name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");
    if !device.is_empty() {
        let _ = writeln!(out, "Device: {device}");
    }

    if !activity.laps.is_empty() {
        let _ = writeln!(out, "Laps/Intervals: {}", activity.laps.len());
    }
    if !activity.segments.is_empty() {
        let _ = writeln!(out, "Segments: {}", activity.segments.len());
    }
    let _ = writeln!(out, "Mile Splits: {}", activity.splits_standard.len());
    let _ = writeln!(out, "Kilometer Splits: {}", activity.splits_metric.len());
    let _ = writeln!(out, "GPS Track Points: {}", activity.gps_track.len());

    out
}

/// Render the per-message-type count table of a comprehensive parse.
pub fn format_message_counts(comprehensive: &ComprehensiveActivity) -> String {
    let mut out = String::from("Message Type Summary:\n");
    for (message_type, count) in &comprehensive.metadata.message_counts {
        let _ = writeln!(out, "  {message_type}: {count} messages");
    }
    out
}
