use uuid::Uuid;

use crate::processing::model::{FieldValue, RawActivityData, RawMessage};
use crate::processing::splits::{KILOMETER_METERS, MILE_METERS, calculate_splits};
use crate::processing::types::{
    ActivityType, GpsSamplePoint, Lap, NormalizedActivity, Segment, ZoneRange, iso_local, iso_utc,
};

/// GPS coordinates arrive as fixed-point "semicircles"; one semicircle is
/// 180 / 2^31 degrees.
const SEMICIRCLES_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// Fold the bucketed message stream into the normalized activity summary.
///
/// Infallible by construction: every value that can legitimately be absent
/// (no GPS fix, no heart-rate strap, no power meter) degrades to `None` or a
/// zero default instead of failing the parse.
pub fn normalize(raw: &RawActivityData) -> NormalizedActivity {
    let mut activity = NormalizedActivity {
        id: format!("fit_{}", Uuid::new_v4().simple()),
        ..NormalizedActivity::default()
    };

    // A file is expected to carry at most one top-level session; when more
    // exist only the first is normalized. Multi-session files still keep
    // every session message in the raw buckets.
    let mut start = None;
    if let Some(session) = raw.session.first() {
        start = session.time("start_time");
        apply_session_fields(session, &mut activity);
    }
    if start.is_none() {
        start = raw
            .file_id
            .first()
            .and_then(|file_id| file_id.time("time_created"));
    }
    if let Some(start) = start {
        activity.start_date = Some(iso_utc(&start));
        activity.start_date_local = Some(iso_local(&start));
        activity.name = format!(
            "{} - {}",
            activity.activity_type,
            start.format("%B %d, %Y")
        );
    }

    // Subsequent device_info messages (paired straps, sensors) are
    // intentionally ignored for the summary.
    if let Some(device) = raw.device_info.first() {
        activity.device_manufacturer = device.text("manufacturer");
        activity.device_name = device.text("product");
    }

    let mut elevations: Vec<f64> = Vec::new();
    for record in &raw.record {
        let point = sample_point(record);
        if point.is_empty() {
            continue;
        }
        if let Some(altitude) = point.altitude {
            elevations.push(altitude);
        }
        activity.gps_track.push(point);
    }
    activity.elev_high = elevations.iter().copied().reduce(f64::max);
    activity.elev_low = elevations.iter().copied().reduce(f64::min);

    for (index, lap) in raw.lap.iter().enumerate() {
        activity.laps.push(project_lap(lap, index));
    }
    for (index, segment) in raw.segment.iter().enumerate() {
        activity.segments.push(project_segment(segment, index));
    }

    for zone in &raw.hr_zone {
        activity.zones.heart_rate.push(ZoneRange {
            min: zone.number("low_bpm"),
            max: zone.number("high_bpm"),
        });
    }
    for zone in &raw.power_zone {
        activity.zones.power.push(ZoneRange {
            min: zone.number("low_value"),
            max: zone.number("high_value"),
        });
    }

    if !activity.gps_track.is_empty() && activity.distance > 0.0 {
        activity.splits_standard = calculate_splits(&activity.gps_track, MILE_METERS);
        activity.splits_metric = calculate_splits(&activity.gps_track, KILOMETER_METERS);
    }

    activity
}

/// Session-to-summary field table. Heart-rate and power flags flip whenever
/// either the average or max field is present and non-null.
fn apply_session_fields(session: &RawMessage, activity: &mut NormalizedActivity) {
    if let Some(sport) = session.field("sport").and_then(FieldValue::as_str) {
        activity.activity_type = ActivityType::from_sport(Some(sport));
    }

    if let Some(value) = session.number("total_distance") {
        activity.distance = value;
    }
    if let Some(value) = session.number("total_timer_time") {
        activity.moving_time = value;
    }
    if let Some(value) = session.number("total_elapsed_time") {
        activity.elapsed_time = value;
    }
    if let Some(value) = session.number("total_ascent") {
        activity.total_elevation_gain = value;
    }
    if let Some(value) = session.number("avg_speed") {
        activity.average_speed = value;
    }
    if let Some(value) = session.number("max_speed") {
        activity.max_speed = value;
    }
    if let Some(value) = session.number("total_calories") {
        activity.calories = value;
    }
    if let Some(value) = session.number("avg_heart_rate") {
        activity.average_heartrate = Some(value);
        activity.has_heartrate = true;
    }
    if let Some(value) = session.number("max_heart_rate") {
        activity.max_heartrate = Some(value);
        activity.has_heartrate = true;
    }
    if let Some(value) = session.number("avg_cadence") {
        activity.average_cadence = Some(value);
    }
    if let Some(value) = session.number("avg_power") {
        activity.average_watts = Some(value);
        activity.has_power = true;
    }
    if let Some(value) = session.number("max_power") {
        activity.max_watts = Some(value);
        activity.has_power = true;
    }
    if let Some(value) = session.number("normalized_power") {
        activity.weighted_average_watts = Some(value);
    }
    if let Some(value) = session.number("avg_temperature") {
        activity.average_temp = Some(value);
    }
}

/// One record message becomes one sample point. The "enhanced" altitude and
/// speed fields carry more precision and win over the standard ones when a
/// device emits both.
fn sample_point(record: &RawMessage) -> GpsSamplePoint {
    GpsSamplePoint {
        time: record.time("timestamp"),
        lat: record
            .number("position_lat")
            .map(|semicircles| semicircles * SEMICIRCLES_TO_DEGREES),
        lng: record
            .number("position_long")
            .map(|semicircles| semicircles * SEMICIRCLES_TO_DEGREES),
        altitude: record
            .number("enhanced_altitude")
            .or_else(|| record.number("altitude")),
        distance: record.number("distance"),
        speed: record
            .number("enhanced_speed")
            .or_else(|| record.number("speed")),
        heartrate: record.number("heart_rate"),
        cadence: record.number("cadence"),
        watts: record.number("power"),
        temp: record.number("temperature"),
        grade: record.number("grade"),
    }
}

fn project_lap(lap: &RawMessage, index: usize) -> Lap {
    let id = index as u32 + 1;
    Lap {
        id,
        name: format!("Lap {id}"),
        elapsed_time: lap.number("total_elapsed_time").unwrap_or(0.0),
        moving_time: lap.number("total_timer_time").unwrap_or(0.0),
        distance: lap.number("total_distance").unwrap_or(0.0),
        average_speed: lap.number("avg_speed").unwrap_or(0.0),
        max_speed: lap.number("max_speed").unwrap_or(0.0),
        average_heartrate: lap.number("avg_heart_rate"),
        max_heartrate: lap.number("max_heart_rate"),
        average_cadence: lap.number("avg_cadence"),
        average_watts: lap.number("avg_power"),
        max_watts: lap.number("max_power"),
        total_elevation_gain: lap.number("total_ascent").unwrap_or(0.0),
        calories: lap.number("total_calories").unwrap_or(0.0),
        intensity: lap.text("intensity").unwrap_or_else(|| "active".into()),
        lap_trigger: lap.text("lap_trigger").unwrap_or_else(|| "manual".into()),
        start_time: lap.time("start_time"),
        end_time: lap.time("timestamp"),
    }
}

fn project_segment(segment: &RawMessage, index: usize) -> Segment {
    let id = index as u32 + 1;
    Segment {
        id,
        name: segment
            .text("name")
            .unwrap_or_else(|| format!("Segment {id}")),
        elapsed_time: segment.number("total_elapsed_time").unwrap_or(0.0),
        distance: segment.number("total_distance").unwrap_or(0.0),
        average_speed: segment.number("avg_speed").unwrap_or(0.0),
        start_time: segment.time("start_time"),
        end_time: segment.time("timestamp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::model::RawField;
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;

    fn message(tag: &str, fields: Vec<(&str, FieldValue)>) -> RawMessage {
        let mut map = BTreeMap::new();
        for (name, value) in fields {
            map.insert(
                name.to_string(),
                RawField {
                    value,
                    units: String::new(),
                    raw_value: None,
                },
            );
        }
        RawMessage {
            message_type: tag.to_string(),
            fields: map,
        }
    }

    fn ts(seconds: i64) -> FieldValue {
        FieldValue::Timestamp(DateTime::<Utc>::from_timestamp(seconds, 0).expect("valid"))
    }

    #[test]
    fn empty_raw_data_normalizes_to_placeholder_activity() {
        let activity = normalize(&RawActivityData::default());

        assert_eq!(activity.activity_type, ActivityType::Run);
        assert_eq!(activity.name, "Manual FIT Upload");
        assert_eq!(activity.start_date, None);
        assert!(activity.gps_track.is_empty());
        assert!(activity.splits_metric.is_empty());
        assert!(!activity.has_heartrate);
        assert!(activity.id.starts_with("fit_"));
    }

    #[test]
    fn first_session_wins_when_multiple_exist() {
        let mut raw = RawActivityData::default();
        raw.session.push(message(
            "session",
            vec![
                ("sport", FieldValue::String("cycling".into())),
                ("total_distance", FieldValue::Float(10_000.0)),
            ],
        ));
        raw.session.push(message(
            "session",
            vec![
                ("sport", FieldValue::String("running".into())),
                ("total_distance", FieldValue::Float(5_000.0)),
            ],
        ));

        let activity = normalize(&raw);
        assert_eq!(activity.activity_type, ActivityType::Ride);
        assert_eq!(activity.distance, 10_000.0);
    }

    #[test]
    fn heartrate_flag_flips_on_max_field_alone() {
        let mut raw = RawActivityData::default();
        raw.session.push(message(
            "session",
            vec![("max_heart_rate", FieldValue::UInt(181))],
        ));

        let activity = normalize(&raw);
        assert!(activity.has_heartrate);
        assert_eq!(activity.max_heartrate, Some(181.0));
        assert_eq!(activity.average_heartrate, None);
        assert!(!activity.has_power);
    }

    #[test]
    fn start_time_falls_back_to_file_creation_time() {
        let mut raw = RawActivityData::default();
        raw.file_id
            .push(message("file_id", vec![("time_created", ts(1_700_000_000))]));

        let activity = normalize(&raw);
        assert_eq!(
            activity.start_date.as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
        assert_eq!(
            activity.start_date_local.as_deref(),
            Some("2023-11-14T22:13:20")
        );
        assert_eq!(activity.name, "Run - November 14, 2023");
    }

    #[test]
    fn enhanced_altitude_and_speed_win_over_standard_fields() {
        let mut raw = RawActivityData::default();
        raw.record.push(message(
            "record",
            vec![
                ("altitude", FieldValue::Float(100.0)),
                ("enhanced_altitude", FieldValue::Float(101.4)),
                ("speed", FieldValue::Float(3.0)),
                ("enhanced_speed", FieldValue::Float(3.2)),
            ],
        ));

        let activity = normalize(&raw);
        assert_eq!(activity.gps_track.len(), 1);
        assert_eq!(activity.gps_track[0].altitude, Some(101.4));
        assert_eq!(activity.gps_track[0].speed, Some(3.2));
        assert_eq!(activity.elev_high, Some(101.4));
        assert_eq!(activity.elev_low, Some(101.4));
    }

    #[test]
    fn semicircles_convert_to_decimal_degrees() {
        let mut raw = RawActivityData::default();
        raw.record.push(message(
            "record",
            vec![
                ("position_lat", FieldValue::SInt(536_870_912)),
                ("position_long", FieldValue::SInt(-1_073_741_824)),
            ],
        ));

        let activity = normalize(&raw);
        let point = &activity.gps_track[0];
        assert_eq!(point.lat, Some(45.0));
        assert_eq!(point.lng, Some(-90.0));
    }

    #[test]
    fn elevation_bounds_are_none_without_altitude_samples() {
        let mut raw = RawActivityData::default();
        raw.record.push(message(
            "record",
            vec![("heart_rate", FieldValue::UInt(140))],
        ));

        let activity = normalize(&raw);
        assert_eq!(activity.elev_high, None);
        assert_eq!(activity.elev_low, None);
    }

    #[test]
    fn only_first_device_info_is_summarized() {
        let mut raw = RawActivityData::default();
        raw.device_info.push(message(
            "device_info",
            vec![
                ("manufacturer", FieldValue::String("garmin".into())),
                ("product", FieldValue::UInt(2697)),
            ],
        ));
        raw.device_info.push(message(
            "device_info",
            vec![("manufacturer", FieldValue::String("wahoo".into()))],
        ));

        let activity = normalize(&raw);
        assert_eq!(activity.device_manufacturer.as_deref(), Some("garmin"));
        assert_eq!(activity.device_name.as_deref(), Some("2697"));
    }

    #[test]
    fn laps_default_intensity_and_trigger() {
        let mut raw = RawActivityData::default();
        raw.lap.push(message(
            "lap",
            vec![("total_distance", FieldValue::Float(400.0))],
        ));
        raw.lap.push(message(
            "lap",
            vec![
                ("intensity", FieldValue::String("rest".into())),
                ("lap_trigger", FieldValue::String("distance".into())),
            ],
        ));

        let activity = normalize(&raw);
        assert_eq!(activity.laps.len(), 2);
        assert_eq!(activity.laps[0].id, 1);
        assert_eq!(activity.laps[0].name, "Lap 1");
        assert_eq!(activity.laps[0].intensity, "active");
        assert_eq!(activity.laps[0].lap_trigger, "manual");
        assert_eq!(activity.laps[1].intensity, "rest");
        assert_eq!(activity.laps[1].lap_trigger, "distance");
    }

    #[test]
    fn zones_map_their_boundary_fields() {
        let mut raw = RawActivityData::default();
        raw.hr_zone.push(message(
            "hr_zone",
            vec![("high_bpm", FieldValue::UInt(140))],
        ));
        raw.power_zone.push(message(
            "power_zone",
            vec![
                ("low_value", FieldValue::UInt(200)),
                ("high_value", FieldValue::UInt(250)),
            ],
        ));

        let activity = normalize(&raw);
        assert_eq!(activity.zones.heart_rate.len(), 1);
        assert_eq!(activity.zones.heart_rate[0].min, None);
        assert_eq!(activity.zones.heart_rate[0].max, Some(140.0));
        assert_eq!(activity.zones.power[0].min, Some(200.0));
        assert_eq!(activity.zones.power[0].max, Some(250.0));
    }

    #[test]
    fn splits_are_skipped_without_session_distance() {
        let mut raw = RawActivityData::default();
        raw.record.push(message(
            "record",
            vec![
                ("timestamp", ts(1_700_000_000)),
                ("distance", FieldValue::Float(2_000.0)),
            ],
        ));

        let activity = normalize(&raw);
        assert!(activity.splits_standard.is_empty());
        assert!(activity.splits_metric.is_empty());
    }
}
