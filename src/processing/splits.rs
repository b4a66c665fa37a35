use crate::processing::types::{GpsSamplePoint, Split};

pub const MILE_METERS: f64 = 1609.34;
pub const KILOMETER_METERS: f64 = 1000.0;

/// Bucket the GPS track into fixed-distance splits. A split closes on the
/// first sample whose cumulative distance crosses the next integer multiple
/// of `bucket_meters`; that sample becomes the start of the following split.
///
/// Degradation rules: elapsed time is 0 when either boundary lacks a
/// timestamp, average speed is 0 (never NaN) when elapsed time is 0,
/// elevation difference is 0 when either boundary lacks altitude, and
/// average heart rate is `None` when no sample in the window carried one.
pub fn calculate_splits(track: &[GpsSamplePoint], bucket_meters: f64) -> Vec<Split> {
    let mut splits = Vec::new();
    if bucket_meters <= 0.0 {
        return splits;
    }

    let mut current_split: u32 = 1;
    let mut start_index = 0usize;

    for (index, point) in track.iter().enumerate() {
        let distance = point.distance.unwrap_or(0.0);
        if distance < f64::from(current_split) * bucket_meters || index == 0 {
            continue;
        }

        let start = &track[start_index];
        let elapsed_time = match (start.time, point.time) {
            (Some(from), Some(to)) => {
                ((to - from).num_milliseconds() as f64 / 1000.0).max(0.0)
            }
            _ => 0.0,
        };
        let average_speed = if elapsed_time > 0.0 {
            bucket_meters / elapsed_time
        } else {
            0.0
        };
        let elevation_difference = match (start.altitude, point.altitude) {
            (Some(from), Some(to)) => to - from,
            _ => 0.0,
        };
        let average_heartrate = mean_heartrate(&track[start_index..=index]);

        splits.push(Split {
            split: current_split,
            distance: bucket_meters,
            elapsed_time,
            moving_time: elapsed_time,
            average_speed,
            elevation_difference,
            average_heartrate,
            pace_zone: 0,
        });

        start_index = index;
        current_split += 1;
    }

    splits
}

fn mean_heartrate(window: &[GpsSamplePoint]) -> Option<f64> {
    let rates: Vec<f64> = window.iter().filter_map(|point| point.heartrate).collect();
    if rates.is_empty() {
        None
    } else {
        Some(rates.iter().sum::<f64>() / rates.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn track(samples: &[(i64, f64)]) -> Vec<GpsSamplePoint> {
        let t0 = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("valid timestamp");
        samples
            .iter()
            .map(|(offset, distance)| GpsSamplePoint {
                time: Some(t0 + Duration::seconds(*offset)),
                distance: Some(*distance),
                ..GpsSamplePoint::default()
            })
            .collect()
    }

    #[test]
    fn splits_close_at_each_bucket_boundary() {
        let track = track(&[(0, 0.0), (360, 1000.0), (720, 2000.0), (1080, 3000.0)]);
        let splits = calculate_splits(&track, KILOMETER_METERS);

        assert_eq!(splits.len(), 3);
        for (idx, split) in splits.iter().enumerate() {
            assert_eq!(split.split, idx as u32 + 1);
            assert_eq!(split.elapsed_time, 360.0);
            assert!((split.average_speed - 1000.0 / 360.0).abs() < 1e-9);
        }
    }

    #[test]
    fn split_indices_are_strictly_increasing() {
        let track = track(&[(0, 0.0), (100, 1200.0), (200, 2400.0), (300, 3600.0)]);
        let splits = calculate_splits(&track, KILOMETER_METERS);
        assert!(
            splits
                .windows(2)
                .all(|pair| pair[1].split == pair[0].split + 1)
        );
    }

    #[test]
    fn missing_timestamps_yield_zero_elapsed_and_zero_speed() {
        let mut track = track(&[(0, 0.0), (360, 1500.0)]);
        track[1].time = None;
        let splits = calculate_splits(&track, KILOMETER_METERS);

        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].elapsed_time, 0.0);
        assert_eq!(splits[0].average_speed, 0.0);
        assert!(splits[0].average_speed.is_finite());
    }

    #[test]
    fn missing_altitude_yields_zero_elevation_difference() {
        let track = track(&[(0, 0.0), (360, 1500.0)]);
        let splits = calculate_splits(&track, KILOMETER_METERS);
        assert_eq!(splits[0].elevation_difference, 0.0);
    }

    #[test]
    fn elevation_difference_is_end_minus_start() {
        let mut track = track(&[(0, 0.0), (360, 1500.0)]);
        track[0].altitude = Some(120.0);
        track[1].altitude = Some(95.0);
        let splits = calculate_splits(&track, KILOMETER_METERS);
        assert_eq!(splits[0].elevation_difference, -25.0);
    }

    #[test]
    fn heartrate_averages_only_samples_that_carry_one() {
        let mut track = track(&[(0, 0.0), (180, 500.0), (360, 1500.0)]);
        track[0].heartrate = Some(140.0);
        track[2].heartrate = Some(160.0);
        let splits = calculate_splits(&track, KILOMETER_METERS);
        assert_eq!(splits[0].average_heartrate, Some(150.0));
    }

    #[test]
    fn no_heartrate_in_window_gives_none() {
        let track = track(&[(0, 0.0), (360, 1500.0)]);
        let splits = calculate_splits(&track, KILOMETER_METERS);
        assert_eq!(splits[0].average_heartrate, None);
    }

    #[test]
    fn track_without_distance_produces_no_splits() {
        let mut track = track(&[(0, 0.0), (360, 0.0), (720, 0.0)]);
        for point in &mut track {
            point.distance = None;
        }
        assert!(calculate_splits(&track, MILE_METERS).is_empty());
        assert!(calculate_splits(&track, KILOMETER_METERS).is_empty());
    }

    #[test]
    fn empty_track_produces_no_splits() {
        assert!(calculate_splits(&[], MILE_METERS).is_empty());
    }

    #[test]
    fn mile_and_kilometer_buckets_are_independent() {
        let track = track(&[
            (0, 0.0),
            (300, 900.0),
            (600, 1800.0),
            (900, 2700.0),
            (1200, 3600.0),
        ]);
        let miles = calculate_splits(&track, MILE_METERS);
        let kilometers = calculate_splits(&track, KILOMETER_METERS);

        assert_eq!(miles.len(), 2);
        assert_eq!(kilometers.len(), 3);
        assert!(miles.iter().all(|split| split.distance == MILE_METERS));
        assert!(
            kilometers
                .iter()
                .all(|split| split.distance == KILOMETER_METERS)
        );
    }
}
