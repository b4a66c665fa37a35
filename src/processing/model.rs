use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::processing::types::iso_utc;

/// Semantic field value, converted out of `fitparser`'s wire representation.
/// Timestamps are normalized to UTC; integer widths are folded into
/// `i64`/`u64` so downstream code never matches on wire width.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Timestamp(DateTime<Utc>),
    SInt(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<FieldValue>),
}

impl FieldValue {
    pub fn from_fit(value: &Value) -> Self {
        match value {
            Value::Timestamp(ts) => Self::Timestamp(ts.with_timezone(&Utc)),
            Value::SInt8(v) => Self::SInt(i64::from(*v)),
            Value::SInt16(v) => Self::SInt(i64::from(*v)),
            Value::SInt32(v) => Self::SInt(i64::from(*v)),
            Value::SInt64(v) => Self::SInt(*v),
            Value::Byte(v) | Value::Enum(v) | Value::UInt8(v) | Value::UInt8z(v) => {
                Self::UInt(u64::from(*v))
            }
            Value::UInt16(v) | Value::UInt16z(v) => Self::UInt(u64::from(*v)),
            Value::UInt32(v) | Value::UInt32z(v) => Self::UInt(u64::from(*v)),
            Value::UInt64(v) | Value::UInt64z(v) => Self::UInt(*v),
            Value::Float32(v) => Self::Float(f64::from(*v)),
            Value::Float64(v) => Self::Float(*v),
            Value::String(v) => Self::String(v.clone()),
            Value::Array(items) => Self::Array(items.iter().map(Self::from_fit).collect()),
        }
    }

    /// Numeric view; timestamps surface as Unix epoch seconds so time deltas
    /// stay computable alongside plain numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Timestamp(ts) => Some(ts.timestamp() as f64),
            Self::SInt(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::String(_) | Self::Array(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(ts) => f.write_str(&iso_utc(ts)),
            Self::SInt(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Array(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join(","))
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Timestamp(ts) => serializer.serialize_str(&iso_utc(ts)),
            Self::SInt(v) => serializer.serialize_i64(*v),
            Self::UInt(v) => serializer.serialize_u64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::Array(items) => items.serialize(serializer),
        }
    }
}

/// The original unscaled wire encoding of a field, recovered by the raw
/// sidecar walk in [`crate::processing::decode`]. Kept next to the converted
/// value so no precision or provenance is lost.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    SInt(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<RawValue>),
}

impl Serialize for RawValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::SInt(v) => serializer.serialize_i64(*v),
            Self::UInt(v) => serializer.serialize_u64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::Bytes(v) => v.serialize(serializer),
            Self::Array(items) => items.serialize(serializer),
        }
    }
}

/// The `(value, units, raw_value)` triple kept for every field of every
/// message. `raw_value` is `None` only when the sidecar walk could not line
/// up with the decoded stream (developer fields, for instance).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawField {
    pub value: FieldValue,
    pub units: String,
    pub raw_value: Option<RawValue>,
}

/// One decoded message, tagged with its type and carrying every field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawMessage {
    pub message_type: String,
    pub fields: BTreeMap<String, RawField>,
}

impl RawMessage {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).map(|field| &field.value)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(FieldValue::as_f64)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name).map(ToString::to_string)
    }

    pub fn time(&self, name: &str) -> Option<DateTime<Utc>> {
        self.field(name).and_then(FieldValue::timestamp)
    }
}

/// Every decoded message partitioned by type. Known types get a dedicated
/// bucket; anything else lands in `other_messages` keyed by its tag, so no
/// message is ever silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawActivityData {
    pub file_id: Vec<RawMessage>,
    pub file_creator: Vec<RawMessage>,
    pub device_info: Vec<RawMessage>,
    pub session: Vec<RawMessage>,
    pub lap: Vec<RawMessage>,
    pub record: Vec<RawMessage>,
    pub event: Vec<RawMessage>,
    pub hrv: Vec<RawMessage>,
    pub segment: Vec<RawMessage>,
    pub length: Vec<RawMessage>,
    pub hr_zone: Vec<RawMessage>,
    pub power_zone: Vec<RawMessage>,
    pub sport: Vec<RawMessage>,
    pub workout: Vec<RawMessage>,
    pub workout_step: Vec<RawMessage>,
    pub activity: Vec<RawMessage>,
    pub climb_pro: Vec<RawMessage>,
    pub developer_data: Vec<RawMessage>,
    pub field_description: Vec<RawMessage>,
    pub other_messages: BTreeMap<String, Vec<RawMessage>>,
}

impl RawActivityData {
    fn bucket_mut(&mut self, tag: &str) -> &mut Vec<RawMessage> {
        match tag {
            "file_id" => &mut self.file_id,
            "file_creator" => &mut self.file_creator,
            "device_info" => &mut self.device_info,
            "session" => &mut self.session,
            "lap" => &mut self.lap,
            "record" => &mut self.record,
            "event" => &mut self.event,
            "hrv" => &mut self.hrv,
            "segment" => &mut self.segment,
            "length" => &mut self.length,
            "hr_zone" => &mut self.hr_zone,
            "power_zone" => &mut self.power_zone,
            "sport" => &mut self.sport,
            "workout" => &mut self.workout,
            "workout_step" => &mut self.workout_step,
            "activity" => &mut self.activity,
            "climb_pro" => &mut self.climb_pro,
            "developer_data" => &mut self.developer_data,
            "field_description" => &mut self.field_description,
            other => self.other_messages.entry(other.to_string()).or_default(),
        }
    }

    /// Sum of all bucket lengths, including `other_messages`. Must equal the
    /// total in the metadata count table.
    pub fn total_messages(&self) -> usize {
        self.file_id.len()
            + self.file_creator.len()
            + self.device_info.len()
            + self.session.len()
            + self.lap.len()
            + self.record.len()
            + self.event.len()
            + self.hrv.len()
            + self.segment.len()
            + self.length.len()
            + self.hr_zone.len()
            + self.power_zone.len()
            + self.sport.len()
            + self.workout.len()
            + self.workout_step.len()
            + self.activity.len()
            + self.climb_pro.len()
            + self.developer_data.len()
            + self.field_description.len()
            + self
                .other_messages
                .values()
                .map(Vec::len)
                .sum::<usize>()
    }
}

/// Snake-case bucket tag for a decoded message kind. Unknown-to-profile
/// message numbers keep their number in the tag so distinct unknown types
/// stay distinguishable in the `other_messages` map.
pub fn message_tag(kind: MesgNum) -> String {
    match kind {
        MesgNum::FileId => "file_id".to_string(),
        MesgNum::FileCreator => "file_creator".to_string(),
        MesgNum::DeviceInfo => "device_info".to_string(),
        MesgNum::Session => "session".to_string(),
        MesgNum::Lap => "lap".to_string(),
        MesgNum::Record => "record".to_string(),
        MesgNum::Event => "event".to_string(),
        MesgNum::Hrv => "hrv".to_string(),
        MesgNum::SegmentLap => "segment".to_string(),
        MesgNum::Length => "length".to_string(),
        MesgNum::HrZone => "hr_zone".to_string(),
        MesgNum::PowerZone => "power_zone".to_string(),
        MesgNum::Sport => "sport".to_string(),
        MesgNum::Workout => "workout".to_string(),
        MesgNum::WorkoutStep => "workout_step".to_string(),
        MesgNum::Activity => "activity".to_string(),
        MesgNum::ClimbPro => "climb_pro".to_string(),
        MesgNum::DeveloperDataId => "developer_data".to_string(),
        MesgNum::FieldDescription => "field_description".to_string(),
        MesgNum::UnknownVariant(num) => format!("unknown_{num}"),
        other => snake_tag(&format!("{other:?}")),
    }
}

fn snake_tag(camel: &str) -> String {
    let mut tag = String::with_capacity(camel.len() + 4);
    for (idx, ch) in camel.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if idx > 0 {
                tag.push('_');
            }
            tag.push(ch.to_ascii_lowercase());
        } else {
            tag.push(ch);
        }
    }
    tag
}

/// Materialize the decoded stream into type buckets, counting every message.
/// `raw_maps` is positional: entry `i` holds the unscaled encodings of data
/// message `i`, keyed by field definition number. An empty slice disables
/// raw-value preservation without affecting the converted values.
pub fn build_raw_activity(
    records: &[FitDataRecord],
    raw_maps: &[HashMap<u8, RawValue>],
) -> (RawActivityData, BTreeMap<String, u64>) {
    let mut data = RawActivityData::default();
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for (index, record) in records.iter().enumerate() {
        let tag = message_tag(record.kind());
        *counts.entry(tag.clone()).or_insert(0) += 1;

        let raws = raw_maps.get(index);
        let mut fields = BTreeMap::new();
        for field in record.fields() {
            fields.insert(
                field.name().to_string(),
                RawField {
                    value: FieldValue::from_fit(field.value()),
                    units: field.units().to_string(),
                    raw_value: raws.and_then(|map| map.get(&field.number()).cloned()),
                },
            );
        }

        data.bucket_mut(&tag).push(RawMessage {
            message_type: tag,
            fields,
        });
    }

    (data, counts)
}

/// Metadata recorded alongside a comprehensive parse result.
#[derive(Debug, Clone)]
pub struct ParseMetadata {
    pub file_path: String,
    pub parsed_at: DateTime<Utc>,
    pub message_counts: BTreeMap<String, u64>,
}

impl ParseMetadata {
    pub fn total_messages(&self) -> u64 {
        self.message_counts.values().sum()
    }
}

impl Serialize for ParseMetadata {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ParseMetadata", 3)?;
        state.serialize_field("file_path", &self.file_path)?;
        state.serialize_field("parsed_at", &iso_utc(&self.parsed_at))?;
        state.serialize_field("message_counts", &self.message_counts)?;
        state.end()
    }
}
