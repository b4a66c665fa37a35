use std::collections::HashMap;

use fitparser::FitDataRecord;

use crate::processing::model::RawValue;
use crate::processing::types::FitDecodeError;

/// Decode a FIT payload into typed records, validating framing and CRCs.
/// Scale/offset conversion and field naming come from `fitparser`'s bundled
/// Garmin profile.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<FitDataRecord>, FitDecodeError> {
    fitparser::from_bytes(bytes).map_err(|err| FitDecodeError::Format(err.to_string()))
}

#[derive(Clone, Debug)]
struct FieldDefinition {
    number: u8,
    size: u8,
    base_type: u8,
}

#[derive(Clone, Debug)]
struct MessageDefinition {
    fields: Vec<FieldDefinition>,
    developer_sizes: Vec<u8>,
    little_endian: bool,
}

/// Walk the FIT data section and recover, for every data message in file
/// order, the unscaled base-type encoding of each field keyed by field
/// definition number. This is the raw-value sidecar zipped with the decoded
/// records; `fitparser` applies profile scaling and does not expose these.
///
/// The walk does not verify CRCs; callers run it only after
/// [`decode_records`] has accepted the same bytes.
pub fn raw_field_maps(bytes: &[u8]) -> Result<Vec<HashMap<u8, RawValue>>, FitDecodeError> {
    let header_len = *bytes
        .first()
        .ok_or_else(|| FitDecodeError::Format("missing file header".into()))?
        as usize;
    if header_len < 12 || bytes.len() < header_len {
        return Err(FitDecodeError::Format("file header truncated".into()));
    }

    let data_size =
        u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let data_end = header_len + data_size;
    if bytes.len() < data_end {
        return Err(FitDecodeError::Format("data section truncated".into()));
    }
    let data = &bytes[header_len..data_end];

    let mut definitions: HashMap<u8, MessageDefinition> = HashMap::new();
    let mut maps: Vec<HashMap<u8, RawValue>> = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let header = data[offset];
        offset += 1;

        // Compressed timestamp headers carry the local message number in
        // bits 5-6 and are always data messages.
        let (is_definition, has_developer_data, local_message_num) = if header & 0x80 != 0 {
            (false, false, (header >> 5) & 0x03)
        } else {
            (header & 0x40 != 0, header & 0x20 != 0, header & 0x0F)
        };

        if is_definition {
            if offset + 5 > data.len() {
                return Err(FitDecodeError::Format("definition message truncated".into()));
            }
            let architecture = data[offset + 1];
            let num_fields = data[offset + 4] as usize;
            offset += 5;

            let mut fields = Vec::with_capacity(num_fields);
            for _ in 0..num_fields {
                if offset + 3 > data.len() {
                    return Err(FitDecodeError::Format("field definition truncated".into()));
                }
                fields.push(FieldDefinition {
                    number: data[offset],
                    size: data[offset + 1],
                    base_type: data[offset + 2],
                });
                offset += 3;
            }

            let mut developer_sizes = Vec::new();
            if has_developer_data {
                let dev_count = *data.get(offset).ok_or_else(|| {
                    FitDecodeError::Format("missing developer field count".into())
                })? as usize;
                offset += 1;
                for _ in 0..dev_count {
                    if offset + 3 > data.len() {
                        return Err(FitDecodeError::Format(
                            "developer field definition truncated".into(),
                        ));
                    }
                    developer_sizes.push(data[offset + 1]);
                    offset += 3;
                }
            }

            definitions.insert(
                local_message_num,
                MessageDefinition {
                    fields,
                    developer_sizes,
                    little_endian: architecture == 0,
                },
            );
        } else {
            let definition = definitions.get(&local_message_num).ok_or_else(|| {
                FitDecodeError::Format("data message missing preceding definition".into())
            })?;

            let mut map = HashMap::with_capacity(definition.fields.len());
            for field in &definition.fields {
                let size = field.size as usize;
                if offset + size > data.len() {
                    return Err(FitDecodeError::Format("data message truncated".into()));
                }
                map.insert(
                    field.number,
                    decode_base_type(
                        &data[offset..offset + size],
                        field.base_type,
                        definition.little_endian,
                    ),
                );
                offset += size;
            }

            for dev_size in &definition.developer_sizes {
                let size = *dev_size as usize;
                if offset + size > data.len() {
                    return Err(FitDecodeError::Format(
                        "developer data message truncated".into(),
                    ));
                }
                offset += size;
            }

            maps.push(map);
        }
    }

    Ok(maps)
}

// FIT base type numbers after masking off the endian-ability bit.
const BASE_ENUM: u8 = 0x00;
const BASE_SINT8: u8 = 0x01;
const BASE_UINT8: u8 = 0x02;
const BASE_SINT16: u8 = 0x03;
const BASE_UINT16: u8 = 0x04;
const BASE_SINT32: u8 = 0x05;
const BASE_UINT32: u8 = 0x06;
const BASE_STRING: u8 = 0x07;
const BASE_FLOAT32: u8 = 0x08;
const BASE_FLOAT64: u8 = 0x09;
const BASE_UINT8Z: u8 = 0x0A;
const BASE_UINT16Z: u8 = 0x0B;
const BASE_UINT32Z: u8 = 0x0C;
const BASE_BYTE: u8 = 0x0D;
const BASE_SINT64: u8 = 0x0E;
const BASE_UINT64: u8 = 0x0F;
const BASE_UINT64Z: u8 = 0x10;

fn base_type_size(base: u8) -> usize {
    match base {
        BASE_ENUM | BASE_SINT8 | BASE_UINT8 | BASE_STRING | BASE_UINT8Z | BASE_BYTE => 1,
        BASE_SINT16 | BASE_UINT16 | BASE_UINT16Z => 2,
        BASE_SINT32 | BASE_UINT32 | BASE_FLOAT32 | BASE_UINT32Z => 4,
        BASE_FLOAT64 | BASE_SINT64 | BASE_UINT64 | BASE_UINT64Z => 8,
        _ => 0,
    }
}

fn decode_base_type(bytes: &[u8], wire_base_type: u8, little_endian: bool) -> RawValue {
    let base = wire_base_type & 0x1F;

    if base == BASE_STRING {
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        return RawValue::String(String::from_utf8_lossy(&bytes[..end]).into_owned());
    }
    if base == BASE_BYTE {
        return RawValue::Bytes(bytes.to_vec());
    }

    let unit = base_type_size(base);
    if unit == 0 || bytes.len() < unit {
        return RawValue::Bytes(bytes.to_vec());
    }
    if bytes.len() > unit && bytes.len() % unit == 0 {
        return RawValue::Array(
            bytes
                .chunks(unit)
                .map(|chunk| decode_scalar(chunk, base, little_endian))
                .collect(),
        );
    }
    decode_scalar(&bytes[..unit], base, little_endian)
}

fn decode_scalar(bytes: &[u8], base: u8, little_endian: bool) -> RawValue {
    let u16_of = |b: [u8; 2]| {
        if little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        }
    };
    let u32_of = |b: [u8; 4]| {
        if little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        }
    };
    let u64_of = |b: [u8; 8]| {
        if little_endian {
            u64::from_le_bytes(b)
        } else {
            u64::from_be_bytes(b)
        }
    };

    match base {
        BASE_ENUM | BASE_UINT8 | BASE_UINT8Z => RawValue::UInt(u64::from(bytes[0])),
        BASE_SINT8 => RawValue::SInt(i64::from(bytes[0] as i8)),
        BASE_SINT16 => RawValue::SInt(i64::from(u16_of([bytes[0], bytes[1]]) as i16)),
        BASE_UINT16 | BASE_UINT16Z => RawValue::UInt(u64::from(u16_of([bytes[0], bytes[1]]))),
        BASE_SINT32 => RawValue::SInt(i64::from(
            u32_of([bytes[0], bytes[1], bytes[2], bytes[3]]) as i32,
        )),
        BASE_UINT32 | BASE_UINT32Z => {
            RawValue::UInt(u64::from(u32_of([bytes[0], bytes[1], bytes[2], bytes[3]])))
        }
        BASE_FLOAT32 => RawValue::Float(f64::from(f32::from_bits(u32_of([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ])))),
        BASE_FLOAT64 => RawValue::Float(f64::from_bits(u64_of([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))),
        BASE_SINT64 => RawValue::SInt(u64_of([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as i64),
        BASE_UINT64 | BASE_UINT64Z => RawValue::UInt(u64_of([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])),
        _ => RawValue::Bytes(bytes.to_vec()),
    }
}
