//! Column classification and per-cell access
//!
//! Every column is tagged with a [`ColumnKind`] up front so the audio column is
//! found by matching on the descriptor rather than by probing values.

use crate::encoder::{encode_wav, verify_container};
use crate::error::{RowError, SourceFormatError};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Fields, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, Schema,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use serde_json::Value;
use std::collections::HashMap;

/// Parquet footer key under which `datasets` stores its feature description
pub const HF_METADATA_KEY: &str = "huggingface";

/// How audio is stored in a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioLayout {
    /// `struct<bytes: binary, path: string>`; child indices into the struct
    Encoded { bytes: usize, path: Option<usize> },
    /// `struct<array: list<float>, sampling_rate: int>`
    Samples { array: usize, sampling_rate: usize },
    /// Plain binary column of encoded audio
    Raw,
}

impl AudioLayout {
    pub fn describe(&self) -> &'static str {
        match self {
            AudioLayout::Encoded { .. } => "encoded",
            AudioLayout::Samples { .. } => "samples",
            AudioLayout::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Audio(AudioLayout),
    Scalar,
    Other,
}

impl ColumnKind {
    pub fn of(data_type: &DataType) -> Self {
        match data_type {
            DataType::Binary | DataType::LargeBinary => ColumnKind::Audio(AudioLayout::Raw),
            DataType::Struct(fields) => struct_layout(fields)
                .map(ColumnKind::Audio)
                .unwrap_or(ColumnKind::Other),
            DataType::Null
            | DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Date32
            | DataType::Date64
            | DataType::Timestamp(_, _) => ColumnKind::Scalar,
            _ => ColumnKind::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnKind::Audio(_) => "audio",
            ColumnKind::Scalar => "scalar",
            ColumnKind::Other => "other",
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, ColumnKind::Audio(_))
    }
}

fn struct_layout(fields: &Fields) -> Option<AudioLayout> {
    let child = |name: &str| fields.iter().position(|f| f.name() == name);

    if let Some(bytes) = child("bytes") {
        if matches!(
            fields[bytes].data_type(),
            DataType::Binary | DataType::LargeBinary
        ) {
            let path = child("path").filter(|&i| {
                matches!(fields[i].data_type(), DataType::Utf8 | DataType::LargeUtf8)
            });
            return Some(AudioLayout::Encoded { bytes, path });
        }
    }

    let array = child("array")?;
    let sampling_rate = child("sampling_rate")?;
    let floats = match fields[array].data_type() {
        DataType::List(item) | DataType::LargeList(item) => {
            matches!(item.data_type(), DataType::Float32 | DataType::Float64)
        }
        _ => false,
    };
    if floats && fields[sampling_rate].data_type().is_integer() {
        return Some(AudioLayout::Samples {
            array,
            sampling_rate,
        });
    }

    None
}

/// The column audio is extracted from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioColumn {
    pub index: usize,
    pub name: String,
    pub layout: AudioLayout,
}

/// Audio declarations found in the `datasets` feature description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureHints {
    /// Columns declared with `_type: Audio`
    pub audio_columns: Vec<String>,
    pub sampling_rates: HashMap<String, u32>,
}

impl FeatureHints {
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Self {
        let mut hints = FeatureHints::default();

        let Some(raw) = metadata.get(HF_METADATA_KEY) else {
            return hints;
        };
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            return hints;
        };
        let Some(features) = value
            .pointer("/info/features")
            .and_then(Value::as_object)
        else {
            return hints;
        };

        for (name, feature) in features {
            if feature.get("_type").and_then(Value::as_str) != Some("Audio") {
                continue;
            }
            hints.audio_columns.push(name.clone());
            if let Some(rate) = feature
                .get("sampling_rate")
                .and_then(Value::as_u64)
                .and_then(|r| u32::try_from(r).ok())
            {
                hints.sampling_rates.insert(name.clone(), rate);
            }
        }

        hints
    }

    pub fn sampling_rate(&self, column: &str) -> Option<u32> {
        self.sampling_rates.get(column).copied()
    }
}

/// Pick the audio column: the requested one, else a declared `Audio` feature,
/// else the first audio-shaped column
pub fn find_audio_column(
    schema: &Schema,
    hints: &FeatureHints,
    requested: Option<&str>,
) -> Result<AudioColumn, SourceFormatError> {
    let audio_at = |index: usize| {
        let field = schema.field(index);
        match ColumnKind::of(field.data_type()) {
            ColumnKind::Audio(layout) => Some(AudioColumn {
                index,
                name: field.name().clone(),
                layout,
            }),
            _ => None,
        }
    };

    if let Some(name) = requested {
        let (index, field) = schema
            .column_with_name(name)
            .ok_or_else(|| SourceFormatError::MissingColumn(name.to_string()))?;
        return audio_at(index).ok_or_else(|| SourceFormatError::NotAudio {
            name: name.to_string(),
            data_type: field.data_type().clone(),
        });
    }

    let declared = hints
        .audio_columns
        .iter()
        .filter_map(|name| schema.index_of(name).ok())
        .find_map(audio_at);

    declared
        .or_else(|| (0..schema.fields().len()).find_map(audio_at))
        .ok_or_else(|| {
            SourceFormatError::NoAudioColumn(
                schema.fields().iter().map(|f| f.name().clone()).collect(),
            )
        })
}

/// Audio bytes of one row plus what the row says about naming them
#[derive(Debug)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub path_hint: Option<String>,
}

/// Read the audio value of `row` from an audio column
pub fn read_payload(
    column: &ArrayRef,
    layout: AudioLayout,
    row: usize,
) -> Result<Payload, RowError> {
    if column.is_null(row) {
        return Err(RowError::MissingPayload);
    }

    let payload = match layout {
        AudioLayout::Raw => Payload {
            bytes: binary_value(column, row)?,
            path_hint: None,
        },
        AudioLayout::Encoded { bytes, path } => {
            let parts = column
                .as_struct_opt()
                .ok_or_else(|| RowError::Unreadable("expected struct column".into()))?;
            Payload {
                bytes: binary_value(parts.column(bytes), row)?,
                path_hint: path.and_then(|i| string_value(parts.column(i), row)),
            }
        }
        AudioLayout::Samples {
            array,
            sampling_rate,
        } => {
            let parts = column
                .as_struct_opt()
                .ok_or_else(|| RowError::Unreadable("expected struct column".into()))?;
            let rate = int_value(parts.column(sampling_rate), row)
                .ok_or(RowError::MissingPayload)?;
            let rate = u32::try_from(rate)
                .ok()
                .filter(|r| *r > 0)
                .ok_or(RowError::InvalidSampleRate(rate))?;
            let samples = float_samples(parts.column(array), row)?;
            if samples.is_empty() {
                return Err(RowError::EmptyPayload);
            }
            Payload {
                bytes: encode_wav(&samples, rate)?,
                path_hint: None,
            }
        }
    };

    if payload.bytes.is_empty() {
        return Err(RowError::EmptyPayload);
    }
    verify_container(&payload.bytes).map_err(RowError::Corrupt)?;
    Ok(payload)
}

fn binary_value(array: &ArrayRef, row: usize) -> Result<Vec<u8>, RowError> {
    if array.is_null(row) {
        return Err(RowError::MissingPayload);
    }
    if let Some(values) = array.as_binary_opt::<i32>() {
        return Ok(values.value(row).to_vec());
    }
    if let Some(values) = array.as_binary_opt::<i64>() {
        return Ok(values.value(row).to_vec());
    }
    Err(RowError::Unreadable(format!(
        "expected binary, found {}",
        array.data_type()
    )))
}

fn float_samples(array: &ArrayRef, row: usize) -> Result<Vec<f32>, RowError> {
    if array.is_null(row) {
        return Err(RowError::MissingPayload);
    }
    let values = if let Some(list) = array.as_list_opt::<i32>() {
        list.value(row)
    } else if let Some(list) = array.as_list_opt::<i64>() {
        list.value(row)
    } else {
        return Err(RowError::Unreadable(format!(
            "expected list of samples, found {}",
            array.data_type()
        )));
    };

    if let Some(values) = values.as_primitive_opt::<Float32Type>() {
        return Ok(values.iter().map(|v| v.unwrap_or(0.0)).collect());
    }
    if let Some(values) = values.as_primitive_opt::<Float64Type>() {
        return Ok(values.iter().map(|v| v.unwrap_or(0.0) as f32).collect());
    }
    Err(RowError::Unreadable(format!(
        "expected float samples, found {}",
        values.data_type()
    )))
}

fn string_value(array: &ArrayRef, row: usize) -> Option<String> {
    if array.is_null(row) {
        return None;
    }
    array
        .as_string_opt::<i32>()
        .map(|a| a.value(row).to_string())
        .or_else(|| array.as_string_opt::<i64>().map(|a| a.value(row).to_string()))
}

fn int_value(array: &ArrayRef, row: usize) -> Option<i64> {
    if array.is_null(row) {
        return None;
    }
    match array.data_type() {
        DataType::Int8 => Some(array.as_primitive_opt::<Int8Type>()?.value(row) as i64),
        DataType::Int16 => Some(array.as_primitive_opt::<Int16Type>()?.value(row) as i64),
        DataType::Int32 => Some(array.as_primitive_opt::<Int32Type>()?.value(row) as i64),
        DataType::Int64 => Some(array.as_primitive_opt::<Int64Type>()?.value(row)),
        DataType::UInt8 => Some(array.as_primitive_opt::<UInt8Type>()?.value(row) as i64),
        DataType::UInt16 => Some(array.as_primitive_opt::<UInt16Type>()?.value(row) as i64),
        DataType::UInt32 => Some(array.as_primitive_opt::<UInt32Type>()?.value(row) as i64),
        DataType::UInt64 => i64::try_from(array.as_primitive_opt::<UInt64Type>()?.value(row)).ok(),
        _ => None,
    }
}

/// JSON rendering of one cell for the metadata file
pub fn cell_to_json(array: &ArrayRef, row: usize) -> Value {
    if array.is_null(row) {
        return Value::Null;
    }

    match array.data_type() {
        DataType::Boolean => {
            if let Some(values) = array.as_boolean_opt() {
                return Value::Bool(values.value(row));
            }
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            if let Some(v) = int_value(array, row) {
                return Value::from(v);
            }
        }
        DataType::UInt64 => {
            if let Some(values) = array.as_primitive_opt::<UInt64Type>() {
                return Value::from(values.value(row));
            }
        }
        DataType::Float32 => {
            if let Some(values) = array.as_primitive_opt::<Float32Type>() {
                return float_json(values.value(row) as f64);
            }
        }
        DataType::Float64 => {
            if let Some(values) = array.as_primitive_opt::<Float64Type>() {
                return float_json(values.value(row));
            }
        }
        DataType::Utf8 | DataType::LargeUtf8 => {
            if let Some(s) = string_value(array, row) {
                return Value::String(s);
            }
        }
        _ => {}
    }

    array_value_to_string(array, row)
        .map(Value::String)
        .unwrap_or(Value::Null)
}

fn float_json(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
