use std::path::Path;

use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray,
    LargeStringArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Dataset, RawColumns};
use crate::error::{ParseError, PipelineError, PipelineResult, SchemaError};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.json`    – canonical `{ "waves": [[...]], "event": [...], ... }` object
/// * `.csv`     – one row per record, `waves` holding semicolon-separated floats
/// * `.parquet` – `waves` List<Float64> column plus scalar columns
pub fn load_dataset(path: &Path) -> PipelineResult<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(PipelineError::UnsupportedFormat(other.to_string())),
    }?;
    log::info!(
        "loaded {} records ({} samples each) from {}",
        dataset.len(),
        dataset.wave_length(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> PipelineResult<Dataset> {
    let text = std::fs::read_to_string(path)?;
    parse_json(&text)
}

/// Parse the canonical column object.
pub fn parse_json(text: &str) -> PipelineResult<Dataset> {
    let raw: RawColumns = serde_json::from_str(text)?;
    Ok(Dataset::try_from(raw)?)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row `waves,event,sensor,time,parent_txt[,toa]`.
/// `waves` cells contain semicolon-separated floats: `"0.12;0.14;0.11"`.
fn load_csv(path: &Path) -> PipelineResult<Dataset> {
    let reader = csv::Reader::from_path(path)?;
    read_csv(reader)
}

pub(crate) fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> PipelineResult<Dataset> {
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let waves_idx = position("waves");
    let event_idx = position("event");
    let sensor_idx = position("sensor");
    let time_idx = position("time");
    let parent_idx = position("parent_txt");
    let toa_idx = position("toa");

    let mut raw = RawColumns {
        waves: waves_idx.map(|_| Vec::new()),
        event: event_idx.map(|_| Vec::new()),
        sensor: sensor_idx.map(|_| Vec::new()),
        time: time_idx.map(|_| Vec::new()),
        parent_txt: parent_idx.map(|_| Vec::new()),
        toa: toa_idx.map(|_| Vec::new()),
    };

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        // header is line 1
        let line = row_no + 2;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        if let (Some(i), Some(col)) = (waves_idx, raw.waves.as_mut()) {
            col.push(parse_semicolon_floats(cell(i), line)?);
        }
        if let (Some(i), Some(col)) = (event_idx, raw.event.as_mut()) {
            col.push(parse_number(cell(i), line)?);
        }
        if let (Some(i), Some(col)) = (sensor_idx, raw.sensor.as_mut()) {
            col.push(parse_number(cell(i), line)?);
        }
        if let (Some(i), Some(col)) = (time_idx, raw.time.as_mut()) {
            col.push(parse_number(cell(i), line)?);
        }
        if let (Some(i), Some(col)) = (parent_idx, raw.parent_txt.as_mut()) {
            col.push(cell(i).to_string());
        }
        if let (Some(i), Some(col)) = (toa_idx, raw.toa.as_mut()) {
            col.push(parse_number(cell(i), line)?);
        }
    }

    Ok(Dataset::try_from(raw)?)
}

fn parse_number<T: std::str::FromStr>(s: &str, line: usize) -> Result<T, ParseError> {
    s.trim().parse::<T>().map_err(|_| ParseError::NotANumber {
        line,
        token: s.to_string(),
    })
}

fn parse_semicolon_floats(s: &str, line: usize) -> Result<Vec<f64>, ParseError> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';').map(|tok| parse_number(tok, line)).collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding a dataset.
///
/// Expected schema:
/// - `waves`: List<Float64> or LargeList<Float64> (Float32 inner values accepted)
/// - `event`, `sensor`: Int64 or Int32
/// - `time`, `toa`: Float64 (both optional)
/// - `parent_txt`: Utf8 or LargeUtf8
fn load_parquet(path: &Path) -> PipelineResult<Dataset> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let present = |name: &str| schema.index_of(name).is_ok();

    let mut raw = RawColumns {
        waves: present("waves").then(Vec::new),
        event: present("event").then(Vec::new),
        sensor: present("sensor").then(Vec::new),
        time: present("time").then(Vec::new),
        parent_txt: present("parent_txt").then(Vec::new),
        toa: present("toa").then(Vec::new),
    };

    let reader = builder.build()?;
    for batch_result in reader {
        let batch = batch_result?;
        let offset = raw.waves.as_ref().map_or(0, Vec::len);

        if let Some(col) = raw.waves.as_mut() {
            let array = column(&batch, "waves")?;
            for row in 0..batch.num_rows() {
                col.push(extract_f64_list(array, "waves", row, offset)?);
            }
        }
        if let Some(col) = raw.event.as_mut() {
            col.extend(extract_i64(column(&batch, "event")?, "event", offset)?);
        }
        if let Some(col) = raw.sensor.as_mut() {
            col.extend(extract_i64(column(&batch, "sensor")?, "sensor", offset)?);
        }
        if let Some(col) = raw.time.as_mut() {
            col.extend(extract_f64(column(&batch, "time")?, "time", offset)?);
        }
        if let Some(col) = raw.toa.as_mut() {
            col.extend(extract_f64(column(&batch, "toa")?, "toa", offset)?);
        }
        if let Some(col) = raw.parent_txt.as_mut() {
            col.extend(extract_strings(column(&batch, "parent_txt")?, "parent_txt", offset)?);
        }
    }

    Ok(Dataset::try_from(raw)?)
}

// -- Parquet / Arrow helpers --

fn column<'a>(batch: &'a RecordBatch, name: &'static str) -> Result<&'a ArrayRef, SchemaError> {
    batch
        .column_by_name(name)
        .ok_or(SchemaError::MissingField(name))
}

fn unsupported(column: &'static str, data_type: &DataType) -> SchemaError {
    SchemaError::ColumnType {
        column,
        found: format!("{data_type:?}"),
    }
}

fn no_nulls(col: &ArrayRef, column: &'static str, offset: usize) -> Result<(), SchemaError> {
    match (0..col.len()).find(|&row| col.is_null(row)) {
        Some(row) => Err(SchemaError::NullValue {
            column,
            index: offset + row,
        }),
        None => Ok(()),
    }
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(
    col: &ArrayRef,
    name: &'static str,
    row: usize,
    offset: usize,
) -> Result<Vec<f64>, SchemaError> {
    if col.is_null(row) {
        return Err(SchemaError::NullValue {
            column: name,
            index: offset + row,
        });
    }

    let values_array = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .ok_or_else(|| unsupported(name, col.data_type()))?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .ok_or_else(|| unsupported(name, col.data_type()))?
            .value(row),
        other => return Err(unsupported(name, other)),
    };

    // A null sample is rejected like a null row.
    let null = || SchemaError::NullValue {
        column: name,
        index: offset + row,
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        f64_arr.iter().map(|v| v.ok_or_else(null)).collect()
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        f32_arr
            .iter()
            .map(|v| v.map(f64::from).ok_or_else(null))
            .collect()
    } else {
        Err(unsupported(name, values_array.data_type()))
    }
}

fn extract_i64(col: &ArrayRef, name: &'static str, offset: usize) -> Result<Vec<i64>, SchemaError> {
    no_nulls(col, name, offset)?;
    if let Some(arr) = col.as_any().downcast_ref::<Int64Array>() {
        Ok(arr.values().to_vec())
    } else if let Some(arr) = col.as_any().downcast_ref::<Int32Array>() {
        Ok(arr.values().iter().map(|&v| i64::from(v)).collect())
    } else {
        Err(unsupported(name, col.data_type()))
    }
}

fn extract_f64(col: &ArrayRef, name: &'static str, offset: usize) -> Result<Vec<f64>, SchemaError> {
    no_nulls(col, name, offset)?;
    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.values().to_vec())
    } else if let Some(arr) = col.as_any().downcast_ref::<Float32Array>() {
        Ok(arr.values().iter().map(|&v| v as f64).collect())
    } else {
        Err(unsupported(name, col.data_type()))
    }
}

fn extract_strings(
    col: &ArrayRef,
    name: &'static str,
    offset: usize,
) -> Result<Vec<String>, SchemaError> {
    no_nulls(col, name, offset)?;
    if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        Ok((0..arr.len()).map(|i| arr.value(i).to_string()).collect())
    } else if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        Ok((0..arr.len()).map(|i| arr.value(i).to_string()).collect())
    } else {
        Err(unsupported(name, col.data_type()))
    }
}
