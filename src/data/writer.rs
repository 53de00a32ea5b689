use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Float64Array, Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::ValueEnum;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use super::model::Dataset;
use crate::error::{PipelineError, PipelineResult};

// ---------------------------------------------------------------------------
// Artifact naming
// ---------------------------------------------------------------------------

/// Pipeline stage that produced a dataset artifact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Toa,
    Filter,
    Noise,
    EnergyFilter(f64),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Toa => write!(f, "toa"),
            Stage::Filter => write!(f, "filter"),
            Stage::Noise => write!(f, "noise"),
            // Debug keeps the decimal point: -1.0 rather than -1
            Stage::EnergyFilter(threshold) => write!(f, "energy_filter_{threshold:?}"),
        }
    }
}

/// On-disk dataset encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<dir>/<stem>_<stage>.<ext>` next to `original`.
pub fn artifact_path(original: &Path, stage: Stage, format: OutputFormat) -> PathBuf {
    original.with_file_name(format!("{}_{stage}.{}", stem(original), format.extension()))
}

/// `<dir>/<stem>.<ext>` for an un-filtered ingestion of a capture file.
pub fn dataset_path(capture: &Path, format: OutputFormat) -> PathBuf {
    capture.with_file_name(format!("{}.{}", stem(capture), format.extension()))
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Save a dataset, choosing the encoding from the extension of `path`.
pub fn save_dataset(dataset: &Dataset, path: &Path) -> PipelineResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => save_json(dataset, path),
        "csv" => save_csv(dataset, path),
        "parquet" | "pq" => save_parquet(dataset, path),
        other => Err(PipelineError::UnsupportedFormat(other.to_string())),
    }?;
    log::info!("dataset saved : {} ({} records)", path.display(), dataset.len());
    Ok(())
}

fn save_json(dataset: &Dataset, path: &Path) -> PipelineResult<()> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer(file, dataset)?;
    Ok(())
}

fn save_csv(dataset: &Dataset, path: &Path) -> PipelineResult<()> {
    let writer = csv::Writer::from_path(path)?;
    write_csv(dataset, writer)
}

pub(crate) fn write_csv<W: std::io::Write>(
    dataset: &Dataset,
    mut writer: csv::Writer<W>,
) -> PipelineResult<()> {
    let mut header = vec!["waves", "event", "sensor", "time", "parent_txt"];
    if dataset.toa().is_some() {
        header.push("toa");
    }
    writer.write_record(&header)?;

    for r in dataset.records() {
        let waves = r
            .samples
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(";");
        let mut row = vec![
            waves,
            r.event_id.to_string(),
            r.sensor_id.to_string(),
            r.capture_time.to_string(),
            r.parent_source.to_string(),
        ];
        if let Some(toa) = r.toa {
            row.push(toa.to_string());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn save_parquet(dataset: &Dataset, path: &Path) -> PipelineResult<()> {
    let batch = to_record_batch(dataset)?;
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn to_record_batch(dataset: &Dataset) -> PipelineResult<RecordBatch> {
    let mut waves_builder = ListBuilder::new(Float64Builder::new());
    for wave in dataset.waves() {
        let values = waves_builder.values();
        for &v in wave {
            values.append_value(v);
        }
        waves_builder.append(true);
    }
    let waves_array = waves_builder.finish();

    let event_array = Int64Array::from(dataset.events().to_vec());
    let sensor_array = Int64Array::from(
        dataset.sensors().iter().map(|&s| i64::from(s)).collect::<Vec<_>>(),
    );
    let time_array = Float64Array::from(dataset.times().to_vec());
    let parent_array = StringArray::from(
        dataset
            .parent_sources()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>(),
    );

    let mut fields = vec![
        Field::new(
            "waves",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("event", DataType::Int64, false),
        Field::new("sensor", DataType::Int64, false),
        Field::new("time", DataType::Float64, false),
        Field::new("parent_txt", DataType::Utf8, false),
    ];
    let mut columns: Vec<arrow::array::ArrayRef> = vec![
        Arc::new(waves_array),
        Arc::new(event_array),
        Arc::new(sensor_array),
        Arc::new(time_array),
        Arc::new(parent_array),
    ];
    if let Some(toa) = dataset.toa() {
        fields.push(Field::new("toa", DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(toa.to_vec())));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
