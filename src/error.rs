use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Malformed instrument capture or companion time file.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty capture: no header line")]
    MissingHeader,
    #[error("malformed header '{line}': {reason}")]
    MalformedHeader { line: String, reason: String },
    #[error("line {line}: '{token}' is not a number")]
    NotANumber { line: usize, token: String },
    #[error("line {line}: expected at least {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("{rows} sample rows do not split into blocks of {block}")]
    TruncatedBlock { rows: usize, block: usize },
    #[error("time file lists {times} timestamps for {events} events")]
    TimeCount { times: usize, events: usize },
    #[error("missing '{0}' marker")]
    MissingMarker(&'static str),
}

/// Dataset columns that violate the canonical schema.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("column '{column}' has {found} entries, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("waveform {index} has {found} samples, expected {expected}")]
    RaggedWaves {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("record {index}: sensor id {sensor} is not a 1-based channel")]
    InvalidSensor { index: usize, sensor: i64 },
    #[error("column '{column}' has a null at row {index}")]
    NullValue { column: &'static str, index: usize },
    #[error("column '{column}' has unsupported type {found}")]
    ColumnType { column: &'static str, found: String },
    #[error("channel {channel} holds {found} events, expected {expected}")]
    RaggedChannels {
        channel: usize,
        expected: usize,
        found: usize,
    },
}

/// An event key that does not resolve to the expected channel group.
#[derive(Debug, Error, PartialEq)]
pub enum PairingError {
    #[error("event {event} ({parent}) has {found} channel records, expected {expected}")]
    ChannelCount {
        event: i64,
        parent: String,
        expected: usize,
        found: usize,
    },
    #[error("event {event} ({parent}) repeats sensor {sensor}")]
    DuplicateSensor {
        event: i64,
        parent: String,
        sensor: u32,
    },
}

/// Failure of a selection or decision provider.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("input closed before a decision for event {event}")]
    Closed { event: i64 },
    #[error("event {event} channel {channel}: candidate {value} is not a finite time")]
    NonFinite { event: i64, channel: u32, value: f64 },
    #[error("oracle IO: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("pairing error: {0}")]
    Pairing(#[from] PairingError),
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Arrow Error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("Parquet Error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("unsupported dataset extension: .{0}")]
    UnsupportedFormat(String),
}
