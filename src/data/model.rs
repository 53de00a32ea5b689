use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// WaveformRecord – one (event, channel) capture
// ---------------------------------------------------------------------------

/// A single channel waveform of one AE event (one row of the dataset).
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformRecord {
    /// Capture file / batch this record was ingested from.
    pub parent_source: String,
    pub event_id: i64,
    /// 1-based channel id.
    pub sensor_id: u32,
    pub samples: Vec<f64>,
    /// Capture timestamp, 0 when the instrument did not provide one.
    pub capture_time: f64,
    /// Arrival time in µs, only set by the TOA stage.
    pub toa: Option<f64>,
}

impl WaveformRecord {
    pub fn new(
        parent_source: impl Into<String>,
        event_id: i64,
        sensor_id: u32,
        samples: Vec<f64>,
    ) -> Self {
        Self {
            parent_source: parent_source.into(),
            event_id,
            sensor_id,
            samples,
            capture_time: 0.0,
            toa: None,
        }
    }

    pub fn with_time(mut self, capture_time: f64) -> Self {
        self.capture_time = capture_time;
        self
    }

    pub fn with_toa(mut self, toa: f64) -> Self {
        self.toa = Some(toa);
        self
    }
}

/// Borrowed view of one dataset row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordRef<'a> {
    /// Row position in the dataset (ingestion order).
    pub index: usize,
    pub parent_source: &'a str,
    pub event_id: i64,
    pub sensor_id: u32,
    pub samples: &'a [f64],
    pub capture_time: f64,
    pub toa: Option<f64>,
}

impl RecordRef<'_> {
    pub fn to_record(&self) -> WaveformRecord {
        WaveformRecord {
            parent_source: self.parent_source.to_string(),
            event_id: self.event_id,
            sensor_id: self.sensor_id,
            samples: self.samples.to_vec(),
            capture_time: self.capture_time,
            toa: self.toa,
        }
    }
}

// ---------------------------------------------------------------------------
// RawColumns – unvalidated column table as read from disk
// ---------------------------------------------------------------------------

/// Column table before schema validation. Every key is optional here so that
/// a missing key surfaces as a [`SchemaError`] rather than a decoder error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawColumns {
    pub waves: Option<Vec<Vec<f64>>>,
    pub event: Option<Vec<i64>>,
    pub sensor: Option<Vec<i64>>,
    pub time: Option<Vec<f64>>,
    pub parent_txt: Option<Vec<String>>,
    pub toa: Option<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Dataset – equal-length parallel columns
// ---------------------------------------------------------------------------

/// Schema-validated column table of AE waveforms.
///
/// Row `i` of every column describes the same record. All waveforms share one
/// length. Serializes to the canonical `{waves, event, sensor, time,
/// parent_txt[, toa]}` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    waves: Vec<Vec<f64>>,
    event: Vec<i64>,
    sensor: Vec<u32>,
    time: Vec<f64>,
    parent_txt: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    toa: Option<Vec<f64>>,
}

impl TryFrom<RawColumns> for Dataset {
    type Error = SchemaError;

    fn try_from(raw: RawColumns) -> Result<Self, SchemaError> {
        let waves = raw.waves.ok_or(SchemaError::MissingField("waves"))?;
        let event = raw.event.ok_or(SchemaError::MissingField("event"))?;
        let sensor = raw.sensor.ok_or(SchemaError::MissingField("sensor"))?;
        let parent_txt = raw.parent_txt.ok_or(SchemaError::MissingField("parent_txt"))?;
        let n = waves.len();

        // older LabVIEW exports carry no `time` column
        let time = raw.time.unwrap_or_else(|| vec![0.0; n]);

        check_len("event", n, event.len())?;
        check_len("sensor", n, sensor.len())?;
        check_len("time", n, time.len())?;
        check_len("parent_txt", n, parent_txt.len())?;
        if let Some(toa) = &raw.toa {
            check_len("toa", n, toa.len())?;
        }
        check_waves(&waves)?;

        let sensor = sensor
            .into_iter()
            .enumerate()
            .map(|(index, s)| match u32::try_from(s) {
                Ok(id) if id >= 1 => Ok(id),
                _ => Err(SchemaError::InvalidSensor { index, sensor: s }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dataset {
            waves,
            event,
            sensor,
            time,
            parent_txt,
            toa: raw.toa,
        })
    }
}

fn check_len(column: &'static str, expected: usize, found: usize) -> Result<(), SchemaError> {
    if expected != found {
        return Err(SchemaError::LengthMismatch {
            column,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_waves(waves: &[Vec<f64>]) -> Result<(), SchemaError> {
    let Some(expected) = waves.first().map(Vec::len) else {
        return Ok(());
    };
    match waves.iter().position(|w| w.len() != expected) {
        Some(index) => Err(SchemaError::RaggedWaves {
            index,
            expected,
            found: waves[index].len(),
        }),
        None => Ok(()),
    }
}

impl Dataset {
    /// Build a dataset from rows. The `toa` column is written when any record
    /// carries one; records without a value get the unresolved sentinel 0.0.
    pub fn from_records(records: Vec<WaveformRecord>) -> Result<Self, SchemaError> {
        let has_toa = records.iter().any(|r| r.toa.is_some());
        let n = records.len();
        let mut waves = Vec::with_capacity(n);
        let mut event = Vec::with_capacity(n);
        let mut sensor = Vec::with_capacity(n);
        let mut time = Vec::with_capacity(n);
        let mut parent_txt = Vec::with_capacity(n);
        let mut toa = Vec::with_capacity(if has_toa { n } else { 0 });
        for r in records {
            waves.push(r.samples);
            event.push(r.event_id);
            sensor.push(i64::from(r.sensor_id));
            time.push(r.capture_time);
            parent_txt.push(r.parent_source);
            toa.push(r.toa.unwrap_or(0.0));
        }
        let raw = RawColumns {
            waves: Some(waves),
            event: Some(event),
            sensor: Some(sensor),
            time: Some(time),
            parent_txt: Some(parent_txt),
            toa: has_toa.then_some(toa),
        };
        Dataset::try_from(raw)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Shared waveform length, 0 for an empty dataset.
    pub fn wave_length(&self) -> usize {
        self.waves.first().map_or(0, Vec::len)
    }

    pub fn waves(&self) -> &[Vec<f64>] {
        &self.waves
    }

    pub fn events(&self) -> &[i64] {
        &self.event
    }

    pub fn sensors(&self) -> &[u32] {
        &self.sensor
    }

    pub fn times(&self) -> &[f64] {
        &self.time
    }

    pub fn parent_sources(&self) -> &[String] {
        &self.parent_txt
    }

    pub fn toa(&self) -> Option<&[f64]> {
        self.toa.as_deref()
    }

    pub fn record(&self, index: usize) -> Option<RecordRef<'_>> {
        Some(RecordRef {
            index,
            parent_source: self.parent_txt.get(index)?,
            event_id: *self.event.get(index)?,
            sensor_id: *self.sensor.get(index)?,
            samples: self.waves.get(index)?,
            capture_time: *self.time.get(index)?,
            toa: self.toa.as_ref().and_then(|t| t.get(index).copied()),
        })
    }

    pub fn records(&self) -> impl Iterator<Item = RecordRef<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.record(i))
    }

    /// Distinct event ids in order of first appearance.
    pub fn event_ids(&self) -> Vec<i64> {
        let mut seen = HashSet::new();
        self.event
            .iter()
            .copied()
            .filter(|e| seen.insert(*e))
            .collect()
    }

    /// Distinct parent sources in order of first appearance.
    pub fn sources(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.parent_txt
            .iter()
            .map(String::as_str)
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Rows at `indices`, in the given order, with every column carried over.
    /// Out-of-range indices are skipped.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        let indices: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.len())
            .collect();
        Dataset {
            waves: indices.iter().map(|&i| self.waves[i].clone()).collect(),
            event: indices.iter().map(|&i| self.event[i]).collect(),
            sensor: indices.iter().map(|&i| self.sensor[i]).collect(),
            time: indices.iter().map(|&i| self.time[i]).collect(),
            parent_txt: indices.iter().map(|&i| self.parent_txt[i].clone()).collect(),
            toa: self
                .toa
                .as_ref()
                .map(|toa| indices.iter().map(|&i| toa[i]).collect()),
        }
    }

    /// Replace the `toa` column.
    pub fn with_toa(mut self, toa: Vec<f64>) -> Result<Dataset, SchemaError> {
        check_len("toa", self.len(), toa.len())?;
        self.toa = Some(toa);
        Ok(self)
    }

    /// Append `other` after `self`, keeping ingestion order.
    pub fn concat(mut self, other: Dataset) -> Result<Dataset, SchemaError> {
        if self.is_empty() {
            return Ok(other);
        }
        if other.is_empty() {
            return Ok(self);
        }
        if self.wave_length() != other.wave_length() {
            return Err(SchemaError::RaggedWaves {
                index: self.len(),
                expected: self.wave_length(),
                found: other.wave_length(),
            });
        }
        self.toa = match (self.toa, other.toa) {
            (Some(mut a), Some(b)) => {
                a.extend(b);
                Some(a)
            }
            (None, None) => None,
            _ => return Err(SchemaError::MissingField("toa")),
        };
        self.waves.extend(other.waves);
        self.event.extend(other.event);
        self.sensor.extend(other.sensor);
        self.time.extend(other.time);
        self.parent_txt.extend(other.parent_txt);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(n: usize) -> RawColumns {
        RawColumns {
            waves: Some(vec![vec![0.0; 4]; n]),
            event: Some((1..=n as i64).collect()),
            sensor: Some(vec![1; n]),
            time: Some(vec![0.5; n]),
            parent_txt: Some(vec!["a.txt".into(); n]),
            toa: None,
        }
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut columns = raw(2);
        columns.sensor = None;
        assert_eq!(
            Dataset::try_from(columns),
            Err(SchemaError::MissingField("sensor"))
        );
    }

    #[test]
    fn missing_time_defaults_to_zero() {
        let mut columns = raw(3);
        columns.time = None;
        let ds = Dataset::try_from(columns).unwrap();
        assert_eq!(ds.times(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn column_length_mismatch_is_rejected() {
        let mut columns = raw(3);
        columns.event = Some(vec![1, 2]);
        assert_eq!(
            Dataset::try_from(columns),
            Err(SchemaError::LengthMismatch {
                column: "event",
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn ragged_waves_are_rejected() {
        let mut columns = raw(3);
        columns.waves = Some(vec![vec![0.0; 4], vec![0.0; 4], vec![0.0; 3]]);
        assert_eq!(
            Dataset::try_from(columns),
            Err(SchemaError::RaggedWaves {
                index: 2,
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn zero_sensor_is_rejected() {
        let mut columns = raw(2);
        columns.sensor = Some(vec![1, 0]);
        assert_eq!(
            Dataset::try_from(columns),
            Err(SchemaError::InvalidSensor { index: 1, sensor: 0 })
        );
    }

    #[test]
    fn records_round_trip_through_columns() {
        let records = vec![
            WaveformRecord::new("a.txt", 7, 1, vec![1.0, 2.0]).with_time(3.5),
            WaveformRecord::new("a.txt", 7, 2, vec![3.0, 4.0]).with_time(3.5),
        ];
        let ds = Dataset::from_records(records.clone()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.wave_length(), 2);
        assert!(ds.toa().is_none());
        let back: Vec<WaveformRecord> = ds.records().map(|r| r.to_record()).collect();
        assert_eq!(back, records);
    }

    #[test]
    fn partial_toa_fills_sentinel() {
        let records = vec![
            WaveformRecord::new("a.txt", 1, 1, vec![0.0]).with_toa(4.2),
            WaveformRecord::new("a.txt", 1, 2, vec![0.0]),
        ];
        let ds = Dataset::from_records(records).unwrap();
        assert_eq!(ds.toa(), Some(&[4.2, 0.0][..]));
    }

    #[test]
    fn distinct_ids_keep_first_appearance() {
        let mut columns = raw(4);
        columns.event = Some(vec![5, 3, 5, 3]);
        columns.parent_txt = Some(vec!["b".into(), "a".into(), "b".into(), "a".into()]);
        let ds = Dataset::try_from(columns).unwrap();
        assert_eq!(ds.event_ids(), vec![5, 3]);
        assert_eq!(ds.sources(), vec!["b", "a"]);
    }

    #[test]
    fn select_carries_every_column() {
        let ds = Dataset::try_from(raw(4))
            .unwrap()
            .with_toa(vec![0.0, 2.0, 3.0, 4.0])
            .unwrap();
        let sub = ds.select(&[3, 1, 10]);
        assert_eq!(sub.events(), &[4, 2]);
        assert_eq!(sub.toa(), Some(&[4.0, 2.0][..]));
        assert_eq!(sub.parent_sources().len(), 2);
    }

    #[test]
    fn with_toa_checks_length() {
        let ds = Dataset::try_from(raw(2)).unwrap();
        assert!(ds.with_toa(vec![1.0]).is_err());
    }

    #[test]
    fn concat_requires_matching_waves_and_toa() {
        let a = Dataset::try_from(raw(2)).unwrap();
        let b = Dataset::try_from(raw(3)).unwrap();
        let merged = a.clone().concat(b).unwrap();
        assert_eq!(merged.len(), 5);
        assert_eq!(merged.events(), &[1, 2, 1, 2, 3]);

        let with_toa = Dataset::try_from(raw(1)).unwrap().with_toa(vec![3.0]).unwrap();
        assert_eq!(
            a.clone().concat(with_toa),
            Err(SchemaError::MissingField("toa"))
        );

        let mut short = raw(1);
        short.waves = Some(vec![vec![0.0; 2]]);
        assert!(a.concat(Dataset::try_from(short).unwrap()).is_err());
    }

    #[test]
    fn serializes_canonical_keys() {
        let ds = Dataset::try_from(raw(1)).unwrap();
        let value = serde_json::to_value(&ds).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 5);
        assert!(value.get("toa").is_none());
        assert_eq!(value["parent_txt"][0], "a.txt");
        assert_eq!(value["sensor"][0], 1);
    }
}
