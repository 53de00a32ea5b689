//! Instrument text captures → channel-major waveforms.

pub mod digital_wave;
pub mod labview;

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::axis::AxisConfig;
use crate::data::flatten::ChannelMajor;
use crate::error::{ParseError, PipelineResult};

/// Acquisition software that wrote a capture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    /// Digital Wave DAQ export: header line, one column per channel.
    #[default]
    DigitalWave,
    /// LabVIEW scope export with a `Waveform Size` preamble and two channels.
    Labview,
}

impl Instrument {
    /// Time axis the instrument records on.
    pub fn axis(self) -> AxisConfig {
        match self {
            Instrument::DigitalWave => AxisConfig::default(),
            Instrument::Labview => AxisConfig::labview(),
        }
    }
}

/// One parsed capture batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Hz, when the file states it.
    pub sampling_frequency_hz: Option<f64>,
    /// Samples per waveform.
    pub sample_length: usize,
    pub signals: ChannelMajor,
}

impl Capture {
    pub fn channel_count(&self) -> usize {
        self.signals.channel_count()
    }

    pub fn event_count(&self) -> usize {
        self.signals.event_count()
    }
}

/// Read a capture file, plus an optional Digital Wave time file.
pub fn read_capture(
    instrument: Instrument,
    path: &Path,
    time_file: Option<&Path>,
) -> PipelineResult<Capture> {
    let source = path.display().to_string();
    let text = std::fs::read_to_string(path)?;
    let mut capture = match instrument {
        Instrument::DigitalWave => digital_wave::parse_capture(&text, &source)?,
        Instrument::Labview => labview::parse_acquisition(&text, &source)?,
    };

    if let Some(time_path) = time_file {
        let times = digital_wave::parse_time_file(&std::fs::read_to_string(time_path)?)?;
        if times.len() != capture.event_count() {
            return Err(ParseError::TimeCount {
                times: times.len(),
                events: capture.event_count(),
            }
            .into());
        }
        capture.signals.times = times;
    }

    log::info!("ae file loaded : {source}");
    log::info!("num channels  : {:>5}", capture.channel_count());
    log::info!("num signals   : {:>5}", capture.event_count());
    if let Some(fs) = capture.sampling_frequency_hz {
        log::info!("sampling freq : {fs:>5}");
    }
    log::info!("signal length : {:>5}", capture.sample_length);
    Ok(capture)
}

/// Parse one whitespace-separated numeric token.
pub(crate) fn number<T: std::str::FromStr>(token: &str, line: usize) -> Result<T, ParseError> {
    token.parse::<T>().map_err(|_| ParseError::NotANumber {
        line,
        token: token.to_string(),
    })
}

/// Split per-channel sample columns into waveforms of `block` samples.
pub(crate) fn split_blocks(
    columns: Vec<Vec<f64>>,
    block: usize,
) -> Result<Vec<Vec<Vec<f64>>>, ParseError> {
    let rows = columns.first().map_or(0, Vec::len);
    if block == 0 || rows % block != 0 {
        return Err(ParseError::TruncatedBlock { rows, block });
    }
    Ok(columns
        .into_iter()
        .map(|col| col.chunks(block).map(<[f64]>::to_vec).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_split_per_channel() {
        let columns = vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]];
        let blocks = split_blocks(columns, 2).unwrap();
        assert_eq!(blocks[0], vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(blocks[1][1], vec![7.0, 8.0]);
    }

    #[test]
    fn instrument_axis_presets() {
        assert_eq!(Instrument::DigitalWave.axis().samples, 1024);
        assert_eq!(Instrument::Labview.axis().samples, 50_000);
        assert_eq!(Instrument::Labview.axis().round_decimals, Some(3));
    }

    #[test]
    fn partial_block_is_rejected() {
        assert_eq!(
            split_blocks(vec![vec![0.0; 5]], 2),
            Err(ParseError::TruncatedBlock { rows: 5, block: 2 })
        );
    }
}
