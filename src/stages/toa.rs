use std::fmt;

use crate::config::PipelineConfig;
use crate::data::axis::TimeAxis;
use crate::data::correlate::{channel_pairs, PairingStrategy};
use crate::data::model::Dataset;
use crate::error::{OracleError, PipelineResult};

// ---------------------------------------------------------------------------
// Selection oracle
// ---------------------------------------------------------------------------

/// One channel waveform awaiting an arrival-time pick.
#[derive(Debug, Clone, Copy)]
pub struct SelectionRequest<'a> {
    pub event_id: i64,
    pub parent_source: &'a str,
    /// 1-based position of the channel within its event.
    pub channel: u32,
    pub samples: &'a [f64],
    pub axis: &'a TimeAxis,
}

/// Provider of arrival-time picks.
///
/// An implementation may offer and withdraw candidates as often as it likes;
/// only the value it finally returns is committed.
pub trait SelectionOracle {
    fn select(&mut self, request: &SelectionRequest<'_>) -> Result<f64, OracleError>;
}

impl<F> SelectionOracle for F
where
    F: FnMut(&SelectionRequest<'_>) -> Result<f64, OracleError>,
{
    fn select(&mut self, request: &SelectionRequest<'_>) -> Result<f64, OracleError> {
        self(request)
    }
}

// ---------------------------------------------------------------------------
// TOA engine
// ---------------------------------------------------------------------------

/// Stored arrival time for a snapped pick: picks below `floor` are too close
/// to the record start to trust and become the 0.0 sentinel.
pub fn floor_toa(snapped: f64, floor: f64) -> f64 {
    if snapped < floor {
        0.0
    } else {
        snapped
    }
}

/// One committed pick, as written to the debug log.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ChannelPick {
    event_id: i64,
    channel: u32,
    picked: f64,
    snapped: f64,
    toa: f64,
}

impl fmt::Display for ChannelPick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "event : {:>5}  channel : {:>5}  picked : {}  snapped : {}  toa : {}",
            self.event_id, self.channel, self.picked, self.snapped, self.toa
        )
    }
}

/// Walks every two-channel event once and records a snapped arrival time
/// per channel.
#[derive(Debug, Clone)]
pub struct ToaEngine {
    axis: TimeAxis,
    floor: f64,
    pairing: PairingStrategy,
}

impl ToaEngine {
    pub fn new(axis: TimeAxis, floor: f64, pairing: PairingStrategy) -> Self {
        Self {
            axis,
            floor,
            pairing,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            TimeAxis::from_config(&config.axis),
            config.toa_floor,
            config.pairing,
        )
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    /// Assign a TOA to every record of `dataset`.
    ///
    /// All events are paired before the oracle is consulted, so an incomplete
    /// pair fails the stage without asking for a single pick. Any error drops
    /// the dataset: no partial TOA column is returned.
    pub fn run<O>(&self, dataset: Dataset, oracle: &mut O) -> PipelineResult<Dataset>
    where
        O: SelectionOracle + ?Sized,
    {
        let pairs = channel_pairs(&dataset, self.pairing)?;
        if !dataset.is_empty() && dataset.wave_length() != self.axis.len() {
            log::warn!(
                "waveforms hold {} samples but the time axis has {} points",
                dataset.wave_length(),
                self.axis.len()
            );
        }

        let mut toa = vec![0.0; dataset.len()];
        let mut unresolved = 0usize;

        for pair in &pairs {
            for (position, &row) in pair.indices().iter().enumerate() {
                let channel = position as u32 + 1;
                let request = SelectionRequest {
                    event_id: pair.event_id,
                    parent_source: &pair.parent_source,
                    channel,
                    samples: &dataset.waves()[row],
                    axis: &self.axis,
                };
                let picked = oracle.select(&request)?;
                if !picked.is_finite() {
                    return Err(OracleError::NonFinite {
                        event: pair.event_id,
                        channel,
                        value: picked,
                    }
                    .into());
                }
                let snapped = self.axis.snap(picked);
                toa[row] = floor_toa(snapped, self.floor);
                if toa[row] == 0.0 {
                    unresolved += 1;
                }
                let pick = ChannelPick {
                    event_id: pair.event_id,
                    channel,
                    picked,
                    snapped,
                    toa: toa[row],
                };
                log::debug!("{pick}");
            }
        }

        log::info!(
            "assigned TOA for {} events ({} unresolved channels)",
            pairs.len(),
            unresolved
        );
        Ok(dataset.with_toa(toa)?)
    }
}
