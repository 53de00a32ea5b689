use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::axis::AxisConfig;
use crate::data::correlate::PairingStrategy;
use crate::error::PipelineResult;

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Which channel energy decides whether an event is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum FilterSensor {
    /// Mean energy of both channels.
    #[default]
    #[serde(rename = "avg")]
    #[value(name = "avg")]
    Average,
}

/// Immutable settings handed to every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub axis: AxisConfig,
    /// Snapped arrival times below this (µs) are stored as the 0.0 sentinel.
    pub toa_floor: f64,
    /// log10 energy an event must exceed to be kept.
    pub energy_threshold: f64,
    pub filter_sensor: FilterSensor,
    pub pairing: PairingStrategy,
    /// Channels per event expected by the visual review.
    pub channel_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            axis: AxisConfig::default(),
            toa_floor: 2.0,
            energy_threshold: 1.0,
            filter_sensor: FilterSensor::Average,
            pairing: PairingStrategy::Auto,
            channel_count: 2,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config; absent keys keep their defaults.
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Config file when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    /// Replace every setting that `overrides` carries.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(pairing) = overrides.pairing {
            self.pairing = pairing;
        }
        if let Some(threshold) = overrides.energy_threshold {
            self.energy_threshold = threshold;
        }
        if let Some(sensor) = overrides.filter_sensor {
            self.filter_sensor = sensor;
        }
        if let Some(axis) = overrides.axis {
            self.axis = axis;
        }
        self
    }
}

/// Command-line settings; each one that is set wins over the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub pairing: Option<PairingStrategy>,
    pub energy_threshold: Option<f64>,
    pub filter_sensor: Option<FilterSensor>,
    pub axis: Option<AxisConfig>,
}
