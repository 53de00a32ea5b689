use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AxisConfig – how a capture's time axis is discretised
// ---------------------------------------------------------------------------

/// Sample count and sampling period of one waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    /// Number of samples per waveform.
    pub samples: usize,
    /// Sampling period in seconds.
    pub sample_period_s: f64,
    /// Round every axis value to this many decimals (µs).
    pub round_decimals: Option<i32>,
}

impl Default for AxisConfig {
    /// Digital Wave DAQ: 1024 samples at 10 MHz.
    fn default() -> Self {
        Self {
            samples: 1024,
            sample_period_s: 1e-7,
            round_decimals: None,
        }
    }
}

impl AxisConfig {
    /// LabVIEW scope capture: 10 divisions of 10 µs over 50 000 samples (2 ns).
    pub fn labview() -> Self {
        let total_time_s = 10e-6 * 10.0;
        let samples = 50_000;
        Self {
            samples,
            sample_period_s: total_time_s / samples as f64,
            round_decimals: Some(3),
        }
    }

    /// Axis length in microseconds.
    pub fn duration_us(&self) -> f64 {
        self.samples as f64 * self.sample_period_s * 1e6
    }
}

// ---------------------------------------------------------------------------
// TimeAxis – immutable uniformly spaced sample times (µs)
// ---------------------------------------------------------------------------

/// Ascending, uniformly spaced sample times starting at zero. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    values: Vec<f64>,
}

impl TimeAxis {
    /// `count` evenly spaced points over `[0, duration]`, both ends included.
    /// A count below two yields the single point `0.0`.
    pub fn linspace(duration: f64, count: usize) -> Self {
        if count < 2 {
            return Self { values: vec![0.0] };
        }
        let last = (count - 1) as f64;
        let mut values: Vec<f64> = (0..count)
            .map(|i| duration * i as f64 / last)
            .collect();
        // pin the end point so it does not drift by rounding
        values[count - 1] = duration;
        Self { values }
    }

    pub fn from_config(config: &AxisConfig) -> Self {
        let mut axis = Self::linspace(config.duration_us(), config.samples);
        if let Some(decimals) = config.round_decimals {
            let scale = 10f64.powi(decimals);
            for v in &mut axis.values {
                *v = (*v * scale).round() / scale;
            }
        }
        axis
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Closest axis value to `query`.
    pub fn snap(&self, query: f64) -> f64 {
        nearest_sample(&self.values, query).unwrap_or(self.values[0])
    }
}

/// Element of `axis` minimising `|axis[i] - query|`. Ties keep the lowest index.
/// A NaN query compares false everywhere and therefore returns the first element.
pub fn nearest_sample(axis: &[f64], query: f64) -> Option<f64> {
    let (&first, rest) = axis.split_first()?;
    let mut best = first;
    let mut best_dist = (first - query).abs();
    for &v in rest {
        let dist = (v - query).abs();
        if dist < best_dist {
            best = v;
            best_dist = dist;
        }
    }
    Some(best)
}
