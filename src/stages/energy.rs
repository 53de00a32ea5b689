use crate::config::{FilterSensor, PipelineConfig};
use crate::data::correlate::{channel_pairs, PairingStrategy};
use crate::data::model::Dataset;
use crate::error::PairingError;

/// Sum of squared samples.
pub fn signal_energy(samples: &[f64]) -> f64 {
    samples.iter().map(|x| x * x).sum()
}

// ---------------------------------------------------------------------------
// Energy filter
// ---------------------------------------------------------------------------

/// Keeps two-channel events whose log10 energy exceeds a threshold.
#[derive(Debug, Clone)]
pub struct EnergyFilter<F = fn(&[f64]) -> f64> {
    threshold: f64,
    filter_sensor: FilterSensor,
    pairing: PairingStrategy,
    energy: F,
}

impl EnergyFilter {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            threshold: config.energy_threshold,
            filter_sensor: config.filter_sensor,
            pairing: config.pairing,
            energy: signal_energy,
        }
    }
}

impl<F> EnergyFilter<F>
where
    F: Fn(&[f64]) -> f64,
{
    /// Swap the energy measure.
    pub fn with_energy<G>(self, energy: G) -> EnergyFilter<G>
    where
        G: Fn(&[f64]) -> f64,
    {
        EnergyFilter {
            threshold: self.threshold,
            filter_sensor: self.filter_sensor,
            pairing: self.pairing,
            energy,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Energy that decides the fate of an event with the given channels.
    pub fn event_energy(&self, channel_1: &[f64], channel_2: &[f64]) -> f64 {
        match self.filter_sensor {
            FilterSensor::Average => ((self.energy)(channel_1) + (self.energy)(channel_2)) / 2.0,
        }
    }

    /// Strictly above the threshold on a log10 scale. Zero or NaN energy
    /// never passes.
    pub fn passes(&self, energy: f64) -> bool {
        energy.log10() > self.threshold
    }

    /// Dataset holding both records of every passing event, in input order.
    /// Field values, `toa` included, are copied unchanged.
    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset, PairingError> {
        let pairs = channel_pairs(dataset, self.pairing)?;
        let waves = dataset.waves();

        let mut keep = vec![false; dataset.len()];
        let mut kept_events = 0usize;
        for pair in &pairs {
            let energy = self.event_energy(&waves[pair.first], &waves[pair.second]);
            let passed = self.passes(energy);
            log::debug!(
                "event : {:>5}  energy : {energy:e}  {}",
                pair.event_id,
                if passed { "KEEP" } else { "DROP" }
            );
            if passed {
                keep[pair.first] = true;
                keep[pair.second] = true;
                kept_events += 1;
            }
        }

        let rows: Vec<usize> = (0..dataset.len()).filter(|&i| keep[i]).collect();
        log::info!(
            "energy filter (log10 > {:?}) kept {} of {} events",
            self.threshold,
            kept_events,
            pairs.len()
        );
        Ok(dataset.select(&rows))
    }
}
