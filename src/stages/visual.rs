use crate::config::PipelineConfig;
use crate::data::correlate::{correlate, PairingStrategy};
use crate::data::model::Dataset;
use crate::error::{OracleError, PipelineResult};

// ---------------------------------------------------------------------------
// Decision oracle
// ---------------------------------------------------------------------------

/// Every channel waveform of one event, in channel order.
#[derive(Debug, Clone)]
pub struct EventView<'a> {
    pub event_id: i64,
    pub parent_source: &'a str,
    pub capture_time: f64,
    pub channels: Vec<&'a [f64]>,
}

/// Keep/discard verdicts for whole events.
pub trait DecisionOracle {
    /// `true` keeps the event, `false` files it as noise.
    fn decide(&mut self, event: &EventView<'_>) -> Result<bool, OracleError>;
}

impl<F> DecisionOracle for F
where
    F: FnMut(&EventView<'_>) -> Result<bool, OracleError>,
{
    fn decide(&mut self, event: &EventView<'_>) -> Result<bool, OracleError> {
        self(event)
    }
}

// ---------------------------------------------------------------------------
// Visual filter
// ---------------------------------------------------------------------------

/// Kept and noise datasets; every input event lands in exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub kept: Dataset,
    pub noise: Dataset,
}

/// Routes each event, all channels together, to `kept` or `noise`.
#[derive(Debug, Clone)]
pub struct VisualFilter {
    pairing: PairingStrategy,
    channel_count: usize,
}

impl VisualFilter {
    pub fn new(pairing: PairingStrategy, channel_count: usize) -> Self {
        Self {
            pairing,
            channel_count,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.pairing, config.channel_count)
    }

    pub fn apply<O>(&self, dataset: &Dataset, oracle: &mut O) -> PipelineResult<Partition>
    where
        O: DecisionOracle + ?Sized,
    {
        let groups = correlate(dataset, self.pairing, self.channel_count)?;
        let mut keep = vec![false; dataset.len()];
        let mut kept_events = Vec::new();
        let mut noise_events = Vec::new();

        for group in &groups {
            let view = EventView {
                event_id: group.event_id,
                parent_source: &group.parent_source,
                capture_time: dataset.times()[group.indices[0]],
                channels: group
                    .indices
                    .iter()
                    .map(|&i| dataset.waves()[i].as_slice())
                    .collect(),
            };
            if oracle.decide(&view)? {
                for &i in &group.indices {
                    keep[i] = true;
                }
                log::debug!("event : {:>5}  FILTER", group.event_id);
                kept_events.push(group.event_id);
            } else {
                log::debug!("event : {:>5}  NOISE", group.event_id);
                noise_events.push(group.event_id);
            }
        }

        let (kept_rows, noise_rows): (Vec<usize>, Vec<usize>) =
            (0..dataset.len()).partition(|&i| keep[i]);

        log::info!("num noise events : {:>5}", noise_events.len());
        log::info!("num filter events : {:>5}", kept_events.len());
        log::info!("noise events: {}", join_ids(&noise_events));
        log::info!("filter events: {}", join_ids(&kept_events));

        Ok(Partition {
            kept: dataset.select(&kept_rows),
            noise: dataset.select(&noise_rows),
        })
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::data::flatten::{flatten, ChannelMajor};
    use crate::error::{PairingError, PipelineError};
    use crate::oracle::scripted::ScriptedReviewer;

    fn capture(channels: usize, events: usize) -> Dataset {
        flatten(ChannelMajor {
            source: "run.txt".into(),
            event_ids: (1..=events as i64).collect(),
            times: vec![0.0; events],
            channels: (0..channels)
                .map(|k| (0..events).map(|n| vec![(10 * k + n) as f64; 8]).collect())
                .collect(),
        })
        .unwrap()
    }

    fn event_set(ds: &Dataset) -> BTreeSet<i64> {
        ds.events().iter().copied().collect()
    }

    #[test]
    fn keep_keep_discard() {
        let ds = capture(2, 3);
        let mut oracle = ScriptedReviewer::new([true, true, false]);
        let out = VisualFilter::new(PairingStrategy::Single, 2)
            .apply(&ds, &mut oracle)
            .unwrap();

        assert_eq!(out.kept.events(), &[1, 2, 1, 2]);
        assert_eq!(out.kept.sensors(), &[1, 1, 2, 2]);
        assert_eq!(out.noise.events(), &[3, 3]);
        assert_eq!(out.noise.sensors(), &[1, 2]);
        assert_eq!(out.noise.waves()[1], ds.waves()[5]);
    }

    #[test]
    fn partition_is_complete_and_disjoint() {
        let ds = capture(2, 6);
        let mut oracle = ScriptedReviewer::new([false, true, true, false, false, true]);
        let out = VisualFilter::new(PairingStrategy::Auto, 2)
            .apply(&ds, &mut oracle)
            .unwrap();

        let kept = event_set(&out.kept);
        let noise = event_set(&out.noise);
        assert!(kept.is_disjoint(&noise));
        let all: BTreeSet<i64> = kept.union(&noise).copied().collect();
        assert_eq!(all, event_set(&ds));
        assert_eq!(out.kept.len() + out.noise.len(), ds.len());
    }

    #[test]
    fn oracle_sees_every_channel_of_the_event() {
        let ds = capture(3, 2);
        let mut seen = Vec::new();
        let mut oracle = |view: &EventView<'_>| -> Result<bool, OracleError> {
            seen.push((view.event_id, view.channels.iter().map(|w| w[0]).collect::<Vec<_>>()));
            Ok(true)
        };
        let out = VisualFilter::new(PairingStrategy::Single, 3)
            .apply(&ds, &mut oracle)
            .unwrap();
        assert_eq!(
            seen,
            vec![(1, vec![0.0, 10.0, 20.0]), (2, vec![1.0, 11.0, 21.0])]
        );
        assert!(out.noise.is_empty());
        assert_eq!(out.kept, ds);
    }

    #[test]
    fn channel_count_mismatch_is_an_error() {
        let ds = capture(2, 2);
        let mut oracle = ScriptedReviewer::new([true, true]);
        let err = VisualFilter::new(PairingStrategy::Single, 3)
            .apply(&ds, &mut oracle)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Pairing(PairingError::ChannelCount { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn oracle_failure_aborts_the_stage() {
        let ds = capture(2, 3);
        let mut oracle = ScriptedReviewer::new([true]);
        let err = VisualFilter::new(PairingStrategy::Single, 2)
            .apply(&ds, &mut oracle)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Oracle(OracleError::Closed { event: 2 })));
    }
}
