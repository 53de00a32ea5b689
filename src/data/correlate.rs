use std::collections::HashMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::model::Dataset;
use crate::error::PairingError;

// ---------------------------------------------------------------------------
// Pairing strategy
// ---------------------------------------------------------------------------

/// How records are keyed into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PairingStrategy {
    /// `Multi` when the dataset mixes capture batches, `Single` otherwise.
    #[default]
    Auto,
    /// Key on the event id alone.
    Single,
    /// Key on (event id, parent source); batches may reuse event numbers.
    Multi,
}

impl PairingStrategy {
    /// Resolve `Auto` against a dataset.
    pub fn resolve(self, dataset: &Dataset) -> PairingStrategy {
        match self {
            PairingStrategy::Auto if dataset.sources().len() > 1 => PairingStrategy::Multi,
            PairingStrategy::Auto => PairingStrategy::Single,
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Event groups
// ---------------------------------------------------------------------------

/// All records of one event, in ingestion order (position 0 is channel 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventGroup {
    pub event_id: i64,
    /// Source of the first record in the group.
    pub parent_source: String,
    /// Dataset row indices, ascending.
    pub indices: Vec<usize>,
}

/// The two records of a two-channel event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPair {
    pub event_id: i64,
    pub parent_source: String,
    /// Row of channel 1.
    pub first: usize,
    /// Row of channel 2.
    pub second: usize,
}

impl ChannelPair {
    pub fn indices(&self) -> [usize; 2] {
        [self.first, self.second]
    }
}

/// Group rows by event key without checking the channel count. Groups come
/// out in order of the first appearance of their key.
pub fn group_events(dataset: &Dataset, strategy: PairingStrategy) -> Vec<EventGroup> {
    let by_source = strategy.resolve(dataset) == PairingStrategy::Multi;
    let mut lookup: HashMap<(i64, Option<&str>), usize> = HashMap::new();
    let mut groups: Vec<EventGroup> = Vec::new();

    for record in dataset.records() {
        let key = (
            record.event_id,
            by_source.then_some(record.parent_source),
        );
        let slot = *lookup.entry(key).or_insert_with(|| {
            groups.push(EventGroup {
                event_id: record.event_id,
                parent_source: record.parent_source.to_string(),
                indices: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].indices.push(record.index);
    }
    groups
}

/// Group rows by event key and require `channels` distinct sensors per event.
pub fn correlate(
    dataset: &Dataset,
    strategy: PairingStrategy,
    channels: usize,
) -> Result<Vec<EventGroup>, PairingError> {
    let groups = group_events(dataset, strategy);
    let sensors = dataset.sensors();

    for group in &groups {
        if group.indices.len() != channels {
            return Err(PairingError::ChannelCount {
                event: group.event_id,
                parent: group.parent_source.clone(),
                expected: channels,
                found: group.indices.len(),
            });
        }
        for (pos, &i) in group.indices.iter().enumerate() {
            if group.indices[..pos].iter().any(|&j| sensors[j] == sensors[i]) {
                return Err(PairingError::DuplicateSensor {
                    event: group.event_id,
                    parent: group.parent_source.clone(),
                    sensor: sensors[i],
                });
            }
        }
    }
    Ok(groups)
}

/// Two-channel pairing used by the TOA and energy stages.
pub fn channel_pairs(
    dataset: &Dataset,
    strategy: PairingStrategy,
) -> Result<Vec<ChannelPair>, PairingError> {
    Ok(correlate(dataset, strategy, 2)?
        .into_iter()
        .map(|g| ChannelPair {
            event_id: g.event_id,
            parent_source: g.parent_source,
            first: g.indices[0],
            second: g.indices[1],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::WaveformRecord;

    fn dataset(rows: &[(&str, i64, u32)]) -> Dataset {
        Dataset::from_records(
            rows.iter()
                .map(|&(src, ev, s)| WaveformRecord::new(src, ev, s, vec![0.0; 3]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn channel_major_rows_pair_by_ingestion_order() {
        let ds = dataset(&[("a", 1, 1), ("a", 2, 1), ("a", 1, 2), ("a", 2, 2)]);
        let pairs = channel_pairs(&ds, PairingStrategy::Single).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].event_id, pairs[0].indices()), (1, [0, 2]));
        assert_eq!((pairs[1].event_id, pairs[1].indices()), (2, [1, 3]));
    }

    #[test]
    fn lower_index_is_channel_one_regardless_of_sensor_label() {
        let ds = dataset(&[("a", 4, 2), ("a", 4, 1)]);
        let pairs = channel_pairs(&ds, PairingStrategy::Single).unwrap();
        assert_eq!(pairs[0].first, 0);
        assert_eq!(pairs[0].second, 1);
    }

    #[test]
    fn single_source_rejects_reused_event_numbers() {
        let ds = dataset(&[("a", 1, 1), ("a", 1, 2), ("b", 1, 1), ("b", 1, 2)]);
        assert_eq!(
            channel_pairs(&ds, PairingStrategy::Single),
            Err(PairingError::ChannelCount {
                event: 1,
                parent: "a".into(),
                expected: 2,
                found: 4
            })
        );
    }

    #[test]
    fn multi_source_keys_on_parent() {
        let ds = dataset(&[("a", 1, 1), ("b", 1, 1), ("a", 1, 2), ("b", 1, 2)]);
        let pairs = channel_pairs(&ds, PairingStrategy::Multi).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].parent_source, "a");
        assert_eq!(pairs[0].indices(), [0, 2]);
        assert_eq!(pairs[1].parent_source, "b");
        assert_eq!(pairs[1].indices(), [1, 3]);
    }

    #[test]
    fn auto_resolves_by_source_count() {
        let single = dataset(&[("a", 1, 1), ("a", 1, 2)]);
        let multi = dataset(&[("a", 1, 1), ("a", 1, 2), ("b", 1, 1), ("b", 1, 2)]);
        assert_eq!(PairingStrategy::Auto.resolve(&single), PairingStrategy::Single);
        assert_eq!(PairingStrategy::Auto.resolve(&multi), PairingStrategy::Multi);
        assert_eq!(channel_pairs(&multi, PairingStrategy::Auto).unwrap().len(), 2);
    }

    #[test]
    fn incomplete_pair_is_an_error() {
        let ds = dataset(&[("a", 1, 1), ("a", 1, 2), ("a", 2, 1)]);
        assert_eq!(
            channel_pairs(&ds, PairingStrategy::Single),
            Err(PairingError::ChannelCount {
                event: 2,
                parent: "a".into(),
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn duplicate_sensor_is_an_error() {
        let ds = dataset(&[("a", 1, 1), ("a", 1, 1)]);
        assert!(matches!(
            channel_pairs(&ds, PairingStrategy::Single),
            Err(PairingError::DuplicateSensor { sensor: 1, .. })
        ));
    }

    #[test]
    fn groups_follow_requested_channel_count() {
        let ds = dataset(&[("a", 1, 1), ("a", 1, 2), ("a", 1, 3)]);
        let groups = correlate(&ds, PairingStrategy::Single, 3).unwrap();
        assert_eq!(groups[0].indices, vec![0, 1, 2]);
        assert!(correlate(&ds, PairingStrategy::Single, 2).is_err());
    }

    #[test]
    fn empty_dataset_has_no_groups() {
        let ds = Dataset::default();
        assert!(channel_pairs(&ds, PairingStrategy::Auto).unwrap().is_empty());
    }
}
