use super::model::{Dataset, RawColumns};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// ChannelMajor – waveforms as the instrument hands them over
// ---------------------------------------------------------------------------

/// Waveforms of one capture batch grouped per channel: `channels[k][n]` is
/// channel `k + 1` of event `n`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelMajor {
    /// Provenance of the whole batch.
    pub source: String,
    pub event_ids: Vec<i64>,
    /// Capture time per event.
    pub times: Vec<f64>,
    pub channels: Vec<Vec<Vec<f64>>>,
}

impl ChannelMajor {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn event_count(&self) -> usize {
        self.event_ids.len()
    }
}

/// Flatten channel-major waveforms into the canonical dataset.
///
/// Rows come out channel-major: every event of channel 1, then every event of
/// channel 2, and so on, so row `k * N + n` is channel `k + 1` of event `n`.
/// Pairing by ingestion order relies on this layout.
pub fn flatten(input: ChannelMajor) -> Result<Dataset, SchemaError> {
    let n_events = input.event_count();
    if input.times.len() != n_events {
        return Err(SchemaError::LengthMismatch {
            column: "time",
            expected: n_events,
            found: input.times.len(),
        });
    }
    if let Some((k, ch)) = input
        .channels
        .iter()
        .enumerate()
        .find(|(_, ch)| ch.len() != n_events)
    {
        return Err(SchemaError::RaggedChannels {
            channel: k + 1,
            expected: n_events,
            found: ch.len(),
        });
    }

    let total = input.channel_count() * n_events;
    let mut waves = Vec::with_capacity(total);
    let mut event = Vec::with_capacity(total);
    let mut sensor = Vec::with_capacity(total);
    let mut time = Vec::with_capacity(total);

    for (k, channel) in input.channels.into_iter().enumerate() {
        waves.extend(channel);
        event.extend_from_slice(&input.event_ids);
        time.extend_from_slice(&input.times);
        sensor.extend(std::iter::repeat(k as i64 + 1).take(n_events));
    }

    Dataset::try_from(RawColumns {
        parent_txt: Some(vec![input.source; total]),
        waves: Some(waves),
        event: Some(event),
        sensor: Some(sensor),
        time: Some(time),
        toa: None,
    })
}
