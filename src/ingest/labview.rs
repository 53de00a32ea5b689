use super::{number, split_blocks, Capture};
use crate::data::flatten::ChannelMajor;
use crate::error::ParseError;

const SIZE_MARKER: &str = "Waveform Size";

/// Parse a LabVIEW two-channel acquisition export.
///
/// Preamble lines are skipped until one containing both `Ch1` and `Ch2`;
/// somewhere before it a `Waveform Size: N` line gives the block length.
/// Events are numbered from 0 and carry no capture time.
pub fn parse_acquisition(text: &str, source: &str) -> Result<Capture, ParseError> {
    let mut waveform_size = None;
    let mut data_start = None;

    for (idx, line) in text.lines().enumerate() {
        if line.contains(SIZE_MARKER) {
            waveform_size = Some(parse_size(line)?);
        } else if line.contains("Ch1") && line.contains("Ch2") {
            data_start = Some(idx + 1);
            break;
        }
    }
    let data_start = data_start.ok_or(ParseError::MissingMarker("Ch1/Ch2 header"))?;
    let sample_length = waveform_size.ok_or(ParseError::MissingMarker(SIZE_MARKER))?;

    let mut columns = vec![Vec::new(), Vec::new()];
    for (idx, line) in text.lines().enumerate().skip(data_start) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < 2 {
            return Err(ParseError::ColumnCount {
                line: idx + 1,
                expected: 2,
                found: tokens.len(),
            });
        }
        columns[0].push(number(tokens[0], idx + 1)?);
        columns[1].push(number(tokens[1], idx + 1)?);
    }

    let channels = split_blocks(columns, sample_length)?;
    let events = channels[0].len();

    Ok(Capture {
        sampling_frequency_hz: None,
        sample_length,
        signals: ChannelMajor {
            source: source.to_string(),
            event_ids: (0..events as i64).collect(),
            times: vec![0.0; events],
            channels,
        },
    })
}

fn parse_size(line: &str) -> Result<usize, ParseError> {
    let malformed = |reason: &str| ParseError::MalformedHeader {
        line: line.to_string(),
        reason: reason.to_string(),
    };
    let value = line
        .split_once(':')
        .map(|(_, v)| v.trim())
        .ok_or_else(|| malformed("expected 'Waveform Size: N'"))?;
    match value.parse::<usize>() {
        Ok(0) => Err(malformed("waveform size must be positive")),
        Ok(n) => Ok(n),
        Err(_) => Err(malformed("waveform size is not an integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACQUISITION: &str = "LabVIEW Measurement\n\
                               Waveform Size: 2\n\
                               Sample Rate: 500 MS/s\n\
                               Time\tCh1\tCh2\n\
                               0.5\t-0.5\n\
                               0.6\t-0.6\n\
                               1.5\t-1.5\n\
                               1.6\t-1.6\n";

    #[test]
    fn parses_blocks_after_channel_header() {
        let capture = parse_acquisition(ACQUISITION, "scope.txt").unwrap();
        assert_eq!(capture.sample_length, 2);
        assert_eq!(capture.sampling_frequency_hz, None);
        assert_eq!(capture.signals.event_ids, vec![0, 1]);
        assert_eq!(capture.signals.channels[0], vec![vec![0.5, 0.6], vec![1.5, 1.6]]);
        assert_eq!(capture.signals.channels[1][1], vec![-1.5, -1.6]);
        assert_eq!(capture.signals.times, vec![0.0, 0.0]);
    }

    #[test]
    fn missing_markers_are_reported() {
        assert_eq!(
            parse_acquisition("Waveform Size: 2\n0.1 0.2\n", "x"),
            Err(ParseError::MissingMarker("Ch1/Ch2 header"))
        );
        assert_eq!(
            parse_acquisition("Ch1 Ch2\n0.1 0.2\n", "x"),
            Err(ParseError::MissingMarker(SIZE_MARKER))
        );
    }

    #[test]
    fn bad_waveform_size_is_malformed() {
        assert!(matches!(
            parse_acquisition("Waveform Size: many\nCh1 Ch2\n", "x"),
            Err(ParseError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn single_column_row_is_rejected() {
        let text = "Waveform Size: 1\nCh1 Ch2\n0.1\n";
        assert_eq!(
            parse_acquisition(text, "x"),
            Err(ParseError::ColumnCount {
                line: 3,
                expected: 2,
                found: 1
            })
        );
    }
}
