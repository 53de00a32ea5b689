use super::{number, split_blocks, Capture};
use crate::data::flatten::ChannelMajor;
use crate::error::ParseError;

/// Parse a Digital Wave capture.
///
/// Layout:
/// ```text
/// 10 0 1024 2          fs [MHz], <unused>, samples per waveform, channels
/// 0.0012  -0.0040      one row per sample, one column per channel
/// ...                  blocks of `samples` rows form one event
/// ```
/// Events are numbered from 1. Blank lines are skipped; extra columns past
/// the channel count are ignored.
pub fn parse_capture(text: &str, source: &str) -> Result<Capture, ParseError> {
    let mut lines = text.lines().enumerate();
    let (_, header) = lines.next().ok_or(ParseError::MissingHeader)?;
    let (fs_mhz, sample_length, channel_count) = parse_header(header)?;

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); channel_count];
    for (idx, line) in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < channel_count {
            return Err(ParseError::ColumnCount {
                line: idx + 1,
                expected: channel_count,
                found: tokens.len(),
            });
        }
        for (column, token) in columns.iter_mut().zip(&tokens) {
            column.push(number(token, idx + 1)?);
        }
    }

    let channels = split_blocks(columns, sample_length)?;
    let events = channels.first().map_or(0, Vec::len);

    Ok(Capture {
        sampling_frequency_hz: Some(fs_mhz * 1e6),
        sample_length,
        signals: ChannelMajor {
            source: source.to_string(),
            event_ids: (1..=events as i64).collect(),
            times: vec![0.0; events],
            channels,
        },
    })
}

fn parse_header(line: &str) -> Result<(f64, usize, usize), ParseError> {
    let malformed = |reason: &str| ParseError::MalformedHeader {
        line: line.to_string(),
        reason: reason.to_string(),
    };
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(malformed("expected at least 4 fields"));
    }
    let fs_mhz: f64 = tokens[0]
        .parse()
        .map_err(|_| malformed("sampling frequency is not a number"))?;
    let sample_length: usize = tokens[2]
        .parse()
        .map_err(|_| malformed("waveform length is not an integer"))?;
    let channel_count: usize = tokens[3]
        .parse()
        .map_err(|_| malformed("channel count is not an integer"))?;

    if !(fs_mhz > 0.0) {
        return Err(malformed("sampling frequency must be positive"));
    }
    if sample_length == 0 || channel_count == 0 {
        return Err(malformed("waveform length and channel count must be positive"));
    }
    Ok((fs_mhz, sample_length, channel_count))
}

/// Parse a companion time file: a header line, then one row per event with
/// the timestamp in the second column.
pub fn parse_time_file(text: &str) -> Result<Vec<f64>, ParseError> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.get(1) {
                Some(token) => number(token, idx + 1),
                None => Err(ParseError::ColumnCount {
                    line: idx + 1,
                    expected: 2,
                    found: tokens.len(),
                }),
            }
        })
        .collect()
}
