use std::io::{BufRead, Stdin, StdinLock, Stdout, Write};

use crate::data::axis::TimeAxis;
use crate::error::OracleError;
use crate::stages::toa::{SelectionOracle, SelectionRequest};
use crate::stages::visual::{DecisionOracle, EventView};

// ---------------------------------------------------------------------------
// Shared prompt plumbing
// ---------------------------------------------------------------------------

struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    fn ask(&mut self, question: &str, event: i64) -> Result<String, OracleError> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(OracleError::Closed { event });
        }
        Ok(line.trim().to_string())
    }
}

/// Index and value of the largest absolute sample.
fn peak(samples: &[f64]) -> Option<(usize, f64)> {
    samples
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
}

fn describe(samples: &[f64], axis: Option<&TimeAxis>) -> String {
    match peak(samples) {
        Some((i, v)) => match axis.and_then(|a| a.values().get(i)) {
            Some(t) => format!("peak {v:+.4e} at {t} µs"),
            None => format!("peak {v:+.4e} at sample {i}"),
        },
        None => "empty waveform".to_string(),
    }
}

fn locked_stdio() -> (StdinLock<'static>, Stdout) {
    let stdin: Stdin = std::io::stdin();
    (stdin.lock(), std::io::stdout())
}

// ---------------------------------------------------------------------------
// ConsoleSelector – arrival-time picks typed at the terminal
// ---------------------------------------------------------------------------

/// Asks for an arrival time per channel, previews the nearest sampled point
/// and lets the operator accept it or pick again.
pub struct ConsoleSelector<R, W> {
    prompt: Prompt<R, W>,
}

impl ConsoleSelector<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        let (input, output) = locked_stdio();
        Self::new(input, output)
    }
}

impl<R: BufRead, W: Write> ConsoleSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            prompt: Prompt { input, output },
        }
    }
}

impl<R: BufRead, W: Write> SelectionOracle for ConsoleSelector<R, W> {
    fn select(&mut self, request: &SelectionRequest<'_>) -> Result<f64, OracleError> {
        let event = request.event_id;
        writeln!(
            self.prompt.output,
            "event {event} ({}) channel {}: {}",
            request.parent_source,
            request.channel,
            describe(request.samples, Some(request.axis))
        )?;

        loop {
            let answer = self.prompt.ask("arrival time (µs): ", event)?;
            let picked = match answer.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    writeln!(self.prompt.output, "'{answer}' is not a time")?;
                    continue;
                }
            };
            let snapped = request.axis.snap(picked);
            let confirm = self.prompt.ask(
                &format!("nearest sampled point: {snapped} µs. Enter to accept, r to repeat: "),
                event,
            )?;
            if confirm.is_empty() || confirm.eq_ignore_ascii_case("y") {
                return Ok(picked);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ConsoleReviewer – keep/discard verdicts typed at the terminal
// ---------------------------------------------------------------------------

/// Shows an event summary and asks whether to discard it.
pub struct ConsoleReviewer<R, W> {
    prompt: Prompt<R, W>,
    axis: Option<TimeAxis>,
}

impl ConsoleReviewer<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        let (input, output) = locked_stdio();
        Self::new(input, output)
    }
}

impl<R: BufRead, W: Write> ConsoleReviewer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            prompt: Prompt { input, output },
            axis: None,
        }
    }

    /// Report peak positions in µs instead of sample indices.
    pub fn with_axis(mut self, axis: TimeAxis) -> Self {
        self.axis = Some(axis);
        self
    }
}

impl<R: BufRead, W: Write> DecisionOracle for ConsoleReviewer<R, W> {
    fn decide(&mut self, event: &EventView<'_>) -> Result<bool, OracleError> {
        let id = event.event_id;
        writeln!(
            self.prompt.output,
            "Event: {id} ({}) captured at {}",
            event.parent_source, event.capture_time
        )?;
        for (k, samples) in event.channels.iter().enumerate() {
            writeln!(
                self.prompt.output,
                "  Channel {}: {}",
                k + 1,
                describe(samples, self.axis.as_ref())
            )?;
        }
        let answer = self.prompt.ask(
            &format!("To DISCARD event #{id} press 'n/N' | To KEEP event #{id} press any key | "),
            id,
        )?;
        Ok(!answer.eq_ignore_ascii_case("n"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn request<'a>(axis: &'a TimeAxis, samples: &'a [f64]) -> SelectionRequest<'a> {
        SelectionRequest {
            event_id: 4,
            parent_source: "run.txt",
            channel: 2,
            samples,
            axis,
        }
    }

    #[test]
    fn accepts_confirmed_pick() {
        let axis = TimeAxis::linspace(10.0, 101);
        let samples = [0.0, 0.5, -0.9, 0.1];
        let mut output = Vec::new();
        let mut selector = ConsoleSelector::new(Cursor::new("3.14\n\n"), &mut output);
        let picked = selector.select(&request(&axis, &samples)).unwrap();
        assert_eq!(picked, 3.14);

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("event 4 (run.txt) channel 2"));
        assert!(text.contains("nearest sampled point: 3.1"));
    }

    #[test]
    fn repeat_discards_the_tentative_pick() {
        let axis = TimeAxis::linspace(10.0, 101);
        let mut selector =
            ConsoleSelector::new(Cursor::new("1.0\nr\nabc\n6.5\ny\n"), Vec::new());
        let picked = selector.select(&request(&axis, &[0.0; 4])).unwrap();
        assert_eq!(picked, 6.5);
    }

    #[test]
    fn nan_is_not_accepted_as_a_pick() {
        let axis = TimeAxis::linspace(10.0, 101);
        let mut selector = ConsoleSelector::new(Cursor::new("nan\n2.5\n\n"), Vec::new());
        assert_eq!(selector.select(&request(&axis, &[0.0])).unwrap(), 2.5);
    }

    #[test]
    fn closed_input_is_an_oracle_error() {
        let axis = TimeAxis::linspace(10.0, 101);
        let mut selector = ConsoleSelector::new(Cursor::new("4.0\n"), Vec::new());
        assert!(matches!(
            selector.select(&request(&axis, &[0.0])),
            Err(OracleError::Closed { event: 4 })
        ));
    }

    fn view<'a>(channels: Vec<&'a [f64]>) -> EventView<'a> {
        EventView {
            event_id: 12,
            parent_source: "run.txt",
            capture_time: 3.25,
            channels,
        }
    }

    #[test]
    fn reviewer_discards_on_n() {
        let ch1 = [0.0, 2.0];
        let ch2 = [-3.0, 1.0];
        let mut output = Vec::new();
        let mut reviewer = ConsoleReviewer::new(Cursor::new("N\nn\nx\n\n"), &mut output);
        assert!(!reviewer.decide(&view(vec![&ch1[..], &ch2[..]])).unwrap());
        assert!(!reviewer.decide(&view(vec![&ch1[..], &ch2[..]])).unwrap());
        assert!(reviewer.decide(&view(vec![&ch1[..], &ch2[..]])).unwrap());
        assert!(reviewer.decide(&view(vec![&ch1[..], &ch2[..]])).unwrap());
        assert!(reviewer.decide(&view(vec![&ch1[..], &ch2[..]])).is_err());

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Event: 12 (run.txt) captured at 3.25"));
        assert!(text.contains("To DISCARD event #12 press 'n/N'"));
        assert!(text.contains("Channel 2: peak -3.0000e0 at sample 0"));
    }

    #[test]
    fn reviewer_reports_peak_time_with_axis() {
        let ch = [0.0, 0.0, 1.0];
        let mut output = Vec::new();
        let mut reviewer = ConsoleReviewer::new(Cursor::new("\n"), &mut output)
            .with_axis(TimeAxis::linspace(2.0, 3));
        reviewer.decide(&view(vec![&ch[..]])).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("at 2 µs"));
    }

    #[test]
    fn peak_uses_absolute_value() {
        assert_eq!(peak(&[0.1, -0.7, 0.5]), Some((1, -0.7)));
        assert_eq!(peak(&[]), None);
    }
}
