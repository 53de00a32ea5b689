use std::collections::VecDeque;

use crate::error::OracleError;
use crate::stages::toa::{SelectionOracle, SelectionRequest};
use crate::stages::visual::{DecisionOracle, EventView};

/// Replays a fixed sequence of arrival-time picks, then reports the input as
/// closed.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSelector {
    picks: VecDeque<f64>,
}

impl ScriptedSelector {
    pub fn new(picks: impl IntoIterator<Item = f64>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.picks.len()
    }
}

impl SelectionOracle for ScriptedSelector {
    fn select(&mut self, request: &SelectionRequest<'_>) -> Result<f64, OracleError> {
        self.picks.pop_front().ok_or(OracleError::Closed {
            event: request.event_id,
        })
    }
}

/// Replays a fixed sequence of keep/discard verdicts.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReviewer {
    verdicts: VecDeque<bool>,
}

impl ScriptedReviewer {
    pub fn new(verdicts: impl IntoIterator<Item = bool>) -> Self {
        Self {
            verdicts: verdicts.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.verdicts.len()
    }
}

impl DecisionOracle for ScriptedReviewer {
    fn decide(&mut self, event: &EventView<'_>) -> Result<bool, OracleError> {
        self.verdicts.pop_front().ok_or(OracleError::Closed {
            event: event.event_id,
        })
    }
}
