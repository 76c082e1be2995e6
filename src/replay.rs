//! Replay of a recorded range-vector export, one sample per scrape.
//!
//! Each metric identity owns a queue of its recorded values. A read pops the
//! front value while more than one remains; the last value is kept and served
//! on every later read.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tracing::warn;

use crate::export::{ExportError, QueryResponse, RangeSeries};
use crate::metric::MetricIdentity;

/// Position of one identity in its recorded sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// More than one value left; the next read advances.
    Streaming,
    /// Only the final value is left; reads repeat it forever.
    Exhausted,
}

/// Per-identity queues of recorded values for one endpoint.
///
/// Identities are served in source order (first occurrence wins the
/// position). One lock guards all queues of the endpoint so a scrape always
/// advances every metric together.
#[derive(Debug, Default)]
pub struct ReplaySequence {
    series: Mutex<IndexMap<MetricIdentity, VecDeque<String>>>,
}

impl ReplaySequence {
    /// Build a sequence from a loaded export.
    ///
    /// # Errors
    ///
    /// Fails if the export status is not `success`, the result type is not
    /// `matrix`, or a series has no `__name__` label.
    pub fn from_export(export: QueryResponse) -> Result<Self, ExportError> {
        Self::from_series(export.into_matrix()?)
    }

    /// Build a sequence from range-vector series.
    ///
    /// Series without samples are skipped. If two series share an identity
    /// the later one's values replace the earlier ones.
    pub fn from_series(series: Vec<RangeSeries>) -> Result<Self, ExportError> {
        let mut queues = IndexMap::with_capacity(series.len());
        for RangeSeries { metric, values } in series {
            let identity = MetricIdentity::from_label_map(&metric)?;
            if values.is_empty() {
                warn!(metric = %identity, "skipping series without samples");
                continue;
            }
            let queue: VecDeque<String> = values.into_iter().map(|pair| pair.1).collect();
            queues.insert(identity, queue);
        }
        Ok(Self { series: Mutex::new(queues) })
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<MetricIdentity, VecDeque<String>>> {
        self.series.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of tracked identities.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no identity is tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Current state of `identity`, if tracked.
    pub fn state(&self, identity: &MetricIdentity) -> Option<ReplayState> {
        self.lock().get(identity).map(|queue| {
            if queue.len() > 1 {
                ReplayState::Streaming
            } else {
                ReplayState::Exhausted
            }
        })
    }

    /// Read the next value of a single identity.
    pub fn next_value(&self, identity: &MetricIdentity) -> Option<String> {
        self.lock().get_mut(identity).and_then(advance)
    }

    /// Read every tracked identity once and render one exposition line each.
    ///
    /// # Returns
    ///
    /// Returns `name{labels} value\n` lines in source order.
    pub fn scrape(&self) -> String {
        let mut queues = self.lock();
        let mut body = String::new();
        for (identity, queue) in queues.iter_mut() {
            if let Some(value) = advance(queue) {
                body.push_str(identity.as_str());
                body.push(' ');
                body.push_str(&value);
                body.push('\n');
            }
        }
        body
    }
}

fn advance(queue: &mut VecDeque<String>) -> Option<String> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}
