use rtos_vis_abstract::{Activation, ActivationSpan, TaskKind};
use serde::Serialize;

/// The simulation clock plus the left edge of the retained range.
///
/// `end` is the current simulated time. `start` trails it by at most the
/// configured window size and never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SimulationWindow {
    pub start: f64,
    pub end: f64,
}

impl SimulationWindow {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn advance(&mut self, delta: f64, speed: f64, window_size: f64) {
        self.end += delta * speed;
        if self.end > self.start + window_size {
            self.start = self.end - window_size;
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// Chronological task switches. Never empty, and no two neighbouring
/// records carry the same task.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationLog {
    records: Vec<Activation>,
}

impl Default for ActivationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivationLog {
    pub fn new() -> Self {
        Self {
            records: vec![Activation::new(TaskKind::Idle, 0.0)],
        }
    }

    pub fn records(&self) -> &[Activation] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Activation {
        // The log is created with one record and trimming always keeps one.
        self.records[self.records.len() - 1]
    }

    /// Append a switch to `task`. Returns false if `task` is already the
    /// latest record, which leaves the log untouched.
    pub fn push(&mut self, task: TaskKind, time: f64) -> bool {
        if self.latest().task == task {
            return false;
        }
        debug_assert!(time >= self.latest().time);
        self.records.push(Activation::new(task, time));
        true
    }

    /// Collapse history that fell out of the window into one record clamped to `window_start`.
    pub fn trim(&mut self, window_start: f64) -> usize {
        let mut dropped = 0;
        while self.records.len() > 1 && self.records[1].time < window_start {
            self.records[1].time = window_start;
            self.records.remove(0);
            dropped += 1;
        }
        dropped
    }

    /// Each record with how long it ran: until the next record, or until
    /// `window_end` for the running one. Never negative.
    pub fn spans(&self, window_end: f64) -> Vec<ActivationSpan> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, activation)| {
                let until = self
                    .records
                    .get(index + 1)
                    .map(|next| next.time)
                    .unwrap_or(window_end);
                ActivationSpan {
                    task: activation.task,
                    start: activation.time,
                    duration: (until - activation.time).max(0.0),
                }
            })
            .collect()
    }
}

/// Interrupt arrival times still inside the window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterruptLog {
    times: Vec<f64>,
}

impl InterruptLog {
    pub fn record(&mut self, time: f64) {
        debug_assert!(self.times.last().is_none_or(|last| *last <= time));
        self.times.push(time);
    }

    pub fn prune(&mut self, window_start: f64) -> usize {
        let before = self.times.len();
        self.times.retain(|time| *time >= window_start);
        before - self.times.len()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn clear(&mut self) {
        self.times.clear();
    }
}

/// Clip spans to the window, dropping those entirely outside it.
pub fn visible_spans(spans: &[ActivationSpan], window: SimulationWindow) -> Vec<ActivationSpan> {
    spans
        .iter()
        .filter(|span| span.end() > window.start && span.start < window.end)
        .map(|span| {
            let start = span.start.max(window.start);
            let end = span.end().min(window.end);
            ActivationSpan {
                task: span.task,
                start,
                duration: (end - start).max(0.0),
            }
        })
        .collect()
}
