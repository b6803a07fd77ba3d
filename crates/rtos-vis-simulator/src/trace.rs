use rtos_vis_abstract::{Activation, ActivationSpan, SimConfig, TaskKind, TaskParameters};
use serde::Serialize;

use crate::window::SimulationWindow;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaskUtilization {
    pub task: TaskKind,
    /// Seconds spent in `task` inside the window.
    pub busy: f64,
    /// `busy` divided by the window width.
    pub share: f64,
}

impl TaskUtilization {
    /// One entry per task kind, in `TaskKind::ALL` order.
    pub fn from_spans(spans: &[ActivationSpan], width: f64) -> Vec<Self> {
        TaskKind::ALL
            .iter()
            .map(|&task| {
                let busy: f64 = spans
                    .iter()
                    .filter(|span| span.task == task)
                    .map(|span| span.duration)
                    .sum();
                let share = if width > 0.0 { busy / width } else { 0.0 };
                Self { task, busy, share }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub config: SimConfig,
    pub params: TaskParameters,
    pub speed: f64,
    pub window: SimulationWindow,
    pub activations: Vec<Activation>,
    pub timeline: Vec<ActivationSpan>,
    pub interrupts: Vec<f64>,
    pub total_interrupts: u64,
    pub switch_count: u64,
    pub peak_pending_interrupts: u32,
    pub utilization: Vec<TaskUtilization>,
}

impl SimulationReport {
    pub fn share_of(&self, task: TaskKind) -> f64 {
        self.utilization
            .iter()
            .find(|u| u.task == task)
            .map(|u| u.share)
            .unwrap_or(0.0)
    }
}
