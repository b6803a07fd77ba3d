use serde::{Deserialize, Serialize};

/// The three tasks the simulated processor can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Interrupt-driven CAN receive task.
    Receive,
    /// Parses messages produced by `Receive`.
    Parsing,
    Idle,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Receive, TaskKind::Parsing, TaskKind::Idle];

    /// Label used by the timeline views.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Receive => "CAN rx",
            TaskKind::Parsing => "CAN parsing",
            TaskKind::Idle => "IDLE",
        }
    }
}

/// Marks that `task` became the running task at `time` (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Activation {
    pub task: TaskKind,
    pub time: f64,
}

impl Activation {
    pub fn new(task: TaskKind, time: f64) -> Self {
        Self { task, time }
    }
}

/// An activation together with how long it lasted (or has lasted so far).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivationSpan {
    pub task: TaskKind,
    pub start: f64,
    pub duration: f64,
}

impl ActivationSpan {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}
