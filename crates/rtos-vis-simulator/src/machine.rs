use rtos_vis_abstract::{TaskKind, TaskParameters};

/// Outcome of one evaluation of the task machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A different task takes over; the log gains a record.
    Switch(TaskKind),
    /// The running task starts over on a new unit of work. Its timer resets
    /// but the log keeps the existing record.
    Restart(TaskKind),
}

impl Transition {
    pub fn task(&self) -> TaskKind {
        match *self {
            Transition::Switch(task) | Transition::Restart(task) => task,
        }
    }
}

/// What the machine sees at the moment it is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observation {
    InterruptPending,
    MessagePending,
    ReceiveDone,
    ParsingDone,
    Busy,
}

/// Receive/parse/idle scheduling state.
///
/// Rules are checked in priority order:
/// 1. Pending interrupts preempt `Parsing`.
/// 2. `Idle` dispatches interrupts first, then queued messages.
/// 3. A finished receive queues one message, then serves the next interrupt or starts parsing.
/// 4. A finished parse takes the next message, else the next interrupt, else goes idle.
#[derive(Debug, Clone)]
pub struct TaskMachine {
    current: TaskKind,
    activation_start: f64,
    parsing_start: f64,
    pending_interrupts: u32,
    pending_parsing_messages: u32,
}

impl Default for TaskMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskMachine {
    pub fn new() -> Self {
        Self {
            current: TaskKind::Idle,
            activation_start: 0.0,
            parsing_start: 0.0,
            pending_interrupts: 0,
            pending_parsing_messages: 0,
        }
    }

    pub fn current(&self) -> TaskKind {
        self.current
    }

    pub fn pending_interrupts(&self) -> u32 {
        self.pending_interrupts
    }

    pub fn pending_parsing_messages(&self) -> u32 {
        self.pending_parsing_messages
    }

    /// When the running task last started (or restarted).
    pub fn activation_start(&self) -> f64 {
        self.activation_start
    }

    pub fn parsing_start(&self) -> f64 {
        self.parsing_start
    }

    pub fn raise_interrupt(&mut self) {
        self.pending_interrupts = self.pending_interrupts.saturating_add(1);
    }

    fn observe(&self, now: f64, params: &TaskParameters) -> Observation {
        match self.current {
            TaskKind::Parsing if self.pending_interrupts > 0 => Observation::InterruptPending,
            TaskKind::Idle if self.pending_interrupts > 0 => Observation::InterruptPending,
            TaskKind::Idle if self.pending_parsing_messages > 0 => Observation::MessagePending,
            TaskKind::Receive if now - self.activation_start >= params.receive_duration => {
                Observation::ReceiveDone
            }
            TaskKind::Parsing if now - self.parsing_start >= params.parsing_duration => {
                Observation::ParsingDone
            }
            _ => Observation::Busy,
        }
    }

    /// Re-evaluate the running task at `now` and apply at most one transition.
    pub fn evaluate(&mut self, now: f64, params: &TaskParameters) -> Option<Transition> {
        let transition = match (self.current, self.observe(now, params)) {
            (TaskKind::Parsing | TaskKind::Idle, Observation::InterruptPending) => {
                self.take_interrupt();
                self.transition_to(TaskKind::Receive)
            }
            (TaskKind::Idle, Observation::MessagePending) => self.transition_to(TaskKind::Parsing),
            (TaskKind::Receive, Observation::ReceiveDone) => {
                self.pending_parsing_messages = self.pending_parsing_messages.saturating_add(1);
                if self.pending_interrupts > 0 {
                    self.take_interrupt();
                    self.transition_to(TaskKind::Receive)
                } else {
                    self.transition_to(TaskKind::Parsing)
                }
            }
            (TaskKind::Parsing, Observation::ParsingDone) => {
                self.pending_parsing_messages = self.pending_parsing_messages.saturating_sub(1);
                if self.pending_parsing_messages > 0 {
                    self.transition_to(TaskKind::Parsing)
                } else if self.pending_interrupts > 0 {
                    self.take_interrupt();
                    self.transition_to(TaskKind::Receive)
                } else {
                    self.transition_to(TaskKind::Idle)
                }
            }
            _ => return None,
        };

        let task = transition.task();
        self.activation_start = now;
        if task == TaskKind::Parsing {
            self.parsing_start = now;
        }
        self.current = task;
        Some(transition)
    }

    fn take_interrupt(&mut self) {
        self.pending_interrupts = self.pending_interrupts.saturating_sub(1);
    }

    fn transition_to(&self, task: TaskKind) -> Transition {
        if task == self.current {
            Transition::Restart(task)
        } else {
            Transition::Switch(task)
        }
    }
}
