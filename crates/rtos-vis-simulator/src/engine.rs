use crate::generator::{InterruptGenerator, SeededSource};
use crate::machine::{TaskMachine, Transition};
use crate::trace::{SimulationReport, TaskUtilization};
use crate::window::{ActivationLog, InterruptLog, SimulationWindow, visible_spans};
use rtos_vis_abstract::{
    Activation, ActivationSpan, ConfigError, RandomSource, SimConfig, TaskKind, TaskParameters,
};
use tracing::{debug, info};

/// Single-processor CAN workload simulation.
///
/// Everything is advanced by [`Simulator::step`]; there are no timers or
/// background threads. Per step the window moves, old history is trimmed,
/// the interrupt generator is polled once, and the task machine is
/// re-evaluated once.
pub struct Simulator<R: RandomSource = SeededSource> {
    config: SimConfig,
    params: TaskParameters,
    speed: f64,
    source: R,

    window: SimulationWindow,
    activations: ActivationLog,
    interrupts: InterruptLog,
    generator: InterruptGenerator,
    machine: TaskMachine,

    // Run statistics, cleared by `reset`.
    total_interrupts: u64,
    switch_count: u64,
    peak_pending_interrupts: u32,
    steps: u64,
}

impl Simulator<SeededSource> {
    pub fn new(config: SimConfig) -> Self {
        let source = SeededSource::new(config.seed);
        Self::with_source(config, source)
    }
}

impl<R: RandomSource> Simulator<R> {
    pub fn with_source(config: SimConfig, source: R) -> Self {
        Self {
            params: config.params,
            speed: config.speed,
            config,
            source,
            window: SimulationWindow::default(),
            activations: ActivationLog::new(),
            interrupts: InterruptLog::default(),
            generator: InterruptGenerator::new(),
            machine: TaskMachine::new(),
            total_interrupts: 0,
            switch_count: 0,
            peak_pending_interrupts: 0,
            steps: 0,
        }
    }

    /// Back to `Idle` at time zero with empty logs and counters.
    ///
    /// Tunables (speed, parameters) and the random source keep their state.
    pub fn reset(&mut self) {
        self.window = SimulationWindow::default();
        self.activations = ActivationLog::new();
        self.interrupts.clear();
        self.generator.reset();
        self.machine = TaskMachine::new();
        self.total_interrupts = 0;
        self.switch_count = 0;
        self.peak_pending_interrupts = 0;
        self.steps = 0;
        info!("Simulation reset");
    }

    /// Advance by one slice of `delta` wall-clock seconds (scaled by the speed).
    ///
    /// A step that does not move the clock (speed zero) samples no interrupt.
    pub fn step(&mut self, delta: f64) {
        self.steps += 1;
        let before = self.window.end;
        self.window
            .advance(delta.max(0.0), self.speed, self.config.window_size);
        self.activations.trim(self.window.start);
        self.interrupts.prune(self.window.start);

        let now = self.window.end;
        if now > before
            && self
                .generator
                .poll(now, self.params.mean_interval, &mut self.source)
        {
            self.interrupts.record(now);
            self.machine.raise_interrupt();
            self.total_interrupts += 1;
            debug!(
                "IRQ at {:.3}s (pending={})",
                now,
                self.machine.pending_interrupts()
            );
        }
        self.peak_pending_interrupts = self
            .peak_pending_interrupts
            .max(self.machine.pending_interrupts());

        match self.machine.evaluate(now, &self.params) {
            Some(Transition::Switch(task)) => {
                let from = self.activations.latest().task;
                if self.activations.push(task, now) {
                    self.switch_count += 1;
                    debug!(
                        "{:.3}s: {} -> {} (irq={}, msgs={})",
                        now,
                        from.label(),
                        task.label(),
                        self.machine.pending_interrupts(),
                        self.machine.pending_parsing_messages()
                    );
                }
            }
            Some(Transition::Restart(task)) => {
                debug!("{:.3}s: {} restarts", now, task.label());
            }
            None => {}
        }
    }

    /// Run fixed slices covering `elapsed` wall-clock seconds. Returns the slice count.
    ///
    /// A non-finite `elapsed` runs nothing.
    pub fn run_for(&mut self, elapsed: f64) -> u64 {
        if !elapsed.is_finite() {
            return 0;
        }
        let slices = (elapsed.max(0.0) / self.config.time_slice).round() as u64;
        for _ in 0..slices {
            self.step(self.config.time_slice);
        }
        slices
    }

    /// Negative or non-finite multipliers are clamped to zero (paused).
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
        debug!("Speed set to {}x", self.speed);
    }

    /// Takes effect from the next step; past activations are not revisited.
    pub fn set_parameters(&mut self, params: TaskParameters) -> Result<(), ConfigError> {
        params.validate()?;
        self.params = params;
        info!(
            "Parameters applied: interval={}s rx={}s parsing={}s",
            params.mean_interval, params.receive_duration, params.parsing_duration
        );
        Ok(())
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn parameters(&self) -> TaskParameters {
        self.params
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn window(&self) -> SimulationWindow {
        self.window
    }

    pub fn current_time(&self) -> f64 {
        self.window.end
    }

    pub fn current_task(&self) -> TaskKind {
        self.machine.current()
    }

    pub fn activations(&self) -> &[Activation] {
        self.activations.records()
    }

    /// Activations with durations, the last one running up to the window end.
    pub fn timeline(&self) -> Vec<ActivationSpan> {
        self.activations.spans(self.window.end)
    }

    /// Timeline clipped to the visible window.
    pub fn visible_timeline(&self) -> Vec<ActivationSpan> {
        visible_spans(&self.timeline(), self.window)
    }

    /// Interrupt times inside the window.
    pub fn interrupts(&self) -> &[f64] {
        self.interrupts.times()
    }

    pub fn pending_interrupts(&self) -> u32 {
        self.machine.pending_interrupts()
    }

    pub fn pending_parsing_messages(&self) -> u32 {
        self.machine.pending_parsing_messages()
    }

    pub fn total_interrupts(&self) -> u64 {
        self.total_interrupts
    }

    pub fn peak_pending_interrupts(&self) -> u32 {
        self.peak_pending_interrupts
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// Share of the visible window each task occupied.
    pub fn utilization(&self) -> Vec<TaskUtilization> {
        TaskUtilization::from_spans(&self.visible_timeline(), self.window.width())
    }

    /// Produce a serializable snapshot of the current simulation state.
    pub fn export_report(&self) -> SimulationReport {
        SimulationReport {
            config: self.config.clone(),
            params: self.params,
            speed: self.speed,
            window: self.window,
            activations: self.activations.records().to_vec(),
            timeline: self.timeline(),
            interrupts: self.interrupts.times().to_vec(),
            total_interrupts: self.total_interrupts,
            switch_count: self.switch_count,
            peak_pending_interrupts: self.peak_pending_interrupts,
            utilization: self.utilization(),
        }
    }
}
