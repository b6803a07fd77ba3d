use anyhow::{Context, Result, bail};
use rtos_vis_abstract::{
    ParameterOverride, SimConfig, TaskKind, TestAction, TestAssertion, TestScenario,
};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::engine::Simulator;
use crate::trace::SimulationReport;

pub fn load_scenario(path: impl AsRef<Path>) -> Result<TestScenario> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse scenario file {}", path.display()))
}

/// Build the simulator a scenario starts from.
pub fn build_simulator(scenario: &TestScenario) -> Result<Simulator> {
    if !(scenario.duration.is_finite() && scenario.duration >= 0.0) {
        bail!(
            "Scenario '{}' needs a finite, non-negative duration, got {}",
            scenario.name,
            scenario.duration
        );
    }
    let mut config = SimConfig::default();
    scenario.config.apply_to(&mut config);
    config
        .validate()
        .with_context(|| format!("Scenario '{}' has an invalid config", scenario.name))?;
    if config.speed <= 0.0 {
        bail!("Scenario '{}' must start with a positive speed", scenario.name);
    }
    Ok(Simulator::new(config))
}

pub fn run_scenario(path: impl AsRef<Path>) -> Result<SimulationReport> {
    let scenario = load_scenario(path)?;
    run_loaded(&scenario)
}

/// Run a parsed scenario headless and check its assertions.
pub fn run_loaded(scenario: &TestScenario) -> Result<SimulationReport> {
    info!("Running scenario '{}': {}", scenario.name, scenario.description);
    let mut sim = build_simulator(scenario)?;

    let mut actions = scenario.actions.clone();
    actions.sort_by(|a, b| a.at().total_cmp(&b.at()));
    let mut next_action = 0;

    let time_slice = sim.config().time_slice;
    while sim.current_time() < scenario.duration {
        while let Some(action) = actions.get(next_action) {
            if action.at() > sim.current_time() {
                break;
            }
            apply_action(&mut sim, action)?;
            next_action += 1;
        }
        sim.step(time_slice);
    }
    if next_action < actions.len() {
        warn!(
            "{} action(s) scheduled after the scenario end were skipped",
            actions.len() - next_action
        );
    }

    let report = sim.export_report();
    let failures: Vec<String> = scenario
        .assertions
        .iter()
        .filter_map(|assertion| check_assertion(assertion, &sim, &report).err())
        .collect();
    if !failures.is_empty() {
        bail!(
            "Scenario '{}' failed:\n  {}",
            scenario.name,
            failures.join("\n  ")
        );
    }

    info!(
        "Scenario '{}' passed ({} assertions, {} interrupts)",
        scenario.name,
        scenario.assertions.len(),
        report.total_interrupts
    );
    Ok(report)
}

fn apply_action(sim: &mut Simulator, action: &TestAction) -> Result<()> {
    info!("{:.3}s: applying {:?}", sim.current_time(), action);
    match action {
        TestAction::SetSpeed { speed, .. } => {
            if !(*speed > 0.0 && speed.is_finite()) {
                bail!("set_speed needs a positive speed, got {speed}");
            }
            sim.set_speed(*speed);
        }
        TestAction::SetParameters { .. } => {
            let mut params = sim.parameters();
            if let Some(change) = ParameterOverride::from_action(action) {
                change.apply_to(&mut params);
            }
            sim.set_parameters(params)
                .context("set_parameters action has invalid values")?;
        }
    }
    Ok(())
}

fn check_assertion(
    assertion: &TestAssertion,
    sim: &Simulator,
    report: &SimulationReport,
) -> std::result::Result<(), String> {
    match assertion {
        TestAssertion::MinInterrupts { count } => {
            if report.total_interrupts < *count {
                return Err(format!(
                    "expected at least {count} interrupts, got {}",
                    report.total_interrupts
                ));
            }
        }
        TestAssertion::MaxPendingInterrupts { count } => {
            if report.peak_pending_interrupts > *count {
                return Err(format!(
                    "interrupt backlog reached {}, limit {count}",
                    report.peak_pending_interrupts
                ));
            }
        }
        TestAssertion::Utilization { task, min, max } => {
            let share = report.share_of(*task);
            if share < *min || share > *max {
                return Err(format!(
                    "{} utilization {:.3} outside [{min}, {max}]",
                    task.label(),
                    share
                ));
            }
        }
        TestAssertion::EndsIn { task } => {
            if sim.current_task() != *task {
                return Err(format!(
                    "expected to end in {}, ended in {}",
                    task.label(),
                    sim.current_task().label()
                ));
            }
        }
        TestAssertion::TimelineStartsWith { tasks } => {
            let actual: Vec<TaskKind> = sim.activations().iter().map(|a| a.task).collect();
            if !actual.starts_with(tasks) {
                return Err(format!(
                    "timeline starts with {:?}, expected prefix {:?}",
                    actual, tasks
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(text: &str) -> TestScenario {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn quiet_scenario_passes() {
        let report = run_loaded(&scenario(
            r#"
            name = "quiet"
            duration = 5.0

            [config]
            mean_interval = 1000.0

            [[assertions]]
            type = "ends_in"
            task = "idle"

            [[assertions]]
            type = "utilization"
            task = "idle"
            min = 1.0
            "#,
        ))
        .unwrap();
        assert_eq!(report.total_interrupts, 0);
        assert_eq!(report.activations.len(), 1);
    }

    #[test]
    fn failing_assertion_is_reported() {
        let err = run_loaded(&scenario(
            r#"
            name = "impossible"
            duration = 2.0

            [config]
            mean_interval = 1000.0

            [[assertions]]
            type = "min_interrupts"
            count = 5
            "#,
        ))
        .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("impossible"), "{message}");
        assert!(message.contains("at least 5 interrupts"), "{message}");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = run_loaded(&scenario(
            r#"
            name = "broken"
            duration = 1.0

            [config]
            receive_duration = 0.0
            "#,
        ))
        .unwrap_err();
        assert!(format!("{err:#}").contains("receive_duration"));
    }

    #[test]
    fn actions_change_parameters_mid_run() {
        let report = run_loaded(&scenario(
            r#"
            name = "flood"
            duration = 20.0

            [config]
            mean_interval = 1000.0
            seed = 4

            [[actions]]
            type = "set_parameters"
            at = 5.0
            mean_interval = 0.5

            [[assertions]]
            type = "min_interrupts"
            count = 10
            "#,
        ))
        .unwrap();
        assert!(report.params.mean_interval == 0.5);
        assert!(report.interrupts.iter().all(|t| *t >= 5.0));
    }

    #[test]
    fn endless_duration_is_rejected() {
        for duration in ["inf", "-1.0"] {
            let err = run_loaded(&scenario(&format!(
                "name = \"endless\"\nduration = {duration}\n"
            )))
            .unwrap_err();
            assert!(err.to_string().contains("finite, non-negative"), "{err}");
        }
    }

    #[test]
    fn zero_speed_action_is_rejected() {
        let err = run_loaded(&scenario(
            r#"
            name = "stall"
            duration = 3.0

            [[actions]]
            type = "set_speed"
            at = 1.0
            speed = 0.0
            "#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("positive speed"));
    }
}
