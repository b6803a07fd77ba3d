use crate::config::{SimConfig, TaskParameters};
use crate::task::TaskKind;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: SimConfigOverride,
    /// Simulated seconds to run.
    pub duration: f64,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimConfigOverride {
    pub window_size: Option<f64>,
    pub speed: Option<f64>,
    pub seed: Option<u64>,
    pub time_slice: Option<f64>,
    pub mean_interval: Option<f64>,
    pub receive_duration: Option<f64>,
    pub parsing_duration: Option<f64>,
}

impl SimConfigOverride {
    pub fn apply_to(&self, config: &mut SimConfig) {
        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.speed {
            config.speed = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.time_slice {
            config.time_slice = v;
        }
        ParameterOverride {
            mean_interval: self.mean_interval,
            receive_duration: self.receive_duration,
            parsing_duration: self.parsing_duration,
        }
        .apply_to(&mut config.params);
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct ParameterOverride {
    pub mean_interval: Option<f64>,
    pub receive_duration: Option<f64>,
    pub parsing_duration: Option<f64>,
}

impl ParameterOverride {
    pub fn apply_to(&self, params: &mut TaskParameters) {
        if let Some(v) = self.mean_interval {
            params.mean_interval = v;
        }
        if let Some(v) = self.receive_duration {
            params.receive_duration = v;
        }
        if let Some(v) = self.parsing_duration {
            params.parsing_duration = v;
        }
    }

    pub fn from_action(action: &TestAction) -> Option<Self> {
        match *action {
            TestAction::SetParameters {
                mean_interval,
                receive_duration,
                parsing_duration,
                ..
            } => Some(Self {
                mean_interval,
                receive_duration,
                parsing_duration,
            }),
            TestAction::SetSpeed { .. } => None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAction {
    /// Change task parameters once simulated time reaches `at`.
    SetParameters {
        at: f64,
        mean_interval: Option<f64>,
        receive_duration: Option<f64>,
        parsing_duration: Option<f64>,
    },
    /// Change the speed multiplier once simulated time reaches `at`.
    SetSpeed { at: f64, speed: f64 },
}

impl TestAction {
    pub fn at(&self) -> f64 {
        match self {
            TestAction::SetParameters { at, .. } | TestAction::SetSpeed { at, .. } => *at,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// At least `count` interrupts were generated over the whole run.
    MinInterrupts { count: u64 },
    /// The interrupt backlog never exceeded `count` at any step.
    MaxPendingInterrupts { count: u32 },
    /// Share of the final window spent in `task` lies within `[min, max]`.
    Utilization {
        task: TaskKind,
        #[serde(default)]
        min: f64,
        #[serde(default = "one")]
        max: f64,
    },
    /// The task running when the run ends.
    EndsIn { task: TaskKind },
    /// The retained activation log begins with exactly these tasks.
    TimelineStartsWith { tasks: Vec<TaskKind> },
}

fn one() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_actions_and_assertions() {
        let scenario: TestScenario = toml::from_str(
            r#"
            name = "burst"
            duration = 30.0

            [config]
            seed = 3
            mean_interval = 0.8

            [[actions]]
            type = "set_parameters"
            at = 10.0
            parsing_duration = 0.2

            [[actions]]
            type = "set_speed"
            at = 12.0
            speed = 2.0

            [[assertions]]
            type = "utilization"
            task = "receive"
            min = 0.3

            [[assertions]]
            type = "ends_in"
            task = "idle"
            "#,
        )
        .unwrap();

        assert_eq!(scenario.actions.len(), 2);
        assert_eq!(scenario.actions[0].at(), 10.0);
        let params = ParameterOverride::from_action(&scenario.actions[0]).unwrap();
        assert_eq!(params.parsing_duration, Some(0.2));
        assert_eq!(params.mean_interval, None);
        assert!(ParameterOverride::from_action(&scenario.actions[1]).is_none());
        match &scenario.assertions[0] {
            TestAssertion::Utilization { task, min, max } => {
                assert_eq!(*task, TaskKind::Receive);
                assert_eq!(*min, 0.3);
                assert_eq!(*max, 1.0);
            }
            other => panic!("unexpected assertion {other:?}"),
        }

        let mut config = SimConfig::default();
        scenario.config.apply_to(&mut config);
        assert_eq!(config.seed, 3);
        assert_eq!(config.params.mean_interval, 0.8);
        assert_eq!(config.params.receive_duration, 1.0);
    }
}
