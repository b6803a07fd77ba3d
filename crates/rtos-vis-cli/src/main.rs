use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use rtos_vis_abstract::{SimConfig, TaskKind};
use rtos_vis_simulator::tui::{MemoryLogBuffer, TuiApp};
use rtos_vis_simulator::{SimulationReport, Simulator, scenario_runner};

#[derive(Parser, Debug)]
#[command(author, version, about = "CAN receive/parse scheduling timeline simulator")]
struct Args {
    /// Load simulation settings from a TOML file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a scenario with assertions from disk.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Launch the terminal timeline viewer.
    #[arg(long, default_value_t = false)]
    tui: bool,

    /// Wall-clock seconds to simulate in headless mode.
    #[arg(long, default_value_t = 60.0)]
    duration: f64,

    #[arg(long)]
    seed: Option<u64>,

    /// Simulated seconds per wall-clock second.
    #[arg(long)]
    speed: Option<f64>,

    /// Mean time between interrupts, in seconds.
    #[arg(long)]
    mean_interval: Option<f64>,

    #[arg(long)]
    receive_duration: Option<f64>,

    #[arg(long)]
    parsing_duration: Option<f64>,

    /// Write a JSON trace of the finished simulation.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_buffer = init_logging(args.tui);
    info!("rtos-vis starting…");

    let report = if let Some(path) = &args.scenario {
        if args.tui {
            run_scenario_tui(path, log_buffer)?
        } else {
            scenario_runner::run_scenario(path)?
        }
    } else {
        let config = args.build_config()?;
        if args.tui {
            run_tui(Simulator::new(config), None, log_buffer)?
        } else {
            run_headless(config, args.duration)?
        }
    };

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &report)?;
    }

    Ok(())
}

impl Args {
    fn build_config(&self) -> Result<SimConfig> {
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            bail!("--duration must be a finite number of seconds, got {}", self.duration);
        }
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SimConfig::default(),
        };
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.speed {
            config.speed = v;
        }
        if let Some(v) = self.mean_interval {
            config.params.mean_interval = v;
        }
        if let Some(v) = self.receive_duration {
            config.params.receive_duration = v;
        }
        if let Some(v) = self.parsing_duration {
            config.params.parsing_duration = v;
        }
        config.validate().context("Invalid simulation settings")?;
        Ok(config)
    }
}

fn init_logging(use_tui: bool) -> Option<MemoryLogBuffer> {
    if use_tui {
        let buffer = MemoryLogBuffer::new();
        let writer = buffer.clone();
        tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .init();
        Some(buffer)
    } else {
        tracing_subscriber::fmt::init();
        None
    }
}

fn run_headless(config: SimConfig, duration: f64) -> Result<SimulationReport> {
    let mut sim = Simulator::new(config);
    info!("Starting headless simulation for {duration}s…");
    let slices = sim.run_for(duration);
    let report = sim.export_report();
    info!(
        "Simulation complete after {} slices: t={:.2}s, {} interrupts, {} switches, peak backlog {}",
        slices,
        report.window.end,
        report.total_interrupts,
        report.switch_count,
        report.peak_pending_interrupts
    );
    for task in TaskKind::ALL {
        info!(
            "  {:<12} {:>5.1}% of the last {:.0}s",
            task.label(),
            report.share_of(task) * 100.0,
            report.window.end - report.window.start
        );
    }
    Ok(report)
}

fn run_tui(
    sim: Simulator,
    name: Option<String>,
    logs: Option<MemoryLogBuffer>,
) -> Result<SimulationReport> {
    let mut app = TuiApp::new(sim, name, logs);
    app.run()?;
    Ok(app.into_simulator().export_report())
}

fn run_scenario_tui(path: &Path, logs: Option<MemoryLogBuffer>) -> Result<SimulationReport> {
    let scenario = scenario_runner::load_scenario(path)?;
    let sim = scenario_runner::build_simulator(&scenario)?;
    run_tui(sim, Some(scenario.name.clone()), logs)
}

fn load_config(path: &Path) -> Result<SimConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SimConfig = toml::from_str(&content).context("Failed to parse config file")?;
    Ok(config)
}

fn write_trace(path: &Path, report: &SimulationReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize simulation trace")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    info!("Trace written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "rtos-vis",
            "--seed",
            "9",
            "--mean-interval",
            "1.5",
            "--parsing-duration",
            "0.25",
        ])
        .unwrap();
        let config = args.build_config().unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.params.mean_interval, 1.5);
        assert_eq!(config.params.receive_duration, 1.0);
        assert_eq!(config.params.parsing_duration, 0.25);
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let args = Args::try_parse_from(["rtos-vis", "--receive-duration", "0"]).unwrap();
        let err = args.build_config().unwrap_err();
        assert!(format!("{err:#}").contains("receive_duration"));
    }

    #[test]
    fn unbounded_duration_is_rejected() {
        for value in ["inf", "NaN"] {
            let args = Args::try_parse_from(["rtos-vis", "--duration", value]).unwrap();
            let err = args.build_config().unwrap_err();
            assert!(err.to_string().contains("--duration"), "{err}");
        }
    }

    #[test]
    fn headless_run_covers_duration() {
        let report = run_headless(SimConfig::default(), 2.0).unwrap();
        assert!((report.window.end - 2.0).abs() < 1e-6);
    }
}
