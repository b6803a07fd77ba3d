use std::fs;
use std::path::PathBuf;

use rtos_vis_abstract::TaskKind;
use rtos_vis_simulator::scenario_runner::run_scenario;

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios")
        .join(name)
}

#[test]
fn steady_can_bus() {
    let report = run_scenario(bundled("steady_can_bus.toml")).unwrap();
    assert!(report.switch_count > 0);
}

#[test]
fn burst_overload() {
    let report = run_scenario(bundled("burst_overload.toml")).unwrap();
    assert!(report.peak_pending_interrupts > 2);
}

#[test]
fn slow_parser() {
    let report = run_scenario(bundled("slow_parser.toml")).unwrap();
    // Back-to-back parses restart inside one record.
    for pair in report.activations.windows(2) {
        assert_ne!(pair[0].task, pair[1].task);
    }
    assert!(report.share_of(TaskKind::Parsing) > 0.0);
}

#[test]
fn scenario_from_temp_file() {
    let path = std::env::temp_dir().join(format!("rtos-vis-{}.toml", std::process::id()));
    fs::write(
        &path,
        r#"
        name = "single frame"
        duration = 3.0

        [config]
        mean_interval = 1.0
        receive_duration = 0.5
        parsing_duration = 0.25

        [[assertions]]
        type = "timeline_starts_with"
        tasks = ["idle", "receive", "parsing"]
        "#,
    )
    .unwrap();
    let result = run_scenario(&path);
    fs::remove_file(&path).unwrap();
    let report = result.unwrap();
    assert!(report.total_interrupts >= 1);
}

#[test]
fn missing_file_names_the_path() {
    let err = run_scenario("/nonexistent/rtos-vis.toml").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/rtos-vis.toml"));
}
