use std::sync::Arc;

use run_agent::MockBackend;
use run_controller::RunController;
use run_core::Config;
use run_providers::{LocalEchoProvider, Provider, ProviderRegistry};
use run_types::StopReason;

fn hermetic_config(workspace_root: std::path::PathBuf, max_iterations: u32) -> Config {
    let env = |key: &str| -> Option<String> {
        match key {
            "PLANNER_MODEL" => Some("local/echo-1".to_string()),
            "EVALUATOR_MODEL" => Some("local/echo-1".to_string()),
            // A command that cannot spawn: the controller must degrade
            // each evaluation rather than fail the run.
            "MCP_COMMAND" => Some("run-controller-test-no-such-binary".to_string()),
            // Port 0 lets the OS pick a free ephemeral port, so parallel
            // test runs never race over a fixed preview port.
            "PREVIEW_PORT" => Some("0".to_string()),
            _ => None,
        }
    };
    let cli = run_core::CliOverrides {
        workspace_root: Some(workspace_root),
        max_iterations: Some(max_iterations),
        agent_mode: None,
    };
    Config::load(None, &env, cli).unwrap()
}

#[tokio::test]
async fn run_exhausts_max_iterations_when_mcp_is_unavailable() {
    let workspace = tempfile::tempdir().unwrap();
    let config = hermetic_config(workspace.path().to_path_buf(), 2);

    let providers = ProviderRegistry::new(vec![Arc::new(LocalEchoProvider::new()) as Arc<dyn Provider>]);
    let controller = RunController::new(config, Arc::new(providers), Arc::new(MockBackend::new()));

    let manifest = controller.run("build a one-page portfolio site", None).await.unwrap();

    assert_eq!(manifest.stop_reason, Some(StopReason::MaxIterations));
    assert_eq!(manifest.iteration_count, 2);
    assert!(manifest.workspace_dir.join("manifest.json").exists());
    assert!(manifest.workspace_dir.join("report.json").exists());
    assert!(manifest.workspace_dir.join("view.html").exists());
    assert!(manifest.workspace_dir.join("state.json").exists());

    let project_index = manifest.workspace_dir.join("project").join("index.html");
    assert!(project_index.exists(), "mock backend should have scaffolded an index.html");
}

#[tokio::test]
async fn run_notes_are_threaded_into_the_plan() {
    let workspace = tempfile::tempdir().unwrap();
    let config = hermetic_config(workspace.path().to_path_buf(), 1);

    let providers = ProviderRegistry::new(vec![Arc::new(LocalEchoProvider::new()) as Arc<dyn Provider>]);
    let controller = RunController::new(config, Arc::new(providers), Arc::new(MockBackend::new()));

    let manifest = controller
        .run("build a landing page", Some("use a dark theme"))
        .await
        .unwrap();

    assert_eq!(manifest.task, "build a landing page");
    assert_eq!(manifest.stop_reason, Some(StopReason::MaxIterations));
}
