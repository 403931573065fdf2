use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use run_agent::{AgentBackend, MockBackend, SubprocessBackend};
use run_controller::RunController;
use run_core::{AgentMode, CliOverrides, Config};
use run_observability::{canonical_logs_dir_from_root, init_process_logging, ProcessKind};
use run_providers::{LocalEchoProvider, OpenAICompatibleProvider, Provider, ProviderRegistry};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "run-cli")]
#[command(about = "Drives one plan/generate/evaluate/patch run to completion")]
struct Cli {
    /// Natural-language description of what to build.
    task: String,

    /// Extra guidance appended to the task for the planner.
    #[arg(long)]
    notes: Option<String>,

    /// Caps the evaluate/patch loop; overrides MAX_ITERATIONS and
    /// run.config.json.
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Root directory under which each run gets its own `run-<id>`
    /// workspace; overrides WORKSPACE_ROOT.
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Path to a `run.config.json` layer. Defaults to
    /// `./run.config.json` if present.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(|| {
            let default = PathBuf::from("run.config.json");
            default.exists().then_some(default)
        });

    let cli_overrides = CliOverrides {
        workspace_root: cli.base_dir.clone(),
        max_iterations: cli.max_iterations,
        agent_mode: None,
    };

    let config = Config::load(config_path.as_deref(), &|key| std::env::var(key).ok(), cli_overrides)?;

    let logs_dir = canonical_logs_dir_from_root(&config.workspace_root);
    let _guard = init_process_logging(ProcessKind::Controller, &logs_dir, 14).ok();

    info!(task = %cli.task, "starting run");

    let providers = build_providers();
    let agent_backend = build_agent_backend(config.agent_mode);

    let controller = RunController::new(config, Arc::new(providers), agent_backend);
    let manifest = controller.run(&cli.task, cli.notes.as_deref()).await?;

    println!("manifest: {}", manifest.workspace_dir.join("manifest.json").display());
    println!("stopReason: {:?}", manifest.stop_reason);

    Ok(())
}

/// Always registers the network-free echo provider so `local/echo-1`
/// works without any credentials configured, then adds any
/// OpenAI-compatible backend whose API key is present in the
/// environment.
fn build_providers() -> ProviderRegistry {
    let mut providers: Vec<Arc<dyn Provider>> = vec![Arc::new(LocalEchoProvider::new())];

    if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
        let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let default_model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        providers.push(Arc::new(OpenAICompatibleProvider::new(
            "openai",
            "OpenAI",
            base_url,
            default_model,
            Some(api_key),
        )));
    }

    if let Ok(api_key) = std::env::var("OPENROUTER_API_KEY") {
        let base_url = std::env::var("OPENROUTER_BASE_URL")
            .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string());
        let default_model =
            std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| "openrouter/auto".to_string());
        providers.push(Arc::new(OpenAICompatibleProvider::new(
            "openrouter",
            "OpenRouter",
            base_url,
            default_model,
            Some(api_key),
        )));
    }

    ProviderRegistry::new(providers)
}

fn build_agent_backend(agent_mode: AgentMode) -> Arc<dyn AgentBackend> {
    match agent_mode {
        AgentMode::Mock => Arc::new(MockBackend::new()),
        AgentMode::Local => {
            let command = std::env::var("AGENT_BACKEND_COMMAND")
                .expect("AGENT_MODE=local requires AGENT_BACKEND_COMMAND (checked at config load)");
            let args = std::env::var("AGENT_BACKEND_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            Arc::new(SubprocessBackend::new(command, args))
        }
    }
}
