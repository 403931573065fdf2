use std::path::{Path, PathBuf};

use run_types::RunError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Local,
    Mock,
}

impl Default for AgentMode {
    fn default() -> Self {
        AgentMode::Mock
    }
}

/// Layer read from `run.config.json`. Every field is optional — the
/// file may configure as little or as much of the surface as the
/// project wants; unset fields fall through to environment variables,
/// then built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub workspace_root: Option<PathBuf>,
    pub project_dir_name: Option<String>,
    pub preview_host: Option<String>,
    pub preview_port: Option<u16>,
    pub agentic_eval: Option<bool>,
    pub agentic_max_steps: Option<u32>,
    pub max_iterations: Option<u32>,
    pub template_repo_url: Option<String>,
    pub template_ref: Option<String>,
    pub run_template_init: Option<bool>,
    pub publish_to_site: Option<bool>,
    pub agent_mode: Option<AgentMode>,
    pub planner_model: Option<String>,
    pub evaluator_model: Option<String>,
    pub rubric_id: Option<String>,
    pub mcp_command: Option<String>,
    #[serde(default)]
    pub mcp_args: Vec<String>,
}

/// CLI overrides, highest precedence. `None` leaves the layer below
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub workspace_root: Option<PathBuf>,
    pub max_iterations: Option<u32>,
    pub agent_mode: Option<AgentMode>,
}

/// The fully merged, validated configuration surface (§6). Built by
/// `Config::load`, merging built-in defaults → `run.config.json` →
/// environment variables → CLI flags, lowest precedence first.
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace_root: PathBuf,
    pub project_dir_name: String,
    pub preview_host: String,
    pub preview_port: u16,
    pub agentic_eval: bool,
    pub agentic_max_steps: u32,
    pub max_iterations: u32,
    pub template_repo_url: Option<String>,
    pub template_ref: String,
    pub run_template_init: bool,
    pub publish_to_site: bool,
    pub agent_mode: AgentMode,
    pub planner_model: String,
    pub evaluator_model: String,
    pub rubric_id: String,
    pub mcp_command: String,
    pub mcp_args: Vec<String>,
}

impl Config {
    pub fn load(
        config_path: Option<&Path>,
        env: &dyn Fn(&str) -> Option<String>,
        cli: CliOverrides,
    ) -> Result<Self, RunError> {
        let file = match config_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| RunError::ConfigError(format!("reading {}: {e}", path.display())))?;
                serde_json::from_str::<ConfigFile>(&text)
                    .map_err(|e| RunError::ConfigError(format!("parsing {}: {e}", path.display())))?
            }
            _ => ConfigFile::default(),
        };

        let workspace_root = cli
            .workspace_root
            .or_else(|| env("WORKSPACE_ROOT").map(PathBuf::from))
            .or(file.workspace_root)
            .ok_or_else(|| RunError::ConfigError("WORKSPACE_ROOT is required".to_string()))?;

        let agent_mode = cli
            .agent_mode
            .or_else(|| env("AGENT_MODE").and_then(|v| parse_agent_mode(&v)))
            .or(file.agent_mode)
            .unwrap_or_default();

        let planner_model = env("PLANNER_MODEL")
            .or(file.planner_model)
            .ok_or_else(|| RunError::ConfigError("planner model identifier is required".to_string()))?;

        let evaluator_model = env("EVALUATOR_MODEL")
            .or(file.evaluator_model)
            .ok_or_else(|| RunError::ConfigError("evaluator model identifier is required".to_string()))?;

        let mcp_command = env("MCP_COMMAND")
            .or(file.mcp_command)
            .ok_or_else(|| RunError::ConfigError("MCP_COMMAND is required".to_string()))?;

        let mcp_args = env("MCP_ARGS")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or(file.mcp_args);

        if agent_mode == AgentMode::Local && env("AGENT_BACKEND_COMMAND").is_none() {
            return Err(RunError::ConfigError(
                "AGENT_MODE=local requires an explicit AGENT_BACKEND_COMMAND; there is no auto-detection".to_string(),
            ));
        }

        Ok(Config {
            workspace_root,
            project_dir_name: env("PROJECT_DIR_NAME")
                .or(file.project_dir_name)
                .unwrap_or_else(|| "project".to_string()),
            preview_host: env("PREVIEW_HOST")
                .or(file.preview_host)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            preview_port: env("PREVIEW_PORT")
                .and_then(|v| v.parse().ok())
                .or(file.preview_port)
                .unwrap_or(8000),
            agentic_eval: env("AGENTIC_EVAL")
                .and_then(|v| parse_bool(&v))
                .or(file.agentic_eval)
                .unwrap_or(true),
            agentic_max_steps: env("AGENTIC_MAX_STEPS")
                .and_then(|v| v.parse().ok())
                .or(file.agentic_max_steps)
                .unwrap_or(30),
            max_iterations: cli
                .max_iterations
                .or_else(|| env("MAX_ITERATIONS").and_then(|v| v.parse().ok()))
                .or(file.max_iterations)
                .unwrap_or(10)
                .max(1),
            template_repo_url: env("TEMPLATE_REPO_URL").or(file.template_repo_url),
            template_ref: env("TEMPLATE_REF")
                .or(file.template_ref)
                .unwrap_or_else(|| "main".to_string()),
            run_template_init: env("RUN_TEMPLATE_INIT")
                .and_then(|v| parse_bool(&v))
                .or(file.run_template_init)
                .unwrap_or(false),
            publish_to_site: env("PUBLISH_TO_SITE")
                .and_then(|v| parse_bool(&v))
                .or(file.publish_to_site)
                .unwrap_or(false),
            agent_mode,
            planner_model,
            evaluator_model,
            rubric_id: env("RUBRIC_ID")
                .or(file.rubric_id)
                .unwrap_or_else(|| "default-v1".to_string()),
            mcp_command,
            mcp_args,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_agent_mode(value: &str) -> Option<AgentMode> {
    match value.to_ascii_lowercase().as_str() {
        "local" => Some(AgentMode::Local),
        "mock" => Some(AgentMode::Mock),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(map: HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> {
        let owned: HashMap<String, String> =
            map.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| owned.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let env = env_from(HashMap::from([
            ("WORKSPACE_ROOT", "/tmp/ws"),
            ("PLANNER_MODEL", "planner-v1"),
            ("EVALUATOR_MODEL", "evaluator-v1"),
            ("MCP_COMMAND", "npx"),
        ]));
        let config = Config::load(None, &env, CliOverrides::default()).unwrap();
        assert_eq!(config.preview_port, 8000);
        assert_eq!(config.agent_mode, AgentMode::Mock);
        assert_eq!(config.max_iterations, 10);
    }

    #[test]
    fn local_agent_mode_without_backend_command_is_a_config_error() {
        let env = env_from(HashMap::from([
            ("WORKSPACE_ROOT", "/tmp/ws"),
            ("PLANNER_MODEL", "planner-v1"),
            ("EVALUATOR_MODEL", "evaluator-v1"),
            ("AGENT_MODE", "local"),
        ]));
        let result = Config::load(None, &env, CliOverrides::default());
        assert!(matches!(result, Err(RunError::ConfigError(_))));
    }

    #[test]
    fn cli_overrides_beat_environment() {
        let env = env_from(HashMap::from([
            ("WORKSPACE_ROOT", "/tmp/ws"),
            ("PLANNER_MODEL", "planner-v1"),
            ("EVALUATOR_MODEL", "evaluator-v1"),
            ("MCP_COMMAND", "npx"),
            ("MAX_ITERATIONS", "4"),
        ]));
        let cli = CliOverrides {
            max_iterations: Some(7),
            ..Default::default()
        };
        let config = Config::load(None, &env, cli).unwrap();
        assert_eq!(config.max_iterations, 7);
    }
}
