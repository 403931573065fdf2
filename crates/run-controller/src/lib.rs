mod bootstrap;
mod mirror;
mod phase;
mod report;
mod vcs_snapshot;

use std::path::PathBuf;
use std::sync::Arc;

use run_agent::AgentBackend;
use run_core::{default_trace_path, Artifacts, Config, EventBus, PathConfig, Trace};
use run_evaluator::{build_patch_plan, Evaluator, Rubric};
use run_mcp::McpClient;
use run_planner::Planner;
use run_providers::ProviderRegistry;
use run_observability::{emit_event, ObservabilityEvent, ProcessKind};
use run_types::{EventLevel, Iteration, Manifest, PatchPlan, RunError, RunSpec, StopReason, TraceEvent};
use serde_json::json;
use tracing::Level;

pub use phase::{persist_phase, RunPhase, StateFile};
pub use report::Report;

/// Drives one run of the plan → generate → preview → evaluate → patch
/// loop from an empty workspace to a terminal `stopReason`. Every
/// component it wires together (`Trace`, `Artifacts`, `PreviewHttp`,
/// `McpClient`, `Planner`, `Evaluator`, `AgentClient`) already carries
/// its own component-local recovery; this type only ever escalates to
/// `RunFatal` when no phase can meaningfully continue.
pub struct RunController {
    config: Config,
    providers: Arc<ProviderRegistry>,
    agent: run_agent::AgentClient,
}

impl RunController {
    pub fn new(config: Config, providers: Arc<ProviderRegistry>, agent_backend: Arc<dyn AgentBackend>) -> Self {
        Self {
            config,
            providers,
            agent: run_agent::AgentClient::new(agent_backend),
        }
    }

    pub async fn run(&self, task: &str, notes: Option<&str>) -> Result<Manifest, RunError> {
        let run_spec = RunSpec::new(task, self.config.max_iterations, self.config.workspace_root.clone());
        let run_spec = match notes {
            Some(notes) => run_spec.with_notes(notes),
            None => run_spec,
        };
        let run_id = run_spec.run_id.clone();

        let paths = PathConfig::new(
            &self.config.workspace_root,
            &run_id,
            Some(&self.config.project_dir_name),
            &self.config.preview_host,
            self.config.preview_port,
        );
        paths.ensure_dirs().map_err(|e| RunError::RunFatal(e.into()))?;

        let trace = Trace::open(&default_trace_path(paths.workspace_dir()))
            .await
            .map_err(RunError::RunFatal)?;
        let event_bus = EventBus::new();

        let manifest = Manifest::new(
            run_id.clone(),
            task,
            self.config.planner_model.clone(),
            self.config.evaluator_model.clone(),
            self.config.rubric_id.clone(),
            paths.workspace_dir().to_path_buf(),
            paths.artifacts_dir().to_path_buf(),
            paths.site_dir().to_path_buf(),
            paths.preview_url(""),
        );
        let manifest_path = paths.workspace_dir().join("manifest.json");
        let artifacts = Artifacts::new(manifest, manifest_path, paths.artifacts_dir().to_path_buf());

        let mut preview = run_preview::PreviewHttp::new(
            paths.site_dir().to_path_buf(),
            self.config.preview_host.clone(),
            self.config.preview_port,
        );

        emit(&trace, &event_bus, EventLevel::Info, "run.started", json!({ "runId": run_id, "task": task }))
            .await
            .ok();
        persist_phase(&paths.workspace_dir().join("state.json"), RunPhase::Setup).await.ok();

        let rubric = Rubric::default_rubric();
        let outcome = self
            .drive(&run_spec, &paths, &trace, &event_bus, &artifacts, &mut preview, &rubric)
            .await;

        let stop_reason = match &outcome {
            Ok(reason) => *reason,
            Err(_) => StopReason::Error,
        };
        let error_message = outcome.as_ref().err().map(|e: &RunError| e.to_string());
        artifacts
            .mutate_manifest(|manifest| manifest.finish(stop_reason, error_message.clone()))
            .await
            .ok();

        let final_manifest = artifacts.manifest_snapshot().await;
        let iterations = load_iterations(&paths).await;
        let report = Report::build(&final_manifest, &iterations);
        if let Ok(json_text) = report.to_json() {
            let _ = artifacts.save_report("report.json", &json_text).await;
        }
        let html = report::render_view_html(&report);
        let _ = tokio::fs::write(paths.workspace_dir().join("view.html"), html).await;

        preview.stop().await;
        persist_phase(
            &paths.workspace_dir().join("state.json"),
            RunPhase::Done { stop_reason },
        )
        .await
        .ok();
        emit(
            &trace,
            &event_bus,
            EventLevel::Info,
            "run.finished",
            json!({ "stopReason": format!("{stop_reason:?}") }),
        )
        .await
        .ok();

        match outcome {
            Ok(_) => Ok(final_manifest),
            Err(e) => Err(e),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn drive(
        &self,
        run_spec: &RunSpec,
        paths: &PathConfig,
        trace: &Trace,
        event_bus: &EventBus,
        artifacts: &Artifacts,
        preview: &mut run_preview::PreviewHttp,
        rubric: &Rubric,
    ) -> Result<StopReason, RunError> {
        // Phase 1: bootstrap
        persist_phase(&paths.workspace_dir().join("state.json"), RunPhase::Bootstrap).await.ok();
        bootstrap::safe_clean(paths, paths.workspace_dir(), paths.project_root()).await?;
        if let Err(e) = bootstrap::clone_template(
            self.config.template_repo_url.as_deref(),
            &self.config.template_ref,
            paths.project_root(),
        )
        .await
        {
            emit(trace, event_bus, EventLevel::Warn, "bootstrap.clone_failed", json!({ "error": e.to_string() }))
                .await
                .ok();
        }
        if let Some(Err(e)) = bootstrap::run_init_hook(paths.project_root(), self.config.run_template_init).await {
            emit(trace, event_bus, EventLevel::Warn, "bootstrap.init_hook_failed", json!({ "error": e.to_string() }))
                .await
                .ok();
        }
        let top_level = bootstrap::list_top_level(paths.project_root()).await;
        emit(trace, event_bus, EventLevel::Info, "bootstrap.finished", json!({ "entries": top_level }))
            .await
            .ok();

        preview.start().await.map_err(RunError::RunFatal)?;

        // Phase 2: plan
        persist_phase(&paths.workspace_dir().join("state.json"), RunPhase::Plan).await.ok();
        let planner = Planner::new(self.providers.clone(), self.config.planner_model.clone());
        let plan = planner.plan(&run_spec.task, run_spec.notes.as_deref(), None).await;
        if let Ok(text) = serde_json::to_string_pretty(&plan) {
            let _ = artifacts.save_report("plan.json", &text).await;
        }
        emit(trace, event_bus, EventLevel::Info, "plan.completed", json!({ "degraded": plan.is_degraded() }))
            .await
            .ok();

        let mut vcs = vcs_snapshot::VcsSnapshot::init(paths.project_root(), &run_spec.run_id).await;
        if let Some(metadata) = vcs.metadata() {
            artifacts.mutate_manifest(|manifest| manifest.vcs = Some(metadata)).await.ok();
        }

        let mut mcp: Option<Arc<McpClient>> = None;
        let mut last_files_touched: Vec<String> = Vec::new();
        let mut iteration_index: u32 = 1;

        loop {
            // Phase 3: generate (iteration 1 only)
            if iteration_index == 1 {
                persist_phase(&paths.workspace_dir().join("state.json"), RunPhase::Generate { iteration: 1 })
                    .await
                    .ok();
                let mut todos = plan.todo_list.clone();
                todos.sort_by_key(|t| t.priority);
                let mut files_touched = Vec::new();
                for todo in &todos {
                    let result = self.agent.execute_todo(todo, paths.project_root(), &plan.build_prompt).await;
                    match result {
                        Ok(result) => files_touched.extend(result.files_touched),
                        Err(e) => {
                            emit(
                                trace,
                                event_bus,
                                EventLevel::Warn,
                                "generate.todo_failed",
                                json!({ "todoId": todo.id, "error": e.to_string() }),
                            )
                            .await
                            .ok();
                        }
                    }
                }
                files_touched.sort();
                files_touched.dedup();
                last_files_touched = files_touched;
                mirror::recover_index_html(paths.project_root(), paths.workspace_dir()).await;
                mirror::mirror_dir(paths.project_root(), paths.site_dir()).await?;
            }

            // Phase 4: evaluate
            persist_phase(
                &paths.workspace_dir().join("state.json"),
                RunPhase::Evaluate { iteration: iteration_index },
            )
            .await
            .ok();
            mirror::recover_index_html(paths.project_root(), paths.workspace_dir()).await;
            mirror::mirror_dir(paths.project_root(), paths.site_dir()).await?;

            if mcp.is_none() {
                match McpClient::spawn(&self.config.mcp_command, &self.config.mcp_args).await {
                    Ok(client) => {
                        if let Err(e) = client.initialize().await {
                            emit(
                                trace,
                                event_bus,
                                EventLevel::Warn,
                                "mcp.initialize_failed",
                                json!({ "error": e.to_string() }),
                            )
                            .await
                            .ok();
                        } else {
                            mcp = Some(client);
                        }
                    }
                    Err(e) => {
                        emit(trace, event_bus, EventLevel::Warn, "mcp.spawn_failed", json!({ "error": e.to_string() }))
                            .await
                            .ok();
                    }
                }
            }

            let iteration_artifacts_dir = paths.artifacts_dir().join(format!("iter-{iteration_index:02}"));
            let preview_url = paths.preview_url("index.html");

            let evaluator = Evaluator::new(self.providers.clone(), self.config.evaluator_model.clone())
                .with_max_turns(self.config.agentic_max_steps);
            let evaluator = if self.config.agentic_eval { evaluator } else { evaluator.non_agentic() };

            let mut iteration = Iteration::start(iteration_index);

            let verdict = match &mcp {
                Some(client) => {
                    evaluator
                        .evaluate(&preview_url, client.clone(), &run_spec.task, &iteration_artifacts_dir, rubric)
                        .await
                }
                None => run_types::Verdict::degraded(
                    "browser automation subprocess unavailable this run",
                    rubric.id.clone(),
                ),
            };

            let screenshot_paths = collect_screenshots(&iteration_artifacts_dir).await;
            iteration.finalize(verdict.clone(), screenshot_paths);

            if let Ok(text) = serde_json::to_string_pretty(&verdict) {
                let _ = artifacts.save_evaluation(iteration_index, &text, verdict.score, verdict.passed).await;
            }
            persist_iteration(paths, &iteration).await.ok();
            artifacts.mutate_manifest(|manifest| manifest.record_iteration(Some(verdict.score))).await.ok();

            emit(
                trace,
                event_bus,
                EventLevel::Info,
                "evaluation.completed",
                json!({ "iteration": iteration_index, "score": verdict.score, "passed": verdict.passed }),
            )
            .await
            .ok();

            // Phase 5: decide
            if verdict.passed {
                return Ok(StopReason::Passed);
            }
            if iteration_index >= run_spec.max_iterations {
                return Ok(StopReason::MaxIterations);
            }

            // Phase 6: patch
            persist_phase(
                &paths.workspace_dir().join("state.json"),
                RunPhase::Patch { iteration: iteration_index },
            )
            .await
            .ok();
            let patch_plan: PatchPlan = build_patch_plan(&verdict, &run_spec.task, &last_files_touched);
            if let Ok(text) = serde_json::to_string_pretty(&patch_plan) {
                let _ = artifacts.save_report(&format!("patch_plan_iter_{iteration_index}.json"), &text).await;
            }
            let patch_result = self.agent.apply_patch(paths.project_root(), &patch_plan).await?;
            let files_modified_count = patch_result.files_modified.len();
            last_files_touched = patch_result.files_modified;
            mirror::mirror_dir(paths.project_root(), paths.site_dir()).await?;

            if let Some(commit_id) = vcs.commit_iteration(paths.project_root(), iteration_index, verdict.score).await
            {
                artifacts
                    .mutate_manifest(|manifest| {
                        if let Some(meta) = &mut manifest.vcs {
                            meta.commit_ids.push(commit_id);
                        }
                    })
                    .await
                    .ok();
            }

            emit(
                trace,
                event_bus,
                EventLevel::Info,
                "patch.applied",
                json!({ "iteration": iteration_index, "filesModified": files_modified_count }),
            )
            .await
            .ok();

            iteration_index += 1;
        }
    }
}

async fn emit(
    trace: &Trace,
    event_bus: &EventBus,
    level: EventLevel,
    event_type: &str,
    data: serde_json::Value,
) -> anyhow::Result<u64> {
    let id = trace.emit(level, event_type, data.clone()).await?;
    event_bus.publish(TraceEvent {
        id,
        timestamp: chrono::Utc::now().to_rfc3339(),
        level,
        event_type: event_type.to_string(),
        data: data.clone(),
    });

    let detail = data.to_string();
    emit_event(
        tracing_level(level),
        ProcessKind::Controller,
        ObservabilityEvent {
            event: event_type,
            component: "controller",
            run_id: None,
            iteration: None,
            provider_id: None,
            model_id: None,
            status: None,
            error_code: None,
            detail: Some(&detail),
        },
    );

    Ok(id)
}

fn tracing_level(level: EventLevel) -> Level {
    match level {
        EventLevel::Debug => Level::DEBUG,
        EventLevel::Info => Level::INFO,
        EventLevel::Warn => Level::WARN,
        EventLevel::Error => Level::ERROR,
    }
}

async fn collect_screenshots(iteration_artifacts_dir: &std::path::Path) -> Vec<PathBuf> {
    let screenshots_dir = iteration_artifacts_dir.join("screenshots");
    let mut paths = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(&screenshots_dir).await else {
        return paths;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        paths.push(entry.path());
    }
    paths.sort();
    paths
}

async fn persist_iteration(paths: &PathConfig, iteration: &Iteration) -> anyhow::Result<()> {
    let dir = paths.artifacts_dir().join("iterations");
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("iteration_{:02}.json", iteration.index));
    let text = serde_json::to_string_pretty(iteration)?;
    tokio::fs::write(path, text).await?;
    Ok(())
}

async fn load_iterations(paths: &PathConfig) -> Vec<Iteration> {
    let dir = paths.artifacts_dir().join("iterations");
    let mut iterations = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
        return iterations;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(text) = tokio::fs::read_to_string(entry.path()).await {
            if let Ok(iteration) = serde_json::from_str::<Iteration>(&text) {
                iterations.push(iteration);
            }
        }
    }
    iterations.sort_by_key(|it| it.index);
    iterations
}
