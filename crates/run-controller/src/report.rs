use serde::Serialize;

use run_types::{Iteration, Manifest};

#[derive(Debug, Serialize)]
pub struct IterationSummary {
    pub index: u32,
    pub score: Option<u32>,
    pub passed: bool,
    pub feedback: String,
    pub generation_duration_ms: u64,
    pub evaluation_duration_ms: u64,
}

/// Human-oriented synthesis of a finished run, distinct from
/// `manifest.json`'s artifact ledger — this is what a reviewer reads
/// first.
#[derive(Debug, Serialize)]
pub struct Report {
    pub run_id: String,
    pub task: String,
    pub stop_reason: Option<run_types::StopReason>,
    pub final_score: Option<u32>,
    pub preview_url: String,
    pub duration_seconds: f64,
    pub iterations: Vec<IterationSummary>,
}

impl Report {
    pub fn build(manifest: &Manifest, iterations: &[Iteration]) -> Self {
        let duration_seconds = manifest
            .ended_at
            .map(|end| (end - manifest.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        Self {
            run_id: manifest.run_id.clone(),
            task: manifest.task.clone(),
            stop_reason: manifest.stop_reason,
            final_score: manifest.final_score,
            preview_url: manifest.preview_url.clone(),
            duration_seconds,
            iterations: iterations
                .iter()
                .map(|it| IterationSummary {
                    index: it.index,
                    score: it.score,
                    passed: it.passed,
                    feedback: it.feedback.clone(),
                    generation_duration_ms: it.generation_duration_ms,
                    evaluation_duration_ms: it.evaluation_duration_ms,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders a self-contained `view.html` for the run, built from plain
/// string formatting rather than a templating engine — there is
/// exactly one document to render and no reuse across pages.
pub fn render_view_html(report: &Report) -> String {
    let stop_reason = report
        .stop_reason
        .map(|r| format!("{r:?}"))
        .unwrap_or_else(|| "in progress".to_string());

    let rows: String = report
        .iterations
        .iter()
        .map(|it| {
            format!(
                "<tr><td>{index}</td><td>{score}</td><td>{passed}</td><td>{feedback}</td></tr>",
                index = it.index,
                score = it.score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                passed = it.passed,
                feedback = escape_html(&it.feedback),
            )
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n\
<html>\n\
<head><meta charset=\"utf-8\"><title>Run {run_id}</title></head>\n\
<body>\n\
<h1>{task}</h1>\n\
<p>Run <code>{run_id}</code> — {stop_reason} — final score {final_score}</p>\n\
<p>Preview: <a href=\"{preview_url}\">{preview_url}</a></p>\n\
<table border=\"1\">\n\
<thead><tr><th>Iteration</th><th>Score</th><th>Passed</th><th>Feedback</th></tr></thead>\n\
<tbody>\n{rows}\n</tbody>\n\
</table>\n\
</body>\n\
</html>\n",
        run_id = escape_html(&report.run_id),
        task = escape_html(&report.task),
        final_score = report.final_score.map(|s| s.to_string()).unwrap_or_else(|| "n/a".to_string()),
        preview_url = escape_html(&report.preview_url),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_manifest() -> Manifest {
        let mut manifest = Manifest::new(
            "run-test",
            "build a page",
            "planner-model",
            "evaluator-model",
            "default-v1",
            PathBuf::from("/tmp/ws"),
            PathBuf::from("/tmp/ws/artifacts"),
            PathBuf::from("/tmp/ws/site"),
            "http://127.0.0.1:4310/",
        );
        manifest.record_iteration(Some(82));
        manifest.finish(run_types::StopReason::Passed, None);
        manifest
    }

    #[test]
    fn report_renders_even_with_no_iterations() {
        let manifest = sample_manifest();
        let report = Report::build(&manifest, &[]);
        assert_eq!(report.final_score, Some(82));
        let html = render_view_html(&report);
        assert!(html.contains("build a page"));
        assert!(html.contains("Passed"));
    }

    #[test]
    fn html_escapes_feedback_text() {
        let manifest = sample_manifest();
        let mut iteration = Iteration::start(0);
        iteration.feedback = "<script>alert(1)</script>".to_string();
        let report = Report::build(&manifest, &[iteration]);
        let html = render_view_html(&report);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
