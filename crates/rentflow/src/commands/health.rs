//! Backend health probe.

use serde::Serialize;

use rentflow_core::{OfflineDetector, PipelineConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct HealthReport {
    url: String,
    status: &'static str,
    checked_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn handle(pipeline: &PipelineConfig, global: &GlobalOpts) -> Result<(), CliError> {
    // Start offline so the probe runs through the manual reconnect path.
    let detector = OfflineDetector::from_config(pipeline, false)?;
    let result = detector.retry_connection().await;
    detector.shutdown().await;
    result?;

    let report = HealthReport {
        url: pipeline.base_url.to_string(),
        status: "reachable",
        checked_at: detector.get_offline_stats().last_online_time,
    };
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| {
            output::detail_lines(&[
                ("URL", r.url.clone()),
                ("Status", output::paint_status(r.status, color)),
            ])
        },
        |r| r.status.to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
