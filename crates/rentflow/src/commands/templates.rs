//! Template command handlers.

use std::sync::Arc;

use tabled::Tabled;

use rentflow_core::{CoreError, EntityId, MutationService, PipelineConfig, Template};

use crate::cli::{GlobalOpts, TemplatesArgs, TemplatesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Requirements")]
    requirements: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&Arc<Template>> for TemplateRow {
    fn from(t: &Arc<Template>) -> Self {
        Self {
            id: t.id.to_string(),
            title: t.title.clone(),
            category: t.category.clone().unwrap_or_default(),
            requirements: t.context_requirements.join(", "),
            updated: t
                .updated_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

fn detail(t: &Template) -> String {
    output::detail_lines(&[
        ("ID", t.id.to_string()),
        ("Title", t.title.clone()),
        ("Category", t.category.clone().unwrap_or_else(|| "-".into())),
        ("Requirements", t.context_requirements.join(", ")),
        (
            "Created",
            t.created_at.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
        ),
        (
            "Updated",
            t.updated_at.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
        ),
        ("Content", t.content.clone()),
    ])
}

/// Name the requested id when the backend does not know it.
fn lookup_error(err: CoreError, id: &EntityId) -> CliError {
    if err.status() == Some(404) {
        CliError::NotFound {
            identifier: id.to_string(),
        }
    } else {
        err.into()
    }
}

fn print_template(t: &Template, global: &GlobalOpts) {
    let out = output::render_single(&global.output, t, detail, |t| t.id.to_string());
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    pipeline: &PipelineConfig,
    args: TemplatesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let service = MutationService::from_config(pipeline)?;
    service.set_error_callback(|message| tracing::info!(notice = message, "change rolled back"));

    match args.command {
        TemplatesCommand::List => {
            service.refresh().await?;
            let snap = service.templates();
            let out = output::render_list(
                &global.output,
                snap.as_slice(),
                |t| TemplateRow::from(t),
                |t| t.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TemplatesCommand::Get { id } => {
            let id = EntityId::from(id);
            let template = service
                .fetch(&id)
                .await
                .map_err(|e| lookup_error(e, &id))?;
            print_template(&template, global);
            Ok(())
        }

        TemplatesCommand::Create(fields) => {
            let patch = util::patch_from_fields(fields)?;
            let template = service.create(patch).await?;
            print_template(&template, global);
            Ok(())
        }

        TemplatesCommand::Update { id, fields } => {
            let patch = util::patch_from_fields(fields)?;
            let id = EntityId::from(id);
            // The service only updates what it holds locally.
            service.fetch(&id).await.map_err(|e| lookup_error(e, &id))?;
            let template = service.update(&id, patch).await?;
            print_template(&template, global);
            Ok(())
        }

        TemplatesCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete template '{id}'?"),
                "templates delete",
                global.yes,
            )? {
                return Ok(());
            }
            let id = EntityId::from(id);
            service.fetch(&id).await.map_err(|e| lookup_error(e, &id))?;
            service.delete(&id).await?;
            if !global.quiet {
                eprintln!("Template deleted");
            }
            Ok(())
        }
    }
}
