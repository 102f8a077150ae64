//! One-shot generation for a saved audience.

use copydesk_core::{Channel, ChannelOption, GeneratedArtifact, GenerationRequest};
use copydesk_pipeline::Pipeline;
use uuid::Uuid;

#[derive(Debug)]
pub(crate) struct GenerateArgs {
    pub user_id: Uuid,
    pub audience_id: Uuid,
    pub channel: Channel,
    pub goal: String,
    pub option: Option<String>,
    pub save: bool,
}

/// Runs the pipeline and prints the artifact; with `save`, stores it as a
/// project.
///
/// Unlike the server this does not check the premium flag: the CLI is an
/// operator tool.
///
/// # Errors
///
/// Returns an error if the audience is missing, the request is invalid, a
/// stage fails after its retries, or the project cannot be stored.
pub(crate) async fn run_generate(
    pool: &sqlx::PgPool,
    pipeline: &Pipeline,
    args: GenerateArgs,
) -> anyhow::Result<()> {
    let option = args
        .option
        .as_deref()
        .map(|value| ChannelOption::parse(args.channel, value))
        .transpose()?;
    let audience = copydesk_db::get_audience(pool, args.user_id, args.audience_id)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "audience '{}' not found for user {}",
                args.audience_id,
                args.user_id
            )
        })?;

    let request = GenerationRequest::new(audience, args.channel, &args.goal, option)?;
    let artifact = pipeline.run(&request).await?;
    print!("{}", render_artifact(&artifact, &artifact.body));

    if args.save {
        let project = copydesk_db::NewProject::from_artifact(
            args.user_id,
            args.audience_id,
            &artifact,
            &artifact.body,
        );
        let id = copydesk_db::insert_project(pool, &project).await?;
        println!("saved project {id}");
    }
    Ok(())
}

/// Plain-text rendering shared by `generate` and the wizard result screen.
///
/// `body` is passed separately so the wizard can show an edited body.
pub(crate) fn render_artifact(artifact: &GeneratedArtifact, body: &str) -> String {
    let mut out = String::new();
    if let Some(subject) = &artifact.subject {
        out.push_str(&format!("Subject: {subject}\n"));
        if let Some(alternative) = &artifact.alternative_subject {
            out.push_str(&format!("Alternative subject: {alternative}\n"));
        }
    } else {
        out.push_str(&format!("Hook: {}\n", artifact.selected_hook));
    }
    let others: Vec<&String> = artifact
        .hooks
        .iter()
        .filter(|hook| **hook != artifact.selected_hook)
        .collect();
    if !others.is_empty() {
        out.push_str("Other hooks:\n");
        for hook in others {
            out.push_str(&format!("  - {hook}\n"));
        }
    }
    if let Some(structure) = artifact.structure {
        out.push_str(&format!("Structure: {structure}\n"));
    }
    if !artifact.fallback_stages.is_empty() {
        out.push_str(&format!(
            "Fallback text used for: {}\n",
            artifact.fallback_stages.join(", ")
        ));
    }
    out.push('\n');
    out.push_str(body);
    out.push('\n');
    out
}
