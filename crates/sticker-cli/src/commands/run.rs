//! End-to-end pack command

use anyhow::{Context, Result};
use sticker_gen::{CharacterInput, StickerConfig};
use sticker_pack::{AiConfig, Credentials, Workflow};

const API_KEY_ENV: &str = "STICKER_API_KEY";

pub struct RunArgs {
    pub title: String,
    pub theme: String,
    pub count: usize,
    pub character: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub no_background: bool,
    pub output_dir: Option<String>,
}

pub fn run(args: RunArgs) -> Result<()> {
    let mut config = StickerConfig::load().context("Failed to load configuration")?;
    if let Some(dir) = &args.output_dir {
        config.export.output_dir = Some(dir.into());
    }
    let workflow = Workflow::from_config(&config);

    let project = workflow.create_project(&args.title, args.count)?;
    workflow.update_theme(&project.id, &args.theme)?;

    if let Some(prompt) = args.character {
        workflow.attach_character(
            &project.id,
            CharacterInput {
                prompt,
                ..Default::default()
            },
        )?;
    }

    if let Some(provider) = &args.provider {
        let model = args
            .model
            .as_deref()
            .context("--model is required with --provider")?;
        let api_key = args
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .with_context(|| format!("--api-key or {} is required with --provider", API_KEY_ENV))?;

        let mut credentials = Credentials::new(provider.as_str(), api_key);
        if let Some(base) = &args.api_base {
            credentials = credentials.with_api_base(base.as_str());
        }
        workflow.update_ai_config(&project.id, AiConfig::uniform(provider, model))?;
        workflow.set_credentials(&project.id, credentials)?;
        workflow
            .verify_credentials(&project.id)
            .context("Credential check failed")?;
    }

    workflow
        .generate_drafts(&project.id)
        .context("Draft generation failed")?;
    for draft in workflow.drafts(&project.id)? {
        println!("{:02}. {}", draft.index, draft.caption);
    }

    workflow
        .generate_stickers(&project.id)
        .context("Image generation failed")?;
    if !args.no_background {
        workflow
            .remove_backgrounds(&project.id)
            .context("Background removal failed")?;
    }

    let outcome = workflow.export(&project.id).context("Export failed")?;
    for job in workflow.jobs(&project.id)? {
        println!("{:<8} {:<20} {:<8} {}%", job.id, job.job_type, job.status, job.progress);
    }
    println!(
        "Exported {} stickers to {} ({})",
        outcome.artifact.entries.len(),
        outcome.artifact.path.display(),
        outcome.artifact.content_hash.to_prefixed_hex()
    );
    if outcome.artifact.skipped > 0 {
        println!("Skipped {} stickers that could not be fetched", outcome.artifact.skipped);
    }
    Ok(())
}
