//! Workflow orchestrator
//!
//! Owns the project lifecycle:
//!
//! ```text
//! DRAFT -> GENERATING_DRAFTS -> DRAFT_READY -> GENERATING_IMAGES -> IMAGES_READY -> DONE
//! ```
//!
//! Every stage runs synchronously on the caller's thread under the
//! project's lock and records exactly one Job. A failed stage leaves the
//! project in its `GENERATING_*` status and returns the error.

use crate::canvas::Canvas;
use crate::credentials::{CredentialStore, Credentials};
use crate::export::{ExportArtifact, ExportBundler};
use crate::fetch::{ArtifactFetcher, HttpFetcher};
use crate::model::*;
use crate::repository::{MemoryRepository, Repository};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use sticker_core::{Result, StickerError};
use sticker_gen::{AdapterContext, CharacterInput, PipelineRouter, RouteConfig, StickerConfig};

/// Themes offered when the project has none of its own
pub const DEFAULT_THEME_SUGGESTIONS: [&str; 3] = ["Office Life", "Commute", "Weekend"];
const SUGGESTION_COUNT: usize = 3;

/// One mutex per project, created on first use
#[derive(Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `project_id`; the same handle for every caller
    pub fn handle(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

/// Result of a successful export stage
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub job: Job,
    pub artifact: ExportArtifact,
}

pub struct Workflow {
    repo: Arc<dyn Repository>,
    credentials: CredentialStore,
    adapters: AdapterContext,
    fetcher: Arc<dyn ArtifactFetcher>,
    canvas: Canvas,
    exporter: ExportBundler,
    locks: ProjectLocks,
}

impl Workflow {
    pub fn new(
        repo: Arc<dyn Repository>,
        adapters: AdapterContext,
        fetcher: Arc<dyn ArtifactFetcher>,
        canvas: Canvas,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        let exporter = ExportBundler::new(fetcher.clone(), export_dir);
        Self {
            repo,
            credentials: CredentialStore::new(),
            adapters,
            fetcher,
            canvas,
            exporter,
            locks: ProjectLocks::new(),
        }
    }

    /// In-memory workflow wired from configuration
    pub fn from_config(config: &StickerConfig) -> Self {
        let (width, height) = config.canvas_size();
        let fetcher = Arc::new(HttpFetcher::new(
            config.request_timeout(),
            config.max_fetch_bytes(),
        ));
        Self::new(
            Arc::new(MemoryRepository::new()),
            config.adapter_context(),
            fetcher,
            Canvas::new(width, height),
            config.export_dir(),
        )
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub fn project(&self, project_id: &str) -> Result<Project> {
        self.repo.project(project_id)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.repo.list_projects()
    }

    pub fn drafts(&self, project_id: &str) -> Result<Vec<Draft>> {
        self.repo.drafts(project_id)
    }

    pub fn stickers(&self, project_id: &str) -> Result<Vec<Sticker>> {
        self.repo.stickers(project_id)
    }

    pub fn job(&self, job_id: &str) -> Result<Job> {
        self.repo.job(job_id)
    }

    pub fn jobs(&self, project_id: &str) -> Result<Vec<Job>> {
        self.repo.jobs(project_id)
    }

    // ---------------------------------------------------------------
    // Project setup
    // ---------------------------------------------------------------

    pub fn create_project(&self, title: &str, sticker_count: usize) -> Result<Project> {
        if title.trim().is_empty() {
            return Err(StickerError::Config("title required".to_string()));
        }
        let project = Project {
            id: self.repo.next_id("proj"),
            title: title.to_string(),
            theme: String::new(),
            sticker_count,
            status: ProjectStatus::Draft,
            character_id: None,
            ai: AiConfig::default(),
            verified: Vec::new(),
        };
        self.repo.insert_project(project.clone())?;
        tracing::info!(project = %project.id, sticker_count, "project created");
        Ok(project)
    }

    pub fn update_theme(&self, project_id: &str, theme: &str) -> Result<Project> {
        self.mutate_project(project_id, |project| {
            project.theme = theme.to_string();
        })
    }

    /// Replace the provider selections; previous verification no longer applies
    pub fn update_ai_config(&self, project_id: &str, ai: AiConfig) -> Result<Project> {
        self.mutate_project(project_id, move |project| {
            project.ai = ai;
            project.verified.clear();
        })
    }

    /// Hold credentials for the project in memory
    pub fn set_credentials(&self, project_id: &str, credentials: Credentials) -> Result<()> {
        self.repo.project(project_id)?;
        self.credentials.put(project_id, credentials);
        Ok(())
    }

    /// Validate every configured selection against the stored credentials.
    ///
    /// The default selection is always checked; task selections only when
    /// set. On success the checked selections are recorded on the project.
    pub fn verify_credentials(&self, project_id: &str) -> Result<Vec<TaskSelection>> {
        let lock = self.project_lock(project_id)?;
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut project = self.repo.project(project_id)?;
        let credentials = self
            .credentials
            .get(project_id)
            .ok_or_else(|| StickerError::Config("missing credentials".to_string()))?;

        let mut verified: Vec<TaskSelection> = Vec::new();
        for selection in project.ai.configured() {
            let router = PipelineRouter::new(route_config(selection, &credentials), &self.adapters)?;
            router.validate()?;
            if !verified.contains(selection) {
                verified.push(selection.clone());
            }
        }

        project.verified = verified.clone();
        self.repo.update_project(&project)?;
        tracing::info!(project = project_id, count = verified.len(), "credentials verified");
        Ok(verified)
    }

    /// Three theme ideas: the current theme first, then the stock themes
    pub fn suggest_themes(&self, project_id: &str) -> Result<Vec<String>> {
        let project = self.repo.project(project_id)?;
        let mut suggestions: Vec<String> = Vec::with_capacity(SUGGESTION_COUNT);
        let theme = project.theme.trim();
        if !theme.is_empty() {
            suggestions.push(theme.to_string());
        }
        for stock in DEFAULT_THEME_SUGGESTIONS {
            if suggestions.len() == SUGGESTION_COUNT {
                break;
            }
            if !suggestions.iter().any(|s| s.eq_ignore_ascii_case(stock)) {
                suggestions.push(stock.to_string());
            }
        }
        Ok(suggestions)
    }

    /// Create a character and make it the project's active one
    pub fn attach_character(&self, project_id: &str, input: CharacterInput) -> Result<Character> {
        let lock = self.project_lock(project_id)?;
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut project = self.repo.project(project_id)?;
        let character = Character {
            id: self.repo.next_id("char"),
            project_id: project_id.to_string(),
            source_type: input.source_type,
            prompt: input.prompt,
            reference_image_url: input.reference_image_url,
            status: CharacterStatus::Ready,
        };
        self.repo.insert_character(character.clone())?;
        project.character_id = Some(character.id.clone());
        self.repo.update_project(&project)?;
        Ok(character)
    }

    /// Replace caption and/or prompt; empty values keep the current text
    pub fn edit_draft(&self, draft_id: &str, caption: &str, image_prompt: &str) -> Result<Draft> {
        let draft = self.repo.draft(draft_id)?;
        let lock = self.locks.handle(&draft.project_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut draft = self.repo.draft(draft_id)?;
        if !caption.trim().is_empty() {
            draft.caption = caption.to_string();
        }
        if !image_prompt.trim().is_empty() {
            draft.image_prompt = image_prompt.to_string();
        }
        self.repo.update_draft(&draft)?;
        Ok(draft)
    }

    // ---------------------------------------------------------------
    // Stages
    // ---------------------------------------------------------------

    /// Append a batch of `sticker_count` drafts.
    ///
    /// Ideas beyond what the provider returned are filled with placeholders.
    pub fn generate_drafts(&self, project_id: &str) -> Result<Job> {
        self.run_stage(project_id, JobType::DraftGeneration, None, |project| {
            self.set_status(project, ProjectStatus::GeneratingDrafts)?;
            let character = self.character_input(project)?;
            let router = self.router_for(project, PipelineTask::Text)?;
            let ideas = router.generate_drafts(&project.theme, project.sticker_count, &character)?;

            for index in 1..=project.sticker_count {
                let (caption, image_prompt) = match ideas.get(index - 1) {
                    Some(idea) => (idea.caption.clone(), idea.image_prompt.clone()),
                    None => placeholder_draft(index),
                };
                self.repo.insert_draft(Draft {
                    id: self.repo.next_id("draft"),
                    project_id: project.id.clone(),
                    index,
                    caption,
                    image_prompt,
                    status: DraftStatus::Draft,
                })?;
            }

            tracing::debug!(
                project = %project.id,
                provider = router.provider(),
                ideas = ideas.len(),
                "drafts stored"
            );
            self.set_status(project, ProjectStatus::DraftReady)
        })
    }

    /// Render and normalize one sticker per current draft
    pub fn generate_stickers(&self, project_id: &str) -> Result<Job> {
        self.run_stage(project_id, JobType::ImageGeneration, None, |project| {
            self.set_status(project, ProjectStatus::GeneratingImages)?;
            let drafts = self.repo.drafts(&project.id)?;
            let character = self.character_input(project)?;
            let router = self.router_for(project, PipelineTask::Image)?;

            // Render the whole batch before storing any of it
            let mut rendered = Vec::with_capacity(drafts.len());
            for draft in &drafts {
                let raw = router.generate_image(&draft.image_prompt, &character)?;
                rendered.push((draft.id.clone(), self.normalize_artifact(&raw)));
            }
            for (draft_id, image_url) in rendered {
                self.repo.insert_sticker(Sticker {
                    id: self.repo.next_id("stk"),
                    project_id: project.id.clone(),
                    draft_id,
                    image_url,
                    transparent_url: None,
                    status: StickerStatus::Ready,
                })?;
            }

            self.set_status(project, ProjectStatus::ImagesReady)
        })
    }

    /// Populate `transparent_url` on every sticker of the project
    pub fn remove_backgrounds(&self, project_id: &str) -> Result<Job> {
        self.run_stage(project_id, JobType::BackgroundRemoval, None, |project| {
            let stickers = self.repo.stickers(&project.id)?;
            let router = self.router_for(project, PipelineTask::Background)?;

            for mut sticker in stickers {
                let transparent = router.remove_background(&sticker.image_url)?;
                let transparent = if transparent == sticker.image_url {
                    transparent
                } else {
                    self.normalize_artifact(&transparent)
                };
                sticker.transparent_url = Some(transparent);
                self.repo.update_sticker(&sticker)?;
            }
            Ok(())
        })
    }

    /// Re-render a single sticker from its draft's current prompt.
    ///
    /// The old transparent artifact no longer matches and is dropped.
    pub fn regenerate_sticker(&self, sticker_id: &str) -> Result<Job> {
        let sticker = self.repo.sticker(sticker_id)?;
        self.run_stage(
            &sticker.project_id,
            JobType::ImageGeneration,
            Some(sticker_id),
            |project| {
                let mut sticker = self.repo.sticker(sticker_id)?;
                let draft = self.repo.draft(&sticker.draft_id)?;
                let character = self.character_input(project)?;
                let router = self.router_for(project, PipelineTask::Image)?;

                let raw = router.generate_image(&draft.image_prompt, &character)?;
                sticker.image_url = self.normalize_artifact(&raw);
                sticker.transparent_url = None;
                sticker.status = StickerStatus::Ready;
                self.repo.update_sticker(&sticker)
            },
        )
    }

    /// Bundle the current stickers into an archive and mark the pack done
    pub fn export(&self, project_id: &str) -> Result<ExportOutcome> {
        let mut artifact = None;
        let job = self.run_stage(project_id, JobType::Export, None, |project| {
            let stickers = self.repo.stickers(&project.id)?;
            artifact = Some(self.exporter.bundle(&project.id, &stickers)?);
            self.set_status(project, ProjectStatus::Done)
        })?;
        let artifact = artifact.ok_or_else(|| {
            StickerError::InvalidState("export stage finished without an archive".to_string())
        })?;
        Ok(ExportOutcome { job, artifact })
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    /// Run `stage` under the project lock with a Job recording its outcome
    fn run_stage<F>(
        &self,
        project_id: &str,
        job_type: JobType,
        target_id: Option<&str>,
        stage: F,
    ) -> Result<Job>
    where
        F: FnOnce(&mut Project) -> Result<()>,
    {
        let lock = self.project_lock(project_id)?;
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut project = self.repo.project(project_id)?;
        let mut job = Job::running(self.repo.next_id("job"), project_id, job_type, target_id);
        self.repo.insert_job(job.clone())?;
        tracing::info!(project = project_id, job = %job.id, stage = %job_type, "stage started");

        match stage(&mut project) {
            Ok(()) => {
                job.succeed();
                self.repo.update_job(&job)?;
                tracing::info!(project = project_id, job = %job.id, stage = %job_type, "stage finished");
                Ok(job)
            }
            Err(e) => {
                job.fail(e.to_string());
                self.repo.update_job(&job)?;
                tracing::error!(project = project_id, job = %job.id, stage = %job_type, error = %e, "stage failed");
                Err(e)
            }
        }
    }

    fn mutate_project<F>(&self, project_id: &str, mutate: F) -> Result<Project>
    where
        F: FnOnce(&mut Project),
    {
        let lock = self.project_lock(project_id)?;
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut project = self.repo.project(project_id)?;
        mutate(&mut project);
        self.repo.update_project(&project)?;
        Ok(project)
    }

    /// Lock handle for an existing project; unknown ids never get one
    fn project_lock(&self, project_id: &str) -> Result<Arc<Mutex<()>>> {
        self.repo.project(project_id)?;
        Ok(self.locks.handle(project_id))
    }

    fn set_status(&self, project: &mut Project, status: ProjectStatus) -> Result<()> {
        project.status = status;
        self.repo.update_project(project)
    }

    fn character_input(&self, project: &Project) -> Result<CharacterInput> {
        match &project.character_id {
            Some(id) => Ok(self.repo.character(id)?.to_input()),
            None => Ok(CharacterInput::default()),
        }
    }

    /// Router for `task`: the local fallback when no provider is selected,
    /// otherwise the selected provider with the project's credentials
    fn router_for(&self, project: &Project, task: PipelineTask) -> Result<PipelineRouter> {
        let selection = project.ai.effective(task);
        if !selection.is_configured() {
            return Ok(PipelineRouter::fallback());
        }
        let credentials = self
            .credentials
            .get(&project.id)
            .ok_or_else(|| StickerError::Config("api key required".to_string()))?;
        PipelineRouter::new(route_config(selection, &credentials), &self.adapters)
    }

    /// Fetch and normalize an artifact onto the canvas; on any failure the
    /// raw URL is kept.
    fn normalize_artifact(&self, url: &str) -> String {
        let normalized = self
            .fetcher
            .fetch(url)
            .and_then(|bytes| self.canvas.normalize_bytes(&bytes));
        match normalized {
            Ok(data_url) => data_url,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "normalization failed, keeping raw artifact");
                url.to_string()
            }
        }
    }
}

fn route_config(selection: &TaskSelection, credentials: &Credentials) -> RouteConfig {
    RouteConfig {
        provider: selection.provider.clone(),
        model: selection.model.clone(),
        api_key: credentials.api_key.clone(),
        api_base: credentials.api_base.clone().unwrap_or_default(),
    }
}

fn placeholder_draft(index: usize) -> (String, String) {
    (
        format!("Draft {}", index),
        format!("Main character acting out the theme, pose {}", index),
    )
}
