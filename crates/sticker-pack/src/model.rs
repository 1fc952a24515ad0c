//! Records owned by the workflow: projects, characters, drafts, stickers
//! and jobs

use serde::{Deserialize, Serialize};
use std::fmt;
use sticker_gen::{CharacterInput, CharacterSource};

/// Lifecycle of a sticker pack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Draft,
    GeneratingDrafts,
    DraftReady,
    GeneratingImages,
    ImagesReady,
    Done,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectStatus::Draft => "DRAFT",
            ProjectStatus::GeneratingDrafts => "GENERATING_DRAFTS",
            ProjectStatus::DraftReady => "DRAFT_READY",
            ProjectStatus::GeneratingImages => "GENERATING_IMAGES",
            ProjectStatus::ImagesReady => "IMAGES_READY",
            ProjectStatus::Done => "DONE",
        };
        f.pad(name)
    }
}

/// Provider id + model chosen for one pipeline task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSelection {
    pub provider: String,
    pub model: String,
}

impl TaskSelection {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// An empty provider means "use the default" (or the local fallback)
    pub fn is_configured(&self) -> bool {
        !self.provider.trim().is_empty()
    }
}

/// Stage of the pipeline a provider selection applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineTask {
    Text,
    Image,
    Background,
}

impl fmt::Display for PipelineTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineTask::Text => write!(f, "text"),
            PipelineTask::Image => write!(f, "image"),
            PipelineTask::Background => write!(f, "background"),
        }
    }
}

/// Per-project provider selections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    pub default: TaskSelection,
    #[serde(default)]
    pub text: TaskSelection,
    #[serde(default)]
    pub image: TaskSelection,
    #[serde(default)]
    pub background: TaskSelection,
}

impl AiConfig {
    /// One selection used for every task
    pub fn uniform(provider: &str, model: &str) -> Self {
        Self {
            default: TaskSelection::new(provider, model),
            ..Default::default()
        }
    }

    fn task(&self, task: PipelineTask) -> &TaskSelection {
        match task {
            PipelineTask::Text => &self.text,
            PipelineTask::Image => &self.image,
            PipelineTask::Background => &self.background,
        }
    }

    /// The task-specific selection if configured, else the default
    pub fn effective(&self, task: PipelineTask) -> &TaskSelection {
        let selection = self.task(task);
        if selection.is_configured() {
            selection
        } else {
            &self.default
        }
    }

    /// Default plus every configured task selection, in that order
    pub fn configured(&self) -> Vec<&TaskSelection> {
        let mut selections = vec![&self.default];
        selections.extend(
            [&self.text, &self.image, &self.background]
                .into_iter()
                .filter(|s| s.is_configured()),
        );
        selections
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub theme: String,
    pub sticker_count: usize,
    pub status: ProjectStatus,
    /// Active character; the latest attached wins
    pub character_id: Option<String>,
    pub ai: AiConfig,
    /// Selections that passed the last credential verification
    #[serde(default)]
    pub verified: Vec<TaskSelection>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharacterStatus {
    #[default]
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub project_id: String,
    pub source_type: CharacterSource,
    pub prompt: String,
    pub reference_image_url: String,
    pub status: CharacterStatus,
}

impl Character {
    /// Input handed to generation calls; an empty prompt falls back to the
    /// generic main character.
    pub fn to_input(&self) -> CharacterInput {
        let mut input = CharacterInput {
            reference_image_url: self.reference_image_url.clone(),
            source_type: self.source_type,
            ..Default::default()
        };
        if !self.prompt.trim().is_empty() {
            input.prompt = self.prompt.clone();
        }
        input
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    #[default]
    Draft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub project_id: String,
    /// 1-based position within its batch
    pub index: usize,
    pub caption: String,
    pub image_prompt: String,
    pub status: DraftStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StickerStatus {
    #[default]
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    pub id: String,
    pub project_id: String,
    pub draft_id: String,
    pub image_url: String,
    pub transparent_url: Option<String>,
    pub status: StickerStatus,
}

impl Sticker {
    /// The artifact to ship: transparent version when available
    pub fn best_url(&self) -> &str {
        self.transparent_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.image_url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    DraftGeneration,
    ImageGeneration,
    BackgroundRemoval,
    Export,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobType::DraftGeneration => "DRAFT_GENERATION",
            JobType::ImageGeneration => "IMAGE_GENERATION",
            JobType::BackgroundRemoval => "BACKGROUND_REMOVAL",
            JobType::Export => "EXPORT",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
        };
        f.pad(name)
    }
}

/// Record of one stage invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub project_id: String,
    /// Sticker id for single-sticker regeneration
    pub target_id: Option<String>,
    pub job_type: JobType,
    pub status: JobStatus,
    /// 0..=100
    pub progress: u8,
    pub error: Option<String>,
}

impl Job {
    /// A freshly started job
    pub fn running(id: String, project_id: &str, job_type: JobType, target_id: Option<&str>) -> Self {
        Self {
            id,
            project_id: project_id.to_string(),
            target_id: target_id.map(|t| t.to_string()),
            job_type,
            status: JobStatus::Running,
            progress: 0,
            error: None,
        }
    }

    pub fn succeed(&mut self) {
        self.status = JobStatus::Success;
        self.progress = 100;
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.progress = 0;
        self.error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_selection_falls_back_to_default() {
        let mut ai = AiConfig::uniform("openai", "gpt-4o-mini");
        ai.image = TaskSelection::new("replicate", "sdxl");
        assert_eq!(ai.effective(PipelineTask::Image).provider, "replicate");
        assert_eq!(ai.effective(PipelineTask::Text).provider, "openai");
        assert_eq!(ai.effective(PipelineTask::Background).model, "gpt-4o-mini");
        assert_eq!(ai.configured().len(), 2);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_value(ProjectStatus::GeneratingDrafts).unwrap(),
            "GENERATING_DRAFTS"
        );
        assert_eq!(ProjectStatus::ImagesReady.to_string(), "IMAGES_READY");
        assert_eq!(
            serde_json::to_value(JobType::BackgroundRemoval).unwrap(),
            "BACKGROUND_REMOVAL"
        );
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = Job::running("job_1".into(), "proj_1", JobType::Export, None);
        assert_eq!(job.status, JobStatus::Running);
        assert!(!job.status.is_terminal());
        job.fail("no stickers");
        assert_eq!(job.progress, 0);
        assert_eq!(job.error.as_deref(), Some("no stickers"));
        assert!(job.status.is_terminal());
    }

    #[test]
    fn test_best_url_prefers_transparent() {
        let mut sticker = Sticker {
            id: "stk_1".into(),
            project_id: "proj_1".into(),
            draft_id: "draft_1".into(),
            image_url: "https://cdn.test/a.png".into(),
            transparent_url: None,
            status: StickerStatus::Ready,
        };
        assert_eq!(sticker.best_url(), "https://cdn.test/a.png");
        sticker.transparent_url = Some(String::new());
        assert_eq!(sticker.best_url(), "https://cdn.test/a.png");
        sticker.transparent_url = Some("https://cdn.test/a-t.png".into());
        assert_eq!(sticker.best_url(), "https://cdn.test/a-t.png");
    }

    #[test]
    fn test_character_input_defaults_prompt() {
        let character = Character {
            id: "char_1".into(),
            project_id: "proj_1".into(),
            source_type: CharacterSource::Upload,
            prompt: String::new(),
            reference_image_url: "https://cdn.test/ref.png".into(),
            status: CharacterStatus::Ready,
        };
        let input = character.to_input();
        assert_eq!(input.prompt, "main character");
        assert_eq!(input.source_type, CharacterSource::Upload);
    }
}
