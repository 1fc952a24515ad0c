//! Storage contract for pack records plus the in-memory implementation

use crate::model::*;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use sticker_core::{Result, StickerError};

/// CRUD over the records the workflow owns.
///
/// Implementations are internally synchronized. Lists come back in
/// insertion order.
pub trait Repository: Send + Sync {
    /// Next identifier for `prefix`, shaped `prefix_N`
    fn next_id(&self, prefix: &'static str) -> String;

    fn insert_project(&self, project: Project) -> Result<()>;
    fn project(&self, id: &str) -> Result<Project>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn update_project(&self, project: &Project) -> Result<()>;

    fn insert_character(&self, character: Character) -> Result<()>;
    fn character(&self, id: &str) -> Result<Character>;

    fn insert_draft(&self, draft: Draft) -> Result<()>;
    fn draft(&self, id: &str) -> Result<Draft>;
    fn update_draft(&self, draft: &Draft) -> Result<()>;
    fn drafts(&self, project_id: &str) -> Result<Vec<Draft>>;

    /// Fails unless the referenced draft belongs to the same project
    fn insert_sticker(&self, sticker: Sticker) -> Result<()>;
    fn sticker(&self, id: &str) -> Result<Sticker>;
    fn update_sticker(&self, sticker: &Sticker) -> Result<()>;
    fn stickers(&self, project_id: &str) -> Result<Vec<Sticker>>;

    fn insert_job(&self, job: Job) -> Result<()>;
    fn job(&self, id: &str) -> Result<Job>;
    /// Fails with `InvalidState` once the stored job has left `RUNNING`
    fn update_job(&self, job: &Job) -> Result<()>;
    fn jobs(&self, project_id: &str) -> Result<Vec<Job>>;
}

#[derive(Default)]
struct MemoryState {
    counters: HashMap<&'static str, u64>,
    projects: Vec<Project>,
    characters: Vec<Character>,
    drafts: Vec<Draft>,
    stickers: Vec<Sticker>,
    jobs: Vec<Job>,
}

/// Process-memory repository
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // Every mutation is a single push or field copy, so a poisoned
        // guard still holds consistent data.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn find<'a, T>(items: &'a [T], id: &str, key: impl Fn(&T) -> &str) -> Option<&'a T> {
    items.iter().find(|item| key(item) == id)
}

fn find_mut<'a, T>(items: &'a mut [T], id: &str, key: impl Fn(&T) -> &str) -> Option<&'a mut T> {
    items.iter_mut().find(|item| key(item) == id)
}

fn ensure_unique<T>(items: &[T], id: &str, kind: &str, key: impl Fn(&T) -> &str) -> Result<()> {
    if find(items, id, key).is_some() {
        return Err(StickerError::InvalidState(format!("{} {} already exists", kind, id)));
    }
    Ok(())
}

impl Repository for MemoryRepository {
    fn next_id(&self, prefix: &'static str) -> String {
        let mut state = self.state();
        let counter = state.counters.entry(prefix).or_insert(0);
        *counter += 1;
        format!("{}_{}", prefix, counter)
    }

    fn insert_project(&self, project: Project) -> Result<()> {
        let mut state = self.state();
        ensure_unique(&state.projects, &project.id, "project", |p| p.id.as_str())?;
        state.projects.push(project);
        Ok(())
    }

    fn project(&self, id: &str) -> Result<Project> {
        find(&self.state().projects, id, |p| p.id.as_str())
            .cloned()
            .ok_or_else(|| StickerError::not_found("Project", id))
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.state().projects.clone())
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        let mut state = self.state();
        let stored = find_mut(&mut state.projects, &project.id, |p| p.id.as_str())
            .ok_or_else(|| StickerError::not_found("Project", &project.id))?;
        *stored = project.clone();
        Ok(())
    }

    fn insert_character(&self, character: Character) -> Result<()> {
        let mut state = self.state();
        if find(&state.projects, &character.project_id, |p| p.id.as_str()).is_none() {
            return Err(StickerError::not_found("Project", &character.project_id));
        }
        ensure_unique(&state.characters, &character.id, "character", |c| c.id.as_str())?;
        state.characters.push(character);
        Ok(())
    }

    fn character(&self, id: &str) -> Result<Character> {
        find(&self.state().characters, id, |c| c.id.as_str())
            .cloned()
            .ok_or_else(|| StickerError::not_found("Character", id))
    }

    fn insert_draft(&self, draft: Draft) -> Result<()> {
        let mut state = self.state();
        if find(&state.projects, &draft.project_id, |p| p.id.as_str()).is_none() {
            return Err(StickerError::not_found("Project", &draft.project_id));
        }
        ensure_unique(&state.drafts, &draft.id, "draft", |d| d.id.as_str())?;
        state.drafts.push(draft);
        Ok(())
    }

    fn draft(&self, id: &str) -> Result<Draft> {
        find(&self.state().drafts, id, |d| d.id.as_str())
            .cloned()
            .ok_or_else(|| StickerError::not_found("Draft", id))
    }

    fn update_draft(&self, draft: &Draft) -> Result<()> {
        let mut state = self.state();
        let stored = find_mut(&mut state.drafts, &draft.id, |d| d.id.as_str())
            .ok_or_else(|| StickerError::not_found("Draft", &draft.id))?;
        *stored = draft.clone();
        Ok(())
    }

    fn drafts(&self, project_id: &str) -> Result<Vec<Draft>> {
        Ok(self
            .state()
            .drafts
            .iter()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect())
    }

    fn insert_sticker(&self, sticker: Sticker) -> Result<()> {
        let mut state = self.state();
        let draft = find(&state.drafts, &sticker.draft_id, |d| d.id.as_str())
            .ok_or_else(|| StickerError::not_found("Draft", &sticker.draft_id))?;
        if draft.project_id != sticker.project_id {
            return Err(StickerError::InvalidState(format!(
                "draft {} belongs to {}, not {}",
                draft.id, draft.project_id, sticker.project_id
            )));
        }
        ensure_unique(&state.stickers, &sticker.id, "sticker", |s| s.id.as_str())?;
        state.stickers.push(sticker);
        Ok(())
    }

    fn sticker(&self, id: &str) -> Result<Sticker> {
        find(&self.state().stickers, id, |s| s.id.as_str())
            .cloned()
            .ok_or_else(|| StickerError::not_found("Sticker", id))
    }

    fn update_sticker(&self, sticker: &Sticker) -> Result<()> {
        let mut state = self.state();
        let stored = find_mut(&mut state.stickers, &sticker.id, |s| s.id.as_str())
            .ok_or_else(|| StickerError::not_found("Sticker", &sticker.id))?;
        *stored = sticker.clone();
        Ok(())
    }

    fn stickers(&self, project_id: &str) -> Result<Vec<Sticker>> {
        Ok(self
            .state()
            .stickers
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    fn insert_job(&self, job: Job) -> Result<()> {
        let mut state = self.state();
        ensure_unique(&state.jobs, &job.id, "job", |j| j.id.as_str())?;
        state.jobs.push(job);
        Ok(())
    }

    fn job(&self, id: &str) -> Result<Job> {
        find(&self.state().jobs, id, |j| j.id.as_str())
            .cloned()
            .ok_or_else(|| StickerError::not_found("Job", id))
    }

    fn update_job(&self, job: &Job) -> Result<()> {
        let mut state = self.state();
        let stored = find_mut(&mut state.jobs, &job.id, |j| j.id.as_str())
            .ok_or_else(|| StickerError::not_found("Job", &job.id))?;
        if stored.status.is_terminal() {
            return Err(StickerError::InvalidState(format!(
                "job {} is already {}",
                stored.id, stored.status
            )));
        }
        *stored = job.clone();
        Ok(())
    }

    fn jobs(&self, project_id: &str) -> Result<Vec<Job>> {
        Ok(self
            .state()
            .jobs
            .iter()
            .filter(|j| j.project_id == project_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(repo: &MemoryRepository) -> Project {
        let project = Project {
            id: repo.next_id("proj"),
            title: "Cats".to_string(),
            theme: String::new(),
            sticker_count: 2,
            status: ProjectStatus::Draft,
            character_id: None,
            ai: AiConfig::default(),
            verified: Vec::new(),
        };
        repo.insert_project(project.clone()).unwrap();
        project
    }

    fn draft(repo: &MemoryRepository, project_id: &str, index: usize) -> Draft {
        let draft = Draft {
            id: repo.next_id("draft"),
            project_id: project_id.to_string(),
            index,
            caption: format!("caption {}", index),
            image_prompt: format!("prompt {}", index),
            status: DraftStatus::Draft,
        };
        repo.insert_draft(draft.clone()).unwrap();
        draft
    }

    fn sticker(id: String, project_id: &str, draft_id: &str) -> Sticker {
        Sticker {
            id,
            project_id: project_id.to_string(),
            draft_id: draft_id.to_string(),
            image_url: "https://cdn.test/a.png".to_string(),
            transparent_url: None,
            status: StickerStatus::Ready,
        }
    }

    #[test]
    fn test_ids_count_per_prefix() {
        let repo = MemoryRepository::new();
        assert_eq!(repo.next_id("proj"), "proj_1");
        assert_eq!(repo.next_id("proj"), "proj_2");
        assert_eq!(repo.next_id("job"), "job_1");
    }

    #[test]
    fn test_missing_records_are_not_found() {
        let repo = MemoryRepository::new();
        let err = repo.project("proj_404").unwrap_err();
        assert_eq!(err.to_string(), "Project not found: proj_404");
        assert!(matches!(repo.job("job_1"), Err(StickerError::NotFound { kind: "Job", .. })));
    }

    #[test]
    fn test_drafts_listed_in_insertion_order() {
        let repo = MemoryRepository::new();
        let a = project(&repo);
        let b = project(&repo);
        draft(&repo, &a.id, 1);
        draft(&repo, &b.id, 1);
        draft(&repo, &a.id, 2);
        let indexes: Vec<_> = repo.drafts(&a.id).unwrap().iter().map(|d| d.index).collect();
        assert_eq!(indexes, vec![1, 2]);
    }

    #[test]
    fn test_sticker_must_reference_draft_of_same_project() {
        let repo = MemoryRepository::new();
        let a = project(&repo);
        let b = project(&repo);
        let foreign = draft(&repo, &b.id, 1);
        let err = repo
            .insert_sticker(sticker(repo.next_id("stk"), &a.id, &foreign.id))
            .unwrap_err();
        assert!(matches!(err, StickerError::InvalidState(_)));

        let missing = repo
            .insert_sticker(sticker(repo.next_id("stk"), &a.id, "draft_404"))
            .unwrap_err();
        assert!(matches!(missing, StickerError::NotFound { .. }));

        let own = draft(&repo, &a.id, 1);
        repo.insert_sticker(sticker(repo.next_id("stk"), &a.id, &own.id))
            .unwrap();
        assert_eq!(repo.stickers(&a.id).unwrap().len(), 1);
    }

    #[test]
    fn test_terminal_job_is_immutable() {
        let repo = MemoryRepository::new();
        let p = project(&repo);
        let mut job = Job::running(repo.next_id("job"), &p.id, JobType::Export, None);
        repo.insert_job(job.clone()).unwrap();

        job.succeed();
        repo.update_job(&job).unwrap();

        job.fail("late failure");
        let err = repo.update_job(&job).unwrap_err();
        assert!(matches!(err, StickerError::InvalidState(_)));
        assert_eq!(repo.job(&job.id).unwrap().status, JobStatus::Success);
    }

    #[test]
    fn test_update_project_replaces_record() {
        let repo = MemoryRepository::new();
        let mut p = project(&repo);
        p.theme = "Weekend".to_string();
        repo.update_project(&p).unwrap();
        assert_eq!(repo.project(&p.id).unwrap().theme, "Weekend");
        assert_eq!(repo.list_projects().unwrap().len(), 1);
    }
}
