//! Task plans derived from a story.

use super::{IllustrationTask, TaskId, TaskPriority};
use crate::story::domain::{Story, StoryId};
use mockable::Clock;

/// The full set of tasks needed to illustrate one story.
///
/// A story with a visual guide and at least one element name gets a
/// critical master reference task, and every page task depends on it. The
/// first page is high priority so a cover is ready early; other pages are
/// medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllustrationPlan {
    story_id: StoryId,
    reference: Option<IllustrationTask>,
    pages: Vec<IllustrationTask>,
}

impl IllustrationPlan {
    /// Builds the plan for a story.
    #[must_use]
    pub fn for_story(story: &Story, clock: &impl Clock) -> Self {
        let reference = Self::requires_master_reference(story)
            .then(|| IllustrationTask::global_reference(story.id(), clock));
        let dependencies: Vec<TaskId> = reference.iter().map(IllustrationTask::id).collect();
        let pages = story
            .pages()
            .iter()
            .map(|page| {
                let priority = if page.page_index() == 0 {
                    TaskPriority::High
                } else {
                    TaskPriority::Medium
                };
                IllustrationTask::page(
                    story.id(),
                    page.id(),
                    page.page_index(),
                    priority,
                    dependencies.iter().copied(),
                    clock,
                )
            })
            .collect();
        Self {
            story_id: story.id(),
            reference,
            pages,
        }
    }

    /// Returns `true` when pages of the story must be drawn against a
    /// master reference.
    #[must_use]
    pub fn requires_master_reference(story: &Story) -> bool {
        story.visual_guide().is_some()
            && story
                .character_names()
                .iter()
                .any(|name| !name.trim().is_empty())
    }

    /// Returns the owning story.
    #[must_use]
    pub const fn story_id(&self) -> StoryId {
        self.story_id
    }

    /// Returns the master reference task, if the story needs one.
    #[must_use]
    pub const fn reference_task(&self) -> Option<&IllustrationTask> {
        self.reference.as_ref()
    }

    /// Returns the page tasks in page order.
    #[must_use]
    pub fn page_tasks(&self) -> &[IllustrationTask] {
        &self.pages
    }

    /// Returns every task, reference first.
    pub fn tasks(&self) -> impl Iterator<Item = &IllustrationTask> {
        self.reference.iter().chain(self.pages.iter())
    }

    /// Consumes the plan, returning every task with the reference first.
    #[must_use]
    pub fn into_tasks(self) -> Vec<IllustrationTask> {
        self.reference.into_iter().chain(self.pages).collect()
    }
}
