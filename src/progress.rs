//! Per-user narrative progress and the advance operation.
//!
//! A `UserProgress` record tracks, per story, where the player currently is
//! and what they have done: scenes visited and choices taken. The record is
//! mutated only through [`UserProgress::advance`]; persistence is the
//! caller's job (see [`crate::save`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default chapter position for a story the user has never played.
const DEFAULT_CHAPTER: u32 = 1;

/// Default scene position for a story the user has never played.
const DEFAULT_SCENE: u32 = 1;

/// A single player action: moving to a scene, optionally making a choice.
///
/// `choice_made` distinguishes "no choice" (`None`) from "chose the first
/// option" (`Some(0)`); choice indices are zero-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceEvent {
    pub story_id: String,
    pub chapter_id: u32,
    pub scene_id: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_made: Option<u32>,
}

/// One entry in a story's choice log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub scene_id: u32,
    pub choice_index: u32,
}

/// Progress within a single story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryProgress {
    pub current_chapter: u32,
    pub current_scene: u32,

    /// Scenes the player has seen. Membership set: no duplicates, order
    /// not meaningful.
    #[serde(default)]
    pub visited_scenes: Vec<u32>,

    /// Choices taken, in occurrence order. Append-only: never rewritten
    /// or deduplicated.
    #[serde(default)]
    pub choices_made: Vec<ChoiceRecord>,
}

impl Default for StoryProgress {
    fn default() -> Self {
        Self {
            current_chapter: DEFAULT_CHAPTER,
            current_scene: DEFAULT_SCENE,
            visited_scenes: Vec::new(),
            choices_made: Vec::new(),
        }
    }
}

/// The full per-user save record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played_story: Option<String>,

    #[serde(default)]
    pub progress: BTreeMap<String, StoryProgress>,
}

impl UserProgress {
    /// The default template for a never-before-seen user. The repository
    /// clones this and stamps the identity on first load.
    pub fn template() -> Self {
        Self {
            user_id: String::new(),
            last_played_story: None,
            progress: BTreeMap::new(),
        }
    }

    /// A fresh record for the given identity.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::template()
        }
    }

    /// Apply one advance event to this record.
    ///
    /// Creates the story's `StoryProgress` lazily on first advance, then:
    /// overwrites the current position unconditionally (moving backward is
    /// legal), inserts the scene into the visited set if absent, appends to
    /// the choice log when a choice was made, and marks the story as last
    /// played. Nothing here checks that the coordinates name real content;
    /// that is the resolver's concern.
    pub fn advance(&mut self, event: &AdvanceEvent) {
        let story = self
            .progress
            .entry(event.story_id.clone())
            .or_default();

        story.current_chapter = event.chapter_id;
        story.current_scene = event.scene_id;

        if !story.visited_scenes.contains(&event.scene_id) {
            story.visited_scenes.push(event.scene_id);
        }

        if let Some(choice_index) = event.choice_made {
            story.choices_made.push(ChoiceRecord {
                scene_id: event.scene_id,
                choice_index,
            });
        }

        self.last_played_story = Some(event.story_id.clone());
    }
}
