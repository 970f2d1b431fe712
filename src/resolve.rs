//! Scene lookup and expansion.
//!
//! Turns a (story, chapter, scene) coordinate into a renderable payload:
//! the scene's background and character references are resolved into full
//! catalog records, and a synthetic player actor is injected.

use crate::content::{Background, Character, Choice, ContentCatalog, DialogueLine};
use serde::Serialize;
use serde_json::Map;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Reserved key for the injected player actor. Authored content cannot
/// supply this entry; expansion always overwrites it.
pub const PLAYER_KEY: &str = "player";

/// Display name of the injected player actor.
const PLAYER_NAME: &str = "玩家";

/// Screen slot of the injected player actor.
const PLAYER_POSITION: &str = "center";

/// Errors from scene resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The story, chapter, or scene does not exist. Callers are given no
    /// way to tell which of the three was missing.
    #[error("scene not found")]
    NotFound,

    /// The scene names a background absent from the catalog. Unlike an
    /// unknown character reference (silently dropped), a missing background
    /// is surfaced: every scene needs a backdrop and a dangling reference
    /// is an authoring bug.
    #[error("scene {scene_id} references unknown background {background:?}")]
    DanglingBackground { scene_id: u32, background: String },
}

/// A scene with its references resolved into full records, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedScene {
    pub scene_id: u32,
    pub background: Background,
    pub characters: BTreeMap<String, Character>,
    pub dialogue: Vec<DialogueLine>,
    pub choices: Vec<Choice>,
}

/// Locate a scene by coordinate and expand it against the catalog.
///
/// Pure function of its inputs: the same catalog and coordinate always
/// produce the same `ExpandedScene`.
pub fn resolve(
    catalog: &ContentCatalog,
    story_id: &str,
    chapter_id: u32,
    scene_id: u32,
) -> Result<ExpandedScene, ResolveError> {
    let story = catalog.story(story_id).ok_or(ResolveError::NotFound)?;
    let chapter = story
        .chapters
        .iter()
        .find(|c| c.chapter_id == chapter_id)
        .ok_or(ResolveError::NotFound)?;
    let scene = chapter
        .scenes
        .iter()
        .find(|s| s.scene_id == scene_id)
        .ok_or(ResolveError::NotFound)?;

    let background = catalog
        .backgrounds
        .get(&scene.background)
        .cloned()
        .ok_or_else(|| ResolveError::DanglingBackground {
            scene_id: scene.scene_id,
            background: scene.background.clone(),
        })?;

    let mut characters = BTreeMap::new();
    for char_id in &scene.characters {
        match catalog.characters.get(char_id) {
            Some(character) => {
                characters.insert(char_id.clone(), character.clone());
            }
            None => {
                debug!(%char_id, scene_id, "dropping unknown character reference");
            }
        }
    }
    characters.insert(PLAYER_KEY.to_string(), player_actor());

    Ok(ExpandedScene {
        scene_id: scene.scene_id,
        background,
        characters,
        dialogue: scene.dialogue.clone(),
        choices: scene.choices.clone(),
    })
}

fn player_actor() -> Character {
    Character {
        name: PLAYER_NAME.to_string(),
        position: Some(PLAYER_POSITION.to_string()),
        avatar: None,
        extra: Map::new(),
    }
}
