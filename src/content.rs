//! Authored story content: data model and catalog loading.
//!
//! Content lives on disk as plain JSON under a content root with three
//! subdirectories: `stories/` (one story per file), `characters/` and
//! `backgrounds/` (each file a map of ID to record). The catalog is loaded
//! once into an immutable snapshot; callers that want fresh content swap in
//! a newly loaded catalog rather than re-reading per query.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Errors from loading authored content.
///
/// Any single bad file aborts the whole load: the engine never serves a
/// partial catalog.
#[derive(Debug, Error)]
pub enum ContentLoadError {
    #[error("cannot read content directory {path}: {source}")]
    Dir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read content file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed content file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("duplicate {kind} id {id} in story {story}")]
    DuplicateId {
        kind: &'static str,
        id: u32,
        story: String,
    },
}

/// A top-level narrative unit composed of ordered chapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub story_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub chapters: Vec<Chapter>,

    /// Authored fields this engine does not interpret, carried through
    /// load and serialization untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An ordered group of scenes within a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_id: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub scenes: Vec<Scene>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The smallest navigable narrative unit.
///
/// `background` and `characters` are references into the catalog by global
/// ID; the scene does not own those records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_id: u32,

    pub background: String,

    #[serde(default)]
    pub characters: Vec<String>,

    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,

    /// Outgoing choices; a scene with none is linear.
    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single line of dialogue attributed to a speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A player choice navigating to another scene in the same chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub next_scene: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An actor that can appear in scenes, keyed by a global ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,

    /// Screen slot: "left", "center", or "right".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A scene backdrop, keyed by a global ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Read-only in-memory index of all authored content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentCatalog {
    pub stories: BTreeMap<String, Story>,
    pub characters: BTreeMap<String, Character>,
    pub backgrounds: BTreeMap<String, Background>,
}

impl ContentCatalog {
    /// Load the full catalog from a content root.
    ///
    /// Expects `stories/`, `characters/`, and `backgrounds/` under `root`.
    /// Files are read in lexical filename order; when two files declare the
    /// same ID the later file wins, so the winner is reproducible. Any
    /// unreadable or malformed file fails the entire load.
    pub async fn load(root: impl AsRef<Path>) -> Result<Self, ContentLoadError> {
        let root = root.as_ref();
        let mut catalog = Self::default();

        for path in json_files(&root.join("stories")).await? {
            let story: Story = parse_file(&path).await?;
            let id = story.story_id.clone();
            if catalog.stories.insert(id.clone(), story).is_some() {
                warn!(story_id = %id, path = %path.display(), "duplicate story id, later file wins");
            }
        }

        for path in json_files(&root.join("characters")).await? {
            let records: BTreeMap<String, Character> = parse_file(&path).await?;
            merge(&mut catalog.characters, records, "character", &path);
        }

        for path in json_files(&root.join("backgrounds")).await? {
            let records: BTreeMap<String, Background> = parse_file(&path).await?;
            merge(&mut catalog.backgrounds, records, "background", &path);
        }

        debug!(
            stories = catalog.stories.len(),
            characters = catalog.characters.len(),
            backgrounds = catalog.backgrounds.len(),
            "content catalog loaded"
        );
        Ok(catalog)
    }

    /// Look up a story by its declared ID (exact match).
    pub fn story(&self, story_id: &str) -> Option<&Story> {
        self.stories.get(story_id)
    }

    /// Check ID uniqueness within each parent scope: chapter IDs within a
    /// story and scene IDs within a chapter.
    ///
    /// Loading does not invoke this; it is an authoring aid, surfaced so
    /// content pipelines can fail a build on colliding IDs.
    pub fn validate(&self) -> Result<(), ContentLoadError> {
        for story in self.stories.values() {
            let mut chapter_ids = std::collections::BTreeSet::new();
            for chapter in &story.chapters {
                if !chapter_ids.insert(chapter.chapter_id) {
                    return Err(ContentLoadError::DuplicateId {
                        kind: "chapter",
                        id: chapter.chapter_id,
                        story: story.story_id.clone(),
                    });
                }
                let mut scene_ids = std::collections::BTreeSet::new();
                for scene in &chapter.scenes {
                    if !scene_ids.insert(scene.scene_id) {
                        return Err(ContentLoadError::DuplicateId {
                            kind: "scene",
                            id: scene.scene_id,
                            story: story.story_id.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Merge one file's records into the catalog mapping, last write wins.
fn merge<T>(into: &mut BTreeMap<String, T>, records: BTreeMap<String, T>, kind: &str, path: &Path) {
    for (id, record) in records {
        if into.insert(id.clone(), record).is_some() {
            warn!(%kind, %id, path = %path.display(), "duplicate id, later file wins");
        }
    }
}

/// List the `.json` files in a directory, sorted by filename.
async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, ContentLoadError> {
    let mut entries = fs::read_dir(dir).await.map_err(|source| ContentLoadError::Dir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|source| ContentLoadError::Dir {
        path: dir.to_path_buf(),
        source,
    })? {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

async fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ContentLoadError> {
    let content = fs::read_to_string(path).await.map_err(|source| ContentLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ContentLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
