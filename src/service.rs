//! GameService - the primary public API for the narrative engine.
//!
//! Wraps the content catalog, scene resolver, and save repository into a
//! single interface a transport layer (HTTP handler, CLI, test harness)
//! can call directly. The catalog is a process-wide immutable snapshot;
//! [`GameService::reload`] swaps in freshly loaded content without
//! touching in-flight readers.

use crate::content::{Background, Character, ContentCatalog, ContentLoadError, Story};
use crate::progress::{AdvanceEvent, UserProgress};
use crate::resolve::{resolve, ExpandedScene, ResolveError};
use crate::save::{PersistError, SaveRepository};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// Identity used when the caller supplies none. The engine never mints or
/// validates identities; that belongs to whatever sits in front of it.
pub const GUEST_USER: &str = "guest";

/// Errors from GameService operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Unknown story, chapter, or scene; maps to a 404 at the transport
    /// boundary.
    #[error("scene not found")]
    NotFound,

    #[error(transparent)]
    Content(#[from] ContentLoadError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    /// A dangling content reference surfaced by expansion.
    #[error(transparent)]
    Resolve(ResolveError),
}

impl From<ResolveError> for ServiceError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound => Self::NotFound,
            other => Self::Resolve(other),
        }
    }
}

/// Everything a client needs to boot: the full catalog plus the caller's
/// progress record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameInit {
    pub stories: BTreeMap<String, Story>,
    pub characters: BTreeMap<String, Character>,
    pub backgrounds: BTreeMap<String, Background>,
    pub user_data: UserProgress,
}

/// Acknowledgement returned by [`GameService::save_progress`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveAck {
    pub status: &'static str,
}

impl SaveAck {
    fn saved() -> Self {
        Self { status: "saved" }
    }
}

/// The narrative engine's front door.
pub struct GameService {
    content_root: PathBuf,
    catalog: RwLock<Arc<ContentCatalog>>,
    saves: SaveRepository,
}

impl GameService {
    /// Load the initial catalog snapshot from `content_root` and attach a
    /// save repository at `save_dir`.
    pub async fn new(
        content_root: impl Into<PathBuf>,
        save_dir: impl Into<PathBuf>,
    ) -> Result<Self, ServiceError> {
        let content_root = content_root.into();
        let catalog = ContentCatalog::load(&content_root).await?;
        Ok(Self {
            content_root,
            catalog: RwLock::new(Arc::new(catalog)),
            saves: SaveRepository::new(save_dir),
        })
    }

    /// Replace the save repository, e.g. to seed first-time users from an
    /// authored default save.
    pub fn with_save_repository(mut self, saves: SaveRepository) -> Self {
        self.saves = saves;
        self
    }

    /// The current catalog snapshot. Cheap to clone and safe to hold
    /// across a reload; readers keep the snapshot they started with.
    pub async fn catalog(&self) -> Arc<ContentCatalog> {
        self.catalog.read().await.clone()
    }

    /// The content root this service loads from.
    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// Reload the catalog from disk and swap it in atomically.
    ///
    /// Invoked by an external trigger (admin endpoint, file watcher);
    /// queries never reload implicitly. A failed reload leaves the
    /// previous snapshot serving.
    pub async fn reload(&self) -> Result<(), ServiceError> {
        let fresh = ContentCatalog::load(&self.content_root).await?;
        *self.catalog.write().await = Arc::new(fresh);
        info!("content catalog reloaded");
        Ok(())
    }

    /// Bootstrap payload for a client session: the whole catalog plus the
    /// user's progress (a stamped default for first-timers).
    pub async fn init_game(&self, user_id: Option<&str>) -> Result<GameInit, ServiceError> {
        let catalog = self.catalog().await;
        let user_data = self.saves.load(identity(user_id)).await?;
        Ok(GameInit {
            stories: catalog.stories.clone(),
            characters: catalog.characters.clone(),
            backgrounds: catalog.backgrounds.clone(),
            user_data,
        })
    }

    /// Look up and expand one scene.
    pub async fn get_scene(
        &self,
        story_id: &str,
        chapter_id: u32,
        scene_id: u32,
    ) -> Result<ExpandedScene, ServiceError> {
        let catalog = self.catalog().await;
        Ok(resolve(&catalog, story_id, chapter_id, scene_id)?)
    }

    /// Apply one advance event to the user's record and persist it.
    ///
    /// Load-modify-save at whole-record granularity: two concurrent saves
    /// for the same user race and the later write wins. The save call is
    /// the durability boundary; if it fails, the in-memory advance is
    /// lost with it.
    pub async fn save_progress(
        &self,
        user_id: Option<&str>,
        event: AdvanceEvent,
    ) -> Result<SaveAck, ServiceError> {
        let mut progress = self.saves.load(identity(user_id)).await?;
        progress.advance(&event);
        self.saves.save(&progress).await?;
        Ok(SaveAck::saved())
    }
}

fn identity(user_id: Option<&str>) -> &str {
    match user_id {
        Some(id) if !id.is_empty() => id,
        _ => GUEST_USER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_defaults_to_guest() {
        assert_eq!(identity(None), "guest");
        assert_eq!(identity(Some("")), "guest");
        assert_eq!(identity(Some("kai")), "kai");
    }

    #[test]
    fn save_ack_serializes_to_the_wire_shape() {
        let json = serde_json::to_value(SaveAck::saved()).expect("serialize");
        assert_eq!(json, serde_json::json!({"status": "saved"}));
    }
}
