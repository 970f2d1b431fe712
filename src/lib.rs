//! Branching visual novel engine.
//!
//! This crate provides:
//! - An immutable catalog of authored story content (stories, characters,
//!   backgrounds) loaded from JSON
//! - Scene resolution: expanding a (story, chapter, scene) coordinate into
//!   a renderable payload with references resolved
//! - Per-user progress tracking: position, visited scenes, and an
//!   append-only choice log
//! - JSON save persistence with a default record for first-time users
//!
//! # Quick Start
//!
//! ```ignore
//! use vn_core::{AdvanceEvent, GameService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = GameService::new("content", "saves").await?;
//!
//!     let boot = service.init_game(Some("kai")).await?;
//!     println!("{} stories loaded", boot.stories.len());
//!
//!     let scene = service.get_scene("s1", 1, 1).await?;
//!     println!("{} lines of dialogue", scene.dialogue.len());
//!
//!     service
//!         .save_progress(
//!             Some("kai"),
//!             AdvanceEvent {
//!                 story_id: "s1".to_string(),
//!                 chapter_id: 1,
//!                 scene_id: 1,
//!                 choice_made: Some(0),
//!             },
//!         )
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod progress;
pub mod resolve;
pub mod save;
pub mod service;

// Primary public API
pub use content::{
    Background, Chapter, Character, Choice, ContentCatalog, ContentLoadError, DialogueLine, Scene,
    Story,
};
pub use progress::{AdvanceEvent, ChoiceRecord, StoryProgress, UserProgress};
pub use resolve::{resolve, ExpandedScene, ResolveError, PLAYER_KEY};
pub use save::{PersistError, SaveRepository};
pub use service::{GameInit, GameService, SaveAck, ServiceError, GUEST_USER};
