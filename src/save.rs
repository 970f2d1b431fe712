//! Save repository: per-user progress persistence.
//!
//! Each user's record is one pretty-printed JSON file under the save
//! directory, named after the sanitized user ID. Saves are whole-record
//! replacements; merging of events into the record happens in
//! [`crate::progress`] before anything touches disk.

use crate::progress::UserProgress;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Errors from persistence operations. Surfaced as-is: no retry, no
/// partial save.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads and stores [`UserProgress`] records by user identity.
#[derive(Debug, Clone)]
pub struct SaveRepository {
    dir: PathBuf,
    template: UserProgress,
}

impl SaveRepository {
    /// Create a repository rooted at `dir`. The directory is created
    /// lazily on the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            template: UserProgress::template(),
        }
    }

    /// Use a custom default record for first-time users instead of the
    /// built-in empty template. Its `user_id` is ignored; loads stamp
    /// their own identity.
    pub fn with_template(mut self, template: UserProgress) -> Self {
        self.template = template;
        self
    }

    /// Read a custom default record from an authored JSON file.
    pub async fn with_template_file(self, path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let template: UserProgress = serde_json::from_str(&content)?;
        Ok(self.with_template(template))
    }

    /// Load a user's record.
    ///
    /// A missing record yields a clone of the template stamped with
    /// `user_id`, without writing anything: a durable record appears only
    /// on an explicit [`save`](Self::save). An unreadable or malformed
    /// existing record is an error, not a silent reset.
    pub async fn load(&self, user_id: &str) -> Result<UserProgress, PersistError> {
        let path = self.record_path(user_id);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(%user_id, "no save record, returning default template");
                let mut fresh = self.template.clone();
                fresh.user_id = user_id.to_string();
                Ok(fresh)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Persist a user's record, replacing any prior one.
    ///
    /// The file is pretty-printed UTF-8 with non-ASCII text kept verbatim,
    /// so save files stay human-diffable.
    pub async fn save(&self, progress: &UserProgress) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.record_path(&progress.user_id);
        // Pretty JSON keeps save files human-diffable; serde_json leaves
        // non-ASCII text unescaped.
        let content = serde_json::to_string_pretty(progress)?;
        fs::write(&path, content).await?;
        debug!(user_id = %progress.user_id, path = %path.display(), "progress saved");
        Ok(())
    }

    /// List the user IDs with a durable record, sorted. Unreadable files
    /// are skipped.
    pub async fn list_users(&self) -> Result<Vec<String>, PersistError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut users = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match fs::read_to_string(&path).await {
                    Ok(content) => match serde_json::from_str::<UserProgress>(&content) {
                        Ok(record) => users.push(record.user_id),
                        Err(err) => {
                            warn!(path = %path.display(), %err, "skipping malformed save record")
                        }
                    },
                    Err(err) => warn!(path = %path.display(), %err, "skipping unreadable save record"),
                }
            }
        }

        users.sort();
        Ok(users)
    }

    /// Path of the record for `user_id`. IDs are opaque caller-supplied
    /// strings, so non-alphanumeric characters are replaced before they
    /// reach the filesystem.
    fn record_path(&self, user_id: &str) -> PathBuf {
        let sanitized = user_id
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect::<String>();
        self.dir.join(format!("{sanitized}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::AdvanceEvent;
    use tempfile::TempDir;

    fn repo() -> (TempDir, SaveRepository) {
        let temp = TempDir::new().expect("temp dir");
        let repo = SaveRepository::new(temp.path().join("user"));
        (temp, repo)
    }

    #[tokio::test]
    async fn unknown_user_gets_a_stamped_template_without_a_durable_record() {
        let (temp, repo) = repo();

        let progress = repo.load("never_seen_user").await.expect("load");
        assert_eq!(progress.user_id, "never_seen_user");
        assert!(progress.progress.is_empty());
        assert!(progress.last_played_story.is_none());

        // Loading must not create a file.
        assert!(!temp.path().join("user/never_seen_user.json").exists());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_the_whole_record() {
        let (_temp, repo) = repo();

        let mut progress = repo.load("kai").await.expect("load");
        progress.advance(&AdvanceEvent {
            story_id: "花园".to_string(),
            chapter_id: 2,
            scene_id: 3,
            choice_made: Some(0),
        });
        repo.save(&progress).await.expect("save");

        let loaded = repo.load("kai").await.expect("reload");
        assert_eq!(loaded, progress);
    }

    #[tokio::test]
    async fn save_overwrites_the_prior_record_wholesale() {
        let (_temp, repo) = repo();

        let mut first = repo.load("kai").await.expect("load");
        first.advance(&AdvanceEvent {
            story_id: "s1".to_string(),
            chapter_id: 1,
            scene_id: 1,
            choice_made: Some(1),
        });
        repo.save(&first).await.expect("save");

        // A second writer that never saw the first save wins outright.
        let second = UserProgress::for_user("kai");
        repo.save(&second).await.expect("save");

        let loaded = repo.load("kai").await.expect("reload");
        assert_eq!(loaded, second);
        assert!(loaded.progress.is_empty());
    }

    #[tokio::test]
    async fn malformed_record_is_an_error_not_a_reset() {
        let (temp, repo) = repo();
        std::fs::create_dir_all(temp.path().join("user")).expect("mkdir");
        std::fs::write(temp.path().join("user/bad.json"), "{ not json").expect("write");

        let err = repo.load("bad").await.unwrap_err();
        assert!(matches!(err, PersistError::Json(_)));
    }

    #[tokio::test]
    async fn save_files_keep_non_ascii_text_readable() {
        let (temp, repo) = repo();

        let mut progress = UserProgress::for_user("guest");
        progress.advance(&AdvanceEvent {
            story_id: "星空下".to_string(),
            chapter_id: 1,
            scene_id: 1,
            choice_made: None,
        });
        repo.save(&progress).await.expect("save");

        let raw = std::fs::read_to_string(temp.path().join("user/guest.json")).expect("read");
        assert!(raw.contains("星空下"));
        assert!(!raw.contains("\\u"));
    }

    #[tokio::test]
    async fn user_ids_are_sanitized_for_path_use() {
        let (temp, repo) = repo();

        let progress = UserProgress::for_user("../sneaky/user");
        repo.save(&progress).await.expect("save");

        assert!(temp.path().join("user/___sneaky_user.json").exists());
        let loaded = repo.load("../sneaky/user").await.expect("load");
        assert_eq!(loaded.user_id, "../sneaky/user");
    }

    #[tokio::test]
    async fn list_users_reads_ids_from_the_records() {
        let (temp, repo) = repo();
        assert!(repo.list_users().await.expect("list").is_empty());

        repo.save(&UserProgress::for_user("beta")).await.expect("save");
        repo.save(&UserProgress::for_user("alpha")).await.expect("save");
        std::fs::write(temp.path().join("user/junk.json"), "{").expect("write");

        let users = repo.list_users().await.expect("list");
        assert_eq!(users, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn custom_template_seeds_first_time_users() {
        let (_temp, repo) = repo();

        let mut template = UserProgress::template();
        template.advance(&AdvanceEvent {
            story_id: "intro".to_string(),
            chapter_id: 1,
            scene_id: 1,
            choice_made: None,
        });
        let repo = repo.with_template(template);

        let progress = repo.load("fresh").await.expect("load");
        assert_eq!(progress.user_id, "fresh");
        assert!(progress.progress.contains_key("intro"));
    }
}
