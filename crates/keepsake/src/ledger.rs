//! MomentLedger: every shared moment, kept in one JSON file.
//!
//! Reads come from an in-memory map; `save()` rewrites the whole file
//! through a temp file and rename so a crash never leaves half a ledger.
//!
//! Likes and comments live on the moment they belong to. Each author likes a
//! moment at most once, and only a comment's author may delete it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shutter::MediaKind;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::hash::MediaHash;

/// Number of moments shown in a feed.
pub const DEFAULT_FEED_SIZE: usize = 20;

/// Who shared a moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub display_name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub id: String,
    pub author: Author,
    pub caption: String,
    pub media: MediaHash,
    pub media_kind: MediaKind,
    pub mime_type: String,
    /// Seconds into the window when the moment was captured.
    pub capture_seconds: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cross_post_uri: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    /// Ids of the authors who like this moment.
    #[serde(default)]
    pub likes: BTreeSet<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

fn default_published() -> bool {
    true
}

impl Moment {
    pub fn new(
        author: Author,
        caption: impl Into<String>,
        media: MediaHash,
        mime_type: impl Into<String>,
        capture_seconds: u32,
    ) -> Self {
        let mime_type = mime_type.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author,
            caption: caption.into(),
            media,
            media_kind: MediaKind::from_mime(&mime_type),
            mime_type,
            capture_seconds,
            created_at: Utc::now(),
            cross_post_uri: None,
            published: true,
            likes: BTreeSet::new(),
            comments: Vec::new(),
        }
    }

    pub fn likes_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comments_count(&self) -> usize {
        self.comments.len()
    }

    pub fn is_liked_by(&self, author_id: &str) -> bool {
        self.likes.contains(author_id)
    }

    /// Comments, newest first.
    pub fn recent_comments(&self) -> Vec<&Comment> {
        let mut comments: Vec<&Comment> = self.comments.iter().collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        comments
    }
}

#[derive(Debug)]
pub struct MomentLedger {
    path: PathBuf,
    moments: RwLock<HashMap<String, Moment>>,
}

impl MomentLedger {
    /// Load the ledger at `path`, or start empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let moments: Vec<Moment> = if path.exists() {
            let json = fs::read(&path).map_err(StoreError::io("read ledger", &path))?;
            serde_json::from_slice(&json).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?
        } else {
            Vec::new()
        };

        tracing::debug!(path = %path.display(), count = moments.len(), "moment ledger opened");
        Ok(Self {
            path,
            moments: RwLock::new(moments.into_iter().map(|m| (m.id.clone(), m)).collect()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert(&self, moment: Moment) {
        self.moments
            .write()
            .expect("ledger lock poisoned")
            .insert(moment.id.clone(), moment);
    }

    pub fn remove(&self, id: &str) -> Option<Moment> {
        self.moments
            .write()
            .expect("ledger lock poisoned")
            .remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Moment> {
        self.moments
            .read()
            .expect("ledger lock poisoned")
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.moments.read().expect("ledger lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Published moments, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Moment> {
        let mut moments: Vec<Moment> = self
            .moments
            .read()
            .expect("ledger lock poisoned")
            .values()
            .filter(|m| m.published)
            .cloned()
            .collect();
        moments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        moments.truncate(limit);
        moments
    }

    pub fn set_cross_post_uri(&self, id: &str, uri: impl Into<String>) -> Result<()> {
        let mut moments = self.moments.write().expect("ledger lock poisoned");
        let moment = moments
            .get_mut(id)
            .ok_or_else(|| StoreError::MomentNotFound(id.to_string()))?;
        moment.cross_post_uri = Some(uri.into());
        Ok(())
    }

    /// Find a moment id from the full id or an unambiguous prefix of it.
    pub fn resolve(&self, prefix: &str) -> Result<String> {
        let moments = self.moments.read().expect("ledger lock poisoned");
        if moments.contains_key(prefix) {
            return Ok(prefix.to_string());
        }
        let mut matches = moments.keys().filter(|id| !prefix.is_empty() && id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id.clone()),
            (Some(_), Some(_)) => Err(StoreError::AmbiguousId(prefix.to_string())),
            (None, _) => Err(StoreError::MomentNotFound(prefix.to_string())),
        }
    }

    /// Like the moment if `author` has not, otherwise take the like back.
    /// Returns whether the author now likes it.
    pub fn toggle_like(&self, moment_id: &str, author: &Author) -> Result<bool> {
        let mut moments = self.moments.write().expect("ledger lock poisoned");
        let moment = moments
            .get_mut(moment_id)
            .ok_or_else(|| StoreError::MomentNotFound(moment_id.to_string()))?;

        let liked = if moment.likes.remove(&author.id) {
            false
        } else {
            moment.likes.insert(author.id.clone());
            true
        };
        tracing::debug!(moment.id = %moment_id, author = %author.id, liked, "like toggled");
        Ok(liked)
    }

    /// Add a comment. Content is trimmed and must not be empty.
    pub fn add_comment(&self, moment_id: &str, author: &Author, content: &str) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::EmptyComment);
        }

        let mut moments = self.moments.write().expect("ledger lock poisoned");
        let moment = moments
            .get_mut(moment_id)
            .ok_or_else(|| StoreError::MomentNotFound(moment_id.to_string()))?;

        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.clone(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        moment.comments.push(comment.clone());
        tracing::debug!(moment.id = %moment_id, comment.id = %comment.id, "comment added");
        Ok(comment)
    }

    /// Delete one of `author`'s own comments.
    pub fn delete_comment(&self, moment_id: &str, comment_id: &str, author: &Author) -> Result<Comment> {
        let mut moments = self.moments.write().expect("ledger lock poisoned");
        let moment = moments
            .get_mut(moment_id)
            .ok_or_else(|| StoreError::MomentNotFound(moment_id.to_string()))?;

        let index = moment
            .comments
            .iter()
            .position(|c| c.id == comment_id || (comment_id.len() >= 4 && c.id.starts_with(comment_id)))
            .ok_or_else(|| StoreError::CommentNotFound(comment_id.to_string()))?;
        if moment.comments[index].author.id != author.id {
            return Err(StoreError::NotCommentAuthor(comment_id.to_string()));
        }
        Ok(moment.comments.remove(index))
    }

    /// Write the ledger to disk atomically.
    pub fn save(&self) -> Result<()> {
        let json = {
            let moments = self.moments.read().expect("ledger lock poisoned");
            let mut ordered: Vec<&Moment> = moments.values().collect();
            ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            serde_json::to_vec_pretty(&ordered).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(StoreError::io("create directory", parent))?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json).map_err(StoreError::io("write", &temp_path))?;
        fs::rename(&temp_path, &self.path).map_err(StoreError::io("rename", &self.path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn moment_at(caption: &str, minutes_ago: i64) -> Moment {
        let mut moment = Moment::new(
            Author::new("u1", "River"),
            caption,
            MediaHash::of(caption.as_bytes()),
            "image/jpeg",
            12,
        );
        moment.created_at = Utc::now() - Duration::minutes(minutes_ago);
        moment
    }

    #[test]
    fn test_media_kind_follows_mime() {
        let clip = Moment::new(
            Author::new("u1", "River"),
            "waves",
            MediaHash::of(b"clip"),
            "video/webm",
            40,
        );
        assert_eq!(clip.media_kind, MediaKind::Video);
        assert_eq!(moment_at("x", 0).media_kind, MediaKind::Image);
    }

    #[test]
    fn test_recent_is_newest_first_and_published_only() {
        let dir = TempDir::new().unwrap();
        let ledger = MomentLedger::open(dir.path().join("moments.json")).unwrap();

        ledger.insert(moment_at("oldest", 30));
        ledger.insert(moment_at("newest", 1));
        ledger.insert(moment_at("middle", 10));
        let mut hidden = moment_at("hidden", 0);
        hidden.published = false;
        ledger.insert(hidden);

        let captions: Vec<String> = ledger.recent(10).into_iter().map(|m| m.caption).collect();
        assert_eq!(captions, vec!["newest", "middle", "oldest"]);
        assert_eq!(ledger.recent(2).len(), 2);
    }

    #[test]
    fn test_save_and_reopen() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("moments.json");

        let ledger = MomentLedger::open(&path)?;
        let moment = moment_at("persisted", 5);
        let id = moment.id.clone();
        ledger.insert(moment);
        ledger.set_cross_post_uri(&id, "at://did:plc:abc/app.bsky.feed.post/1")?;
        ledger.save()?;

        assert!(!path.with_extension("tmp").exists());

        let reopened = MomentLedger::open(&path)?;
        let loaded = reopened.get(&id).unwrap();
        assert_eq!(loaded.caption, "persisted");
        assert_eq!(
            loaded.cross_post_uri.as_deref(),
            Some("at://did:plc:abc/app.bsky.feed.post/1")
        );
        Ok(())
    }

    fn ledger_with(moment: &Moment) -> (TempDir, MomentLedger) {
        let dir = TempDir::new().unwrap();
        let ledger = MomentLedger::open(dir.path().join("moments.json")).unwrap();
        ledger.insert(moment.clone());
        (dir, ledger)
    }

    #[test]
    fn test_one_like_per_author() -> Result<()> {
        let moment = moment_at("harbour", 2);
        let (_dir, ledger) = ledger_with(&moment);
        let river = Author::new("river", "River");
        let sky = Author::new("sky", "Sky");

        assert!(ledger.toggle_like(&moment.id, &river)?);
        assert!(ledger.toggle_like(&moment.id, &sky)?);
        let liked = ledger.get(&moment.id).unwrap();
        assert_eq!(liked.likes_count(), 2);
        assert!(liked.is_liked_by("river"));

        assert!(!ledger.toggle_like(&moment.id, &river)?);
        let unliked = ledger.get(&moment.id).unwrap();
        assert_eq!(unliked.likes_count(), 1);
        assert!(!unliked.is_liked_by("river"));
        Ok(())
    }

    #[test]
    fn test_comments_are_trimmed_and_only_deleted_by_their_author() -> Result<()> {
        let moment = moment_at("harbour", 2);
        let (_dir, ledger) = ledger_with(&moment);
        let river = Author::new("river", "River");
        let sky = Author::new("sky", "Sky");

        assert!(matches!(
            ledger.add_comment(&moment.id, &river, "   "),
            Err(StoreError::EmptyComment)
        ));

        let comment = ledger.add_comment(&moment.id, &river, "  lovely light  ")?;
        assert_eq!(comment.content, "lovely light");

        let err = ledger.delete_comment(&moment.id, &comment.id, &sky).unwrap_err();
        assert!(matches!(err, StoreError::NotCommentAuthor(_)));
        assert_eq!(ledger.get(&moment.id).unwrap().comments_count(), 1);

        ledger.delete_comment(&moment.id, &comment.id, &river)?;
        assert_eq!(ledger.get(&moment.id).unwrap().comments_count(), 0);
        assert!(matches!(
            ledger.delete_comment(&moment.id, &comment.id, &river),
            Err(StoreError::CommentNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_interactions_survive_reopen() -> Result<()> {
        let moment = moment_at("harbour", 2);
        let (dir, ledger) = ledger_with(&moment);
        let river = Author::new("river", "River");
        ledger.toggle_like(&moment.id, &river)?;
        ledger.add_comment(&moment.id, &river, "again tomorrow")?;
        ledger.save()?;

        let reopened = MomentLedger::open(dir.path().join("moments.json"))?;
        let loaded = reopened.get(&moment.id).unwrap();
        assert!(loaded.is_liked_by("river"));
        assert_eq!(loaded.recent_comments()[0].content, "again tomorrow");
        Ok(())
    }

    #[test]
    fn test_older_ledgers_load_without_interactions() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("moments.json");
        let mut json = serde_json::to_value(vec![moment_at("before likes", 3)]).unwrap();
        let record = json[0].as_object_mut().unwrap();
        record.remove("likes");
        record.remove("comments");
        fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

        let ledger = MomentLedger::open(&path)?;
        let moment = ledger.recent(1).remove(0);
        assert_eq!(moment.likes_count(), 0);
        assert_eq!(moment.comments_count(), 0);
        Ok(())
    }

    #[test]
    fn test_resolve_by_prefix() {
        let first = moment_at("one", 2);
        let (_dir, ledger) = ledger_with(&first);
        let mut second = moment_at("two", 1);
        second.id = format!("{}-twin", &first.id[..8]);
        ledger.insert(second.clone());

        assert_eq!(ledger.resolve(&first.id).unwrap(), first.id);
        assert_eq!(ledger.resolve(&second.id[..12]).unwrap(), second.id);
        assert!(matches!(
            ledger.resolve(&first.id[..8]),
            Err(StoreError::AmbiguousId(_))
        ));
        assert!(matches!(ledger.resolve("zzzz"), Err(StoreError::MomentNotFound(_))));
    }

    #[test]
    fn test_cross_post_uri_for_unknown_moment() {
        let dir = TempDir::new().unwrap();
        let ledger = MomentLedger::open(dir.path().join("moments.json")).unwrap();
        let err = ledger.set_cross_post_uri("missing", "at://x").unwrap_err();
        assert!(matches!(err, StoreError::MomentNotFound(_)));
    }
}
