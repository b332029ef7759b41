//! LocalSink against a real on-disk store and ledger.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use keepsake::{
    Author, CrossPostError, CrossPoster, ExternalRef, LocalSink, MediaStore, MomentLedger,
};
use shutter::{MediaBlob, MediaKind, Submission, SubmissionError, SubmissionSink};

#[derive(Default)]
struct RecordingPoster {
    posts: Mutex<Vec<String>>,
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl CrossPoster for RecordingPoster {
    async fn post_text(&self, text: &str) -> Result<ExternalRef, CrossPostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CrossPostError("service unavailable".to_string()));
        }
        self.posts.lock().unwrap().push(text.to_string());
        Ok(ExternalRef {
            uri: "at://did:plc:test/app.bsky.feed.post/3k".to_string(),
            cid: Some("bafy".to_string()),
        })
    }
}

struct Fixture {
    _dir: TempDir,
    media: Arc<MediaStore>,
    ledger: Arc<MomentLedger>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let media = Arc::new(MediaStore::open(dir.path().join("media")).unwrap());
        let ledger = Arc::new(MomentLedger::open(dir.path().join("moments.json")).unwrap());
        Self {
            _dir: dir,
            media,
            ledger,
        }
    }

    fn sink(&self) -> LocalSink {
        LocalSink::new(self.media.clone(), self.ledger.clone())
            .with_author(Author::new("u1", "River"))
    }
}

fn submission<'a>(media: &'a MediaBlob, caption: &'a str, cross_post: bool) -> Submission<'a> {
    Submission {
        caption,
        media,
        capture_seconds: 17,
        cross_post,
    }
}

#[tokio::test]
async fn test_submit_stores_media_and_moment() {
    let fx = Fixture::new();
    let sink = fx.sink();
    let blob = MediaBlob::new(Bytes::from_static(b"jpeg"), "image/jpeg");

    let id = sink.submit(submission(&blob, "first light", false)).await.unwrap();

    let moment = fx.ledger.get(id.as_str()).unwrap();
    assert_eq!(moment.caption, "first light");
    assert_eq!(moment.capture_seconds, 17);
    assert_eq!(moment.media_kind, MediaKind::Image);
    assert_eq!(moment.author.id, "u1");
    assert!(moment.cross_post_uri.is_none());
    assert_eq!(fx.media.get(&moment.media).unwrap().as_deref(), Some(&b"jpeg"[..]));

    // Persisted, not just in memory.
    let reopened = MomentLedger::open(fx.ledger.path()).unwrap();
    assert!(reopened.get(id.as_str()).is_some());
}

#[tokio::test]
async fn test_submit_without_author_is_unauthenticated() {
    let fx = Fixture::new();
    let sink = LocalSink::new(fx.media.clone(), fx.ledger.clone());
    let blob = MediaBlob::new(Bytes::from_static(b"webm"), "video/webm");

    let err = sink.submit(submission(&blob, "waves", false)).await.unwrap_err();
    assert_eq!(err, SubmissionError::Unauthenticated);
    assert!(fx.ledger.is_empty());
}

#[tokio::test]
async fn test_cross_post_records_uri() {
    let fx = Fixture::new();
    let poster = Arc::new(RecordingPoster::default());
    let sink = fx.sink().with_cross_poster(poster.clone());
    let blob = MediaBlob::new(Bytes::from_static(b"webm"), "video/webm");

    let id = sink.submit(submission(&blob, "waves", true)).await.unwrap();

    assert_eq!(poster.posts.lock().unwrap().as_slice(), ["waves"]);
    let moment = fx.ledger.get(id.as_str()).unwrap();
    assert_eq!(moment.media_kind, MediaKind::Video);
    assert_eq!(
        moment.cross_post_uri.as_deref(),
        Some("at://did:plc:test/app.bsky.feed.post/3k")
    );
}

#[tokio::test]
async fn test_cross_post_failure_keeps_moment() {
    let fx = Fixture::new();
    let poster = Arc::new(RecordingPoster {
        fail: true,
        ..RecordingPoster::default()
    });
    let sink = fx.sink().with_cross_poster(poster.clone());
    let blob = MediaBlob::new(Bytes::from_static(b"jpeg"), "image/jpeg");

    let id = sink.submit(submission(&blob, "still here", true)).await.unwrap();

    assert_eq!(poster.calls.load(Ordering::SeqCst), 1);
    let moment = fx.ledger.get(id.as_str()).unwrap();
    assert!(moment.cross_post_uri.is_none());
    assert_eq!(fx.ledger.recent(20).len(), 1);
}

#[tokio::test]
async fn test_no_cross_post_unless_requested() {
    let fx = Fixture::new();
    let poster = Arc::new(RecordingPoster::default());
    let sink = fx.sink().with_cross_poster(poster.clone());
    let blob = MediaBlob::new(Bytes::from_static(b"jpeg"), "image/jpeg");

    sink.submit(submission(&blob, "private", false)).await.unwrap();
    assert_eq!(poster.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_read_only_store_reports_storage_error() {
    let fx = Fixture::new();
    let media = Arc::new(MediaStore::open_read_only(fx.media.root()));
    let sink = LocalSink::new(media, fx.ledger.clone()).with_author(Author::new("u1", "River"));
    let blob = MediaBlob::new(Bytes::from_static(b"jpeg"), "image/jpeg");

    let err = sink.submit(submission(&blob, "nope", false)).await.unwrap_err();
    assert!(matches!(err, SubmissionError::Storage(_)));
    assert!(fx.ledger.is_empty());
}

#[tokio::test]
async fn test_unsaved_moment_is_rolled_back() {
    let fx = Fixture::new();
    let sink = fx.sink();
    let blob = MediaBlob::new(Bytes::from_static(b"jpeg"), "image/jpeg");

    // A directory where the ledger file belongs makes the rename fail.
    std::fs::create_dir(fx.ledger.path()).unwrap();
    let err = sink.submit(submission(&blob, "blocked", false)).await.unwrap_err();
    assert!(matches!(err, SubmissionError::Storage(_)));
    assert_eq!(fx.ledger.len(), 0);

    std::fs::remove_dir(fx.ledger.path()).unwrap();
    let id = sink.submit(submission(&blob, "blocked", false)).await.unwrap();
    assert_eq!(fx.ledger.len(), 1);

    let reopened = MomentLedger::open(fx.ledger.path()).unwrap();
    assert_eq!(reopened.len(), 1);
    assert!(reopened.get(id.as_str()).is_some());
}
