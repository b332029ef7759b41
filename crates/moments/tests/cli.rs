//! The `moments` binary end to end, against a throwaway home directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Env {
    home: TempDir,
    config: PathBuf,
}

impl Env {
    /// Fast countdown so scripted takes finish in well under a second per tick.
    fn new(window_secs: u32, tick_ms: u64) -> Self {
        let home = TempDir::new().unwrap();
        let state = home.path().join("state");
        let config = home.path().join("moments.toml");
        std::fs::write(
            &config,
            format!(
                r#"
[paths]
state_dir = "{state}"
media_dir = "{state}/media"

[telemetry]
log_level = "warn"

[capture]
window_secs = {window_secs}
tick_ms = {tick_ms}
"#,
                state = state.display(),
            ),
        )
        .unwrap();
        Self { home, config }
    }

    fn media(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.home.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("moments").unwrap();
        for (key, _) in std::env::vars() {
            if key.starts_with("MOMENTS_") {
                cmd.env_remove(key);
            }
        }
        cmd.env_remove("RUST_LOG")
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join("xdg"))
            .env("MOMENTS_AUTHOR", "River")
            .arg("--config")
            .arg(&self.config);
        cmd
    }

    fn feed_json(&self) -> Vec<Value> {
        let output = self.cmd().args(["feed", "--json"]).output().unwrap();
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn capture(env: &Env, media: &Path) -> Command {
    let mut cmd = env.cmd();
    cmd.arg("capture").arg("--media").arg(media).arg("--yes");
    cmd
}

#[test]
fn config_shows_file_values() {
    let env = Env::new(45, 1000);
    env.cmd()
        .args(["config", "--sources"])
        .assert()
        .success()
        .stdout(predicate::str::contains("window_secs = 45"))
        .stdout(predicate::str::contains("# file:"))
        .stdout(predicate::str::contains("app_password").not());
}

#[test]
fn missing_config_file_is_an_error() {
    let env = Env::new(60, 1000);
    Command::cargo_bin("moments")
        .unwrap()
        .env("HOME", env.home.path())
        .args(["--config", "/definitely/not/here.toml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn empty_feed() {
    let env = Env::new(60, 1000);
    env.cmd()
        .arg("feed")
        .assert()
        .success()
        .stdout(predicate::str::contains("No moments yet"));
}

#[test]
fn scripted_photo_lands_in_feed() {
    let env = Env::new(60, 200);
    let still = env.media("pier.jpg", b"jpeg bytes");

    capture(&env, &still)
        .args(["--shoot-at", "2", "--caption", "  first light  "])
        .assert()
        .success()
        .stdout(predicate::str::contains("This is your one chance"))
        .stdout(predicate::str::contains("Moment shared"))
        .stdout(predicate::str::contains("Time's up").not());

    let feed = env.feed_json();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["caption"], "first light");
    assert_eq!(feed[0]["media_kind"], "image");
    assert_eq!(feed[0]["capture_seconds"], 2);
    assert_eq!(feed[0]["author"]["display_name"], "River");

    env.cmd()
        .arg("feed")
        .assert()
        .success()
        .stdout(predicate::str::contains("first light"));
}

#[test]
fn scripted_video_is_kept_when_window_closes() {
    let env = Env::new(3, 50);
    let clip = env.media("waves.webm", b"webm bytes");

    capture(&env, &clip)
        .args(["--mode", "video", "--shoot-at", "0", "--caption", "waves"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moment shared"));

    let feed = env.feed_json();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["media_kind"], "video");
    assert_eq!(feed[0]["capture_seconds"], 3);
}

#[test]
fn photo_never_taken_expires() {
    let env = Env::new(2, 20);
    let still = env.media("pier.jpg", b"jpeg bytes");

    capture(&env, &still)
        .args(["--caption", "too slow"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Time's up"));

    assert!(env.feed_json().is_empty());
}

#[test]
fn likes_and_comments_on_a_shared_moment() {
    let env = Env::new(60, 50);
    let still = env.media("pier.jpg", b"jpeg bytes");
    capture(&env, &still)
        .args(["--shoot-at", "0", "--caption", "harbour"])
        .assert()
        .success();

    let id = env.feed_json()[0]["id"].as_str().unwrap().to_string();
    let prefix = &id[..8];

    env.cmd()
        .args(["like", prefix])
        .assert()
        .success()
        .stdout(predicate::str::contains("Liked (1 like)"));
    env.cmd()
        .args(["like", prefix, "--author", "Sky"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Liked (2 likes)"));
    env.cmd()
        .args(["like", prefix])
        .assert()
        .success()
        .stdout(predicate::str::contains("Like removed (1 like)"));

    env.cmd()
        .args(["comment", prefix, "lovely", "light"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Comment added"));

    let feed = env.feed_json();
    assert_eq!(feed[0]["likes"], json!(["sky"]));
    assert_eq!(feed[0]["comments"][0]["content"], "lovely light");
    let comment_id = feed[0]["comments"][0]["id"].as_str().unwrap().to_string();

    env.cmd()
        .args(["uncomment", prefix, comment_id.as_str(), "--author", "Sky"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("belongs to someone else"));
    env.cmd()
        .args(["feed", "--comments"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lovely light"))
        .stdout(predicate::str::contains("1 like"));

    env.cmd()
        .args(["uncomment", prefix, comment_id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Comment deleted"));
    assert_eq!(env.feed_json()[0]["comments"], json!([]));
}

#[test]
fn like_unknown_moment_fails() {
    let env = Env::new(60, 1000);
    env.cmd()
        .args(["like", "0000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("moment not found"));
}

#[test]
fn missing_media_reports_no_camera() {
    let env = Env::new(60, 1000);

    capture(&env, &env.home.path().join("nothing.jpg"))
        .args(["--caption", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No camera found"));
}

#[test]
fn verify_without_password_explains_setup() {
    let env = Env::new(60, 1000);
    env.cmd()
        .env("MOMENTS_BLUESKY_HANDLE", "river.bsky.social")
        .args(["bluesky", "verify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MOMENTS_BLUESKY_APP_PASSWORD"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn verify_against_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": "did:plc:river",
            "handle": "river.bsky.social",
            "accessJwt": "access-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let env = Env::new(60, 1000);
    env.cmd()
        .env("MOMENTS_BLUESKY_SERVICE", server.uri())
        .env("MOMENTS_BLUESKY_HANDLE", "river.bsky.social")
        .env("MOMENTS_BLUESKY_APP_PASSWORD", "abcd-efgh-ijkl-mnop")
        .args(["bluesky", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Connected as @river.bsky.social"));
}
