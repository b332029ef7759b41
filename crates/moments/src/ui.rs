//! Terminal rendering shared by the commands.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use keepsake::{Comment, Moment};
use owo_colors::OwoColorize;
use shutter::{format_mmss, Urgency};

/// Countdown bar that fills as the window drains.
pub struct CountdownBar {
    bar: ProgressBar,
}

impl CountdownBar {
    pub fn new(window_secs: u32) -> Result<Self> {
        let bar = ProgressBar::new(u64::from(window_secs));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{bar:40.cyan/dim}] {msg}")?
                .progress_chars("█▓▒░ "),
        );
        bar.set_prefix("⏱");
        bar.set_message(format_mmss(window_secs));
        Ok(Self { bar })
    }

    pub fn update(&self, elapsed_secs: u32, remaining_secs: u32, urgency: Urgency) {
        self.bar.set_position(u64::from(elapsed_secs));
        let display = format_mmss(remaining_secs);
        let message = match urgency {
            Urgency::Calm => display.green().to_string(),
            Urgency::Warning => display.yellow().to_string(),
            Urgency::Critical => display.bright_red().bold().to_string(),
        };
        self.bar.set_message(message);
    }

    /// Print above the bar without tearing it.
    pub fn println(&self, line: impl AsRef<str>) {
        self.bar.println(line);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Enough of an id to name it on the command line.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// One feed row.
pub fn format_moment(moment: &Moment) -> String {
    let when = moment
        .created_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M");
    let mut line = format!(
        "{}  {}  {}  {} {}\n    {}\n    {} {}",
        short_id(&moment.id).yellow(),
        when.to_string().dimmed(),
        moment.author.display_name.bright_cyan(),
        moment.media_kind.as_str(),
        format!("at {}", format_mmss(moment.capture_seconds)).dimmed(),
        moment.caption,
        "♥".bright_red(),
        format!(
            "{} · {}",
            plural(moment.likes_count(), "like"),
            plural(moment.comments_count(), "comment")
        )
        .dimmed(),
    );
    if let Some(uri) = &moment.cross_post_uri {
        line.push_str(&format!("\n    {} {}", "↗".bright_blue(), uri.dimmed()));
    }
    line
}

pub fn format_comment(comment: &Comment) -> String {
    format!(
        "      {} {}: {}",
        short_id(&comment.id).dimmed(),
        comment.author.display_name.bright_cyan(),
        comment.content,
    )
}

pub fn success(message: impl AsRef<str>) {
    println!("{} {}", "✓".bright_green(), message.as_ref());
}

pub fn failure(message: impl AsRef<str>) {
    eprintln!("{} {}", "✗".bright_red(), message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake::{Author, MediaHash};

    #[test]
    fn test_moment_row_has_caption_and_link() {
        let mut moment = Moment::new(
            Author::new("river", "River"),
            "tide coming in",
            MediaHash::of(b"jpeg"),
            "image/jpeg",
            7,
        );
        moment.cross_post_uri = Some("at://did:plc:river/app.bsky.feed.post/1".to_string());

        let row = format_moment(&moment);
        assert!(row.contains("tide coming in"));
        assert!(row.contains("River"));
        assert!(row.contains("image"));
        assert!(row.contains("0:07"));
        assert!(row.contains("at://did:plc:river/app.bsky.feed.post/1"));
        assert!(row.contains(short_id(&moment.id)));
        assert!(row.contains("0 likes"));
    }

    #[test]
    fn test_counts_read_naturally() {
        assert_eq!(plural(1, "like"), "1 like");
        assert_eq!(plural(0, "comment"), "0 comments");
        assert_eq!(plural(3, "comment"), "3 comments");
        assert_eq!(short_id("abc"), "abc");
    }
}
