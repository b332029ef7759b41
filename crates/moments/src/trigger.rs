//! Shutter presses: Enter on the keyboard, or a fixed schedule for scripted runs.
//!
//! `pressed()` is cancel-safe. A keyboard read that loses a `select!` race
//! stays pending and is picked up by the next call.

use std::collections::VecDeque;
use std::io::BufRead;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

pub enum Trigger {
    Keyboard(LineReader),
    Scheduled(Schedule),
}

impl Trigger {
    pub fn keyboard() -> Self {
        Trigger::Keyboard(LineReader::default())
    }

    /// Presses at fixed offsets from the start of the countdown.
    pub fn scheduled(offsets: impl IntoIterator<Item = Duration>) -> Self {
        Trigger::Scheduled(Schedule {
            offsets: offsets.into_iter().collect(),
            deadlines: VecDeque::new(),
        })
    }

    /// Called when the countdown starts.
    pub fn arm(&mut self) {
        if let Trigger::Scheduled(schedule) = self {
            let now = Instant::now();
            schedule.deadlines = schedule.offsets.iter().map(|offset| now + *offset).collect();
        }
    }

    /// Resolves on the next press. Never resolves once a schedule is used up.
    pub async fn pressed(&mut self) {
        match self {
            Trigger::Keyboard(reader) => {
                // EOF or a read error reads as a press so stdin closing ends the take
                let _ = reader.next_line().await;
            }
            Trigger::Scheduled(schedule) => match schedule.deadlines.front() {
                Some(deadline) => {
                    tokio::time::sleep_until(*deadline).await;
                    schedule.deadlines.pop_front();
                }
                None => std::future::pending::<()>().await,
            },
        }
    }

    /// True when a keyboard read is still waiting for Enter.
    pub fn is_waiting(&self) -> bool {
        matches!(self, Trigger::Keyboard(reader) if reader.pending.is_some())
    }
}

pub struct Schedule {
    offsets: Vec<Duration>,
    deadlines: VecDeque<Instant>,
}

/// Line reads from stdin on a dedicated thread, one at a time.
#[derive(Default)]
pub struct LineReader {
    pending: Option<oneshot::Receiver<std::io::Result<String>>>,
}

impl LineReader {
    pub async fn next_line(&mut self) -> std::io::Result<String> {
        let rx = self.pending.get_or_insert_with(|| {
            let (tx, rx) = oneshot::channel();
            std::thread::spawn(move || {
                let mut line = String::new();
                let result = std::io::stdin().lock().read_line(&mut line).map(|_| line);
                let _ = tx.send(result);
            });
            rx
        });

        let result = rx.await;
        self.pending = None;
        match result {
            Ok(line) => line,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin reader stopped",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_at_offsets() {
        let mut trigger = Trigger::scheduled([Duration::from_secs(3), Duration::from_secs(8)]);
        let start = Instant::now();
        trigger.arm();

        trigger.pressed().await;
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        trigger.pressed().await;
        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_survives_lost_races() {
        let mut trigger = Trigger::scheduled([Duration::from_secs(5)]);
        let start = Instant::now();
        trigger.arm();

        // Lose the race to a 1s timer a few times, like countdown ticks would.
        for _ in 0..3 {
            tokio::select! {
                _ = trigger.pressed() => panic!("pressed too early"),
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
        }
        trigger.pressed().await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_schedule_never_fires() {
        let mut trigger = Trigger::scheduled([]);
        trigger.arm();
        let fired = tokio::time::timeout(Duration::from_secs(120), trigger.pressed()).await;
        assert!(fired.is_err());
        assert!(!trigger.is_waiting());
    }
}
