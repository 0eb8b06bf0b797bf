use std::fs;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::navigation::phase::{ConnectionStatus, PlayerRecord, QuizState};
use crate::navigation::resolver::PlayerFeed;

/// One update from the player feed or the quiz-phase feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedMessage {
    Player(PlayerRecord),
    Quiz(QuizState),
    Status(ConnectionStatus),
}

/// A line of a feed script: wait `after_ms`, then deliver `message`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub message: FeedMessage,
}

/// Parses a JSON-lines feed script. Blank lines and `#` comments are skipped.
pub fn parse_script(content: &str) -> Result<Vec<ScriptStep>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("feed script line {}", idx + 1))
        })
        .collect()
}

/// Replays a feed script on a background thread. The thread ends at the end
/// of the script or when the receiver is gone.
pub fn spawn_script(path: &Path, tx: Sender<FeedMessage>) -> Result<thread::JoinHandle<()>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed script {}", path.display()))?;
    let steps = parse_script(&content)?;
    debug!(steps = steps.len(), path = %path.display(), "replaying feed script");
    let handle = thread::spawn(move || {
        for step in steps {
            if step.after_ms > 0 {
                thread::sleep(Duration::from_millis(step.after_ms));
            }
            if tx.send(step.message).is_err() {
                return;
            }
        }
    });
    Ok(handle)
}

/// Player feed backed by a locally held record. A refetch re-delivers the
/// current record through the feed channel, as a real fetch would.
pub struct LocalPlayerFeed {
    record: PlayerRecord,
    tx: Sender<FeedMessage>,
    refetches: u64,
}

impl LocalPlayerFeed {
    pub fn new(record: PlayerRecord, tx: Sender<FeedMessage>) -> Self {
        Self {
            record,
            tx,
            refetches: 0,
        }
    }

    pub fn record(&self) -> PlayerRecord {
        self.record
    }

    /// Changes the record and publishes it.
    pub fn set_active(&mut self, is_active: bool) {
        self.record = PlayerRecord { is_active };
        self.publish();
    }

    pub fn refetches(&self) -> u64 {
        self.refetches
    }

    fn publish(&self) {
        if self.tx.send(FeedMessage::Player(self.record)).is_err() {
            warn!("player feed receiver closed");
        }
    }
}

impl PlayerFeed for LocalPlayerFeed {
    fn refetch(&mut self) {
        self.refetches += 1;
        self.publish();
    }
}
