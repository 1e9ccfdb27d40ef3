use std::path::Path;

use serde::Serialize;

use crate::{env::Status, error::Result};

/// How an episode came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeEnd {
    /// The environment reached a terminal state
    Death,
    /// The step ceiling cut the episode short
    Truncated,
}

impl EpisodeEnd {
    /// **Returns** `None` while the episode is still running
    pub fn from_status(status: Status) -> Option<Self> {
        match status {
            Status::Running => None,
            Status::Terminated => Some(EpisodeEnd::Death),
            Status::Truncated => Some(EpisodeEnd::Truncated),
        }
    }
}

/// Summary of one finished episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpisodeReport {
    pub episode: usize,
    /// Game score at the end of the episode
    pub score: f64,
    pub steps: usize,
    /// Sum of undiscounted rewards
    pub reward: f32,
    pub outcome: EpisodeEnd,
}

/// Per-episode history of a training run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    episodes: Vec<EpisodeReport>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: EpisodeReport) {
        self.episodes.push(report);
    }

    pub fn episodes(&self) -> &[EpisodeReport] {
        &self.episodes
    }

    pub fn games_played(&self) -> usize {
        self.episodes.len()
    }

    pub fn best_score(&self) -> Option<f64> {
        self.episodes.iter().map(|r| r.score).reduce(f64::max)
    }

    /// Mean score over the last `n` episodes
    pub fn mean_score(&self, n: usize) -> Option<f64> {
        let recent = &self.episodes[self.episodes.len().saturating_sub(n)..];
        if recent.is_empty() {
            return None;
        }
        Some(recent.iter().map(|r| r.score).sum::<f64>() / recent.len() as f64)
    }

    pub fn truncations(&self) -> usize {
        self.episodes
            .iter()
            .filter(|r| r.outcome == EpisodeEnd::Truncated)
            .count()
    }

    /// Write `episode,score,steps,reward,outcome` rows with a header
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for report in &self.episodes {
            writer.serialize(report)?;
        }
        writer.flush()?;
        Ok(())
    }
}
