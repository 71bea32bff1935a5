//! Core runtime data types: players, score buckets, behavior counters, log.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::persona::MbtiType;
use crate::tasks::{ScoreType, TaskCategory};

pub type PlayerId = String;

/// The three score buckets. Monotonically non-decreasing within a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub trust: u32,
    pub insight: u32,
    pub expression: u32,
}

impl Scores {
    pub fn bucket_mut(&mut self, score_type: ScoreType) -> &mut u32 {
        match score_type {
            ScoreType::Trust => &mut self.trust,
            ScoreType::Insight => &mut self.insight,
            ScoreType::Expression => &mut self.expression,
        }
    }

    pub fn bucket(&self, score_type: ScoreType) -> u32 {
        match score_type {
            ScoreType::Trust => self.trust,
            ScoreType::Insight => self.insight,
            ScoreType::Expression => self.expression,
        }
    }

    pub fn total(&self) -> u32 {
        self.trust + self.insight + self.expression
    }
}

/// Counters consumed only by the external report generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorStats {
    #[serde(default)]
    pub category_counts: HashMap<TaskCategory, u32>,
    #[serde(default)]
    pub cumulative_multiplier: f64,
    #[serde(default)]
    pub high_energy_events: u32,
    #[serde(default)]
    pub tasks_completed: u32,
    #[serde(default)]
    pub tasks_skipped: u32,
    /// How often this player pulled each other player in as a helper.
    #[serde(default)]
    pub helper_interactions: HashMap<PlayerId, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub is_bot: bool,
    pub mbti: MbtiType,
    pub position: usize,
    pub previous_position: Option<usize>,
    /// Progress through the 8-slot cognitive stack; hex board only.
    #[serde(default)]
    pub stack_index: usize,
    #[serde(default)]
    pub skip_used: u32,
    #[serde(default)]
    pub help_used: u32,
    #[serde(default)]
    pub total_rating_given: u32,
    #[serde(default)]
    pub scores: Scores,
    #[serde(default)]
    pub behavior: BehaviorStats,
}

impl Player {
    pub fn new(id: PlayerId, name: String, mbti: MbtiType, is_bot: bool) -> Self {
        Self {
            id,
            name,
            is_bot,
            mbti,
            position: 0,
            previous_position: None,
            stack_index: 0,
            skip_used: 0,
            help_used: 0,
            total_rating_given: 0,
            scores: Scores::default(),
            behavior: BehaviorStats::default(),
        }
    }
}

/// Append-only play log entry; recent entries feed the task generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub turn: u32,
    pub kind: String,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub payload: serde_json::Value,
}
