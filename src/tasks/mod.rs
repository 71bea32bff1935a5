//! Contract with the external task generator, plus the local fallback pool
//! used whenever the external call fails. Both paths return the same shape:
//! one task per category, every time.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use thiserror::Error;

use crate::persona::MbtiType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Standard,
    Truth,
    Dare,
    Deep,
}

pub const CATEGORIES: [TaskCategory; 4] = [
    TaskCategory::Standard,
    TaskCategory::Truth,
    TaskCategory::Dare,
    TaskCategory::Deep,
];

impl TaskCategory {
    pub fn code(self) -> &'static str {
        match self {
            TaskCategory::Standard => "standard",
            TaskCategory::Truth => "truth",
            TaskCategory::Dare => "dare",
            TaskCategory::Deep => "deep",
        }
    }
}

/// Which of a player's three score buckets a task pays into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    Trust,
    Insight,
    Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOption {
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    pub score_type: ScoreType,
    pub duration_seconds: u32,
    pub multiplier: f64,
}

/// One generated task per category for a single tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSet {
    pub standard: TaskOption,
    pub truth: TaskOption,
    pub dare: TaskOption,
    pub deep: TaskOption,
}

impl TaskSet {
    pub fn get(&self, category: TaskCategory) -> &TaskOption {
        match category {
            TaskCategory::Standard => &self.standard,
            TaskCategory::Truth => &self.truth,
            TaskCategory::Dare => &self.dare,
            TaskCategory::Deep => &self.deep,
        }
    }
}

/// Everything the generator may condition on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Face code of the tile being generated for: "Ni", "INTJ", "?".
    pub tile_code: String,
    pub acting_player: String,
    pub acting_mbti: MbtiType,
    pub player_names: Vec<String>,
    /// Recent play-log lines, newest last, for content variety.
    pub recent_logs: Vec<String>,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("task generator transport failed: {0}")]
    Transport(String),
    #[error("task generator returned malformed content: {0}")]
    Malformed(String),
}

pub type GenerateFuture = Pin<Box<dyn Future<Output = Result<TaskSet, GenerateError>> + Send>>;

/// Async task source. Implementations must not assume they are only called
/// once per tile: concurrent prefetch and landing fetches may overlap, and
/// whichever resolves last wins in the cache.
pub trait TaskGenerator: Send + Sync {
    fn generate(&self, request: TaskRequest) -> GenerateFuture;
}

/// Deterministic local pool. Always succeeds, so composing it behind any
/// flaky generator guarantees the game always has something playable.
pub struct FallbackPool;

struct Template {
    title: &'static str,
    description: &'static str,
}

const STANDARD_POOL: [Template; 3] = [
    Template {
        title: "Snapshot story",
        description: "Tell the group about the last photo you took and why it mattered.",
    },
    Template {
        title: "Hidden talent",
        description: "Show or describe one skill nobody at the table knows you have.",
    },
    Template {
        title: "Soundtrack",
        description: "Name the song you would play right now and sell it in three sentences.",
    },
];

const TRUTH_POOL: [Template; 3] = [
    Template {
        title: "Comfort zone",
        description: "Share a recent moment where you acted against your usual instincts.",
    },
    Template {
        title: "Unsent message",
        description: "Describe a message you typed out but never sent, and why.",
    },
    Template {
        title: "First impression",
        description: "Admit a first impression of someone here that turned out wrong.",
    },
];

const DARE_POOL: [Template; 3] = [
    Template {
        title: "Opposite hour",
        description: "For the rest of this round, answer every question as your opposite type.",
    },
    Template {
        title: "Dramatic reading",
        description: "Perform your most recent chat message as a dramatic monologue.",
    },
    Template {
        title: "Silent pitch",
        description: "Mime your current mood for 30 seconds while the group guesses.",
    },
];

const DEEP_POOL: [Template; 3] = [
    Template {
        title: "Growth edge",
        description: "Name one way this year has stretched you, and what it cost.",
    },
    Template {
        title: "Inherited habit",
        description: "Describe a habit you picked up from someone you love.",
    },
    Template {
        title: "Future letter",
        description: "Say one sentence you would want your future self to hear today.",
    },
];

impl FallbackPool {
    /// Build the four-category set for a request. Deterministic in the
    /// request so repeated fallbacks on the same tile agree.
    pub fn build(request: &TaskRequest) -> TaskSet {
        let mut hasher = DefaultHasher::new();
        request.tile_code.hash(&mut hasher);
        let pick = hasher.finish() as usize;

        TaskSet {
            standard: Self::option(
                TaskCategory::Standard,
                &STANDARD_POOL[pick % STANDARD_POOL.len()],
                ScoreType::Trust,
                60,
                1.0,
            ),
            truth: Self::option(
                TaskCategory::Truth,
                &TRUTH_POOL[pick % TRUTH_POOL.len()],
                ScoreType::Insight,
                90,
                1.2,
            ),
            dare: Self::option(
                TaskCategory::Dare,
                &DARE_POOL[pick % DARE_POOL.len()],
                ScoreType::Expression,
                60,
                1.2,
            ),
            deep: Self::option(
                TaskCategory::Deep,
                &DEEP_POOL[pick % DEEP_POOL.len()],
                ScoreType::Insight,
                120,
                1.5,
            ),
        }
    }

    fn option(
        category: TaskCategory,
        template: &Template,
        score_type: ScoreType,
        duration_seconds: u32,
        multiplier: f64,
    ) -> TaskOption {
        TaskOption {
            category,
            title: template.title.to_string(),
            description: template.description.to_string(),
            score_type,
            duration_seconds,
            multiplier,
        }
    }
}

impl TaskGenerator for FallbackPool {
    fn generate(&self, request: TaskRequest) -> GenerateFuture {
        Box::pin(async move { Ok(Self::build(&request)) })
    }
}
