//! The single mutable game-state aggregate. Owned by `TurnEngine`; every
//! mutation goes through an intent method there, never through external
//! writes.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::SystemTime;

use super::models::{BehaviorStats, LogEntry, Player, PlayerId, Scores};
use super::scoring::ReviewTally;
use crate::board::tiles::{Board, GameMode, ScoreModifier, SpecialAbility};
use crate::persona::MbtiType;
use crate::tasks::TaskOption;

/// Coarse session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Hub,
    Onboarding,
    Loading,
    Playing,
    Analysis,
}

/// Fine-grained turn sub-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubPhase {
    Idle,
    SelectingCard,
    ViewingTask,
    TaskExecution,
    PeerReview,
    SelectingScoreTarget,
    SelectingSubstitute,
    SelectingCompanion,
    ChoosingHelper,
}

/// Movement sub-mode. `remaining_steps > 0` and `Teleporting` are mutually
/// exclusive: a teleport is always a single unconstrained step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementState {
    Idle,
    Rolling,
    MovingStep,
    Teleporting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub mode: GameMode,
    pub board: Board,
    pub players: Vec<Player>,
    pub current_player: usize,
    /// Total player-turns taken, 1-based once play starts.
    pub turn: u32,
    /// Full cycles completed through the seating order.
    pub round: u32,
    pub phase: GamePhase,
    pub sub_phase: SubPhase,
    pub movement: MovementState,
    pub remaining_steps: u32,
    pub dice_value: Option<u8>,
    /// Fog-of-war radius for this turn; grid board only.
    pub sight_range: u8,
    /// Modifier/ability of the currently-occupied tile. The ability of a
    /// branch tile survives the follow-up teleport landing so scoring can
    /// still route by it.
    pub active_modifier: ScoreModifier,
    pub active_ability: SpecialAbility,
    pub helper: Option<PlayerId>,
    pub helper_voluntary: bool,
    pub score_target: Option<PlayerId>,
    pub review_queue: VecDeque<PlayerId>,
    pub review_tally: ReviewTally,
    pub current_task: Option<TaskOption>,
    pub task_seconds_left: u32,
    pub high_energy: bool,
    pub reselect_used: bool,
    pub transcript: Option<String>,
    pub evidence: Vec<String>,
    /// Legal move targets, recomputed after every transition that can
    /// change them. Empty outside movement.
    pub legal_moves: Vec<usize>,
    pub log: Vec<LogEntry>,
    pub started_at: Option<SystemTime>,
}

impl GameState {
    pub fn new(mode: GameMode) -> Self {
        Self {
            mode,
            board: Board::empty(mode),
            players: Vec::new(),
            current_player: 0,
            turn: 0,
            round: 0,
            phase: GamePhase::Hub,
            sub_phase: SubPhase::Idle,
            movement: MovementState::Idle,
            remaining_steps: 0,
            dice_value: None,
            sight_range: 0,
            active_modifier: ScoreModifier::Normal,
            active_ability: SpecialAbility::None,
            helper: None,
            helper_voluntary: false,
            score_target: None,
            review_queue: VecDeque::new(),
            review_tally: ReviewTally::default(),
            current_task: None,
            task_seconds_left: 0,
            high_energy: false,
            reselect_used: false,
            transcript: None,
            evidence: Vec::new(),
            legal_moves: Vec::new(),
            log: Vec::new(),
            started_at: None,
        }
    }

    pub fn current(&self) -> Option<&Player> {
        self.players.get(self.current_player)
    }

    pub fn current_mut(&mut self) -> Option<&mut Player> {
        self.players.get_mut(self.current_player)
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Head of the review queue: the only reviewer allowed to submit.
    pub fn pending_reviewer(&self) -> Option<&PlayerId> {
        self.review_queue.front()
    }

    pub fn push_log(&mut self, kind: &str, player_id: Option<PlayerId>, payload: serde_json::Value) {
        self.log.push(LogEntry {
            turn: self.turn,
            kind: kind.to_string(),
            player_id,
            payload,
        });
    }

    /// Newest-last log lines for the task generator.
    pub fn recent_log_lines(&self, count: usize) -> Vec<String> {
        self.log
            .iter()
            .rev()
            .take(count)
            .map(|e| match &e.player_id {
                Some(pid) => format!("turn {} {} {}", e.turn, pid, e.kind),
                None => format!("turn {} {}", e.turn, e.kind),
            })
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }
}

/// Frozen end-of-session snapshot backing the external report and share
/// flows. Round-trips losslessly through serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub mode: GameMode,
    pub started_at: Option<SystemTime>,
    pub rounds_played: u32,
    pub turns_taken: u32,
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub mbti: MbtiType,
    pub is_bot: bool,
    pub scores: Scores,
    pub total: u32,
    pub total_rating_given: u32,
    pub behavior: BehaviorStats,
}

impl GameSummary {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            mode: state.mode,
            started_at: state.started_at,
            rounds_played: state.round,
            turns_taken: state.turn,
            players: state
                .players
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    mbti: p.mbti,
                    is_bot: p.is_bot,
                    scores: p.scores,
                    total: p.scores.total(),
                    total_rating_given: p.total_rating_given,
                    behavior: p.behavior.clone(),
                })
                .collect(),
        }
    }
}
