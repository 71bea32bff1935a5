//! Autonomous actors. A policy picks one action from a state snapshot; the
//! driver paces those actions through the same public intent methods a human
//! UI calls. The driver re-reads the current state before every action, so a
//! decision scheduled for a state that has already passed simply dissolves.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::state::{GamePhase, GameState, MovementState, SubPhase};
use super::turn::TurnEngine;
use crate::tasks::{TaskCategory, CATEGORIES};

/// One decided action, expressed in terms of the public intent surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotAction {
    Roll,
    SelectTile(usize),
    SelectCategory(TaskCategory),
    StartTask,
    CompleteTask,
    SubmitRating { reviewer: String, rating: u8 },
    SelectTarget(String),
}

pub trait BotPolicy: Send + Sync {
    /// Next action for whichever bot may act in `state`, or None when no
    /// bot has anything to do.
    fn decide(&self, state: &GameState, rng: &mut StdRng) -> Option<BotAction>;
}

/// The shipped table bot: uniform-random among legal moves and categories,
/// always performs its task, and rates generously.
pub struct PartyBotPolicy;

impl PartyBotPolicy {
    fn generous_rating(rng: &mut StdRng) -> u8 {
        // Mostly 4s and 5s, the occasional 3, never an abstain.
        match rng.gen_range(0..10) {
            0 => 3,
            1..=4 => 4,
            _ => 5,
        }
    }
}

impl BotPolicy for PartyBotPolicy {
    fn decide(&self, state: &GameState, rng: &mut StdRng) -> Option<BotAction> {
        if state.phase != GamePhase::Playing {
            return None;
        }

        // Peer review acts on the queue head, which may be a bot even when
        // the acting player is human.
        if state.sub_phase == SubPhase::PeerReview {
            let reviewer = state.pending_reviewer()?;
            if state.player(reviewer)?.is_bot {
                return Some(BotAction::SubmitRating {
                    reviewer: reviewer.clone(),
                    rating: Self::generous_rating(rng),
                });
            }
            return None;
        }

        let current = state.current()?;
        if !current.is_bot {
            return None;
        }

        match state.sub_phase {
            SubPhase::Idle => {
                if state.movement == MovementState::Teleporting || state.remaining_steps > 0 {
                    let target = state.legal_moves.choose(rng)?;
                    Some(BotAction::SelectTile(*target))
                } else if state.dice_value.is_none() {
                    Some(BotAction::Roll)
                } else {
                    None
                }
            }
            SubPhase::SelectingCard => {
                Some(BotAction::SelectCategory(*CATEGORIES.choose(rng)?))
            }
            SubPhase::ViewingTask => Some(BotAction::StartTask),
            SubPhase::TaskExecution => Some(BotAction::CompleteTask),
            SubPhase::SelectingSubstitute
            | SubPhase::SelectingCompanion
            | SubPhase::SelectingScoreTarget
            | SubPhase::ChoosingHelper => {
                let others: Vec<&String> = state
                    .players
                    .iter()
                    .filter(|p| p.id != current.id)
                    .map(|p| &p.id)
                    .collect();
                let pick = others.choose(rng)?;
                Some(BotAction::SelectTarget((*pick).clone()))
            }
            SubPhase::PeerReview => None,
        }
    }
}

/// Paces a policy against an engine until no bot action remains (a human
/// must act, or the session ended).
pub struct BotDriver {
    pub delay: Duration,
    rng: StdRng,
}

impl BotDriver {
    pub fn new(delay: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { delay, rng }
    }

    /// Apply one decided action through the public intent surface.
    pub async fn apply(&mut self, engine: &mut TurnEngine, action: BotAction) -> bool {
        match action {
            BotAction::Roll => engine.roll_dice(None),
            BotAction::SelectTile(index) => engine.select_tile(index),
            BotAction::SelectCategory(category) => engine.select_category(category).await,
            BotAction::StartTask => engine.start_task(),
            BotAction::CompleteTask => engine.complete_task(),
            BotAction::SubmitRating { reviewer, rating } => {
                engine.submit_rating(&reviewer, rating)
            }
            BotAction::SelectTarget(target) => engine.select_target(&target),
        }
    }

    /// Decide and apply at most one action. Returns whether a bot acted.
    /// The decision is made against the state as it is *now*, never against
    /// a state it was scheduled under.
    pub async fn step(&mut self, engine: &mut TurnEngine, policy: &dyn BotPolicy) -> bool {
        let Some(action) = policy.decide(engine.state(), &mut self.rng) else {
            return false;
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let applied = self.apply(engine, action.clone()).await;
        if !applied {
            tracing::debug!(?action, "bot action rejected by engine");
        }
        applied
    }

    /// Run bot actions until the table waits on a human (or the game is
    /// over).
    pub async fn run_until_human(&mut self, engine: &mut TurnEngine, policy: &dyn BotPolicy) {
        while self.step(engine, policy).await {}
    }
}
