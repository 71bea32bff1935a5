//! The turn state machine: one owner for the whole game state, mutated only
//! through intent methods. Humans (via UI events) and bots drive the exact
//! same entry points; there is no privileged automation API.
//!
//! Invalid transition attempts are benign no-ops that return `false`:
//! stray clicks and stale timers must never corrupt a turn.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::cache::{spawn_prefetch, TaskCache};
use super::models::{Player, PlayerId};
use super::scoring::{compute_awards, tension_multiplier, ReviewTally, ScoreContext};
use super::settings::BalanceSettings;
use super::state::{GamePhase, GameState, GameSummary, MovementState, SubPhase};
use crate::board::generator::generate_board;
use crate::board::pathfind::{legal_next_steps, reachable_in_steps, stack_advance, visible_tiles, MoveContext};
use crate::board::tiles::{GameMode, ScoreModifier, SpecialAbility, TileFace};
use crate::persona::MbtiType;
use crate::tasks::{FallbackPool, TaskCategory, TaskGenerator, TaskRequest};

/// Whether a step finished the move. Returned by the step application so
/// landing logic never re-reads the shared counter it just changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    Continue,
    Landed { via_teleport: bool },
}

pub struct TurnEngine {
    state: GameState,
    settings: BalanceSettings,
    cache: Arc<TaskCache>,
    generator: Arc<dyn TaskGenerator>,
    rng: StdRng,
    summary: Option<GameSummary>,
}

impl TurnEngine {
    pub fn new(
        mode: GameMode,
        settings: BalanceSettings,
        generator: Arc<dyn TaskGenerator>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state: GameState::new(mode),
            settings,
            cache: Arc::new(TaskCache::new()),
            generator,
            rng,
            summary: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn settings(&self) -> &BalanceSettings {
        &self.settings
    }

    /// Frozen once the session enters analysis.
    pub fn summary(&self) -> Option<&GameSummary> {
        self.summary.as_ref()
    }

    /// Fog-of-war view for the current player.
    pub fn visible_tiles(&self) -> Vec<usize> {
        match self.state.current() {
            Some(p) => visible_tiles(&self.state.board, p.position, self.state.sight_range),
            None => Vec::new(),
        }
    }

    // ── Pre-game ──

    pub fn add_player(&mut self, name: &str, mbti: MbtiType, is_bot: bool) -> Option<PlayerId> {
        if !matches!(self.state.phase, GamePhase::Hub | GamePhase::Onboarding) {
            return None;
        }
        let id = format!("p{}", self.state.players.len() + 1);
        self.state
            .players
            .push(Player::new(id.clone(), name.to_string(), mbti, is_bot));
        Some(id)
    }

    pub fn begin_onboarding(&mut self) -> bool {
        if self.state.phase != GamePhase::Hub {
            return false;
        }
        self.state.phase = GamePhase::Onboarding;
        true
    }

    /// Generate the board, scatter players onto random non-hub tiles, and
    /// open play.
    pub fn start_game(&mut self) -> bool {
        if !matches!(self.state.phase, GamePhase::Hub | GamePhase::Onboarding)
            || self.state.players.is_empty()
        {
            return false;
        }
        self.state.phase = GamePhase::Loading;

        let board = generate_board(self.state.mode, &self.settings.generation, &mut self.rng);
        let mut starts: Vec<usize> = board
            .tiles
            .iter()
            .filter(|t| !t.is_hub)
            .map(|t| t.index)
            .collect();
        starts.shuffle(&mut self.rng);
        for (i, player) in self.state.players.iter_mut().enumerate() {
            player.position = starts[i % starts.len()];
            player.previous_position = None;
        }
        self.state.board = board;

        self.state.phase = GamePhase::Playing;
        self.state.turn = 1;
        self.state.round = 1;
        self.state.current_player = 0;
        self.state.started_at = Some(std::time::SystemTime::now());
        self.state.push_log("game_started", None, serde_json::json!({
            "players": self.state.players.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            "mode": self.state.mode,
        }));
        tracing::info!(mode = ?self.state.mode, players = self.state.players.len(), "game started");
        true
    }

    // ── Turn lifecycle ──

    /// Roll the dice (or apply a host override), set this turn's step budget
    /// and sight range, and prefetch every tile reachable in exactly that
    /// many steps.
    pub fn roll_dice(&mut self, manual: Option<u8>) -> bool {
        if self.state.phase != GamePhase::Playing
            || self.state.sub_phase != SubPhase::Idle
            || self.state.movement != MovementState::Idle
            || self.state.remaining_steps > 0
            || self.state.dice_value.is_some()
        {
            tracing::debug!("roll ignored outside idle turn start");
            return false;
        }
        self.state.movement = MovementState::Rolling;

        let faces = self.settings.dice_faces.max(1);
        let value = manual
            .filter(|v| (1..=faces).contains(v))
            .unwrap_or_else(|| self.rng.gen_range(1..=faces));
        self.state.dice_value = Some(value);
        self.state.remaining_steps = value as u32;
        self.state.sight_range = match self.state.mode {
            GameMode::Mbti16 => self.rng.gen_range(1..=2),
            GameMode::Jung8 => 0,
        };
        self.state.movement = MovementState::Idle;

        let player_id = self.state.current().map(|p| p.id.clone());
        self.state.push_log("dice_rolled", player_id, serde_json::json!({
            "value": value,
            "sight_range": self.state.sight_range,
        }));
        tracing::info!(value, "dice rolled");

        let generation = self.cache.begin_turn();
        self.prefetch_reachable(generation, value as u32);
        self.recompute_legal_moves();
        true
    }

    /// Take one movement step (or the teleport step). Ignores tiles outside
    /// the current legal set.
    pub fn select_tile(&mut self, index: usize) -> bool {
        let moving = self.state.movement == MovementState::Teleporting
            || (self.state.movement == MovementState::Idle && self.state.remaining_steps > 0);
        if self.state.phase != GamePhase::Playing
            || self.state.sub_phase != SubPhase::Idle
            || !moving
            || !self.state.legal_moves.contains(&index)
        {
            tracing::debug!(tile = index, "tile selection ignored");
            return false;
        }

        let outcome = self.apply_step(index);
        match outcome {
            StepOutcome::Continue => {
                let generation = self.cache.generation();
                self.prefetch_reachable(generation, self.state.remaining_steps);
                self.recompute_legal_moves();
            }
            StepOutcome::Landed { via_teleport } => {
                self.resolve_landing(via_teleport);
            }
        }
        true
    }

    fn apply_step(&mut self, index: usize) -> StepOutcome {
        let via_teleport = self.state.movement == MovementState::Teleporting;
        let mode = self.state.mode;
        let face = self.state.board.tile(index).face;

        let Some(player) = self.state.current_mut() else {
            return StepOutcome::Continue;
        };
        player.previous_position = Some(player.position);
        player.position = index;
        if mode == GameMode::Jung8 {
            if let TileFace::Function(f) = face {
                let stack = player.mbti.cognitive_stack();
                player.stack_index = stack_advance(&stack, player.stack_index, f);
            }
        }
        let player_id = player.id.clone();

        self.state.push_log("step_taken", Some(player_id), serde_json::json!({
            "tile": index,
            "teleport": via_teleport,
        }));

        if via_teleport {
            self.state.movement = MovementState::Idle;
            self.state.remaining_steps = 0;
            return StepOutcome::Landed { via_teleport: true };
        }

        self.state.movement = MovementState::MovingStep;
        self.state.remaining_steps -= 1;
        self.state.movement = MovementState::Idle;
        if self.state.remaining_steps == 0 {
            StepOutcome::Landed {
                via_teleport: false,
            }
        } else {
            StepOutcome::Continue
        }
    }

    fn resolve_landing(&mut self, via_teleport: bool) {
        let position = match self.state.current() {
            Some(p) => p.position,
            None => return,
        };
        let tile = self.state.board.tile(position).clone();

        self.state.active_modifier = tile.modifier;
        if !via_teleport {
            // A teleport landing keeps the branch tile's ability so scoring
            // can still route by it.
            self.state.active_ability = tile.ability;
        }
        self.state.legal_moves.clear();
        tracing::info!(tile = position, modifier = ?tile.modifier, ability = ?tile.ability, "landed");

        let branch = !via_teleport
            && tile.ability != SpecialAbility::None
            && (tile.face.is_wildcard() || tile.is_hub);
        if branch {
            match tile.ability {
                SpecialAbility::Freedom => self.enter_teleport(),
                SpecialAbility::Substitute if self.state.players.len() > 1 => {
                    self.state.sub_phase = SubPhase::SelectingSubstitute;
                }
                SpecialAbility::Companion if self.state.players.len() > 1 => {
                    self.state.sub_phase = SubPhase::SelectingCompanion;
                }
                // Helper abilities without another player degrade to a
                // plain teleport.
                SpecialAbility::Substitute | SpecialAbility::Companion => self.enter_teleport(),
                SpecialAbility::None => unreachable!(),
            }
            return;
        }

        self.state.sub_phase = SubPhase::SelectingCard;
        let generation = self.cache.generation();
        let request = self.build_request(position);
        spawn_prefetch(&self.cache, &self.generator, generation, vec![(position, request)]);
    }

    fn enter_teleport(&mut self) {
        self.state.movement = MovementState::Teleporting;
        self.state.remaining_steps = 0;
        self.recompute_legal_moves();
    }

    /// Pick a task category for the landed tile. Cache hits resolve
    /// instantly; misses fetch live, falling back to the local pool on any
    /// generator failure.
    pub async fn select_category(&mut self, category: TaskCategory) -> bool {
        if self.state.sub_phase != SubPhase::SelectingCard {
            return false;
        }
        let position = match self.state.current() {
            Some(p) => p.position,
            None => return false,
        };

        let set = match self.cache.get(position) {
            Some(set) => set,
            None => {
                let request = self.build_request(position);
                let set = match self.generator.generate(request.clone()).await {
                    Ok(set) => set,
                    Err(e) => {
                        tracing::warn!(error = %e, "live task fetch failed, using fallback pool");
                        FallbackPool::build(&request)
                    }
                };
                self.cache.insert(self.cache.generation(), position, set.clone());
                set
            }
        };

        let task = set.get(category).clone();
        self.state.task_seconds_left = task.duration_seconds;
        let player_id = self.state.current().map(|p| p.id.clone());
        self.state.push_log("task_selected", player_id, serde_json::json!({
            "category": category,
            "title": task.title,
        }));
        self.state.current_task = Some(task);
        self.state.sub_phase = SubPhase::ViewingTask;
        true
    }

    /// One free task re-pick per turn.
    pub fn reselect_category(&mut self) -> bool {
        if self.state.sub_phase != SubPhase::ViewingTask || self.state.reselect_used {
            return false;
        }
        self.state.reselect_used = true;
        self.state.current_task = None;
        self.state.sub_phase = SubPhase::SelectingCard;
        true
    }

    /// Give up on the task; the turn ends with no scoring.
    pub fn skip_task(&mut self) -> bool {
        if self.state.sub_phase != SubPhase::ViewingTask {
            return false;
        }
        if let Some(player) = self.state.current_mut() {
            player.skip_used += 1;
            player.behavior.tasks_skipped += 1;
        }
        let player_id = self.state.current().map(|p| p.id.clone());
        self.state.push_log("task_skipped", player_id, serde_json::json!({}));
        self.advance_turn();
        true
    }

    /// Ask another player for help, bounded per game. Movement is not
    /// affected; rewards split at scoring time.
    pub fn request_help(&mut self) -> bool {
        let within_limit = self
            .state
            .current()
            .map(|p| p.help_used < self.settings.help_limit)
            .unwrap_or(false);
        if self.state.sub_phase != SubPhase::ViewingTask
            || !within_limit
            || self.state.helper.is_some()
            || self.state.players.len() < 2
        {
            return false;
        }
        self.state.sub_phase = SubPhase::ChoosingHelper;
        true
    }

    /// Bind the pending player choice: a voluntary helper, an ability
    /// helper, or a CLONE/TRANSFER score target.
    pub fn select_target(&mut self, target: &str) -> bool {
        let valid_target = self.state.player(target).is_some()
            && self.state.current().map(|p| p.id.as_str()) != Some(target);
        if !valid_target {
            tracing::debug!(player = target, "target selection ignored");
            return false;
        }

        match self.state.sub_phase {
            SubPhase::ChoosingHelper => {
                self.state.helper = Some(target.to_string());
                self.state.helper_voluntary = true;
                if let Some(player) = self.state.current_mut() {
                    player.help_used += 1;
                }
                self.state.sub_phase = SubPhase::ViewingTask;
                true
            }
            SubPhase::SelectingSubstitute | SubPhase::SelectingCompanion => {
                self.state.helper = Some(target.to_string());
                self.state.helper_voluntary = false;
                self.state.sub_phase = SubPhase::Idle;
                let player_id = self.state.current().map(|p| p.id.clone());
                self.state.push_log("helper_chosen", player_id, serde_json::json!({
                    "helper": target,
                }));
                self.enter_teleport();
                true
            }
            SubPhase::SelectingScoreTarget => {
                self.state.score_target = Some(target.to_string());
                self.finalize_scoring();
                true
            }
            _ => false,
        }
    }

    pub fn start_task(&mut self) -> bool {
        if self.state.sub_phase != SubPhase::ViewingTask || self.state.current_task.is_none() {
            return false;
        }
        let seconds = self
            .state
            .current_task
            .as_ref()
            .map(|t| t.duration_seconds)
            .unwrap_or(0);
        self.state.task_seconds_left = seconds;
        self.state.high_energy = false;
        self.state.sub_phase = SubPhase::TaskExecution;
        let player_id = self.state.current().map(|p| p.id.clone());
        self.state.push_log("task_started", player_id, serde_json::json!({
            "seconds": seconds,
        }));
        true
    }

    /// One countdown second. Reaching zero force-completes through the same
    /// path as a manual completion.
    pub fn tick(&mut self) -> bool {
        if self.state.sub_phase != SubPhase::TaskExecution {
            return false;
        }
        self.state.task_seconds_left = self.state.task_seconds_left.saturating_sub(1);
        if self.state.task_seconds_left == 0 {
            self.complete_task();
        }
        true
    }

    /// External audio-level signal crossed its threshold during execution.
    pub fn note_high_energy(&mut self) -> bool {
        if self.state.sub_phase != SubPhase::TaskExecution || self.state.high_energy {
            return false;
        }
        self.state.high_energy = true;
        if let Some(player) = self.state.current_mut() {
            player.behavior.high_energy_events += 1;
        }
        true
    }

    /// Attach execution evidence (opaque to scoring) and complete.
    pub fn finalize_execution(&mut self, transcript: &str, evidence: Vec<String>) -> bool {
        if self.state.sub_phase != SubPhase::TaskExecution {
            return false;
        }
        self.state.transcript = Some(transcript.to_string());
        self.state.evidence = evidence;
        self.complete_task()
    }

    /// End execution and open peer review. With nobody else at the table the
    /// rating is automatically perfect.
    pub fn complete_task(&mut self) -> bool {
        if self.state.sub_phase != SubPhase::TaskExecution {
            return false;
        }
        let actor = match self.state.current() {
            Some(p) => p.id.clone(),
            None => return false,
        };
        let n = self.state.players.len();
        let start = self.state.current_player;
        let queue: std::collections::VecDeque<PlayerId> = (1..n)
            .map(|offset| self.state.players[(start + offset) % n].id.clone())
            .collect();
        self.state.review_queue = queue;
        self.state.review_tally = ReviewTally::default();
        self.state.push_log("task_completed", Some(actor), serde_json::json!({}));

        if self.state.review_queue.is_empty() {
            self.state.review_tally = ReviewTally::perfect();
            self.proceed_after_review();
        } else {
            self.state.sub_phase = SubPhase::PeerReview;
        }
        true
    }

    /// Submit a 1–5 star rating, or 0 to abstain. Only the head of the
    /// review queue may submit; everyone else is ignored.
    pub fn submit_rating(&mut self, reviewer: &str, rating: u8) -> bool {
        if self.state.sub_phase != SubPhase::PeerReview
            || rating > 5
            || self.state.pending_reviewer().map(String::as_str) != Some(reviewer)
        {
            tracing::debug!(reviewer, rating, "rating ignored");
            return false;
        }
        self.state.review_tally.record(rating);
        if let Some(p) = self.state.player_mut(reviewer) {
            p.total_rating_given += rating as u32;
        }
        self.state.review_queue.pop_front();
        self.state.push_log("rating_submitted", Some(reviewer.to_string()), serde_json::json!({
            "rating": rating,
        }));

        if self.state.review_queue.is_empty() {
            self.proceed_after_review();
        }
        true
    }

    /// Close the session early. Also called automatically once the round
    /// budget is exhausted.
    pub fn end_game(&mut self) -> bool {
        if self.state.phase != GamePhase::Playing {
            return false;
        }
        self.finish_session();
        true
    }

    // ── Internals ──

    fn proceed_after_review(&mut self) {
        let needs_target = matches!(
            self.state.active_modifier,
            ScoreModifier::Clone | ScoreModifier::Transfer
        ) && self.state.score_target.is_none()
            && self.state.players.len() > 1;
        if needs_target {
            self.state.sub_phase = SubPhase::SelectingScoreTarget;
        } else {
            self.finalize_scoring();
        }
    }

    fn finalize_scoring(&mut self) {
        let Some(task) = self.state.current_task.clone() else {
            self.advance_turn();
            return;
        };
        let Some(actor) = self.state.current() else {
            self.advance_turn();
            return;
        };
        let tile = self.state.board.tile(actor.position);
        let tension = tension_multiplier(actor.mbti, tile, self.state.mode);

        let ctx = ScoreContext {
            actor: actor.id.clone(),
            modifier: self.state.active_modifier,
            ability: self.state.active_ability,
            helper: self.state.helper.clone(),
            helper_voluntary: self.state.helper_voluntary,
            target: self.state.score_target.clone(),
            tension,
            high_energy: self.state.high_energy,
            high_energy_bonus: self.settings.high_energy_bonus,
        };
        let awards = compute_awards(&task, &self.state.review_tally, &ctx);

        for award in &awards {
            if let Some(p) = self.state.player_mut(&award.player) {
                *p.scores.bucket_mut(award.score_type) += award.points;
            }
        }

        let helper = self.state.helper.clone();
        if let Some(actor) = self.state.current_mut() {
            *actor.behavior.category_counts.entry(task.category).or_insert(0) += 1;
            actor.behavior.cumulative_multiplier += task.multiplier;
            actor.behavior.tasks_completed += 1;
            if let Some(helper) = helper {
                *actor.behavior.helper_interactions.entry(helper).or_insert(0) += 1;
            }
        }

        tracing::info!(?awards, "task scored");
        self.state.push_log(
            "task_scored",
            self.state.current().map(|p| p.id.clone()),
            serde_json::to_value(&awards).unwrap_or_default(),
        );
        self.advance_turn();
    }

    fn advance_turn(&mut self) {
        self.state.sub_phase = SubPhase::Idle;
        self.state.movement = MovementState::Idle;
        self.state.remaining_steps = 0;
        self.state.dice_value = None;
        self.state.active_modifier = ScoreModifier::Normal;
        self.state.active_ability = SpecialAbility::None;
        self.state.helper = None;
        self.state.helper_voluntary = false;
        self.state.score_target = None;
        self.state.review_queue.clear();
        self.state.review_tally = ReviewTally::default();
        self.state.current_task = None;
        self.state.task_seconds_left = 0;
        self.state.high_energy = false;
        self.state.reselect_used = false;
        self.state.transcript = None;
        self.state.evidence.clear();
        self.state.legal_moves.clear();

        if self.state.players.is_empty() {
            return;
        }
        self.state.current_player = (self.state.current_player + 1) % self.state.players.len();
        if self.state.current_player == 0 {
            self.state.round += 1;
            if self.state.round > self.settings.rounds {
                self.finish_session();
                return;
            }
        }
        self.state.turn += 1;
        let player_id = self.state.current().map(|p| p.id.clone());
        self.state.push_log("turn_started", player_id, serde_json::json!({
            "round": self.state.round,
        }));
    }

    fn finish_session(&mut self) {
        self.state.phase = GamePhase::Analysis;
        self.state.sub_phase = SubPhase::Idle;
        self.state.movement = MovementState::Idle;
        // Completed rounds, not the one that was in progress.
        self.state.round = self.state.round.saturating_sub(1);
        self.summary = Some(GameSummary::from_state(&self.state));
        self.state.push_log("game_ended", None, serde_json::json!({}));
        tracing::info!("session closed, summary frozen");
    }

    fn recompute_legal_moves(&mut self) {
        let Some(player) = self.state.current() else {
            self.state.legal_moves.clear();
            return;
        };
        let movable = self.state.movement == MovementState::Teleporting
            || (self.state.movement == MovementState::Idle
                && self.state.remaining_steps > 0
                && self.state.sub_phase == SubPhase::Idle);
        if !movable {
            self.state.legal_moves.clear();
            return;
        }
        let stack = player.mbti.cognitive_stack();
        let ctx = MoveContext {
            position: player.position,
            previous: player.previous_position,
            teleporting: self.state.movement == MovementState::Teleporting,
            stack: &stack,
            stack_index: player.stack_index,
        };
        self.state.legal_moves = legal_next_steps(&self.state.board, &ctx);
    }

    fn prefetch_reachable(&mut self, generation: u64, steps: u32) {
        let Some(player) = self.state.current() else {
            return;
        };
        let stack = player.mbti.cognitive_stack();
        let ctx = MoveContext {
            position: player.position,
            previous: player.previous_position,
            teleporting: false,
            stack: &stack,
            stack_index: player.stack_index,
        };
        let tiles = reachable_in_steps(&self.state.board, &ctx, steps);
        let requests: Vec<(usize, TaskRequest)> = tiles
            .into_iter()
            .map(|tile| (tile, self.build_request(tile)))
            .collect();
        spawn_prefetch(&self.cache, &self.generator, generation, requests);
    }

    fn build_request(&self, tile: usize) -> TaskRequest {
        let (acting_player, acting_mbti) = match self.state.current() {
            Some(p) => (p.name.clone(), p.mbti),
            None => (String::new(), MbtiType::Intj),
        };
        TaskRequest {
            tile_code: self.state.board.tile(tile).face.code(),
            acting_player,
            acting_mbti,
            player_names: self.state.players.iter().map(|p| p.name.clone()).collect(),
            recent_logs: self.state.recent_log_lines(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tiles::{Board, Tile};
    use crate::persona::CognitiveFn;
    use crate::tasks::{GenerateError, GenerateFuture};

    fn tile(index: usize, q: i32, r: i32, face: TileFace) -> Tile {
        Tile {
            index,
            face,
            character_name: None,
            modifier: ScoreModifier::Normal,
            ability: SpecialAbility::None,
            q,
            r,
            zone: None,
            is_hub: false,
        }
    }

    /// Engine over a hand-built board, mid-play, with seeded RNG.
    fn engine_with_board(board: Board, players: Vec<Player>) -> TurnEngine {
        let mode = board.mode;
        let mut state = GameState::new(mode);
        state.board = board;
        state.players = players;
        state.phase = GamePhase::Playing;
        state.turn = 1;
        state.round = 1;
        TurnEngine {
            state,
            settings: BalanceSettings::default(),
            cache: Arc::new(TaskCache::new()),
            generator: Arc::new(FallbackPool),
            rng: StdRng::seed_from_u64(1),
            summary: None,
        }
    }

    fn player_at(id: &str, mbti: MbtiType, position: usize) -> Player {
        let mut p = Player::new(id.into(), id.to_uppercase(), mbti, false);
        p.position = position;
        p
    }

    /// INTJ walking line: start → Te → Fi → Se. The Se tile is DOUBLE.
    fn intj_line_board() -> Board {
        use CognitiveFn::*;
        let mut tiles = vec![
            tile(0, 0, 0, TileFace::Wildcard),
            tile(1, 1, 0, TileFace::Function(Te)),
            tile(2, 2, 0, TileFace::Function(Fi)),
            tile(3, 3, 0, TileFace::Function(Se)),
        ];
        tiles[3].modifier = ScoreModifier::Double;
        Board::new(GameMode::Jung8, tiles)
    }

    #[test]
    fn test_pregame_lifecycle() {
        let mut engine = TurnEngine::new(
            GameMode::Jung8,
            BalanceSettings::default(),
            Arc::new(FallbackPool),
            Some(42),
        );
        assert!(engine.add_player("Alex", MbtiType::Intj, false).is_some());
        assert!(engine.begin_onboarding());
        assert!(engine.add_player("Riley", MbtiType::Esfp, true).is_some());
        assert!(!engine.roll_dice(None), "cannot roll before play starts");
        assert!(engine.start_game());

        let s = engine.state();
        assert_eq!(s.phase, GamePhase::Playing);
        assert_eq!(s.turn, 1);
        assert_eq!(s.board.len(), 61);
        for p in &s.players {
            assert!(!s.board.tile(p.position).is_hub);
        }
        assert!(!engine.start_game(), "start is one-shot");
    }

    #[test]
    fn test_roll_sets_budget_and_legal_moves() {
        let board = intj_line_board();
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);
        assert!(engine.roll_dice(Some(3)));
        assert_eq!(engine.state().dice_value, Some(3));
        assert_eq!(engine.state().remaining_steps, 3);
        assert_eq!(engine.state().legal_moves, vec![1]);
        assert!(!engine.roll_dice(Some(2)), "double roll ignored");
    }

    #[test]
    fn test_manual_roll_out_of_range_rerolls() {
        let board = intj_line_board();
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);
        assert!(engine.roll_dice(Some(99)));
        let v = engine.state().dice_value.unwrap();
        assert!((1..=8).contains(&v));
    }

    #[test]
    fn test_illegal_tile_click_is_noop() {
        let board = intj_line_board();
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);
        engine.roll_dice(Some(2));
        assert!(!engine.select_tile(3), "tile 3 is not adjacent");
        assert_eq!(engine.state().remaining_steps, 2);
        assert_eq!(engine.state().players[0].position, 0);
    }

    #[tokio::test]
    async fn test_end_to_end_inferior_function_dare() {
        let board = intj_line_board();
        let players = vec![
            player_at("p1", MbtiType::Intj, 0),
            player_at("p2", MbtiType::Enfp, 0),
            player_at("p3", MbtiType::Istp, 0),
        ];
        let mut engine = engine_with_board(board, players);

        assert!(engine.roll_dice(Some(3)));
        assert!(engine.select_tile(1));
        assert_eq!(engine.state().players[0].stack_index, 1);
        assert!(engine.select_tile(2));
        assert_eq!(engine.state().players[0].stack_index, 2);
        assert!(engine.select_tile(3));
        assert_eq!(engine.state().players[0].stack_index, 3);

        assert_eq!(engine.state().sub_phase, SubPhase::SelectingCard);
        assert_eq!(engine.state().active_modifier, ScoreModifier::Double);
        assert_eq!(engine.state().remaining_steps, 0);

        assert!(engine.select_category(TaskCategory::Dare).await);
        assert_eq!(engine.state().sub_phase, SubPhase::ViewingTask);
        assert!(engine.start_task());
        assert!(engine.complete_task());
        assert_eq!(engine.state().sub_phase, SubPhase::PeerReview);

        // Queue order is seating order after the actor: p2 then p3.
        assert!(!engine.submit_rating("p3", 5), "p3 cannot jump the queue");
        assert!(engine.submit_rating("p2", 4));
        assert!(engine.submit_rating("p3", 5));

        // Dare ×1.2, avg 4.5, tension ×1.5 (inferior Se), DOUBLE:
        // ceil(4.5*1.2*2)=11 → ceil(11*1.5)=17 → 34 expression.
        let p1 = engine.state().player("p1").unwrap();
        assert_eq!(p1.scores.expression, 34);
        assert_eq!(p1.scores.trust, 0);
        assert_eq!(engine.state().current_player, 1);
        assert_eq!(engine.state().turn, 2);
        assert_eq!(engine.state().sub_phase, SubPhase::Idle);
        assert_eq!(engine.state().dice_value, None);
    }

    #[tokio::test]
    async fn test_solo_player_gets_automatic_perfect_rating() {
        let board = intj_line_board();
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);
        engine.roll_dice(Some(1));
        engine.select_tile(1);
        assert!(engine.select_category(TaskCategory::Standard).await);
        engine.start_task();
        engine.complete_task();
        // Standard ×1.0: ceil(5*1*2) = 10 trust, no review phase.
        assert_eq!(engine.state().player("p1").unwrap().scores.trust, 10);
        assert_eq!(engine.state().turn, 2);
    }

    #[tokio::test]
    async fn test_abstains_do_not_drag_average() {
        let board = intj_line_board();
        let players = vec![
            player_at("p1", MbtiType::Intj, 0),
            player_at("p2", MbtiType::Enfp, 0),
            player_at("p3", MbtiType::Istp, 0),
        ];
        let mut engine = engine_with_board(board, players);
        engine.roll_dice(Some(1));
        engine.select_tile(1);
        engine.select_category(TaskCategory::Standard).await;
        engine.start_task();
        engine.complete_task();
        assert!(engine.submit_rating("p2", 0), "abstain is a valid submission");
        assert!(engine.submit_rating("p3", 4));
        // Average is 4, not 2: ceil(4*1*2) = 8.
        assert_eq!(engine.state().player("p1").unwrap().scores.trust, 8);
    }

    #[tokio::test]
    async fn test_freedom_ability_teleports() {
        use CognitiveFn::*;
        let mut tiles = vec![
            tile(0, 0, 0, TileFace::Function(Ni)),
            tile(1, 1, 0, TileFace::Wildcard),
            tile(2, 2, 0, TileFace::Function(Se)),
            tile(3, 3, 0, TileFace::Function(Te)),
        ];
        tiles[1].ability = SpecialAbility::Freedom;
        let board = Board::new(GameMode::Jung8, tiles);
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);

        engine.roll_dice(Some(1));
        assert!(engine.select_tile(1));
        assert_eq!(engine.state().movement, MovementState::Teleporting);
        assert_eq!(engine.state().sub_phase, SubPhase::Idle);
        // Teleport reaches any non-hub tile except the current one.
        let mut legal = engine.state().legal_moves.clone();
        legal.sort_unstable();
        assert_eq!(legal, vec![0, 2, 3]);

        assert!(engine.select_tile(3));
        assert_eq!(engine.state().movement, MovementState::Idle);
        assert_eq!(engine.state().remaining_steps, 0);
        // The landing runs normal task flow; no ability re-trigger.
        assert_eq!(engine.state().sub_phase, SubPhase::SelectingCard);

        engine.select_category(TaskCategory::Truth).await;
        engine.start_task();
        engine.complete_task();
        assert!(engine.state().player("p1").unwrap().scores.insight > 0);
    }

    #[tokio::test]
    async fn test_substitute_routes_rewards_to_helper() {
        use CognitiveFn::*;
        let mut tiles = vec![
            tile(0, 0, 0, TileFace::Function(Ni)),
            tile(1, 1, 0, TileFace::Wildcard),
            tile(2, 2, 0, TileFace::Function(Se)),
        ];
        tiles[1].ability = SpecialAbility::Substitute;
        let board = Board::new(GameMode::Jung8, tiles);
        let players = vec![
            player_at("p1", MbtiType::Intj, 0),
            player_at("p2", MbtiType::Enfp, 0),
        ];
        let mut engine = engine_with_board(board, players);

        engine.roll_dice(Some(1));
        assert!(engine.select_tile(1));
        assert_eq!(engine.state().sub_phase, SubPhase::SelectingSubstitute);
        assert!(!engine.select_target("p1"), "cannot pick yourself");
        assert!(engine.select_target("p2"));
        assert_eq!(engine.state().movement, MovementState::Teleporting);

        assert!(engine.select_tile(2));
        engine.select_category(TaskCategory::Standard).await;
        engine.start_task();
        engine.complete_task();
        assert!(engine.submit_rating("p2", 5));

        // ceil(5*1*2) = 10, all routed to the substitute helper.
        assert_eq!(engine.state().player("p2").unwrap().scores.trust, 10);
        assert_eq!(engine.state().player("p1").unwrap().scores.trust, 0);
    }

    #[tokio::test]
    async fn test_clone_modifier_asks_for_target_then_duplicates() {
        use CognitiveFn::*;
        let mut tiles = vec![
            tile(0, 0, 0, TileFace::Wildcard),
            tile(1, 1, 0, TileFace::Function(Te)),
        ];
        tiles[1].modifier = ScoreModifier::Clone;
        let board = Board::new(GameMode::Jung8, tiles);
        let players = vec![
            player_at("p1", MbtiType::Intj, 0),
            player_at("p2", MbtiType::Enfp, 0),
        ];
        let mut engine = engine_with_board(board, players);

        engine.roll_dice(Some(1));
        engine.select_tile(1);
        engine.select_category(TaskCategory::Standard).await;
        engine.start_task();
        engine.complete_task();
        engine.submit_rating("p2", 5);

        assert_eq!(engine.state().sub_phase, SubPhase::SelectingScoreTarget);
        assert!(engine.select_target("p2"));

        // Duplicated, not split: both receive the full 10.
        assert_eq!(engine.state().player("p1").unwrap().scores.trust, 10);
        assert_eq!(engine.state().player("p2").unwrap().scores.trust, 10);
    }

    #[tokio::test]
    async fn test_voluntary_helper_splits_points() {
        let board = intj_line_board();
        let players = vec![
            player_at("p1", MbtiType::Intj, 0),
            player_at("p2", MbtiType::Enfp, 0),
        ];
        let mut engine = engine_with_board(board, players);
        engine.roll_dice(Some(1));
        engine.select_tile(1);
        engine.select_category(TaskCategory::Standard).await;
        assert!(engine.request_help());
        assert_eq!(engine.state().sub_phase, SubPhase::ChoosingHelper);
        assert!(engine.select_target("p2"));
        assert_eq!(engine.state().sub_phase, SubPhase::ViewingTask);
        engine.start_task();
        engine.complete_task();
        engine.submit_rating("p2", 5);

        // Base 10 splits 5/5; helper interaction recorded on the actor.
        assert_eq!(engine.state().player("p1").unwrap().scores.trust, 5);
        assert_eq!(engine.state().player("p2").unwrap().scores.trust, 5);
        assert_eq!(
            engine.state().player("p1").unwrap().behavior.helper_interactions["p2"],
            1
        );
        assert_eq!(engine.state().player("p1").unwrap().help_used, 1);
    }

    #[tokio::test]
    async fn test_help_limit_enforced() {
        let board = intj_line_board();
        let players = vec![
            player_at("p1", MbtiType::Intj, 0),
            player_at("p2", MbtiType::Enfp, 0),
        ];
        let mut engine = engine_with_board(board, players);
        engine.state.players[0].help_used = 3;
        engine.roll_dice(Some(1));
        engine.select_tile(1);
        engine.select_category(TaskCategory::Standard).await;
        assert!(!engine.request_help());
    }

    #[tokio::test]
    async fn test_reselect_is_single_use() {
        let board = intj_line_board();
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);
        engine.roll_dice(Some(1));
        engine.select_tile(1);
        engine.select_category(TaskCategory::Truth).await;
        assert!(engine.reselect_category());
        assert_eq!(engine.state().sub_phase, SubPhase::SelectingCard);
        engine.select_category(TaskCategory::Deep).await;
        assert!(!engine.reselect_category(), "only one re-pick per turn");
    }

    #[tokio::test]
    async fn test_skip_ends_turn_without_scoring() {
        let board = intj_line_board();
        let players = vec![
            player_at("p1", MbtiType::Intj, 0),
            player_at("p2", MbtiType::Enfp, 0),
        ];
        let mut engine = engine_with_board(board, players);
        engine.roll_dice(Some(1));
        engine.select_tile(1);
        engine.select_category(TaskCategory::Deep).await;
        assert!(engine.skip_task());

        let p1 = engine.state().player("p1").unwrap();
        assert_eq!(p1.scores.total(), 0);
        assert_eq!(p1.skip_used, 1);
        assert_eq!(p1.behavior.tasks_skipped, 1);
        assert_eq!(engine.state().current_player, 1);
    }

    #[tokio::test]
    async fn test_countdown_force_completes() {
        let board = intj_line_board();
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);
        engine.roll_dice(Some(1));
        engine.select_tile(1);
        engine.select_category(TaskCategory::Standard).await;
        engine.start_task();
        let seconds = engine.state().task_seconds_left;
        assert!(seconds > 0);
        for _ in 0..seconds {
            assert!(engine.tick());
        }
        // Solo game: force-completion scored and advanced the turn.
        assert_eq!(engine.state().player("p1").unwrap().scores.trust, 10);
        assert!(!engine.tick(), "timer is dead after completion");
    }

    #[tokio::test]
    async fn test_high_energy_bonus_applies_once() {
        let board = intj_line_board();
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);
        engine.roll_dice(Some(1));
        engine.select_tile(1);
        engine.select_category(TaskCategory::Standard).await;
        engine.start_task();
        assert!(engine.note_high_energy());
        assert!(!engine.note_high_energy(), "one event per task");
        engine.finalize_execution("did the thing", vec!["frame1".into()]);
        // 10 + flat 5.
        assert_eq!(engine.state().player("p1").unwrap().scores.trust, 15);
        assert_eq!(engine.state().player("p1").unwrap().behavior.high_energy_events, 1);
    }

    #[tokio::test]
    async fn test_round_budget_closes_session() {
        let board = intj_line_board();
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);
        engine.settings.rounds = 1;
        engine.roll_dice(Some(1));
        engine.select_tile(1);
        engine.select_category(TaskCategory::Standard).await;
        engine.start_task();
        engine.complete_task();

        assert_eq!(engine.state().phase, GamePhase::Analysis);
        let summary = engine.summary().expect("summary frozen at analysis");
        assert_eq!(summary.rounds_played, 1);
        assert_eq!(summary.players[0].scores.trust, 10);
        assert!(!engine.roll_dice(None), "no play after analysis");
    }

    #[test]
    fn test_host_can_end_game_early() {
        let board = intj_line_board();
        let mut engine = engine_with_board(board, vec![player_at("p1", MbtiType::Intj, 0)]);
        assert!(engine.end_game());
        assert_eq!(engine.state().phase, GamePhase::Analysis);
        assert!(engine.summary().is_some());
        assert!(!engine.end_game());
    }

    #[tokio::test]
    async fn test_generator_failure_never_blocks_play() {
        struct BrokenGenerator;
        impl TaskGenerator for BrokenGenerator {
            fn generate(&self, _request: TaskRequest) -> GenerateFuture {
                Box::pin(async { Err(GenerateError::Transport("boom".into())) })
            }
        }

        let board = intj_line_board();
        let mut state = GameState::new(GameMode::Jung8);
        state.board = board;
        state.players = vec![player_at("p1", MbtiType::Intj, 0)];
        state.phase = GamePhase::Playing;
        state.turn = 1;
        state.round = 1;
        let mut engine = TurnEngine {
            state,
            settings: BalanceSettings::default(),
            cache: Arc::new(TaskCache::new()),
            generator: Arc::new(BrokenGenerator),
            rng: StdRng::seed_from_u64(5),
            summary: None,
        };

        engine.roll_dice(Some(1));
        engine.select_tile(1);
        assert!(engine.select_category(TaskCategory::Dare).await);
        let task = engine.state().current_task.as_ref().unwrap();
        assert_eq!(task.category, TaskCategory::Dare);
        assert!(!task.title.is_empty());
    }

    #[test]
    fn test_grid_sight_range_rolls_per_turn() {
        let mut engine = TurnEngine::new(
            GameMode::Mbti16,
            BalanceSettings::default(),
            Arc::new(FallbackPool),
            Some(9),
        );
        engine.add_player("Alex", MbtiType::Esfj, false);
        engine.start_game();
        engine.roll_dice(None);
        let range = engine.state().sight_range;
        assert!((1..=2).contains(&range));
        let visible = engine.visible_tiles();
        assert!(!visible.is_empty());
        assert!(visible.len() < engine.state().board.len());
    }
}
