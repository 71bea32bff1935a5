//! Legal-move computation and bounded reachability over the tile graph.
//!
//! Everything here is a pure function of the board plus the moving player's
//! position, previous position, movement sub-mode, and (hex board only)
//! cognitive stack.

use std::collections::HashSet;

use super::tiles::{Board, GameMode, TileFace};
use crate::persona::CognitiveFn;

/// A player's movement-relevant state, detached from the full player record
/// so bots, prefetching and tests can query hypothetical positions.
#[derive(Debug, Clone, Copy)]
pub struct MoveContext<'a> {
    pub position: usize,
    pub previous: Option<usize>,
    pub teleporting: bool,
    /// 8-slot cognitive stack and current slot; ignored on the grid board.
    pub stack: &'a [CognitiveFn; 8],
    pub stack_index: usize,
}

/// Single-step legal targets.
///
/// Teleport mode ignores adjacency: every tile except hubs (and the tile the
/// player stands on) is legal. Otherwise targets are the direct neighbors
/// minus the tile the player just came from; on the hex board they are
/// further restricted by polling the cognitive stack.
pub fn legal_next_steps(board: &Board, ctx: &MoveContext) -> Vec<usize> {
    if ctx.teleporting {
        return board
            .tiles
            .iter()
            .filter(|t| !t.is_hub && t.index != ctx.position)
            .map(|t| t.index)
            .collect();
    }

    let neighbors: Vec<usize> = board
        .neighbors(ctx.position)
        .into_iter()
        .filter(|&n| Some(n) != ctx.previous)
        .collect();

    match board.mode {
        GameMode::Mbti16 => neighbors,
        GameMode::Jung8 => poll_stack_targets(board, ctx, &neighbors),
    }
}

/// Stack polling: scanning forward cyclically from `stack_index + 1`, the
/// first function with a matching neighbor becomes the sole target; legal
/// tiles are its matches plus any wildcard neighbor. With no function match
/// anywhere, wildcard neighbors alone remain legal.
fn poll_stack_targets(board: &Board, ctx: &MoveContext, neighbors: &[usize]) -> Vec<usize> {
    let mut target: Option<CognitiveFn> = None;
    for offset in 1..=8 {
        let f = ctx.stack[(ctx.stack_index + offset) % 8];
        let matched = neighbors
            .iter()
            .any(|&n| board.tile(n).face == TileFace::Function(f));
        if matched {
            target = Some(f);
            break;
        }
    }

    neighbors
        .iter()
        .copied()
        .filter(|&n| {
            let face = board.tile(n).face;
            face.is_wildcard() || target.map_or(false, |f| face == TileFace::Function(f))
        })
        .collect()
}

/// The new stack slot after landing on `function`: the first slot matching
/// it on a forward cyclic scan from `stack_index + 1`. Mirrors the polling
/// rule so slot and movement legality stay consistent.
pub fn stack_advance(stack: &[CognitiveFn; 8], stack_index: usize, function: CognitiveFn) -> usize {
    for offset in 1..=8 {
        let slot = (stack_index + offset) % 8;
        if stack[slot] == function {
            return slot;
        }
    }
    stack_index
}

/// Tiles reachable in exactly `steps` hops, expanding `legal_next_steps`
/// level by level over (position, previous, stack slot) states. Used only
/// for prefetch hinting; an empty frontier ends expansion early.
pub fn reachable_in_steps(board: &Board, ctx: &MoveContext, steps: u32) -> Vec<usize> {
    if ctx.teleporting {
        return legal_next_steps(board, ctx);
    }

    let mut frontier: HashSet<(usize, Option<usize>, usize)> =
        HashSet::from([(ctx.position, ctx.previous, ctx.stack_index)]);

    for _ in 0..steps {
        let mut next = HashSet::new();
        for &(position, previous, stack_index) in &frontier {
            let level_ctx = MoveContext {
                position,
                previous,
                teleporting: false,
                stack: ctx.stack,
                stack_index,
            };
            for target in legal_next_steps(board, &level_ctx) {
                let slot = match board.tile(target).face {
                    TileFace::Function(f) if board.mode == GameMode::Jung8 => {
                        stack_advance(ctx.stack, stack_index, f)
                    }
                    _ => stack_index,
                };
                next.insert((target, Some(position), slot));
            }
        }
        if next.is_empty() {
            return Vec::new();
        }
        frontier = next;
    }

    let mut tiles: Vec<usize> = frontier.into_iter().map(|(p, _, _)| p).collect();
    tiles.sort_unstable();
    tiles.dedup();
    tiles
}

/// Grid-board fog of war: tiles within Chebyshev distance `sight_range` of
/// `position`. The hex board plays fully revealed.
pub fn visible_tiles(board: &Board, position: usize, sight_range: u8) -> Vec<usize> {
    match board.mode {
        GameMode::Jung8 => (0..board.len()).collect(),
        GameMode::Mbti16 => {
            let center = board.tile(position);
            board
                .tiles
                .iter()
                .filter(|t| {
                    (t.q - center.q).abs().max((t.r - center.r).abs()) <= sight_range as i32
                })
                .map(|t| t.index)
                .collect()
        }
    }
}
