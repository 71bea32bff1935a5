//! Board generation for both topologies. Pure aside from the injected RNG:
//! re-running with the same mode always yields the same tile count and
//! adjacency, with modifiers/abilities/faces randomized.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::tiles::{Board, GameMode, ScoreModifier, SpecialAbility, Tile, TileFace};
use crate::persona::{Temperament, FUNCTIONS, FUNCTION_ARCHETYPES, TEMPERAMENTS, TYPE_ARCHETYPES};

/// Hex board radius; a radius-4 axial disc has 61 cells.
const HEX_RADIUS: i32 = 4;
/// Function tiles per cognitive function on the hex board.
const TILES_PER_FUNCTION: usize = 7;
/// Non-hub wildcard tiles on the hex board.
const WILDCARD_COUNT: usize = 4;
/// Grid side length; the hub sits at the center cell.
const GRID_SIDE: i32 = 7;
const GRID_HUB: (i32, i32) = (3, 3);

/// Per-quadrant coordinate template for the 田-shaped grid: 5 corner-area
/// border cells, the adjacent edge-midpoint cell, and the 2-cell spine arm
/// beside it. 4 × 8 cells + hub = 33 tiles.
const QUADRANT_TEMPLATES: [[(i32, i32); 8]; 4] = [
    // top-left
    [(0, 0), (1, 0), (2, 0), (0, 1), (0, 2), (3, 0), (3, 1), (3, 2)],
    // top-right
    [(4, 0), (5, 0), (6, 0), (6, 1), (6, 2), (6, 3), (5, 3), (4, 3)],
    // bottom-right
    [(6, 4), (6, 5), (6, 6), (5, 6), (4, 6), (3, 6), (3, 5), (3, 4)],
    // bottom-left
    [(2, 6), (1, 6), (0, 6), (0, 5), (0, 4), (0, 3), (1, 3), (2, 3)],
];

/// Randomization knobs for tile generation, TOML-overridable through
/// `BalanceSettings`. Defaults are the shipped balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationWeights {
    pub normal: u32,
    pub double: u32,
    pub half: u32,
    pub clone: u32,
    pub transfer: u32,
    /// Ability deck consumed by non-hub wildcard tiles, one per tile.
    pub wildcard_abilities: Vec<SpecialAbility>,
}

impl Default for GenerationWeights {
    fn default() -> Self {
        Self {
            normal: 50,
            double: 20,
            half: 10,
            clone: 10,
            transfer: 10,
            wildcard_abilities: vec![
                SpecialAbility::Freedom,
                SpecialAbility::Substitute,
                SpecialAbility::Companion,
                SpecialAbility::Freedom,
            ],
        }
    }
}

impl GenerationWeights {
    fn draw_modifier(&self, rng: &mut impl Rng) -> ScoreModifier {
        let total = self.normal + self.double + self.half + self.clone + self.transfer;
        let mut roll = rng.gen_range(0..total.max(1));
        for (weight, modifier) in [
            (self.normal, ScoreModifier::Normal),
            (self.double, ScoreModifier::Double),
            (self.half, ScoreModifier::Half),
            (self.clone, ScoreModifier::Clone),
            (self.transfer, ScoreModifier::Transfer),
        ] {
            if roll < weight {
                return modifier;
            }
            roll -= weight;
        }
        ScoreModifier::Normal
    }
}

pub fn generate_board(mode: GameMode, weights: &GenerationWeights, rng: &mut impl Rng) -> Board {
    match mode {
        GameMode::Jung8 => generate_jung8(weights, rng),
        GameMode::Mbti16 => generate_mbti16(weights, rng),
    }
}

/// All axial coordinates of the radius-R disc, center first, then ring by
/// ring in a fixed scan order.
fn hex_disc(radius: i32) -> Vec<(i32, i32)> {
    let mut cells = vec![(0, 0)];
    for q in -radius..=radius {
        for r in -radius..=radius {
            if (q, r) == (0, 0) || (q + r).abs() > radius {
                continue;
            }
            cells.push((q, r));
        }
    }
    cells
}

fn generate_jung8(weights: &GenerationWeights, rng: &mut impl Rng) -> Board {
    let cells = hex_disc(HEX_RADIUS);

    // Face deck for the 60 non-hub cells: 8 functions × 7 plus 4 wildcards.
    let mut faces: Vec<TileFace> = Vec::with_capacity(cells.len() - 1);
    for f in FUNCTIONS {
        faces.extend(std::iter::repeat(TileFace::Function(f)).take(TILES_PER_FUNCTION));
    }
    faces.extend(std::iter::repeat(TileFace::Wildcard).take(WILDCARD_COUNT));
    faces.shuffle(rng);

    let mut ability_deck = weights.wildcard_abilities.clone();
    ability_deck.shuffle(rng);

    let mut tiles = Vec::with_capacity(cells.len());
    tiles.push(Tile {
        index: 0,
        face: TileFace::Wildcard,
        character_name: None,
        modifier: ScoreModifier::Normal,
        ability: SpecialAbility::Freedom,
        q: 0,
        r: 0,
        zone: None,
        is_hub: true,
    });

    for (index, &(q, r)) in cells.iter().enumerate().skip(1) {
        let face = faces[index - 1];
        let (modifier, ability, character_name) = match face {
            TileFace::Wildcard => (
                ScoreModifier::Normal,
                ability_deck.pop().unwrap_or(SpecialAbility::Freedom),
                None,
            ),
            TileFace::Function(f) => (
                weights.draw_modifier(rng),
                SpecialAbility::None,
                FUNCTION_ARCHETYPES.get(&f).map(|s| s.to_string()),
            ),
            TileFace::Persona(_) => unreachable!("hex deck holds no persona faces"),
        };
        tiles.push(Tile {
            index,
            face,
            character_name,
            modifier,
            ability,
            q,
            r,
            zone: None,
            is_hub: false,
        });
    }

    Board::new(GameMode::Jung8, tiles)
}

fn generate_mbti16(weights: &GenerationWeights, rng: &mut impl Rng) -> Board {
    let mut groups = TEMPERAMENTS;
    groups.shuffle(rng);

    let mut tiles = Vec::with_capacity(33);
    tiles.push(Tile {
        index: 0,
        face: TileFace::Wildcard,
        character_name: None,
        modifier: ScoreModifier::Normal,
        ability: SpecialAbility::Freedom,
        q: GRID_HUB.0,
        r: GRID_HUB.1,
        zone: None,
        is_hub: true,
    });

    for (quadrant, template) in QUADRANT_TEMPLATES.iter().enumerate() {
        let group: Temperament = groups[quadrant];

        // Each of the group's 4 types fills 2 of the quadrant's 8 slots.
        let mut slots: Vec<_> = group
            .members()
            .iter()
            .flat_map(|&t| [t, t])
            .collect();
        slots.shuffle(rng);

        for (&(q, r), mbti) in template.iter().zip(slots) {
            let index = tiles.len();
            tiles.push(Tile {
                index,
                face: TileFace::Persona(mbti),
                character_name: TYPE_ARCHETYPES.get(&mbti).map(|s| s.to_string()),
                modifier: weights.draw_modifier(rng),
                ability: SpecialAbility::None,
                q,
                r,
                zone: Some(group),
                is_hub: false,
            });
        }
    }

    debug_assert_eq!(tiles.len(), 33);
    Board::new(GameMode::Mbti16, tiles)
}
