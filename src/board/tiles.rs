//! Tile and board types shared by both topologies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::persona::{CognitiveFn, MbtiType, Temperament};

/// Which board the session is played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Hexagonal hub-and-spoke board over the 8 Jungian functions.
    Jung8,
    /// Square quadrant board over the 16 MBTI types.
    Mbti16,
}

/// Tile-intrinsic score modifier, fixed at generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreModifier {
    Normal,
    Double,
    Half,
    Clone,
    Transfer,
}

/// Tile-intrinsic special ability; triggers a branch instead of normal task flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialAbility {
    None,
    Freedom,
    Substitute,
    Companion,
}

/// What a tile shows: a cognitive function (hex board), an MBTI type
/// (grid board), or a wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileFace {
    Function(CognitiveFn),
    Persona(MbtiType),
    Wildcard,
}

impl TileFace {
    /// Short string form used in task requests and logs: "Ni", "INTJ", "?".
    pub fn code(&self) -> String {
        match self {
            TileFace::Function(f) => f.code().to_string(),
            TileFace::Persona(t) => t.code().to_string(),
            TileFace::Wildcard => "?".to_string(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TileFace::Wildcard)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub index: usize,
    pub face: TileFace,
    #[serde(default)]
    pub character_name: Option<String>,
    pub modifier: ScoreModifier,
    pub ability: SpecialAbility,
    /// Axial coordinates (hex board) or Cartesian (grid board). Never
    /// comparable across modes.
    pub q: i32,
    pub r: i32,
    #[serde(default)]
    pub zone: Option<Temperament>,
    #[serde(default)]
    pub is_hub: bool,
}

/// Axial hex directions (flat-top): the 6 neighbors of (q, r).
pub const HEX_DIRECTIONS: [(i32, i32); 6] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, -1),
    (-1, 1),
];

/// Grid directions: the 4 orthogonal neighbors of (q, r).
pub const GRID_DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Immutable tile graph with a precomputed (q, r) → index map. Built once at
/// generation; queried by the pathfinder and the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub mode: GameMode,
    pub tiles: Vec<Tile>,
    #[serde(skip)]
    coord_index: HashMap<(i32, i32), usize>,
}

impl Board {
    pub fn new(mode: GameMode, tiles: Vec<Tile>) -> Self {
        let coord_index = tiles.iter().map(|t| ((t.q, t.r), t.index)).collect();
        Self {
            mode,
            tiles,
            coord_index,
        }
    }

    /// Placeholder board for pre-game phases.
    pub fn empty(mode: GameMode) -> Self {
        Self::new(mode, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }

    pub fn at(&self, q: i32, r: i32) -> Option<usize> {
        self.coord_index.get(&(q, r)).copied()
    }

    /// Direct neighbors by coordinate offset. Offsets that fall outside the
    /// board are silently excluded, truncating at the boundary.
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        let tile = &self.tiles[index];
        let offsets: &[(i32, i32)] = match self.mode {
            GameMode::Jung8 => &HEX_DIRECTIONS,
            GameMode::Mbti16 => &GRID_DIRECTIONS,
        };
        offsets
            .iter()
            .filter_map(|&(dq, dr)| self.at(tile.q + dq, tile.r + dr))
            .collect()
    }

    pub fn hub_index(&self) -> Option<usize> {
        self.tiles.iter().position(|t| t.is_hub)
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct BoardSerde {
            mode: GameMode,
            tiles: Vec<Tile>,
        }
        let b = BoardSerde::deserialize(deserializer)?;
        Ok(Board::new(b.mode, b.tiles))
    }
}
