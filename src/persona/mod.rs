//! MBTI/Jungian personality data: the 8 cognitive functions, the 16 types,
//! their 8-slot function stacks, and temperament grouping.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The 8 Jungian cognitive functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CognitiveFn {
    Ni,
    Ne,
    Si,
    Se,
    Ti,
    Te,
    Fi,
    Fe,
}

pub const FUNCTIONS: [CognitiveFn; 8] = [
    CognitiveFn::Ni,
    CognitiveFn::Ne,
    CognitiveFn::Si,
    CognitiveFn::Se,
    CognitiveFn::Ti,
    CognitiveFn::Te,
    CognitiveFn::Fi,
    CognitiveFn::Fe,
];

impl CognitiveFn {
    #[inline]
    pub fn code(self) -> &'static str {
        match self {
            CognitiveFn::Ni => "Ni",
            CognitiveFn::Ne => "Ne",
            CognitiveFn::Si => "Si",
            CognitiveFn::Se => "Se",
            CognitiveFn::Ti => "Ti",
            CognitiveFn::Te => "Te",
            CognitiveFn::Fi => "Fi",
            CognitiveFn::Fe => "Fe",
        }
    }

    /// The same function with the opposite attitude (Ni ↔ Ne, Te ↔ Ti, …).
    /// Slot k of a type's shadow stack is the flip of primary slot k.
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            CognitiveFn::Ni => CognitiveFn::Ne,
            CognitiveFn::Ne => CognitiveFn::Ni,
            CognitiveFn::Si => CognitiveFn::Se,
            CognitiveFn::Se => CognitiveFn::Si,
            CognitiveFn::Ti => CognitiveFn::Te,
            CognitiveFn::Te => CognitiveFn::Ti,
            CognitiveFn::Fi => CognitiveFn::Fe,
            CognitiveFn::Fe => CognitiveFn::Fi,
        }
    }
}

impl fmt::Display for CognitiveFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The 4 temperament groups used for quadrant assignment on the grid board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Temperament {
    Nf,
    Nt,
    Sp,
    Sj,
}

pub const TEMPERAMENTS: [Temperament; 4] = [
    Temperament::Nf,
    Temperament::Nt,
    Temperament::Sp,
    Temperament::Sj,
];

impl Temperament {
    pub fn code(self) -> &'static str {
        match self {
            Temperament::Nf => "NF",
            Temperament::Nt => "NT",
            Temperament::Sp => "SP",
            Temperament::Sj => "SJ",
        }
    }

    /// The 4 member types of this temperament.
    pub fn members(self) -> [MbtiType; 4] {
        use MbtiType::*;
        match self {
            Temperament::Nf => [Infj, Infp, Enfj, Enfp],
            Temperament::Nt => [Intj, Intp, Entj, Entp],
            Temperament::Sp => [Istp, Isfp, Estp, Esfp],
            Temperament::Sj => [Istj, Isfj, Estj, Esfj],
        }
    }
}

/// The 16 MBTI types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MbtiType {
    Intj,
    Intp,
    Entj,
    Entp,
    Infj,
    Infp,
    Enfj,
    Enfp,
    Istj,
    Isfj,
    Estj,
    Esfj,
    Istp,
    Isfp,
    Estp,
    Esfp,
}

pub const ALL_TYPES: [MbtiType; 16] = [
    MbtiType::Intj,
    MbtiType::Intp,
    MbtiType::Entj,
    MbtiType::Entp,
    MbtiType::Infj,
    MbtiType::Infp,
    MbtiType::Enfj,
    MbtiType::Enfp,
    MbtiType::Istj,
    MbtiType::Isfj,
    MbtiType::Estj,
    MbtiType::Esfj,
    MbtiType::Istp,
    MbtiType::Isfp,
    MbtiType::Estp,
    MbtiType::Esfp,
];

impl MbtiType {
    #[inline]
    pub fn code(self) -> &'static str {
        match self {
            MbtiType::Intj => "INTJ",
            MbtiType::Intp => "INTP",
            MbtiType::Entj => "ENTJ",
            MbtiType::Entp => "ENTP",
            MbtiType::Infj => "INFJ",
            MbtiType::Infp => "INFP",
            MbtiType::Enfj => "ENFJ",
            MbtiType::Enfp => "ENFP",
            MbtiType::Istj => "ISTJ",
            MbtiType::Isfj => "ISFJ",
            MbtiType::Estj => "ESTJ",
            MbtiType::Esfj => "ESFJ",
            MbtiType::Istp => "ISTP",
            MbtiType::Isfp => "ISFP",
            MbtiType::Estp => "ESTP",
            MbtiType::Esfp => "ESFP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ALL_TYPES
            .iter()
            .copied()
            .find(|t| t.code().eq_ignore_ascii_case(s))
    }

    pub fn temperament(self) -> Temperament {
        TEMPERAMENTS
            .iter()
            .copied()
            .find(|t| t.members().contains(&self))
            .unwrap_or(Temperament::Nt)
    }

    /// Primary 4-function stack: dominant, auxiliary, tertiary, inferior.
    pub fn primary_stack(self) -> [CognitiveFn; 4] {
        use CognitiveFn::*;
        match self {
            MbtiType::Intj => [Ni, Te, Fi, Se],
            MbtiType::Intp => [Ti, Ne, Si, Fe],
            MbtiType::Entj => [Te, Ni, Se, Fi],
            MbtiType::Entp => [Ne, Ti, Fe, Si],
            MbtiType::Infj => [Ni, Fe, Ti, Se],
            MbtiType::Infp => [Fi, Ne, Si, Te],
            MbtiType::Enfj => [Fe, Ni, Se, Ti],
            MbtiType::Enfp => [Ne, Fi, Te, Si],
            MbtiType::Istj => [Si, Te, Fi, Ne],
            MbtiType::Isfj => [Si, Fe, Ti, Ne],
            MbtiType::Estj => [Te, Si, Ne, Fi],
            MbtiType::Esfj => [Fe, Si, Ne, Ti],
            MbtiType::Istp => [Ti, Se, Ni, Fe],
            MbtiType::Isfp => [Fi, Se, Ni, Te],
            MbtiType::Estp => [Se, Ti, Fe, Ni],
            MbtiType::Esfp => [Se, Fi, Te, Ni],
        }
    }

    /// Full 8-slot cognitive stack: the primary 4 followed by their
    /// attitude-flipped shadow counterparts.
    pub fn cognitive_stack(self) -> [CognitiveFn; 8] {
        STACKS[&self]
    }

    /// Number of differing letters between two 4-letter type codes (0–4).
    pub fn letter_distance(self, other: MbtiType) -> usize {
        self.code()
            .bytes()
            .zip(other.code().bytes())
            .filter(|(a, b)| a != b)
            .count()
    }
}

impl fmt::Display for MbtiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

static STACKS: Lazy<HashMap<MbtiType, [CognitiveFn; 8]>> = Lazy::new(|| {
    ALL_TYPES
        .iter()
        .map(|&t| {
            let p = t.primary_stack();
            let stack = [
                p[0],
                p[1],
                p[2],
                p[3],
                p[0].flipped(),
                p[1].flipped(),
                p[2].flipped(),
                p[3].flipped(),
            ];
            (t, stack)
        })
        .collect()
});

/// Archetype persona attached to each function tile on the hex board.
pub static FUNCTION_ARCHETYPES: Lazy<HashMap<CognitiveFn, &'static str>> = Lazy::new(|| {
    use CognitiveFn::*;
    [
        (Ni, "The Seer"),
        (Ne, "The Explorer"),
        (Si, "The Curator"),
        (Se, "The Daredevil"),
        (Ti, "The Analyst"),
        (Te, "The Commander"),
        (Fi, "The Idealist"),
        (Fe, "The Host"),
    ]
    .into_iter()
    .collect()
});

/// Archetype persona attached to each type tile on the grid board.
pub static TYPE_ARCHETYPES: Lazy<HashMap<MbtiType, &'static str>> = Lazy::new(|| {
    use MbtiType::*;
    [
        (Intj, "The Architect"),
        (Intp, "The Logician"),
        (Entj, "The Marshal"),
        (Entp, "The Debater"),
        (Infj, "The Advocate"),
        (Infp, "The Mediator"),
        (Enfj, "The Mentor"),
        (Enfp, "The Campaigner"),
        (Istj, "The Inspector"),
        (Isfj, "The Defender"),
        (Estj, "The Executive"),
        (Esfj, "The Consul"),
        (Istp, "The Virtuoso"),
        (Isfp, "The Composer"),
        (Estp, "The Dynamo"),
        (Esfp, "The Entertainer"),
    ]
    .into_iter()
    .collect()
});

/// Position of `function` in `stack`, or None if absent.
pub fn stack_slot(stack: &[CognitiveFn; 8], function: CognitiveFn) -> Option<usize> {
    stack.iter().position(|&f| f == function)
}
