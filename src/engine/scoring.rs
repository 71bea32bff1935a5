//! Score computation: abstain-aware peer rating average, growth-zone
//! tension, tile modifiers, and recipient routing. Everything here is pure;
//! the turn machine applies the resulting awards.

use serde::{Deserialize, Serialize};

use super::models::PlayerId;
use crate::board::tiles::{GameMode, ScoreModifier, SpecialAbility, Tile, TileFace};
use crate::persona::{stack_slot, MbtiType};
use crate::tasks::{ScoreType, TaskOption};

/// Accumulated peer ratings for one task. A 0 rating is an abstention and
/// touches neither sum nor count, so it can never drag the average down.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReviewTally {
    pub sum: u32,
    pub valid_count: u32,
}

impl ReviewTally {
    pub fn record(&mut self, rating: u8) {
        if rating > 0 {
            self.sum += rating as u32;
            self.valid_count += 1;
        }
    }

    pub fn average(&self) -> f64 {
        if self.valid_count == 0 {
            0.0
        } else {
            self.sum as f64 / self.valid_count as f64
        }
    }

    /// The automatic result when nobody else is at the table.
    pub fn perfect() -> Self {
        Self {
            sum: 5,
            valid_count: 1,
        }
    }
}

/// Growth-zone tension for landing on `tile` as `mbti`.
///
/// Hex board: by stack slot (dominant/auxiliary ×1.0, tertiary ×1.2,
/// inferior ×1.5, shadow ×1.3). Grid board: by letter distance (0-1 ×1.0,
/// 2-3 ×1.2, full opposite ×1.5). Hubs and wildcards are always ×1.0.
pub fn tension_multiplier(mbti: MbtiType, tile: &Tile, mode: GameMode) -> f64 {
    if tile.is_hub {
        return 1.0;
    }
    match (mode, tile.face) {
        (GameMode::Jung8, TileFace::Function(f)) => {
            let stack = mbti.cognitive_stack();
            match stack_slot(&stack, f) {
                Some(0) | Some(1) => 1.0,
                Some(2) => 1.2,
                Some(3) => 1.5,
                Some(4..=7) => 1.3,
                _ => 1.0,
            }
        }
        (GameMode::Mbti16, TileFace::Persona(t)) => match mbti.letter_distance(t) {
            0 | 1 => 1.0,
            2 | 3 => 1.2,
            _ => 1.5,
        },
        _ => 1.0,
    }
}

/// Inputs to the award computation beyond the task and ratings.
#[derive(Debug, Clone)]
pub struct ScoreContext {
    pub actor: PlayerId,
    pub modifier: ScoreModifier,
    pub ability: SpecialAbility,
    pub helper: Option<PlayerId>,
    /// True when the helper came from ask-for-help rather than an ability.
    pub helper_voluntary: bool,
    /// Bound target for CLONE/TRANSFER tiles.
    pub target: Option<PlayerId>,
    pub tension: f64,
    pub high_energy: bool,
    pub high_energy_bonus: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub player: PlayerId,
    pub score_type: ScoreType,
    pub points: u32,
}

/// Compute the awards for one finished task. Pipeline order is a contract:
/// average → base → tension → tile modifier → energy bonus → routing.
pub fn compute_awards(task: &TaskOption, tally: &ReviewTally, ctx: &ScoreContext) -> Vec<Award> {
    let avg = tally.average();
    let mut points = (avg * task.multiplier * 2.0).ceil() as u32;

    // Growth-zone bonus applies to real challenges only.
    if task.multiplier > 1.0 {
        points = (points as f64 * ctx.tension).ceil() as u32;
    }

    match ctx.modifier {
        ScoreModifier::Double => points *= 2,
        ScoreModifier::Half => points /= 2,
        ScoreModifier::Normal | ScoreModifier::Clone | ScoreModifier::Transfer => {}
    }

    if ctx.high_energy {
        points += ctx.high_energy_bonus;
    }

    let bucket = task.score_type;
    let award = |player: &PlayerId, points: u32| Award {
        player: player.clone(),
        score_type: bucket,
        points,
    };

    // Recipient routing: first match wins.
    if ctx.ability == SpecialAbility::Substitute {
        if let Some(helper) = &ctx.helper {
            return vec![award(helper, points)];
        }
    }
    if ctx.ability == SpecialAbility::Companion {
        if let Some(helper) = &ctx.helper {
            return vec![award(&ctx.actor, points), award(helper, points)];
        }
    }
    if ctx.helper_voluntary {
        if let Some(helper) = &ctx.helper {
            return vec![
                award(helper, points.div_ceil(2)),
                award(&ctx.actor, points / 2),
            ];
        }
    }
    if ctx.modifier == ScoreModifier::Transfer {
        if let Some(target) = &ctx.target {
            return vec![award(target, points)];
        }
    }

    let mut awards = vec![award(&ctx.actor, points)];
    if ctx.modifier == ScoreModifier::Clone {
        if let Some(target) = &ctx.target {
            awards.push(award(target, points));
        }
    }
    awards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskCategory;

    fn task(multiplier: f64, score_type: ScoreType) -> TaskOption {
        TaskOption {
            category: TaskCategory::Dare,
            title: "t".into(),
            description: "d".into(),
            score_type,
            duration_seconds: 60,
            multiplier,
        }
    }

    fn tally(ratings: &[u8]) -> ReviewTally {
        let mut t = ReviewTally::default();
        for &r in ratings {
            t.record(r);
        }
        t
    }

    fn ctx() -> ScoreContext {
        ScoreContext {
            actor: "p1".into(),
            modifier: ScoreModifier::Normal,
            ability: SpecialAbility::None,
            helper: None,
            helper_voluntary: false,
            target: None,
            tension: 1.0,
            high_energy: false,
            high_energy_bonus: 5,
        }
    }

    fn hex_tile(face: TileFace) -> Tile {
        Tile {
            index: 1,
            face,
            character_name: None,
            modifier: ScoreModifier::Normal,
            ability: SpecialAbility::None,
            q: 1,
            r: 0,
            zone: None,
            is_hub: false,
        }
    }

    #[test]
    fn test_abstains_never_lower_average() {
        assert_eq!(tally(&[4, 0, 5, 0]).average(), 4.5);
        assert_eq!(tally(&[0, 0, 0]).average(), 0.0);
        assert_eq!(tally(&[]).average(), 0.0);
    }

    #[test]
    fn test_tension_boundaries_intj() {
        use crate::persona::CognitiveFn::*;
        let mode = GameMode::Jung8;
        let m = MbtiType::Intj;
        assert_eq!(tension_multiplier(m, &hex_tile(TileFace::Function(Ni)), mode), 1.0);
        assert_eq!(tension_multiplier(m, &hex_tile(TileFace::Function(Te)), mode), 1.0);
        assert_eq!(tension_multiplier(m, &hex_tile(TileFace::Function(Fi)), mode), 1.2);
        assert_eq!(tension_multiplier(m, &hex_tile(TileFace::Function(Se)), mode), 1.5);
        assert_eq!(tension_multiplier(m, &hex_tile(TileFace::Function(Fe)), mode), 1.3);
    }

    #[test]
    fn test_tension_grid_letter_distance() {
        let mode = GameMode::Mbti16;
        let m = MbtiType::Intj;
        assert_eq!(tension_multiplier(m, &hex_tile(TileFace::Persona(MbtiType::Intj)), mode), 1.0);
        assert_eq!(tension_multiplier(m, &hex_tile(TileFace::Persona(MbtiType::Intp)), mode), 1.0);
        assert_eq!(tension_multiplier(m, &hex_tile(TileFace::Persona(MbtiType::Infp)), mode), 1.2);
        assert_eq!(tension_multiplier(m, &hex_tile(TileFace::Persona(MbtiType::Esfp)), mode), 1.5);
    }

    #[test]
    fn test_tension_hub_always_neutral() {
        let mut tile = hex_tile(TileFace::Wildcard);
        tile.is_hub = true;
        assert_eq!(tension_multiplier(MbtiType::Intj, &tile, GameMode::Jung8), 1.0);
        assert_eq!(tension_multiplier(MbtiType::Intj, &tile, GameMode::Mbti16), 1.0);
    }

    #[test]
    fn test_modifier_application_order() {
        // avg 3, multiplier 1.5, tension 1.2, DOUBLE:
        // ceil(3*1.5*2)=9 → ceil(9*1.2)=11 → 22. DOUBLE-before-tension
        // would give a different number, so the order is a contract.
        let t = task(1.5, ScoreType::Expression);
        let mut c = ctx();
        c.tension = 1.2;
        c.modifier = ScoreModifier::Double;
        let awards = compute_awards(&t, &tally(&[3]), &c);
        assert_eq!(awards, vec![Award {
            player: "p1".into(),
            score_type: ScoreType::Expression,
            points: 22,
        }]);
    }

    #[test]
    fn test_tension_skipped_for_baseline_tasks() {
        let t = task(1.0, ScoreType::Trust);
        let mut c = ctx();
        c.tension = 1.5;
        let awards = compute_awards(&t, &tally(&[4]), &c);
        // ceil(4*1*2) = 8, tension not applied at multiplier 1.0.
        assert_eq!(awards[0].points, 8);
    }

    #[test]
    fn test_half_floors() {
        let t = task(1.0, ScoreType::Trust);
        let mut c = ctx();
        c.modifier = ScoreModifier::Half;
        // ceil(3.5*2)=7 → 7/2 floors to 3.
        let awards = compute_awards(&t, &tally(&[3, 4]), &c);
        assert_eq!(awards[0].points, 3);
    }

    #[test]
    fn test_high_energy_bonus_is_flat() {
        let t = task(1.0, ScoreType::Trust);
        let mut c = ctx();
        c.high_energy = true;
        let awards = compute_awards(&t, &tally(&[5]), &c);
        assert_eq!(awards[0].points, 15);
    }

    #[test]
    fn test_clone_duplicates_not_splits() {
        let t = task(1.0, ScoreType::Insight);
        let mut c = ctx();
        c.modifier = ScoreModifier::Clone;
        c.target = Some("p3".into());
        let awards = compute_awards(&t, &tally(&[5]), &c); // base 10
        assert_eq!(awards.len(), 2);
        assert_eq!(awards[0], Award { player: "p1".into(), score_type: ScoreType::Insight, points: 10 });
        assert_eq!(awards[1], Award { player: "p3".into(), score_type: ScoreType::Insight, points: 10 });
    }

    #[test]
    fn test_voluntary_helper_splits_with_ceil_to_helper() {
        let t = task(1.0, ScoreType::Insight);
        let mut c = ctx();
        c.helper = Some("p2".into());
        c.helper_voluntary = true;
        let awards = compute_awards(&t, &tally(&[5]), &c); // base 10
        assert_eq!(awards[0], Award { player: "p2".into(), score_type: ScoreType::Insight, points: 5 });
        assert_eq!(awards[1], Award { player: "p1".into(), score_type: ScoreType::Insight, points: 5 });

        // Odd total: 9 → helper 5, actor 4.
        let t9 = task(0.9, ScoreType::Insight);
        let awards = compute_awards(&t9, &tally(&[5]), &c); // ceil(5*0.9*2) = 9
        assert_eq!(awards[0].points + awards[1].points, 9);
        assert_eq!(awards[0].points, 5);
        assert_eq!(awards[1].points, 4);
    }

    #[test]
    fn test_substitute_routes_everything_to_helper() {
        let t = task(1.0, ScoreType::Trust);
        let mut c = ctx();
        c.ability = SpecialAbility::Substitute;
        c.helper = Some("p2".into());
        let awards = compute_awards(&t, &tally(&[4]), &c);
        assert_eq!(awards, vec![Award { player: "p2".into(), score_type: ScoreType::Trust, points: 8 }]);
    }

    #[test]
    fn test_companion_pays_both_in_full() {
        let t = task(1.0, ScoreType::Trust);
        let mut c = ctx();
        c.ability = SpecialAbility::Companion;
        c.helper = Some("p2".into());
        let awards = compute_awards(&t, &tally(&[4]), &c);
        assert_eq!(awards.len(), 2);
        assert!(awards.iter().all(|a| a.points == 8));
    }

    #[test]
    fn test_transfer_routes_to_target() {
        let t = task(1.0, ScoreType::Expression);
        let mut c = ctx();
        c.modifier = ScoreModifier::Transfer;
        c.target = Some("p4".into());
        let awards = compute_awards(&t, &tally(&[3]), &c);
        assert_eq!(awards, vec![Award { player: "p4".into(), score_type: ScoreType::Expression, points: 6 }]);
    }

    #[test]
    fn test_transfer_without_target_stays_with_actor() {
        let t = task(1.0, ScoreType::Expression);
        let mut c = ctx();
        c.modifier = ScoreModifier::Transfer;
        let awards = compute_awards(&t, &tally(&[3]), &c);
        assert_eq!(awards[0].player, "p1");
    }

    #[test]
    fn test_end_to_end_scenario_numbers() {
        // Dare ×1.2, ratings 4 and 5, inferior-function landing (×1.5) on a
        // DOUBLE tile: ceil(4.5*1.2*2)=11 → ceil(11*1.5)=17 → 34.
        let t = task(1.2, ScoreType::Expression);
        let mut c = ctx();
        c.tension = 1.5;
        c.modifier = ScoreModifier::Double;
        let awards = compute_awards(&t, &tally(&[4, 5]), &c);
        assert_eq!(awards[0].points, 34);
    }
}
