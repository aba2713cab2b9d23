use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::{format_name, PokemonSummary};

pub const DEFAULT_HP: u16 = 100;
pub const DEFAULT_STAT: u16 = 50;
pub const MIN_DAMAGE: u16 = 5;
pub const COUNTER_DELAY_MS: u64 = 1500;

/// Damage variance window, in integer percent: 80..=119.
pub const ROLL_MIN_PCT: u32 = 80;
pub const ROLL_SPAN_PCT: u32 = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Side {
    Player,
    Opponent,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Opponent => "opponent",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Combatant {
    pub id: u16,
    pub name: String,
    pub types: Vec<String>,
    pub max_hp: u16,
    pub hp: u16,
    pub attack: u16,
    pub defense: u16,
    pub sprite_url: Option<String>,
}

impl Combatant {
    /// Builds a battle-ready combatant; absent stats fall back to defaults
    /// so the arena never sees a zero defense.
    pub fn from_summary(summary: &PokemonSummary) -> Self {
        let max_hp = summary.hp.unwrap_or(DEFAULT_HP).max(1);
        Self {
            id: summary.id,
            name: format_name(&summary.name),
            types: summary.types.clone(),
            max_hp,
            hp: max_hp,
            attack: summary.attack.unwrap_or(DEFAULT_STAT),
            defense: summary.defense.unwrap_or(DEFAULT_STAT),
            sprite_url: summary.sprite_front.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BattlePhase {
    InProgress { turn: Side },
    Ended { winner: Side },
}

/// Result record emitted once per finished battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattleOutcome {
    pub player_pokemon: String,
    pub opponent_pokemon: String,
    pub winner: Side,
    pub player_hp: u16,
    pub opponent_hp: u16,
}

/// One running battle. Transitions are pure: the variance roll is passed
/// in by the caller, so every step is reproducible in tests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Battle {
    pub player: Combatant,
    pub opponent: Combatant,
    pub phase: BattlePhase,
    pub log: Vec<String>,
}

impl Battle {
    pub fn new(player: Combatant, opponent: Combatant) -> Self {
        let opening = format!("{} vs {} - Battle begins!", player.name, opponent.name);
        Self {
            player,
            opponent,
            phase: BattlePhase::InProgress { turn: Side::Player },
            log: vec![opening],
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, BattlePhase::Ended { .. })
    }

    pub fn turn(&self) -> Option<Side> {
        match self.phase {
            BattlePhase::InProgress { turn } => Some(turn),
            BattlePhase::Ended { .. } => None,
        }
    }

    pub fn winner(&self) -> Option<Side> {
        match self.phase {
            BattlePhase::Ended { winner } => Some(winner),
            BattlePhase::InProgress { .. } => None,
        }
    }

    /// Applies one attack by `side`. Invalid when it is not that side's
    /// turn or the battle has ended; such calls leave the state untouched
    /// and return false.
    pub fn resolve_attack(&mut self, side: Side, roll_pct: u32) -> bool {
        if self.phase != (BattlePhase::InProgress { turn: side }) {
            return false;
        }

        let (attack, defense) = match side {
            Side::Player => (self.player.attack, self.opponent.defense),
            Side::Opponent => (self.opponent.attack, self.player.defense),
        };
        let damage = compute_damage(attack, defense, roll_pct);

        let (attacker_name, defender) = match side {
            Side::Player => (self.player.name.clone(), &mut self.opponent),
            Side::Opponent => (self.opponent.name.clone(), &mut self.player),
        };
        defender.hp = defender.hp.saturating_sub(damage);
        self.log
            .push(format!("{} attacks for {} damage!", attacker_name, damage));

        if defender.hp == 0 {
            let fallen = defender.name.clone();
            let verdict = match side {
                Side::Player => "You win!",
                Side::Opponent => "You lose!",
            };
            self.log.push(format!("{} fainted! {}", fallen, verdict));
            self.phase = BattlePhase::Ended { winner: side };
        } else {
            self.phase = BattlePhase::InProgress { turn: side.other() };
        }
        true
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        let BattlePhase::Ended { winner } = self.phase else {
            return None;
        };
        Some(BattleOutcome {
            player_pokemon: self.player.name.clone(),
            opponent_pokemon: self.opponent.name.clone(),
            winner,
            player_hp: self.player.hp,
            opponent_hp: self.opponent.hp,
        })
    }
}

/// `floor(attack / defense * 20)`, scaled by the variance roll, floored at
/// `MIN_DAMAGE`. Stats are clamped to 1 so the division can never trap,
/// even though combatant construction already defaults absent stats.
pub fn compute_damage(attack: u16, defense: u16, roll_pct: u32) -> u16 {
    let attack = attack.max(1) as u32;
    let defense = defense.max(1) as u32;
    let base = attack * 20 / defense;
    let damage = base * roll_pct / 100;
    damage.max(MIN_DAMAGE as u32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combatant(name: &str, hp: u16, attack: u16, defense: u16) -> Combatant {
        Combatant {
            id: 0,
            name: name.to_string(),
            types: Vec::new(),
            max_hp: hp,
            hp,
            attack,
            defense,
            sprite_url: None,
        }
    }

    #[test]
    fn damage_formula() {
        assert_eq!(compute_damage(100, 50, 100), 40);
        assert_eq!(compute_damage(50, 100, 100), 10);
    }

    #[test]
    fn damage_floor_applies() {
        assert_eq!(compute_damage(1, 1000, 100), 5);
        assert_eq!(compute_damage(1, 1000, 80), 5);
        for attack in [1u16, 10, 50, 255] {
            for defense in [1u16, 50, 255, 1000] {
                assert!(compute_damage(attack, defense, 80) >= MIN_DAMAGE);
                assert!(compute_damage(attack, defense, 119) >= MIN_DAMAGE);
            }
        }
    }

    #[test]
    fn damage_variance_scales_base() {
        // base 40 at 80% and 119%
        assert_eq!(compute_damage(100, 50, 80), 32);
        assert_eq!(compute_damage(100, 50, 119), 47);
    }

    #[test]
    fn zero_defense_is_guarded() {
        let damage = compute_damage(100, 0, 100);
        assert_eq!(damage, 2000);
    }

    #[test]
    fn attack_out_of_turn_is_ignored() {
        let mut battle = Battle::new(combatant("a", 30, 50, 50), combatant("b", 30, 50, 50));
        let before = battle.clone();
        assert!(!battle.resolve_attack(Side::Opponent, 100));
        assert_eq!(battle, before);
    }

    #[test]
    fn turns_alternate_until_terminal() {
        let mut battle = Battle::new(combatant("a", 35, 50, 50), combatant("b", 40, 50, 50));
        let mut expected = Side::Player;
        let mut steps = 0;
        while let Some(turn) = battle.turn() {
            assert_eq!(turn, expected);
            assert!(battle.resolve_attack(turn, 100));
            expected = expected.other();
            steps += 1;
            assert!(steps < 1000, "battle failed to terminate");
        }
        assert!(battle.is_over());
    }

    #[test]
    fn hp_never_negative_and_battle_terminates() {
        // Worst and best variance rolls both make progress (floor of 5).
        for roll in [80u32, 100, 119] {
            let mut battle =
                Battle::new(combatant("a", 35, 1, 1000), combatant("b", 40, 1, 1000));
            let mut steps = 0;
            while let Some(turn) = battle.turn() {
                battle.resolve_attack(turn, roll);
                assert!(battle.player.hp <= battle.player.max_hp);
                assert!(battle.opponent.hp <= battle.opponent.max_hp);
                steps += 1;
                assert!(steps < 1000, "battle failed to terminate");
            }
            let winner = battle.winner().expect("terminal battle has a winner");
            match winner {
                Side::Player => assert_eq!(battle.opponent.hp, 0),
                Side::Opponent => assert_eq!(battle.player.hp, 0),
            }
        }
    }

    #[test]
    fn no_mutation_after_end() {
        let mut battle = Battle::new(combatant("a", 100, 200, 50), combatant("b", 5, 50, 50));
        assert!(battle.resolve_attack(Side::Player, 100));
        assert!(battle.is_over());
        let snapshot = battle.clone();
        assert!(!battle.resolve_attack(Side::Player, 100));
        assert!(!battle.resolve_attack(Side::Opponent, 100));
        assert_eq!(battle, snapshot);
    }

    #[test]
    fn outcome_reports_final_hp() {
        let mut battle = Battle::new(combatant("a", 100, 200, 50), combatant("b", 5, 50, 50));
        battle.resolve_attack(Side::Player, 100);
        let outcome = battle.outcome().expect("battle ended");
        assert_eq!(outcome.winner, Side::Player);
        assert_eq!(outcome.opponent_hp, 0);
        assert_eq!(outcome.player_hp, 100);
        assert!(battle.log.last().expect("log").contains("You win!"));
    }

    #[test]
    fn defaults_fill_missing_stats() {
        let summary = PokemonSummary {
            id: 132,
            name: "ditto".to_string(),
            types: vec!["normal".to_string()],
            hp: None,
            attack: None,
            defense: None,
            speed: None,
            sprite_front: None,
        };
        let combatant = Combatant::from_summary(&summary);
        assert_eq!(combatant.max_hp, DEFAULT_HP);
        assert_eq!(combatant.hp, DEFAULT_HP);
        assert_eq!(combatant.attack, DEFAULT_STAT);
        assert_eq!(combatant.defense, DEFAULT_STAT);
        assert_eq!(combatant.name, "Ditto");
    }
}
