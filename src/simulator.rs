// 🎲 Draft Reward Simulator - Monte-Carlo expected payout per win rate
// Play until the win cap, loss cap or game cap is hit, then look up the reward tier

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SimulatorError {
    #[error("win rate {0} is outside [0, 1]")]
    InvalidWinRate(f64),

    #[error("reward table has {found} tiers but {needed} win counts are reachable")]
    MissingRewardTiers { found: usize, needed: usize },

    #[error("bonus pack probability {probability} at {wins} wins is outside [0, 1]")]
    InvalidBonusProbability { wins: usize, probability: f64 },

    #[error("event must allow at least one game, one win and one loss")]
    EmptyEvent,

    #[error("sample step {0} must be in [0.01, 1]")]
    InvalidStep(f64),
}

/// Finest step whose sample points still get distinct two-decimal keys
pub const MIN_STEP: f64 = 0.01;

// ============================================================================
// EVENT FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryFee {
    pub gold: u32,
    pub gems: u32,
}

/// Reward for finishing with a given number of wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTier {
    pub gems: u32,
    pub packs: u32,

    /// Chance of one extra pack
    #[serde(default, rename = "bonusPacks", skip_serializing_if = "Option::is_none")]
    pub bonus_packs: Option<f64>,
}

impl RewardTier {
    pub fn new(gems: u32, packs: u32) -> Self {
        RewardTier {
            gems,
            packs,
            bonus_packs: None,
        }
    }

    pub fn with_bonus(mut self, probability: f64) -> Self {
        self.bonus_packs = Some(probability);
        self
    }
}

/// Competition structure: caps plus a reward table indexed by final wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFormat {
    pub name: String,
    pub entry: EntryFee,
    pub rewards: Vec<RewardTier>,
    pub max_wins: u32,
    pub max_losses: u32,
    pub max_games: u32,
}

impl EventFormat {
    pub fn premier_draft() -> Self {
        EventFormat {
            name: "premier".to_string(),
            entry: EntryFee { gold: 10000, gems: 1500 },
            rewards: vec![
                RewardTier::new(50, 1),
                RewardTier::new(100, 1),
                RewardTier::new(250, 2),
                RewardTier::new(1000, 2),
                RewardTier::new(1400, 3),
                RewardTier::new(1600, 4),
                RewardTier::new(1800, 5),
                RewardTier::new(2200, 6),
            ],
            max_wins: 7,
            max_losses: 3,
            max_games: 9,
        }
    }

    pub fn traditional_draft() -> Self {
        EventFormat {
            name: "traditional".to_string(),
            entry: EntryFee { gold: 10000, gems: 1500 },
            rewards: vec![
                RewardTier::new(0, 1),
                RewardTier::new(0, 1),
                RewardTier::new(1000, 4),
                RewardTier::new(3000, 6),
            ],
            max_wins: 3,
            max_losses: 3,
            max_games: 3,
        }
    }

    pub fn quick_draft() -> Self {
        EventFormat {
            name: "quick".to_string(),
            entry: EntryFee { gold: 5000, gems: 750 },
            rewards: vec![
                RewardTier::new(50, 1).with_bonus(0.20),
                RewardTier::new(100, 1).with_bonus(0.22),
                RewardTier::new(200, 1).with_bonus(0.24),
                RewardTier::new(300, 1).with_bonus(0.26),
                RewardTier::new(450, 1).with_bonus(0.30),
                RewardTier::new(650, 1).with_bonus(0.35),
                RewardTier::new(850, 1).with_bonus(0.40),
                RewardTier::new(950, 1).with_bonus(1.00),
            ],
            max_wins: 7,
            max_losses: 3,
            max_games: 9,
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "premier" => Some(Self::premier_draft()),
            "traditional" => Some(Self::traditional_draft()),
            "quick" => Some(Self::quick_draft()),
            _ => None,
        }
    }

    /// Highest win count a run can end on
    pub fn max_reachable_wins(&self) -> u32 {
        self.max_wins.min(self.max_games)
    }

    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.max_wins == 0 || self.max_losses == 0 || self.max_games == 0 {
            return Err(SimulatorError::EmptyEvent);
        }

        let needed = self.max_reachable_wins() as usize + 1;
        if self.rewards.len() < needed {
            return Err(SimulatorError::MissingRewardTiers {
                found: self.rewards.len(),
                needed,
            });
        }

        for (wins, tier) in self.rewards.iter().enumerate() {
            if let Some(p) = tier.bonus_packs {
                if !(0.0..=1.0).contains(&p) {
                    return Err(SimulatorError::InvalidBonusProbability { wins, probability: p });
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// SINGLE EVENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub gems: u32,
    pub packs: u32,
    pub wins: u32,
    pub losses: u32,
}

fn check_win_rate(win_rate: f64) -> Result<(), SimulatorError> {
    if (0.0..=1.0).contains(&win_rate) {
        Ok(())
    } else {
        Err(SimulatorError::InvalidWinRate(win_rate))
    }
}

/// Play one event to completion
pub fn simulate_event<R: Rng + ?Sized>(
    format: &EventFormat,
    win_rate: f64,
    rng: &mut R,
) -> Result<EventOutcome, SimulatorError> {
    check_win_rate(win_rate)?;
    format.validate()?;
    Ok(play_event(format, win_rate, rng))
}

/// Inner loop; caller has validated the format and win rate
fn play_event<R: Rng + ?Sized>(format: &EventFormat, win_rate: f64, rng: &mut R) -> EventOutcome {
    let mut wins = 0;
    let mut losses = 0;

    while wins < format.max_wins && losses < format.max_losses && wins + losses < format.max_games {
        // gen::<f64>() is in [0, 1): rate 1.0 always wins, rate 0.0 never does
        if rng.gen::<f64>() < win_rate {
            wins += 1;
        } else {
            losses += 1;
        }
    }

    let tier = &format.rewards[wins as usize];
    let mut packs = tier.packs;

    if let Some(bonus) = tier.bonus_packs {
        if rng.gen::<f64>() < bonus {
            packs += 1;
        }
    }

    EventOutcome {
        gems: tier.gems,
        packs,
        wins,
        losses,
    }
}

// ============================================================================
// EXPECTED VALUE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedReward {
    pub avg_gems: f64,
    pub avg_packs: f64,
}

/// Average payout over `trials` events at one win rate
pub fn expected_rewards<R: Rng + ?Sized>(
    format: &EventFormat,
    win_rate: f64,
    trials: u64,
    rng: &mut R,
) -> Result<ExpectedReward, SimulatorError> {
    check_win_rate(win_rate)?;
    format.validate()?;

    if trials == 0 {
        return Ok(ExpectedReward {
            avg_gems: 0.0,
            avg_packs: 0.0,
        });
    }

    let mut total_gems: u64 = 0;
    let mut total_packs: u64 = 0;
    for _ in 0..trials {
        let outcome = play_event(format, win_rate, rng);
        total_gems += outcome.gems as u64;
        total_packs += outcome.packs as u64;
    }

    Ok(ExpectedReward {
        avg_gems: total_gems as f64 / trials as f64,
        avg_packs: total_packs as f64 / trials as f64,
    })
}

/// Sweep win rates 0.00, step, 2·step, ... and always 1.00, in parallel.
///
/// Each sample point gets its own ChaCha8 stream seeded from `seed + index`,
/// so a sweep is reproducible regardless of thread scheduling. Keys are the
/// win rate with two decimals ("0.50").
pub fn sweep(
    format: &EventFormat,
    trials: u64,
    step: f64,
    seed: u64,
) -> Result<BTreeMap<String, ExpectedReward>, SimulatorError> {
    if !(step >= MIN_STEP && step <= 1.0) {
        return Err(SimulatorError::InvalidStep(step));
    }
    format.validate()?;

    let rates = sample_points(step)?;

    let results: Result<Vec<(String, ExpectedReward)>, SimulatorError> = rates
        .into_par_iter()
        .enumerate()
        .map(|(i, rate)| -> Result<(String, ExpectedReward), SimulatorError> {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
            let reward = expected_rewards(format, rate, trials, &mut rng)?;
            Ok((sample_key(rate), reward))
        })
        .collect();

    Ok(results?.into_iter().collect())
}

fn sample_key(rate: f64) -> String {
    format!("{:.2}", rate)
}

/// Multiples of `step` below 1, then 1.0 itself. A point that would print
/// as "1.00" is replaced by the exact 1.0.
fn sample_points(step: f64) -> Result<Vec<f64>, SimulatorError> {
    let mut rates: Vec<f64> = (0u64..)
        .map(|i| i as f64 * step)
        .take_while(|rate| *rate < 1.0 - 1e-9)
        .collect();
    while rates.last().is_some_and(|rate| sample_key(*rate) == "1.00") {
        rates.pop();
    }
    rates.push(1.0);

    let mut keys = BTreeSet::new();
    if !rates.iter().all(|rate| keys.insert(sample_key(*rate))) {
        return Err(SimulatorError::InvalidStep(step));
    }
    Ok(rates)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn three_game_event() -> EventFormat {
        EventFormat {
            name: "test".to_string(),
            entry: EntryFee { gold: 0, gems: 0 },
            rewards: vec![
                RewardTier::new(0, 1),
                RewardTier::new(10, 1),
                RewardTier::new(20, 2),
                RewardTier::new(30, 3),
            ],
            max_wins: 3,
            max_losses: 3,
            max_games: 3,
        }
    }

    #[test]
    fn test_always_win() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let outcome = simulate_event(&three_game_event(), 1.0, &mut rng).unwrap();

        assert_eq!(outcome.wins, 3);
        assert_eq!(outcome.losses, 0);
        assert_eq!(outcome.gems, 30);
        assert_eq!(outcome.packs, 3);
    }

    #[test]
    fn test_always_lose() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let outcome = simulate_event(&three_game_event(), 0.0, &mut rng).unwrap();

        assert_eq!(outcome.wins, 0);
        assert_eq!(outcome.losses, 3);
        assert_eq!(outcome.gems, 0);
        assert_eq!(outcome.packs, 1);
    }

    #[test]
    fn test_certain_bonus_pack() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        // Quick draft's 7-win tier has a 100% bonus pack
        let outcome = simulate_event(&EventFormat::quick_draft(), 1.0, &mut rng).unwrap();

        assert_eq!(outcome.wins, 7);
        assert_eq!(outcome.gems, 950);
        assert_eq!(outcome.packs, 2);
    }

    #[test]
    fn test_terminal_conditions_hold() {
        let format = EventFormat::premier_draft();
        let mut rng = ChaCha8Rng::seed_from_u64(1234);

        for _ in 0..1000 {
            let outcome = simulate_event(&format, 0.55, &mut rng).unwrap();

            assert!(outcome.wins <= format.max_wins);
            assert!(outcome.losses <= format.max_losses);
            assert!(outcome.wins + outcome.losses <= format.max_games);
            assert!(
                outcome.wins == format.max_wins
                    || outcome.losses == format.max_losses
                    || outcome.wins + outcome.losses == format.max_games
            );
        }
    }

    #[test]
    fn test_expected_rewards_deterministic_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let best = expected_rewards(&three_game_event(), 1.0, 100, &mut rng).unwrap();
        let worst = expected_rewards(&three_game_event(), 0.0, 100, &mut rng).unwrap();

        assert_eq!(best, ExpectedReward { avg_gems: 30.0, avg_packs: 3.0 });
        assert_eq!(worst, ExpectedReward { avg_gems: 0.0, avg_packs: 1.0 });
    }

    #[test]
    fn test_sweep_keys_and_reproducibility() {
        let format = EventFormat::traditional_draft();

        let first = sweep(&format, 200, 0.25, 99).unwrap();
        let second = sweep(&format, 200, 0.25, 99).unwrap();

        let keys: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["0.00", "0.25", "0.50", "0.75", "1.00"]);
        assert_eq!(first, second);
        assert_eq!(first["1.00"], ExpectedReward { avg_gems: 3000.0, avg_packs: 6.0 });
        assert!(first["0.50"].avg_gems < first["0.75"].avg_gems);
    }

    #[test]
    fn test_sweep_default_step_has_101_points() {
        let result = sweep(&EventFormat::premier_draft(), 1, 0.01, 0).unwrap();

        assert_eq!(result.len(), 101);
        assert!(result.contains_key("0.50"));
    }

    #[test]
    fn test_sweep_always_ends_at_one() {
        let result = sweep(&three_game_event(), 20, 0.3, 1).unwrap();

        let keys: Vec<&str> = result.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["0.00", "0.30", "0.60", "0.90", "1.00"]);
        assert_eq!(result["1.00"], ExpectedReward { avg_gems: 30.0, avg_packs: 3.0 });
    }

    #[test]
    fn test_sweep_point_near_one_becomes_one() {
        let result = sweep(&three_game_event(), 5, 0.333, 1).unwrap();

        let keys: Vec<&str> = result.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["0.00", "0.33", "0.67", "1.00"]);
        assert_eq!(result["1.00"], ExpectedReward { avg_gems: 30.0, avg_packs: 3.0 });
    }

    #[test]
    fn test_sweep_rejects_steps_finer_than_keys() {
        assert_eq!(
            sweep(&EventFormat::traditional_draft(), 50, 0.005, 1),
            Err(SimulatorError::InvalidStep(0.005))
        );
    }

    #[test]
    fn test_validation_errors() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut short = three_game_event();
        short.rewards.pop();

        assert_eq!(
            simulate_event(&short, 0.5, &mut rng),
            Err(SimulatorError::MissingRewardTiers { found: 3, needed: 4 })
        );
        assert_eq!(
            simulate_event(&three_game_event(), 1.5, &mut rng),
            Err(SimulatorError::InvalidWinRate(1.5))
        );
        assert_eq!(
            sweep(&three_game_event(), 10, 0.0, 0),
            Err(SimulatorError::InvalidStep(0.0))
        );

        let mut bad_bonus = three_game_event();
        bad_bonus.rewards[2].bonus_packs = Some(2.0);
        assert!(matches!(
            bad_bonus.validate(),
            Err(SimulatorError::InvalidBonusProbability { wins: 2, .. })
        ));
    }

    #[test]
    fn test_presets_are_valid() {
        for name in ["premier", "traditional", "quick"] {
            let format = EventFormat::preset(name).unwrap();
            assert!(format.validate().is_ok(), "{} should validate", name);
        }
        assert!(EventFormat::preset("sealed").is_none());
    }

    #[test]
    fn test_format_json_shape() {
        let json = serde_json::to_value(EventFormat::quick_draft()).unwrap();

        assert_eq!(json["maxWins"], 7);
        assert_eq!(json["rewards"][0]["bonusPacks"], 0.2);
        assert!(serde_json::to_value(EventFormat::premier_draft()).unwrap()["rewards"][0]
            .get("bonusPacks")
            .is_none());
    }
}
