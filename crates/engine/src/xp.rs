//! XP calculation

use common::models::Difficulty;

/// XP per minute of training before multipliers
pub const BASE_XP_PER_MINUTE: f64 = 1.0;
/// Minutes assumed when a unit has no duration
pub const DEFAULT_DURATION_MINUTES: i32 = 30;
/// +10% while on a streak
pub const STREAK_MULTIPLIER: f64 = 1.1;
/// Flat bonus for finishing a whole program
pub const COMPLETION_BONUS: i64 = 500;

/// Multiplier per difficulty. `Unrated` is the explicit default.
const DIFFICULTY_MULTIPLIERS: &[(Difficulty, f64)] = &[
    (Difficulty::Easy, 1.0),
    (Difficulty::Medium, 2.0),
    (Difficulty::Hard, 3.0),
    (Difficulty::Unrated, 1.0),
];

pub fn difficulty_multiplier(difficulty: Difficulty) -> f64 {
    DIFFICULTY_MULTIPLIERS
        .iter()
        .find(|(d, _)| *d == difficulty)
        .map(|(_, m)| *m)
        .unwrap_or(1.0)
}

/// Inputs to the XP formula
#[derive(Debug, Clone, Copy)]
pub struct XpInput {
    pub duration_minutes: Option<i32>,
    pub difficulty: Difficulty,
    pub intensity: Option<f64>,
    pub streak_active: bool,
    pub program_just_completed: bool,
}

impl Default for XpInput {
    fn default() -> Self {
        Self {
            duration_minutes: None,
            difficulty: Difficulty::Medium,
            intensity: None,
            streak_active: false,
            program_just_completed: false,
        }
    }
}

impl XpInput {
    pub fn new(duration_minutes: i32, difficulty: Difficulty) -> Self {
        Self {
            duration_minutes: Some(duration_minutes),
            difficulty,
            ..Self::default()
        }
    }
}

/// Calculate XP for one piece of work.
///
/// `round(duration * base * difficulty * intensity [* streak])`, then the
/// completion bonus is added. Never negative.
pub fn calculate_xp(input: &XpInput) -> i64 {
    let duration = input
        .duration_minutes
        .unwrap_or(DEFAULT_DURATION_MINUTES)
        .max(0) as f64;
    let intensity = match input.intensity {
        Some(i) if i.is_finite() && i > 0.0 => i,
        _ => 1.0,
    };

    let mut xp = duration * BASE_XP_PER_MINUTE * difficulty_multiplier(input.difficulty) * intensity;
    if input.streak_active {
        xp *= STREAK_MULTIPLIER;
    }
    // `as` saturates, so huge intensities land on i64::MAX instead of wrapping
    let xp = (xp.round_ties_even() as i64).max(0);

    if input.program_just_completed {
        xp.saturating_add(COMPLETION_BONUS)
    } else {
        xp
    }
}
