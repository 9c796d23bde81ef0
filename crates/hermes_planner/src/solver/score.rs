use std::{
    cmp::Ordering,
    fmt,
    iter,
    ops::{Add, AddAssign, Mul},
};

use serde::{Deserialize, Serialize};

/// Penalty based score: lower is better, hard before soft.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub hard_score: f64,
    pub soft_score: f64,
}

impl Score {
    pub const ZERO: Score = Score {
        hard_score: 0.0,
        soft_score: 0.0,
    };

    pub fn new(hard_score: f64, soft_score: f64) -> Self {
        Score {
            hard_score,
            soft_score,
        }
    }

    pub fn hard(hard_score: f64) -> Self {
        Score {
            hard_score,
            soft_score: 0.0,
        }
    }

    pub fn soft(soft_score: f64) -> Self {
        Score {
            hard_score: 0.0,
            soft_score,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.hard_score <= 0.0
    }

    /// Strict improvement under the total order.
    pub fn is_better_than(&self, other: &Score) -> bool {
        self < other
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}hard/{:.2}soft", self.hard_score, self.soft_score)
    }
}

impl Eq for Score {}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hard_score
            .total_cmp(&other.hard_score)
            .then_with(|| self.soft_score.total_cmp(&other.soft_score))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl iter::Sum for Score {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, score| acc + score)
    }
}

impl Add<Score> for Score {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Score {
            hard_score: self.hard_score + other.hard_score,
            soft_score: self.soft_score + other.soft_score,
        }
    }
}

impl AddAssign<Score> for Score {
    fn add_assign(&mut self, other: Score) {
        self.hard_score += other.hard_score;
        self.soft_score += other.soft_score;
    }
}

impl Mul<f64> for Score {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Score {
            hard_score: self.hard_score * scalar,
            soft_score: self.soft_score * scalar,
        }
    }
}
