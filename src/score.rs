//! Solution metadata written by the external solver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// Two-level score: hard constraints first, then soft.
///
/// Ordering is lexicographic, so any improvement in `hard` beats every
/// soft difference.
///
/// # Examples
///
/// ```
/// use route_chain::score::HardSoftScore;
///
/// let score = HardSoftScore::of(-2, -91365);
/// assert_eq!(score.to_string(), "-2hard/-91365soft");
/// assert!(!score.is_feasible());
/// assert!(HardSoftScore::of_soft(-100_000) > score);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HardSoftScore {
    hard: i64,
    soft: i64,
}

impl HardSoftScore {
    pub const ZERO: HardSoftScore = HardSoftScore { hard: 0, soft: 0 };

    pub const fn of(hard: i64, soft: i64) -> Self {
        Self { hard, soft }
    }

    pub const fn of_hard(hard: i64) -> Self {
        Self { hard, soft: 0 }
    }

    pub const fn of_soft(soft: i64) -> Self {
        Self { hard: 0, soft }
    }

    #[inline]
    pub fn hard(&self) -> i64 {
        self.hard
    }

    #[inline]
    pub fn soft(&self) -> i64 {
        self.soft
    }

    /// No hard constraint is broken.
    #[inline]
    pub fn is_feasible(&self) -> bool {
        self.hard >= 0
    }
}

impl Add for HardSoftScore {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hard: self.hard + rhs.hard,
            soft: self.soft + rhs.soft,
        }
    }
}

impl fmt::Display for HardSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{}soft", self.hard, self.soft)
    }
}

/// The text is not of the form `<int>hard/<int>soft`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseScoreError(String);

impl fmt::Display for ParseScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hard/soft score: {:?}", self.0)
    }
}

impl std::error::Error for ParseScoreError {}

impl FromStr for HardSoftScore {
    type Err = ParseScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseScoreError(s.to_string());
        let (hard, soft) = s.trim().split_once('/').ok_or_else(err)?;
        let hard = hard.strip_suffix("hard").ok_or_else(err)?;
        let soft = soft.strip_suffix("soft").ok_or_else(err)?;
        Ok(Self {
            hard: hard.parse().map_err(|_| err())?,
            soft: soft.parse().map_err(|_| err())?,
        })
    }
}

/// Status of a solving job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    /// Not currently solving.
    #[default]
    NotSolving,
    /// Actively solving.
    Solving,
}

impl SolverStatus {
    /// Returns the status as a SCREAMING_SNAKE_CASE string.
    ///
    /// ```
    /// use route_chain::score::SolverStatus;
    ///
    /// assert_eq!(SolverStatus::NotSolving.as_str(), "NOT_SOLVING");
    /// assert_eq!(SolverStatus::Solving.as_str(), "SOLVING");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            SolverStatus::NotSolving => "NOT_SOLVING",
            SolverStatus::Solving => "SOLVING",
        }
    }
}
