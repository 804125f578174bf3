//! Error types for plan construction and chain mutation.

use chrono::NaiveDateTime;
use std::fmt;

/// Setup error found while constructing a plan or one of its parts.
///
/// These are reported immediately: a plan that fails validation is never
/// handed to a solver.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// North-east corner is not strictly north-east of the south-west corner.
    InvalidBounds {
        south_west: (f64, f64),
        north_east: (f64, f64),
    },
    /// Time window closes before it opens.
    InvalidTimeWindow {
        min_start: NaiveDateTime,
        max_end: NaiveDateTime,
    },
    /// Negative demand on a stop.
    NegativeDemand { stop: usize, demand: i32 },
    /// Negative service duration on a stop.
    NegativeServiceDuration { stop: usize },
    /// Route capacity below 1 or below the largest single stop demand.
    InsufficientCapacity {
        route: usize,
        capacity: i32,
        required: i32,
    },
    /// A stop or route index does not match its position in the plan.
    IndexMismatch {
        kind: &'static str,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBounds {
                south_west,
                north_east,
            } => write!(
                f,
                "north-east corner ({}, {}) must be strictly north-east of south-west corner ({}, {})",
                north_east.0, north_east.1, south_west.0, south_west.1
            ),
            ConfigError::InvalidTimeWindow { min_start, max_end } => write!(
                f,
                "time window ends ({}) before it starts ({})",
                max_end, min_start
            ),
            ConfigError::NegativeDemand { stop, demand } => {
                write!(f, "stop {}: demand ({}) must not be negative", stop, demand)
            }
            ConfigError::NegativeServiceDuration { stop } => {
                write!(f, "stop {}: service duration must not be negative", stop)
            }
            ConfigError::InsufficientCapacity {
                route,
                capacity,
                required,
            } => write!(
                f,
                "route {}: capacity ({}) must be at least {}",
                route, capacity, required
            ),
            ConfigError::IndexMismatch {
                kind,
                expected,
                found,
            } => write!(
                f,
                "{} at position {} carries index {}",
                kind, expected, found
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A structural mutation was rejected before touching the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainError {
    /// No stop with this index.
    UnknownStop(usize),
    /// No route with this index.
    UnknownRoute(usize),
    /// Stop is already part of a route.
    AlreadyAssigned { stop: usize, route: usize },
    /// Stop is not part of the given route.
    NotInRoute { stop: usize, route: usize },
    /// Insert position past the end of the route.
    PositionOutOfRange { position: usize, len: usize },
    /// The same stop appears twice in a replacement sequence.
    DuplicateStop(usize),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::UnknownStop(idx) => write!(f, "unknown stop {}", idx),
            ChainError::UnknownRoute(idx) => write!(f, "unknown route {}", idx),
            ChainError::AlreadyAssigned { stop, route } => {
                write!(f, "stop {} is already assigned to route {}", stop, route)
            }
            ChainError::NotInRoute { stop, route } => {
                write!(f, "stop {} is not in route {}", stop, route)
            }
            ChainError::PositionOutOfRange { position, len } => {
                write!(f, "position {} out of range for route of length {}", position, len)
            }
            ChainError::DuplicateStop(idx) => write!(f, "stop {} listed more than once", idx),
        }
    }
}

impl std::error::Error for ChainError {}

/// Derived state disagrees with the stop sequences.
///
/// Produced by [`RoutingPlan::check_invariants`](crate::plan::RoutingPlan::check_invariants).
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    /// Stop appears in no route and is not unassigned.
    Missing(usize),
    /// Stop appears in more than one place.
    Duplicated(usize),
    /// Owner field disagrees with the sequence.
    WrongOwner {
        stop: usize,
        expected: Option<usize>,
        found: Option<usize>,
    },
    /// Previous link disagrees with the sequence.
    WrongPrevious {
        stop: usize,
        expected: Option<usize>,
        found: Option<usize>,
    },
    /// Next link disagrees with the sequence.
    WrongNext {
        stop: usize,
        expected: Option<usize>,
        found: Option<usize>,
    },
    /// Arrival disagrees with the propagation rule.
    WrongArrival { stop: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::Missing(stop) => {
                write!(f, "stop {} is neither routed nor unassigned", stop)
            }
            InvariantViolation::Duplicated(stop) => {
                write!(f, "stop {} appears more than once", stop)
            }
            InvariantViolation::WrongOwner {
                stop,
                expected,
                found,
            } => write!(
                f,
                "stop {}: owner {:?}, expected {:?}",
                stop, found, expected
            ),
            InvariantViolation::WrongPrevious {
                stop,
                expected,
                found,
            } => write!(
                f,
                "stop {}: previous {:?}, expected {:?}",
                stop, found, expected
            ),
            InvariantViolation::WrongNext {
                stop,
                expected,
                found,
            } => write!(f, "stop {}: next {:?}, expected {:?}", stop, found, expected),
            InvariantViolation::WrongArrival { stop } => {
                write!(f, "stop {}: arrival does not follow from its predecessor", stop)
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}
