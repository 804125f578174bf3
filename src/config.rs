//! Run configuration.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// How travel times are answered during a solving run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DistanceMode {
    /// Compute every query from coordinates.
    OnDemand,
    /// Build the all-pairs matrix before the run, then look up.
    #[default]
    Precomputed,
}

/// Configuration for a routing run.
///
/// # Examples
///
/// ```
/// use route_chain::config::{DistanceMode, RoutingConfig};
///
/// let config: RoutingConfig = serde_json::from_str(r#"{"distanceMode": "onDemand"}"#).unwrap();
/// assert_eq!(config.distance_mode, DistanceMode::OnDemand);
/// assert_eq!(config.default_departure, RoutingConfig::default().default_departure);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    pub distance_mode: DistanceMode,
    /// Departure time of day used for routes built without one.
    pub default_departure: NaiveTime,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            distance_mode: DistanceMode::default(),
            default_departure: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}
