//! Deadline matching.
//!
//! Deadlines are detected purely by polling on each clock tick; there is
//! no alarm primitive, so the worst-case fire latency equals the tick
//! interval. Matching is monotonic: once `now` passes the deadline the
//! condition stays matched on every subsequent tick until the engine
//! records a fire and drops it from the active set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::note::ConditionId;

/// A time condition prepared for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineTarget {
    pub condition_id: ConditionId,
    pub deadline: DateTime<Utc>,
}

/// Return the ids of all targets whose deadline has passed.
///
/// Boundary-inclusive: `now == deadline` matches.
pub fn match_tick(now: DateTime<Utc>, targets: &[DeadlineTarget]) -> Vec<ConditionId> {
    targets
        .iter()
        .filter(|t| now >= t.deadline)
        .map(|t| t.condition_id.clone())
        .collect()
}
