//! Progress and status derivation for goals.
//!
//! Both functions are pure. Progress is computed at full precision and only
//! clamped/rounded at the very end; status is derived from progress and the
//! due date, never set freely by the progress-update path.

use chrono::NaiveDate;

use crate::goals::types::{GoalStatus, KeyResult};

/// Completion ratio of a single key result, capped at 100. A key result with
/// no positive target cannot express fractional progress.
fn completion_ratio(kr: &KeyResult) -> f64 {
    if kr.target_value > 0.0 {
        (kr.current_value / kr.target_value * 100.0).min(100.0)
    } else {
        0.0
    }
}

/// Normalized progress for a goal.
///
/// A non-empty key-result set drives progress as the weight-averaged
/// completion ratio of its members; the goal's own current/target pair is
/// ignored in that mode. Without key results the goal's own values are used
/// directly. The result is clamped to [0, 100] and rounded to two decimals.
pub fn compute_progress(
    target_value: Option<f64>,
    current_value: f64,
    key_results: &[KeyResult],
) -> f64 {
    let raw = if key_results.is_empty() {
        match target_value {
            Some(target) if target > 0.0 => (current_value / target * 100.0).min(100.0),
            _ => 0.0,
        }
    } else {
        let total_weight: f64 = key_results.iter().map(|kr| kr.weight).sum();
        if total_weight > 0.0 {
            let weighted: f64 = key_results
                .iter()
                .map(|kr| kr.weight * completion_ratio(kr))
                .sum();
            weighted / total_weight
        } else {
            0.0
        }
    };
    round2(raw.clamp(0.0, 100.0))
}

/// Lifecycle status derived from progress and the due date.
///
/// Cancelled is terminal for this path; completion is sticky and only an
/// explicit field edit can revert either. Evaluated identically at every
/// level of the hierarchy.
pub fn resolve_status(
    progress: f64,
    due_date: NaiveDate,
    previous: GoalStatus,
    today: NaiveDate,
) -> GoalStatus {
    if previous == GoalStatus::Cancelled {
        return GoalStatus::Cancelled;
    }
    if progress >= 100.0 || previous == GoalStatus::Completed {
        return GoalStatus::Completed;
    }
    if progress <= 0.0 {
        return GoalStatus::NotStarted;
    }
    if today > due_date {
        GoalStatus::AtRisk
    } else {
        GoalStatus::InProgress
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
