//! Per-environment profile state calculation and precedence resolution.
//!
//! Filters the profiles applicable to an environment by type, evaluates each
//! one's windows in its own timezone, and selects the single "applied"
//! profile under the precedence rule: blackout blocks when ALL of its
//! profiles are active, maintenance permits when ANY of its profiles is
//! active, and blackout wins when both are active.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::profile::ProfileType;
use crate::models::state::ProfileState;
use crate::services::exclusion::{get_combined_user_ids, CombinedUserIds};
use crate::services::window_evaluator::get_active_window;

/// Result of the full precedence algorithm for one environment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppliedEvaluation {
    /// Every contributing profile of both types, evaluated.
    pub all_profiles: Vec<ProfileState>,
    /// The profile presented as "the reason" for the current state.
    pub applied_profile: Option<ProfileState>,
    /// Combined exclusion view over the profiles of the applied branch.
    pub excluded: CombinedUserIds,
    /// Whether a deployment action is allowed for non-exempt users.
    pub can_deploy: bool,
}

impl AppliedEvaluation {
    /// State when no blackout or maintenance profile matched at all: the
    /// action is implicitly allowed and no profile applies.
    fn unrestricted() -> Self {
        AppliedEvaluation {
            can_deploy: true,
            ..Default::default()
        }
    }
}

/// Filter `profile_states` to one type and evaluate each profile's windows
/// at `target`.
///
/// Profiles whose windows produce no relevant boundary are dropped, as are
/// disabled profiles and, when `filter_for_days > 0`, profiles whose
/// boundary lies beyond that lookahead horizon.
///
/// # Returns
/// The surviving evaluated states, plus `all_active` (every survivor is
/// currently active; false when none survive) and `one_active` (at least
/// one survivor is active).
pub fn calculate_state_for_profiles(
    target: DateTime<Utc>,
    profile_states: &[ProfileState],
    profile_type: ProfileType,
    filter_for_days: u32,
) -> RepositoryResult<(Vec<ProfileState>, bool, bool)> {
    let mut filtered = Vec::new();

    for state in profile_states {
        if state.profile.profile_type != profile_type || !state.profile.enabled {
            continue;
        }
        let tz: Tz = state.profile.timezone.parse().map_err(|_| {
            RepositoryError::validation_with_context(
                format!("unknown timezone {}", state.profile.timezone),
                ErrorContext::new("calculate_state_for_profiles")
                    .with_entity("profile")
                    .with_entity_id(
                        state.profile.id.map(|id| id.value()).unwrap_or_default(),
                    ),
            )
        })?;

        let Some(evaluation) = get_active_window(target.with_timezone(&tz), &state.profile.windows)
        else {
            continue;
        };
        if filter_for_days > 0 && evaluation.boundary > target + Duration::days(filter_for_days as i64)
        {
            continue;
        }

        let mut evaluated = state.clone();
        evaluated.is_active = evaluation.is_active;
        evaluated.calculated_timestamp = Some(evaluation.boundary);
        filtered.push(evaluated);
    }

    let all_active = !filtered.is_empty() && filtered.iter().all(|s| s.is_active);
    let one_active = filtered.iter().any(|s| s.is_active);
    Ok((filtered, all_active, one_active))
}

/// Run the precedence algorithm over every profile applicable to one
/// environment.
///
/// `legacy_super_admin_combination` selects how per-profile super-admin
/// flags combine; see [`get_combined_user_ids`].
pub fn get_applied_profile_and_calculate_states(
    target: DateTime<Utc>,
    profile_states: &[ProfileState],
    filter_for_days: u32,
    legacy_super_admin_combination: bool,
) -> RepositoryResult<AppliedEvaluation> {
    let (blackouts, is_blackout_active, _) =
        calculate_state_for_profiles(target, profile_states, ProfileType::Blackout, filter_for_days)?;
    let (maintenances, _, is_maintenance_active) = calculate_state_for_profiles(
        target,
        profile_states,
        ProfileType::Maintenance,
        filter_for_days,
    )?;

    if blackouts.is_empty() && maintenances.is_empty() {
        return Ok(AppliedEvaluation::unrestricted());
    }

    let can_deploy = !is_blackout_active && is_maintenance_active;

    let mut everything = blackouts.clone();
    everything.extend(maintenances.iter().cloned());

    // Contributing profiles are those of the branch that selects the
    // applied profile; the combined exclusion set is computed over them.
    let (applied_profile, contributing) = match (is_blackout_active, is_maintenance_active) {
        (true, true) => (longest_ending(&blackouts), blackouts.clone()),
        (true, false) => (longest_ending(&everything), everything.clone()),
        (false, true) => (longest_ending(&maintenances), maintenances.clone()),
        (false, false) => {
            if maintenances.is_empty() {
                // Nothing active and no maintenance configured: the nearest
                // upcoming blackout is the relevant restriction.
                (earliest_starting(&blackouts), blackouts.clone())
            } else {
                // The soonest upcoming relief.
                (earliest_starting(&maintenances), maintenances.clone())
            }
        }
    };
    let applied_profile = applied_profile.or_else(|| {
        // Maintenance branch with nothing to rank falls back to the
        // earliest-starting blackout.
        earliest_starting(&blackouts)
    });

    let excluded = get_combined_user_ids(&contributing, legacy_super_admin_combination);

    Ok(AppliedEvaluation {
        all_profiles: everything,
        applied_profile,
        excluded,
        can_deploy,
    })
}

/// Profile whose boundary lies farthest in the future ("longest ending").
fn longest_ending(states: &[ProfileState]) -> Option<ProfileState> {
    states
        .iter()
        .max_by_key(|s| s.calculated_timestamp)
        .cloned()
}

/// Profile whose boundary lies nearest in the future ("earliest starting").
fn earliest_starting(states: &[ProfileState]) -> Option<ProfileState> {
    states
        .iter()
        .filter(|s| s.calculated_timestamp.is_some())
        .min_by_key(|s| s.calculated_timestamp)
        .cloned()
}
