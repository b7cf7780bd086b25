//! User exclusion resolution.
//!
//! Computes which users may bypass a set of simultaneously-applicable
//! restrictive profiles. The authoritative bypass set is the intersection:
//! a user must be excluded by every contributing profile to act. The union
//! is kept for display ("everyone mentioned by some profile").

use std::collections::BTreeSet;

use crate::api::UserId;
use crate::models::state::{ProfileState, UserActionState};

/// Combined exclusion view across a set of contributing profiles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CombinedUserIds {
    /// Users excluded by every contributing profile.
    pub intersected: Vec<UserId>,
    /// Users excluded by at least one contributing profile.
    pub union_all: Vec<UserId>,
    /// Whether super-admins are implicitly excluded.
    pub is_super_admin_excluded: bool,
}

/// Compute the combined exclusion sets over `profiles`.
///
/// A profile's exclusion list only counts when its `is_user_excluded` flag
/// is set; a flagless profile contributes an empty list, which empties the
/// intersection. With `legacy_super_admin_combination` the super-admin flag
/// is taken from the last profile iterated, reproducing the behavior of the
/// system this engine replaces; otherwise it is the OR across all profiles.
pub fn get_combined_user_ids(
    profiles: &[ProfileState],
    legacy_super_admin_combination: bool,
) -> CombinedUserIds {
    let mut union_all: BTreeSet<UserId> = BTreeSet::new();
    let mut intersected: Option<BTreeSet<UserId>> = None;
    let mut super_admin_excluded = false;

    for state in profiles {
        let effective: BTreeSet<UserId> = if state.profile.is_user_excluded {
            state.profile.excluded_user_ids.iter().copied().collect()
        } else {
            BTreeSet::new()
        };
        union_all.extend(effective.iter().copied());

        intersected = Some(match intersected {
            // Seeded from the first profile's list.
            None => effective,
            Some(acc) => acc.intersection(&effective).copied().collect(),
        });

        if legacy_super_admin_combination {
            super_admin_excluded = state.profile.is_super_admin_excluded;
        } else {
            super_admin_excluded |= state.profile.is_super_admin_excluded;
        }
    }

    CombinedUserIds {
        intersected: intersected.unwrap_or_default().into_iter().collect(),
        union_all: union_all.into_iter().collect(),
        is_super_admin_excluded: super_admin_excluded,
    }
}

/// Resolve what a specific user may do.
pub fn get_user_action_state_for_user(
    can_deploy: bool,
    excluded_users: &[UserId],
    user_id: UserId,
) -> UserActionState {
    if can_deploy {
        UserActionState::Allowed
    } else if excluded_users.contains(&user_id) {
        UserActionState::Partial
    } else {
        UserActionState::Blocked
    }
}
