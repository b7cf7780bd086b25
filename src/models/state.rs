//! Runtime projections computed per query.
//!
//! Nothing in this module is persisted; states are recomputed from the
//! policy store on every evaluation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{AppId, EnvId, UserId};
use crate::models::profile::DeploymentWindowProfile;

/// What a specific user may do under the currently applied restriction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserActionState {
    /// No restriction in force.
    Allowed,
    /// Restricted and the user is not exempt.
    Blocked,
    /// Restricted in general, but this user is on the exclusion list.
    Partial,
}

/// One profile's evaluated activation for one environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileState {
    pub profile: DeploymentWindowProfile,
    pub env_id: EnvId,
    /// Whether the target instant falls inside one of the profile's windows.
    #[serde(default)]
    pub is_active: bool,
    /// Next instant at which the activation flips (window end if active,
    /// next occurrence start otherwise).
    #[serde(default)]
    pub calculated_timestamp: Option<DateTime<Utc>>,
    /// Effective exclusion list for this profile alone.
    #[serde(default)]
    pub all_excluded_users: Vec<UserId>,
    /// Resolved email addresses for `all_excluded_users`.
    #[serde(default)]
    pub excluded_user_emails: Vec<String>,
}

impl ProfileState {
    /// Fresh, not-yet-evaluated state for a profile scoped to an environment.
    pub fn new(profile: DeploymentWindowProfile, env_id: EnvId) -> Self {
        ProfileState {
            profile,
            env_id,
            is_active: false,
            calculated_timestamp: None,
            all_excluded_users: Vec::new(),
            excluded_user_emails: Vec::new(),
        }
    }
}

/// Aggregated evaluation result for one (app, env) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentState {
    /// The single profile presented as "the reason" for the current state,
    /// chosen by the precedence algorithm. `None` when nothing applies.
    pub applied_profile: Option<ProfileState>,
    /// Users who may bypass the combined restriction.
    pub excluded_user_ids: Vec<UserId>,
    pub excluded_user_emails: Vec<String>,
    pub user_action_state: UserActionState,
}

/// One (app, env) pair of an app-group query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppEnvSelector {
    pub app_id: AppId,
    pub env_id: EnvId,
}

/// Result of [`get_deployment_window_profile_state`] for one app across the
/// requested environments.
///
/// [`get_deployment_window_profile_state`]:
/// crate::services::orchestrator::DeploymentWindowService::get_deployment_window_profile_state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentWindowResponse {
    pub environment_state_map: BTreeMap<EnvId, EnvironmentState>,
    /// Every profile that contributed to any environment, for UI display of
    /// "all windows considered".
    pub profiles: Vec<ProfileState>,
}

/// Per-app slice of an app-group query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppGroupEnvironmentEntry {
    pub app_id: AppId,
    pub environment_state_map: BTreeMap<EnvId, EnvironmentState>,
}

/// Result of the multi-app dashboard query, grouped back by app id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentWindowAppGroupResponse {
    pub app_data: Vec<AppGroupEnvironmentEntry>,
}
