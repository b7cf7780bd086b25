//! Public deployment window service.
//!
//! Aggregates window evaluation per app/environment, resolves the action
//! state for a specific actor, and performs profile CRUD against the policy
//! store via transactional writes. All collaborators are injected at
//! construction; evaluation is read-only and loads policy data exactly once
//! per query, however many selectors the query covers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::debug;

use crate::api::{AppId, EnvId, ProfileId, UserId};
use crate::clock::Clock;
use crate::db::config::EvaluationSettings;
use crate::db::repository::{
    DeploymentWindowStore, ErrorContext, NewPolicyRecord, PolicyRecord, RepositoryError,
    RepositoryResult, TxHandle, UserDirectory,
};
use crate::models::profile::{DeploymentWindowProfile, ProfilePolicy, ProfileType};
use crate::models::state::{
    AppEnvSelector, AppGroupEnvironmentEntry, DeploymentWindowAppGroupResponse,
    DeploymentWindowResponse, EnvironmentState, ProfileState,
};
use crate::services::exclusion::get_user_action_state_for_user;
use crate::services::state_calculator::{
    get_applied_profile_and_calculate_states, AppliedEvaluation,
};

/// Deployment window orchestrator.
pub struct DeploymentWindowService {
    store: Arc<dyn DeploymentWindowStore>,
    user_directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    settings: EvaluationSettings,
}

/// Per-selector evaluation before emails are resolved.
struct SelectorDraft {
    selector: AppEnvSelector,
    evaluation: AppliedEvaluation,
    combined_excluded: Vec<UserId>,
}

impl DeploymentWindowService {
    pub fn new(
        store: Arc<dyn DeploymentWindowStore>,
        user_directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        settings: EvaluationSettings,
    ) -> Self {
        DeploymentWindowService {
            store,
            user_directory,
            clock,
            settings,
        }
    }

    // ==================== Evaluation queries ====================

    /// Single-environment convenience query: the applied profile (if any)
    /// and what `user_id` may do right now.
    pub async fn get_active_profile_for_app_env(
        &self,
        target_time: DateTime<Utc>,
        app_id: AppId,
        env_id: EnvId,
        user_id: UserId,
    ) -> RepositoryResult<(Option<DeploymentWindowProfile>, crate::api::UserActionState)> {
        let response = self
            .get_deployment_window_profile_state(target_time, app_id, &[env_id], 0, user_id)
            .await?;
        match response.environment_state_map.get(&env_id) {
            Some(state) => Ok((
                state.applied_profile.as_ref().map(|p| p.profile.clone()),
                state.user_action_state,
            )),
            None => Ok((None, crate::api::UserActionState::Allowed)),
        }
    }

    /// [`get_active_profile_for_app_env`](Self::get_active_profile_for_app_env)
    /// anchored at the injected clock's current instant.
    pub async fn get_active_profile_for_app_env_now(
        &self,
        app_id: AppId,
        env_id: EnvId,
        user_id: UserId,
    ) -> RepositoryResult<(Option<DeploymentWindowProfile>, crate::api::UserActionState)> {
        self.get_active_profile_for_app_env(self.clock.now(), app_id, env_id, user_id)
            .await
    }

    /// Evaluate one app across a set of environments.
    pub async fn get_deployment_window_profile_state(
        &self,
        target_time: DateTime<Utc>,
        app_id: AppId,
        env_ids: &[EnvId],
        filter_for_days: u32,
        user_id: UserId,
    ) -> RepositoryResult<DeploymentWindowResponse> {
        let selectors: Vec<AppEnvSelector> = env_ids
            .iter()
            .map(|env_id| AppEnvSelector {
                app_id,
                env_id: *env_id,
            })
            .collect();
        let drafts = self
            .evaluate_selectors(target_time, &selectors, filter_for_days)
            .await?;
        let email_map = self.resolve_emails(&drafts).await?;

        let mut environment_state_map = BTreeMap::new();
        let mut profiles = Vec::new();
        for draft in drafts {
            let (env_state, mut contributing) = finish_draft(draft, user_id, &email_map);
            profiles.append(&mut contributing);
            environment_state_map.insert(env_state.0, env_state.1);
        }
        Ok(DeploymentWindowResponse {
            environment_state_map,
            profiles,
        })
    }

    /// Multi-app dashboard query: the same computation fanned out across
    /// selector pairs in one pass and grouped back by app id. Policy and
    /// window data are loaded once for the whole batch.
    pub async fn get_deployment_window_profile_state_app_group(
        &self,
        target_time: DateTime<Utc>,
        selectors: &[AppEnvSelector],
        filter_for_days: u32,
        user_id: UserId,
    ) -> RepositoryResult<DeploymentWindowAppGroupResponse> {
        let drafts = self
            .evaluate_selectors(target_time, selectors, filter_for_days)
            .await?;
        let email_map = self.resolve_emails(&drafts).await?;

        let mut grouped: BTreeMap<AppId, BTreeMap<EnvId, EnvironmentState>> = BTreeMap::new();
        for draft in drafts {
            let app_id = draft.selector.app_id;
            let ((env_id, env_state), _contributing) = finish_draft(draft, user_id, &email_map);
            grouped.entry(app_id).or_default().insert(env_id, env_state);
        }

        Ok(DeploymentWindowAppGroupResponse {
            app_data: grouped
                .into_iter()
                .map(|(app_id, environment_state_map)| AppGroupEnvironmentEntry {
                    app_id,
                    environment_state_map,
                })
                .collect(),
        })
    }

    /// Load mappings, policies and windows once and evaluate every selector
    /// in memory.
    async fn evaluate_selectors(
        &self,
        target_time: DateTime<Utc>,
        selectors: &[AppEnvSelector],
        filter_for_days: u32,
    ) -> RepositoryResult<Vec<SelectorDraft>> {
        let filter_for_days = if filter_for_days > 0 {
            filter_for_days
        } else {
            self.settings.default_filter_days
        };

        let mappings = self.store.get_mappings_for_selections(selectors).await?;
        let profile_ids: Vec<ProfileId> = mappings
            .iter()
            .map(|m| m.profile_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        debug!(
            "evaluating {} selectors over {} mapped profiles",
            selectors.len(),
            profile_ids.len()
        );

        let records = self.store.get_policy_by_ids(&profile_ids).await?;
        let mut windows = self.store.get_windows_for_resources(&profile_ids).await?;

        let mut profiles: HashMap<ProfileId, DeploymentWindowProfile> = HashMap::new();
        for record in records {
            if !record.enabled {
                continue;
            }
            let policy: ProfilePolicy = serde_json::from_str(&record.json_data)?;
            let profile = policy.into_profile(
                record.id,
                record.name,
                record.description,
                record.enabled,
                windows.remove(&record.id).unwrap_or_default(),
            );
            profiles.insert(record.id, profile);
        }

        let super_admins = self.user_directory.get_super_admin_ids().await?;

        let mut drafts = Vec::with_capacity(selectors.len());
        for selector in selectors {
            let states: Vec<ProfileState> = mappings
                .iter()
                .filter(|m| m.app_id == selector.app_id && m.env_id == selector.env_id)
                .filter_map(|m| profiles.get(&m.profile_id))
                .map(|profile| ProfileState::new(profile.clone(), selector.env_id))
                .collect();

            let mut evaluation = get_applied_profile_and_calculate_states(
                target_time,
                &states,
                filter_for_days,
                self.settings.legacy_super_admin_combination,
            )?;

            let mut combined: BTreeSet<UserId> =
                evaluation.excluded.intersected.iter().copied().collect();
            if evaluation.excluded.is_super_admin_excluded {
                combined.extend(super_admins.iter().copied());
            }

            for state in evaluation
                .all_profiles
                .iter_mut()
                .chain(evaluation.applied_profile.iter_mut())
            {
                state.all_excluded_users = per_profile_excluded(state, &super_admins);
            }

            drafts.push(SelectorDraft {
                selector: *selector,
                evaluation,
                combined_excluded: combined.into_iter().collect(),
            });
        }
        Ok(drafts)
    }

    /// One batched directory lookup for every user id any draft mentions.
    /// Only ids resolving to a plausible address are kept.
    async fn resolve_emails(
        &self,
        drafts: &[SelectorDraft],
    ) -> RepositoryResult<HashMap<UserId, String>> {
        let mut ids: BTreeSet<UserId> = BTreeSet::new();
        for draft in drafts {
            ids.extend(draft.combined_excluded.iter().copied());
            for state in &draft.evaluation.all_profiles {
                ids.extend(state.all_excluded_users.iter().copied());
            }
        }
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<UserId> = ids.into_iter().collect();
        let users = self.user_directory.get_by_ids(&ids).await?;
        Ok(users
            .into_iter()
            .filter(|u| !u.email_id.is_empty() && u.email_id.contains('@'))
            .map(|u| (u.id, u.email_id))
            .collect())
    }

    // ==================== Profile CRUD ====================

    /// Create a profile: one transaction covering the policy insert and the
    /// window rule save. Returns the profile with its assigned id.
    pub async fn create_deployment_window_profile(
        &self,
        mut profile: DeploymentWindowProfile,
        user_id: UserId,
    ) -> RepositoryResult<DeploymentWindowProfile> {
        validate_profile(&profile)?;
        let json_data = serde_json::to_string(&ProfilePolicy::from_profile(&profile))?;

        let tx = self.store.begin().await?;
        let result = self
            .create_in_tx(tx, &profile, json_data, user_id)
            .await;
        match result {
            Ok(id) => {
                self.store.commit(tx).await?;
                profile.id = Some(id);
                Ok(profile)
            }
            Err(err) => {
                let _ = self.store.rollback(tx).await;
                Err(err)
            }
        }
    }

    async fn create_in_tx(
        &self,
        tx: TxHandle,
        profile: &DeploymentWindowProfile,
        json_data: String,
        user_id: UserId,
    ) -> RepositoryResult<ProfileId> {
        let id = self
            .store
            .create_policy(
                tx,
                NewPolicyRecord {
                    name: profile.name.clone(),
                    description: profile.description.clone(),
                    enabled: profile.enabled,
                    json_data,
                },
                user_id,
            )
            .await?;
        self.store
            .update_window_mappings(tx, id, &profile.windows, user_id)
            .await?;
        Ok(id)
    }

    /// Update a profile in place. The profile type is immutable: an update
    /// attempting to change it is rejected before anything is written.
    pub async fn update_deployment_window_profile(
        &self,
        profile: DeploymentWindowProfile,
        user_id: UserId,
    ) -> RepositoryResult<DeploymentWindowProfile> {
        validate_profile(&profile)?;
        let id = profile.id.ok_or_else(|| {
            RepositoryError::validation("cannot update a profile without an id")
        })?;

        let existing = self.store.get_policy_by_id(id).await?;
        let existing_policy: ProfilePolicy = serde_json::from_str(&existing.json_data)?;
        if existing_policy.profile_type != profile.profile_type {
            return Err(RepositoryError::validation_with_context(
                "profile type is immutable after creation",
                ErrorContext::new("update_deployment_window_profile")
                    .with_entity("profile")
                    .with_entity_id(id.value()),
            ));
        }

        let json_data = serde_json::to_string(&ProfilePolicy::from_profile(&profile))?;
        let tx = self.store.begin().await?;
        let result = self
            .update_in_tx(tx, id, &profile, json_data, user_id)
            .await;
        match result {
            Ok(()) => {
                self.store.commit(tx).await?;
                Ok(profile)
            }
            Err(err) => {
                let _ = self.store.rollback(tx).await;
                Err(err)
            }
        }
    }

    async fn update_in_tx(
        &self,
        tx: TxHandle,
        id: ProfileId,
        profile: &DeploymentWindowProfile,
        json_data: String,
        user_id: UserId,
    ) -> RepositoryResult<()> {
        self.store
            .update_policy(
                tx,
                PolicyRecord {
                    id,
                    name: profile.name.clone(),
                    description: profile.description.clone(),
                    enabled: profile.enabled,
                    json_data,
                },
                user_id,
            )
            .await?;
        self.store
            .update_window_mappings(tx, id, &profile.windows, user_id)
            .await
    }

    /// Delete a profile and its window rules in one transaction.
    pub async fn delete_deployment_window_profile_for_id(
        &self,
        id: ProfileId,
        user_id: UserId,
    ) -> RepositoryResult<()> {
        let tx = self.store.begin().await?;
        let result = async {
            self.store.update_window_mappings(tx, id, &[], user_id).await?;
            self.store.delete_policy_by_id(tx, id, user_id).await
        }
        .await;
        match result {
            Ok(()) => self.store.commit(tx).await,
            Err(err) => {
                let _ = self.store.rollback(tx).await;
                Err(err)
            }
        }
    }

    /// Read one profile with its window rules. Absent ids surface as
    /// `NotFound`.
    pub async fn get_deployment_window_profile_for_id(
        &self,
        id: ProfileId,
    ) -> RepositoryResult<DeploymentWindowProfile> {
        let record = self.store.get_policy_by_id(id).await?;
        let policy: ProfilePolicy = serde_json::from_str(&record.json_data)?;
        let windows = self
            .store
            .get_windows_for_resources(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(policy.into_profile(
            record.id,
            record.name,
            record.description,
            record.enabled,
            windows,
        ))
    }

    /// List every enabled profile of both types, for the management UI.
    pub async fn list_deployment_window_profiles(
        &self,
    ) -> RepositoryResult<Vec<DeploymentWindowProfile>> {
        let mut records = self
            .store
            .get_all_active_by_type(ProfileType::Blackout)
            .await?;
        records.extend(
            self.store
                .get_all_active_by_type(ProfileType::Maintenance)
                .await?,
        );

        let ids: Vec<ProfileId> = records.iter().map(|r| r.id).collect();
        let mut windows = self.store.get_windows_for_resources(&ids).await?;

        let mut profiles = Vec::with_capacity(records.len());
        for record in records {
            let policy: ProfilePolicy = serde_json::from_str(&record.json_data)?;
            profiles.push(policy.into_profile(
                record.id,
                record.name,
                record.description,
                record.enabled,
                windows.remove(&record.id).unwrap_or_default(),
            ));
        }
        profiles.sort_by_key(|p| p.id);
        Ok(profiles)
    }
}

/// A profile's own exclusion list: the explicit list when honored, plus the
/// super-admin set when configured.
fn per_profile_excluded(state: &ProfileState, super_admins: &[UserId]) -> Vec<UserId> {
    let mut out: BTreeSet<UserId> = BTreeSet::new();
    if state.profile.is_user_excluded {
        out.extend(state.profile.excluded_user_ids.iter().copied());
    }
    if state.profile.is_super_admin_excluded {
        out.extend(super_admins.iter().copied());
    }
    out.into_iter().collect()
}

/// Attach resolved emails and the requester's action state to a draft.
fn finish_draft(
    draft: SelectorDraft,
    user_id: UserId,
    email_map: &HashMap<UserId, String>,
) -> ((EnvId, EnvironmentState), Vec<ProfileState>) {
    let emails_for = |ids: &[UserId]| -> Vec<String> {
        ids.iter().filter_map(|id| email_map.get(id).cloned()).collect()
    };

    let mut evaluation = draft.evaluation;
    for state in evaluation
        .all_profiles
        .iter_mut()
        .chain(evaluation.applied_profile.iter_mut())
    {
        state.excluded_user_emails = emails_for(&state.all_excluded_users);
    }

    let user_action_state =
        get_user_action_state_for_user(evaluation.can_deploy, &draft.combined_excluded, user_id);
    let env_state = EnvironmentState {
        applied_profile: evaluation.applied_profile,
        excluded_user_emails: emails_for(&draft.combined_excluded),
        excluded_user_ids: draft.combined_excluded,
        user_action_state,
    };
    ((draft.selector.env_id, env_state), evaluation.all_profiles)
}

/// Reject profiles the store should never see: empty names and unknown
/// timezones are caught before a transaction opens.
fn validate_profile(profile: &DeploymentWindowProfile) -> RepositoryResult<()> {
    if profile.name.trim().is_empty() {
        return Err(RepositoryError::validation("profile name must not be empty"));
    }
    if profile.timezone.parse::<Tz>().is_err() {
        return Err(RepositoryError::validation_with_context(
            format!("unknown timezone {}", profile.timezone),
            ErrorContext::new("validate_profile").with_entity("profile"),
        ));
    }
    Ok(())
}
