//! Store traits consumed by the deployment window engine.
//!
//! The engine never talks to a concrete database; it consumes these traits
//! and treats every backend as an external collaborator. Write operations
//! take an explicit [`TxHandle`] so a policy write and its window-mapping
//! replacement can share one atomic transaction.
//!
//! # Thread Safety
//! Implementations must be `Send + Sync` to work with async Rust.

pub mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use std::collections::HashMap;

use async_trait::async_trait;

use crate::api::{ProfileId, UserId, UserInfo};
use crate::models::profile::{ProfileMapping, ProfileType, TimeWindow};
use crate::models::state::AppEnvSelector;

/// Persisted policy row. `json_data` deserializes to
/// [`ProfilePolicy`](crate::models::profile::ProfilePolicy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRecord {
    pub id: ProfileId,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub json_data: String,
}

/// Policy row draft before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPolicyRecord {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub json_data: String,
}

/// Opaque handle to an in-flight store transaction.
///
/// Obtained from [`TransactionalStore::begin`]; writes referencing the
/// handle are buffered and become visible only after
/// [`TransactionalStore::commit`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TxHandle(pub u64);

/// Transaction boundary of the store.
///
/// Transactions are the sole atomicity mechanism for writes; no
/// application-level locks serialize concurrent writers, so the store's
/// isolation level decides the outcome of racing commits.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Open a transaction and return its handle.
    async fn begin(&self) -> RepositoryResult<TxHandle>;

    /// Atomically apply every write buffered under `tx`.
    async fn commit(&self, tx: TxHandle) -> RepositoryResult<()>;

    /// Discard every write buffered under `tx`.
    async fn rollback(&self, tx: TxHandle) -> RepositoryResult<()>;
}

/// Store of policy records (the non-window profile fields).
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Insert a policy row.
    ///
    /// # Arguments
    /// * `tx` - Transaction the write is buffered under
    /// * `record` - Row to insert
    /// * `user_id` - Acting user, recorded for audit
    ///
    /// # Returns
    /// * `Ok(ProfileId)` - Id assigned to the new row
    /// * `Err(RepositoryError)` - If the operation fails
    async fn create_policy(
        &self,
        tx: TxHandle,
        record: NewPolicyRecord,
        user_id: UserId,
    ) -> RepositoryResult<ProfileId>;

    /// Replace an existing policy row.
    async fn update_policy(
        &self,
        tx: TxHandle,
        record: PolicyRecord,
        user_id: UserId,
    ) -> RepositoryResult<()>;

    /// Delete a policy row by id.
    async fn delete_policy_by_id(
        &self,
        tx: TxHandle,
        id: ProfileId,
        user_id: UserId,
    ) -> RepositoryResult<()>;

    /// Fetch one policy row.
    ///
    /// # Returns
    /// * `Ok(PolicyRecord)` - The row
    /// * `Err(RepositoryError::NotFound)` - If the id is absent
    async fn get_policy_by_id(&self, id: ProfileId) -> RepositoryResult<PolicyRecord>;

    /// Fetch policy rows for a batch of ids. Absent ids are skipped, not
    /// errors; evaluation treats them as "no restriction".
    async fn get_policy_by_ids(&self, ids: &[ProfileId]) -> RepositoryResult<Vec<PolicyRecord>>;

    /// Fetch every enabled policy row of the given type.
    async fn get_all_active_by_type(
        &self,
        profile_type: ProfileType,
    ) -> RepositoryResult<Vec<PolicyRecord>>;
}

/// Store of the recurring window rules attached to each profile.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Replace the full window rule list of a profile.
    ///
    /// # Arguments
    /// * `tx` - Transaction the replacement is buffered under
    /// * `profile_id` - Owning profile
    /// * `windows` - New rule list (previous rules are dropped)
    /// * `user_id` - Acting user, recorded for audit
    async fn update_window_mappings(
        &self,
        tx: TxHandle,
        profile_id: ProfileId,
        windows: &[TimeWindow],
        user_id: UserId,
    ) -> RepositoryResult<()>;

    /// Fetch the window rules for a batch of profiles, keyed by profile id.
    /// Profiles without rules simply have no entry.
    async fn get_windows_for_resources(
        &self,
        profile_ids: &[ProfileId],
    ) -> RepositoryResult<HashMap<ProfileId, Vec<TimeWindow>>>;
}

/// Store of the (app, env) to profile linkage.
#[async_trait]
pub trait ResourceMappingStore: Send + Sync {
    /// Fetch every profile mapping touching one of the given selections.
    async fn get_mappings_for_selections(
        &self,
        selections: &[AppEnvSelector],
    ) -> RepositoryResult<Vec<ProfileMapping>>;
}

/// User directory collaborator: super-admin discovery and id to email
/// resolution. Always queried in batches, never per profile.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Ids of every super-admin user.
    async fn get_super_admin_ids(&self) -> RepositoryResult<Vec<UserId>>;

    /// Resolve user records for a batch of ids. Unknown ids are skipped.
    async fn get_by_ids(&self, ids: &[UserId]) -> RepositoryResult<Vec<UserInfo>>;
}

/// Umbrella trait for a backend providing the full policy/window/mapping
/// surface plus transactions.
pub trait DeploymentWindowStore:
    PolicyStore + WindowStore + ResourceMappingStore + TransactionalStore
{
}

impl<T> DeploymentWindowStore for T where
    T: PolicyStore + WindowStore + ResourceMappingStore + TransactionalStore
{
}
