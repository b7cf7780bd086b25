//! In-memory store implementation for unit testing and local development.
//!
//! Writes are buffered per transaction handle and applied atomically at
//! commit against a cloned snapshot, so a failing commit leaves the store
//! untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::api::{ProfileId, UserId, UserInfo};
use crate::db::repository::{
    ErrorContext, NewPolicyRecord, PolicyRecord, PolicyStore, RepositoryError, RepositoryResult,
    ResourceMappingStore, TransactionalStore, TxHandle, WindowStore,
};
use crate::models::profile::{ProfileMapping, ProfilePolicy, ProfileType, TimeWindow};
use crate::models::state::AppEnvSelector;

#[derive(Debug, Clone)]
enum PendingWrite {
    InsertPolicy(PolicyRecord),
    UpdatePolicy(PolicyRecord),
    DeletePolicy(ProfileId),
    ReplaceWindows {
        profile_id: ProfileId,
        windows: Vec<TimeWindow>,
    },
}

#[derive(Debug, Default, Clone)]
struct Tables {
    policies: BTreeMap<ProfileId, PolicyRecord>,
    windows: HashMap<ProfileId, Vec<TimeWindow>>,
    mappings: Vec<ProfileMapping>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    pending: HashMap<u64, Vec<PendingWrite>>,
    next_profile_id: i32,
    fail_window_writes: bool,
}

/// In-memory repository.
///
/// Profile ids are assigned when the insert is buffered, so a rolled-back
/// transaction burns ids the way a database sequence would.
#[derive(Debug, Default)]
pub struct LocalRepository {
    inner: RwLock<Inner>,
    next_tx: AtomicU64,
}

impl LocalRepository {
    pub fn new() -> Self {
        LocalRepository {
            inner: RwLock::new(Inner {
                next_profile_id: 1,
                ..Default::default()
            }),
            next_tx: AtomicU64::new(1),
        }
    }

    /// Seed an (app, env) to profile mapping. Mapping rows are managed by
    /// the resource-qualifier subsystem in production; tests seed them
    /// directly.
    pub fn put_mapping(&self, mapping: ProfileMapping) {
        self.inner.write().tables.mappings.push(mapping);
    }

    /// Remove every mapping pointing at the given profile.
    pub fn remove_mappings_for_profile(&self, profile_id: ProfileId) {
        self.inner
            .write()
            .tables
            .mappings
            .retain(|m| m.profile_id != profile_id);
    }

    /// Make the next window write fail, for rollback tests.
    pub fn fail_next_window_write(&self) {
        self.inner.write().fail_window_writes = true;
    }

    /// Number of committed policy rows.
    pub fn policy_count(&self) -> usize {
        self.inner.read().tables.policies.len()
    }

    fn record_write(&self, tx: TxHandle, write: PendingWrite) -> RepositoryResult<()> {
        let mut inner = self.inner.write();
        match inner.pending.get_mut(&tx.0) {
            Some(writes) => {
                writes.push(write);
                Ok(())
            }
            None => Err(RepositoryError::transaction(format!(
                "no open transaction with handle {}",
                tx.0
            ))),
        }
    }

    fn apply(tables: &mut Tables, write: PendingWrite) -> RepositoryResult<()> {
        match write {
            PendingWrite::InsertPolicy(record) => {
                tables.policies.insert(record.id, record);
                Ok(())
            }
            PendingWrite::UpdatePolicy(record) => {
                if !tables.policies.contains_key(&record.id) {
                    return Err(RepositoryError::not_found_with_context(
                        "cannot update absent policy",
                        ErrorContext::new("update_policy")
                            .with_entity("profile")
                            .with_entity_id(record.id.value()),
                    ));
                }
                tables.policies.insert(record.id, record);
                Ok(())
            }
            PendingWrite::DeletePolicy(id) => {
                if tables.policies.remove(&id).is_none() {
                    return Err(RepositoryError::not_found_with_context(
                        "cannot delete absent policy",
                        ErrorContext::new("delete_policy_by_id")
                            .with_entity("profile")
                            .with_entity_id(id.value()),
                    ));
                }
                tables.windows.remove(&id);
                tables.mappings.retain(|m| m.profile_id != id);
                Ok(())
            }
            PendingWrite::ReplaceWindows {
                profile_id,
                windows,
            } => {
                if windows.is_empty() {
                    tables.windows.remove(&profile_id);
                } else {
                    tables.windows.insert(profile_id, windows);
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl TransactionalStore for LocalRepository {
    async fn begin(&self) -> RepositoryResult<TxHandle> {
        let handle = TxHandle(self.next_tx.fetch_add(1, Ordering::SeqCst));
        self.inner.write().pending.insert(handle.0, Vec::new());
        Ok(handle)
    }

    async fn commit(&self, tx: TxHandle) -> RepositoryResult<()> {
        let mut inner = self.inner.write();
        let writes = inner.pending.remove(&tx.0).ok_or_else(|| {
            RepositoryError::transaction(format!("commit of unknown transaction {}", tx.0))
        })?;

        // Apply against a snapshot and swap only on full success.
        let mut staged = inner.tables.clone();
        for write in writes {
            Self::apply(&mut staged, write)?;
        }
        inner.tables = staged;
        Ok(())
    }

    async fn rollback(&self, tx: TxHandle) -> RepositoryResult<()> {
        let mut inner = self.inner.write();
        inner.pending.remove(&tx.0).ok_or_else(|| {
            RepositoryError::transaction(format!("rollback of unknown transaction {}", tx.0))
        })?;
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for LocalRepository {
    async fn create_policy(
        &self,
        tx: TxHandle,
        record: NewPolicyRecord,
        _user_id: UserId,
    ) -> RepositoryResult<ProfileId> {
        let id = {
            let mut inner = self.inner.write();
            let id = ProfileId::new(inner.next_profile_id);
            inner.next_profile_id += 1;
            id
        };
        self.record_write(
            tx,
            PendingWrite::InsertPolicy(PolicyRecord {
                id,
                name: record.name,
                description: record.description,
                enabled: record.enabled,
                json_data: record.json_data,
            }),
        )?;
        Ok(id)
    }

    async fn update_policy(
        &self,
        tx: TxHandle,
        record: PolicyRecord,
        _user_id: UserId,
    ) -> RepositoryResult<()> {
        self.record_write(tx, PendingWrite::UpdatePolicy(record))
    }

    async fn delete_policy_by_id(
        &self,
        tx: TxHandle,
        id: ProfileId,
        _user_id: UserId,
    ) -> RepositoryResult<()> {
        self.record_write(tx, PendingWrite::DeletePolicy(id))
    }

    async fn get_policy_by_id(&self, id: ProfileId) -> RepositoryResult<PolicyRecord> {
        self.inner
            .read()
            .tables
            .policies
            .get(&id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    "policy absent",
                    ErrorContext::new("get_policy_by_id")
                        .with_entity("profile")
                        .with_entity_id(id.value()),
                )
            })
    }

    async fn get_policy_by_ids(&self, ids: &[ProfileId]) -> RepositoryResult<Vec<PolicyRecord>> {
        let inner = self.inner.read();
        Ok(ids
            .iter()
            .filter_map(|id| inner.tables.policies.get(id).cloned())
            .collect())
    }

    async fn get_all_active_by_type(
        &self,
        profile_type: ProfileType,
    ) -> RepositoryResult<Vec<PolicyRecord>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for record in inner.tables.policies.values() {
            if !record.enabled {
                continue;
            }
            let policy: ProfilePolicy = serde_json::from_str(&record.json_data)?;
            if policy.profile_type == profile_type {
                out.push(record.clone());
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl WindowStore for LocalRepository {
    async fn update_window_mappings(
        &self,
        tx: TxHandle,
        profile_id: ProfileId,
        windows: &[TimeWindow],
        _user_id: UserId,
    ) -> RepositoryResult<()> {
        {
            let mut inner = self.inner.write();
            if inner.fail_window_writes {
                inner.fail_window_writes = false;
                return Err(RepositoryError::write_with_context(
                    "injected window write failure",
                    ErrorContext::new("update_window_mappings")
                        .with_entity("window")
                        .with_entity_id(profile_id.value()),
                ));
            }
        }
        self.record_write(
            tx,
            PendingWrite::ReplaceWindows {
                profile_id,
                windows: windows.to_vec(),
            },
        )
    }

    async fn get_windows_for_resources(
        &self,
        profile_ids: &[ProfileId],
    ) -> RepositoryResult<HashMap<ProfileId, Vec<TimeWindow>>> {
        let inner = self.inner.read();
        Ok(profile_ids
            .iter()
            .filter_map(|id| inner.tables.windows.get(id).map(|w| (*id, w.clone())))
            .collect())
    }
}

#[async_trait]
impl ResourceMappingStore for LocalRepository {
    async fn get_mappings_for_selections(
        &self,
        selections: &[AppEnvSelector],
    ) -> RepositoryResult<Vec<ProfileMapping>> {
        let inner = self.inner.read();
        Ok(inner
            .tables
            .mappings
            .iter()
            .filter(|m| {
                selections
                    .iter()
                    .any(|s| s.app_id == m.app_id && s.env_id == m.env_id)
            })
            .copied()
            .collect())
    }
}

/// In-memory user directory for tests and local development.
#[derive(Debug, Default)]
pub struct LocalUserDirectory {
    inner: RwLock<DirectoryInner>,
}

#[derive(Debug, Default)]
struct DirectoryInner {
    users: BTreeMap<UserId, String>,
    super_admins: Vec<UserId>,
}

impl LocalUserDirectory {
    pub fn new() -> Self {
        LocalUserDirectory::default()
    }

    pub fn add_user(&self, id: UserId, email: impl Into<String>) {
        self.inner.write().users.insert(id, email.into());
    }

    pub fn add_super_admin(&self, id: UserId) {
        let mut inner = self.inner.write();
        if !inner.super_admins.contains(&id) {
            inner.super_admins.push(id);
        }
    }
}

#[async_trait]
impl crate::db::repository::UserDirectory for LocalUserDirectory {
    async fn get_super_admin_ids(&self) -> RepositoryResult<Vec<UserId>> {
        Ok(self.inner.read().super_admins.clone())
    }

    async fn get_by_ids(&self, ids: &[UserId]) -> RepositoryResult<Vec<UserInfo>> {
        let inner = self.inner.read();
        Ok(ids
            .iter()
            .filter_map(|id| {
                inner.users.get(id).map(|email| UserInfo {
                    id: *id,
                    email_id: email.clone(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::UserDirectory;

    fn record(name: &str, profile_type: ProfileType, enabled: bool) -> NewPolicyRecord {
        let policy = ProfilePolicy {
            profile_type,
            timezone: "UTC".to_string(),
            display_message: String::new(),
            excluded_user_ids: vec![],
            is_user_excluded: false,
            is_super_admin_excluded: false,
        };
        NewPolicyRecord {
            name: name.to_string(),
            description: String::new(),
            enabled,
            json_data: serde_json::to_string(&policy).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_commit_read_back() {
        let repo = LocalRepository::new();
        let tx = repo.begin().await.unwrap();
        let id = repo
            .create_policy(tx, record("freeze", ProfileType::Blackout, true), UserId(1))
            .await
            .unwrap();
        repo.commit(tx).await.unwrap();

        let row = repo.get_policy_by_id(id).await.unwrap();
        assert_eq!(row.name, "freeze");
        assert!(row.enabled);
    }

    #[tokio::test]
    async fn test_rollback_discards_buffered_writes() {
        let repo = LocalRepository::new();
        let tx = repo.begin().await.unwrap();
        let id = repo
            .create_policy(tx, record("freeze", ProfileType::Blackout, true), UserId(1))
            .await
            .unwrap();
        repo.rollback(tx).await.unwrap();

        assert!(repo.get_policy_by_id(id).await.unwrap_err().is_not_found());
        assert_eq!(repo.policy_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_store_untouched() {
        let repo = LocalRepository::new();
        let tx = repo.begin().await.unwrap();
        let id = repo
            .create_policy(tx, record("freeze", ProfileType::Blackout, true), UserId(1))
            .await
            .unwrap();
        // The delete of an absent id fails at apply time, which must also
        // discard the buffered insert.
        repo.delete_policy_by_id(tx, ProfileId::new(999), UserId(1))
            .await
            .unwrap();
        assert!(repo.commit(tx).await.is_err());
        assert!(repo.get_policy_by_id(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_all_active_by_type_skips_disabled() {
        let repo = LocalRepository::new();
        let tx = repo.begin().await.unwrap();
        repo.create_policy(tx, record("on", ProfileType::Blackout, true), UserId(1))
            .await
            .unwrap();
        repo.create_policy(tx, record("off", ProfileType::Blackout, false), UserId(1))
            .await
            .unwrap();
        repo.create_policy(tx, record("maint", ProfileType::Maintenance, true), UserId(1))
            .await
            .unwrap();
        repo.commit(tx).await.unwrap();

        let blackouts = repo
            .get_all_active_by_type(ProfileType::Blackout)
            .await
            .unwrap();
        assert_eq!(blackouts.len(), 1);
        assert_eq!(blackouts[0].name, "on");
    }

    #[tokio::test]
    async fn test_user_directory_batch_lookup_skips_unknown() {
        let dir = LocalUserDirectory::new();
        dir.add_user(UserId(1), "dev@example.com");
        dir.add_super_admin(UserId(7));

        let found = dir.get_by_ids(&[UserId(1), UserId(2)]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email_id, "dev@example.com");
        assert_eq!(dir.get_super_admin_ids().await.unwrap(), vec![UserId(7)]);
    }
}
