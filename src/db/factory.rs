//! Repository factory for dependency injection.
//!
//! Centralizes creation of store backends. There is deliberately no global
//! repository singleton; callers construct the backend once at startup and
//! pass it by reference into the orchestrator.

use std::str::FromStr;
use std::sync::Arc;

use super::repositories::LocalRepository;
use super::repository::DeploymentWindowStore;

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// In-memory local repository (tests and local development).
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Read the backend selection from the `REPOSITORY_TYPE` environment
    /// variable, defaulting to Local.
    pub fn from_env() -> Self {
        std::env::var("REPOSITORY_TYPE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::Local)
    }
}

/// Factory for creating store instances.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a store backend of the given type.
    pub fn create(repo_type: RepositoryType) -> Arc<dyn DeploymentWindowStore> {
        match repo_type {
            RepositoryType::Local => Self::create_local(),
        }
    }

    /// Create the in-memory backend.
    pub fn create_local() -> Arc<dyn DeploymentWindowStore> {
        Arc::new(LocalRepository::new())
    }
}
