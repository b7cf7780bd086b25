//! Policy store abstractions for deployment window data.
//!
//! The deployment window engine performs CRUD over policy records, window
//! rules and app/env mappings via the Repository pattern, allowing storage
//! backends to be swapped without touching evaluation code.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Caller (REST handlers, out of scope)                    │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services::orchestrator)                  │
//! │  - window evaluation + precedence resolution             │
//! │  - transactional profile CRUD                            │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Store Traits (db::repository)                           │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//!     ┌───────────────▼──────────────────────────────┐
//!     │             Local Repository                 │
//!     │               (in-memory)                    │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! There is no global repository instance; backends are constructed at
//! startup (see [`factory::RepositoryFactory`]) and injected into
//! [`DeploymentWindowService`](crate::services::orchestrator::DeploymentWindowService).

pub mod config;
pub mod factory;
pub mod repositories;
pub mod repository;

pub use config::{EvaluationSettings, RepositoryConfig, RepositorySettings};
pub use factory::{RepositoryFactory, RepositoryType};
pub use repositories::{LocalRepository, LocalUserDirectory};
pub use repository::{
    DeploymentWindowStore, ErrorContext, NewPolicyRecord, PolicyRecord, PolicyStore,
    RepositoryError, RepositoryResult, ResourceMappingStore, TransactionalStore, TxHandle,
    UserDirectory, WindowStore,
};
