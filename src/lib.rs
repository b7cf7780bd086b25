//! # Deployment Window Engine
//!
//! Time-restriction evaluation core for a CI/CD orchestration backend.
//!
//! Given a point in time and a set of configured blackout and maintenance
//! policies (recurring time-window rules, timezones, per-user exclusion
//! lists), this crate computes whether a deployment action is currently
//! allowed, partially allowed (user-specific bypass) or blocked, and which
//! policy is "in effect" under the precedence rule across overlapping
//! windows.
//!
//! ## Architecture
//!
//! - [`api`]: typed identifiers and the DTO surface consumed by callers
//! - [`models`]: profile, window and runtime-state domain types
//! - [`db`]: store traits, error types and the in-memory backend
//! - [`services`]: window evaluation, precedence resolution, exclusion
//!   logic and the public orchestrator
//! - [`clock`]: injectable time source
//!
//! HTTP transport, real persistence, authorization and pipeline execution
//! live outside this crate; it consumes a clock, a policy store and a user
//! directory, and exposes the state-query and profile CRUD operations.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use depwin::clock::SystemClock;
//! use depwin::db::{EvaluationSettings, LocalRepository, LocalUserDirectory};
//! use depwin::services::DeploymentWindowService;
//!
//! let service = DeploymentWindowService::new(
//!     Arc::new(LocalRepository::new()),
//!     Arc::new(LocalUserDirectory::new()),
//!     Arc::new(SystemClock),
//!     EvaluationSettings::default(),
//! );
//! # let _ = service;
//! ```

pub mod api;
pub mod clock;
pub mod db;
pub mod models;
pub mod services;
