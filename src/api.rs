//! Public API surface for the deployment window engine.
//!
//! This file consolidates the typed identifiers and re-exports the DTO types
//! returned by the orchestrator. All types derive Serialize/Deserialize for
//! JSON serialization.

pub use crate::models::profile::{
    DeploymentWindowProfile, Frequency, HourMinute, ProfileMapping, ProfilePolicy, ProfileType,
    TimeWindow,
};
pub use crate::models::state::{
    AppEnvSelector, AppGroupEnvironmentEntry, DeploymentWindowAppGroupResponse,
    DeploymentWindowResponse, EnvironmentState, ProfileState, UserActionState,
};

use serde::{Deserialize, Serialize};

/// Deployment window profile identifier (policy store primary key).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub i32);

/// Application identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppId(pub i32);

/// Environment identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnvId(pub i32);

/// User identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i32);

impl ProfileId {
    pub fn new(value: i32) -> Self {
        ProfileId(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl AppId {
    pub fn new(value: i32) -> Self {
        AppId(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl EnvId {
    pub fn new(value: i32) -> Self {
        EnvId(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl UserId {
    pub fn new(value: i32) -> Self {
        UserId(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

/// User record as returned by the user directory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub email_id: String,
}
