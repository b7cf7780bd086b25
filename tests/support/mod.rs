//! Shared builders for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use depwin::api::{AppId, EnvId, ProfileId, UserId};
use depwin::clock::FixedClock;
use depwin::db::{EvaluationSettings, LocalRepository, LocalUserDirectory};
use depwin::models::profile::{
    DeploymentWindowProfile, Frequency, HourMinute, ProfileMapping, ProfileType, TimeWindow,
};
use depwin::services::DeploymentWindowService;

/// The pinned evaluation instant used across the suite: a Monday, 11:00 UTC.
pub fn target_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap()
}

pub fn acting_user() -> UserId {
    UserId::new(100)
}

pub struct TestHarness {
    pub repo: Arc<LocalRepository>,
    pub directory: Arc<LocalUserDirectory>,
    pub service: DeploymentWindowService,
}

pub fn harness() -> TestHarness {
    harness_with_settings(EvaluationSettings::default())
}

pub fn harness_with_settings(settings: EvaluationSettings) -> TestHarness {
    let repo = Arc::new(LocalRepository::new());
    let directory = Arc::new(LocalUserDirectory::new());
    let service = DeploymentWindowService::new(
        repo.clone(),
        directory.clone(),
        Arc::new(FixedClock(target_time())),
        settings,
    );
    TestHarness {
        repo,
        directory,
        service,
    }
}

pub fn daily_window(from: (u8, u8), to: (u8, u8)) -> TimeWindow {
    let mut w = TimeWindow::new(Frequency::Daily);
    w.hour_minute_from = HourMinute::new(from.0, from.1);
    w.hour_minute_to = HourMinute::new(to.0, to.1);
    w
}

pub fn fixed_window(from: DateTime<Utc>, to: DateTime<Utc>) -> TimeWindow {
    let mut w = TimeWindow::new(Frequency::Fixed);
    w.time_from = Some(from);
    w.time_to = Some(to);
    w
}

pub fn profile(
    name: &str,
    profile_type: ProfileType,
    windows: Vec<TimeWindow>,
) -> DeploymentWindowProfile {
    DeploymentWindowProfile {
        id: None,
        name: name.to_string(),
        description: format!("{} profile for tests", name),
        profile_type,
        timezone: "UTC".to_string(),
        display_message: String::new(),
        enabled: true,
        windows,
        excluded_user_ids: vec![],
        is_user_excluded: false,
        is_super_admin_excluded: false,
    }
}

pub fn with_excluded_users(
    mut profile: DeploymentWindowProfile,
    users: &[i32],
) -> DeploymentWindowProfile {
    profile.excluded_user_ids = users.iter().map(|u| UserId::new(*u)).collect();
    profile.is_user_excluded = true;
    profile
}

/// Create the profile through the service and map it to (app, env).
pub async fn seed(
    harness: &TestHarness,
    profile: DeploymentWindowProfile,
    app_id: AppId,
    env_id: EnvId,
) -> ProfileId {
    let created = harness
        .service
        .create_deployment_window_profile(profile, acting_user())
        .await
        .expect("profile creation should succeed");
    let profile_id = created.id.expect("created profile has an id");
    harness.repo.put_mapping(ProfileMapping {
        profile_id,
        app_id,
        env_id,
    });
    profile_id
}
