//! Deployment window profile domain types.
//!
//! A profile is a named blackout or maintenance policy carrying a list of
//! recurring [`TimeWindow`] rules, an IANA timezone and a per-user exclusion
//! list. Profiles are persisted as a policy record whose `json_data` column
//! deserializes to [`ProfilePolicy`]; window rules live in a separate store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::api::{AppId, EnvId, ProfileId, UserId};

/// Kind of restriction a profile expresses.
///
/// Blackout windows disallow deployments while active; maintenance windows
/// explicitly allow them (carving exceptions out of a default-blocked
/// policy). The type is immutable after profile creation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProfileType {
    Blackout,
    Maintenance,
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileType::Blackout => write!(f, "BLACKOUT"),
            ProfileType::Maintenance => write!(f, "MAINTENANCE"),
        }
    }
}

impl FromStr for ProfileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BLACKOUT" => Ok(ProfileType::Blackout),
            "MAINTENANCE" => Ok(ProfileType::Maintenance),
            _ => Err(format!("Unknown profile type: {}", s)),
        }
    }
}

/// Recurrence interpretation of a [`TimeWindow`].
///
/// Exactly one interpretation applies per window; fields irrelevant to the
/// chosen frequency are ignored by the evaluator, not validated away.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    /// One-shot absolute interval `[time_from, time_to)`.
    Fixed,
    /// Time-of-day interval recurring every day.
    Daily,
    /// Time-of-day interval on an explicit set of weekdays.
    Weekly,
    /// Span from `weekday_from @ hour_minute_from` to `weekday_to @
    /// hour_minute_to`, possibly wrapping the week boundary.
    WeeklyRange,
    /// Day-of-month range restricted to a time-of-day interval.
    Monthly,
}

/// Minute-resolution time of day, serialized as `"HH:MM"`.
///
/// `24:00` is accepted as an exclusive interval end meaning midnight of the
/// following day; it is never a valid interval start.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HourMinute {
    hour: u8,
    minute: u8,
}

impl HourMinute {
    /// Create a time of day. Returns `None` for values outside `00:00..=24:00`.
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        let valid = (hour < 24 && minute < 60) || (hour == 24 && minute == 0);
        valid.then_some(HourMinute { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Offset from midnight. `24:00` maps to a full 24 hours.
    pub fn since_midnight(&self) -> Duration {
        Duration::minutes(self.hour as i64 * 60 + self.minute as i64)
    }
}

impl fmt::Display for HourMinute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for HourMinute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid time of day: {}", s))?;
        let hour: u8 = h.parse().map_err(|_| format!("Invalid hour: {}", s))?;
        let minute: u8 = m.parse().map_err(|_| format!("Invalid minute: {}", s))?;
        HourMinute::new(hour, minute).ok_or_else(|| format!("Time of day out of range: {}", s))
    }
}

impl TryFrom<String> for HourMinute {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HourMinute> for String {
    fn from(value: HourMinute) -> Self {
        value.to_string()
    }
}

/// A single recurrence rule belonging to one profile.
///
/// Which fields are meaningful depends on [`Frequency`]; missing fields that
/// the frequency requires make the window contribute nothing (the evaluator
/// logs and skips it rather than failing the whole profile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub frequency: Frequency,
    /// Absolute interval start (Fixed only).
    #[serde(default)]
    pub time_from: Option<DateTime<Utc>>,
    /// Absolute interval end, exclusive (Fixed only).
    #[serde(default)]
    pub time_to: Option<DateTime<Utc>>,
    /// Time-of-day start (Daily, Weekly, WeeklyRange, Monthly).
    #[serde(default)]
    pub hour_minute_from: Option<HourMinute>,
    /// Time-of-day end, exclusive (Daily, Weekly, WeeklyRange, Monthly).
    #[serde(default)]
    pub hour_minute_to: Option<HourMinute>,
    /// Day-of-month start, 1-based (Monthly only).
    #[serde(default)]
    pub day_from: Option<u32>,
    /// Day-of-month end, 1-based (Monthly only). Smaller than `day_from`
    /// means the range wraps into the next month.
    #[serde(default)]
    pub day_to: Option<u32>,
    /// First weekday of a WeeklyRange span.
    #[serde(default)]
    pub weekday_from: Option<Weekday>,
    /// Last weekday of a WeeklyRange span.
    #[serde(default)]
    pub weekday_to: Option<Weekday>,
    /// Explicit weekday set (Weekly only).
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
}

impl TimeWindow {
    /// Blank window for the given frequency; callers fill in the relevant
    /// fields.
    pub fn new(frequency: Frequency) -> Self {
        TimeWindow {
            frequency,
            time_from: None,
            time_to: None,
            hour_minute_from: None,
            hour_minute_to: None,
            day_from: None,
            day_to: None,
            weekday_from: None,
            weekday_to: None,
            weekdays: Vec::new(),
        }
    }
}

/// A named blackout or maintenance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentWindowProfile {
    /// Policy store primary key; `None` before the first save.
    pub id: Option<ProfileId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub profile_type: ProfileType,
    /// IANA timezone name the window rules are interpreted in.
    pub timezone: String,
    /// Message shown to users while the restriction is in effect.
    #[serde(default)]
    pub display_message: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub windows: Vec<TimeWindow>,
    /// Users allowed to bypass this restriction.
    #[serde(default)]
    pub excluded_user_ids: Vec<UserId>,
    /// Whether the explicit exclusion list is honored.
    #[serde(default)]
    pub is_user_excluded: bool,
    /// Whether super-admins are implicitly on the exclusion list.
    #[serde(default)]
    pub is_super_admin_excluded: bool,
}

fn default_enabled() -> bool {
    true
}

/// Non-window profile fields as stored in the policy record's `json_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePolicy {
    pub profile_type: ProfileType,
    pub timezone: String,
    #[serde(default)]
    pub display_message: String,
    #[serde(default)]
    pub excluded_user_ids: Vec<UserId>,
    #[serde(default)]
    pub is_user_excluded: bool,
    #[serde(default)]
    pub is_super_admin_excluded: bool,
}

impl ProfilePolicy {
    /// Project the persisted policy fields out of a full profile.
    pub fn from_profile(profile: &DeploymentWindowProfile) -> Self {
        ProfilePolicy {
            profile_type: profile.profile_type,
            timezone: profile.timezone.clone(),
            display_message: profile.display_message.clone(),
            excluded_user_ids: profile.excluded_user_ids.clone(),
            is_user_excluded: profile.is_user_excluded,
            is_super_admin_excluded: profile.is_super_admin_excluded,
        }
    }

    /// Rebuild a full profile from its stored pieces.
    pub fn into_profile(
        self,
        id: ProfileId,
        name: String,
        description: String,
        enabled: bool,
        windows: Vec<TimeWindow>,
    ) -> DeploymentWindowProfile {
        DeploymentWindowProfile {
            id: Some(id),
            name,
            description,
            profile_type: self.profile_type,
            timezone: self.timezone,
            display_message: self.display_message,
            enabled,
            windows,
            excluded_user_ids: self.excluded_user_ids,
            is_user_excluded: self.is_user_excluded,
            is_super_admin_excluded: self.is_super_admin_excluded,
        }
    }
}

/// Associates a profile to one (app, env) selection. Many-to-many: one
/// profile may apply to many pairs and one pair may carry multiple profiles
/// of both types concurrently.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileMapping {
    pub profile_id: ProfileId,
    pub app_id: AppId,
    pub env_id: EnvId,
}
