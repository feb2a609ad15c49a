//! Wire and domain types shared by the auth and clock flows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type EmployeeId = i64;
pub type EmployeeJobId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    Manager,
    Admin,
    Sysadmin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: EmployeeId,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Only populated for managers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departments: Option<Vec<String>>,
}

impl AuthenticatedUser {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() { self.username.clone() } else { full.to_string() }
    }
}

/// Login/refresh response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds, relative to receipt.
    pub expires_in: i64,
    #[serde(default)]
    pub user: Option<AuthenticatedUser>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Next valid clock action for an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClockDirection {
    ClockIn,
    ClockOut,
    Unavailable,
}

impl ClockDirection {
    /// Exact match on the wire value; anything else, including padded or quoted text, is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CLOCK_IN" => Some(ClockDirection::ClockIn),
            "CLOCK_OUT" => Some(ClockDirection::ClockOut),
            "UNAVAILABLE" => Some(ClockDirection::Unavailable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClockDirection::ClockIn => "CLOCK_IN",
            ClockDirection::ClockOut => "CLOCK_OUT",
            ClockDirection::Unavailable => "UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for ClockDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeJob {
    pub employee_job_id: EmployeeJobId,
    pub job_title: String,
    pub hourly_wage: f64,
    #[serde(default)]
    pub department_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveShift {
    pub id: i64,
    pub clock_in: DateTime<Utc>,
    pub job_title: String,
    pub hourly_wage: f64,
}

impl ActiveShift {
    /// Time on the clock; a clock-in in the future (skewed clocks) counts as zero.
    pub fn elapsed(&self, now: DateTime<Utc>) -> chrono::Duration {
        let d = now - self.clock_in;
        if d < chrono::Duration::zero() { chrono::Duration::zero() } else { d }
    }

    /// Earnings so far, rounded to cents.
    pub fn earnings(&self, now: DateTime<Utc>) -> f64 {
        let hours = self.elapsed(now).num_milliseconds() as f64 / 3_600_000.0;
        (hours * self.hourly_wage * 100.0).round() / 100.0
    }
}

/// `HH:MM:SS`, hours not wrapped at 24.
pub fn format_elapsed(d: chrono::Duration) -> String {
    let secs = d.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Submitted when no real position could be acquired.
    pub const SENTINEL: GeoCoordinate = GeoCoordinate { latitude: 0.0, longitude: 0.0 };

    pub fn new(latitude: f64, longitude: f64) -> Self { Self { latitude, longitude } }

    pub fn is_sentinel(&self) -> bool { *self == Self::SENTINEL }
}

/// Body of both clock submissions. `id` is the employee-job id for clock-in and
/// the employee id for clock-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockPayload {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl ClockPayload {
    pub fn new(id: i64, at: GeoCoordinate) -> Self {
        Self { id, latitude: at.latitude, longitude: at.longitude }
    }
}

/// Minimal employee record returned by the kiosk username lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}
